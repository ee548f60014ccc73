//! Type-erased views that carry their owner.
//!
//! These are the views that cross the boundary to an embedding layer. The raw
//! types ([`RawStrided`], [`RawArray`], [`RawBits`], [`RawStridedBits`]) hold a
//! base pointer, shape metadata, a runtime [`FormatAccessor`] (byte views
//! only) and a writable flag, and expose nothing but metadata. Data access and
//! every transformation live on their [`Owned`] wrappers, which clone the same
//! [`Owner`] into each derived view so the memory stays valid for the longest
//! holder.
//!
//! Element bytes are only ever touched for the duration of a single decode or
//! encode call.

use std::slice;

use crate::bits::{
    advance, check_bits, BitArrayView, BitArrayViewMut, StridedBitArrayView,
    StridedBitArrayViewMut,
};
use crate::dims::{Size, Stride};
use crate::format::{Format, FormatAccessor, Value};
use crate::layout::{base_offset, step_magnitude, Layout, SliceSpec};
use crate::owner::{heap_owner, Owned, Owner, ViewExtent};
use crate::strided::Element;
use crate::{Result, StridedError};

// ============================================================================
// Raw views
// ============================================================================

/// Strided byte view with a runtime format.
#[derive(Debug, Clone, Copy)]
pub struct RawStrided<const D: usize> {
    data: *mut u8,
    layout: Layout<D>,
    accessor: FormatAccessor,
    writable: bool,
}

/// Contiguous byte view with a runtime format.
#[derive(Debug, Clone, Copy)]
pub struct RawArray {
    data: *mut u8,
    len: usize,
    accessor: FormatAccessor,
    writable: bool,
}

/// Contiguous bit view.
#[derive(Debug, Clone, Copy)]
pub struct RawBits {
    data: *mut u8,
    bit_offset: u8,
    len: usize,
    writable: bool,
}

/// Strided bit view. Strides are in bits.
#[derive(Debug, Clone, Copy)]
pub struct RawStridedBits<const D: usize> {
    data: *mut u8,
    bit_offset: u8,
    layout: Layout<D>,
    writable: bool,
}

/// Owner-carrying strided view of `D` dimensions.
pub type StridedBuffer<const D: usize> = Owned<RawStrided<D>>;
/// Owner-carrying contiguous view.
pub type ArrayBuffer = Owned<RawArray>;
/// Owner-carrying contiguous bit view.
pub type BitBuffer = Owned<RawBits>;
/// Owner-carrying strided bit view.
pub type StridedBitBuffer<const D: usize> = Owned<RawStridedBits<D>>;

impl<const D: usize> ViewExtent for RawStrided<D> {
    #[inline]
    fn is_empty_view(&self) -> bool {
        self.layout.is_empty()
    }
}

impl ViewExtent for RawArray {
    #[inline]
    fn is_empty_view(&self) -> bool {
        self.len == 0
    }
}

impl ViewExtent for RawBits {
    #[inline]
    fn is_empty_view(&self) -> bool {
        self.len == 0
    }
}

impl<const D: usize> ViewExtent for RawStridedBits<D> {
    #[inline]
    fn is_empty_view(&self) -> bool {
        self.layout.is_empty()
    }
}

impl<const D: usize> RawStrided<D> {
    #[inline]
    pub fn data(&self) -> *const u8 {
        self.data
    }

    #[inline]
    pub fn layout(&self) -> &Layout<D> {
        &self.layout
    }

    #[inline]
    pub fn size(&self) -> Size<D> {
        self.layout.size()
    }

    #[inline]
    pub fn stride(&self) -> Stride<D> {
        self.layout.stride()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.layout.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.layout.is_empty()
    }

    #[inline]
    pub fn item_size(&self) -> usize {
        self.accessor.item_size()
    }

    /// Buffer-protocol format string; `None` for plain bytes and formats
    /// without a conversion.
    #[inline]
    pub fn format(&self) -> Option<&'static str> {
        self.accessor.format()
    }

    #[inline]
    pub fn accessor(&self) -> &FormatAccessor {
        &self.accessor
    }

    #[inline]
    pub fn is_writable(&self) -> bool {
        self.writable
    }

    pub fn is_contiguous(&self) -> bool {
        self.layout.is_contiguous(self.item_size())
    }

    #[inline]
    fn rebased_to<const E: usize>(&self, delta: isize, layout: Layout<E>) -> RawStrided<E> {
        RawStrided {
            data: self.data.wrapping_offset(delta),
            layout,
            accessor: self.accessor,
            writable: self.writable,
        }
    }

    /// # Safety
    /// `offset` must be the offset of an addressed element.
    #[inline]
    unsafe fn item(&self, offset: isize) -> &[u8] {
        slice::from_raw_parts(self.data.offset(offset), self.item_size())
    }

    fn check_write(&self) -> Result<()> {
        if !self.writable {
            return Err(StridedError::ReadOnly);
        }
        if let Some(dim) = self.layout.aliased_axis() {
            return Err(StridedError::BroadcastWrite { dim });
        }
        Ok(())
    }
}

impl RawArray {
    #[inline]
    pub fn data(&self) -> *const u8 {
        self.data
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    #[inline]
    pub fn item_size(&self) -> usize {
        self.accessor.item_size()
    }

    #[inline]
    pub fn format(&self) -> Option<&'static str> {
        self.accessor.format()
    }

    #[inline]
    pub fn accessor(&self) -> &FormatAccessor {
        &self.accessor
    }

    #[inline]
    pub fn is_writable(&self) -> bool {
        self.writable
    }

    /// The same elements as a one-dimensional strided view.
    pub fn as_strided(&self) -> RawStrided<1> {
        RawStrided {
            data: self.data,
            layout: Layout::contiguous(Size::new([self.len]), self.item_size()),
            accessor: self.accessor,
            writable: self.writable,
        }
    }
}

impl RawBits {
    #[inline]
    pub fn data(&self) -> *const u8 {
        self.data
    }

    #[inline]
    pub fn bit_offset(&self) -> u8 {
        self.bit_offset
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    #[inline]
    pub fn is_writable(&self) -> bool {
        self.writable
    }

    fn borrowed(&self) -> BitArrayView<'_> {
        // SAFETY: the owner keeps the addressed bits alive while `self` exists
        unsafe { BitArrayView::from_raw_parts(self.data, self.bit_offset, self.len) }
    }

    pub fn as_strided(&self) -> RawStridedBits<1> {
        RawStridedBits {
            data: self.data,
            bit_offset: self.bit_offset,
            layout: Layout::contiguous(Size::new([self.len]), 1),
            writable: self.writable,
        }
    }
}

impl<const D: usize> RawStridedBits<D> {
    #[inline]
    pub fn data(&self) -> *const u8 {
        self.data
    }

    #[inline]
    pub fn bit_offset(&self) -> u8 {
        self.bit_offset
    }

    #[inline]
    pub fn layout(&self) -> &Layout<D> {
        &self.layout
    }

    #[inline]
    pub fn size(&self) -> Size<D> {
        self.layout.size()
    }

    #[inline]
    pub fn stride(&self) -> Stride<D> {
        self.layout.stride()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.layout.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.layout.is_empty()
    }

    #[inline]
    pub fn is_writable(&self) -> bool {
        self.writable
    }

    pub fn is_contiguous(&self) -> bool {
        self.layout.is_contiguous(1)
    }

    #[inline]
    fn rebased_to<const E: usize>(&self, delta: isize, layout: Layout<E>) -> RawStridedBits<E> {
        let (data, bit_offset) = advance(self.data, self.bit_offset, delta);
        RawStridedBits {
            data: data.cast_mut(),
            bit_offset,
            layout,
            writable: self.writable,
        }
    }

    fn borrowed(&self) -> StridedBitArrayView<'_, D> {
        // SAFETY: the owner keeps the addressed bits alive while `self` exists
        unsafe { StridedBitArrayView::from_raw_parts(self.data, self.bit_offset, self.layout) }
    }
}

// ============================================================================
// Construction
// ============================================================================

fn accessor_of(format: impl Into<Format>) -> FormatAccessor {
    format.into().accessor()
}

impl<const D: usize> StridedBuffer<D> {
    /// Take ownership of `bytes` as a row-major array of `size` elements.
    pub fn from_vec(bytes: Vec<u8>, size: Size<D>, format: impl Into<Format>) -> Result<Self> {
        let accessor = accessor_of(format);
        let layout = Layout::contiguous(size, accessor.item_size());
        Self::from_vec_with_layout(bytes, layout, accessor)
    }

    /// Take ownership of `bytes` with an explicit byte layout relative to the
    /// start of the vector.
    pub fn from_vec_with_layout(
        bytes: Vec<u8>,
        layout: Layout<D>,
        accessor: FormatAccessor,
    ) -> Result<Self> {
        layout.check_fits(0, accessor.item_size(), bytes.len())?;
        let (owner, data, _) = heap_owner(bytes);
        Ok(Owned::new(
            RawStrided {
                data,
                layout,
                accessor,
                writable: true,
            },
            Some(owner),
        ))
    }

    /// Wrap memory kept alive by `owner`.
    ///
    /// # Safety
    /// Every element the layout addresses from `data` must stay valid for as
    /// long as `owner` is alive, must be writable if `writable` is set and must
    /// not be accessed through Rust references elsewhere while views exist.
    pub unsafe fn from_raw_parts(
        data: *mut u8,
        layout: Layout<D>,
        accessor: FormatAccessor,
        writable: bool,
        owner: Option<Owner>,
    ) -> Self {
        Owned::new(
            RawStrided {
                data,
                layout,
                accessor,
                writable,
            },
            owner,
        )
    }

    /// The same view with writes disabled.
    pub fn read_only(&self) -> Self {
        let mut raw = *self.view();
        raw.writable = false;
        self.derive(raw)
    }

    /// Decode the element at a multi-index.
    pub fn get(&self, index: Size<D>) -> Result<Value> {
        let offset = self.layout.offset(&index)?;
        // SAFETY: the offset was bounds-checked; the owner keeps the memory alive
        self.accessor.decode(unsafe { self.item(offset) })
    }

    /// Encode `value` into the element at a multi-index.
    ///
    /// # Errors
    /// [`StridedError::ReadOnly`] for read-only views,
    /// [`StridedError::BroadcastWrite`] when a dimension aliases several
    /// indices, plus index and encoding errors.
    pub fn set(&self, index: Size<D>, value: &Value) -> Result<()> {
        self.check_write()?;
        let offset = self.layout.offset(&index)?;
        // SAFETY: bounds-checked, writable, and no other reference to these bytes
        let bytes =
            unsafe { slice::from_raw_parts_mut(self.data.offset(offset), self.item_size()) };
        self.accessor.encode(bytes, value)
    }

    /// Read the element at a multi-index as `T`, which must match the item
    /// size.
    pub fn typed_get<T: Element>(&self, index: Size<D>) -> Result<T> {
        if std::mem::size_of::<T>() != self.item_size() {
            return Err(StridedError::ItemSizeMismatch {
                expected: self.item_size(),
                actual: std::mem::size_of::<T>(),
            });
        }
        let offset = self.layout.offset(&index)?;
        // SAFETY: bounds-checked and exactly one item wide
        Ok(unsafe { self.data.offset(offset).cast::<T>().read_unaligned() })
    }

    /// Decode all elements in row-major order.
    pub fn to_values(&self) -> Result<Vec<Value>> {
        self.layout
            .offsets()
            // SAFETY: offsets() only yields offsets of addressed elements
            .map(|offset| self.accessor.decode(unsafe { self.item(offset) }))
            .collect()
    }

    /// Copy the element bytes in row-major order, outermost dimension first.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.len() * self.item_size());
        for offset in self.layout.offsets() {
            // SAFETY: offsets() only yields offsets of addressed elements
            out.extend_from_slice(unsafe { self.item(offset) });
        }
        out
    }

    /// Copy into a fresh, contiguous, writable buffer with its own owner.
    pub fn to_contiguous(&self) -> Result<Self> {
        let layout = Layout::contiguous(self.size(), self.item_size());
        Self::from_vec_with_layout(self.to_bytes(), layout, self.accessor)
    }
}

impl ArrayBuffer {
    /// Take ownership of `bytes` as consecutive items of `format`. Trailing
    /// bytes that don't make up a whole item are not addressed.
    pub fn from_vec(bytes: Vec<u8>, format: impl Into<Format>) -> Self {
        let accessor = accessor_of(format);
        let len = bytes.len().checked_div(accessor.item_size()).unwrap_or(0);
        let (owner, data, _) = heap_owner(bytes);
        Owned::new(
            RawArray {
                data,
                len,
                accessor,
                writable: true,
            },
            Some(owner),
        )
    }

    /// # Safety
    /// Same contract as [`StridedBuffer::from_raw_parts`] for `len`
    /// consecutive items.
    pub unsafe fn from_raw_parts(
        data: *mut u8,
        len: usize,
        accessor: FormatAccessor,
        writable: bool,
        owner: Option<Owner>,
    ) -> Self {
        Owned::new(
            RawArray {
                data,
                len,
                accessor,
                writable,
            },
            owner,
        )
    }

    pub fn read_only(&self) -> Self {
        let mut raw = *self.view();
        raw.writable = false;
        self.derive(raw)
    }

    /// The same elements as a one-dimensional strided buffer.
    pub fn as_strided(&self) -> StridedBuffer<1> {
        self.derive(self.view().as_strided())
    }

    pub fn get(&self, index: usize) -> Result<Value> {
        self.as_strided().get(Size::new([index]))
    }

    pub fn set(&self, index: usize, value: &Value) -> Result<()> {
        self.as_strided().set(Size::new([index]), value)
    }

    pub fn typed_get<T: Element>(&self, index: usize) -> Result<T> {
        self.as_strided().typed_get(Size::new([index]))
    }

    /// Narrow to `begin..end`.
    pub fn slice(&self, begin: usize, end: usize) -> Result<Self> {
        if begin > end || end > self.len {
            return Err(StridedError::SliceOutOfRange {
                dim: 0,
                begin,
                end,
                size: self.len,
            });
        }
        let mut raw = *self.view();
        raw.data = raw.data.wrapping_add(begin * raw.item_size());
        raw.len = end - begin;
        Ok(self.derive(raw))
    }

    /// Every `step`-th item, walking backwards for a negative step.
    pub fn every(&self, step: isize) -> Result<StridedBuffer<1>> {
        let strided = self.as_strided();
        if step < 0 {
            return strided.flipped(0)?.every(Stride::new([step_magnitude(step)?]));
        }
        strided.every(Stride::new([step]))
    }

    pub fn flipped(&self) -> StridedBuffer<1> {
        let raw = self.view().as_strided();
        let delta = self.len.saturating_sub(1) as isize * raw.item_size() as isize;
        let layout = Layout::new(raw.size(), Stride::new([-(raw.item_size() as isize)]));
        self.derive(raw.rebased_to(delta, layout))
    }

    pub fn to_values(&self) -> Result<Vec<Value>> {
        self.as_strided().to_values()
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        self.as_strided().to_bytes()
    }
}

impl BitBuffer {
    /// Take ownership of `bytes`, addressing `len` bits from bit `offset`.
    pub fn from_vec(bytes: Vec<u8>, offset: usize, len: usize) -> Result<Self> {
        check_bits(offset, len, bytes.len())?;
        let (owner, data, _) = heap_owner(bytes);
        Ok(Owned::new(
            RawBits {
                data: data.wrapping_add(offset / 8),
                bit_offset: (offset % 8) as u8,
                len,
                writable: true,
            },
            Some(owner),
        ))
    }

    /// # Safety
    /// Bits `bit_offset..bit_offset + len` from `data` must stay valid while
    /// `owner` is alive and be writable if `writable` is set. `bit_offset`
    /// must be less than 8.
    pub unsafe fn from_raw_parts(
        data: *mut u8,
        bit_offset: u8,
        len: usize,
        writable: bool,
        owner: Option<Owner>,
    ) -> Self {
        Owned::new(
            RawBits {
                data,
                bit_offset,
                len,
                writable,
            },
            owner,
        )
    }

    pub fn read_only(&self) -> Self {
        let mut raw = *self.view();
        raw.writable = false;
        self.derive(raw)
    }

    pub fn get(&self, index: usize) -> Result<bool> {
        self.borrowed().get(index)
    }

    pub fn set(&self, index: usize, value: bool) -> Result<()> {
        if !self.writable {
            return Err(StridedError::ReadOnly);
        }
        // SAFETY: writable, kept alive by the owner, no other reference to these bits
        let mut view =
            unsafe { BitArrayViewMut::from_raw_parts(self.data, self.bit_offset, self.len) };
        view.set(index, value)
    }

    pub fn slice(&self, begin: usize, end: usize) -> Result<Self> {
        let sliced = self.borrowed().slice(begin, end)?;
        let raw = RawBits {
            data: sliced.data().cast_mut(),
            bit_offset: sliced.bit_offset(),
            len: sliced.len(),
            writable: self.writable,
        };
        Ok(self.derive(raw))
    }

    pub fn all(&self) -> bool {
        self.borrowed().all()
    }

    pub fn any(&self) -> bool {
        self.borrowed().any()
    }

    pub fn none(&self) -> bool {
        self.borrowed().none()
    }

    pub fn count_ones(&self) -> usize {
        self.borrowed().count_ones()
    }

    pub fn to_vec(&self) -> Vec<bool> {
        self.borrowed().iter().collect()
    }

    pub fn as_strided(&self) -> StridedBitBuffer<1> {
        self.derive(self.view().as_strided())
    }

    pub fn every(&self, step: isize) -> Result<StridedBitBuffer<1>> {
        let strided = self.as_strided();
        if step < 0 {
            return strided.flipped(0)?.every(Stride::new([step_magnitude(step)?]));
        }
        strided.every(Stride::new([step]))
    }

    pub fn flipped(&self) -> StridedBitBuffer<1> {
        let raw = self.view().as_strided();
        let layout = Layout::new(raw.size(), Stride::new([-1]));
        self.derive(raw.rebased_to(self.len.saturating_sub(1) as isize, layout))
    }
}

impl<const D: usize> StridedBitBuffer<D> {
    /// Take ownership of `bytes` as row-major packed bits of `size`, starting
    /// at bit `offset`.
    pub fn from_vec(bytes: Vec<u8>, offset: usize, size: Size<D>) -> Result<Self> {
        let layout = Layout::contiguous(size, 1);
        let bits = bytes.len().saturating_mul(8);
        layout.check_fits(base_offset(offset, bits)?, 1, bits)?;
        let (owner, data, _) = heap_owner(bytes);
        Ok(Owned::new(
            RawStridedBits {
                data: data.wrapping_add(offset / 8),
                bit_offset: (offset % 8) as u8,
                layout,
                writable: true,
            },
            Some(owner),
        ))
    }

    /// # Safety
    /// Every bit the layout addresses from `(data, bit_offset)` must stay
    /// valid while `owner` is alive and be writable if `writable` is set.
    /// `bit_offset` must be less than 8.
    pub unsafe fn from_raw_parts(
        data: *mut u8,
        bit_offset: u8,
        layout: Layout<D>,
        writable: bool,
        owner: Option<Owner>,
    ) -> Self {
        Owned::new(
            RawStridedBits {
                data,
                bit_offset,
                layout,
                writable,
            },
            owner,
        )
    }

    pub fn read_only(&self) -> Self {
        let mut raw = *self.view();
        raw.writable = false;
        self.derive(raw)
    }

    pub fn get(&self, index: Size<D>) -> Result<bool> {
        self.borrowed().get(index)
    }

    pub fn set(&self, index: Size<D>, value: bool) -> Result<()> {
        if !self.writable {
            return Err(StridedError::ReadOnly);
        }
        // SAFETY: writable, kept alive by the owner, no other reference to these bits
        let mut view = unsafe {
            StridedBitArrayViewMut::from_raw_parts(self.data, self.bit_offset, self.layout)
        };
        view.set(index, value)
    }

    pub fn to_vec(&self) -> Vec<bool> {
        self.borrowed().to_vec()
    }
}

// ============================================================================
// Transformations
// ============================================================================

/// Shape operations on owned strided views. Each result shares the owner of
/// its input, or drops it when the result addresses no element.
macro_rules! impl_owned_transforms {
    ($raw:ident) => {
        impl<const D: usize> Owned<$raw<D>> {
            pub fn slice(&self, begin: Size<D>, end: Size<D>) -> Result<Self> {
                let (delta, layout) = self.layout.slice(begin, end)?;
                Ok(self.derive(self.rebased_to(delta, layout)))
            }

            pub fn slice_axis(&self, axis: usize, begin: usize, end: usize) -> Result<Self> {
                let (delta, layout) = self.layout.slice_axis(axis, begin, end)?;
                Ok(self.derive(self.rebased_to(delta, layout)))
            }

            /// Apply a host `start:stop:step` slice to `axis`.
            pub fn sliced(&self, axis: usize, spec: SliceSpec) -> Result<Self> {
                let (delta, layout) = self.layout.sliced(axis, spec)?;
                Ok(self.derive(self.rebased_to(delta, layout)))
            }

            pub fn flipped(&self, axis: usize) -> Result<Self> {
                let (delta, layout) = self.layout.flipped(axis)?;
                Ok(self.derive(self.rebased_to(delta, layout)))
            }

            /// Repeat the single-element `axis` `size` times. Writes through
            /// the result are rejected.
            pub fn broadcasted(&self, axis: usize, size: usize) -> Result<Self> {
                let layout = self.layout.broadcasted(axis, size)?;
                Ok(self.derive(self.rebased_to(0, layout)))
            }

            pub fn every(&self, steps: Stride<D>) -> Result<Self> {
                let layout = self.layout.every(steps)?;
                Ok(self.derive(self.rebased_to(0, layout)))
            }

            pub fn transposed(&self, a: usize, b: usize) -> Result<Self> {
                let layout = self.layout.transposed(a, b)?;
                Ok(self.derive(self.rebased_to(0, layout)))
            }

            pub fn expanded<const K: usize, const E: usize>(
                &self,
                axis: usize,
                sizes: Size<K>,
            ) -> Result<Owned<$raw<E>>> {
                let layout = self.layout.expanded::<K, E>(axis, sizes)?;
                Ok(self.derive(self.rebased_to(0, layout)))
            }

            pub fn collapsed<const E: usize>(&self, axis: usize) -> Result<Owned<$raw<E>>> {
                let layout = self.layout.collapsed::<E>(axis)?;
                Ok(self.derive(self.rebased_to(0, layout)))
            }
        }
    };
}

impl_owned_transforms!(RawStrided);
impl_owned_transforms!(RawStridedBits);

macro_rules! impl_owned_at {
    ($($d:literal => $e:literal),*) => {
        $(
            impl Owned<RawStrided<$d>> {
                /// Sub-view at `index` along the outermost dimension.
                pub fn at(&self, index: usize) -> Result<Owned<RawStrided<$e>>> {
                    let (delta, layout) = self.layout.at::<$e>(index)?;
                    Ok(self.derive(self.rebased_to(delta, layout)))
                }
            }

            impl Owned<RawStridedBits<$d>> {
                pub fn at(&self, index: usize) -> Result<Owned<RawStridedBits<$e>>> {
                    let (delta, layout) = self.layout.at::<$e>(index)?;
                    Ok(self.derive(self.rebased_to(delta, layout)))
                }
            }
        )*
    };
}

impl_owned_at!(2 => 1, 3 => 2, 4 => 3);
