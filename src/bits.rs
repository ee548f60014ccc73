//! Bit-addressed views.
//!
//! The address unit is a single bit: a view holds a byte pointer plus a bit
//! offset in `0..8`, and strides count bits. Bits are numbered from the least
//! significant bit of each byte. The shape/stride algebra is the same
//! [`Layout`] the byte views use; only the way a base offset is applied
//! differs, see [`advance`].
//!
//! Bit views carry no format. Every element is a `bool`.

use std::fmt;
use std::marker::PhantomData;

use crate::dims::{Size, Stride};
use crate::layout::{base_offset, step_magnitude, Layout, SliceSpec};
use crate::{Result, StridedError};

/// Move a `(byte, bit)` base by `delta` bits, normalizing the bit offset back
/// into `0..8`.
#[inline]
pub(crate) fn advance(data: *const u8, bit_offset: u8, delta: isize) -> (*const u8, u8) {
    let total = bit_offset as isize + delta;
    (
        data.wrapping_offset(total.div_euclid(8)),
        total.rem_euclid(8) as u8,
    )
}

/// Read the bit `offset` bits away from `(data, bit_offset)`.
///
/// # Safety
/// The addressed byte must be readable.
#[inline]
pub(crate) unsafe fn read_bit(data: *const u8, bit_offset: u8, offset: isize) -> bool {
    let (byte, bit) = advance(data, bit_offset, offset);
    (byte.read() >> bit) & 1 != 0
}

/// # Safety
/// The addressed byte must be writable and not borrowed elsewhere.
#[inline]
pub(crate) unsafe fn write_bit(data: *mut u8, bit_offset: u8, offset: isize, value: bool) {
    let (byte, bit) = advance(data, bit_offset, offset);
    let byte = byte.cast_mut();
    let mask = 1u8 << bit;
    if value {
        *byte |= mask;
    } else {
        *byte &= !mask;
    }
}

/// Fold a bit offset of any size into the byte pointer.
#[inline]
fn normalize(offset: usize) -> (usize, u8) {
    (offset / 8, (offset % 8) as u8)
}

pub(crate) fn check_bits(offset: usize, len: usize, available_bytes: usize) -> Result<()> {
    let available = available_bytes.saturating_mul(8);
    let required = offset.checked_add(len).unwrap_or(usize::MAX);
    if required > available {
        return Err(StridedError::ViewOutOfBounds {
            required,
            available,
        });
    }
    Ok(())
}

// ============================================================================
// Contiguous bit views
// ============================================================================

/// An immutable view of consecutive bits.
#[derive(Clone, Copy)]
pub struct BitArrayView<'a> {
    data: *const u8,
    bit_offset: u8,
    len: usize,
    _marker: PhantomData<&'a [u8]>,
}

/// A mutable view of consecutive bits.
pub struct BitArrayViewMut<'a> {
    data: *mut u8,
    bit_offset: u8,
    len: usize,
    _marker: PhantomData<&'a mut [u8]>,
}

impl<'a> BitArrayView<'a> {
    /// `len` bits of `data` starting at bit `offset`.
    pub fn new(data: &'a [u8], offset: usize, len: usize) -> Result<Self> {
        check_bits(offset, len, data.len())?;
        let (byte, bit) = normalize(offset);
        Ok(Self {
            data: data.as_ptr().wrapping_add(byte),
            bit_offset: bit,
            len,
            _marker: PhantomData,
        })
    }

    /// # Safety
    /// Bits `bit_offset..bit_offset + len` from `data` must be readable for
    /// `'a`. `bit_offset` must be less than 8.
    pub unsafe fn from_raw_parts(data: *const u8, bit_offset: u8, len: usize) -> Self {
        Self {
            data,
            bit_offset,
            len,
            _marker: PhantomData,
        }
    }

    #[inline]
    pub fn data(&self) -> *const u8 {
        self.data
    }

    /// Offset of the first bit within the first byte, in `0..8`.
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

    pub fn get(&self, index: usize) -> Result<bool> {
        if index >= self.len {
            return Err(StridedError::IndexOutOfRange {
                dim: 0,
                index,
                size: self.len,
            });
        }
        // SAFETY: index is within the view
        Ok(unsafe { read_bit(self.data, self.bit_offset, index as isize) })
    }

    pub fn slice(&self, begin: usize, end: usize) -> Result<Self> {
        if begin > end || end > self.len {
            return Err(StridedError::SliceOutOfRange {
                dim: 0,
                begin,
                end,
                size: self.len,
            });
        }
        let (data, bit_offset) = advance(self.data, self.bit_offset, begin as isize);
        Ok(Self {
            data,
            bit_offset,
            len: end - begin,
            _marker: PhantomData,
        })
    }

    pub fn iter(&self) -> impl ExactSizeIterator<Item = bool> + 'a {
        let (data, bit_offset) = (self.data, self.bit_offset);
        // SAFETY: every index below len is within the view
        (0..self.len).map(move |i| unsafe { read_bit(data, bit_offset, i as isize) })
    }

    pub fn count_ones(&self) -> usize {
        self.iter().filter(|&b| b).count()
    }

    /// Whether every bit is set. True for an empty view.
    pub fn all(&self) -> bool {
        self.iter().all(|b| b)
    }

    /// Whether any bit is set.
    pub fn any(&self) -> bool {
        self.iter().any(|b| b)
    }

    /// Whether no bit is set. True for an empty view.
    pub fn none(&self) -> bool {
        !self.any()
    }

    pub fn as_strided(&self) -> StridedBitArrayView<'a, 1> {
        StridedBitArrayView {
            data: self.data,
            bit_offset: self.bit_offset,
            layout: Layout::contiguous(Size::new([self.len]), 1),
            _marker: PhantomData,
        }
    }

    /// Every `step`-th bit, walking backwards for a negative step.
    pub fn every(&self, step: isize) -> Result<StridedBitArrayView<'a, 1>> {
        let view = self.as_strided();
        if step < 0 {
            return view.flipped(0)?.every(Stride::new([step_magnitude(step)?]));
        }
        view.every(Stride::new([step]))
    }

    pub fn flipped(&self) -> StridedBitArrayView<'a, 1> {
        let layout = Layout::new(Size::new([self.len]), Stride::new([-1]));
        self.as_strided()
            .rebased(self.len.saturating_sub(1) as isize, layout)
    }
}

impl<'a> BitArrayViewMut<'a> {
    pub fn new(data: &'a mut [u8], offset: usize, len: usize) -> Result<Self> {
        check_bits(offset, len, data.len())?;
        let (byte, bit) = normalize(offset);
        Ok(Self {
            data: data.as_mut_ptr().wrapping_add(byte),
            bit_offset: bit,
            len,
            _marker: PhantomData,
        })
    }

    /// # Safety
    /// Bits `bit_offset..bit_offset + len` from `data` must be readable and
    /// writable for `'a` and not accessed through any other path.
    pub unsafe fn from_raw_parts(data: *mut u8, bit_offset: u8, len: usize) -> Self {
        Self {
            data,
            bit_offset,
            len,
            _marker: PhantomData,
        }
    }

    #[inline]
    pub fn as_view(&self) -> BitArrayView<'_> {
        BitArrayView {
            data: self.data,
            bit_offset: self.bit_offset,
            len: self.len,
            _marker: PhantomData,
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn get(&self, index: usize) -> Result<bool> {
        self.as_view().get(index)
    }

    pub fn set(&mut self, index: usize, value: bool) -> Result<()> {
        if index >= self.len {
            return Err(StridedError::IndexOutOfRange {
                dim: 0,
                index,
                size: self.len,
            });
        }
        // SAFETY: index is within the view
        unsafe { write_bit(self.data, self.bit_offset, index as isize, value) };
        Ok(())
    }

    /// Set every bit to `value`.
    pub fn fill(&mut self, value: bool) {
        for i in 0..self.len {
            // SAFETY: every index below len is within the view
            unsafe { write_bit(self.data, self.bit_offset, i as isize, value) };
        }
    }

    pub fn slice(self, begin: usize, end: usize) -> Result<Self> {
        let (data, bit_offset, len) = {
            let view = self.as_view().slice(begin, end)?;
            (view.data, view.bit_offset, view.len)
        };
        Ok(Self {
            data: data.cast_mut(),
            bit_offset,
            len,
            _marker: PhantomData,
        })
    }

    pub fn into_strided(self) -> StridedBitArrayViewMut<'a, 1> {
        StridedBitArrayViewMut {
            data: self.data,
            bit_offset: self.bit_offset,
            layout: Layout::contiguous(Size::new([self.len]), 1),
            _marker: PhantomData,
        }
    }
}

impl fmt::Debug for BitArrayView<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("BitArrayView{")?;
        for bit in self.iter() {
            f.write_str(if bit { "1" } else { "0" })?;
        }
        f.write_str("}")
    }
}

impl fmt::Debug for BitArrayViewMut<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&self.as_view(), f)
    }
}

// ============================================================================
// Strided bit views
// ============================================================================

/// An immutable strided view of bits. Strides are in bits.
#[derive(Clone, Copy)]
pub struct StridedBitArrayView<'a, const D: usize> {
    data: *const u8,
    bit_offset: u8,
    layout: Layout<D>,
    _marker: PhantomData<&'a [u8]>,
}

/// A mutable strided view of bits.
pub struct StridedBitArrayViewMut<'a, const D: usize> {
    data: *mut u8,
    bit_offset: u8,
    layout: Layout<D>,
    _marker: PhantomData<&'a mut [u8]>,
}

impl<'a, const D: usize> StridedBitArrayView<'a, D> {
    /// View bits of `data` starting at bit `offset` with the given sizes and
    /// bit strides.
    pub fn new(data: &'a [u8], offset: usize, size: Size<D>, stride: Stride<D>) -> Result<Self> {
        let layout = Layout::new(size, stride);
        let bits = data.len().saturating_mul(8);
        layout.check_fits(base_offset(offset, bits)?, 1, bits)?;
        let (byte, bit) = normalize(offset);
        Ok(Self {
            data: data.as_ptr().wrapping_add(byte),
            bit_offset: bit,
            layout,
            _marker: PhantomData,
        })
    }

    /// Row-major packed bits of `size`, starting at bit `offset`.
    pub fn contiguous(data: &'a [u8], offset: usize, size: Size<D>) -> Result<Self> {
        Self::new(data, offset, size, Layout::contiguous(size, 1).stride())
    }

    /// # Safety
    /// Every bit the layout addresses from `(data, bit_offset)` must be
    /// readable for `'a`. `bit_offset` must be less than 8.
    pub unsafe fn from_raw_parts(data: *const u8, bit_offset: u8, layout: Layout<D>) -> Self {
        Self {
            data,
            bit_offset,
            layout,
            _marker: PhantomData,
        }
    }

    #[inline]
    fn rebased(&self, delta: isize, layout: Layout<D>) -> Self {
        self.rebased_to(delta, layout)
    }

    #[inline]
    fn rebased_to<const E: usize>(
        &self,
        delta: isize,
        layout: Layout<E>,
    ) -> StridedBitArrayView<'a, E> {
        let (data, bit_offset) = advance(self.data, self.bit_offset, delta);
        StridedBitArrayView {
            data,
            bit_offset,
            layout,
            _marker: PhantomData,
        }
    }

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

    pub fn is_contiguous(&self) -> bool {
        self.layout.is_contiguous(1)
    }

    pub fn get(&self, index: Size<D>) -> Result<bool> {
        let offset = self.layout.offset(&index)?;
        // SAFETY: the offset was bounds-checked against a layout that fits
        Ok(unsafe { read_bit(self.data, self.bit_offset, offset) })
    }

    /// Bits in row-major order.
    pub fn iter(&self) -> impl ExactSizeIterator<Item = bool> + 'a {
        let (data, bit_offset) = (self.data, self.bit_offset);
        // SAFETY: offsets() only yields offsets of addressed bits
        self.layout
            .offsets()
            .map(move |offset| unsafe { read_bit(data, bit_offset, offset) })
    }

    pub fn to_vec(&self) -> Vec<bool> {
        self.iter().collect()
    }

    pub fn broadcasted(&self, axis: usize, size: usize) -> Result<Self> {
        Ok(self.rebased(0, self.layout.broadcasted(axis, size)?))
    }

    pub fn expanded<const K: usize, const E: usize>(
        &self,
        axis: usize,
        sizes: Size<K>,
    ) -> Result<StridedBitArrayView<'a, E>> {
        Ok(self.rebased_to(0, self.layout.expanded::<K, E>(axis, sizes)?))
    }

    pub fn collapsed<const E: usize>(&self, axis: usize) -> Result<StridedBitArrayView<'a, E>> {
        Ok(self.rebased_to(0, self.layout.collapsed::<E>(axis)?))
    }
}

impl<'a, const D: usize> StridedBitArrayViewMut<'a, D> {
    pub fn new(
        data: &'a mut [u8],
        offset: usize,
        size: Size<D>,
        stride: Stride<D>,
    ) -> Result<Self> {
        let layout = Layout::new(size, stride);
        let bits = data.len().saturating_mul(8);
        layout.check_fits(base_offset(offset, bits)?, 1, bits)?;
        let (byte, bit) = normalize(offset);
        Ok(Self {
            data: data.as_mut_ptr().wrapping_add(byte),
            bit_offset: bit,
            layout,
            _marker: PhantomData,
        })
    }

    pub fn contiguous(data: &'a mut [u8], offset: usize, size: Size<D>) -> Result<Self> {
        Self::new(data, offset, size, Layout::contiguous(size, 1).stride())
    }

    /// # Safety
    /// Every bit the layout addresses from `(data, bit_offset)` must be
    /// readable and writable for `'a` and not accessed through any other path.
    pub unsafe fn from_raw_parts(data: *mut u8, bit_offset: u8, layout: Layout<D>) -> Self {
        Self {
            data,
            bit_offset,
            layout,
            _marker: PhantomData,
        }
    }

    #[inline]
    fn rebased(self, delta: isize, layout: Layout<D>) -> Self {
        self.rebased_to(delta, layout)
    }

    #[inline]
    fn rebased_to<const E: usize>(
        self,
        delta: isize,
        layout: Layout<E>,
    ) -> StridedBitArrayViewMut<'a, E> {
        let (data, bit_offset) = advance(self.data, self.bit_offset, delta);
        StridedBitArrayViewMut {
            data: data.cast_mut(),
            bit_offset,
            layout,
            _marker: PhantomData,
        }
    }

    #[inline]
    pub fn as_view(&self) -> StridedBitArrayView<'_, D> {
        StridedBitArrayView {
            data: self.data,
            bit_offset: self.bit_offset,
            layout: self.layout,
            _marker: PhantomData,
        }
    }

    #[inline]
    pub fn size(&self) -> Size<D> {
        self.layout.size()
    }

    #[inline]
    pub fn stride(&self) -> Stride<D> {
        self.layout.stride()
    }

    pub fn get(&self, index: Size<D>) -> Result<bool> {
        self.as_view().get(index)
    }

    /// Store a bit. Fails through a dimension that aliases several indices.
    pub fn set(&mut self, index: Size<D>, value: bool) -> Result<()> {
        if let Some(dim) = self.layout.aliased_axis() {
            return Err(StridedError::BroadcastWrite { dim });
        }
        let offset = self.layout.offset(&index)?;
        // SAFETY: the offset was bounds-checked against a layout that fits
        unsafe { write_bit(self.data, self.bit_offset, offset, value) };
        Ok(())
    }

    pub fn to_vec(&self) -> Vec<bool> {
        self.as_view().to_vec()
    }

    pub fn expanded<const K: usize, const E: usize>(
        self,
        axis: usize,
        sizes: Size<K>,
    ) -> Result<StridedBitArrayViewMut<'a, E>> {
        let layout = self.layout.expanded::<K, E>(axis, sizes)?;
        Ok(self.rebased_to(0, layout))
    }

    pub fn collapsed<const E: usize>(self, axis: usize) -> Result<StridedBitArrayViewMut<'a, E>> {
        let layout = self.layout.collapsed::<E>(axis)?;
        Ok(self.rebased_to(0, layout))
    }
}

macro_rules! impl_bit_transforms {
    ($view:ident) => {
        impl<'a, const D: usize> $view<'a, D> {
            pub fn slice(self, begin: Size<D>, end: Size<D>) -> Result<Self> {
                let (delta, layout) = self.layout.slice(begin, end)?;
                Ok(self.rebased(delta, layout))
            }

            pub fn slice_axis(self, axis: usize, begin: usize, end: usize) -> Result<Self> {
                let (delta, layout) = self.layout.slice_axis(axis, begin, end)?;
                Ok(self.rebased(delta, layout))
            }

            pub fn sliced(self, axis: usize, spec: SliceSpec) -> Result<Self> {
                let (delta, layout) = self.layout.sliced(axis, spec)?;
                Ok(self.rebased(delta, layout))
            }

            pub fn flipped(self, axis: usize) -> Result<Self> {
                let (delta, layout) = self.layout.flipped(axis)?;
                Ok(self.rebased(delta, layout))
            }

            pub fn every(self, steps: Stride<D>) -> Result<Self> {
                let layout = self.layout.every(steps)?;
                Ok(self.rebased(0, layout))
            }

            pub fn transposed(self, a: usize, b: usize) -> Result<Self> {
                let layout = self.layout.transposed(a, b)?;
                Ok(self.rebased(0, layout))
            }
        }

        impl<const D: usize> fmt::Debug for $view<'_, D> {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.debug_struct(stringify!($view))
                    .field("data", &self.data)
                    .field("bit_offset", &self.bit_offset)
                    .field("size", &self.layout.size())
                    .field("stride", &self.layout.stride())
                    .finish()
            }
        }
    };
}

impl_bit_transforms!(StridedBitArrayView);
impl_bit_transforms!(StridedBitArrayViewMut);

macro_rules! impl_bit_at {
    ($($d:literal => $e:literal),*) => {
        $(
            impl<'a> StridedBitArrayView<'a, $d> {
                pub fn at(&self, index: usize) -> Result<StridedBitArrayView<'a, $e>> {
                    let (delta, layout) = self.layout.at::<$e>(index)?;
                    Ok(self.rebased_to(delta, layout))
                }
            }

            impl<'a> StridedBitArrayViewMut<'a, $d> {
                pub fn at(self, index: usize) -> Result<StridedBitArrayViewMut<'a, $e>> {
                    let (delta, layout) = self.layout.at::<$e>(index)?;
                    Ok(self.rebased_to(delta, layout))
                }
            }
        )*
    };
}

impl_bit_at!(2 => 1, 3 => 2, 4 => 3);
