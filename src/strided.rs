//! Typed strided views with byte strides.
//!
//! [`StridedArrayView`] and [`StridedArrayViewMut`] address `T` elements at
//! `base + Σ index[i] * stride[i]` bytes. Strides may be negative (flipped) or
//! zero (broadcast). Every transformation is delegated to [`Layout`] and only
//! moves the base pointer; no element is ever copied.
//!
//! Elements are read and written by value with unaligned loads and stores, so
//! views over arbitrary byte buffers work for any stride.

use std::fmt;
use std::marker::PhantomData;

use bytemuck::Pod;

use crate::dims::{Size, Stride};
use crate::format::{Component, FormatAccessor};
use crate::layout::{base_offset, Layout, SliceSpec};
use crate::{Result, StridedError};

/// Element types with a compile-time format.
pub trait Element: Pod {
    const COMPONENT: Component;
    /// Channels per element.
    const COUNT: usize = 1;

    #[inline]
    fn accessor() -> FormatAccessor {
        Self::COMPONENT.accessor(Self::COUNT)
    }
}

macro_rules! impl_element {
    ($($t:ty => $component:ident),* $(,)?) => {
        $(
            impl Element for $t {
                const COMPONENT: Component = Component::$component;
            }

            impl Element for [$t; 2] {
                const COMPONENT: Component = Component::$component;
                const COUNT: usize = 2;
            }

            impl Element for [$t; 3] {
                const COMPONENT: Component = Component::$component;
                const COUNT: usize = 3;
            }

            impl Element for [$t; 4] {
                const COMPONENT: Component = Component::$component;
                const COUNT: usize = 4;
            }
        )*
    };
}

impl_element! {
    u8 => U8,
    i8 => I8,
    u16 => U16,
    i16 => I16,
    u32 => U32,
    i32 => I32,
    u64 => U64,
    i64 => I64,
    f32 => F32,
    f64 => F64,
}

#[cfg(feature = "half")]
impl_element! {
    half::f16 => F16,
}

/// Check that a byte layout of `T` elements fits into `available` bytes.
fn check_bytes<T, const D: usize>(layout: &Layout<D>, available: usize) -> Result<()> {
    layout.check_fits(0, std::mem::size_of::<T>(), available)
}

/// An immutable strided view of `T` elements.
pub struct StridedArrayView<'a, T, const D: usize> {
    data: *const u8,
    layout: Layout<D>,
    _marker: PhantomData<&'a [T]>,
}

/// A mutable strided view of `T` elements.
pub struct StridedArrayViewMut<'a, T, const D: usize> {
    data: *mut u8,
    layout: Layout<D>,
    _marker: PhantomData<&'a mut [T]>,
}

impl<T, const D: usize> Clone for StridedArrayView<'_, T, D> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T, const D: usize> Copy for StridedArrayView<'_, T, D> {}

impl<'a, T: Element, const D: usize> StridedArrayView<'a, T, D> {
    /// View `data` with the given sizes and byte strides, starting at its
    /// first element.
    ///
    /// # Errors
    /// Returns an error if any addressed element lies outside `data`.
    pub fn new(data: &'a [T], size: Size<D>, stride: Stride<D>) -> Result<Self> {
        let layout = Layout::new(size, stride);
        check_bytes::<T, D>(&layout, std::mem::size_of_val(data))?;
        Ok(Self {
            data: data.as_ptr().cast(),
            layout,
            _marker: PhantomData,
        })
    }

    /// View `data` as a row-major array of `size`.
    pub fn contiguous(data: &'a [T], size: Size<D>) -> Result<Self> {
        Self::new(data, size, Layout::contiguous(size, std::mem::size_of::<T>()).stride())
    }

    /// View raw bytes as `T` elements with the given byte layout, starting at
    /// `offset` bytes into `data`.
    pub fn from_bytes(
        data: &'a [u8],
        offset: usize,
        size: Size<D>,
        stride: Stride<D>,
    ) -> Result<Self> {
        let layout = Layout::new(size, stride);
        let base = base_offset(offset, data.len())?;
        layout.check_fits(base, std::mem::size_of::<T>(), data.len())?;
        Ok(Self {
            data: data.as_ptr().wrapping_add(offset),
            layout,
            _marker: PhantomData,
        })
    }

    /// Create a view from a base pointer and a byte layout.
    ///
    /// # Safety
    /// Every element the layout addresses must be readable for `'a` and not
    /// written through any other path while the view is in use.
    pub unsafe fn from_raw_parts(data: *const u8, layout: Layout<D>) -> Self {
        Self {
            data,
            layout,
            _marker: PhantomData,
        }
    }

    #[inline]
    fn rebased(&self, delta: isize, layout: Layout<D>) -> Self {
        Self {
            data: self.data.wrapping_offset(delta),
            layout,
            _marker: PhantomData,
        }
    }

    #[inline]
    fn rebased_to<const E: usize>(
        &self,
        delta: isize,
        layout: Layout<E>,
    ) -> StridedArrayView<'a, T, E> {
        StridedArrayView {
            data: self.data.wrapping_offset(delta),
            layout,
            _marker: PhantomData,
        }
    }

    /// Base pointer, the address of the element at index zero.
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

    /// Whether elements are packed row-major without gaps.
    pub fn is_contiguous(&self) -> bool {
        self.layout.is_contiguous(std::mem::size_of::<T>())
    }

    pub fn accessor(&self) -> FormatAccessor {
        T::accessor()
    }

    /// Element at a multi-index.
    pub fn get(&self, index: Size<D>) -> Result<T> {
        let offset = self.layout.offset(&index)?;
        // SAFETY: the offset was bounds-checked against a layout that fits
        Ok(unsafe { self.read(offset) })
    }

    #[inline]
    unsafe fn read(&self, offset: isize) -> T {
        self.data.offset(offset).cast::<T>().read_unaligned()
    }

    /// Elements in row-major order.
    pub fn iter(&self) -> impl ExactSizeIterator<Item = T> + 'a {
        let view = *self;
        // SAFETY: offsets() only yields offsets of addressed elements
        self.layout
            .offsets()
            .map(move |offset| unsafe { view.read(offset) })
    }

    /// Copy all elements into a row-major `Vec`.
    pub fn to_vec(&self) -> Vec<T> {
        self.iter().collect()
    }

    /// Repeat the single-element `axis` `size` times.
    ///
    /// All indices along the axis alias one element afterwards.
    pub fn broadcasted(&self, axis: usize, size: usize) -> Result<Self> {
        Ok(self.rebased(0, self.layout.broadcasted(axis, size)?))
    }

    /// Split `axis` into `K` dimensions. `E` is `D + K - 1`.
    pub fn expanded<const K: usize, const E: usize>(
        &self,
        axis: usize,
        sizes: Size<K>,
    ) -> Result<StridedArrayView<'a, T, E>> {
        Ok(self.rebased_to(0, self.layout.expanded::<K, E>(axis, sizes)?))
    }

    /// Merge the dimensions from `axis` on into one so that `E` remain.
    pub fn collapsed<const E: usize>(&self, axis: usize) -> Result<StridedArrayView<'a, T, E>> {
        Ok(self.rebased_to(0, self.layout.collapsed::<E>(axis)?))
    }
}

impl<'a, T: Element, const D: usize> StridedArrayViewMut<'a, T, D> {
    /// Mutable counterpart of [`StridedArrayView::new`].
    pub fn new(data: &'a mut [T], size: Size<D>, stride: Stride<D>) -> Result<Self> {
        let layout = Layout::new(size, stride);
        check_bytes::<T, D>(&layout, std::mem::size_of_val(data))?;
        Ok(Self {
            data: data.as_mut_ptr().cast(),
            layout,
            _marker: PhantomData,
        })
    }

    pub fn contiguous(data: &'a mut [T], size: Size<D>) -> Result<Self> {
        let stride = Layout::contiguous(size, std::mem::size_of::<T>()).stride();
        Self::new(data, size, stride)
    }

    pub fn from_bytes(
        data: &'a mut [u8],
        offset: usize,
        size: Size<D>,
        stride: Stride<D>,
    ) -> Result<Self> {
        let layout = Layout::new(size, stride);
        let base = base_offset(offset, data.len())?;
        layout.check_fits(base, std::mem::size_of::<T>(), data.len())?;
        Ok(Self {
            data: data.as_mut_ptr().wrapping_add(offset),
            layout,
            _marker: PhantomData,
        })
    }

    /// # Safety
    /// Every element the layout addresses must be readable and writable for
    /// `'a` and not accessed through any other path while the view is in use.
    pub unsafe fn from_raw_parts(data: *mut u8, layout: Layout<D>) -> Self {
        Self {
            data,
            layout,
            _marker: PhantomData,
        }
    }

    #[inline]
    fn rebased(self, delta: isize, layout: Layout<D>) -> Self {
        Self {
            data: self.data.wrapping_offset(delta),
            layout,
            _marker: PhantomData,
        }
    }

    #[inline]
    fn rebased_to<const E: usize>(
        self,
        delta: isize,
        layout: Layout<E>,
    ) -> StridedArrayViewMut<'a, T, E> {
        StridedArrayViewMut {
            data: self.data.wrapping_offset(delta),
            layout,
            _marker: PhantomData,
        }
    }

    #[inline]
    pub fn data(&self) -> *mut u8 {
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

    pub fn is_contiguous(&self) -> bool {
        self.layout.is_contiguous(std::mem::size_of::<T>())
    }

    /// Reborrow as an immutable view.
    #[inline]
    pub fn as_view(&self) -> StridedArrayView<'_, T, D> {
        StridedArrayView {
            data: self.data,
            layout: self.layout,
            _marker: PhantomData,
        }
    }

    /// Reborrow mutably for a shorter lifetime.
    #[inline]
    pub fn reborrow(&mut self) -> StridedArrayViewMut<'_, T, D> {
        StridedArrayViewMut {
            data: self.data,
            layout: self.layout,
            _marker: PhantomData,
        }
    }

    pub fn get(&self, index: Size<D>) -> Result<T> {
        self.as_view().get(index)
    }

    /// Store `value` at a multi-index.
    ///
    /// # Errors
    /// Fails for out-of-range indices and when some dimension aliases several
    /// indices to one element.
    pub fn set(&mut self, index: Size<D>, value: T) -> Result<()> {
        if let Some(dim) = self.layout.aliased_axis() {
            return Err(StridedError::BroadcastWrite { dim });
        }
        let offset = self.layout.offset(&index)?;
        // SAFETY: the offset was bounds-checked against a layout that fits
        unsafe { self.data.offset(offset).cast::<T>().write_unaligned(value) };
        Ok(())
    }

    /// Copy elements from an iterator in row-major order, stopping at the
    /// shorter of the two.
    pub fn fill_from<I: IntoIterator<Item = T>>(&mut self, values: I) -> Result<()> {
        if let Some(dim) = self.layout.aliased_axis() {
            return Err(StridedError::BroadcastWrite { dim });
        }
        for (offset, value) in self.layout.offsets().zip(values) {
            // SAFETY: offsets() only yields offsets of addressed elements
            unsafe { self.data.offset(offset).cast::<T>().write_unaligned(value) };
        }
        Ok(())
    }

    pub fn to_vec(&self) -> Vec<T> {
        self.as_view().to_vec()
    }

    pub fn expanded<const K: usize, const E: usize>(
        self,
        axis: usize,
        sizes: Size<K>,
    ) -> Result<StridedArrayViewMut<'a, T, E>> {
        let layout = self.layout.expanded::<K, E>(axis, sizes)?;
        Ok(self.rebased_to(0, layout))
    }

    pub fn collapsed<const E: usize>(self, axis: usize) -> Result<StridedArrayViewMut<'a, T, E>> {
        let layout = self.layout.collapsed::<E>(axis)?;
        Ok(self.rebased_to(0, layout))
    }
}

/// Same-dimension transformations shared by both view kinds. Immutable views
/// are `Copy`, mutable ones are consumed.
macro_rules! impl_transforms {
    ($view:ident) => {
        impl<'a, T: Element, const D: usize> $view<'a, T, D> {
            /// Narrow every dimension to `begin[i]..end[i]`.
            pub fn slice(self, begin: Size<D>, end: Size<D>) -> Result<Self> {
                let (delta, layout) = self.layout.slice(begin, end)?;
                Ok(self.rebased(delta, layout))
            }

            /// Narrow `axis` to `begin..end`.
            pub fn slice_axis(self, axis: usize, begin: usize, end: usize) -> Result<Self> {
                let (delta, layout) = self.layout.slice_axis(axis, begin, end)?;
                Ok(self.rebased(delta, layout))
            }

            /// Apply a host `start:stop:step` slice to `axis`.
            pub fn sliced(self, axis: usize, spec: SliceSpec) -> Result<Self> {
                let (delta, layout) = self.layout.sliced(axis, spec)?;
                Ok(self.rebased(delta, layout))
            }

            /// Reverse `axis`.
            pub fn flipped(self, axis: usize) -> Result<Self> {
                let (delta, layout) = self.layout.flipped(axis)?;
                Ok(self.rebased(delta, layout))
            }

            /// Take every `steps[i]`-th element. Steps must be positive.
            pub fn every(self, steps: Stride<D>) -> Result<Self> {
                let layout = self.layout.every(steps)?;
                Ok(self.rebased(0, layout))
            }

            pub fn transposed(self, a: usize, b: usize) -> Result<Self> {
                let layout = self.layout.transposed(a, b)?;
                Ok(self.rebased(0, layout))
            }
        }

        impl<T, const D: usize> fmt::Debug for $view<'_, T, D> {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.debug_struct(stringify!($view))
                    .field("data", &self.data)
                    .field("size", &self.layout.size())
                    .field("stride", &self.layout.stride())
                    .finish()
            }
        }
    };
}

impl_transforms!(StridedArrayView);
impl_transforms!(StridedArrayViewMut);

/// Outer indexing for each arity that has a lower one.
macro_rules! impl_at {
    ($($d:literal => $e:literal),*) => {
        $(
            impl<'a, T: Element> StridedArrayView<'a, T, $d> {
                /// Sub-view at `index` along the outermost dimension.
                pub fn at(&self, index: usize) -> Result<StridedArrayView<'a, T, $e>> {
                    let (delta, layout) = self.layout.at::<$e>(index)?;
                    Ok(self.rebased_to(delta, layout))
                }
            }

            impl<'a, T: Element> StridedArrayViewMut<'a, T, $d> {
                pub fn at(self, index: usize) -> Result<StridedArrayViewMut<'a, T, $e>> {
                    let (delta, layout) = self.layout.at::<$e>(index)?;
                    Ok(self.rebased_to(delta, layout))
                }
            }
        )*
    };
}

impl_at!(2 => 1, 3 => 2, 4 => 3);

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn floats() -> Vec<f32> {
        vec![0.0, 1.0, 2.0, 3.0, 4.0, 5.0]
    }

    #[test]
    fn test_new_checks_bounds() {
        let data = floats();
        assert!(StridedArrayView::new(&data, Size::new([2, 3]), Stride::new([12, 4])).is_ok());
        assert!(matches!(
            StridedArrayView::new(&data, Size::new([3, 3]), Stride::new([12, 4])),
            Err(StridedError::ViewOutOfBounds {
                required: 36,
                available: 24
            })
        ));
    }

    #[test]
    fn test_new_rejects_overflowing_layouts() {
        let bytes = [0u8; 4];
        assert!(matches!(
            StridedArrayView::new(&bytes, Size::new([3]), Stride::new([isize::MAX])),
            Err(StridedError::ViewOutOfBounds { .. })
        ));
        assert!(matches!(
            StridedArrayView::<u8, 1>::from_bytes(
                &bytes,
                usize::MAX,
                Size::new([1]),
                Stride::new([1])
            ),
            Err(StridedError::ViewOutOfBounds {
                required: usize::MAX,
                available: 4
            })
        ));

        let data = floats();
        let view = StridedArrayView::contiguous(&data, Size::new([6])).unwrap();
        let last = view.sliced(0, SliceSpec::step(isize::MIN)).unwrap();
        assert_eq!(last.to_vec(), vec![5.0]);
    }

    #[test]
    fn test_slice_then_flip() {
        let data = floats();
        let view = StridedArrayView::contiguous(&data, Size::new([2, 3])).unwrap();
        let view = view
            .slice(Size::new([1, 0]), Size::new([2, 3]))
            .unwrap()
            .flipped(1)
            .unwrap();
        assert_eq!(view.size(), Size::new([1, 3]));
        assert_relative_eq!(view.get(Size::new([0, 0])).unwrap(), 5.0);
        assert_relative_eq!(view.get(Size::new([0, 2])).unwrap(), 3.0);
        assert_eq!(view.to_vec(), vec![5.0, 4.0, 3.0]);
    }

    #[test]
    fn test_at_and_transposed() {
        let data: Vec<u16> = (0..12).collect();
        let view = StridedArrayView::contiguous(&data, Size::new([3, 4])).unwrap();
        let row = view.at(2).unwrap();
        assert_eq!(row.to_vec(), vec![8, 9, 10, 11]);
        let t = view.transposed(0, 1).unwrap();
        assert_eq!(t.at(1).unwrap().to_vec(), vec![1, 5, 9]);
        assert!(!t.is_contiguous());
        assert!(view.is_contiguous());
    }

    #[test]
    fn test_broadcast_aliases() {
        let data = [1i32, 2, 3, 4, 5];
        let view = StridedArrayView::contiguous(&data, Size::new([1, 5])).unwrap();
        let b = view.broadcasted(0, 4).unwrap();
        assert_eq!(b.size(), Size::new([4, 5]));
        for i in 0..4 {
            assert_eq!(b.get(Size::new([i, 3])).unwrap(), 4);
        }
    }

    #[test]
    fn test_mut_set_and_broadcast_write() {
        let mut data = [0u8; 6];
        {
            let mut view = StridedArrayViewMut::contiguous(&mut data, Size::new([2, 3])).unwrap();
            view.set(Size::new([1, 2]), 9).unwrap();
            assert!(view.set(Size::new([2, 0]), 1).is_err());
        }
        assert_eq!(data, [0, 0, 0, 0, 0, 9]);

        // A zero stride can only come in through the raw constructor.
        let mut one = [0u8; 5];
        let layout = Layout::new(Size::new([4, 5]), Stride::new([0, 1]));
        // SAFETY: every addressed byte lies within `one`
        let mut view =
            unsafe { StridedArrayViewMut::<u8, 2>::from_raw_parts(one.as_mut_ptr(), layout) };
        assert!(matches!(
            view.set(Size::new([2, 3]), 1),
            Err(StridedError::BroadcastWrite { dim: 0 })
        ));
    }

    #[test]
    fn test_expand_and_collapse() {
        let data: Vec<u32> = (0..12).collect();
        let view = StridedArrayView::contiguous(&data, Size::new([12])).unwrap();
        let e: StridedArrayView<'_, u32, 3> = view.expanded(0, Size::new([2, 3, 2])).unwrap();
        assert_eq!(e.get(Size::new([1, 2, 1])).unwrap(), 11);
        assert_eq!(e.to_vec(), data);
        let c: StridedArrayView<'_, u32, 1> = e.collapsed(0).unwrap();
        assert_eq!(c.stride(), Stride::new([4]));
        assert_eq!(c.to_vec(), data);
    }

    #[test]
    fn test_sliced_negative_step() {
        let data: Vec<i16> = (0..6).collect();
        let view = StridedArrayView::contiguous(&data, Size::new([6])).unwrap();
        let s = view.sliced(0, SliceSpec::new(Some(4), None, Some(-2))).unwrap();
        assert_eq!(s.to_vec(), vec![4, 2, 0]);
    }

    #[test]
    fn test_from_bytes_padded_rows() {
        // Two rows of two u16 with a two-byte pad after each row.
        let bytes = [1u8, 0, 2, 0, 0xff, 0xff, 3, 0, 4, 0, 0xff, 0xff];
        let view = StridedArrayView::<u16, 2>::from_bytes(
            &bytes,
            0,
            Size::new([2, 2]),
            Stride::new([6, 2]),
        )
        .unwrap();
        let expected: Vec<u16> = [1u8, 2, 3, 4]
            .iter()
            .map(|&b| u16::from_le_bytes([b, 0]))
            .collect();
        assert_eq!(view.to_vec(), expected);
        assert!(!view.is_contiguous());
    }

    #[test]
    fn test_vector_elements() {
        let data = [[1.0f32, 2.0, 3.0], [4.0, 5.0, 6.0]];
        let view = StridedArrayView::contiguous(&data, Size::new([2])).unwrap();
        assert_eq!(view.accessor().format(), Some("3f"));
        assert_eq!(view.get(Size::new([1])).unwrap(), [4.0, 5.0, 6.0]);
    }

    #[test]
    fn test_fill_from() {
        let mut data = [0i64; 4];
        let view = StridedArrayViewMut::contiguous(&mut data, Size::new([2, 2])).unwrap();
        let mut t = view.transposed(0, 1).unwrap();
        t.fill_from([1, 2, 3, 4]).unwrap();
        assert_eq!(data, [1, 3, 2, 4]);
    }
}
