//! Contiguous one-dimensional views.
//!
//! An [`ArrayView`] is the `D = 1`, `stride = size_of::<T>()` special case of a
//! strided view. It borrows a slice directly; operations that need another
//! stride ([`every`](ArrayView::every), [`flipped`](ArrayView::flipped))
//! return a [`StridedArrayView`] instead.

use crate::dims::{Size, Stride};
use crate::layout::{step_magnitude, Layout};
use crate::strided::{Element, StridedArrayView, StridedArrayViewMut};
use crate::{Result, StridedError};

fn check_range(begin: usize, end: usize, size: usize) -> Result<()> {
    if begin > end || end > size {
        return Err(StridedError::SliceOutOfRange {
            dim: 0,
            begin,
            end,
            size,
        });
    }
    Ok(())
}

fn check_index(index: usize, size: usize) -> Result<()> {
    if index >= size {
        return Err(StridedError::IndexOutOfRange {
            dim: 0,
            index,
            size,
        });
    }
    Ok(())
}

/// An immutable contiguous view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ArrayView<'a, T> {
    data: &'a [T],
}

/// A mutable contiguous view.
#[derive(Debug, PartialEq, Eq, Hash)]
pub struct ArrayViewMut<'a, T> {
    data: &'a mut [T],
}

impl<'a, T> ArrayView<'a, T> {
    #[inline]
    pub fn new(data: &'a [T]) -> Self {
        Self { data }
    }

    #[inline]
    pub fn data(&self) -> &'a [T] {
        self.data
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn get(&self, index: usize) -> Result<&'a T> {
        check_index(index, self.data.len())?;
        Ok(&self.data[index])
    }

    /// Narrow to `begin..end`.
    pub fn slice(&self, begin: usize, end: usize) -> Result<Self> {
        check_range(begin, end, self.data.len())?;
        Ok(Self {
            data: &self.data[begin..end],
        })
    }

    /// Narrow to `begin..`.
    pub fn suffix(&self, begin: usize) -> Result<Self> {
        self.slice(begin, self.data.len())
    }

    /// Narrow to `..end`.
    pub fn prefix(&self, end: usize) -> Result<Self> {
        self.slice(0, end)
    }
}

impl<'a, T: Element> ArrayView<'a, T> {
    /// The same elements as a one-dimensional strided view.
    pub fn as_strided(&self) -> StridedArrayView<'a, T, 1> {
        let layout = Layout::contiguous(Size::new([self.data.len()]), std::mem::size_of::<T>());
        // SAFETY: a contiguous layout over the whole slice
        unsafe { StridedArrayView::from_raw_parts(self.data.as_ptr().cast(), layout) }
    }

    /// Every `step`-th element. A negative step walks backwards from the last
    /// element.
    pub fn every(&self, step: isize) -> Result<StridedArrayView<'a, T, 1>> {
        let view = self.as_strided();
        if step < 0 {
            return view.flipped(0)?.every(Stride::new([step_magnitude(step)?]));
        }
        view.every(Stride::new([step]))
    }

    /// All elements in reverse order.
    pub fn flipped(&self) -> StridedArrayView<'a, T, 1> {
        let size = self.data.len();
        let stride = std::mem::size_of::<T>() as isize;
        let layout = Layout::new(Size::new([size]), Stride::new([-stride]));
        let base = self
            .data
            .as_ptr()
            .cast::<u8>()
            .wrapping_offset(size.saturating_sub(1) as isize * stride);
        // SAFETY: the layout addresses exactly the slice elements, last first
        unsafe { StridedArrayView::from_raw_parts(base, layout) }
    }
}

impl<'a, T> From<&'a [T]> for ArrayView<'a, T> {
    fn from(data: &'a [T]) -> Self {
        Self { data }
    }
}

impl<'a, T> ArrayViewMut<'a, T> {
    #[inline]
    pub fn new(data: &'a mut [T]) -> Self {
        Self { data }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    #[inline]
    pub fn as_view(&self) -> ArrayView<'_, T> {
        ArrayView { data: self.data }
    }

    pub fn get(&self, index: usize) -> Result<&T> {
        check_index(index, self.data.len())?;
        Ok(&self.data[index])
    }

    pub fn get_mut(&mut self, index: usize) -> Result<&mut T> {
        check_index(index, self.data.len())?;
        Ok(&mut self.data[index])
    }

    pub fn set(&mut self, index: usize, value: T) -> Result<()> {
        *self.get_mut(index)? = value;
        Ok(())
    }

    pub fn slice(self, begin: usize, end: usize) -> Result<Self> {
        check_range(begin, end, self.data.len())?;
        let data = self.data;
        Ok(Self {
            data: &mut data[begin..end],
        })
    }

    pub fn into_slice(self) -> &'a mut [T] {
        self.data
    }
}

impl<'a, T: Element> ArrayViewMut<'a, T> {
    pub fn into_strided(self) -> StridedArrayViewMut<'a, T, 1> {
        let layout = Layout::contiguous(Size::new([self.data.len()]), std::mem::size_of::<T>());
        // SAFETY: the view takes over the exclusive borrow of the slice
        unsafe { StridedArrayViewMut::from_raw_parts(self.data.as_mut_ptr().cast(), layout) }
    }

    pub fn every(self, step: isize) -> Result<StridedArrayViewMut<'a, T, 1>> {
        let view = self.into_strided();
        if step < 0 {
            return view.flipped(0)?.every(Stride::new([step_magnitude(step)?]));
        }
        view.every(Stride::new([step]))
    }

    pub fn flipped(self) -> StridedArrayViewMut<'a, T, 1> {
        let size = self.data.len();
        let stride = std::mem::size_of::<T>() as isize;
        let layout = Layout::new(Size::new([size]), Stride::new([-stride]));
        let base = self
            .data
            .as_mut_ptr()
            .cast::<u8>()
            .wrapping_offset(size.saturating_sub(1) as isize * stride);
        // SAFETY: the layout addresses exactly the slice elements, last first
        unsafe { StridedArrayViewMut::from_raw_parts(base, layout) }
    }
}

impl<'a, T> From<&'a mut [T]> for ArrayViewMut<'a, T> {
    fn from(data: &'a mut [T]) -> Self {
        Self { data }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slice_and_get() {
        let data = [1u8, 2, 3, 4, 5];
        let view = ArrayView::new(&data);
        let s = view.slice(1, 4).unwrap();
        assert_eq!(s.data(), &[2, 3, 4]);
        assert_eq!(*s.get(2).unwrap(), 4);
        assert!(matches!(
            s.get(3),
            Err(StridedError::IndexOutOfRange {
                dim: 0,
                index: 3,
                size: 3
            })
        ));
        assert!(view.slice(3, 2).is_err());
        assert!(view.slice(0, 6).is_err());
        assert!(view.slice(5, 5).unwrap().is_empty());
        assert_eq!(view.prefix(2).unwrap().data(), &[1, 2]);
        assert_eq!(view.suffix(3).unwrap().data(), &[4, 5]);
    }

    #[test]
    fn test_every_degrades_to_strided() {
        let data = [0i32, 1, 2, 3, 4, 5, 6];
        let view = ArrayView::new(&data);
        assert_eq!(view.every(3).unwrap().to_vec(), vec![0, 3, 6]);
        assert_eq!(view.every(-2).unwrap().to_vec(), vec![6, 4, 2, 0]);
        assert_eq!(view.every(1).unwrap().stride(), Stride::new([4]));
        assert!(matches!(
            view.every(0),
            Err(StridedError::InvalidStep { dim: 0, step: 0 })
        ));
        assert!(matches!(
            view.every(isize::MIN),
            Err(StridedError::InvalidStep {
                dim: 0,
                step: isize::MIN
            })
        ));
    }

    #[test]
    fn test_flipped() {
        let data = [1.5f64, 2.5, 3.5];
        let view = ArrayView::new(&data);
        let f = view.flipped();
        assert_eq!(f.to_vec(), vec![3.5, 2.5, 1.5]);
        assert_eq!(f.flipped(0).unwrap().to_vec(), data.to_vec());

        let empty: [f64; 0] = [];
        assert!(ArrayView::new(&empty).flipped().is_empty());
    }

    #[test]
    fn test_mut_view() {
        let mut data = [0u16; 6];
        let mut view = ArrayViewMut::new(&mut data);
        view.set(5, 7).unwrap();
        assert!(view.set(6, 1).is_err());
        let mut every = view.every(-2).unwrap();
        every.set(Size::new([1]), 3).unwrap();
        assert_eq!(data, [0, 0, 0, 3, 0, 7]);
    }
}
