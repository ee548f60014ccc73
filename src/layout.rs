//! Shape and stride algebra shared by every view type.
//!
//! A [`Layout`] is the `(size, stride)` pair of a view without its base
//! address. Each transformation returns a new layout together with the
//! signed distance, in address units, by which the base has to move. Byte
//! views and bit views apply that delta to their own kind of base pointer, so
//! the algebra is written once for both.
//!
//! Nothing here touches memory; every operation is `O(D)`.

use crate::dims::{row_major_stride, Size, Stride};
use crate::{Result, StridedError, MAX_DIMS};

/// Absolute value of a negative `every` step on a one-dimensional view.
pub(crate) fn step_magnitude(step: isize) -> Result<isize> {
    step.checked_neg()
        .filter(|&n| n > 0)
        .ok_or(StridedError::InvalidStep { dim: 0, step })
}

/// A starting offset of `offset` units into storage of `len` units, as a
/// signed base for [`Layout::check_fits`].
pub(crate) fn base_offset(offset: usize, len: usize) -> Result<isize> {
    isize::try_from(offset).map_err(|_| StridedError::ViewOutOfBounds {
        required: offset,
        available: len,
    })
}

/// Per-dimension sizes and strides of a `D`-dimensional view.
///
/// `D` runs from 1 to [`MAX_DIMS`]; other arities are rejected at compile
/// time:
///
/// ```compile_fail
/// use strided_buffer::{Layout, Size};
///
/// let _ = Layout::contiguous(Size::new([1usize; 5]), 1);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Layout<const D: usize> {
    size: Size<D>,
    stride: Stride<D>,
}

impl<const D: usize> Layout<D> {
    #[inline]
    pub const fn new(size: Size<D>, stride: Stride<D>) -> Self {
        const { assert!(D >= 1 && D <= MAX_DIMS, "views have 1 to MAX_DIMS dimensions") };
        Self { size, stride }
    }

    /// Row-major layout with `unit` address units per element.
    pub fn contiguous(size: Size<D>, unit: usize) -> Self {
        Self::new(size, row_major_stride(&size, unit))
    }

    #[inline]
    pub fn size(&self) -> Size<D> {
        self.size
    }

    #[inline]
    pub fn stride(&self) -> Stride<D> {
        self.stride
    }

    /// Sizes borrowed from the layout's own storage.
    #[inline]
    pub fn sizes(&self) -> &[usize] {
        self.size.as_slice()
    }

    /// Strides borrowed from the layout's own storage.
    #[inline]
    pub fn strides(&self) -> &[isize] {
        self.stride.as_slice()
    }

    /// Total number of addressed elements.
    #[inline]
    pub fn len(&self) -> usize {
        self.size.product()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.size.is_empty()
    }

    #[inline]
    fn check_axis(&self, axis: usize) -> Result<()> {
        if axis >= D {
            return Err(StridedError::InvalidAxis { axis, rank: D });
        }
        Ok(())
    }

    /// Offset of a multi-index, bounds-checked in every dimension.
    pub fn offset(&self, index: &Size<D>) -> Result<isize> {
        for dim in 0..D {
            if index[dim] >= self.size[dim] {
                return Err(StridedError::IndexOutOfRange {
                    dim,
                    index: index[dim],
                    size: self.size[dim],
                });
            }
        }
        Ok(self.offset_unchecked(index))
    }

    /// Offset of a multi-index without bounds checks. Exact for any index
    /// inside a layout that passed [`check_fits`](Self::check_fits).
    #[inline]
    pub fn offset_unchecked(&self, index: &Size<D>) -> isize {
        let mut offset = 0isize;
        for dim in 0..D {
            offset = offset.wrapping_add((index[dim] as isize).wrapping_mul(self.stride[dim]));
        }
        offset
    }

    /// Lowest and highest offset touched by any element. `None` when the
    /// layout is empty or an offset doesn't fit in `isize`.
    pub fn span(&self) -> Option<(isize, isize)> {
        if self.is_empty() {
            return None;
        }
        let mut min = 0isize;
        let mut max = 0isize;
        for dim in 0..D {
            let last = isize::try_from(self.size[dim] - 1).ok()?;
            let end = last.checked_mul(self.stride[dim])?;
            if end >= 0 {
                max = max.checked_add(end)?;
            } else {
                min = min.checked_add(end)?;
            }
        }
        Some((min, max))
    }

    /// Check that every element of `item` units placed at `base` stays within
    /// `[0, len)` and that the element count fits in `usize`.
    pub fn check_fits(&self, base: isize, item: usize, len: usize) -> Result<()> {
        if self.is_empty() {
            return Ok(());
        }
        let out_of_bounds = |required: usize| StridedError::ViewOutOfBounds {
            required,
            available: len,
        };
        if self.size.checked_product().is_none() {
            return Err(out_of_bounds(usize::MAX));
        }
        let (min, max) = self.span().ok_or(out_of_bounds(usize::MAX))?;
        let required = isize::try_from(item)
            .ok()
            .and_then(|item| base.checked_add(max)?.checked_add(item))
            .ok_or(out_of_bounds(usize::MAX))?;
        let lowest = base.checked_add(min).ok_or(out_of_bounds(usize::MAX))?;
        if lowest < 0 || required > isize::try_from(len).unwrap_or(isize::MAX) {
            return Err(out_of_bounds(required.max(0) as usize));
        }
        Ok(())
    }

    /// Narrow every dimension to `begin[i]..end[i]`.
    pub fn slice(&self, begin: Size<D>, end: Size<D>) -> Result<(isize, Self)> {
        let mut size = self.size;
        let mut delta = 0isize;
        for dim in 0..D {
            if begin[dim] > end[dim] || end[dim] > self.size[dim] {
                return Err(StridedError::SliceOutOfRange {
                    dim,
                    begin: begin[dim],
                    end: end[dim],
                    size: self.size[dim],
                });
            }
            size[dim] = end[dim] - begin[dim];
            delta = isize::try_from(begin[dim])
                .ok()
                .and_then(|begin| begin.checked_mul(self.stride[dim]))
                .and_then(|step| delta.checked_add(step))
                .ok_or(StridedError::Overflow { dim })?;
        }
        Ok((delta, Self::new(size, self.stride)))
    }

    /// Narrow a single dimension to `begin..end`.
    pub fn slice_axis(&self, axis: usize, begin: usize, end: usize) -> Result<(isize, Self)> {
        self.check_axis(axis)?;
        let mut begins = Size::default();
        let mut ends = self.size;
        begins[axis] = begin;
        ends[axis] = end;
        self.slice(begins, ends)
    }

    /// Reverse the direction of `axis`.
    ///
    /// The base moves to the current last element along the axis and the
    /// stride is negated, so index `0` afterwards addresses what was the last
    /// element.
    pub fn flipped(&self, axis: usize) -> Result<(isize, Self)> {
        self.check_axis(axis)?;
        let overflow = || StridedError::Overflow { dim: axis };
        let delta = match self.size[axis] {
            0 => 0,
            n => isize::try_from(n - 1)
                .ok()
                .and_then(|last| last.checked_mul(self.stride[axis]))
                .ok_or_else(overflow)?,
        };
        let mut stride = self.stride;
        stride[axis] = match stride[axis].checked_neg() {
            Some(negated) => negated,
            // a lone element is the same element in either direction
            None if self.size[axis] <= 1 => stride[axis],
            None => return Err(overflow()),
        };
        Ok((delta, Self::new(self.size, stride)))
    }

    /// Repeat a single-element `axis` `size` times by giving it a zero stride.
    pub fn broadcasted(&self, axis: usize, size: usize) -> Result<Self> {
        self.check_axis(axis)?;
        if self.size[axis] != 1 {
            return Err(StridedError::NotBroadcastable {
                dim: axis,
                size: self.size[axis],
            });
        }
        let mut sizes = self.size;
        let mut stride = self.stride;
        sizes[axis] = size;
        stride[axis] = 0;
        if sizes.checked_product().is_none() {
            return Err(StridedError::Overflow { dim: axis });
        }
        Ok(Self::new(sizes, stride))
    }

    /// Take every `steps[i]`-th element in each dimension.
    ///
    /// Steps must be positive. A negative step is expressed as
    /// [`flipped`](Self::flipped) followed by `every` with the absolute value.
    pub fn every(&self, steps: Stride<D>) -> Result<Self> {
        let mut size = self.size;
        let mut stride = self.stride;
        for dim in 0..D {
            let step = steps[dim];
            if step <= 0 {
                return Err(StridedError::InvalidStep { dim, step });
            }
            size[dim] = size[dim].div_ceil(step as usize);
            // a single remaining element keeps its stride
            if size[dim] > 1 {
                stride[dim] = stride[dim]
                    .checked_mul(step)
                    .ok_or(StridedError::InvalidStep { dim, step })?;
            }
        }
        Ok(Self::new(size, stride))
    }

    /// Swap the size and stride of dimensions `a` and `b`.
    pub fn transposed(&self, a: usize, b: usize) -> Result<Self> {
        self.check_axis(a)?;
        self.check_axis(b)?;
        let mut size = self.size;
        let mut stride = self.stride;
        size.as_mut_array().swap(a, b);
        stride.as_mut_array().swap(a, b);
        Ok(Self::new(size, stride))
    }

    /// Split dimension `axis` into `K` dimensions of the given sizes.
    ///
    /// The new dimensions decompose the original stride in row-major order:
    /// the last one keeps it, each one to its left multiplies it by the sizes
    /// to its right. `E` must equal `D + K - 1`.
    pub fn expanded<const K: usize, const E: usize>(
        &self,
        axis: usize,
        sizes: Size<K>,
    ) -> Result<Layout<E>> {
        const { assert!(K >= 1 && E + 1 == D + K, "expanded dimension count mismatch") };
        self.check_axis(axis)?;
        let total = sizes
            .checked_product()
            .ok_or(StridedError::Overflow { dim: axis })?;
        if total != self.size[axis] {
            return Err(StridedError::SizeMismatch {
                dim: axis,
                expected: total,
                actual: self.size[axis],
            });
        }

        let mut size = Size::<E>::no_init();
        let mut stride = Stride::<E>::no_init();
        for dim in 0..axis {
            size[dim] = self.size[dim];
            stride[dim] = self.stride[dim];
        }
        let mut step = self.stride[axis];
        for k in (0..K).rev() {
            size[axis + k] = sizes[k];
            stride[axis + k] = step;
            if k > 0 {
                step = isize::try_from(sizes[k])
                    .ok()
                    .and_then(|n| step.checked_mul(n))
                    .ok_or(StridedError::Overflow { dim: axis + k - 1 })?;
            }
        }
        for dim in axis + 1..D {
            size[dim + K - 1] = self.size[dim];
            stride[dim + K - 1] = self.stride[dim];
        }
        Ok(Layout::new(size, stride))
    }

    /// Merge `D - E + 1` adjacent dimensions starting at `axis` into one.
    ///
    /// Only possible when each merged dimension steps exactly over the whole
    /// extent of the next one. `E` must be between 1 and `D`.
    pub fn collapsed<const E: usize>(&self, axis: usize) -> Result<Layout<E>> {
        const { assert!(E >= 1 && E <= D, "collapsed dimension count mismatch") };
        let count = D - E + 1;
        if axis + count > D {
            return Err(StridedError::InvalidAxis {
                axis: axis + count - 1,
                rank: D,
            });
        }
        if !self.is_empty() {
            for dim in axis..axis + count - 1 {
                let spanned = isize::try_from(self.size[dim + 1])
                    .ok()
                    .and_then(|n| self.stride[dim + 1].checked_mul(n));
                if spanned != Some(self.stride[dim]) {
                    return Err(StridedError::NotCollapsible { dim });
                }
            }
        }

        let mut size = Size::<E>::no_init();
        let mut stride = Stride::<E>::no_init();
        for dim in 0..axis {
            size[dim] = self.size[dim];
            stride[dim] = self.stride[dim];
        }
        size[axis] = (axis..axis + count).map(|dim| self.size[dim]).product();
        stride[axis] = self.stride[axis + count - 1];
        for dim in axis + count..D {
            size[dim - count + 1] = self.size[dim];
            stride[dim - count + 1] = self.stride[dim];
        }
        Ok(Layout::new(size, stride))
    }

    /// Drop the outermost dimension by fixing it at `index`. `E` must equal
    /// `D - 1`.
    pub fn at<const E: usize>(&self, index: usize) -> Result<(isize, Layout<E>)> {
        const { assert!(E + 1 == D, "sub-view must drop exactly one dimension") };
        if index >= self.size[0] {
            return Err(StridedError::IndexOutOfRange {
                dim: 0,
                index,
                size: self.size[0],
            });
        }
        let mut size = Size::<E>::no_init();
        let mut stride = Stride::<E>::no_init();
        for dim in 0..E {
            size[dim] = self.size[dim + 1];
            stride[dim] = self.stride[dim + 1];
        }
        let delta = isize::try_from(index)
            .ok()
            .and_then(|index| index.checked_mul(self.stride[0]))
            .ok_or(StridedError::Overflow { dim: 0 })?;
        Ok((delta, Layout::new(size, stride)))
    }

    /// Apply a host `start:stop:step` slice to `axis`.
    ///
    /// Positive steps narrow then step. Negative steps narrow to the addressed
    /// range, flip, then step by the absolute value.
    pub fn sliced(&self, axis: usize, spec: SliceSpec) -> Result<(isize, Self)> {
        self.check_axis(axis)?;
        let resolved = spec.resolve(self.size[axis])?;
        if resolved.len == 0 {
            let at = resolved.start.min(self.size[axis]);
            return self.slice_axis(axis, at, at);
        }
        let span = (resolved.len - 1) * resolved.step.unsigned_abs();
        let mut steps = Stride::splat(1);
        // one addressed element needs no stepping, whatever the step
        if resolved.len > 1 {
            steps[axis] = resolved
                .step
                .checked_abs()
                .ok_or(StridedError::InvalidStep {
                    dim: axis,
                    step: resolved.step,
                })?;
        }
        if resolved.step > 0 {
            let (delta, narrowed) =
                self.slice_axis(axis, resolved.start, resolved.start + span + 1)?;
            Ok((delta, narrowed.every(steps)?))
        } else {
            let (delta, narrowed) =
                self.slice_axis(axis, resolved.start - span, resolved.start + 1)?;
            let (flip, flipped) = narrowed.flipped(axis)?;
            Ok((delta + flip, flipped.every(steps)?))
        }
    }

    /// Whether elements are packed row-major with `unit` units each.
    /// Dimensions of size one don't matter, empty layouts are contiguous.
    pub fn is_contiguous(&self, unit: usize) -> bool {
        if self.is_empty() {
            return true;
        }
        let mut expected = unit as isize;
        for dim in (0..D).rev() {
            if self.size[dim] != 1 && self.stride[dim] != expected {
                return false;
            }
            match isize::try_from(self.size[dim])
                .ok()
                .and_then(|n| expected.checked_mul(n))
            {
                Some(next) => expected = next,
                None => return (0..dim).all(|outer| self.size[outer] == 1),
            }
        }
        true
    }

    /// First dimension where distinct indices alias the same location.
    pub fn aliased_axis(&self) -> Option<usize> {
        (0..D).find(|&dim| self.stride[dim] == 0 && self.size[dim] > 1)
    }

    /// Offsets of all elements in row-major order.
    pub fn offsets(&self) -> Offsets<D> {
        Offsets {
            layout: *self,
            index: Size::default(),
            remaining: self.len(),
        }
    }
}

/// Row-major iterator over the element offsets of a [`Layout`].
#[derive(Debug, Clone)]
pub struct Offsets<const D: usize> {
    layout: Layout<D>,
    index: Size<D>,
    remaining: usize,
}

impl<const D: usize> Iterator for Offsets<D> {
    type Item = isize;

    #[inline]
    fn next(&mut self) -> Option<isize> {
        if self.remaining == 0 {
            return None;
        }
        let offset = self.layout.offset_unchecked(&self.index);
        self.remaining -= 1;
        for dim in (0..D).rev() {
            self.index[dim] += 1;
            if self.index[dim] < self.layout.size[dim] {
                break;
            }
            self.index[dim] = 0;
        }
        Some(offset)
    }

    #[inline]
    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<const D: usize> ExactSizeIterator for Offsets<D> {}

// ============================================================================
// Host slices
// ============================================================================

/// A `start:stop:step` slice as a scripting host spells it. Missing entries
/// take the host defaults, negative indices count from the end.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SliceSpec {
    pub start: Option<isize>,
    pub stop: Option<isize>,
    pub step: Option<isize>,
}

/// A [`SliceSpec`] resolved against a dimension size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedSlice {
    /// Index of the first addressed element.
    pub start: usize,
    /// Number of addressed elements.
    pub len: usize,
    pub step: isize,
}

impl SliceSpec {
    pub const fn new(start: Option<isize>, stop: Option<isize>, step: Option<isize>) -> Self {
        Self { start, stop, step }
    }

    /// `start:stop`.
    pub const fn range(start: isize, stop: isize) -> Self {
        Self::new(Some(start), Some(stop), None)
    }

    /// `::step`.
    pub const fn step(step: isize) -> Self {
        Self::new(None, None, Some(step))
    }

    /// Resolve against a dimension of `size` elements.
    ///
    /// Out-of-range endpoints clamp the way a host slice does. A zero step is
    /// rejected, as is an explicit `start` and `stop` pair running against the
    /// direction of the step.
    pub fn resolve(&self, size: usize) -> Result<ResolvedSlice> {
        let invalid = || StridedError::InvalidSlice {
            start: self.start,
            stop: self.stop,
            step: self.step.unwrap_or(1),
        };
        let step = self.step.unwrap_or(1);
        if step == 0 {
            return Err(invalid());
        }
        let n = size as isize;
        let wrap = |i: isize| if i < 0 { i + n } else { i };

        if let (Some(start), Some(stop)) = (self.start, self.stop) {
            let (start, stop) = (wrap(start), wrap(stop));
            if (step > 0 && start > stop) || (step < 0 && start < stop) {
                return Err(invalid());
            }
        }

        let (start, len) = if step > 0 {
            let start = self.start.map_or(0, |i| wrap(i).clamp(0, n));
            let stop = self.stop.map_or(n, |i| wrap(i).clamp(0, n));
            let len = if stop > start {
                ((stop - start) as usize).div_ceil(step as usize)
            } else {
                0
            };
            (start, len)
        } else {
            let start = self.start.map_or(n - 1, |i| wrap(i).clamp(-1, n - 1));
            let stop = self.stop.map_or(-1, |i| wrap(i).clamp(-1, n - 1));
            let len = if start > stop {
                ((start - stop) as usize).div_ceil(step.unsigned_abs())
            } else {
                0
            };
            (start, len)
        };

        Ok(ResolvedSlice {
            start: start.max(0) as usize,
            len,
            step,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn layout_2x3() -> Layout<2> {
        Layout::contiguous(Size::new([2, 3]), 4)
    }

    fn collect<const D: usize>(delta: isize, layout: &Layout<D>) -> Vec<isize> {
        layout.offsets().map(|o| o + delta).collect()
    }

    #[test]
    fn test_contiguous() {
        let l = layout_2x3();
        assert_eq!(l.stride(), Stride::new([12, 4]));
        assert!(l.is_contiguous(4));
        assert_eq!(collect(0, &l), vec![0, 4, 8, 12, 16, 20]);
    }

    #[test]
    fn test_offset_bounds() {
        let l = layout_2x3();
        assert_eq!(l.offset(&Size::new([1, 2])).unwrap(), 20);
        assert!(matches!(
            l.offset(&Size::new([0, 3])),
            Err(StridedError::IndexOutOfRange {
                dim: 1,
                index: 3,
                size: 3
            })
        ));
    }

    #[test]
    fn test_slice() {
        let (delta, s) = layout_2x3()
            .slice(Size::new([1, 1]), Size::new([2, 3]))
            .unwrap();
        assert_eq!(delta, 16);
        assert_eq!(s.size(), Size::new([1, 2]));
        assert_eq!(collect(delta, &s), vec![16, 20]);

        assert!(matches!(
            layout_2x3().slice(Size::new([0, 2]), Size::new([2, 1])),
            Err(StridedError::SliceOutOfRange { dim: 1, .. })
        ));
        assert!(layout_2x3()
            .slice(Size::new([0, 0]), Size::new([3, 3]))
            .is_err());
    }

    #[test]
    fn test_flipped() {
        let (delta, f) = layout_2x3().flipped(1).unwrap();
        assert_eq!(delta, 8);
        assert_eq!(f.stride(), Stride::new([12, -4]));
        assert_eq!(collect(delta, &f), vec![8, 4, 0, 20, 16, 12]);
        assert!(matches!(
            layout_2x3().flipped(2),
            Err(StridedError::InvalidAxis { axis: 2, rank: 2 })
        ));
    }

    #[test]
    fn test_flip_twice_is_identity() {
        let l = layout_2x3();
        let (d1, f) = l.flipped(0).unwrap();
        let (d2, ff) = f.flipped(0).unwrap();
        assert_eq!(ff, l);
        assert_eq!(collect(d1 + d2, &ff), collect(0, &l));
    }

    #[test]
    fn test_broadcasted() {
        let l = Layout::contiguous(Size::new([1, 5]), 1);
        let b = l.broadcasted(0, 4).unwrap();
        assert_eq!(b.size(), Size::new([4, 5]));
        assert_eq!(b.stride(), Stride::new([0, 1]));
        assert_eq!(b.aliased_axis(), Some(0));
        assert!(matches!(
            b.broadcasted(1, 3),
            Err(StridedError::NotBroadcastable { dim: 1, size: 5 })
        ));
    }

    #[test]
    fn test_every() {
        let l = Layout::contiguous(Size::new([7]), 2);
        let e = l.every(Stride::new([3])).unwrap();
        assert_eq!(e.size(), Size::new([3]));
        assert_eq!(collect(0, &e), vec![0, 6, 12]);
        assert!(matches!(
            l.every(Stride::new([0])),
            Err(StridedError::InvalidStep { dim: 0, step: 0 })
        ));
        assert!(l.every(Stride::new([-1])).is_err());
    }

    #[test]
    fn test_transposed() {
        let l = layout_2x3();
        let t = l.transposed(0, 1).unwrap();
        assert_eq!(t.size(), Size::new([3, 2]));
        assert_eq!(t.stride(), Stride::new([4, 12]));
        assert_eq!(t.transposed(0, 1).unwrap(), l);
        assert_eq!(l.transposed(1, 1).unwrap(), l);
        assert!(l.transposed(0, 2).is_err());
    }

    #[test]
    fn test_expanded() {
        let l = Layout::contiguous(Size::new([6, 2]), 1);
        let e: Layout<3> = l.expanded(0, Size::new([2, 3])).unwrap();
        assert_eq!(e.size(), Size::new([2, 3, 2]));
        assert_eq!(e.stride(), Stride::new([6, 2, 1]));
        assert_eq!(collect(0, &e), collect(0, &l));

        let err = l.expanded::<2, 3>(0, Size::new([4, 2])).unwrap_err();
        assert!(matches!(
            err,
            StridedError::SizeMismatch {
                dim: 0,
                expected: 8,
                actual: 6
            }
        ));
    }

    #[test]
    fn test_expanded_inner_negative_stride() {
        let (delta, l) = Layout::contiguous(Size::new([6]), 4).flipped(0).unwrap();
        let e: Layout<2> = l.expanded(0, Size::new([3, 2])).unwrap();
        assert_eq!(e.stride(), Stride::new([-8, -4]));
        assert_eq!(collect(delta, &e), collect(delta, &l));
    }

    #[test]
    fn test_collapsed() {
        let l = Layout::contiguous(Size::new([2, 3, 4]), 1);
        let c: Layout<2> = l.collapsed(1).unwrap();
        assert_eq!(c.size(), Size::new([2, 12]));
        assert_eq!(c.stride(), Stride::new([12, 1]));

        let t = l.transposed(1, 2).unwrap();
        assert!(matches!(
            t.collapsed::<2>(1),
            Err(StridedError::NotCollapsible { dim: 1 })
        ));
        assert!(l.collapsed::<2>(2).is_err());
    }

    #[test]
    fn test_at() {
        let (delta, row) = layout_2x3().at::<1>(1).unwrap();
        assert_eq!(delta, 12);
        assert_eq!(row.size(), Size::new([3]));
        assert!(matches!(
            layout_2x3().at::<1>(2),
            Err(StridedError::IndexOutOfRange { dim: 0, .. })
        ));
    }

    #[test]
    fn test_span_and_fits() {
        let (delta, f) = Layout::contiguous(Size::new([4]), 2).flipped(0).unwrap();
        assert_eq!(f.span(), Some((-6, 0)));
        assert!(f.check_fits(delta, 2, 8).is_ok());
        assert!(f.check_fits(delta, 2, 7).is_err());
        assert!(f.check_fits(0, 2, 8).is_err());
    }

    #[test]
    fn test_resolve_slice() {
        let r = SliceSpec::range(1, 4).resolve(5).unwrap();
        assert_eq!((r.start, r.len, r.step), (1, 3, 1));
        let r = SliceSpec::step(-1).resolve(5).unwrap();
        assert_eq!((r.start, r.len, r.step), (4, 5, -1));
        let r = SliceSpec::new(Some(-2), None, None).resolve(5).unwrap();
        assert_eq!((r.start, r.len), (3, 2));
        let r = SliceSpec::new(None, Some(100), Some(2)).resolve(5).unwrap();
        assert_eq!((r.start, r.len), (0, 3));
        let r = SliceSpec::range(2, 2).resolve(5).unwrap();
        assert_eq!(r.len, 0);
    }

    #[test]
    fn test_resolve_rejects_zero_step() {
        assert!(matches!(
            SliceSpec::step(0).resolve(5),
            Err(StridedError::InvalidSlice { step: 0, .. })
        ));
    }

    #[test]
    fn test_resolve_rejects_contradictory_sign() {
        assert!(matches!(
            SliceSpec::new(Some(0), Some(4), Some(-1)).resolve(5),
            Err(StridedError::InvalidSlice { .. })
        ));
        assert!(matches!(
            SliceSpec::range(4, 1).resolve(5),
            Err(StridedError::InvalidSlice { .. })
        ));
    }

    #[test]
    fn test_sliced_negative_step() {
        let l = Layout::contiguous(Size::new([5]), 1);
        let (delta, s) = l.sliced(0, SliceSpec::step(-2)).unwrap();
        assert_eq!(collect(delta, &s), vec![4, 2, 0]);

        let (delta, s) = l.sliced(0, SliceSpec::new(Some(3), None, Some(-2))).unwrap();
        assert_eq!(collect(delta, &s), vec![3, 1]);

        let (delta, s) = l.sliced(0, SliceSpec::new(Some(4), Some(0), Some(-3))).unwrap();
        assert_eq!(collect(delta, &s), vec![4, 1]);
    }

    #[test]
    fn test_sliced_positive_step() {
        let l = Layout::contiguous(Size::new([2, 6]), 1);
        let (delta, s) = l.sliced(1, SliceSpec::new(Some(1), None, Some(2))).unwrap();
        assert_eq!(s.size(), Size::new([2, 3]));
        assert_eq!(collect(delta, &s), vec![1, 3, 5, 7, 9, 11]);
    }

    #[test]
    fn test_sliced_empty() {
        let l = Layout::contiguous(Size::new([5]), 1);
        let (_, s) = l.sliced(0, SliceSpec::range(7, 9)).unwrap();
        assert_eq!(s.size(), Size::new([0]));
        assert!(s.is_empty());
    }

    #[test]
    fn test_highest_arity() {
        let l = Layout::<MAX_DIMS>::contiguous(Size::new([2, 1, 3, 2]), 1);
        assert_eq!(l.stride(), Stride::new([6, 6, 2, 1]));
        assert_eq!(l.offsets().count(), 12);
        let (_, inner) = l.at::<3>(1).unwrap();
        assert_eq!(inner.size(), Size::new([1, 3, 2]));
    }

    #[test]
    fn test_extreme_steps_resolve_to_one_element() {
        let l = Layout::contiguous(Size::new([4]), 1);
        let (delta, s) = l.sliced(0, SliceSpec::step(isize::MIN)).unwrap();
        assert_eq!(collect(delta, &s), vec![3]);
        let (delta, s) = l.sliced(0, SliceSpec::step(isize::MAX)).unwrap();
        assert_eq!(collect(delta, &s), vec![0]);

        assert_eq!(step_magnitude(-3).unwrap(), 3);
        assert!(matches!(
            step_magnitude(isize::MIN),
            Err(StridedError::InvalidStep {
                dim: 0,
                step: isize::MIN
            })
        ));
    }

    #[test]
    fn test_overflow_is_an_error() {
        let l = Layout::contiguous(Size::new([6]), 1);
        assert!(matches!(
            l.expanded::<2, 2>(0, Size::new([usize::MAX, 2])),
            Err(StridedError::Overflow { dim: 0 })
        ));
        let wide = Layout::new(Size::new([4]), Stride::new([isize::MAX / 2 + 1]));
        assert!(matches!(
            wide.expanded::<2, 2>(0, Size::new([2, 2])),
            Err(StridedError::Overflow { dim: 0 })
        ));
        assert!(matches!(
            Layout::new(Size::new([4]), Stride::new([isize::MAX / 2])).every(Stride::new([3])),
            Err(StridedError::InvalidStep { dim: 0, step: 3 })
        ));

        let row = Layout::new(Size::new([1, usize::MAX]), Stride::new([0, 1]));
        assert!(matches!(
            row.broadcasted(0, 2),
            Err(StridedError::Overflow { dim: 0 })
        ));

        let lone = Layout::new(Size::new([1]), Stride::new([isize::MIN]));
        assert_eq!(lone.flipped(0).unwrap(), (0, lone));
        assert!(matches!(
            Layout::new(Size::new([3]), Stride::new([isize::MIN])).flipped(0),
            Err(StridedError::Overflow { dim: 0 })
        ));
    }

    #[test]
    fn test_unrepresentable_span_does_not_fit() {
        let l = Layout::new(Size::new([3]), Stride::new([isize::MAX]));
        assert_eq!(l.span(), None);
        assert!(matches!(
            l.check_fits(0, 1, 4),
            Err(StridedError::ViewOutOfBounds {
                required: usize::MAX,
                available: 4
            })
        ));
        assert!(!l.is_contiguous(1));
        // zero strides fit any memory, but the element count must still exist
        let aliased = Layout::new(Size::new([2, usize::MAX]), Stride::new([0, 0]));
        assert!(aliased.check_fits(0, 1, 1).is_err());
        assert!(matches!(
            base_offset(usize::MAX, 8),
            Err(StridedError::ViewOutOfBounds { available: 8, .. })
        ));
    }
}
