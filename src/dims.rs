//! Fixed-arity size and stride vectors.
//!
//! [`Size`] holds one element count per dimension, [`Stride`] one signed
//! offset-per-step per dimension, both ordered outermost first. Strides are in
//! the address unit of the view they describe: bytes for byte views, bits for
//! bit views.

use std::fmt;
use std::ops::{Index, IndexMut};

/// Element counts per dimension, outermost first.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Size<const D: usize>([usize; D]);

/// Signed address-unit steps per dimension, outermost first.
///
/// A negative entry means the view runs backwards in that dimension, a zero
/// entry means every index along it aliases the same location.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Stride<const D: usize>([isize; D]);

macro_rules! impl_dims {
    ($name:ident, $t:ty) => {
        impl<const D: usize> $name<D> {
            #[inline]
            pub const fn new(values: [$t; D]) -> Self {
                Self(values)
            }

            /// Construct without meaningful contents.
            ///
            /// Callers must overwrite every entry before reading it back.
            #[inline]
            pub const fn no_init() -> Self {
                Self([0; D])
            }

            /// Same value in every dimension.
            #[inline]
            pub const fn splat(value: $t) -> Self {
                Self([value; D])
            }

            #[inline]
            pub const fn as_array(&self) -> &[$t; D] {
                &self.0
            }

            #[inline]
            pub(crate) fn as_mut_array(&mut self) -> &mut [$t; D] {
                &mut self.0
            }

            #[inline]
            pub fn as_slice(&self) -> &[$t] {
                &self.0
            }

            #[inline]
            pub const fn into_array(self) -> [$t; D] {
                self.0
            }

            #[inline]
            pub fn iter(&self) -> std::slice::Iter<'_, $t> {
                self.0.iter()
            }
        }

        impl<const D: usize> Default for $name<D> {
            #[inline]
            fn default() -> Self {
                Self([0; D])
            }
        }

        impl<const D: usize> Index<usize> for $name<D> {
            type Output = $t;

            #[inline]
            fn index(&self, i: usize) -> &$t {
                &self.0[i]
            }
        }

        impl<const D: usize> IndexMut<usize> for $name<D> {
            #[inline]
            fn index_mut(&mut self, i: usize) -> &mut $t {
                &mut self.0[i]
            }
        }

        impl<const D: usize> From<[$t; D]> for $name<D> {
            #[inline]
            fn from(values: [$t; D]) -> Self {
                Self(values)
            }
        }

        impl<const D: usize> From<$name<D>> for [$t; D] {
            #[inline]
            fn from(values: $name<D>) -> Self {
                values.0
            }
        }

        impl<const D: usize> fmt::Debug for $name<D> {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}{{", stringify!($name))?;
                for (i, v) in self.0.iter().enumerate() {
                    if i != 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{v}")?;
                }
                f.write_str("}")
            }
        }

        impl From<$t> for $name<1> {
            #[inline]
            fn from(a: $t) -> Self {
                Self([a])
            }
        }

        impl From<($t,)> for $name<1> {
            #[inline]
            fn from((a,): ($t,)) -> Self {
                Self([a])
            }
        }

        impl From<($t, $t)> for $name<2> {
            #[inline]
            fn from((a, b): ($t, $t)) -> Self {
                Self([a, b])
            }
        }

        impl From<($t, $t, $t)> for $name<3> {
            #[inline]
            fn from((a, b, c): ($t, $t, $t)) -> Self {
                Self([a, b, c])
            }
        }

        impl From<($t, $t, $t, $t)> for $name<4> {
            #[inline]
            fn from((a, b, c, d): ($t, $t, $t, $t)) -> Self {
                Self([a, b, c, d])
            }
        }

        impl From<$name<1>> for ($t,) {
            #[inline]
            fn from(v: $name<1>) -> Self {
                (v.0[0],)
            }
        }

        impl From<$name<2>> for ($t, $t) {
            #[inline]
            fn from(v: $name<2>) -> Self {
                (v.0[0], v.0[1])
            }
        }

        impl From<$name<3>> for ($t, $t, $t) {
            #[inline]
            fn from(v: $name<3>) -> Self {
                (v.0[0], v.0[1], v.0[2])
            }
        }

        impl From<$name<4>> for ($t, $t, $t, $t) {
            #[inline]
            fn from(v: $name<4>) -> Self {
                (v.0[0], v.0[1], v.0[2], v.0[3])
            }
        }
    };
}

impl_dims!(Size, usize);
impl_dims!(Stride, isize);

impl<const D: usize> Size<D> {
    /// Total element count, the product of all entries.
    #[inline]
    pub fn product(&self) -> usize {
        self.0.iter().product()
    }

    /// Total element count, `None` if it doesn't fit in `usize`.
    #[inline]
    pub fn checked_product(&self) -> Option<usize> {
        self.0.iter().try_fold(1usize, |acc, &n| acc.checked_mul(n))
    }

    /// Whether any dimension is empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.0.contains(&0)
    }
}

/// Row-major strides for `size` with `unit` address units per element.
///
/// Strides that don't fit in `isize` saturate; such a layout never passes a
/// bounds check.
pub fn row_major_stride<const D: usize>(size: &Size<D>, unit: usize) -> Stride<D> {
    let mut stride = Stride::no_init();
    let mut step = isize::try_from(unit).unwrap_or(isize::MAX);
    for i in (0..D).rev() {
        stride[i] = step;
        step = step.saturating_mul(isize::try_from(size[i]).unwrap_or(isize::MAX));
    }
    stride
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_zero() {
        let size = Size::<3>::default();
        assert_eq!(size.into_array(), [0, 0, 0]);
        let stride = Stride::<2>::default();
        assert_eq!(stride.into_array(), [0, 0]);
    }

    #[test]
    fn test_index_and_tuple_conversion() {
        let mut size: Size<3> = (2, 3, 4).into();
        assert_eq!(size[1], 3);
        size[1] = 5;
        let tuple: (usize, usize, usize) = size.into();
        assert_eq!(tuple, (2, 5, 4));
        assert_eq!(size.product(), 40);
        assert!(!size.is_empty());
    }

    #[test]
    fn test_debug_format() {
        let stride = Stride::new([12, -4]);
        assert_eq!(format!("{stride:?}"), "Stride{12, -4}");
    }

    #[test]
    fn test_row_major_stride() {
        let stride = row_major_stride(&Size::new([2, 3, 4]), 4);
        assert_eq!(stride.into_array(), [48, 16, 4]);

        let huge = row_major_stride(&Size::new([2, usize::MAX, 4]), 4);
        assert_eq!(huge.into_array(), [isize::MAX, 16, 4]);
    }

    #[test]
    fn test_checked_product() {
        assert_eq!(Size::new([2, 3, 4]).checked_product(), Some(24));
        assert_eq!(Size::new([usize::MAX, 2]).checked_product(), None);
        assert_eq!(Size::new([usize::MAX, 0]).checked_product(), Some(0));
    }
}
