//! Buffer-protocol bridge.
//!
//! [`BufferInfo`] mirrors the descriptor of the common multidimensional buffer
//! convention: base pointer, owning object, total length in bytes, item size,
//! read-only flag, dimension count and optional format string, shape and
//! strides (bytes, outermost first, possibly negative).
//!
//! Export fills a descriptor from a view. Shape and strides borrow the view's
//! own [`Size`](crate::Size)/[`Stride`](crate::Stride) storage, so the
//! descriptor can't outlive the view it came from, and its owner handle keeps
//! the memory alive. Import checks a descriptor against the target arity and
//! builds an owner-carrying view over the same memory without copying. All
//! checks run before any view exists; a rejected descriptor is dropped along
//! with the owner reference it carried.
//!
//! A descriptor without an owner, such as one exported from a borrowed
//! [`StridedArrayView`], says nothing about how long its memory lives. Safe
//! import rejects it unless it addresses no element; `from_buffer_unowned`
//! takes it on the caller's word.

use std::borrow::Cow;

use crate::dims::{Size, Stride};
use crate::erased::{ArrayBuffer, StridedBuffer};
use crate::format::FormatAccessor;
use crate::layout::Layout;
use crate::owner::Owner;
use crate::strided::{Element, StridedArrayView};
use crate::{Result, StridedError};

/// Which parts of a descriptor the consumer asks for.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct BufferRequest {
    /// Writable access. Fails on read-only views.
    pub writable: bool,
    /// Fill in the format string.
    pub format: bool,
    /// Fill in the shape.
    pub shape: bool,
    /// Fill in the strides. Without it only contiguous views can be exported.
    pub strides: bool,
}

impl BufferRequest {
    /// Contiguous bytes, no metadata.
    pub const SIMPLE: Self = Self {
        writable: false,
        format: false,
        shape: false,
        strides: false,
    };

    /// Contiguous with shape.
    pub const ND: Self = Self {
        shape: true,
        ..Self::SIMPLE
    };

    /// Shape and strides.
    pub const STRIDED: Self = Self {
        shape: true,
        strides: true,
        ..Self::SIMPLE
    };

    /// Everything, read-only.
    pub const FULL_RO: Self = Self {
        format: true,
        ..Self::STRIDED
    };

    /// Everything, writable.
    pub const FULL: Self = Self {
        writable: true,
        ..Self::FULL_RO
    };
}

/// A buffer-protocol descriptor.
#[derive(Debug, Clone)]
pub struct BufferInfo<'a> {
    pub(crate) buf: *mut u8,
    pub(crate) obj: Option<Owner>,
    pub(crate) len: usize,
    pub(crate) itemsize: usize,
    pub(crate) readonly: bool,
    pub(crate) ndim: usize,
    pub(crate) format: Option<Cow<'a, str>>,
    pub(crate) shape: Option<Cow<'a, [usize]>>,
    pub(crate) strides: Option<Cow<'a, [isize]>>,
}

impl<'a> BufferInfo<'a> {
    /// Describe externally owned memory.
    ///
    /// `ndim` is the length of `shape`, `len` the product of `shape` times
    /// `itemsize`. Without `strides` the memory is row-major contiguous.
    ///
    /// # Safety
    /// Every element `shape`/`strides` address from `buf` must stay valid for
    /// as long as `obj` is alive and must be writable unless `readonly` is set.
    /// Views imported from the descriptor rely on this.
    pub unsafe fn from_raw_parts(
        buf: *mut u8,
        itemsize: usize,
        shape: Cow<'a, [usize]>,
        strides: Option<Cow<'a, [isize]>>,
        format: Option<Cow<'a, str>>,
        readonly: bool,
        obj: Option<Owner>,
    ) -> Self {
        BufferInfo {
            buf,
            obj,
            len: shape
                .iter()
                .try_fold(itemsize, |acc, &n| acc.checked_mul(n))
                .unwrap_or(usize::MAX),
            itemsize,
            readonly,
            ndim: shape.len(),
            format,
            shape: Some(shape),
            strides,
        }
    }

    #[inline]
    pub fn buf(&self) -> *mut u8 {
        self.buf
    }

    /// The owner keeping `buf` alive, if any.
    #[inline]
    pub fn obj(&self) -> Option<&Owner> {
        self.obj.as_ref()
    }

    /// Total length in bytes.
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    #[inline]
    pub fn itemsize(&self) -> usize {
        self.itemsize
    }

    #[inline]
    pub fn readonly(&self) -> bool {
        self.readonly
    }

    #[inline]
    pub fn ndim(&self) -> usize {
        self.ndim
    }

    /// Format string; `None` means unsigned bytes.
    #[inline]
    pub fn format(&self) -> Option<&str> {
        self.format.as_deref()
    }

    #[inline]
    pub fn shape(&self) -> Option<&[usize]> {
        self.shape.as_deref()
    }

    #[inline]
    pub fn strides(&self) -> Option<&[isize]> {
        self.strides.as_deref()
    }

    /// Resolve the format string, falling back to plain bytes of `itemsize`
    /// when it is absent, unknown or disagrees with the item size.
    fn accessor(&self) -> FormatAccessor {
        self.format
            .as_deref()
            .and_then(FormatAccessor::parse)
            .filter(|accessor| accessor.item_size() == self.itemsize)
            .unwrap_or(FormatAccessor::bytes(self.itemsize))
    }

    fn check_ndim(&self, expected: usize) -> Result<()> {
        if self.ndim != expected {
            return Err(StridedError::BufferDimensions {
                expected,
                actual: self.ndim,
            });
        }
        Ok(())
    }

    /// Layout of a `D`-dimensional import. Only called after `check_ndim`.
    fn layout<const D: usize>(&self) -> Result<Layout<D>> {
        let mut size = Size::<D>::no_init();
        match self.shape.as_deref() {
            Some(shape) if shape.len() == D => size.as_mut_array().copy_from_slice(shape),
            Some(shape) => {
                return Err(StridedError::BufferDimensions {
                    expected: D,
                    actual: shape.len(),
                })
            }
            None if D == 1 => size[0] = self.len.checked_div(self.itemsize).unwrap_or(0),
            None => return Err(StridedError::BufferMissingShape),
        }
        let stride = match self.strides.as_deref() {
            Some(strides) if strides.len() == D => {
                let mut stride = Stride::<D>::no_init();
                stride.as_mut_array().copy_from_slice(strides);
                stride
            }
            Some(strides) => {
                return Err(StridedError::BufferDimensions {
                    expected: D,
                    actual: strides.len(),
                })
            }
            None => Layout::contiguous(size, self.itemsize).stride(),
        };
        Ok(Layout::new(size, stride))
    }
}

fn check_export(request: BufferRequest, writable: bool, contiguous: bool) -> Result<()> {
    if request.writable && !writable {
        return Err(StridedError::BufferReadOnly);
    }
    if !request.strides && !contiguous {
        return Err(StridedError::BufferNotContiguous);
    }
    Ok(())
}

// ============================================================================
// Export
// ============================================================================

impl<const D: usize> StridedBuffer<D> {
    /// Describe this view for a buffer-protocol consumer.
    ///
    /// # Errors
    /// [`StridedError::BufferReadOnly`] for a writable request on a read-only
    /// view, [`StridedError::BufferNotContiguous`] when strides weren't
    /// requested but the view isn't contiguous.
    pub fn buffer_info(&self, request: BufferRequest) -> Result<BufferInfo<'_>> {
        check_export(request, self.is_writable(), self.is_contiguous())?;
        let layout = self.layout();
        let info = BufferInfo {
            buf: self.data().cast_mut(),
            obj: self.owner().cloned(),
            len: self.len() * self.item_size(),
            itemsize: self.item_size(),
            readonly: !self.is_writable(),
            ndim: D,
            format: self.format().filter(|_| request.format).map(Cow::Borrowed),
            shape: (request.shape || request.strides).then(|| Cow::Borrowed(layout.sizes())),
            strides: request.strides.then(|| Cow::Borrowed(layout.strides())),
        };
        tracing::debug!(
            ndim = D,
            itemsize = info.itemsize,
            readonly = info.readonly,
            format = ?info.format(),
            "exporting strided buffer"
        );
        Ok(info)
    }
}

impl ArrayBuffer {
    /// Describe this view for a buffer-protocol consumer. Contiguous views
    /// have no shape storage of their own, so shape and strides are owned.
    pub fn buffer_info(&self, request: BufferRequest) -> Result<BufferInfo<'_>> {
        check_export(request, self.is_writable(), true)?;
        let info = BufferInfo {
            buf: self.data().cast_mut(),
            obj: self.owner().cloned(),
            len: self.len() * self.item_size(),
            itemsize: self.item_size(),
            readonly: !self.is_writable(),
            ndim: 1,
            format: self.format().filter(|_| request.format).map(Cow::Borrowed),
            shape: (request.shape || request.strides).then(|| Cow::Owned(vec![self.len()])),
            strides: request
                .strides
                .then(|| Cow::Owned(vec![self.item_size() as isize])),
        };
        tracing::debug!(
            len = self.len(),
            itemsize = info.itemsize,
            readonly = info.readonly,
            "exporting array buffer"
        );
        Ok(info)
    }
}

impl<'a, T: Element, const D: usize> StridedArrayView<'a, T, D> {
    /// Describe this borrowed view. The descriptor carries no owner and is
    /// always read-only.
    pub fn buffer_info(&self, request: BufferRequest) -> Result<BufferInfo<'_>> {
        check_export(request, false, self.is_contiguous())?;
        let layout = self.layout();
        let itemsize = std::mem::size_of::<T>();
        Ok(BufferInfo {
            buf: self.data().cast_mut(),
            obj: None,
            len: self.len() * itemsize,
            itemsize,
            readonly: true,
            ndim: D,
            format: T::accessor()
                .format()
                .filter(|_| request.format)
                .map(Cow::Borrowed),
            shape: (request.shape || request.strides).then(|| Cow::Borrowed(layout.sizes())),
            strides: request.strides.then(|| Cow::Borrowed(layout.strides())),
        })
    }
}

// ============================================================================
// Import
// ============================================================================

fn log_import(info: &BufferInfo<'_>, accessor: &FormatAccessor, writable: bool) {
    if info.obj.is_some() {
        tracing::debug!("acquired buffer owner");
    }
    tracing::debug!(
        ndim = info.ndim,
        itemsize = info.itemsize,
        format = ?accessor.format(),
        writable,
        "imported buffer"
    );
}

fn check_owner<const D: usize>(info: &BufferInfo<'_>, layout: &Layout<D>) -> Result<()> {
    if info.obj.is_none() && !layout.is_empty() {
        tracing::debug!(ndim = info.ndim, "rejecting buffer without owner");
        return Err(StridedError::BufferMissingOwner);
    }
    Ok(())
}

impl<const D: usize> StridedBuffer<D> {
    /// Build a read-only view over the memory a descriptor describes.
    ///
    /// # Errors
    /// [`StridedError::BufferDimensions`] unless the descriptor has exactly
    /// `D` dimensions, [`StridedError::BufferMissingShape`] for a
    /// multi-dimensional descriptor without shape,
    /// [`StridedError::BufferMissingOwner`] when a non-empty descriptor
    /// carries no owner.
    pub fn from_buffer(info: BufferInfo<'_>) -> Result<Self> {
        Self::import(info, false, true)
    }

    /// Build a writable view. Fails with [`StridedError::BufferReadOnly`] for
    /// a read-only descriptor.
    pub fn from_buffer_mut(info: BufferInfo<'_>) -> Result<Self> {
        if info.readonly {
            return Err(StridedError::BufferReadOnly);
        }
        Self::import(info, true, true)
    }

    /// Build a read-only view from a descriptor that may have no owner.
    ///
    /// # Safety
    /// Without an owner nothing keeps the described memory alive: it must
    /// stay valid and unmodified through other paths for as long as the
    /// returned view or anything derived from it exists.
    pub unsafe fn from_buffer_unowned(info: BufferInfo<'_>) -> Result<Self> {
        Self::import(info, false, false)
    }

    fn import(info: BufferInfo<'_>, writable: bool, require_owner: bool) -> Result<Self> {
        info.check_ndim(D)?;
        let layout = info.layout::<D>()?;
        if require_owner {
            check_owner(&info, &layout)?;
        }
        let accessor = info.accessor();
        log_import(&info, &accessor, writable);
        let BufferInfo { buf, obj, .. } = info;
        // SAFETY: BufferInfo::from_raw_parts requires the described memory to
        // stay valid while `obj` is alive, and the view keeps `obj`. Without
        // an owner the caller of from_buffer_unowned vouches for it.
        Ok(unsafe { Self::from_raw_parts(buf, layout, accessor, writable, obj) })
    }
}

impl ArrayBuffer {
    /// Build a read-only contiguous view over a one-dimensional descriptor.
    ///
    /// # Errors
    /// [`StridedError::BufferDimensions`] unless the descriptor is
    /// one-dimensional, [`StridedError::BufferStride`] when its stride isn't
    /// the item size, [`StridedError::BufferMissingOwner`] when a non-empty
    /// descriptor carries no owner.
    pub fn from_buffer(info: BufferInfo<'_>) -> Result<Self> {
        Self::import(info, false, true)
    }

    pub fn from_buffer_mut(info: BufferInfo<'_>) -> Result<Self> {
        if info.readonly {
            return Err(StridedError::BufferReadOnly);
        }
        Self::import(info, true, true)
    }

    /// Build a read-only view from a descriptor that may have no owner.
    ///
    /// # Safety
    /// Same contract as [`StridedBuffer::from_buffer_unowned`].
    pub unsafe fn from_buffer_unowned(info: BufferInfo<'_>) -> Result<Self> {
        Self::import(info, false, false)
    }

    fn import(info: BufferInfo<'_>, writable: bool, require_owner: bool) -> Result<Self> {
        info.check_ndim(1)?;
        let layout = info.layout::<1>()?;
        if layout.stride()[0] != info.itemsize as isize {
            return Err(StridedError::BufferStride {
                expected: info.itemsize as isize,
                actual: layout.stride()[0],
            });
        }
        if require_owner {
            check_owner(&info, &layout)?;
        }
        let accessor = info.accessor();
        log_import(&info, &accessor, writable);
        let BufferInfo { buf, obj, .. } = info;
        // SAFETY: see StridedBuffer::import
        Ok(unsafe { Self::from_raw_parts(buf, layout.size()[0], accessor, writable, obj) })
    }
}
