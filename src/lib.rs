//! Strided multidimensional array views with buffer-protocol interop.
//!
//! This crate describes non-owning windows into raw memory with per-dimension
//! size and stride metadata, transforms them without copying, moves scalar
//! values in and out of their bytes through a format table, and exchanges them
//! with a generic buffer protocol (shape/strides/itemsize/format/readonly) while
//! keeping the memory owner alive for as long as any derived view exists.
//!
//! # Core Types
//!
//! - [`Size`] / [`Stride`]: fixed-arity size and stride vectors, `D` in `1..=4`
//! - [`Layout`]: the shape/stride algebra (slice, flip, broadcast, every,
//!   transpose, expand, collapse, outer indexing) shared by every view
//! - [`ArrayView`] / [`ArrayViewMut`]: contiguous typed views
//! - [`StridedArrayView`] / [`StridedArrayViewMut`]: strided typed views with
//!   byte strides
//! - [`BitArrayView`], [`StridedBitArrayView`] and their mutable variants:
//!   bit-addressed views with a sub-byte base offset
//! - [`Owner`] / [`Owned`]: owner tracking for views that cross the boundary
//!   to a scripting host
//! - [`StridedBuffer`], [`ArrayBuffer`], [`BitBuffer`], [`StridedBitBuffer`]:
//!   owner-carrying, type-erased views with runtime format and mutability
//! - [`FormatAccessor`]: format string, item size and decode/encode functions
//! - [`BufferInfo`]: buffer-protocol descriptor for export and import
//!
//! # Example
//!
//! ```rust
//! use strided_buffer::{Component, Format, Size, StridedBuffer, Value};
//!
//! // 2x3 floats in 24 bytes
//! let bytes: Vec<u8> = [0.0f32, 1.0, 2.0, 3.0, 4.0, 5.0]
//!     .iter()
//!     .flat_map(|v| v.to_ne_bytes())
//!     .collect();
//! let view = StridedBuffer::<2>::from_vec(bytes, Size::new([2, 3]), Format::Array(Component::F32))
//!     .unwrap();
//!
//! // Rows 1..2, then reverse the columns, without copying
//! let view = view.slice(Size::new([1, 0]), Size::new([2, 3])).unwrap().flipped(1).unwrap();
//! assert_eq!(view.get(Size::new([0, 0])).unwrap(), Value::Float(5.0));
//! assert_eq!(view.get(Size::new([0, 2])).unwrap(), Value::Float(3.0));
//! ```

pub mod array;
pub mod bits;
pub mod buffer;
pub mod dims;
pub mod erased;
pub mod format;
pub mod layout;
pub mod owner;
pub mod strided;

// ============================================================================
// Primitives and algebra
// ============================================================================
pub use dims::{row_major_stride, Size, Stride};
pub use layout::{Layout, Offsets, ResolvedSlice, SliceSpec};

// ============================================================================
// Formats
// ============================================================================
pub use format::{
    Component, DecodeFn, EncodeFn, Format, FormatAccessor, PixelFormat, SceneFieldType, Value,
    VertexFormat,
};

// ============================================================================
// Typed views
// ============================================================================
pub use array::{ArrayView, ArrayViewMut};
pub use bits::{BitArrayView, BitArrayViewMut, StridedBitArrayView, StridedBitArrayViewMut};
pub use strided::{Element, StridedArrayView, StridedArrayViewMut};

// ============================================================================
// Ownership, erased views and the buffer bridge
// ============================================================================
pub use buffer::{BufferInfo, BufferRequest};
pub use erased::{
    ArrayBuffer, BitBuffer, RawArray, RawBits, RawStrided, RawStridedBits, StridedBitBuffer,
    StridedBuffer,
};
pub use owner::{Owned, Owner};

// ============================================================================
// Constants
// ============================================================================

/// Highest supported view arity. Layouts of any other `D` fail to compile.
pub const MAX_DIMS: usize = 4;

// ============================================================================
// Error types
// ============================================================================

/// Errors that can occur during view construction, transformation and access.
#[derive(Debug, thiserror::Error)]
pub enum StridedError {
    /// Element index outside a dimension.
    #[error("index {index} out of range for {size} elements in dimension {dim}")]
    IndexOutOfRange { dim: usize, index: usize, size: usize },

    /// Slice endpoints outside a dimension or in the wrong order.
    #[error("slice [{begin}:{end}] out of range for {size} elements in dimension {dim}")]
    SliceOutOfRange {
        dim: usize,
        begin: usize,
        end: usize,
        size: usize,
    },

    /// View extent doesn't fit into the memory it's created over.
    #[error("view needs {required} units but only {available} are available")]
    ViewOutOfBounds { required: usize, available: usize },

    /// Axis index outside the view's rank.
    #[error("invalid axis {axis} for rank {rank}")]
    InvalidAxis { axis: usize, rank: usize },

    /// Broadcast of a dimension that doesn't have exactly one element.
    #[error("can't broadcast dimension {dim} with {size} elements")]
    NotBroadcastable { dim: usize, size: usize },

    /// Expansion whose sizes don't multiply to the expanded extent.
    #[error("total size {expected} doesn't match {actual} elements in dimension {dim}")]
    SizeMismatch {
        dim: usize,
        expected: usize,
        actual: usize,
    },

    /// A size or stride that doesn't fit the address space.
    #[error("size or stride overflows in dimension {dim}")]
    Overflow { dim: usize },

    /// Collapse over dimensions that aren't contiguous to each other.
    #[error("dimension {dim} is not contiguous with the next one")]
    NotCollapsible { dim: usize },

    /// Non-positive step passed to `every`.
    #[error("invalid step {step} in dimension {dim}")]
    InvalidStep { dim: usize, step: isize },

    /// Malformed host slice.
    #[error("invalid slice {start:?}:{stop:?}:{step}")]
    InvalidSlice {
        start: Option<isize>,
        stop: Option<isize>,
        step: isize,
    },

    /// Write through a read-only view.
    #[error("view is read-only")]
    ReadOnly,

    /// Write through a dimension where all indices alias one location.
    #[error("can't write through broadcast dimension {dim}")]
    BroadcastWrite { dim: usize },

    /// Typed access with a type whose size differs from the view's items.
    #[error("item size mismatch: expected {expected}, got {actual}")]
    ItemSizeMismatch { expected: usize, actual: usize },

    /// Buffer descriptor with the wrong number of dimensions.
    #[error("expected {expected} buffer dimensions but got {actual}")]
    BufferDimensions { expected: usize, actual: usize },

    /// Buffer descriptor whose innermost stride isn't the item size.
    #[error("expected stride of {expected} but got {actual}")]
    BufferStride { expected: isize, actual: isize },

    /// Multi-dimensional buffer descriptor without a shape.
    #[error("buffer descriptor has no shape")]
    BufferMissingShape,

    /// Non-empty buffer descriptor without an owning object to keep it alive.
    #[error("buffer descriptor has no owner")]
    BufferMissingOwner,

    /// Strides not requested but the view isn't contiguous.
    #[error("view is not contiguous")]
    BufferNotContiguous,

    /// Writable access requested from a read-only view or descriptor.
    #[error("buffer is read-only")]
    BufferReadOnly,

    /// Decode or encode on a format without an accessor.
    #[error("not implemented: {0}")]
    NotImplemented(&'static str),

    /// Host value that can't be encoded into the format.
    #[error("invalid value: {0}")]
    InvalidValue(&'static str),

    /// Host value with the wrong number of components.
    #[error("expected {expected} components but got {actual}")]
    ComponentCount { expected: usize, actual: usize },
}

/// Category of a [`StridedError`], for callers that only need to tell the
/// kinds of failure apart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Index or slice endpoint outside a dimension.
    Bounds,
    /// Axis outside the view's rank.
    Dimension,
    /// Operation precondition on sizes, strides or steps not met.
    Precondition,
    /// Buffer descriptor doesn't match the requested view.
    Buffer,
    /// Write through a read-only or aliased view.
    Permission,
    /// Format without an accessor.
    Unsupported,
    /// Host value not encodable into the format.
    Value,
}

impl StridedError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            StridedError::IndexOutOfRange { .. }
            | StridedError::SliceOutOfRange { .. }
            | StridedError::ViewOutOfBounds { .. }
            | StridedError::Overflow { .. } => ErrorKind::Bounds,
            StridedError::InvalidAxis { .. } => ErrorKind::Dimension,
            StridedError::NotBroadcastable { .. }
            | StridedError::SizeMismatch { .. }
            | StridedError::NotCollapsible { .. }
            | StridedError::InvalidStep { .. }
            | StridedError::InvalidSlice { .. }
            | StridedError::ItemSizeMismatch { .. } => ErrorKind::Precondition,
            StridedError::BufferDimensions { .. }
            | StridedError::BufferStride { .. }
            | StridedError::BufferMissingShape
            | StridedError::BufferMissingOwner
            | StridedError::BufferNotContiguous
            | StridedError::BufferReadOnly => ErrorKind::Buffer,
            StridedError::ReadOnly | StridedError::BroadcastWrite { .. } => ErrorKind::Permission,
            StridedError::NotImplemented(_) => ErrorKind::Unsupported,
            StridedError::InvalidValue(_) | StridedError::ComponentCount { .. } => ErrorKind::Value,
        }
    }
}

/// Result type for view operations.
pub type Result<T> = std::result::Result<T, StridedError>;
