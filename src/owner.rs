//! Owner tracking for views that outlive the scope they were created in.
//!
//! An [`Owner`] is a shared, reference-counted handle to whatever keeps a
//! view's memory alive: a heap allocation made by this crate or an object
//! supplied by the embedding layer. [`Owned`] pairs a view with at most one
//! such handle. Every view-returning operation on an `Owned` clones the same
//! handle into its result, so memory stays valid for as long as the longest
//! derived view, and drops it when the result addresses nothing.
//!
//! Handles are `Rc`-based. Like the rest of the crate they assume the embedding
//! layer serializes all calls; none of these types are `Send` or `Sync`.

use std::any::Any;
use std::fmt;
use std::ops::Deref;
use std::rc::Rc;

/// Shared handle that keeps the memory behind a view alive.
///
/// Cloning shares the handle; the last clone to drop releases the underlying
/// object. The view subsystem never looks inside.
#[derive(Clone)]
pub struct Owner(Rc<dyn Any>);

impl Owner {
    /// Wrap any object as an owner.
    pub fn new<T: Any>(value: T) -> Self {
        Owner(Rc::new(value))
    }

    /// Adopt an already shared object.
    pub fn from_rc(rc: Rc<dyn Any>) -> Self {
        Owner(rc)
    }

    /// Whether two handles refer to the same owner.
    #[inline]
    pub fn ptr_eq(a: &Owner, b: &Owner) -> bool {
        Rc::ptr_eq(&a.0, &b.0)
    }

    /// Number of live handles to this owner.
    #[inline]
    pub fn strong_count(this: &Owner) -> usize {
        Rc::strong_count(&this.0)
    }

    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.0.downcast_ref::<T>()
    }
}

impl fmt::Debug for Owner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Owner")
            .field(&Rc::as_ptr(&self.0).cast::<()>())
            .finish()
    }
}

/// Heap bytes owned by an [`Owner`] created from a `Vec<u8>`.
///
/// The allocation is held as a raw pointer so views can write into it without
/// ever forming a reference to the whole buffer.
pub(crate) struct HeapStorage {
    ptr: *mut u8,
    len: usize,
}

impl HeapStorage {
    pub(crate) fn new(bytes: Vec<u8>) -> Self {
        let boxed = bytes.into_boxed_slice();
        let len = boxed.len();
        let ptr = Box::into_raw(boxed).cast::<u8>();
        HeapStorage { ptr, len }
    }

    #[inline]
    pub(crate) fn as_mut_ptr(&self) -> *mut u8 {
        self.ptr
    }

    #[inline]
    pub(crate) fn len(&self) -> usize {
        self.len
    }
}

impl Drop for HeapStorage {
    fn drop(&mut self) {
        // SAFETY: ptr and len come from Box::into_raw of a boxed slice in new()
        unsafe {
            drop(Box::from_raw(std::ptr::slice_from_raw_parts_mut(
                self.ptr, self.len,
            )));
        }
    }
}

/// Move `bytes` into a fresh owner, returning the owner and the base pointer.
pub(crate) fn heap_owner(bytes: Vec<u8>) -> (Owner, *mut u8, usize) {
    let storage = HeapStorage::new(bytes);
    let (ptr, len) = (storage.as_mut_ptr(), storage.len());
    (Owner::new(storage), ptr, len)
}

/// Views that can report whether they address any element.
pub(crate) trait ViewExtent {
    fn is_empty_view(&self) -> bool;
}

/// A view together with the owner that keeps its memory alive.
///
/// A view that addresses no element never keeps an owner, whatever was passed
/// in. The only way to build one is through this crate's constructors, so a
/// non-empty view can't be separated from its owner:
///
/// ```compile_fail,E0624
/// use strided_buffer::{Component, Owned, Size, StridedBuffer};
///
/// let buffer = StridedBuffer::from_vec(vec![0u8; 4], Size::new([4]), Component::U8).unwrap();
/// let detached = Owned::new(*buffer.view(), None);
/// ```
#[derive(Clone)]
pub struct Owned<V> {
    view: V,
    owner: Option<Owner>,
}

impl<V: ViewExtent> Owned<V> {
    pub(crate) fn new(view: V, owner: Option<Owner>) -> Self {
        let owner = if view.is_empty_view() {
            if owner.is_some() {
                tracing::trace!("empty view, dropping owner");
            }
            None
        } else {
            owner
        };
        Owned { view, owner }
    }

    /// Wrap a derived view, sharing this view's owner.
    #[inline]
    pub(crate) fn derive<W: ViewExtent>(&self, view: W) -> Owned<W> {
        Owned::new(view, self.owner.clone())
    }
}

impl<V> Owned<V> {
    /// Metadata of the wrapped view.
    #[inline]
    pub fn view(&self) -> &V {
        &self.view
    }

    #[inline]
    pub fn owner(&self) -> Option<&Owner> {
        self.owner.as_ref()
    }
}

impl<V> Deref for Owned<V> {
    type Target = V;

    #[inline]
    fn deref(&self) -> &V {
        &self.view
    }
}

impl<V: fmt::Debug> fmt::Debug for Owned<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Owned")
            .field("view", &self.view)
            .field("owner", &self.owner)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Extent(usize);

    impl ViewExtent for Extent {
        fn is_empty_view(&self) -> bool {
            self.0 == 0
        }
    }

    #[test]
    fn test_owner_sharing() {
        let owner = Owner::new(vec![1u8, 2, 3]);
        let a = Owned::new(Extent(3), Some(owner.clone()));
        let b = a.derive(Extent(2));
        assert_eq!(Owner::strong_count(&owner), 3);
        assert!(Owner::ptr_eq(a.owner().unwrap(), b.owner().unwrap()));
        drop(a);
        drop(b);
        assert_eq!(Owner::strong_count(&owner), 1);
        assert_eq!(owner.downcast_ref::<Vec<u8>>().unwrap().len(), 3);
    }

    #[test]
    fn test_empty_view_drops_owner() {
        let owner = Owner::new(0u32);
        let a = Owned::new(Extent(0), Some(owner.clone()));
        assert!(a.owner().is_none());
        assert_eq!(Owner::strong_count(&owner), 1);

        let b = Owned::new(Extent(4), Some(owner.clone()));
        let empty = b.derive(Extent(0));
        assert!(empty.owner().is_none());
        assert_eq!(Owner::strong_count(&owner), 2);
    }

    #[test]
    fn test_heap_owner_keeps_bytes() {
        let (owner, ptr, len) = heap_owner(vec![7, 8, 9]);
        assert_eq!(len, 3);
        let storage = owner.downcast_ref::<HeapStorage>().unwrap();
        assert_eq!(storage.as_mut_ptr(), ptr);
        // SAFETY: the owner is alive and holds three bytes
        assert_eq!(unsafe { *ptr.add(2) }, 9);
    }
}
