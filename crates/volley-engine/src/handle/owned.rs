use core::fmt;
use core::mem;

use super::{Handle, RawHandle, ResourceKind, ResourceKindId};

/// Something that can release resources it handed out.
///
/// Releasing an invalid or already-released handle must be a no-op.
pub trait Release {
    fn release(&self, kind: ResourceKindId, raw: RawHandle);
}

/// Exclusive owner of one resource handle.
///
/// The owned resource is released exactly once: when another handle is
/// assigned with [`set`](Self::set), on [`reset`](Self::reset), or on drop.
/// `Owned` is deliberately not `Clone`; two owners of one resource would
/// release it twice.
pub struct Owned<'r, K: ResourceKind> {
    owner: &'r dyn Release,
    handle: Handle<K>,
}

impl<'r, K: ResourceKind> Owned<'r, K> {
    /// Takes ownership of `handle`, which must have been created by `owner`.
    pub fn new(owner: &'r dyn Release, handle: Handle<K>) -> Self {
        Self { owner, handle }
    }

    /// Creates an owner holding the invalid handle.
    pub fn empty(owner: &'r dyn Release) -> Self {
        Self::new(owner, Handle::invalid())
    }

    #[inline]
    pub fn get(&self) -> Handle<K> {
        self.handle
    }

    #[inline]
    pub fn is_valid(&self) -> bool {
        self.handle.is_valid()
    }

    /// Releases the current resource (if any) and takes ownership of `handle`.
    ///
    /// Assigning the handle already owned is a no-op.
    pub fn set(&mut self, handle: Handle<K>) {
        if handle == self.handle {
            return;
        }
        self.release_current();
        self.handle = handle;
    }

    /// Releases the current resource now.
    pub fn reset(&mut self) {
        self.set(Handle::invalid());
    }

    /// Gives up ownership without releasing. The caller becomes responsible
    /// for the returned handle.
    #[must_use]
    pub fn take(&mut self) -> Handle<K> {
        mem::replace(&mut self.handle, Handle::invalid())
    }

    fn release_current(&mut self) {
        if self.handle.is_valid() {
            self.owner.release(K::ID, self.handle.raw());
        }
    }
}

impl<K: ResourceKind> Drop for Owned<'_, K> {
    fn drop(&mut self) {
        self.release_current();
    }
}

impl<K: ResourceKind> fmt::Debug for Owned<'_, K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Owned").field(&self.handle).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handle::kind::{Buffer, PipelineState};
    use std::cell::RefCell;

    #[derive(Default)]
    struct Releases(RefCell<Vec<(ResourceKindId, u64)>>);

    impl Release for Releases {
        fn release(&self, kind: ResourceKindId, raw: RawHandle) {
            self.0.borrow_mut().push((kind, raw.0));
        }
    }

    fn h<K: ResourceKind>(v: u64) -> Handle<K> {
        Handle::from_raw(RawHandle(v))
    }

    #[test]
    fn drop_releases_once() {
        let log = Releases::default();
        {
            let _owned = Owned::new(&log, h::<Buffer>(3));
        }
        assert_eq!(*log.0.borrow(), vec![(ResourceKindId::Buffer, 3)]);
    }

    #[test]
    fn reassignment_releases_previous_exactly_once() {
        let log = Releases::default();
        let mut owned = Owned::new(&log, h::<PipelineState>(1));
        owned.set(h(2));
        owned.set(h(3));
        owned.set(h(3));
        assert_eq!(owned.get(), h(3));
        drop(owned);
        assert_eq!(
            *log.0.borrow(),
            vec![
                (ResourceKindId::PipelineState, 1),
                (ResourceKindId::PipelineState, 2),
                (ResourceKindId::PipelineState, 3),
            ]
        );
    }

    #[test]
    fn invalid_handles_are_never_released() {
        let log = Releases::default();
        let mut owned = Owned::<Buffer>::empty(&log);
        assert!(!owned.is_valid());
        owned.reset();
        owned.set(h(5));
        owned.reset();
        owned.reset();
        drop(owned);
        assert_eq!(*log.0.borrow(), vec![(ResourceKindId::Buffer, 5)]);
    }

    #[test]
    fn take_transfers_responsibility() {
        let log = Releases::default();
        let mut owned = Owned::new(&log, h::<Buffer>(9));
        let raw = owned.take();
        drop(owned);
        assert_eq!(raw, h(9));
        assert!(log.0.borrow().is_empty());
    }
}
