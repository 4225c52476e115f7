use core::fmt;
use core::hash::{Hash, Hasher};
use core::marker::PhantomData;

use super::ResourceKind;

/// Untyped handle value. `0` is invalid.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Ord, PartialOrd, Default)]
pub struct RawHandle(pub u64);

impl RawHandle {
    pub const INVALID: RawHandle = RawHandle(0);

    #[inline]
    pub const fn is_valid(self) -> bool {
        self.0 != 0
    }
}

impl fmt::Debug for RawHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_valid() {
            write!(f, "RawHandle({:#x})", self.0)
        } else {
            f.write_str("RawHandle(invalid)")
        }
    }
}

/// Typed, opaque identifier of one backend resource.
///
/// Handles are plain values: copying one does not duplicate the resource, and
/// dropping one does not release it. Use [`Owned`](super::Owned) for that.
pub struct Handle<K: ResourceKind> {
    raw: RawHandle,
    _kind: PhantomData<fn() -> K>,
}

impl<K: ResourceKind> Handle<K> {
    #[inline]
    pub const fn invalid() -> Self {
        Self::from_raw(RawHandle::INVALID)
    }

    #[inline]
    pub const fn from_raw(raw: RawHandle) -> Self {
        Self {
            raw,
            _kind: PhantomData,
        }
    }

    #[inline]
    pub const fn raw(self) -> RawHandle {
        self.raw
    }

    #[inline]
    pub const fn is_valid(self) -> bool {
        self.raw.is_valid()
    }
}

// Manual impls: derives would require `K: Clone`, `K: PartialEq`, ...

impl<K: ResourceKind> Clone for Handle<K> {
    #[inline]
    fn clone(&self) -> Self {
        *self
    }
}

impl<K: ResourceKind> Copy for Handle<K> {}

impl<K: ResourceKind> PartialEq for Handle<K> {
    #[inline]
    fn eq(&self, other: &Self) -> bool {
        self.raw == other.raw
    }
}

impl<K: ResourceKind> Eq for Handle<K> {}

impl<K: ResourceKind> Hash for Handle<K> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.raw.hash(state);
    }
}

impl<K: ResourceKind> Default for Handle<K> {
    fn default() -> Self {
        Self::invalid()
    }
}

impl<K: ResourceKind> fmt::Debug for Handle<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_valid() {
            write!(f, "Handle<{}>({:#x})", K::ID, self.raw.0)
        } else {
            write!(f, "Handle<{}>(invalid)", K::ID)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handle::kind::{Buffer, PipelineState};

    #[test]
    fn zero_is_invalid() {
        assert!(!Handle::<Buffer>::invalid().is_valid());
        assert!(!Handle::<Buffer>::default().is_valid());
        assert!(Handle::<Buffer>::from_raw(RawHandle(1)).is_valid());
    }

    #[test]
    fn handles_compare_by_value() {
        let a = Handle::<PipelineState>::from_raw(RawHandle(7));
        let b = a;
        assert_eq!(a, b);
        assert_ne!(a, Handle::from_raw(RawHandle(8)));
    }

    #[test]
    fn debug_names_kind() {
        let h = Handle::<Buffer>::from_raw(RawHandle(0x10));
        assert_eq!(format!("{h:?}"), "Handle<buffer>(0x10)");
        assert_eq!(format!("{:?}", Handle::<Buffer>::invalid()), "Handle<buffer>(invalid)");
    }
}
