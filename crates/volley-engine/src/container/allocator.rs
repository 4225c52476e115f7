use std::alloc::Layout;
use std::ptr::NonNull;

/// Storage policy used by [`DynamicArray`](super::DynamicArray) once it outgrows
/// its inline buffer.
///
/// Implementations are stateless: the array stores no allocator instance.
pub trait ArrayAllocator {
    /// Allocates a block for `layout`. `layout` is never zero-sized.
    ///
    /// Returns `None` when the request cannot be satisfied; the array treats
    /// that as fatal.
    fn allocate(layout: Layout) -> Option<NonNull<u8>>;

    /// Returns a block to the allocator.
    ///
    /// # Safety
    /// `ptr` must have been returned by [`ArrayAllocator::allocate`] of the same
    /// allocator with an identical `layout`, and must not be used afterwards.
    unsafe fn free(ptr: NonNull<u8>, layout: Layout);
}

/// Global-heap allocator policy.
#[derive(Debug, Default, Copy, Clone)]
pub struct DefaultAllocator;

impl ArrayAllocator for DefaultAllocator {
    #[inline]
    fn allocate(layout: Layout) -> Option<NonNull<u8>> {
        debug_assert!(layout.size() > 0);
        // SAFETY: the array never requests zero-sized blocks.
        NonNull::new(unsafe { std::alloc::alloc(layout) })
    }

    #[inline]
    unsafe fn free(ptr: NonNull<u8>, layout: Layout) {
        // SAFETY: forwarded caller contract.
        unsafe { std::alloc::dealloc(ptr.as_ptr(), layout) }
    }
}
