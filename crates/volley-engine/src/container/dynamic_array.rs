use core::fmt;
use core::marker::PhantomData;
use core::mem::{self, MaybeUninit};
use core::ops::{Deref, DerefMut};
use core::ptr::{self, NonNull};
use core::slice;
use std::alloc::Layout;

use super::{ArrayAllocator, DefaultAllocator};

/// Growable contiguous array with `I` inline slots.
///
/// Storage has two states:
/// - inline: elements live in the array value itself, `capacity() == I`
/// - heap: elements live in a block obtained from `A`
///
/// The array switches to heap storage the first time it grows past `I` and only
/// returns to inline storage on [`purge`](Self::purge). When full, capacity grows
/// by a fixed `G` slots (`len + G`), never geometrically.
///
/// Performance characteristics:
/// - `add` is O(1) amortised over `G` insertions, O(len) on growth
/// - `remove` is O(len - index); order of the remaining elements is preserved
/// - `clear` keeps capacity, so a warmed-up array does not reallocate
///
/// Allocation failure is fatal (`handle_alloc_error`). Callers that cannot
/// afford it should pre-size with [`reserve`](Self::reserve).
pub struct DynamicArray<
    T,
    const I: usize = 32,
    const G: usize = 64,
    A: ArrayAllocator = DefaultAllocator,
> {
    inline: [MaybeUninit<T>; I],
    heap: Option<NonNull<T>>,
    capacity: usize,
    len: usize,
    _owns: PhantomData<T>,
    _alloc: PhantomData<fn() -> A>,
}

// SAFETY: the array uniquely owns its elements, like `Vec<T>`.
unsafe impl<T: Send, const I: usize, const G: usize, A: ArrayAllocator> Send
    for DynamicArray<T, I, G, A>
{
}
// SAFETY: shared access only hands out `&T`.
unsafe impl<T: Sync, const I: usize, const G: usize, A: ArrayAllocator> Sync
    for DynamicArray<T, I, G, A>
{
}

impl<T, const I: usize, const G: usize, A: ArrayAllocator> DynamicArray<T, I, G, A> {
    /// Number of slots available before the first heap allocation.
    pub const INLINE_CAPACITY: usize = I;
    /// Number of slots added on each growth step.
    pub const GROW_AMOUNT: usize = G;

    pub fn new() -> Self {
        const { assert!(G > 0, "DynamicArray grow amount must be non-zero") };
        Self {
            inline: [const { MaybeUninit::uninit() }; I],
            heap: None,
            capacity: I,
            len: 0,
            _owns: PhantomData,
            _alloc: PhantomData,
        }
    }

    /// Creates an array able to hold `capacity` elements without growing.
    pub fn with_capacity(capacity: usize) -> Self {
        let mut array = Self::new();
        array.reserve(capacity);
        array
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Returns `true` while elements are stored inline.
    #[inline]
    pub fn is_inline(&self) -> bool {
        self.heap.is_none()
    }

    #[inline]
    fn as_ptr(&self) -> *const T {
        match self.heap {
            Some(ptr) => ptr.as_ptr(),
            None => self.inline.as_ptr().cast(),
        }
    }

    #[inline]
    fn as_mut_ptr(&mut self) -> *mut T {
        match self.heap {
            Some(ptr) => ptr.as_ptr(),
            None => self.inline.as_mut_ptr().cast(),
        }
    }

    #[inline]
    pub fn as_slice(&self) -> &[T] {
        // SAFETY: the first `len` slots are initialized.
        unsafe { slice::from_raw_parts(self.as_ptr(), self.len) }
    }

    #[inline]
    pub fn as_mut_slice(&mut self) -> &mut [T] {
        // SAFETY: the first `len` slots are initialized and uniquely borrowed.
        unsafe { slice::from_raw_parts_mut(self.as_mut_ptr(), self.len) }
    }

    /// Appends `value`, growing by `G` slots when full.
    #[inline]
    pub fn add(&mut self, value: T) {
        if self.len == self.capacity {
            self.grow_to(self.len + G);
        }
        // SAFETY: `len < capacity` after the check above.
        unsafe { self.as_mut_ptr().add(self.len).write(value) };
        self.len += 1;
    }

    /// Appends the value produced by `make` and returns a reference to it.
    ///
    /// Growth happens before `make` runs; a panicking constructor leaves the
    /// array unchanged apart from its capacity.
    pub fn emplace_add(&mut self, make: impl FnOnce() -> T) -> &mut T {
        if self.len == self.capacity {
            self.grow_to(self.len + G);
        }
        let value = make();
        // SAFETY: `len < capacity`; the slot is uninitialized.
        unsafe {
            let slot = self.as_mut_ptr().add(self.len);
            slot.write(value);
            self.len += 1;
            &mut *slot
        }
    }

    /// Ensures room for at least `capacity` elements.
    pub fn reserve(&mut self, capacity: usize) {
        if capacity > self.capacity {
            self.grow_to(capacity);
        }
    }

    /// Removes the element at `index`, shifting the tail left by one.
    ///
    /// Returns `None` (and does nothing) when `index` is out of range.
    pub fn remove(&mut self, index: usize) -> Option<T> {
        if index >= self.len {
            return None;
        }
        // SAFETY: `index < len`; the tail `[index + 1, len)` is initialized and
        // moves one slot down, after which slot `len - 1` is logically vacant.
        unsafe {
            let base = self.as_mut_ptr();
            let value = base.add(index).read();
            ptr::copy(base.add(index + 1), base.add(index), self.len - index - 1);
            self.len -= 1;
            Some(value)
        }
    }

    /// Returns the index of the first element equal to `value`.
    pub fn find(&self, value: &T) -> Option<usize>
    where
        T: PartialEq,
    {
        self.as_slice().iter().position(|e| e == value)
    }

    /// Removes the first element equal to `value`. No-op when absent.
    pub fn remove_item(&mut self, value: &T) -> Option<T>
    where
        T: PartialEq,
    {
        let index = self.find(value)?;
        self.remove(index)
    }

    /// Removes and returns the last element.
    pub fn pop(&mut self) -> Option<T> {
        if self.len == 0 {
            return None;
        }
        self.len -= 1;
        // SAFETY: slot `len` was initialized and is now outside the live range.
        Some(unsafe { self.as_mut_ptr().add(self.len).read() })
    }

    /// Drops every element past `len`.
    pub fn truncate(&mut self, len: usize) {
        if len >= self.len {
            return;
        }
        let tail = self.len - len;
        // Shrink first so a panicking destructor cannot cause a double drop.
        self.len = len;
        // SAFETY: `[len, len + tail)` was initialized and is no longer reachable.
        unsafe {
            ptr::drop_in_place(ptr::slice_from_raw_parts_mut(
                self.as_mut_ptr().add(len),
                tail,
            ));
        }
    }

    /// Drops all elements. Capacity is kept.
    pub fn clear(&mut self) {
        self.truncate(0);
    }

    /// Drops all elements and returns heap storage; capacity goes back to `I`.
    pub fn purge(&mut self) {
        self.clear();
        self.release_heap();
        self.capacity = I;
    }

    /// Resizes to `len`, filling new slots with `T::default()`.
    pub fn resize(&mut self, len: usize)
    where
        T: Default,
    {
        if len <= self.len {
            self.truncate(len);
            return;
        }
        self.reserve(len);
        while self.len < len {
            self.add(T::default());
        }
    }

    fn grow_to(&mut self, new_capacity: usize) {
        debug_assert!(new_capacity > self.capacity);

        // Zero-sized elements never need backing memory.
        if mem::size_of::<T>() == 0 {
            self.capacity = new_capacity;
            return;
        }

        let layout = match Layout::array::<T>(new_capacity) {
            Ok(layout) => layout,
            Err(_) => panic!("DynamicArray capacity overflow ({new_capacity} elements)"),
        };
        let Some(block) = A::allocate(layout) else {
            std::alloc::handle_alloc_error(layout)
        };
        let block = block.cast::<T>();

        // SAFETY: the new block holds `new_capacity > len` slots and does not
        // overlap the current storage. Elements are moved bitwise; the old
        // slots are treated as uninitialized from here on.
        unsafe { ptr::copy_nonoverlapping(self.as_ptr(), block.as_ptr(), self.len) };

        self.release_heap();
        self.heap = Some(block);
        self.capacity = new_capacity;
    }

    /// Frees the heap block (if any) without touching elements.
    fn release_heap(&mut self) {
        let Some(block) = self.heap.take() else { return };
        // SAFETY: the block was allocated with `Layout::array::<T>(capacity)`,
        // which succeeded at the time, so the same layout is valid now.
        unsafe {
            let layout = Layout::from_size_align_unchecked(
                mem::size_of::<T>() * self.capacity,
                mem::align_of::<T>(),
            );
            A::free(block.cast(), layout);
        }
    }
}

impl<T, const I: usize, const G: usize, A: ArrayAllocator> Drop for DynamicArray<T, I, G, A> {
    fn drop(&mut self) {
        self.purge();
    }
}

impl<T, const I: usize, const G: usize, A: ArrayAllocator> Default for DynamicArray<T, I, G, A> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Clone, const I: usize, const G: usize, A: ArrayAllocator> Clone
    for DynamicArray<T, I, G, A>
{
    fn clone(&self) -> Self {
        let mut out = Self::with_capacity(self.len);
        for item in self.iter() {
            out.add(item.clone());
        }
        out
    }
}

impl<T, const I: usize, const G: usize, A: ArrayAllocator> Deref for DynamicArray<T, I, G, A> {
    type Target = [T];

    #[inline]
    fn deref(&self) -> &[T] {
        self.as_slice()
    }
}

impl<T, const I: usize, const G: usize, A: ArrayAllocator> DerefMut for DynamicArray<T, I, G, A> {
    #[inline]
    fn deref_mut(&mut self) -> &mut [T] {
        self.as_mut_slice()
    }
}

impl<T: fmt::Debug, const I: usize, const G: usize, A: ArrayAllocator> fmt::Debug
    for DynamicArray<T, I, G, A>
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.iter()).finish()
    }
}

impl<T: PartialEq, const I: usize, const G: usize, A: ArrayAllocator> PartialEq
    for DynamicArray<T, I, G, A>
{
    fn eq(&self, other: &Self) -> bool {
        self.as_slice() == other.as_slice()
    }
}

impl<T: Eq, const I: usize, const G: usize, A: ArrayAllocator> Eq for DynamicArray<T, I, G, A> {}

impl<T, const I: usize, const G: usize, A: ArrayAllocator> Extend<T> for DynamicArray<T, I, G, A> {
    fn extend<It: IntoIterator<Item = T>>(&mut self, iter: It) {
        for item in iter {
            self.add(item);
        }
    }
}

impl<T, const I: usize, const G: usize, A: ArrayAllocator> FromIterator<T>
    for DynamicArray<T, I, G, A>
{
    fn from_iter<It: IntoIterator<Item = T>>(iter: It) -> Self {
        let mut out = Self::new();
        out.extend(iter);
        out
    }
}

impl<'a, T, const I: usize, const G: usize, A: ArrayAllocator> IntoIterator
    for &'a DynamicArray<T, I, G, A>
{
    type Item = &'a T;
    type IntoIter = slice::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<'a, T, const I: usize, const G: usize, A: ArrayAllocator> IntoIterator
    for &'a mut DynamicArray<T, I, G, A>
{
    type Item = &'a mut T;
    type IntoIter = slice::IterMut<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter_mut()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::rc::Rc;

    thread_local! {
        static LIVE_BLOCKS: Cell<isize> = const { Cell::new(0) };
        static TOTAL_ALLOCS: Cell<usize> = const { Cell::new(0) };
    }

    struct CountingAllocator;

    impl ArrayAllocator for CountingAllocator {
        fn allocate(layout: Layout) -> Option<NonNull<u8>> {
            LIVE_BLOCKS.with(|c| c.set(c.get() + 1));
            TOTAL_ALLOCS.with(|c| c.set(c.get() + 1));
            DefaultAllocator::allocate(layout)
        }

        unsafe fn free(ptr: NonNull<u8>, layout: Layout) {
            LIVE_BLOCKS.with(|c| c.set(c.get() - 1));
            unsafe { DefaultAllocator::free(ptr, layout) }
        }
    }

    fn live_blocks() -> isize {
        LIVE_BLOCKS.with(|c| c.get())
    }

    fn total_allocs() -> usize {
        TOTAL_ALLOCS.with(|c| c.get())
    }

    type Small<T> = DynamicArray<T, 4, 2, CountingAllocator>;

    /// Increments a shared counter when dropped.
    #[derive(Debug)]
    struct Tracked(u32, Rc<Cell<usize>>);

    impl Drop for Tracked {
        fn drop(&mut self) {
            self.1.set(self.1.get() + 1);
        }
    }

    impl PartialEq for Tracked {
        fn eq(&self, other: &Self) -> bool {
            self.0 == other.0
        }
    }

    // ── growth ────────────────────────────────────────────────────────────

    #[test]
    fn new_array_is_inline_with_inline_capacity() {
        let a: Small<u32> = DynamicArray::new();
        assert!(a.is_empty());
        assert!(a.is_inline());
        assert_eq!(a.capacity(), 4);
    }

    #[test]
    fn adds_within_inline_capacity_do_not_allocate() {
        let before = total_allocs();
        let mut a: Small<u32> = DynamicArray::new();
        for i in 0..4 {
            a.add(i);
        }
        assert_eq!(total_allocs(), before);
        assert!(a.is_inline());
        assert_eq!(a.as_slice(), &[0, 1, 2, 3]);
    }

    #[test]
    fn content_survives_inline_to_heap_boundary() {
        let mut a: Small<u32> = DynamicArray::new();
        for i in 0..20u32 {
            a.add(i * 10);
            assert_eq!(a.len(), i as usize + 1);
            for (j, v) in a.iter().enumerate() {
                assert_eq!(*v, j as u32 * 10);
            }
        }
        assert!(!a.is_inline());
    }

    #[test]
    fn growth_adds_fixed_increment() {
        let mut a: Small<u8> = DynamicArray::new();
        for i in 0..5 {
            a.add(i);
        }
        // len 4 + G 2
        assert_eq!(a.capacity(), 6);
        a.add(5);
        a.add(6);
        assert_eq!(a.capacity(), 8);
    }

    #[test]
    fn heap_block_is_released_on_drop() {
        let before = live_blocks();
        {
            let mut a: Small<u64> = DynamicArray::new();
            for i in 0..32 {
                a.add(i);
            }
            assert_eq!(live_blocks(), before + 1);
        }
        assert_eq!(live_blocks(), before);
    }

    #[test]
    fn emplace_add_returns_new_element() {
        let mut a: Small<String> = DynamicArray::new();
        let s = a.emplace_add(|| "hello".to_owned());
        s.push('!');
        assert_eq!(a[0], "hello!");
    }

    #[test]
    fn reserve_presizes_without_losing_content() {
        let mut a: Small<u32> = DynamicArray::new();
        a.add(7);
        a.reserve(50);
        assert!(a.capacity() >= 50);
        assert_eq!(a.as_slice(), &[7]);

        let allocs = total_allocs();
        for i in 0..49 {
            a.add(i);
        }
        assert_eq!(total_allocs(), allocs);
    }

    // ── removal ───────────────────────────────────────────────────────────

    #[test]
    fn remove_preserves_relative_order() {
        let mut a: Small<u32> = (0..10).collect();
        assert_eq!(a.remove(3), Some(3));
        assert_eq!(a.as_slice(), &[0, 1, 2, 4, 5, 6, 7, 8, 9]);
        assert_eq!(a.remove(0), Some(0));
        assert_eq!(a.remove(a.len() - 1), Some(9));
        assert_eq!(a.as_slice(), &[1, 2, 4, 5, 6, 7, 8]);
    }

    #[test]
    fn remove_out_of_range_is_noop() {
        let mut a: Small<u32> = (0..3).collect();
        assert_eq!(a.remove(3), None);
        assert_eq!(a.as_slice(), &[0, 1, 2]);
    }

    #[test]
    fn remove_item_removes_first_match_only() {
        let mut a: Small<u32> = [1, 2, 3, 2, 1].into_iter().collect();
        assert_eq!(a.remove_item(&2), Some(2));
        assert_eq!(a.as_slice(), &[1, 3, 2, 1]);
        assert_eq!(a.remove_item(&42), None);
        assert_eq!(a.len(), 4);
    }

    #[test]
    fn removed_element_is_dropped_exactly_once() {
        let drops = Rc::new(Cell::new(0));
        let mut a: Small<Tracked> = DynamicArray::new();
        for i in 0..6 {
            a.add(Tracked(i, drops.clone()));
        }
        drop(a.remove(2));
        assert_eq!(drops.get(), 1);
        assert_eq!(a.iter().map(|t| t.0).collect::<Vec<_>>(), vec![0, 1, 3, 4, 5]);
        drop(a);
        assert_eq!(drops.get(), 6);
    }

    // ── clear / purge ─────────────────────────────────────────────────────

    #[test]
    fn clear_drops_elements_and_keeps_capacity() {
        let drops = Rc::new(Cell::new(0));
        let mut a: Small<Tracked> = DynamicArray::new();
        for i in 0..9 {
            a.add(Tracked(i, drops.clone()));
        }
        let cap = a.capacity();
        a.clear();
        assert_eq!(drops.get(), 9);
        assert!(a.is_empty());
        assert_eq!(a.capacity(), cap);
        assert!(!a.is_inline());
    }

    #[test]
    fn purge_returns_to_inline_storage() {
        let before = live_blocks();
        let mut a: Small<u32> = (0..12).collect();
        assert_eq!(live_blocks(), before + 1);
        a.purge();
        assert_eq!(live_blocks(), before);
        assert!(a.is_inline());
        assert_eq!(a.capacity(), 4);
        a.add(1);
        assert_eq!(a.as_slice(), &[1]);
    }

    // ── misc ──────────────────────────────────────────────────────────────

    #[test]
    fn resize_grows_with_defaults_and_truncates() {
        let mut a: Small<u32> = [5, 6].into_iter().collect();
        a.resize(5);
        assert_eq!(a.as_slice(), &[5, 6, 0, 0, 0]);
        a.resize(1);
        assert_eq!(a.as_slice(), &[5]);
    }

    #[test]
    fn clone_is_deep_and_independent() {
        let a: Small<String> = ["a", "b", "c", "d", "e"].iter().map(|s| s.to_string()).collect();
        let mut b = a.clone();
        b[0].push('x');
        assert_eq!(a[0], "a");
        assert_eq!(b[0], "ax");
        assert_eq!(&a[1..], &b[1..]);
    }

    #[test]
    fn moved_inline_array_keeps_its_elements() {
        let a: Small<u32> = (0..3).collect();
        let boxed = Box::new(a);
        assert_eq!(boxed.as_slice(), &[0, 1, 2]);
    }

    #[test]
    fn zero_sized_elements_never_allocate() {
        let before = total_allocs();
        let mut a: Small<()> = DynamicArray::new();
        for _ in 0..100 {
            a.add(());
        }
        assert_eq!(a.len(), 100);
        assert_eq!(total_allocs(), before);
    }

    #[test]
    fn pop_returns_last() {
        let mut a: Small<u32> = (0..6).collect();
        assert_eq!(a.pop(), Some(5));
        assert_eq!(a.len(), 5);
        let mut empty: Small<u32> = DynamicArray::new();
        assert_eq!(empty.pop(), None);
    }
}
