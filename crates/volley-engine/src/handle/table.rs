use crate::container::DynamicArray;

use super::RawHandle;

struct Slot<T> {
    generation: u32,
    value: Option<T>,
}

/// Slot map from [`RawHandle`] to backend objects.
///
/// A handle encodes `generation << 32 | (index + 1)`: the low half is never
/// zero, so no live entry is ever addressed by the invalid handle. Removing an
/// entry bumps its slot generation, so stale handles miss instead of resolving
/// to whatever reuses the slot.
pub struct ResourceTable<T> {
    slots: DynamicArray<Slot<T>, 8, 32>,
    free: DynamicArray<u32, 8, 32>,
    live: usize,
}

impl<T> ResourceTable<T> {
    pub fn new() -> Self {
        Self {
            slots: DynamicArray::new(),
            free: DynamicArray::new(),
            live: 0,
        }
    }

    /// Number of live entries.
    #[inline]
    pub fn len(&self) -> usize {
        self.live
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.live == 0
    }

    pub fn insert(&mut self, value: T) -> RawHandle {
        self.live += 1;

        if let Some(index) = self.free.pop() {
            let slot = &mut self.slots[index as usize];
            slot.value = Some(value);
            return encode(index, slot.generation);
        }

        let index = self.slots.len() as u32;
        self.slots.add(Slot {
            generation: 0,
            value: Some(value),
        });
        encode(index, 0)
    }

    pub fn get(&self, raw: RawHandle) -> Option<&T> {
        let (index, generation) = decode(raw)?;
        let slot = self.slots.get(index as usize)?;
        if slot.generation != generation {
            return None;
        }
        slot.value.as_ref()
    }

    pub fn get_mut(&mut self, raw: RawHandle) -> Option<&mut T> {
        let (index, generation) = decode(raw)?;
        let slot = self.slots.get_mut(index as usize)?;
        if slot.generation != generation {
            return None;
        }
        slot.value.as_mut()
    }

    #[inline]
    pub fn contains(&self, raw: RawHandle) -> bool {
        self.get(raw).is_some()
    }

    /// Removes and returns the entry. Invalid or stale handles return `None`.
    pub fn remove(&mut self, raw: RawHandle) -> Option<T> {
        let (index, generation) = decode(raw)?;
        let slot = self.slots.get_mut(index as usize)?;
        if slot.generation != generation {
            return None;
        }
        let value = slot.value.take()?;
        slot.generation = slot.generation.wrapping_add(1);
        self.free.add(index);
        self.live -= 1;
        Some(value)
    }

    /// Iterates live entries in slot order.
    pub fn iter(&self) -> impl Iterator<Item = (RawHandle, &T)> {
        self.slots.iter().enumerate().filter_map(|(i, slot)| {
            slot.value
                .as_ref()
                .map(|v| (encode(i as u32, slot.generation), v))
        })
    }
}

impl<T> Default for ResourceTable<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[inline]
fn encode(index: u32, generation: u32) -> RawHandle {
    RawHandle(((generation as u64) << 32) | (index as u64 + 1))
}

#[inline]
fn decode(raw: RawHandle) -> Option<(u32, u32)> {
    let low = (raw.0 & 0xffff_ffff) as u32;
    if low == 0 {
        return None;
    }
    Some((low - 1, (raw.0 >> 32) as u32))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inserted_handles_are_valid_and_resolve() {
        let mut t = ResourceTable::new();
        let a = t.insert("a");
        let b = t.insert("b");
        assert!(a.is_valid() && b.is_valid());
        assert_ne!(a, b);
        assert_eq!(t.get(a), Some(&"a"));
        assert_eq!(t.get(b), Some(&"b"));
        assert_eq!(t.len(), 2);
    }

    #[test]
    fn invalid_handle_never_resolves() {
        let mut t = ResourceTable::new();
        t.insert(1);
        assert_eq!(t.get(RawHandle::INVALID), None);
        assert_eq!(t.remove(RawHandle::INVALID), None);
    }

    #[test]
    fn stale_handle_misses_after_slot_reuse() {
        let mut t = ResourceTable::new();
        let a = t.insert(1);
        assert_eq!(t.remove(a), Some(1));
        let b = t.insert(2);
        assert_ne!(a, b);
        assert_eq!(t.get(a), None);
        assert_eq!(t.remove(a), None);
        assert_eq!(t.get(b), Some(&2));
    }

    #[test]
    fn double_remove_is_noop() {
        let mut t = ResourceTable::new();
        let a = t.insert(1);
        assert_eq!(t.remove(a), Some(1));
        assert_eq!(t.remove(a), None);
        assert!(t.is_empty());
    }

    #[test]
    fn iter_skips_removed_entries() {
        let mut t = ResourceTable::new();
        let a = t.insert('a');
        let _b = t.insert('b');
        let _c = t.insert('c');
        t.remove(a);
        let values: Vec<char> = t.iter().map(|(_, v)| *v).collect();
        assert_eq!(values, vec!['b', 'c']);
    }
}
