use crate::queue::DrawCall;

/// Grow-only GPU buffer holding one parameter block per recorded call.
///
/// `S` is the backend's buffer type. The store never shrinks; a submission
/// that fits reuses the current buffer.
#[derive(Debug)]
pub struct SharedParameterStore<S> {
    buffer: Option<S>,
    capacity: u64,
    staging: Vec<u8>,
    reallocations: u32,
}

impl<S> SharedParameterStore<S> {
    pub const fn new() -> Self {
        Self {
            buffer: None,
            capacity: 0,
            staging: Vec::new(),
            reallocations: 0,
        }
    }

    /// Current buffer size in bytes; zero before the first allocation.
    #[inline]
    pub fn capacity(&self) -> u64 {
        self.capacity
    }

    #[inline]
    pub fn buffer(&self) -> Option<&S> {
        self.buffer.as_ref()
    }

    /// How many times a buffer was (re)created.
    #[inline]
    pub fn reallocations(&self) -> u32 {
        self.reallocations
    }

    /// Makes sure the buffer holds at least `required` bytes.
    ///
    /// Returns `Ok(true)` when a new buffer was allocated. On allocation
    /// failure the previous buffer and capacity are kept.
    pub fn reserve<E>(
        &mut self,
        required: u64,
        allocate: impl FnOnce(u64) -> Result<S, E>,
    ) -> Result<bool, E> {
        if self.buffer.is_some() && required <= self.capacity {
            return Ok(false);
        }

        let buffer = allocate(required)?;
        log::debug!(
            "shared parameter store grows {} -> {} bytes",
            self.capacity,
            required
        );
        self.buffer = Some(buffer);
        self.capacity = required;
        self.reallocations += 1;
        Ok(true)
    }

    /// Packs the first `stride` parameter bytes of every call, back to back in
    /// recording order, and returns them with the buffer they belong in.
    pub fn pack(&mut self, calls: &[DrawCall], stride: usize) -> Option<(&S, &[u8])> {
        let buffer = self.buffer.as_ref()?;
        self.staging.clear();
        self.staging.reserve(stride * calls.len());
        for call in calls {
            self.staging.extend_from_slice(call.parameter_bytes(stride));
        }
        Some((buffer, &self.staging))
    }

    /// Drops the buffer. The next `reserve` allocates again.
    pub fn release(&mut self) -> Option<S> {
        self.capacity = 0;
        self.buffer.take()
    }
}

impl<S> Default for SharedParameterStore<S> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handle::Handle;
    use crate::pipeline::PrimitiveTopology;
    use crate::queue::{DrawKind, ParameterBlock};

    fn call(fill: u8) -> DrawCall {
        let mut parameters = ParameterBlock::ZERO;
        parameters.write(&[fill; 16]);
        DrawCall {
            kind: DrawKind::Draw,
            topology: PrimitiveTopology::TriangleList,
            vertex_buffer: Handle::invalid(),
            index_buffer: Handle::invalid(),
            count: 3,
            start_index: 0,
            start_vertex: 0,
            used_slots: 1,
            parameters,
        }
    }

    #[test]
    fn grows_only_when_needed() {
        let mut store = SharedParameterStore::<u64>::new();
        let alloc = |n: u64| Ok::<_, ()>(n);

        assert_eq!(store.reserve(64, alloc), Ok(true));
        assert_eq!(store.capacity(), 64);
        assert_eq!(store.reserve(32, alloc), Ok(false));
        assert_eq!(store.reserve(64, alloc), Ok(false));
        assert_eq!(store.capacity(), 64);
        assert_eq!(store.reserve(65, alloc), Ok(true));
        assert_eq!(store.capacity(), 65);
        assert_eq!(store.buffer(), Some(&65));
        assert_eq!(store.reallocations(), 2);
    }

    #[test]
    fn failed_growth_keeps_previous_buffer() {
        let mut store = SharedParameterStore::<u64>::new();
        store.reserve(16, |n| Ok::<_, ()>(n)).unwrap();
        assert_eq!(store.reserve(1024, |_| Err("oom")), Err("oom"));
        assert_eq!(store.capacity(), 16);
        assert_eq!(store.buffer(), Some(&16));
        assert_eq!(store.reallocations(), 1);
    }

    #[test]
    fn pack_is_contiguous_in_order() {
        let mut store = SharedParameterStore::<()>::new();
        assert!(store.pack(&[call(1)], 16).is_none());

        store.reserve(48, |_| Ok::<_, ()>(())).unwrap();
        let (_, bytes) = store.pack(&[call(0xa), call(0xb), call(0xc)], 16).unwrap();
        assert_eq!(bytes.len(), 48);
        assert!(bytes[..16].iter().all(|&b| b == 0xa));
        assert!(bytes[16..32].iter().all(|&b| b == 0xb));
        assert!(bytes[32..].iter().all(|&b| b == 0xc));
    }

    #[test]
    fn release_resets_capacity() {
        let mut store = SharedParameterStore::<u8>::new();
        store.reserve(8, |_| Ok::<_, ()>(1)).unwrap();
        assert_eq!(store.release(), Some(1));
        assert_eq!(store.capacity(), 0);
        assert_eq!(store.reserve(8, |_| Ok::<_, ()>(2)), Ok(true));
    }
}
