use bytemuck::Pod;

use crate::backend::{Backend, SubmitError};
use crate::batch::{BatchOptions, BatchReport};
use crate::container::DynamicArray;
use crate::handle::{BufferHandle, PipelineStateHandle};
use crate::pipeline::PrimitiveTopology;

use super::{DrawCall, DrawKind, ParameterBlock, MAX_PARAMETER_BYTES, MAX_PARAMETER_SLOTS};

/// State the next recorded call snapshots.
#[derive(Debug, Copy, Clone, Default)]
struct Cursor {
    topology: PrimitiveTopology,
    vertex_buffer: BufferHandle,
    index_buffer: BufferHandle,
    used_slots: u8,
    parameters: ParameterBlock,
}

/// Ordered list of draws against one pipeline state.
#[derive(Debug)]
pub struct DrawQueue {
    state: PipelineStateHandle,
    calls: DynamicArray<DrawCall, 32, 64>,
    cursor: Cursor,
}

impl DrawQueue {
    pub fn new(state: PipelineStateHandle) -> Self {
        Self {
            state,
            calls: DynamicArray::new(),
            cursor: Cursor::default(),
        }
    }

    #[inline]
    pub fn state(&self) -> PipelineStateHandle {
        self.state
    }

    pub fn set_primitive_topology(&mut self, topology: PrimitiveTopology) {
        self.cursor.topology = topology;
    }

    pub fn set_vertex_buffer(&mut self, buffer: BufferHandle) {
        self.cursor.vertex_buffer = buffer;
    }

    pub fn set_index_buffer(&mut self, buffer: BufferHandle) {
        self.cursor.index_buffer = buffer;
    }

    /// Copies `bytes` into the cursor's parameter block and marks `slot` used.
    ///
    /// Slots at or above 8 are ignored. Input longer than 256 bytes is
    /// truncated.
    pub fn set_constants(&mut self, slot: u32, bytes: &[u8]) {
        if slot as usize >= MAX_PARAMETER_SLOTS {
            log::warn!("set_constants: slot {slot} out of range, ignored");
            return;
        }
        if bytes.len() > MAX_PARAMETER_BYTES {
            log::warn!(
                "set_constants: {} bytes truncated to {}",
                bytes.len(),
                MAX_PARAMETER_BYTES
            );
        }
        self.cursor.parameters.write(bytes);
        self.cursor.used_slots |= 1 << slot;
    }

    /// [`set_constants`](Self::set_constants) for any plain-old-data value.
    pub fn set_constants_pod<T: Pod>(&mut self, slot: u32, value: &T) {
        self.set_constants(slot, bytemuck::bytes_of(value));
    }

    /// Records a non-indexed draw of `vertex_count` vertices.
    pub fn draw(&mut self, vertex_count: u32, start_vertex: u32) {
        self.record(DrawKind::Draw, vertex_count, 0, start_vertex);
    }

    /// Records an indexed draw. `start_vertex` is added to every index.
    pub fn draw_indexed(&mut self, index_count: u32, start_index: u32, start_vertex: u32) {
        self.record(DrawKind::DrawIndexed, index_count, start_index, start_vertex);
    }

    fn record(&mut self, kind: DrawKind, count: u32, start_index: u32, start_vertex: u32) {
        let c = &self.cursor;
        self.calls.add(DrawCall {
            kind,
            topology: c.topology,
            vertex_buffer: c.vertex_buffer,
            index_buffer: c.index_buffer,
            count,
            start_index,
            start_vertex,
            used_slots: c.used_slots,
            parameters: c.parameters,
        });
    }

    #[inline]
    pub fn draw_calls(&self) -> &[DrawCall] {
        self.calls.as_slice()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.calls.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.calls.is_empty()
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.calls.capacity()
    }

    /// Drops recorded calls. Storage and the cursor are kept.
    pub fn clear(&mut self) {
        self.calls.clear();
    }

    /// Hands the recorded calls to `backend`, then clears the queue.
    ///
    /// The queue is empty afterwards whether or not the backend succeeded.
    pub fn submit<B: Backend + ?Sized>(
        &mut self,
        backend: &B,
        options: &BatchOptions,
    ) -> Result<BatchReport, SubmitError> {
        let result = backend.process_batch(self.state, self.calls.as_slice(), options);
        self.calls.clear();
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handle::RawHandle;

    fn buffer(raw: u64) -> BufferHandle {
        BufferHandle::from_raw(RawHandle(raw))
    }

    // ── recording ─────────────────────────────────────────────────────────

    #[test]
    fn draw_snapshots_cursor() {
        let mut q = DrawQueue::new(PipelineStateHandle::invalid());
        q.set_vertex_buffer(buffer(1));
        q.set_constants(0, &[1, 2, 3, 4]);
        q.draw(36, 0);

        q.set_vertex_buffer(buffer(2));
        q.set_constants(0, &[9]);
        q.set_primitive_topology(PrimitiveTopology::LineList);

        let first = q.draw_calls()[0];
        assert_eq!(first.vertex_buffer, buffer(1));
        assert_eq!(first.topology, PrimitiveTopology::TriangleList);
        assert_eq!(&first.parameters.0[..4], &[1, 2, 3, 4]);
        assert_eq!(first.count, 36);
        assert_eq!(first.kind, DrawKind::Draw);
    }

    #[test]
    fn draw_indexed_records_offsets() {
        let mut q = DrawQueue::new(PipelineStateHandle::invalid());
        q.set_index_buffer(buffer(7));
        q.draw_indexed(6, 12, 4);
        let c = q.draw_calls()[0];
        assert_eq!(c.kind, DrawKind::DrawIndexed);
        assert_eq!((c.count, c.start_index, c.start_vertex), (6, 12, 4));
        assert_eq!(c.index_buffer, buffer(7));
    }

    #[test]
    fn recording_past_inline_capacity() {
        let mut q = DrawQueue::new(PipelineStateHandle::invalid());
        for i in 0..100 {
            q.set_constants_pod(0, &(i as u32));
            q.draw(3, 0);
        }
        assert_eq!(q.len(), 100);
        assert!(q.capacity() >= 100);
        let last = q.draw_calls()[99];
        assert_eq!(bytemuck::pod_read_unaligned::<u32>(&last.parameters.0[..4]), 99);
    }

    // ── constants ─────────────────────────────────────────────────────────

    #[test]
    fn out_of_range_slot_is_ignored() {
        let mut q = DrawQueue::new(PipelineStateHandle::invalid());
        q.set_constants(8, &[0xff; 4]);
        q.draw(3, 0);
        let c = q.draw_calls()[0];
        assert_eq!(c.used_slots, 0);
        assert_eq!(c.parameters, ParameterBlock::ZERO);
    }

    #[test]
    fn oversized_constants_are_truncated() {
        let mut q = DrawQueue::new(PipelineStateHandle::invalid());
        q.set_constants(3, &[0xab; 300]);
        q.draw(3, 0);
        let c = q.draw_calls()[0];
        assert!(c.is_slot_used(3));
        assert!(!c.is_slot_used(0));
        assert!(c.parameters.0.iter().all(|&b| b == 0xab));
    }

    #[test]
    fn clear_keeps_storage_and_cursor() {
        let mut q = DrawQueue::new(PipelineStateHandle::invalid());
        q.set_vertex_buffer(buffer(3));
        for _ in 0..40 {
            q.draw(3, 0);
        }
        let cap = q.capacity();
        q.clear();
        assert!(q.is_empty());
        assert_eq!(q.capacity(), cap);
        q.draw(3, 0);
        assert_eq!(q.draw_calls()[0].vertex_buffer, buffer(3));
    }
}
