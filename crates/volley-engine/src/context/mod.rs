//! Handle-based front end over a [`Backend`].
//!
//! [`Context`] is what applications hold. It forwards resource creation to the
//! backend, owns draw queues as handle-addressed resources, and is the single
//! [`Release`] implementation callers hand to [`Owned`].

use core::cell::{Cell, RefCell};

use bytemuck::Pod;

use crate::backend::{Backend, BufferDescriptor, SubmitError};
use crate::batch::{BatchOptions, BatchReport};
use crate::diagnostics::Report;
use crate::handle::{
    BufferHandle, DrawQueueHandle, Handle, Owned, PipelineStateHandle, PixelShaderHandle,
    RawHandle, Release, ResourceKind, ResourceKindId, ResourceTable, SurfaceShaderHandle,
    VertexFormatHandle, VertexShaderHandle,
};
use crate::pipeline::{PipelineStateDescriptor, PrimitiveTopology, VertexElement};
use crate::queue::DrawQueue;

pub struct Context<B: Backend> {
    backend: B,
    queues: RefCell<ResourceTable<Box<DrawQueue>>>,
    batch: Cell<BatchOptions>,
}

impl<B: Backend> Context<B> {
    pub fn new(backend: B) -> Self {
        Self::with_options(backend, BatchOptions::default())
    }

    pub fn with_options(backend: B, batch: BatchOptions) -> Self {
        Self {
            backend,
            queues: RefCell::new(ResourceTable::new()),
            batch: Cell::new(batch),
        }
    }

    #[inline]
    pub fn backend(&self) -> &B {
        &self.backend
    }

    #[inline]
    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    pub fn batch_options(&self) -> BatchOptions {
        self.batch.get()
    }

    /// Options used by every later [`submit`](Self::submit).
    pub fn set_batch_options(&self, options: BatchOptions) {
        self.batch.set(options);
    }

    /// Wraps `handle` so it is released through this context on drop.
    pub fn own<K: ResourceKind>(&self, handle: Handle<K>) -> Owned<'_, K> {
        Owned::new(self, handle)
    }

    /// Releases any kind of handle. Invalid and stale handles are ignored.
    pub fn release<K: ResourceKind>(&self, handle: Handle<K>) {
        Release::release(self, K::ID, handle.raw());
    }

    // ── resources ────────────────────────────────────────────────────────

    pub fn create_vertex_shader(&self, source: &[u8], report: Report<'_>) -> VertexShaderHandle {
        self.backend.create_vertex_shader(source, report)
    }

    pub fn create_pixel_shader(&self, source: &[u8], report: Report<'_>) -> PixelShaderHandle {
        self.backend.create_pixel_shader(source, report)
    }

    pub fn link_surface_shader(
        &self,
        vs: VertexShaderHandle,
        ps: PixelShaderHandle,
    ) -> SurfaceShaderHandle {
        if !vs.is_valid() || !ps.is_valid() {
            return Handle::invalid();
        }
        self.backend.link_surface_shader(vs, ps)
    }

    pub fn create_vertex_format(
        &self,
        elements: &[VertexElement<'_>],
        vs: VertexShaderHandle,
        report: Report<'_>,
    ) -> VertexFormatHandle {
        self.backend.create_vertex_format(elements, vs, report)
    }

    pub fn create_pipeline_state(&self, desc: &PipelineStateDescriptor) -> PipelineStateHandle {
        self.backend.create_pipeline_state(desc)
    }

    pub fn create_buffer(&self, desc: &BufferDescriptor<'_>) -> BufferHandle {
        self.backend.create_buffer(desc)
    }

    pub fn update_buffer(&self, buffer: BufferHandle, offset: u64, data: &[u8]) {
        if buffer.is_valid() {
            self.backend.update_buffer(buffer, offset, data);
        }
    }

    // ── draw queues ──────────────────────────────────────────────────────

    /// Creates a queue drawing with `state`.
    pub fn create_draw_queue(&self, state: PipelineStateHandle) -> DrawQueueHandle {
        if !state.is_valid() {
            log::warn!("create_draw_queue: invalid pipeline state");
            return Handle::invalid();
        }
        let raw = self.queues.borrow_mut().insert(Box::new(DrawQueue::new(state)));
        Handle::from_raw(raw)
    }

    /// Number of calls recorded on `queue`, or `None` when it is not live.
    pub fn queue_len(&self, queue: DrawQueueHandle) -> Option<usize> {
        self.with_queue(queue, |q| q.len())
    }

    /// Runs `f` on the queue behind `queue`, if it is live.
    ///
    /// The queue table stays mutably borrowed while `f` runs, so `f` must not
    /// call back into this context.
    fn with_queue<R>(
        &self,
        queue: DrawQueueHandle,
        f: impl FnOnce(&mut DrawQueue) -> R,
    ) -> Option<R> {
        let mut queues = self.queues.borrow_mut();
        let Some(q) = queues.get_mut(queue.raw()) else {
            log::trace!("ignoring {queue:?}");
            return None;
        };
        Some(f(q))
    }

    pub fn set_primitive_topology(&self, queue: DrawQueueHandle, topology: PrimitiveTopology) {
        self.with_queue(queue, |q| q.set_primitive_topology(topology));
    }

    pub fn set_vertex_buffer(&self, queue: DrawQueueHandle, buffer: BufferHandle) {
        self.with_queue(queue, |q| q.set_vertex_buffer(buffer));
    }

    pub fn set_index_buffer(&self, queue: DrawQueueHandle, buffer: BufferHandle) {
        self.with_queue(queue, |q| q.set_index_buffer(buffer));
    }

    pub fn set_constants(&self, queue: DrawQueueHandle, slot: u32, bytes: &[u8]) {
        self.with_queue(queue, |q| q.set_constants(slot, bytes));
    }

    pub fn set_constants_pod<T: Pod>(&self, queue: DrawQueueHandle, slot: u32, value: &T) {
        self.with_queue(queue, |q| q.set_constants_pod(slot, value));
    }

    pub fn draw(&self, queue: DrawQueueHandle, vertex_count: u32, start_vertex: u32) {
        self.with_queue(queue, |q| q.draw(vertex_count, start_vertex));
    }

    pub fn draw_indexed(
        &self,
        queue: DrawQueueHandle,
        index_count: u32,
        start_index: u32,
        start_vertex: u32,
    ) {
        self.with_queue(queue, |q| q.draw_indexed(index_count, start_index, start_vertex));
    }

    /// Submits and clears the queue. An invalid handle yields an empty report.
    pub fn submit(&self, queue: DrawQueueHandle) -> Result<BatchReport, SubmitError> {
        let options = self.batch.get();
        self.with_queue(queue, |q| q.submit(&self.backend, &options))
            .unwrap_or(Ok(BatchReport::empty(0)))
    }
}

impl<B: Backend> Release for Context<B> {
    fn release(&self, kind: ResourceKindId, raw: RawHandle) {
        match kind {
            ResourceKindId::DrawQueue => {
                self.queues.borrow_mut().remove(raw);
            }
            _ => self.backend.release(kind, raw),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{BufferKind, Command, RecordingBackend};
    use crate::batch::BatchPath;
    use crate::pipeline::DataFormat;

    fn setup(ctx: &Context<RecordingBackend>) -> PipelineStateHandle {
        let vs = ctx.create_vertex_shader(b"vs", None);
        let ps = ctx.create_pixel_shader(b"ps", None);
        let shader = ctx.link_surface_shader(vs, ps);
        let format = ctx.create_vertex_format(
            &[VertexElement::new("POSITION", DataFormat::RGB32F, 0)],
            vs,
            None,
        );
        let mut desc = PipelineStateDescriptor::new(shader, format);
        desc.parameter_stride = 16;
        ctx.create_pipeline_state(&desc)
    }

    // ── handle-based queue ────────────────────────────────────────────────

    #[test]
    fn invalid_queue_handle_is_a_no_op() {
        let ctx = Context::new(RecordingBackend::new());
        let q = DrawQueueHandle::invalid();
        ctx.set_constants(q, 0, &[1; 16]);
        ctx.draw(q, 3, 0);
        let report = ctx.submit(q).unwrap();
        assert_eq!(report.path, BatchPath::Empty);
        assert!(ctx.backend().commands().is_empty());
    }

    #[test]
    fn queue_by_handle_submits_and_clears() {
        let ctx = Context::new(RecordingBackend::new());
        let state = setup(&ctx);
        let q = ctx.create_draw_queue(state);

        ctx.set_constants(q, 0, &[7; 16]);
        ctx.draw(q, 36, 0);
        ctx.draw(q, 36, 0);
        assert_eq!(ctx.queue_len(q), Some(2));
        let report = ctx.submit(q).unwrap();
        assert_eq!(report.instances, 2);
        assert_eq!(ctx.queue_len(q), Some(0));
    }

    #[test]
    fn released_queue_handle_goes_stale() {
        let ctx = Context::new(RecordingBackend::new());
        let state = setup(&ctx);
        let q = ctx.create_draw_queue(state);
        ctx.release(q);
        ctx.draw(q, 3, 0);
        assert_eq!(ctx.queue_len(q), None);
        assert!(!ctx.create_draw_queue(PipelineStateHandle::invalid()).is_valid());
    }

    // ── ownership ─────────────────────────────────────────────────────────

    #[test]
    fn owned_releases_once_through_context() {
        let ctx = Context::new(RecordingBackend::new());
        {
            let mut owned = ctx.own(ctx.create_buffer(&BufferDescriptor::dynamic(BufferKind::Vertex, 16)));
            assert!(owned.is_valid());
            owned.set(ctx.create_buffer(&BufferDescriptor::dynamic(BufferKind::Index, 16)));
            assert_eq!(ctx.backend().released_count(ResourceKindId::Buffer), 1);
        }
        assert_eq!(ctx.backend().released_count(ResourceKindId::Buffer), 2);
        assert_eq!(ctx.backend().live_count(ResourceKindId::Buffer), 0);
    }

    #[test]
    fn stencil_ref_is_applied_with_the_pipeline() {
        let ctx = Context::new(RecordingBackend::new());
        let vs = ctx.create_vertex_shader(b"vs", None);
        let ps = ctx.create_pixel_shader(b"ps", None);
        let mut desc = PipelineStateDescriptor::new(
            ctx.link_surface_shader(vs, ps),
            ctx.create_vertex_format(&[VertexElement::new("POSITION", DataFormat::RG32F, 0)], vs, None),
        );
        desc.depth_stencil.stencil_ref = 0x42;
        let state = ctx.create_pipeline_state(&desc);

        let q = ctx.create_draw_queue(state);
        ctx.draw(q, 3, 0);
        ctx.submit(q).unwrap();
        assert_eq!(
            ctx.backend().commands()[0],
            Command::SetPipelineState { state, stencil_ref: 0x42 }
        );
    }
}
