use core::cell::{Cell, RefCell};
use core::ops::Range;
use std::rc::Rc;

use crate::batch::{self, BatchEncoder, BatchOptions, BatchReport, SharedParameterStore};
use crate::diagnostics::{emit, Diagnostic, Report};
use crate::handle::{
    BufferHandle, Handle, PipelineStateHandle, PixelShaderHandle, RawHandle, Release,
    ResourceKind, ResourceKindId, ResourceTable, SurfaceShaderHandle, VertexFormatHandle, VertexShaderHandle,
};
use crate::pipeline::{
    build_state_objects, validate_vertex_layout, BlendState, DepthStencilState,
    PipelineStateDescriptor, PrimitiveTopology, RasterizerState, StateObjectFactory,
    StateObjects, VertexElement, VertexLayout,
};
use crate::queue::{DrawCall, DrawKind};

use super::{Backend, BufferDescriptor, BufferKind, SubmitError};

/// Operation that fails once after [`RecordingBackend::fail_next`].
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum FailPoint {
    VertexShader,
    PixelShader,
    VertexFormat,
    Rasterizer,
    Blend,
    DepthStencil,
    Buffer,
    SharedBufferAllocation,
    SharedBufferWrite,
}

/// One encoder command, in issue order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    SetPipelineState {
        state: PipelineStateHandle,
        stencil_ref: u32,
    },
    AllocateShared {
        bytes: u64,
        stride: u32,
    },
    WriteShared {
        offset: u64,
        data: Vec<u8>,
    },
    BindShared,
    BindGeometry {
        topology: PrimitiveTopology,
        vertex_buffer: BufferHandle,
        index_buffer: BufferHandle,
    },
    Draw {
        kind: DrawKind,
        count: u32,
        start_index: u32,
        start_vertex: u32,
        instances: Range<u32>,
    },
}

/// A backend that renders nothing and remembers everything.
///
/// Shared parameter buffers are kept in memory so tests can inspect exactly
/// what a GPU would have read.
pub struct RecordingBackend {
    inner: RefCell<Inner>,
    state_objects: Rc<Cell<usize>>,
}

#[derive(Default)]
struct Inner {
    vertex_shaders: ResourceTable<Vec<u8>>,
    pixel_shaders: ResourceTable<Vec<u8>>,
    surface_shaders: ResourceTable<(VertexShaderHandle, PixelShaderHandle)>,
    vertex_formats: ResourceTable<VertexLayout>,
    pipelines: ResourceTable<Pipeline>,
    buffers: ResourceTable<Buffer>,
    commands: Vec<Command>,
    fail_next: Option<FailPoint>,
    released: [u32; ResourceKindId::ALL.len()],
}

impl Inner {
    fn take_failure(&mut self, point: FailPoint) -> bool {
        take_failure(&mut self.fail_next, point)
    }
}

fn take_failure(slot: &mut Option<FailPoint>, point: FailPoint) -> bool {
    if *slot == Some(point) {
        *slot = None;
        return true;
    }
    false
}

/// `offset..offset + len`, or `None` when it does not fit in `usize`.
fn byte_range(offset: u64, len: usize) -> Option<Range<usize>> {
    let start = usize::try_from(offset).ok()?;
    Some(start..start.checked_add(len)?)
}

struct Pipeline {
    desc: PipelineStateDescriptor,
    objects: StateObjects<SubObjectFactory>,
    store: SharedParameterStore<SharedBlob>,
}

struct Buffer {
    kind: BufferKind,
    dynamic: bool,
    data: Vec<u8>,
}

/// Stand-in for a native rasterizer/blend/depth-stencil object.
struct SubObject(Rc<Cell<usize>>);

impl Drop for SubObject {
    fn drop(&mut self) {
        self.0.set(self.0.get() - 1);
    }
}

struct SubObjectFactory {
    live: Rc<Cell<usize>>,
    fail: Cell<Option<FailPoint>>,
}

impl SubObjectFactory {
    fn make(&self, point: FailPoint) -> Option<SubObject> {
        let mut fail = self.fail.get();
        let failed = take_failure(&mut fail, point);
        self.fail.set(fail);
        if failed {
            return None;
        }
        self.live.set(self.live.get() + 1);
        Some(SubObject(self.live.clone()))
    }
}

impl StateObjectFactory for SubObjectFactory {
    type Rasterizer = SubObject;
    type Blend = SubObject;
    type DepthStencil = SubObject;

    fn create_rasterizer(&self, _: &RasterizerState) -> Option<SubObject> {
        self.make(FailPoint::Rasterizer)
    }

    fn create_blend(&self, _: &BlendState) -> Option<SubObject> {
        self.make(FailPoint::Blend)
    }

    fn create_depth_stencil(&self, _: &DepthStencilState) -> Option<SubObject> {
        self.make(FailPoint::DepthStencil)
    }
}

struct SharedBlob(RefCell<Vec<u8>>);

struct Encoder<'a> {
    commands: &'a mut Vec<Command>,
    fail_next: &'a mut Option<FailPoint>,
}

impl BatchEncoder for Encoder<'_> {
    type SharedBuffer = SharedBlob;

    fn allocate_shared_buffer(&mut self, bytes: u64, stride: u32) -> Result<SharedBlob, SubmitError> {
        if take_failure(self.fail_next, FailPoint::SharedBufferAllocation) {
            return Err(SubmitError::SharedBufferAllocation { bytes });
        }
        self.commands.push(Command::AllocateShared { bytes, stride });
        Ok(SharedBlob(RefCell::new(vec![0; bytes as usize])))
    }

    fn write_shared_buffer(
        &mut self,
        buffer: &SharedBlob,
        offset: u64,
        data: &[u8],
    ) -> Result<(), SubmitError> {
        let err = SubmitError::SharedBufferWrite {
            offset,
            len: data.len() as u64,
        };
        if take_failure(self.fail_next, FailPoint::SharedBufferWrite) {
            return Err(err);
        }
        let mut contents = buffer.0.borrow_mut();
        let Some(target) = byte_range(offset, data.len()).and_then(|r| contents.get_mut(r)) else {
            return Err(err);
        };
        target.copy_from_slice(data);
        self.commands.push(Command::WriteShared {
            offset,
            data: data.to_vec(),
        });
        Ok(())
    }

    fn bind_shared_buffer(&mut self, _: &SharedBlob) {
        self.commands.push(Command::BindShared);
    }

    fn bind_geometry(&mut self, call: &DrawCall) {
        self.commands.push(Command::BindGeometry {
            topology: call.topology,
            vertex_buffer: call.vertex_buffer,
            index_buffer: call.index_buffer,
        });
    }

    fn draw(&mut self, call: &DrawCall, instances: Range<u32>) {
        self.commands.push(Command::Draw {
            kind: call.kind,
            count: call.count,
            start_index: call.start_index,
            start_vertex: call.start_vertex,
            instances,
        });
    }
}

impl RecordingBackend {
    pub fn new() -> Self {
        Self {
            inner: RefCell::new(Inner::default()),
            state_objects: Rc::new(Cell::new(0)),
        }
    }

    /// Makes the next `point` operation fail.
    pub fn fail_next(&self, point: FailPoint) {
        self.inner.borrow_mut().fail_next = Some(point);
    }

    pub fn commands(&self) -> Vec<Command> {
        self.inner.borrow().commands.clone()
    }

    pub fn take_commands(&self) -> Vec<Command> {
        std::mem::take(&mut self.inner.borrow_mut().commands)
    }

    /// Live resources of `kind`. Draw queues are not backend resources.
    pub fn live_count(&self, kind: ResourceKindId) -> usize {
        let inner = self.inner.borrow();
        match kind {
            ResourceKindId::VertexShader => inner.vertex_shaders.len(),
            ResourceKindId::PixelShader => inner.pixel_shaders.len(),
            ResourceKindId::SurfaceShader => inner.surface_shaders.len(),
            ResourceKindId::VertexFormat => inner.vertex_formats.len(),
            ResourceKindId::PipelineState => inner.pipelines.len(),
            ResourceKindId::Buffer => inner.buffers.len(),
            ResourceKindId::DrawQueue => 0,
        }
    }

    /// How many resources of `kind` were actually released.
    pub fn released_count(&self, kind: ResourceKindId) -> u32 {
        self.inner.borrow().released[kind.index()]
    }

    /// Rasterizer, blend and depth/stencil objects currently alive.
    pub fn live_state_objects(&self) -> usize {
        self.state_objects.get()
    }

    pub fn vertex_layout(&self, format: VertexFormatHandle) -> Option<VertexLayout> {
        self.inner.borrow().vertex_formats.get(format.raw()).cloned()
    }

    pub fn buffer_contents(&self, buffer: BufferHandle) -> Option<Vec<u8>> {
        self.inner.borrow().buffers.get(buffer.raw()).map(|b| b.data.clone())
    }

    /// Contents of the shared parameter store of `state`.
    pub fn shared_buffer_contents(&self, state: PipelineStateHandle) -> Option<Vec<u8>> {
        let inner = self.inner.borrow();
        let pipeline = inner.pipelines.get(state.raw())?;
        pipeline.store.buffer().map(|b| b.0.borrow().clone())
    }

    pub fn shared_capacity(&self, state: PipelineStateHandle) -> u64 {
        self.inner
            .borrow()
            .pipelines
            .get(state.raw())
            .map_or(0, |p| p.store.capacity())
    }

    fn create_shader<K: ResourceKind>(
        &self,
        source: &[u8],
        point: FailPoint,
        mut report: Report<'_>,
        table: impl FnOnce(&mut Inner) -> &mut ResourceTable<Vec<u8>>,
    ) -> Handle<K> {
        if source.is_empty() {
            emit(&mut report, Diagnostic::error("shader source is empty"));
            return Handle::invalid();
        }
        let mut inner = self.inner.borrow_mut();
        if inner.take_failure(point) {
            emit(&mut report, Diagnostic::error("shader compilation failed"));
            return Handle::invalid();
        }
        Handle::from_raw(table(&mut *inner).insert(source.to_vec()))
    }
}

impl Default for RecordingBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl Release for RecordingBackend {
    fn release(&self, kind: ResourceKindId, raw: RawHandle) {
        let mut inner = self.inner.borrow_mut();
        let removed = match kind {
            ResourceKindId::VertexShader => inner.vertex_shaders.remove(raw).is_some(),
            ResourceKindId::PixelShader => inner.pixel_shaders.remove(raw).is_some(),
            ResourceKindId::SurfaceShader => inner.surface_shaders.remove(raw).is_some(),
            ResourceKindId::VertexFormat => inner.vertex_formats.remove(raw).is_some(),
            ResourceKindId::PipelineState => inner.pipelines.remove(raw).is_some(),
            ResourceKindId::Buffer => inner.buffers.remove(raw).is_some(),
            ResourceKindId::DrawQueue => false,
        };
        if removed {
            inner.released[kind.index()] += 1;
        }
    }
}

impl Backend for RecordingBackend {
    fn create_vertex_shader(&self, source: &[u8], report: Report<'_>) -> VertexShaderHandle {
        self.create_shader(source, FailPoint::VertexShader, report, |i| &mut i.vertex_shaders)
    }

    fn create_pixel_shader(&self, source: &[u8], report: Report<'_>) -> PixelShaderHandle {
        self.create_shader(source, FailPoint::PixelShader, report, |i| &mut i.pixel_shaders)
    }

    fn link_surface_shader(
        &self,
        vs: VertexShaderHandle,
        ps: PixelShaderHandle,
    ) -> SurfaceShaderHandle {
        let mut inner = self.inner.borrow_mut();
        if !inner.vertex_shaders.contains(vs.raw()) || !inner.pixel_shaders.contains(ps.raw()) {
            log::warn!("link_surface_shader: {vs:?} or {ps:?} is not live");
            return Handle::invalid();
        }
        Handle::from_raw(inner.surface_shaders.insert((vs, ps)))
    }

    fn create_vertex_format(
        &self,
        elements: &[VertexElement<'_>],
        vs: VertexShaderHandle,
        mut report: Report<'_>,
    ) -> VertexFormatHandle {
        if !self.inner.borrow().vertex_shaders.contains(vs.raw()) {
            emit(&mut report, Diagnostic::error("vertex format needs a live vertex shader"));
            return Handle::invalid();
        }
        let Some(layout) = validate_vertex_layout(elements, &mut report) else {
            return Handle::invalid();
        };
        let mut inner = self.inner.borrow_mut();
        if inner.take_failure(FailPoint::VertexFormat) {
            emit(&mut report, Diagnostic::error("input layout creation failed"));
            return Handle::invalid();
        }
        Handle::from_raw(inner.vertex_formats.insert(layout))
    }

    fn create_pipeline_state(&self, desc: &PipelineStateDescriptor) -> PipelineStateHandle {
        let mut inner = self.inner.borrow_mut();
        if !inner.surface_shaders.contains(desc.shader.raw())
            || !inner.vertex_formats.contains(desc.vertex_format.raw())
        {
            log::warn!("create_pipeline_state: shader or vertex format is not live");
            return Handle::invalid();
        }

        let factory = SubObjectFactory {
            live: self.state_objects.clone(),
            fail: Cell::new(inner.fail_next),
        };
        let built = build_state_objects(&factory, desc);
        inner.fail_next = factory.fail.get();

        match built {
            Ok(objects) => Handle::from_raw(inner.pipelines.insert(Pipeline {
                desc: *desc,
                objects,
                store: SharedParameterStore::new(),
            })),
            Err(e) => {
                log::warn!("create_pipeline_state: {e}");
                Handle::invalid()
            }
        }
    }

    fn create_buffer(&self, desc: &BufferDescriptor<'_>) -> BufferHandle {
        let Some(size) = desc.resolved_size() else {
            log::warn!("create_buffer: unusable descriptor {desc:?}");
            return Handle::invalid();
        };
        let mut inner = self.inner.borrow_mut();
        if inner.take_failure(FailPoint::Buffer) {
            log::warn!("create_buffer: allocation of {size} bytes failed");
            return Handle::invalid();
        }
        let mut data = vec![0; size as usize];
        if let Some(src) = desc.data {
            data[..src.len()].copy_from_slice(src);
        }
        Handle::from_raw(inner.buffers.insert(Buffer {
            kind: desc.kind,
            dynamic: desc.dynamic,
            data,
        }))
    }

    fn update_buffer(&self, buffer: BufferHandle, offset: u64, data: &[u8]) {
        let mut inner = self.inner.borrow_mut();
        let Some(target) = inner.buffers.get_mut(buffer.raw()) else {
            return;
        };
        if !target.dynamic {
            log::warn!("update_buffer: {:?} buffer {buffer:?} is immutable", target.kind);
            return;
        }
        match byte_range(offset, data.len()).and_then(|r| target.data.get_mut(r)) {
            Some(range) => range.copy_from_slice(data),
            None => log::warn!("update_buffer: write of {} bytes at {offset} out of range", data.len()),
        }
    }

    fn process_batch(
        &self,
        state: PipelineStateHandle,
        calls: &[DrawCall],
        options: &BatchOptions,
    ) -> Result<BatchReport, SubmitError> {
        let mut inner = self.inner.borrow_mut();
        let Inner {
            pipelines,
            commands,
            fail_next,
            ..
        } = &mut *inner;

        let Some(pipeline) = pipelines.get_mut(state.raw()) else {
            if calls.is_empty() {
                return Ok(BatchReport::empty(0));
            }
            return Err(SubmitError::UnknownPipelineState);
        };
        if calls.is_empty() {
            return Ok(BatchReport::empty(pipeline.store.capacity()));
        }

        commands.push(Command::SetPipelineState {
            state,
            stencil_ref: pipeline.objects.stencil_ref,
        });
        let mut encoder = Encoder {
            commands,
            fail_next,
        };
        batch::execute(
            &mut encoder,
            &mut pipeline.store,
            pipeline.desc.parameter_stride,
            calls,
            options,
        )
    }
}
