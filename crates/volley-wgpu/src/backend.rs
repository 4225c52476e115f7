use core::cell::RefCell;

use anyhow::Result;
use wgpu::util::DeviceExt;

use volley_engine::backend::{Backend, BufferDescriptor, BufferKind, SubmitError};
use volley_engine::batch::{self, BatchOptions, BatchReport, SharedParameterStore};
use volley_engine::diagnostics::{emit, Diagnostic, Report};
use volley_engine::handle::{
    BufferHandle, Handle, PipelineStateHandle, PixelShaderHandle, RawHandle, Release,
    ResourceKindId, ResourceTable, SurfaceShaderHandle, VertexFormatHandle, VertexShaderHandle,
};
use volley_engine::pipeline::{
    build_state_objects, validate_vertex_layout, PipelineStateDescriptor, PrimitiveTopology,
    VertexElement,
};
use volley_engine::queue::DrawCall;

use crate::convert;
use crate::device::{validated, Gpu, WgpuInit};
use crate::encoder::{GpuBuffer, PassEncoder, PipelineRecipe, SharedBuffer, Variants};
use crate::states::StateFactory;
use crate::target::OffscreenTarget;

struct VertexFormat {
    stride: u64,
    attributes: Vec<wgpu::VertexAttribute>,
}

struct Pipeline {
    recipe: PipelineRecipe,
    variants: Variants,
    stride: u32,
    store: SharedParameterStore<SharedBuffer>,
}

#[derive(Default)]
struct Tables {
    vertex_shaders: ResourceTable<wgpu::ShaderModule>,
    pixel_shaders: ResourceTable<wgpu::ShaderModule>,
    surface_shaders: ResourceTable<(VertexShaderHandle, PixelShaderHandle)>,
    vertex_formats: ResourceTable<VertexFormat>,
    pipelines: ResourceTable<Pipeline>,
    buffers: ResourceTable<GpuBuffer>,
}

/// Headless wgpu implementation of [`Backend`].
pub struct WgpuBackend {
    gpu: Gpu,
    features: wgpu::Features,
    shared_layout: wgpu::BindGroupLayout,
    target: RefCell<OffscreenTarget>,
    tables: RefCell<Tables>,
}

impl WgpuBackend {
    pub async fn new(init: WgpuInit) -> Result<Self> {
        let gpu = Gpu::new(&init).await?;
        let device = gpu.device();

        let shared_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("volley shared parameters bgl"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Storage { read_only: true },
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            }],
        });

        let (width, height) = init.target_size;
        let target = OffscreenTarget::new(device, width, height, init.color_format, init.depth_format);

        Ok(Self {
            features: init.required_features,
            gpu,
            shared_layout,
            target: RefCell::new(target),
            tables: RefCell::new(Tables::default()),
        })
    }

    pub fn gpu(&self) -> &Gpu {
        &self.gpu
    }

    pub fn target_size(&self) -> (u32, u32) {
        self.target.borrow().size()
    }

    /// The color texture batches render into.
    pub fn color_texture(&self) -> wgpu::Texture {
        self.target.borrow().color_texture().clone()
    }

    /// Replaces the offscreen target. Pipelines keep their formats, so the
    /// formats of the new target must match.
    pub fn set_target(&self, width: u32, height: u32) {
        let mut target = self.target.borrow_mut();
        let color_format = target.color_format();
        let depth_format = target.depth_format();
        *target = OffscreenTarget::new(self.gpu.device(), width, height, color_format, depth_format);
    }

    /// Clears color to `color`, depth to 1 and stencil to 0.
    pub fn clear(&self, color: wgpu::Color) {
        let target = self.target.borrow();
        let mut encoder = self
            .gpu
            .device()
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("volley clear encoder"),
            });
        {
            let _pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("volley clear pass"),
                color_attachments: &[Some(target.color_attachment(wgpu::LoadOp::Clear(color)))],
                depth_stencil_attachment: target
                    .depth_attachment(wgpu::LoadOp::Clear(1.0), wgpu::LoadOp::Clear(0)),
                timestamp_writes: None,
                occlusion_query_set: None,
                multiview_mask: None,
            });
        }
        self.gpu.queue().submit(std::iter::once(encoder.finish()));
    }

    fn create_shader_module(
        &self,
        source: &[u8],
        entry_point: &str,
        label: &str,
        report: &mut Report<'_>,
    ) -> Option<wgpu::ShaderModule> {
        let Ok(wgsl) = std::str::from_utf8(source) else {
            emit(report, Diagnostic::error(format!("{label}: source is not UTF-8 WGSL")));
            return None;
        };
        if !wgsl.contains(&format!("fn {entry_point}")) {
            emit(
                report,
                Diagnostic::error(format!("{label}: entry point `{entry_point}` not found")),
            );
            return None;
        }
        let device = self.gpu.device();
        let module = validated(device, || {
            device.create_shader_module(wgpu::ShaderModuleDescriptor {
                label: Some(label),
                source: wgpu::ShaderSource::Wgsl(wgsl.into()),
            })
        });
        match module {
            Ok(module) => Some(module),
            Err(error) => {
                emit(report, Diagnostic::error(format!("{label}: {error}")));
                None
            }
        }
    }
}

impl Release for WgpuBackend {
    fn release(&self, kind: ResourceKindId, raw: RawHandle) {
        let mut tables = self.tables.borrow_mut();
        match kind {
            ResourceKindId::VertexShader => drop(tables.vertex_shaders.remove(raw)),
            ResourceKindId::PixelShader => drop(tables.pixel_shaders.remove(raw)),
            ResourceKindId::SurfaceShader => drop(tables.surface_shaders.remove(raw)),
            ResourceKindId::VertexFormat => drop(tables.vertex_formats.remove(raw)),
            ResourceKindId::PipelineState => drop(tables.pipelines.remove(raw)),
            ResourceKindId::Buffer => {
                if let Some(b) = tables.buffers.remove(raw) {
                    b.buffer.destroy();
                }
            }
            ResourceKindId::DrawQueue => {}
        }
    }
}

impl Backend for WgpuBackend {
    fn create_vertex_shader(&self, source: &[u8], mut report: Report<'_>) -> VertexShaderHandle {
        let Some(module) = self.create_shader_module(source, "vs_main", "volley vertex shader", &mut report) else {
            return Handle::invalid();
        };
        Handle::from_raw(self.tables.borrow_mut().vertex_shaders.insert(module))
    }

    fn create_pixel_shader(&self, source: &[u8], mut report: Report<'_>) -> PixelShaderHandle {
        let Some(module) = self.create_shader_module(source, "ps_main", "volley pixel shader", &mut report) else {
            return Handle::invalid();
        };
        Handle::from_raw(self.tables.borrow_mut().pixel_shaders.insert(module))
    }

    fn link_surface_shader(
        &self,
        vs: VertexShaderHandle,
        ps: PixelShaderHandle,
    ) -> SurfaceShaderHandle {
        let mut tables = self.tables.borrow_mut();
        if !tables.vertex_shaders.contains(vs.raw()) || !tables.pixel_shaders.contains(ps.raw()) {
            log::warn!("link_surface_shader: {vs:?} or {ps:?} is not live");
            return Handle::invalid();
        }
        Handle::from_raw(tables.surface_shaders.insert((vs, ps)))
    }

    fn create_vertex_format(
        &self,
        elements: &[VertexElement<'_>],
        vs: VertexShaderHandle,
        mut report: Report<'_>,
    ) -> VertexFormatHandle {
        if !self.tables.borrow().vertex_shaders.contains(vs.raw()) {
            emit(&mut report, Diagnostic::error("vertex format needs a live vertex shader"));
            return Handle::invalid();
        }
        let Some(layout) = validate_vertex_layout(elements, &mut report) else {
            return Handle::invalid();
        };
        let attributes = layout
            .attributes
            .iter()
            .map(|a| wgpu::VertexAttribute {
                format: convert::vertex_format(a.format),
                offset: a.offset as u64,
                shader_location: a.location,
            })
            .collect();
        let format = VertexFormat {
            stride: layout.stride as u64,
            attributes,
        };
        Handle::from_raw(self.tables.borrow_mut().vertex_formats.insert(format))
    }

    fn create_pipeline_state(&self, desc: &PipelineStateDescriptor) -> PipelineStateHandle {
        if desc.parameter_stride as u64 % wgpu::COPY_BUFFER_ALIGNMENT != 0 {
            log::warn!(
                "create_pipeline_state: parameter stride {} is not a multiple of {}",
                desc.parameter_stride,
                wgpu::COPY_BUFFER_ALIGNMENT
            );
            return Handle::invalid();
        }

        let mut tables = self.tables.borrow_mut();
        let Some(&(vs, ps)) = tables.surface_shaders.get(desc.shader.raw()) else {
            log::warn!("create_pipeline_state: surface shader {:?} is not live", desc.shader);
            return Handle::invalid();
        };
        let Some(format) = tables.vertex_formats.get(desc.vertex_format.raw()) else {
            log::warn!("create_pipeline_state: vertex format {:?} is not live", desc.vertex_format);
            return Handle::invalid();
        };
        let (Some(vs), Some(ps)) = (
            tables.vertex_shaders.get(vs.raw()),
            tables.pixel_shaders.get(ps.raw()),
        ) else {
            log::warn!("create_pipeline_state: shaders of {:?} were released", desc.shader);
            return Handle::invalid();
        };

        let target = self.target.borrow();
        let factory = StateFactory {
            features: self.features,
            depth_format: target.depth_format(),
            sample_count: 1,
        };
        let objects = match build_state_objects(&factory, desc) {
            Ok(objects) => objects,
            Err(e) => {
                log::warn!("create_pipeline_state: {e}");
                return Handle::invalid();
            }
        };

        let device = self.gpu.device();
        let layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("volley pipeline layout"),
            bind_group_layouts: &[&self.shared_layout],
            immediate_size: 0,
        });
        let recipe = PipelineRecipe {
            layout,
            vs: vs.clone(),
            ps: ps.clone(),
            vertex_stride: format.stride,
            attributes: format.attributes.clone(),
            objects,
            color_format: target.color_format(),
            sample_count: factory.sample_count,
        };

        // Most queues draw triangle lists; build that variant up front.
        let mut variants: Variants = Default::default();
        let default_topology = PrimitiveTopology::default();
        match recipe.build(device, default_topology) {
            Ok(pipeline) => variants[default_topology as usize] = Some(pipeline),
            Err(error) => {
                log::warn!("create_pipeline_state: {error}");
                return Handle::invalid();
            }
        }

        Handle::from_raw(tables.pipelines.insert(Pipeline {
            recipe,
            variants,
            stride: desc.parameter_stride,
            store: SharedParameterStore::new(),
        }))
    }

    fn create_buffer(&self, desc: &BufferDescriptor<'_>) -> BufferHandle {
        let Some(size) = desc.resolved_size() else {
            log::warn!("create_buffer: unusable descriptor {desc:?}");
            return Handle::invalid();
        };
        let mut usage = match desc.kind {
            BufferKind::Vertex => wgpu::BufferUsages::VERTEX,
            BufferKind::Index => wgpu::BufferUsages::INDEX,
            BufferKind::Parameter => wgpu::BufferUsages::STORAGE,
        };
        if desc.dynamic {
            usage |= wgpu::BufferUsages::COPY_DST;
        }

        let device = self.gpu.device();
        let aligned = size.next_multiple_of(wgpu::COPY_BUFFER_ALIGNMENT);
        let buffer = match desc.data {
            Some(data) => {
                let mut contents = vec![0u8; aligned as usize];
                contents[..data.len()].copy_from_slice(data);
                device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                    label: Some("volley buffer"),
                    contents: &contents,
                    usage,
                })
            }
            None => device.create_buffer(&wgpu::BufferDescriptor {
                label: Some("volley buffer"),
                size: aligned,
                usage,
                mapped_at_creation: false,
            }),
        };

        Handle::from_raw(self.tables.borrow_mut().buffers.insert(GpuBuffer {
            buffer,
            kind: desc.kind,
            dynamic: desc.dynamic,
        }))
    }

    fn update_buffer(&self, buffer: BufferHandle, offset: u64, data: &[u8]) {
        let tables = self.tables.borrow();
        let Some(target) = tables.buffers.get(buffer.raw()) else {
            return;
        };
        if !target.dynamic {
            log::warn!("update_buffer: {:?} buffer {buffer:?} is immutable", target.kind);
            return;
        }
        let len = data.len() as u64;
        if offset % wgpu::COPY_BUFFER_ALIGNMENT != 0 || len % wgpu::COPY_BUFFER_ALIGNMENT != 0 {
            log::warn!("update_buffer: offset {offset} and length {len} must be 4-byte aligned");
            return;
        }
        if offset.checked_add(len).is_none_or(|end| end > target.buffer.size()) {
            log::warn!("update_buffer: write of {len} bytes at {offset} out of range");
            return;
        }
        self.gpu.queue().write_buffer(&target.buffer, offset, data);
    }

    fn process_batch(
        &self,
        state: PipelineStateHandle,
        calls: &[DrawCall],
        options: &BatchOptions,
    ) -> Result<BatchReport, SubmitError> {
        let mut tables = self.tables.borrow_mut();
        let Tables {
            pipelines, buffers, ..
        } = &mut *tables;

        let Some(pipeline) = pipelines.get_mut(state.raw()) else {
            if calls.is_empty() {
                return Ok(BatchReport::empty(0));
            }
            return Err(SubmitError::UnknownPipelineState);
        };
        if calls.is_empty() {
            return Ok(BatchReport::empty(pipeline.store.capacity()));
        }

        let target = self.target.borrow();
        let device = self.gpu.device();
        let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("volley batch encoder"),
        });

        let result = {
            let pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("volley batch pass"),
                color_attachments: &[Some(target.color_attachment(wgpu::LoadOp::Load))],
                depth_stencil_attachment: target
                    .depth_attachment(wgpu::LoadOp::Load, wgpu::LoadOp::Load),
                timestamp_writes: None,
                occlusion_query_set: None,
                multiview_mask: None,
            });

            let Pipeline {
                recipe,
                variants,
                stride,
                store,
            } = pipeline;
            let mut pass_encoder = PassEncoder::new(
                device,
                self.gpu.queue(),
                pass,
                buffers,
                recipe,
                variants,
                &self.shared_layout,
            );
            batch::execute(&mut pass_encoder, store, *stride, calls, options)
        };

        self.gpu.queue().submit(std::iter::once(encoder.finish()));
        result
    }
}
