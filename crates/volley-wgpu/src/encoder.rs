use core::ops::Range;

use volley_engine::backend::{BatchEncoder, BufferKind, SubmitError};
use volley_engine::handle::ResourceTable;
use volley_engine::pipeline::{PrimitiveTopology, StateObjects};
use volley_engine::queue::{DrawCall, DrawKind};

use crate::convert;
use crate::device::validated;
use crate::states::StateFactory;

pub(crate) struct GpuBuffer {
    pub buffer: wgpu::Buffer,
    pub kind: BufferKind,
    pub dynamic: bool,
}

/// Shared parameter store of one pipeline state.
pub(crate) struct SharedBuffer {
    buffer: wgpu::Buffer,
    bind_group: wgpu::BindGroup,
}

/// Everything needed to build a render pipeline for any topology.
pub(crate) struct PipelineRecipe {
    pub layout: wgpu::PipelineLayout,
    pub vs: wgpu::ShaderModule,
    pub ps: wgpu::ShaderModule,
    pub vertex_stride: u64,
    pub attributes: Vec<wgpu::VertexAttribute>,
    pub objects: StateObjects<StateFactory>,
    pub color_format: wgpu::TextureFormat,
    pub sample_count: u32,
}

impl PipelineRecipe {
    /// Builds the variant for `topology`. Shader/layout mismatches surface as
    /// the validation error wgpu reports for the pipeline.
    pub fn build(
        &self,
        device: &wgpu::Device,
        topology: PrimitiveTopology,
    ) -> Result<wgpu::RenderPipeline, wgpu::Error> {
        let color = &self.objects.blend;
        let wgpu_topology = convert::topology(topology);
        let primitive = wgpu::PrimitiveState {
            topology: wgpu_topology,
            strip_index_format: wgpu_topology
                .is_strip()
                .then_some(wgpu::IndexFormat::Uint32),
            ..self.objects.rasterizer
        };

        validated(device, || device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("volley pipeline"),
            layout: Some(&self.layout),

            vertex: wgpu::VertexState {
                module: &self.vs,
                entry_point: Some("vs_main"),
                compilation_options: Default::default(),
                buffers: &[wgpu::VertexBufferLayout {
                    array_stride: self.vertex_stride,
                    step_mode: wgpu::VertexStepMode::Vertex,
                    attributes: &self.attributes,
                }],
            },

            fragment: Some(wgpu::FragmentState {
                module: &self.ps,
                entry_point: Some("ps_main"),
                compilation_options: Default::default(),
                targets: &[Some(wgpu::ColorTargetState {
                    format: self.color_format,
                    blend: color.blend,
                    write_mask: color.write_mask,
                })],
            }),

            primitive,
            depth_stencil: self.objects.depth_stencil.clone(),
            multisample: wgpu::MultisampleState {
                count: self.sample_count,
                mask: !0,
                alpha_to_coverage_enabled: color.alpha_to_coverage,
            },

            multiview_mask: None,
            cache: None,
        }))
    }
}

pub(crate) type Variants = [Option<wgpu::RenderPipeline>; PrimitiveTopology::ALL.len()];

/// Batch encoder recording into one render pass.
pub(crate) struct PassEncoder<'a> {
    pub device: &'a wgpu::Device,
    pub queue: &'a wgpu::Queue,
    pub pass: wgpu::RenderPass<'a>,
    pub buffers: &'a ResourceTable<GpuBuffer>,
    pub recipe: &'a PipelineRecipe,
    pub variants: &'a mut Variants,
    pub shared_layout: &'a wgpu::BindGroupLayout,
    bound_topology: Option<PrimitiveTopology>,
    skip_draw: bool,
}

impl<'a> PassEncoder<'a> {
    pub fn new(
        device: &'a wgpu::Device,
        queue: &'a wgpu::Queue,
        mut pass: wgpu::RenderPass<'a>,
        buffers: &'a ResourceTable<GpuBuffer>,
        recipe: &'a PipelineRecipe,
        variants: &'a mut Variants,
        shared_layout: &'a wgpu::BindGroupLayout,
    ) -> Self {
        pass.set_stencil_reference(recipe.objects.stencil_ref);
        Self {
            device,
            queue,
            pass,
            buffers,
            recipe,
            variants,
            shared_layout,
            bound_topology: None,
            skip_draw: false,
        }
    }
}

impl BatchEncoder for PassEncoder<'_> {
    type SharedBuffer = SharedBuffer;

    fn allocate_shared_buffer(&mut self, bytes: u64, _stride: u32) -> Result<SharedBuffer, SubmitError> {
        let limits = self.device.limits();
        if bytes > limits.max_storage_buffer_binding_size as u64 || bytes > limits.max_buffer_size {
            return Err(SubmitError::SharedBufferAllocation { bytes });
        }

        let buffer = self.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("volley shared parameters"),
            size: bytes,
            usage: wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let bind_group = self.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("volley shared parameters bind group"),
            layout: self.shared_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: buffer.as_entire_binding(),
            }],
        });
        Ok(SharedBuffer { buffer, bind_group })
    }

    fn write_shared_buffer(
        &mut self,
        shared: &SharedBuffer,
        offset: u64,
        data: &[u8],
    ) -> Result<(), SubmitError> {
        let len = data.len() as u64;
        let aligned = offset % wgpu::COPY_BUFFER_ALIGNMENT == 0 && len % wgpu::COPY_BUFFER_ALIGNMENT == 0;
        if !aligned || offset.checked_add(len).is_none_or(|end| end > shared.buffer.size()) {
            return Err(SubmitError::SharedBufferWrite { offset, len });
        }
        self.queue.write_buffer(&shared.buffer, offset, data);
        Ok(())
    }

    fn bind_shared_buffer(&mut self, shared: &SharedBuffer) {
        self.pass.set_bind_group(0, &shared.bind_group, &[]);
    }

    fn bind_geometry(&mut self, call: &DrawCall) {
        // Unresolvable geometry would make wgpu reject the whole pass.
        self.skip_draw = true;

        if self.bound_topology != Some(call.topology) {
            let variant = &mut self.variants[call.topology as usize];
            if variant.is_none() {
                match self.recipe.build(self.device, call.topology) {
                    Ok(pipeline) => *variant = Some(pipeline),
                    Err(error) => {
                        log::warn!("skipping draw: no {:?} pipeline: {error}", call.topology);
                        return;
                    }
                }
            }
            let Some(pipeline) = variant.as_ref() else {
                return;
            };
            self.pass.set_pipeline(pipeline);
            self.bound_topology = Some(call.topology);
        }

        let Some(vb) = self.buffers.get(call.vertex_buffer.raw()) else {
            log::debug!("skipping draw: vertex buffer {:?} is not live", call.vertex_buffer);
            return;
        };
        self.pass.set_vertex_buffer(0, vb.buffer.slice(..));

        if call.kind == DrawKind::DrawIndexed {
            let Some(ib) = self.buffers.get(call.index_buffer.raw()) else {
                log::debug!("skipping draw: index buffer {:?} is not live", call.index_buffer);
                return;
            };
            self.pass.set_index_buffer(ib.buffer.slice(..), wgpu::IndexFormat::Uint32);
        }
        self.skip_draw = false;
    }

    fn draw(&mut self, call: &DrawCall, instances: Range<u32>) {
        if self.skip_draw {
            return;
        }
        match call.kind {
            DrawKind::Draw => {
                self.pass.draw(element_range(call.start_vertex, call.count), instances);
            }
            DrawKind::DrawIndexed => {
                let Ok(base_vertex) = i32::try_from(call.start_vertex) else {
                    log::warn!("skipping draw: start vertex {} exceeds i32", call.start_vertex);
                    return;
                };
                self.pass.draw_indexed(
                    element_range(call.start_index, call.count),
                    base_vertex,
                    instances,
                );
            }
        }
    }
}

/// `first..first + count`, clamped at `u32::MAX`.
fn element_range(first: u32, count: u32) -> Range<u32> {
    first..first.saturating_add(count)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn element_range_clamps() {
        assert_eq!(element_range(6, 36), 6..42);
        assert_eq!(element_range(u32::MAX - 2, 36), u32::MAX - 2..u32::MAX);
    }
}
