use anyhow::{Result, bail};
use bytemuck::{Pod, Zeroable};
use volley_engine::backend::{BufferDescriptor, BufferKind};
use volley_engine::diagnostics::{Diagnostic, Severity};
use volley_engine::handle::{self, DrawQueueHandle, Owned};
use volley_engine::pipeline::{
    BlendDesc, CullMode, DataFormat, PipelineStateDescriptor, PrimitiveTopology, VertexElement,
};
use volley_engine::Context;
use volley_wgpu::WgpuBackend;

/// Per-draw parameters; mirrors `Params` in `cube.wgsl`.
#[repr(C)]
#[derive(Debug, Copy, Clone, Pod, Zeroable)]
pub struct CubeParams {
    pub offset: [f32; 4],
    pub color: [f32; 4],
    pub spin: [f32; 4],
}

#[rustfmt::skip]
const CUBE_VERTICES: [[f32; 3]; 8] = [
    [-0.5, -0.5, -0.5], [0.5, -0.5, -0.5], [0.5, 0.5, -0.5], [-0.5, 0.5, -0.5],
    [-0.5, -0.5,  0.5], [0.5, -0.5,  0.5], [0.5, 0.5,  0.5], [-0.5, 0.5,  0.5],
];

#[rustfmt::skip]
const CUBE_INDICES: [u32; 36] = [
    0, 2, 1, 0, 3, 2, // back
    4, 5, 6, 4, 6, 7, // front
    0, 1, 5, 0, 5, 4, // bottom
    3, 6, 2, 3, 7, 6, // top
    0, 4, 7, 0, 7, 3, // left
    1, 2, 6, 1, 6, 5, // right
];

const FLOOR_LINES: usize = 11;

fn floor_vertices() -> Vec<[f32; 3]> {
    let mut v = Vec::with_capacity(FLOOR_LINES * 4);
    for i in 0..FLOOR_LINES {
        let t = -2.5 + i as f32 * 0.5;
        v.extend([[t, -1.2, -2.5], [t, -1.2, 2.5], [-2.5, -1.2, t], [2.5, -1.2, t]]);
    }
    v
}

/// GPU resources of the demo, released when the scene is dropped.
///
/// Fields drop in declaration order: queues first, shaders last.
pub struct Scene<'c> {
    grid: Owned<'c, handle::kind::DrawQueue>,
    mixed: Owned<'c, handle::kind::DrawQueue>,
    cube_vb: Owned<'c, handle::kind::Buffer>,
    cube_ib: Owned<'c, handle::kind::Buffer>,
    floor_vb: Owned<'c, handle::kind::Buffer>,
    _pipeline: Owned<'c, handle::kind::PipelineState>,
    _format: Owned<'c, handle::kind::VertexFormat>,
    _surface: Owned<'c, handle::kind::SurfaceShader>,
    _shaders: (Owned<'c, handle::kind::VertexShader>, Owned<'c, handle::kind::PixelShader>),
}

impl<'c> Scene<'c> {
    pub fn create(ctx: &'c Context<WgpuBackend>) -> Result<Self> {
        let source = include_str!("shaders/cube.wgsl").as_bytes();

        let mut errors = Vec::new();
        let mut report = |d: &Diagnostic| {
            if d.severity == Severity::Error {
                errors.push(d.message.clone());
            }
        };

        let vs = ctx.own(ctx.create_vertex_shader(source, Some(&mut report)));
        let ps = ctx.own(ctx.create_pixel_shader(source, Some(&mut report)));
        let surface = ctx.own(ctx.link_surface_shader(vs.get(), ps.get()));
        let format = ctx.own(ctx.create_vertex_format(
            &[VertexElement::new("POSITION", DataFormat::RGB32F, 0)],
            vs.get(),
            Some(&mut report),
        ));
        if !errors.is_empty() {
            bail!("shader setup failed: {}", errors.join("; "));
        }

        let mut desc = PipelineStateDescriptor::new(surface.get(), format.get());
        desc.rasterizer.cull_mode = CullMode::None;
        desc.blend.target = BlendDesc::ALPHA;
        desc.parameter_stride = std::mem::size_of::<CubeParams>() as u32;
        let pipeline = ctx.own(ctx.create_pipeline_state(&desc));
        if !pipeline.is_valid() {
            bail!("pipeline state creation failed");
        }

        let cube_vb = ctx.own(ctx.create_buffer(&BufferDescriptor::immutable(
            BufferKind::Vertex,
            bytemuck::cast_slice(&CUBE_VERTICES),
        )));
        let cube_ib = ctx.own(ctx.create_buffer(&BufferDescriptor::immutable(
            BufferKind::Index,
            bytemuck::cast_slice(&CUBE_INDICES),
        )));
        let floor = floor_vertices();
        let floor_vb = ctx.own(ctx.create_buffer(&BufferDescriptor::immutable(
            BufferKind::Vertex,
            bytemuck::cast_slice(&floor),
        )));

        let grid = ctx.own(ctx.create_draw_queue(pipeline.get()));
        let mixed = ctx.own(ctx.create_draw_queue(pipeline.get()));

        Ok(Self {
            grid,
            mixed,
            cube_vb,
            cube_ib,
            floor_vb,
            _pipeline: pipeline,
            _format: format,
            _surface: surface,
            _shaders: (vs, ps),
        })
    }

    pub fn grid_queue(&self) -> DrawQueueHandle {
        self.grid.get()
    }

    pub fn mixed_queue(&self) -> DrawQueueHandle {
        self.mixed.get()
    }

    /// `n * n` cubes with the same geometry: one instanced draw.
    pub fn record_grid(&self, ctx: &Context<WgpuBackend>, n: u32, t: f32) {
        let q = self.grid.get();
        ctx.set_primitive_topology(q, PrimitiveTopology::TriangleList);
        ctx.set_vertex_buffer(q, self.cube_vb.get());
        ctx.set_index_buffer(q, self.cube_ib.get());

        let step = 4.0 / n as f32;
        for y in 0..n {
            for x in 0..n {
                let fx = -2.0 + (x as f32 + 0.5) * step;
                let fy = -2.0 + (y as f32 + 0.5) * step;
                let params = CubeParams {
                    offset: [fx, fy, 0.0, step * 0.6],
                    color: [x as f32 / n as f32, y as f32 / n as f32, 0.8, 1.0],
                    spin: [t + (x + y) as f32 * 0.2, t * 0.5, 0.0, 0.0],
                };
                ctx.set_constants_pod(q, 0, &params);
                ctx.draw_indexed(q, CUBE_INDICES.len() as u32, 0, 0);
            }
        }
    }

    /// A floor made of lines plus one large cube: geometry differs per call.
    pub fn record_mixed(&self, ctx: &Context<WgpuBackend>, t: f32) {
        let q = self.mixed.get();

        ctx.set_primitive_topology(q, PrimitiveTopology::LineList);
        ctx.set_vertex_buffer(q, self.floor_vb.get());
        ctx.set_constants_pod(
            q,
            0,
            &CubeParams {
                offset: [0.0, 0.0, 0.0, 1.0],
                color: [0.4, 0.4, 0.4, 1.0],
                spin: [0.0; 4],
            },
        );
        ctx.draw(q, (FLOOR_LINES * 4) as u32, 0);

        ctx.set_primitive_topology(q, PrimitiveTopology::TriangleList);
        ctx.set_vertex_buffer(q, self.cube_vb.get());
        ctx.set_index_buffer(q, self.cube_ib.get());
        ctx.set_constants_pod(
            q,
            0,
            &CubeParams {
                offset: [0.0, 0.0, 1.0, 1.2],
                color: [1.0, 0.6, 0.1, 0.5],
                spin: [t, t * 0.3, 0.0, 0.0],
            },
        );
        ctx.draw_indexed(q, CUBE_INDICES.len() as u32, 0, 0);
    }
}
