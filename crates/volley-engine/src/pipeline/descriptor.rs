use crate::handle::{SurfaceShaderHandle, VertexFormatHandle};
use crate::queue::MAX_PARAMETER_BYTES;

/// Number of independently blendable render targets.
pub const MAX_RENDER_TARGETS: usize = 8;

/// Primitive assembly mode.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Default)]
pub enum PrimitiveTopology {
    PointList,
    LineList,
    LineStrip,
    #[default]
    TriangleList,
    TriangleStrip,
}

impl PrimitiveTopology {
    pub const ALL: [PrimitiveTopology; 5] = [
        PrimitiveTopology::PointList,
        PrimitiveTopology::LineList,
        PrimitiveTopology::LineStrip,
        PrimitiveTopology::TriangleList,
        PrimitiveTopology::TriangleStrip,
    ];

    #[inline]
    pub const fn is_strip(self) -> bool {
        matches!(self, PrimitiveTopology::LineStrip | PrimitiveTopology::TriangleStrip)
    }
}

// ── rasterizer ────────────────────────────────────────────────────────────

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Default)]
pub enum FillMode {
    #[default]
    Solid,
    Wireframe,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Default)]
pub enum CullMode {
    None,
    #[default]
    Back,
    Front,
}

/// Vertex winding that identifies a front face.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Default)]
pub enum Winding {
    Clockwise,
    #[default]
    CounterClockwise,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Default)]
pub struct RasterizerState {
    pub fill_mode: FillMode,
    pub cull_mode: CullMode,
    pub front_face: Winding,
}

// ── blend ─────────────────────────────────────────────────────────────────

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum BlendFactor {
    Zero,
    One,
    SrcAlpha,
    DstAlpha,
    InvSrcAlpha,
    InvDstAlpha,
    SrcColor,
    DstColor,
    InvSrcColor,
    InvDstColor,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum BlendOp {
    Add,
    Subtract,
    RevSubtract,
    Min,
    Max,
}

/// Color channel write mask.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct ColorWriteMask(pub u8);

impl ColorWriteMask {
    pub const RED: ColorWriteMask = ColorWriteMask(0b0001);
    pub const GREEN: ColorWriteMask = ColorWriteMask(0b0010);
    pub const BLUE: ColorWriteMask = ColorWriteMask(0b0100);
    pub const ALPHA: ColorWriteMask = ColorWriteMask(0b1000);
    pub const ALL: ColorWriteMask = ColorWriteMask(0b1111);
    pub const NONE: ColorWriteMask = ColorWriteMask(0);

    #[inline]
    pub const fn contains(self, other: ColorWriteMask) -> bool {
        self.0 & other.0 == other.0
    }
}

impl Default for ColorWriteMask {
    fn default() -> Self {
        Self::ALL
    }
}

/// Blend equation for one render target.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct BlendDesc {
    pub enabled: bool,
    pub src: BlendFactor,
    pub dst: BlendFactor,
    pub op: BlendOp,
    pub src_alpha: BlendFactor,
    pub dst_alpha: BlendFactor,
    pub op_alpha: BlendOp,
    pub write_mask: ColorWriteMask,
}

impl BlendDesc {
    /// Straight (non-premultiplied) alpha blending.
    pub const ALPHA: BlendDesc = BlendDesc {
        enabled: true,
        src: BlendFactor::SrcAlpha,
        dst: BlendFactor::InvSrcAlpha,
        op: BlendOp::Add,
        src_alpha: BlendFactor::One,
        dst_alpha: BlendFactor::InvSrcAlpha,
        op_alpha: BlendOp::Add,
        write_mask: ColorWriteMask::ALL,
    };

    /// Source replaces destination.
    pub const REPLACE: BlendDesc = BlendDesc {
        enabled: false,
        src: BlendFactor::One,
        dst: BlendFactor::Zero,
        op: BlendOp::Add,
        src_alpha: BlendFactor::One,
        dst_alpha: BlendFactor::Zero,
        op_alpha: BlendOp::Add,
        write_mask: ColorWriteMask::ALL,
    };
}

impl Default for BlendDesc {
    fn default() -> Self {
        Self::REPLACE
    }
}

/// Output merger blend configuration.
///
/// `target` applies to every render target unless `separate_blend` is set, in
/// which case `render_targets[i]` is used for target `i`.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Default)]
pub struct BlendState {
    pub alpha_to_coverage: bool,
    pub separate_blend: bool,
    pub target: BlendDesc,
    pub render_targets: [BlendDesc; MAX_RENDER_TARGETS],
}

impl BlendState {
    /// Effective blend description for render target `index`.
    pub fn for_target(&self, index: usize) -> BlendDesc {
        if self.separate_blend {
            self.render_targets.get(index).copied().unwrap_or(self.target)
        } else {
            self.target
        }
    }
}

// ── depth / stencil ───────────────────────────────────────────────────────

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Default)]
pub enum DepthWriteMask {
    Zero,
    #[default]
    All,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum ComparisonFunc {
    Always,
    Never,
    Less,
    LessEqual,
    Greater,
    GreaterEqual,
    Equal,
    NotEqual,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum StencilOp {
    Keep,
    Zero,
    Replace,
    Incr,
    Decr,
}

/// Stencil behavior for one face orientation.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct StencilDesc {
    pub func: ComparisonFunc,
    pub fail_op: StencilOp,
    pub depth_fail_op: StencilOp,
    pub pass_op: StencilOp,
}

impl Default for StencilDesc {
    fn default() -> Self {
        Self {
            func: ComparisonFunc::Always,
            fail_op: StencilOp::Keep,
            depth_fail_op: StencilOp::Keep,
            pass_op: StencilOp::Keep,
        }
    }
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct DepthStencilState {
    pub depth_enabled: bool,
    pub depth_write: DepthWriteMask,
    pub depth_func: ComparisonFunc,
    pub stencil_enabled: bool,
    pub stencil_read_mask: u8,
    pub stencil_write_mask: u8,
    pub front_face: StencilDesc,
    pub back_face: StencilDesc,
    /// Reference value used by stencil comparisons; applied when the pipeline
    /// state is bound.
    pub stencil_ref: u32,
}

impl Default for DepthStencilState {
    fn default() -> Self {
        Self {
            depth_enabled: true,
            depth_write: DepthWriteMask::All,
            depth_func: ComparisonFunc::Less,
            stencil_enabled: false,
            stencil_read_mask: 0xff,
            stencil_write_mask: 0xff,
            front_face: StencilDesc::default(),
            back_face: StencilDesc::default(),
            stencil_ref: 0,
        }
    }
}

// ── descriptor ────────────────────────────────────────────────────────────

/// Everything needed to compile one pipeline state object.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct PipelineStateDescriptor {
    pub rasterizer: RasterizerState,
    pub blend: BlendState,
    pub depth_stencil: DepthStencilState,
    pub shader: SurfaceShaderHandle,
    pub vertex_format: VertexFormatHandle,
    /// Size in bytes of one packed per-draw parameter blob, as declared by the
    /// shader's parameter structure. Must be in `1..=MAX_PARAMETER_BYTES`.
    pub parameter_stride: u32,
}

impl PipelineStateDescriptor {
    /// Descriptor with default fixed-function state.
    pub fn new(shader: SurfaceShaderHandle, vertex_format: VertexFormatHandle) -> Self {
        Self {
            rasterizer: RasterizerState::default(),
            blend: BlendState::default(),
            depth_stencil: DepthStencilState::default(),
            shader,
            vertex_format,
            parameter_stride: MAX_PARAMETER_BYTES as u32,
        }
    }
}
