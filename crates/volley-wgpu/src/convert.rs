//! Engine enums to wgpu enums.

use volley_engine::pipeline::{
    BlendDesc, BlendFactor, BlendOp, ComparisonFunc, CullMode, DataFormat, FillMode,
    PrimitiveTopology, StencilDesc, StencilOp, Winding,
};

pub(crate) fn topology(t: PrimitiveTopology) -> wgpu::PrimitiveTopology {
    match t {
        PrimitiveTopology::PointList => wgpu::PrimitiveTopology::PointList,
        PrimitiveTopology::LineList => wgpu::PrimitiveTopology::LineList,
        PrimitiveTopology::LineStrip => wgpu::PrimitiveTopology::LineStrip,
        PrimitiveTopology::TriangleList => wgpu::PrimitiveTopology::TriangleList,
        PrimitiveTopology::TriangleStrip => wgpu::PrimitiveTopology::TriangleStrip,
    }
}

pub(crate) fn cull_mode(c: CullMode) -> Option<wgpu::Face> {
    match c {
        CullMode::None => None,
        CullMode::Back => Some(wgpu::Face::Back),
        CullMode::Front => Some(wgpu::Face::Front),
    }
}

pub(crate) fn front_face(w: Winding) -> wgpu::FrontFace {
    match w {
        Winding::Clockwise => wgpu::FrontFace::Cw,
        Winding::CounterClockwise => wgpu::FrontFace::Ccw,
    }
}

pub(crate) fn polygon_mode(f: FillMode) -> wgpu::PolygonMode {
    match f {
        FillMode::Solid => wgpu::PolygonMode::Fill,
        FillMode::Wireframe => wgpu::PolygonMode::Line,
    }
}

pub(crate) fn blend_factor(f: BlendFactor) -> wgpu::BlendFactor {
    match f {
        BlendFactor::Zero => wgpu::BlendFactor::Zero,
        BlendFactor::One => wgpu::BlendFactor::One,
        BlendFactor::SrcAlpha => wgpu::BlendFactor::SrcAlpha,
        BlendFactor::DstAlpha => wgpu::BlendFactor::DstAlpha,
        BlendFactor::InvSrcAlpha => wgpu::BlendFactor::OneMinusSrcAlpha,
        BlendFactor::InvDstAlpha => wgpu::BlendFactor::OneMinusDstAlpha,
        BlendFactor::SrcColor => wgpu::BlendFactor::Src,
        BlendFactor::DstColor => wgpu::BlendFactor::Dst,
        BlendFactor::InvSrcColor => wgpu::BlendFactor::OneMinusSrc,
        BlendFactor::InvDstColor => wgpu::BlendFactor::OneMinusDst,
    }
}

pub(crate) fn blend_op(op: BlendOp) -> wgpu::BlendOperation {
    match op {
        BlendOp::Add => wgpu::BlendOperation::Add,
        BlendOp::Subtract => wgpu::BlendOperation::Subtract,
        BlendOp::RevSubtract => wgpu::BlendOperation::ReverseSubtract,
        BlendOp::Min => wgpu::BlendOperation::Min,
        BlendOp::Max => wgpu::BlendOperation::Max,
    }
}

/// `None` when the description is disabled.
pub(crate) fn blend_state(desc: &BlendDesc) -> Option<wgpu::BlendState> {
    if !desc.enabled {
        return None;
    }
    Some(wgpu::BlendState {
        color: wgpu::BlendComponent {
            src_factor: blend_factor(desc.src),
            dst_factor: blend_factor(desc.dst),
            operation: blend_op(desc.op),
        },
        alpha: wgpu::BlendComponent {
            src_factor: blend_factor(desc.src_alpha),
            dst_factor: blend_factor(desc.dst_alpha),
            operation: blend_op(desc.op_alpha),
        },
    })
}

pub(crate) fn compare(f: ComparisonFunc) -> wgpu::CompareFunction {
    match f {
        ComparisonFunc::Always => wgpu::CompareFunction::Always,
        ComparisonFunc::Never => wgpu::CompareFunction::Never,
        ComparisonFunc::Less => wgpu::CompareFunction::Less,
        ComparisonFunc::LessEqual => wgpu::CompareFunction::LessEqual,
        ComparisonFunc::Greater => wgpu::CompareFunction::Greater,
        ComparisonFunc::GreaterEqual => wgpu::CompareFunction::GreaterEqual,
        ComparisonFunc::Equal => wgpu::CompareFunction::Equal,
        ComparisonFunc::NotEqual => wgpu::CompareFunction::NotEqual,
    }
}

pub(crate) fn stencil_op(op: StencilOp) -> wgpu::StencilOperation {
    match op {
        StencilOp::Keep => wgpu::StencilOperation::Keep,
        StencilOp::Zero => wgpu::StencilOperation::Zero,
        StencilOp::Replace => wgpu::StencilOperation::Replace,
        // Saturating, like the classic INCR_SAT/DECR_SAT.
        StencilOp::Incr => wgpu::StencilOperation::IncrementClamp,
        StencilOp::Decr => wgpu::StencilOperation::DecrementClamp,
    }
}

pub(crate) fn stencil_face(desc: &StencilDesc) -> wgpu::StencilFaceState {
    wgpu::StencilFaceState {
        compare: compare(desc.func),
        fail_op: stencil_op(desc.fail_op),
        depth_fail_op: stencil_op(desc.depth_fail_op),
        pass_op: stencil_op(desc.pass_op),
    }
}

pub(crate) fn vertex_format(f: DataFormat) -> wgpu::VertexFormat {
    match f {
        DataFormat::R32F => wgpu::VertexFormat::Float32,
        DataFormat::RG32F => wgpu::VertexFormat::Float32x2,
        DataFormat::RGB32F => wgpu::VertexFormat::Float32x3,
        DataFormat::RGBA32F => wgpu::VertexFormat::Float32x4,
        DataFormat::R32U => wgpu::VertexFormat::Uint32,
        DataFormat::RG32U => wgpu::VertexFormat::Uint32x2,
        DataFormat::RGB32U => wgpu::VertexFormat::Uint32x3,
        DataFormat::RGBA32U => wgpu::VertexFormat::Uint32x4,
        DataFormat::RG16 => wgpu::VertexFormat::Unorm16x2,
        DataFormat::RGBA16 => wgpu::VertexFormat::Unorm16x4,
        DataFormat::RG16F => wgpu::VertexFormat::Float16x2,
        DataFormat::RGBA16F => wgpu::VertexFormat::Float16x4,
        DataFormat::RG8 => wgpu::VertexFormat::Unorm8x2,
        DataFormat::RGBA8 => wgpu::VertexFormat::Unorm8x4,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vertex_format_sizes_agree() {
        for f in [
            DataFormat::R32F,
            DataFormat::RG32F,
            DataFormat::RGB32F,
            DataFormat::RGBA32F,
            DataFormat::R32U,
            DataFormat::RG32U,
            DataFormat::RGB32U,
            DataFormat::RGBA32U,
            DataFormat::RG16,
            DataFormat::RGBA16,
            DataFormat::RG16F,
            DataFormat::RGBA16F,
            DataFormat::RG8,
            DataFormat::RGBA8,
        ] {
            assert_eq!(vertex_format(f).size(), f.size() as u64, "{f:?}");
        }
    }

    #[test]
    fn disabled_blend_maps_to_none() {
        assert_eq!(blend_state(&BlendDesc::REPLACE), None);
        let alpha = blend_state(&BlendDesc::ALPHA).unwrap();
        assert_eq!(alpha.color.dst_factor, wgpu::BlendFactor::OneMinusSrcAlpha);
    }

    #[test]
    fn strips_only_for_strip_topologies() {
        for t in PrimitiveTopology::ALL {
            assert_eq!(topology(t).is_strip(), t.is_strip());
        }
    }
}
