//! Fixed-function state objects for wgpu.
//!
//! wgpu bakes fixed-function state into the render pipeline, so the
//! "objects" here are validated wgpu descriptions that later feed every
//! topology variant of a pipeline.

use volley_engine::pipeline::{
    BlendOp, BlendState, DepthStencilState, DepthWriteMask, RasterizerState, StateObjectFactory,
};

use crate::convert;

/// Blend configuration of the single color target.
#[derive(Debug, Clone, Copy)]
pub(crate) struct ColorBlend {
    pub blend: Option<wgpu::BlendState>,
    pub write_mask: wgpu::ColorWrites,
    pub alpha_to_coverage: bool,
}

#[derive(Debug, Clone, Copy)]
pub(crate) struct StateFactory {
    pub features: wgpu::Features,
    pub depth_format: Option<wgpu::TextureFormat>,
    pub sample_count: u32,
}

impl StateObjectFactory for StateFactory {
    /// Topology is filled in per variant.
    type Rasterizer = wgpu::PrimitiveState;
    type Blend = ColorBlend;
    type DepthStencil = Option<wgpu::DepthStencilState>;

    fn create_rasterizer(&self, state: &RasterizerState) -> Option<wgpu::PrimitiveState> {
        let polygon_mode = convert::polygon_mode(state.fill_mode);
        if polygon_mode == wgpu::PolygonMode::Line
            && !self.features.contains(wgpu::Features::POLYGON_MODE_LINE)
        {
            log::warn!("wireframe fill needs Features::POLYGON_MODE_LINE");
            return None;
        }
        Some(wgpu::PrimitiveState {
            topology: wgpu::PrimitiveTopology::TriangleList,
            strip_index_format: None,
            front_face: convert::front_face(state.front_face),
            cull_mode: convert::cull_mode(state.cull_mode),
            polygon_mode,
            unclipped_depth: false,
            conservative: false,
        })
    }

    fn create_blend(&self, state: &BlendState) -> Option<ColorBlend> {
        if state.alpha_to_coverage && self.sample_count == 1 {
            log::warn!("alpha-to-coverage needs a multisampled target");
            return None;
        }
        // One color target; render_targets[1..] have nothing to apply to.
        let desc = state.for_target(0);
        let min_max = |op: BlendOp| matches!(op, BlendOp::Min | BlendOp::Max);
        if desc.enabled && (min_max(desc.op) || min_max(desc.op_alpha)) {
            let one = volley_engine::pipeline::BlendFactor::One;
            let color_ok = !min_max(desc.op) || (desc.src == one && desc.dst == one);
            let alpha_ok =
                !min_max(desc.op_alpha) || (desc.src_alpha == one && desc.dst_alpha == one);
            if !color_ok || !alpha_ok {
                log::warn!("min/max blend operations require One blend factors");
                return None;
            }
        }
        Some(ColorBlend {
            blend: convert::blend_state(&desc),
            write_mask: wgpu::ColorWrites::from_bits_truncate(desc.write_mask.0 as u32),
            alpha_to_coverage: state.alpha_to_coverage,
        })
    }

    fn create_depth_stencil(
        &self,
        state: &DepthStencilState,
    ) -> Option<Option<wgpu::DepthStencilState>> {
        let Some(format) = self.depth_format else {
            if state.depth_enabled || state.stencil_enabled {
                log::warn!("depth/stencil testing without a depth attachment");
                return None;
            }
            return Some(None);
        };
        if state.stencil_enabled && !format.has_stencil_aspect() {
            log::warn!("stencil testing needs a stencil format, target is {format:?}");
            return None;
        }

        let (depth_write_enabled, depth_compare) = if state.depth_enabled {
            (
                state.depth_write == DepthWriteMask::All,
                convert::compare(state.depth_func),
            )
        } else {
            (false, wgpu::CompareFunction::Always)
        };

        let stencil = if state.stencil_enabled {
            wgpu::StencilState {
                front: convert::stencil_face(&state.front_face),
                back: convert::stencil_face(&state.back_face),
                read_mask: state.stencil_read_mask as u32,
                write_mask: state.stencil_write_mask as u32,
            }
        } else {
            wgpu::StencilState::default()
        };

        Some(Some(wgpu::DepthStencilState {
            format,
            depth_write_enabled,
            depth_compare,
            stencil,
            bias: wgpu::DepthBiasState::default(),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use volley_engine::pipeline::{BlendDesc, BlendFactor, FillMode};

    fn factory(depth: Option<wgpu::TextureFormat>) -> StateFactory {
        StateFactory {
            features: wgpu::Features::empty(),
            depth_format: depth,
            sample_count: 1,
        }
    }

    #[test]
    fn wireframe_needs_feature() {
        let mut r = RasterizerState::default();
        r.fill_mode = FillMode::Wireframe;
        assert!(factory(None).create_rasterizer(&r).is_none());

        let mut f = factory(None);
        f.features = wgpu::Features::POLYGON_MODE_LINE;
        assert_eq!(
            f.create_rasterizer(&r).unwrap().polygon_mode,
            wgpu::PolygonMode::Line
        );
    }

    #[test]
    fn depth_without_attachment_fails() {
        let f = factory(None);
        assert!(f.create_depth_stencil(&DepthStencilState::default()).is_none());

        let mut off = DepthStencilState::default();
        off.depth_enabled = false;
        assert_eq!(f.create_depth_stencil(&off), Some(None));
    }

    #[test]
    fn stencil_needs_stencil_aspect() {
        let mut ds = DepthStencilState::default();
        ds.stencil_enabled = true;
        assert!(factory(Some(wgpu::TextureFormat::Depth32Float)).create_depth_stencil(&ds).is_none());
        let built = factory(Some(wgpu::TextureFormat::Depth24PlusStencil8))
            .create_depth_stencil(&ds)
            .unwrap()
            .unwrap();
        assert_eq!(built.stencil.read_mask, 0xff);
    }

    #[test]
    fn min_blend_with_scaled_factors_fails() {
        let mut b = BlendState::default();
        b.target = BlendDesc {
            enabled: true,
            op: BlendOp::Min,
            ..BlendDesc::ALPHA
        };
        assert!(factory(None).create_blend(&b).is_none());

        b.target.src = BlendFactor::One;
        b.target.dst = BlendFactor::One;
        assert!(factory(None).create_blend(&b).is_some());
    }
}
