use core::fmt;

use crate::queue::MAX_PARAMETER_BYTES;

use super::{BlendState, DepthStencilState, PipelineStateDescriptor, RasterizerState};

/// Why a pipeline state could not be created.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum PipelineError {
    InvalidShader,
    InvalidVertexFormat,
    InvalidParameterStride(u32),
    Rasterizer,
    Blend,
    DepthStencil,
}

impl fmt::Display for PipelineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PipelineError::InvalidShader => f.write_str("surface shader handle is invalid"),
            PipelineError::InvalidVertexFormat => f.write_str("vertex format handle is invalid"),
            PipelineError::InvalidParameterStride(stride) => write!(
                f,
                "parameter stride {stride} is outside 1..={MAX_PARAMETER_BYTES}"
            ),
            PipelineError::Rasterizer => f.write_str("rasterizer state creation failed"),
            PipelineError::Blend => f.write_str("blend state creation failed"),
            PipelineError::DepthStencil => f.write_str("depth/stencil state creation failed"),
        }
    }
}

impl std::error::Error for PipelineError {}

/// Checks descriptor fields that do not depend on any backend.
pub fn validate_descriptor(desc: &PipelineStateDescriptor) -> Result<(), PipelineError> {
    if !desc.shader.is_valid() {
        return Err(PipelineError::InvalidShader);
    }
    if !desc.vertex_format.is_valid() {
        return Err(PipelineError::InvalidVertexFormat);
    }
    if desc.parameter_stride == 0 || desc.parameter_stride as usize > MAX_PARAMETER_BYTES {
        return Err(PipelineError::InvalidParameterStride(desc.parameter_stride));
    }
    Ok(())
}

/// Backend hook that turns fixed-function descriptions into native objects.
///
/// Returned objects should release their native counterpart on drop.
pub trait StateObjectFactory {
    type Rasterizer;
    type Blend;
    type DepthStencil;

    fn create_rasterizer(&self, state: &RasterizerState) -> Option<Self::Rasterizer>;
    fn create_blend(&self, state: &BlendState) -> Option<Self::Blend>;
    fn create_depth_stencil(&self, state: &DepthStencilState) -> Option<Self::DepthStencil>;
}

/// The fixed-function sub-objects of one pipeline state.
pub struct StateObjects<F: StateObjectFactory + ?Sized> {
    pub rasterizer: F::Rasterizer,
    pub blend: F::Blend,
    pub depth_stencil: F::DepthStencil,
    pub stencil_ref: u32,
}

/// Builds all sub-objects for `desc`, or none of them.
///
/// Sub-objects are created in rasterizer, blend, depth/stencil order. When a
/// step fails, everything built so far is dropped before returning, so a
/// failed call leaves no native state behind.
pub fn build_state_objects<F: StateObjectFactory + ?Sized>(
    factory: &F,
    desc: &PipelineStateDescriptor,
) -> Result<StateObjects<F>, PipelineError> {
    validate_descriptor(desc)?;

    let rasterizer = factory
        .create_rasterizer(&desc.rasterizer)
        .ok_or(PipelineError::Rasterizer)?;
    let blend = factory
        .create_blend(&desc.blend)
        .ok_or(PipelineError::Blend)?;
    let depth_stencil = factory
        .create_depth_stencil(&desc.depth_stencil)
        .ok_or(PipelineError::DepthStencil)?;

    Ok(StateObjects {
        rasterizer,
        blend,
        depth_stencil,
        stencil_ref: desc.depth_stencil.stencil_ref,
    })
}
