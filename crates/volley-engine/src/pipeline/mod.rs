//! Pipeline state description and compilation helpers.
//!
//! A pipeline state bundles rasterizer, blend and depth/stencil configuration
//! with a linked surface shader and a vertex format. It is described by a plain
//! [`PipelineStateDescriptor`] and compiled once by a backend into an immutable
//! object; changing any setting means creating a new pipeline state.

mod compile;
mod descriptor;
mod vertex;

pub use compile::{build_state_objects, validate_descriptor, PipelineError, StateObjectFactory, StateObjects};
pub use descriptor::{
    BlendDesc, BlendFactor, BlendOp, BlendState, ColorWriteMask, ComparisonFunc, CullMode,
    DepthStencilState, DepthWriteMask, FillMode, PipelineStateDescriptor, PrimitiveTopology,
    RasterizerState, StencilDesc, StencilOp, Winding, MAX_RENDER_TARGETS,
};
pub use vertex::{validate_vertex_layout, DataFormat, VertexAttribute, VertexElement, VertexLayout, VertexStep};
