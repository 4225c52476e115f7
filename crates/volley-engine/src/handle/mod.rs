//! Typed resource handles and ownership.
//!
//! Backend objects are never exposed directly. Callers hold a [`Handle<K>`], an
//! opaque `u64` tagged with a zero-sized kind marker. The value `0` is reserved
//! as the invalid sentinel; every API that accepts a handle treats an invalid
//! one as a silent no-op.
//!
//! [`Owned`] ties a handle to the component responsible for releasing it.
//! [`ResourceTable`] is the slot map backends use to resolve handles.

pub mod kind;
mod owned;
mod raw;
mod table;

pub use kind::{ResourceKind, ResourceKindId};
pub use owned::{Owned, Release};
pub use raw::{Handle, RawHandle};
pub use table::ResourceTable;

pub type VertexShaderHandle = Handle<kind::VertexShader>;
pub type PixelShaderHandle = Handle<kind::PixelShader>;
pub type SurfaceShaderHandle = Handle<kind::SurfaceShader>;
pub type VertexFormatHandle = Handle<kind::VertexFormat>;
pub type PipelineStateHandle = Handle<kind::PipelineState>;
pub type BufferHandle = Handle<kind::Buffer>;
pub type DrawQueueHandle = Handle<kind::DrawQueue>;
