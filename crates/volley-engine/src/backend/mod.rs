//! The contract between the engine core and a graphics API.
//!
//! A [`Backend`] owns every native object behind the handles it hands out and
//! executes recorded batches through [`crate::batch::execute`]. Creation never
//! fails loudly: a failure yields the invalid handle and a log record.

mod error;
mod recording;

pub use crate::batch::BatchEncoder;
pub use error::SubmitError;
pub use recording::{Command, FailPoint, RecordingBackend};

use crate::batch::{BatchOptions, BatchReport};
use crate::diagnostics::Report;
use crate::handle::{
    BufferHandle, PipelineStateHandle, PixelShaderHandle, Release, SurfaceShaderHandle,
    VertexFormatHandle, VertexShaderHandle,
};
use crate::pipeline::{PipelineStateDescriptor, VertexElement};
use crate::queue::DrawCall;

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum BufferKind {
    Vertex,
    Index,
    /// Caller-managed parameter data, not the shared per-draw store.
    Parameter,
}

/// Description of a buffer to create.
///
/// Immutable buffers need `data`. Dynamic buffers may start empty and are
/// filled with [`Backend::update_buffer`]. The buffer is
/// `max(size, data.len())` bytes long.
#[derive(Debug, Copy, Clone)]
pub struct BufferDescriptor<'a> {
    pub kind: BufferKind,
    pub data: Option<&'a [u8]>,
    pub size: u64,
    pub dynamic: bool,
}

impl<'a> BufferDescriptor<'a> {
    pub fn immutable(kind: BufferKind, data: &'a [u8]) -> Self {
        Self {
            kind,
            data: Some(data),
            size: data.len() as u64,
            dynamic: false,
        }
    }

    pub fn dynamic(kind: BufferKind, size: u64) -> Self {
        Self {
            kind,
            data: None,
            size,
            dynamic: true,
        }
    }

    /// Final size in bytes, or `None` when the description is unusable.
    pub fn resolved_size(&self) -> Option<u64> {
        let data_len = self.data.map_or(0, |d| d.len() as u64);
        if !self.dynamic && self.data.is_none() {
            return None;
        }
        let size = self.size.max(data_len);
        (size > 0).then_some(size)
    }
}

/// Backend submission contract.
///
/// All methods take `&self`; backends keep their tables behind interior
/// mutability and are not `Sync`.
pub trait Backend: Release {
    fn create_vertex_shader(&self, source: &[u8], report: Report<'_>) -> VertexShaderHandle;

    fn create_pixel_shader(&self, source: &[u8], report: Report<'_>) -> PixelShaderHandle;

    /// Pairs a vertex and a pixel shader into one program.
    fn link_surface_shader(
        &self,
        vs: VertexShaderHandle,
        ps: PixelShaderHandle,
    ) -> SurfaceShaderHandle;

    /// Validates `elements` (warnings go to `report`) and creates the format.
    fn create_vertex_format(
        &self,
        elements: &[VertexElement<'_>],
        vs: VertexShaderHandle,
        report: Report<'_>,
    ) -> VertexFormatHandle;

    fn create_pipeline_state(&self, desc: &PipelineStateDescriptor) -> PipelineStateHandle;

    fn create_buffer(&self, desc: &BufferDescriptor<'_>) -> BufferHandle;

    /// Overwrites part of a dynamic buffer. Invalid handles are ignored.
    fn update_buffer(&self, buffer: BufferHandle, offset: u64, data: &[u8]);

    /// Binds `state` and submits `calls`.
    fn process_batch(
        &self,
        state: PipelineStateHandle,
        calls: &[DrawCall],
        options: &BatchOptions,
    ) -> Result<BatchReport, SubmitError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn buffer_sizes() {
        let data = [0u8; 12];
        assert_eq!(BufferDescriptor::immutable(BufferKind::Vertex, &data).resolved_size(), Some(12));
        assert_eq!(BufferDescriptor::dynamic(BufferKind::Parameter, 64).resolved_size(), Some(64));
        assert_eq!(BufferDescriptor::dynamic(BufferKind::Index, 0).resolved_size(), None);

        let missing = BufferDescriptor {
            kind: BufferKind::Vertex,
            data: None,
            size: 16,
            dynamic: false,
        };
        assert_eq!(missing.resolved_size(), None);

        let padded = BufferDescriptor {
            size: 32,
            ..BufferDescriptor::immutable(BufferKind::Vertex, &data)
        };
        assert_eq!(padded.resolved_size(), Some(32));
    }
}
