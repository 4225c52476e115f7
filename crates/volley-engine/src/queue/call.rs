use core::fmt;

use crate::handle::BufferHandle;
use crate::pipeline::PrimitiveTopology;

use super::{MAX_PARAMETER_BYTES, MAX_PARAMETER_SLOTS};

/// Fixed-size per-draw parameter bytes.
#[derive(Copy, Clone, PartialEq, Eq)]
#[repr(transparent)]
pub struct ParameterBlock(pub [u8; MAX_PARAMETER_BYTES]);

impl ParameterBlock {
    pub const ZERO: Self = Self([0; MAX_PARAMETER_BYTES]);

    /// Copies `bytes` to the start of the block and returns how many were
    /// copied.
    pub fn write(&mut self, bytes: &[u8]) -> usize {
        let n = bytes.len().min(MAX_PARAMETER_BYTES);
        self.0[..n].copy_from_slice(&bytes[..n]);
        n
    }

    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl Default for ParameterBlock {
    fn default() -> Self {
        Self::ZERO
    }
}

impl fmt::Debug for ParameterBlock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Trailing zeros are noise in test failures.
        let end = self.0.iter().rposition(|&b| b != 0).map_or(0, |i| i + 1);
        write!(f, "ParameterBlock({:02x?}", &self.0[..end])?;
        if end < MAX_PARAMETER_BYTES {
            write!(f, " +{} zero", MAX_PARAMETER_BYTES - end)?;
        }
        f.write_str(")")
    }
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum DrawKind {
    Draw,
    DrawIndexed,
}

/// Everything that decides which vertices a call rasterizes.
///
/// [`BatchPolicy::Auto`](crate::batch::BatchPolicy::Auto) instances a batch
/// only when every call's geometry is equal.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct Geometry {
    pub kind: DrawKind,
    pub topology: PrimitiveTopology,
    pub vertex_buffer: BufferHandle,
    pub index_buffer: BufferHandle,
    pub count: u32,
    pub start_index: u32,
    pub start_vertex: u32,
}

/// One recorded draw.
#[derive(Copy, Clone, PartialEq, Eq)]
pub struct DrawCall {
    pub kind: DrawKind,
    pub topology: PrimitiveTopology,
    pub vertex_buffer: BufferHandle,
    pub index_buffer: BufferHandle,
    /// Vertex count for `Draw`, index count for `DrawIndexed`.
    pub count: u32,
    pub start_index: u32,
    pub start_vertex: u32,
    /// Bit `i` set when constant slot `i` was written before this call.
    pub used_slots: u8,
    pub parameters: ParameterBlock,
}

impl Geometry {
    /// Same draw kind, topology and buffers; ranges may differ.
    pub fn shares_bindings(&self, other: &Geometry) -> bool {
        self.kind == other.kind
            && self.topology == other.topology
            && self.vertex_buffer == other.vertex_buffer
            && self.index_buffer == other.index_buffer
    }
}

impl DrawCall {
    pub fn geometry(&self) -> Geometry {
        Geometry {
            kind: self.kind,
            topology: self.topology,
            vertex_buffer: self.vertex_buffer,
            index_buffer: self.index_buffer,
            count: self.count,
            start_index: self.start_index,
            start_vertex: self.start_vertex,
        }
    }

    #[inline]
    pub fn is_slot_used(&self, slot: usize) -> bool {
        slot < MAX_PARAMETER_SLOTS && self.used_slots & (1 << slot) != 0
    }

    /// The first `stride` parameter bytes, which is what reaches the GPU.
    #[inline]
    pub fn parameter_bytes(&self, stride: usize) -> &[u8] {
        &self.parameters.0[..stride.min(MAX_PARAMETER_BYTES)]
    }
}

impl fmt::Debug for DrawCall {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DrawCall")
            .field("kind", &self.kind)
            .field("topology", &self.topology)
            .field("vertex_buffer", &self.vertex_buffer)
            .field("index_buffer", &self.index_buffer)
            .field("count", &self.count)
            .field("start_index", &self.start_index)
            .field("start_vertex", &self.start_vertex)
            .field("used_slots", &format_args!("{:#010b}", self.used_slots))
            .field("parameters", &self.parameters)
            .finish()
    }
}
