//! Draw recording.
//!
//! A [`DrawQueue`] collects draw calls against one pipeline state. Each call
//! is a full snapshot of the queue's cursor (topology, buffers, parameter
//! bytes) taken when `draw`/`draw_indexed` runs; mutating the cursor later
//! never affects recorded calls.

mod call;
mod draw_queue;

pub use call::{DrawCall, DrawKind, Geometry, ParameterBlock};
pub use draw_queue::DrawQueue;

/// Size of one call's parameter block in bytes.
pub const MAX_PARAMETER_BYTES: usize = 256;

/// Number of constant slots a call can mark as used.
pub const MAX_PARAMETER_SLOTS: usize = 8;
