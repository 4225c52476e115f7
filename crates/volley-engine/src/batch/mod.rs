//! Turning a recorded queue into GPU work.
//!
//! The fast path packs every call's parameter block into one shared buffer
//! and issues a single instanced draw using the geometry of the first call;
//! the shader picks its parameters with the instance index. The fallback
//! issues one draw per call with a one-instance range pointing at that call's
//! slot, so both paths use the same shader.

mod execute;
mod options;
mod store;

pub use execute::{execute, first_divergent_call, first_rebinding_call, BatchEncoder};
pub use options::{BatchOptions, BatchPath, BatchPolicy, BatchReport, HomogeneityCheck};
pub use store::SharedParameterStore;
