//! wgpu backend for `volley-engine`.
//!
//! Renders headlessly into an offscreen color/depth target. Each pipeline
//! state owns a read-only storage buffer (bind group 0, binding 0) holding one
//! parameter block per recorded draw; shaders index it with
//! `@builtin(instance_index)`.

mod backend;
mod convert;
mod device;
mod encoder;
mod states;
mod target;

pub use backend::WgpuBackend;
pub use device::{Gpu, WgpuInit};
pub use target::OffscreenTarget;
