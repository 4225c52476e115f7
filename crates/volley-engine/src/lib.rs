//! Volley engine crate.
//!
//! Backend-neutral core of the draw submission engine: resource handles,
//! pipeline state descriptions, draw queues and the batching algorithm that
//! turns a queue into instanced GPU work. Graphics APIs plug in through
//! [`backend::Backend`].

pub mod backend;
pub mod batch;
pub mod container;
pub mod context;
pub mod diagnostics;
pub mod handle;
pub mod logging;
pub mod pipeline;
pub mod queue;

pub use backend::{Backend, BufferDescriptor, BufferKind, SubmitError};
pub use batch::{BatchOptions, BatchPolicy, BatchReport, HomogeneityCheck};
pub use context::Context;
pub use queue::DrawQueue;
