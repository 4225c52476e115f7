//! Contiguous storage primitives.
//!
//! [`DynamicArray`] keeps a small number of elements inline and only touches the
//! heap once that inline buffer is exhausted. Draw queues and resource tables
//! are built on it so that typical per-frame workloads allocate nothing.

mod allocator;
mod dynamic_array;

pub use allocator::{ArrayAllocator, DefaultAllocator};
pub use dynamic_array::DynamicArray;
