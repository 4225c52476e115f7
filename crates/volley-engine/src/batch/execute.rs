use core::ops::Range;

use crate::backend::SubmitError;
use crate::queue::DrawCall;

use super::{BatchOptions, BatchPath, BatchPolicy, BatchReport, HomogeneityCheck, SharedParameterStore};

/// Command sink a backend exposes to the batching algorithm.
///
/// The pipeline state is bound by the backend before [`execute`] runs.
pub trait BatchEncoder {
    type SharedBuffer;

    /// Creates a shared parameter buffer of `bytes` bytes holding elements of
    /// `stride` bytes.
    fn allocate_shared_buffer(
        &mut self,
        bytes: u64,
        stride: u32,
    ) -> Result<Self::SharedBuffer, SubmitError>;

    fn write_shared_buffer(
        &mut self,
        buffer: &Self::SharedBuffer,
        offset: u64,
        data: &[u8],
    ) -> Result<(), SubmitError>;

    fn bind_shared_buffer(&mut self, buffer: &Self::SharedBuffer);

    /// Binds topology and vertex/index buffers of `call`.
    fn bind_geometry(&mut self, call: &DrawCall);

    /// Draws `call`'s geometry for the given instance range.
    fn draw(&mut self, call: &DrawCall, instances: Range<u32>);
}

/// Index of the first call whose geometry differs from call 0.
pub fn first_divergent_call(calls: &[DrawCall]) -> Option<usize> {
    let (first, rest) = calls.split_first()?;
    let geometry = first.geometry();
    rest.iter()
        .position(|c| c.geometry() != geometry)
        .map(|i| i + 1)
}

/// Index of the first call that binds a different draw kind, topology, vertex
/// buffer or index buffer than call 0. Ranges (`count`, `start_*`) are ignored.
pub fn first_rebinding_call(calls: &[DrawCall]) -> Option<usize> {
    let (first, rest) = calls.split_first()?;
    let geometry = first.geometry();
    rest.iter()
        .position(|c| !c.geometry().shares_bindings(&geometry))
        .map(|i| i + 1)
}

/// Submits `calls` through `encoder`.
///
/// `stride` is the pipeline's parameter stride (1..=256). Both paths size the
/// store for `stride * calls.len()` bytes and place call `i`'s parameters at
/// `i * stride`.
pub fn execute<E: BatchEncoder + ?Sized>(
    encoder: &mut E,
    store: &mut SharedParameterStore<E::SharedBuffer>,
    stride: u32,
    calls: &[DrawCall],
    options: &BatchOptions,
) -> Result<BatchReport, SubmitError> {
    if calls.is_empty() {
        return Ok(BatchReport::empty(store.capacity()));
    }

    let count = calls.len() as u32;
    let (path, violation) = choose_path(calls, options);

    let required = stride as u64 * count as u64;
    let reallocated = store.reserve(required, |bytes| {
        encoder.allocate_shared_buffer(bytes, stride)
    })?;

    let draws_issued = match path {
        BatchPath::Instanced => {
            let Some((buffer, packed)) = store.pack(calls, stride as usize) else {
                return Err(SubmitError::SharedBufferAllocation { bytes: required });
            };
            encoder.write_shared_buffer(buffer, 0, packed)?;
            encoder.bind_shared_buffer(buffer);

            let first = &calls[0];
            encoder.bind_geometry(first);
            encoder.draw(first, 0..count);
            1
        }
        _ => {
            let Some(buffer) = store.buffer() else {
                return Err(SubmitError::SharedBufferAllocation { bytes: required });
            };
            encoder.bind_shared_buffer(buffer);
            for (i, call) in calls.iter().enumerate() {
                let i = i as u32;
                encoder.write_shared_buffer(
                    buffer,
                    i as u64 * stride as u64,
                    call.parameter_bytes(stride as usize),
                )?;
                encoder.bind_geometry(call);
                encoder.draw(call, i..i + 1);
            }
            count
        }
    };

    let report = BatchReport {
        path,
        draws_issued,
        instances: count,
        reallocated,
        shared_capacity: store.capacity(),
        precondition_violation: violation,
    };
    log::trace!("batch submitted: {report:?}");
    Ok(report)
}

fn choose_path(calls: &[DrawCall], options: &BatchOptions) -> (BatchPath, Option<usize>) {
    match options.policy {
        BatchPolicy::PerDraw => (BatchPath::PerDraw, None),
        BatchPolicy::Auto => match first_divergent_call(calls) {
            Some(i) => {
                log::debug!("call {i} has its own geometry; drawing per call");
                (BatchPath::PerDraw, Some(i))
            }
            None => (BatchPath::Instanced, None),
        },
        BatchPolicy::Instanced => {
            let violation = match options.check {
                HomogeneityCheck::Off => None,
                HomogeneityCheck::Warn => {
                    let found = first_rebinding_call(calls);
                    if let Some(i) = found {
                        log::warn!(
                            "instanced batch of {} calls: call {i} geometry differs from call 0 and will be drawn with call 0's geometry",
                            calls.len()
                        );
                    }
                    found
                }
                HomogeneityCheck::Assert => {
                    let found = first_rebinding_call(calls);
                    assert!(
                        found.is_none(),
                        "instanced batch: call {} geometry differs from call 0",
                        found.unwrap_or_default()
                    );
                    None
                }
            };
            (BatchPath::Instanced, violation)
        }
    }
}
