use core::fmt;

/// Why a submission could not be executed.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum SubmitError {
    /// The shared parameter store could not be (re)created.
    SharedBufferAllocation { bytes: u64 },
    /// Parameter bytes could not be written into the shared store.
    SharedBufferWrite { offset: u64, len: u64 },
    /// The queue's pipeline state handle does not resolve.
    UnknownPipelineState,
}

impl fmt::Display for SubmitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SubmitError::SharedBufferAllocation { bytes } => {
                write!(f, "failed to allocate {bytes} byte shared parameter buffer")
            }
            SubmitError::SharedBufferWrite { offset, len } => write!(
                f,
                "failed to write {len} parameter bytes at offset {offset}"
            ),
            SubmitError::UnknownPipelineState => f.write_str("pipeline state handle is not live"),
        }
    }
}

impl std::error::Error for SubmitError {}
