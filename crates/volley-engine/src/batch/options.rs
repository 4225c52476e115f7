/// How `submit` chooses between the instanced path and per-draw fallback.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Default)]
pub enum BatchPolicy {
    /// Always one instanced draw. Calls are assumed to share geometry.
    #[default]
    Instanced,
    /// Instanced when every call shares call 0's geometry, else per-draw.
    Auto,
    /// Always one draw per call.
    PerDraw,
}

/// Validation of the shared-geometry assumption under [`BatchPolicy::Instanced`].
///
/// The check compares draw kind, topology and the vertex and index buffers
/// with call 0. Differing counts and start offsets pass: the instanced draw
/// uses call 0's range by contract.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum HomogeneityCheck {
    Off,
    /// Log and record the first offending call; still draw instanced.
    Warn,
    /// Panic on the first offending call.
    Assert,
}

impl Default for HomogeneityCheck {
    fn default() -> Self {
        if cfg!(debug_assertions) {
            HomogeneityCheck::Warn
        } else {
            HomogeneityCheck::Off
        }
    }
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Default)]
pub struct BatchOptions {
    pub policy: BatchPolicy,
    pub check: HomogeneityCheck,
}

impl BatchOptions {
    pub fn with_policy(policy: BatchPolicy) -> Self {
        Self {
            policy,
            ..Self::default()
        }
    }
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum BatchPath {
    /// Nothing was recorded.
    Empty,
    Instanced,
    PerDraw,
}

/// What one submission did.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct BatchReport {
    pub path: BatchPath,
    /// Draw commands issued to the encoder.
    pub draws_issued: u32,
    /// Total instances across those draws; equals the recorded call count.
    pub instances: u32,
    /// The shared store had to grow for this submission.
    pub reallocated: bool,
    /// Capacity of the shared store afterwards, in bytes.
    pub shared_capacity: u64,
    /// First call that breaks the geometry precondition of the chosen policy,
    /// when checked.
    pub precondition_violation: Option<usize>,
}

impl BatchReport {
    pub fn empty(shared_capacity: u64) -> Self {
        Self {
            path: BatchPath::Empty,
            draws_issued: 0,
            instances: 0,
            reallocated: false,
            shared_capacity,
            precondition_violation: None,
        }
    }
}
