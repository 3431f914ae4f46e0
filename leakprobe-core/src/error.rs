use thiserror::Error;

/// Failures of a single ledger operation. Both are recoverable.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LedgerError {
    #[error(
        "allocating {requested_mb}MB would exceed the {ceiling_mb}MB limit ({allocated_mb}MB held)"
    )]
    LimitExceeded {
        requested_mb: u64,
        allocated_mb: u64,
        ceiling_mb: u64,
    },

    #[error("memory allocation of {size_mb}MB failed: {reason}")]
    AllocationFailure { size_mb: u64, reason: String },
}

/// Failures while reading process-level memory figures.
#[derive(Debug, Error)]
pub enum SampleError {
    #[error("cannot determine current pid: {0}")]
    Pid(String),

    #[error("process {0} not visible to the system sampler")]
    ProcessNotFound(u32),
}
