use thiserror::Error;

/// Per-record failure taxonomy for remote judge calls.
///
/// All variants are local failures: they are recorded as an absent outcome
/// and a failure-log entry, never aborting the batch. Recovery is a later
/// re-run of the stage, which resumes from its checkpoint. Structural
/// problems (unreadable input, missing credential, missing column) are not
/// represented here; they propagate as `anyhow::Error` and halt the
/// pipeline.
#[derive(Debug, Error)]
pub enum JudgeError {
    /// Network error, timeout or non-success status. Safe to resume later.
    #[error("transient: {0}")]
    Transient(String),

    /// The response lacked a parseable structured payload.
    #[error("malformed response: {0}")]
    Malformed(String),

    /// The response did not sufficiently echo the input it was asked about.
    /// Treated as a wrong answer, not a parse error.
    #[error("identity mismatch: {0}")]
    IdentityMismatch(String),
}
