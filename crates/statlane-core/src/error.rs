use thiserror::Error;

/// Engine-level errors.
///
/// `BadRequest` covers everything the caller can fix (invalid dates,
/// illegal granularity, malformed non-array filter JSON, funnel step count
/// out of range). `Internal` wraps store/cache failures; the wrapped error
/// is logged at the call site and never shown to end users verbatim.
/// Empty-but-valid results (no events in range) are values, not errors.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

pub type EngineResult<T> = Result<T, EngineError>;
