//! Shared error taxonomy for the reconnaissance core.
//!
//! Every kind here corresponds directly to one of the error kinds the core
//! is specified to surface: lookups that miss, invalid input, recoverable
//! storage contention, state conflicts, failing external tools, and network
//! I/O failures during discovery. None of these are exceptional in the
//! panic sense — callers match on them as ordinary control-flow values.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    /// A repository lookup missed. Normal control flow, not a failure.
    #[error("not found: {0}")]
    NotFound(String),

    /// Invalid CIDR/IP/ID or another input that failed validation.
    #[error("validation error: {0}")]
    Validation(String),

    /// Recoverable storage contention (e.g. SQLite `SQLITE_BUSY`).
    #[error("store busy: {0}")]
    Busy(String),

    /// A state conflict, e.g. deleting a network still referenced by a
    /// device, or starting a scan while one is already running.
    #[error("conflict: {0}")]
    Conflict(String),

    /// An external subprocess (port scanner, OS detector, screenshot tool)
    /// failed. Never fatal; the caller skips enrichment for this cycle.
    #[error("external tool failed: {0}")]
    ExternalTool(String),

    /// Network I/O failure during discovery or probing. Swallowed at the
    /// call site in most cases; surfaced here for callers that need to
    /// distinguish "not live" from an honest transport error.
    #[error("network io error: {0}")]
    NetworkIo(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, CoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_display() {
        let e = CoreError::NotFound("device 123".into());
        assert_eq!(e.to_string(), "not found: device 123");
    }

    #[test]
    fn test_io_from_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::Other, "disk full");
        let e: CoreError = io_err.into();
        assert!(matches!(e, CoreError::Io(_)));
    }
}
