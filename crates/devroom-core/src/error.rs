//! Session-level errors
//!
//! Only failures that prevent a session from existing surface as errors;
//! everything that happens inside a live session — malformed AI output,
//! failed persistence writes, sandbox pipeline aborts, bad broadcasts —
//! is recovered at the boundary where it is detected and must never
//! terminate the client or server process.

use crate::store::StoreError;

/// Failure to establish a session
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// The authoritative project state could not be fetched
    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

impl SessionError {
    /// Whether retrying the open might succeed
    #[inline]
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Store(StoreError::Transport(_)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ProjectId;

    #[test]
    fn transport_failures_are_retryable() {
        let err = SessionError::from(StoreError::Transport("timeout".to_owned()));
        assert!(err.is_retryable());

        let err = SessionError::from(StoreError::ProjectNotFound(ProjectId::new("p")));
        assert!(!err.is_retryable());
    }
}
