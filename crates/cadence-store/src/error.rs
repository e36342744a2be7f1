//! Store error taxonomy

/// Failure surfaced by a remote store operation
///
/// The engine does not retry; transient and permanent failures travel the
/// same channel and the caller decides presentation.
#[derive(Debug, Clone, thiserror::Error)]
pub enum StoreError {
    /// The addressed document does not exist
    #[error("document not found: {0}")]
    NotFound(String),

    /// Connectivity or timeout failure; the operation may have been lost
    #[error("store unavailable: {reason}")]
    Unavailable {
        /// Underlying cause, as reported by the store client
        reason: String,
    },

    /// The store rejected the operation outright
    #[error("store rejected operation: {reason}")]
    Rejected {
        /// Underlying cause, as reported by the store client
        reason: String,
    },
}

impl StoreError {
    /// Not-found error for a document path
    #[inline]
    #[must_use]
    pub fn not_found(path: impl Into<String>) -> Self {
        Self::NotFound(path.into())
    }

    /// Connectivity failure
    #[inline]
    #[must_use]
    pub fn unavailable(reason: impl Into<String>) -> Self {
        Self::Unavailable { reason: reason.into() }
    }

    /// Whether retrying later could succeed
    #[inline]
    #[must_use]
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Unavailable { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transient_classification() {
        assert!(StoreError::unavailable("offline").is_transient());
        assert!(!StoreError::not_found("users/u1").is_transient());
        assert!(!StoreError::Rejected { reason: "denied".into() }.is_transient());
    }

    #[test]
    fn display_includes_reason() {
        let err = StoreError::unavailable("socket closed");
        assert!(err.to_string().contains("socket closed"));
    }
}
