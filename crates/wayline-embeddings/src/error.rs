//! Embedding storage errors.

use thiserror::Error;

/// Embedding storage error types.
#[derive(Debug, Error)]
pub enum EmbeddingError {
    /// Embedding not found.
    #[error("Embedding not found: {0}")]
    NotFound(String),

    /// Backend failure.
    #[error("Storage error: {0}")]
    Storage(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_display() {
        let err = EmbeddingError::NotFound("doc-1".to_string());
        assert!(err.to_string().contains("doc-1"));
    }
}
