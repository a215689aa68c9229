//! Structured error types for NEFF computation.

use thiserror::Error;

/// Unified error type for all neffy operations.
///
/// The computation core is pure, so every variant describes a permanent
/// failure for the given input. Messages name the offending value and the
/// constraint it broke.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NeffError {
    /// Malformed alignment (unequal lengths, disallowed symbols, empty input)
    #[error("format error: {0}")]
    Format(String),

    /// Position window outside the alignment after clamping
    #[error("range error: {0}")]
    Range(String),

    /// Invalid option value (threshold, gap cutoff, stoichiometry, masking)
    #[error("validation error: {0}")]
    Validation(String),

    /// Internal invariant violated during computation
    #[error("computation error: {0}")]
    Computation(String),
}

/// Convenience alias used throughout neffy.
pub type Result<T> = std::result::Result<T, NeffError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_prefixes_kind() {
        let err = NeffError::Validation("threshold 1.5 not in (0, 1)".into());
        assert_eq!(err.to_string(), "validation error: threshold 1.5 not in (0, 1)");
        let err = NeffError::Range("pos_start 0 < 1".into());
        assert!(err.to_string().starts_with("range error"));
    }
}
