use thiserror::Error;

/// Top-level error composing every fallible concern in the accumulator's
/// ambient stack. The reconciliation state machine itself is total
/// (`transcript_core::Accumulator`'s public operations never return
/// `Result`); this enum only covers construction-time validation.
#[derive(Error, Debug)]
pub enum AccumulatorError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Fatal error, cannot recover: {0}")]
    Fatal(String),
}

/// Errors raised while validating a `TranscriptAccumulatorConfig`.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Validation failed: {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("Missing required field: {0}")]
    MissingField(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_error_composes_into_accumulator_error() {
        let err: AccumulatorError = ConfigError::Validation {
            field: "stability_threshold".to_string(),
            reason: "must be >= 1".to_string(),
        }
        .into();
        assert!(matches!(err, AccumulatorError::Config(_)));
        assert!(err.to_string().contains("stability_threshold"));
    }
}
