//! Accumulator configuration, validated at construction time.
//!
//! Loading these values from environment variables or a config file is an
//! adapter concern; this struct only defines the shape and validates it,
//! following the same shape-plus-`validate()` pattern used elsewhere in
//! this workspace for backend configuration.

use transcript_foundation::error::ConfigError;

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct TranscriptAccumulatorConfig {
    /// K: partials required to promote a pending token by stability.
    pub stability_threshold: u32,
    /// T: age in milliseconds past which a pending token is force-promoted.
    pub forced_flush_ms: u64,
    /// Segment length in seconds that triggers a forced segment break.
    pub max_segment_s: f64,
    /// Snapshot grace window in milliseconds.
    pub awaiting_final_ttl_ms: u64,
    /// Retention window for the diagnostic partial-history ring, in seconds.
    pub partial_history_window_s: f64,
    /// Enable the deduplication filter.
    pub deduplication_enabled: bool,
    /// Minimum number of recent stable words scanned for duplicates.
    pub deduplication_window_size: usize,
}

impl Default for TranscriptAccumulatorConfig {
    fn default() -> Self {
        Self {
            stability_threshold: 2,
            forced_flush_ms: 1400,
            max_segment_s: 12.0,
            awaiting_final_ttl_ms: 5000,
            partial_history_window_s: 30.0,
            deduplication_enabled: true,
            deduplication_window_size: 30,
        }
    }
}

impl TranscriptAccumulatorConfig {
    /// Reject configurations that could never make progress.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.stability_threshold == 0 {
            return Err(ConfigError::Validation {
                field: "stability_threshold".to_string(),
                reason: "must be >= 1".to_string(),
            });
        }
        if self.max_segment_s <= 0.0 {
            return Err(ConfigError::Validation {
                field: "max_segment_s".to_string(),
                reason: "must be positive".to_string(),
            });
        }
        if self.partial_history_window_s < 0.0 {
            return Err(ConfigError::Validation {
                field: "partial_history_window_s".to_string(),
                reason: "must be non-negative".to_string(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        assert!(TranscriptAccumulatorConfig::default().validate().is_ok());
    }

    #[test]
    fn zero_stability_threshold_is_rejected() {
        let mut cfg = TranscriptAccumulatorConfig::default();
        cfg.stability_threshold = 0;
        let err = cfg.validate().unwrap_err();
        assert!(matches!(err, ConfigError::Validation { field, .. } if field == "stability_threshold"));
    }

    #[test]
    fn non_positive_max_segment_is_rejected() {
        let mut cfg = TranscriptAccumulatorConfig::default();
        cfg.max_segment_s = 0.0;
        assert!(cfg.validate().is_err());
    }
}
