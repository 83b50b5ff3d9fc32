//! Streaming transcript accumulator.
//!
//! Reconciles a stream of partial (replace-all) and final (per-utterance)
//! ASR hypotheses into a single, append-only stable transcript, using
//! K-confirmation/T-timeout promotion and cross-segment snapshot buffering
//! to survive segment breaks without losing evidence from late finals.

pub mod accumulator;
pub mod config;
pub mod dedup;
pub mod tokenizer;
pub mod types;

pub use accumulator::Accumulator;
pub use config::TranscriptAccumulatorConfig;
pub use types::{DisplayEvent, DisplayMetadata, Snapshot, Token, TimedText};

pub use transcript_foundation::error::{AccumulatorError, ConfigError};
