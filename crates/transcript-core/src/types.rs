//! Data entities for the transcript accumulator: `Token`, `Snapshot`,
//! `TimedText`, and the outward-facing `DisplayEvent`.

use std::collections::VecDeque;

/// A single lexeme (word or punctuation) tracked while it is still a
/// candidate for the stable transcript. Created when a novel token
/// appears past the longest-common-prefix boundary of a partial; mutated
/// only by the pending buffer manager; destroyed on promotion,
/// replacement, or snapshot eviction.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub text: String,
    pub confirmation_count: u32,
    pub first_seen_time: f64,
    pub last_seen_time: f64,
}

impl Token {
    pub fn new(text: impl Into<String>, now: f64) -> Self {
        Self {
            text: text.into(),
            confirmation_count: 1,
            first_seen_time: now,
            last_seen_time: now,
        }
    }
}

/// An ordered sequence of `Token`s shelved at a segment break, awaiting a
/// late final. Created from the pending buffer; mutated only by the
/// reconciler (which may prefix-trim it when a late final claims tokens);
/// destroyed on TTL expiry or full consumption.
#[derive(Debug, Clone)]
pub struct Snapshot {
    pub tokens: VecDeque<Token>,
    pub started_ms: i64,
    pub expiry_ms: i64,
    pub segment_id: u64,
}

/// A timestamped partial's token list, kept only as auxiliary diagnostic
/// context; the reconciler does not require it for correctness (see
/// Open Questions in DESIGN.md).
#[derive(Debug, Clone)]
pub struct TimedText {
    pub ts_ms: i64,
    pub tokens: Vec<String>,
}

/// Outward-facing event handed to the transport/display layer after every
/// public operation.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct DisplayEvent {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub stable_text: String,
    pub partial_suffix: String,
    pub is_final: bool,
    pub segment_id: u64,
    pub metadata: DisplayMetadata,
}

#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct DisplayMetadata {
    pub pending_tokens: usize,
    pub awaiting_snapshots: usize,
    pub stable_word_count: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_token_starts_with_count_one_and_matching_timestamps() {
        let t = Token::new("hello", 1.5);
        assert_eq!(t.confirmation_count, 1);
        assert_eq!(t.first_seen_time, 1.5);
        assert_eq!(t.last_seen_time, 1.5);
    }

    #[test]
    fn display_event_serializes_type_field_as_display() {
        let ev = DisplayEvent {
            kind: "display",
            stable_text: "hi".to_string(),
            partial_suffix: String::new(),
            is_final: false,
            segment_id: 0,
            metadata: DisplayMetadata {
                pending_tokens: 0,
                awaiting_snapshots: 0,
                stable_word_count: 1,
            },
        };
        let json = serde_json::to_string(&ev).unwrap();
        assert!(json.contains("\"type\":\"display\""));
    }
}
