//! The reconciliation state machine: pending-buffer alignment, K/T
//! promotion, cross-segment snapshot buffering with TTL, late-final
//! orphan rescue, and deduplication.

use std::collections::VecDeque;

use tracing::{debug, info};
use transcript_foundation::clock::SharedClock;
use transcript_foundation::error::AccumulatorError;
use transcript_telemetry::AccumulatorMetrics;

use crate::config::TranscriptAccumulatorConfig;
use crate::dedup::deduplicate_before_commit;
use crate::tokenizer::{detokenize, lcp_len, tokenize};
use crate::types::{DisplayEvent, DisplayMetadata, Snapshot, Token, TimedText};

/// How far back into `stable` the reconciler looks when building context
/// for a final.
const MAX_TAIL: usize = 64;

/// Server-side, single-threaded transcript accumulator. Owns the pending
/// buffer, stable transcript, snapshot queue, and partial history ring,
/// plus the injected clock and shared metrics handle.
pub struct Accumulator {
    config: TranscriptAccumulatorConfig,
    clock: SharedClock,
    metrics: AccumulatorMetrics,

    stable: Vec<String>,
    pending: VecDeque<Token>,
    awaiting_final: VecDeque<Snapshot>,
    partial_history: VecDeque<TimedText>,

    segment_id: u64,
    segment_started_ms: Option<i64>,

    /// Guards against clock regression: `now` is always clamped to be
    /// >= the last observed `now`.
    last_now_ms: i64,
}

impl Accumulator {
    /// Validates `config` and constructs a fresh accumulator. Construction
    /// is the only fallible operation this crate exposes; once built, every
    /// public method is total.
    pub fn new(
        config: TranscriptAccumulatorConfig,
        clock: SharedClock,
    ) -> Result<Self, AccumulatorError> {
        config.validate()?;
        info!(
            target: "transcript",
            "accumulator initialized: K={} T={}ms max_segment={}s TTL={}ms dedup={}",
            config.stability_threshold,
            config.forced_flush_ms,
            config.max_segment_s,
            config.awaiting_final_ttl_ms,
            config.deduplication_enabled,
        );
        Ok(Self {
            config,
            clock,
            metrics: AccumulatorMetrics::new(),
            stable: Vec::new(),
            pending: VecDeque::new(),
            awaiting_final: VecDeque::new(),
            partial_history: VecDeque::new(),
            segment_id: 0,
            segment_started_ms: None,
            last_now_ms: i64::MIN,
        })
    }

    /// The authoritative transcript, detokenized.
    pub fn stable_text(&self) -> String {
        detokenize(&self.stable)
    }

    /// Convenience alias kept for parity with the reference implementation.
    pub fn get_final_transcript(&self) -> String {
        self.stable_text()
    }

    pub fn get_metrics(&self) -> transcript_telemetry::AccumulatorMetricsSnapshot {
        self.metrics.snapshot()
    }

    pub fn segment_id(&self) -> u64 {
        self.segment_id
    }

    // ---------- time helpers ----------

    fn now_ms(&mut self, override_ms: Option<i64>) -> i64 {
        let raw = override_ms.unwrap_or_else(|| (self.clock.now_s() * 1000.0) as i64);
        let clamped = raw.max(self.last_now_ms);
        self.last_now_ms = clamped;
        clamped
    }

    fn ensure_segment_started(&mut self, now_ms: i64) {
        if self.segment_started_ms.is_none() {
            self.segment_started_ms = Some(now_ms);
        }
    }

    // ---------- display ----------

    pub fn build_display_event(&self, is_final: bool) -> DisplayEvent {
        let partial_suffix = detokenize(
            &self
                .pending
                .iter()
                .map(|t| t.text.clone())
                .collect::<Vec<_>>(),
        );
        DisplayEvent {
            kind: "display",
            stable_text: self.stable_text(),
            partial_suffix,
            is_final,
            segment_id: self.segment_id,
            metadata: DisplayMetadata {
                pending_tokens: self.pending.len(),
                awaiting_snapshots: self.awaiting_final.len(),
                stable_word_count: self.stable.len(),
            },
        }
    }

    // ---------- partial history ----------

    fn record_partial_history(&mut self, tokens: &[String], now_ms: i64) {
        self.partial_history.push_back(TimedText {
            ts_ms: now_ms,
            tokens: tokens.to_vec(),
        });
        let cutoff = now_ms - (self.config.partial_history_window_s * 1000.0) as i64;
        while matches!(self.partial_history.front(), Some(t) if t.ts_ms < cutoff) {
            self.partial_history.pop_front();
        }
    }

    // ---------- promotion engine ----------

    fn promote_leftmost_ready(&mut self, now_ms: i64) -> usize {
        let now_s = now_ms as f64 / 1000.0;
        let mut batch = Vec::new();
        let mut by_stability = 0u64;
        let mut by_flush = 0u64;

        while let Some(tok) = self.pending.front() {
            let age_ms = ((now_s - tok.first_seen_time) * 1000.0).max(0.0) as u64;
            if tok.confirmation_count >= self.config.stability_threshold {
                let tok = self.pending.pop_front().unwrap();
                debug!(target: "transcript", "promoting '{}' by K-confirmation (count={})", tok.text, tok.confirmation_count);
                batch.push(tok.text);
                by_stability += 1;
            } else if age_ms >= self.config.forced_flush_ms {
                let tok = self.pending.pop_front().unwrap();
                debug!(target: "transcript", "promoting '{}' by T-timeout (age={}ms)", tok.text, age_ms);
                batch.push(tok.text);
                by_flush += 1;
            } else {
                break;
            }
        }

        if batch.is_empty() {
            return 0;
        }

        let survivors = self.commit(batch);
        self.metrics.add_committed_by_stability(by_stability);
        self.metrics.add_committed_by_flush(by_flush);
        survivors
    }

    /// Run `candidate` through the deduplicator and append survivors to
    /// `stable`. Returns the number actually appended.
    fn commit(&mut self, candidate: Vec<String>) -> usize {
        let survivors = deduplicate_before_commit(
            &self.stable,
            &candidate,
            self.config.deduplication_enabled,
            self.config.deduplication_window_size,
            &self.metrics,
        );
        let n = survivors.len();
        self.stable.extend(survivors);
        n
    }

    // ---------- snapshot store ----------

    fn snapshot_pending(&mut self, now_ms: i64) {
        if self.pending.is_empty() {
            return;
        }
        let tokens: VecDeque<Token> = self.pending.drain(..).collect();
        let count = tokens.len();
        self.awaiting_final.push_back(Snapshot {
            tokens,
            started_ms: now_ms,
            expiry_ms: now_ms + self.config.awaiting_final_ttl_ms as i64,
            segment_id: self.segment_id,
        });
        info!(
            target: "transcript",
            "snapshotted {} pending tokens for late-final reconciliation (seg {})",
            count, self.segment_id
        );
    }

    fn expire_snapshots(&mut self, now_ms: i64) {
        while matches!(self.awaiting_final.front(), Some(s) if s.expiry_ms <= now_ms) {
            let snap = self.awaiting_final.pop_front().unwrap();
            let texts: Vec<String> = snap.tokens.iter().map(|t| t.text.clone()).collect();
            let committed = self.commit(texts);
            self.metrics.add_snapshot_expired_commits(committed as u64);
            info!(
                target: "transcript",
                "expired snapshot auto-committed {} tokens (from seg {})",
                committed, snap.segment_id
            );
        }
    }

    // ---------- pending buffer manager ----------

    fn align_and_update(&mut self, current_tokens: &[String], now: f64) {
        let prev: Vec<String> = self.pending.iter().map(|t| t.text.clone()).collect();
        let l = lcp_len(&prev, current_tokens);

        for tok in self.pending.iter_mut().take(l) {
            tok.confirmation_count += 1;
            tok.last_seen_time = now;
        }

        while self.pending.len() > l {
            self.pending.pop_back();
        }

        for text in &current_tokens[l..] {
            self.pending.push_back(Token::new(text.clone(), now));
        }
    }

    // ---------- reconciler ----------

    /// `longest_suffix_prefix`: the largest k such that the last k tokens
    /// of `context` (case-folded) equal the first k tokens of `final_tokens`.
    fn longest_suffix_prefix(context: &[String], final_tokens: &[String]) -> usize {
        let max_m = context.len().min(final_tokens.len());
        for k in (1..=max_m).rev() {
            let ctx_tail = &context[context.len() - k..];
            let final_head = &final_tokens[..k];
            if ctx_tail
                .iter()
                .zip(final_head.iter())
                .all(|(a, b)| a.to_lowercase() == b.to_lowercase())
            {
                return k;
            }
        }
        0
    }

    /// Build the best-matching context for a final: for each snapshot
    /// (newest first) and for the no-snapshot case, form
    /// `stable_tail ++ snapshot? ++ pending` and measure overlap. Returns
    /// `(context, snapshot_index, stable_tail_len, snapshot_len, pending_len)`.
    fn build_context_for_final(
        &self,
        final_tokens: &[String],
    ) -> (Vec<String>, Option<usize>, usize, usize, usize) {
        let tail_start = self.stable.len().saturating_sub(MAX_TAIL);
        let stable_tail: Vec<String> = self.stable[tail_start..].to_vec();
        let pending_txt: Vec<String> = self.pending.iter().map(|t| t.text.clone()).collect();

        // Seed with an empty context / zero overlap, same as the original:
        // snapshots are tried first (newest-first, strict `>`) so a tying
        // snapshot wins over no-snapshot and orphan rescue can fire; the
        // no-snapshot context is only tried last, and only replaces a
        // snapshot match on a strictly greater overlap.
        let mut best_ctx: Vec<String> = Vec::new();
        let mut best_snap_idx: Option<usize> = None;
        let mut best_snap_len = 0usize;
        let mut best_m = 0usize;

        // Newest-first: iterate in reverse so ties prefer the newer snapshot.
        for (rev_idx, snap) in self.awaiting_final.iter().rev().enumerate() {
            let snap_txt: Vec<String> = snap.tokens.iter().map(|t| t.text.clone()).collect();
            let mut ctx = stable_tail.clone();
            ctx.extend(snap_txt.iter().cloned());
            ctx.extend(pending_txt.clone());
            let m = Self::longest_suffix_prefix(&ctx, final_tokens);
            if m > best_m {
                let idx = self.awaiting_final.len() - 1 - rev_idx;
                best_m = m;
                best_ctx = ctx;
                best_snap_idx = Some(idx);
                best_snap_len = snap_txt.len();
            }
        }

        let mut ctx_nosnap = stable_tail.clone();
        ctx_nosnap.extend(pending_txt.clone());
        let m0 = Self::longest_suffix_prefix(&ctx_nosnap, final_tokens);
        if m0 > best_m {
            best_ctx = ctx_nosnap;
            best_snap_idx = None;
            best_snap_len = 0;
        }

        (best_ctx, best_snap_idx, stable_tail.len(), best_snap_len, pending_txt.len())
    }

    fn reconcile_final(&mut self, final_tokens: Vec<String>) {
        let (context, snap_idx, len_st_tail, len_snap, _len_pend) =
            self.build_context_for_final(&final_tokens);
        let m = Self::longest_suffix_prefix(&context, &final_tokens);

        debug!(
            target: "transcript",
            "final reconciliation: context={} final={} overlap={}",
            context.len(), final_tokens.len(), m
        );

        let overlap_start = context.len() - m;

        if let Some(idx) = snap_idx {
            if len_snap > 0 {
                let snap_start = len_st_tail;
                let snap_end = len_st_tail + len_snap - 1;
                let left_end = (overlap_start as isize - 1).min(snap_end as isize);

                if left_end >= snap_start as isize {
                    let left_count = (left_end - snap_start as isize + 1) as usize;
                    let orphaned: Vec<String> = self.awaiting_final[idx]
                        .tokens
                        .iter()
                        .take(left_count)
                        .map(|t| t.text.clone())
                        .collect();

                    let rescued = self.commit(orphaned);
                    for _ in 0..left_count {
                        self.awaiting_final[idx].tokens.pop_front();
                    }

                    if rescued > 0 {
                        self.metrics.add_orphan_rescues(rescued as u64);
                        self.metrics.incr_late_final_hits();
                        self.metrics.add_committed_by_final(rescued as u64);
                        info!(
                            target: "transcript",
                            "late final matched snapshot from seg {}, rescued {} orphaned tokens",
                            self.awaiting_final[idx].segment_id, rescued
                        );
                    }
                }

                if self.awaiting_final[idx].tokens.is_empty() {
                    self.awaiting_final.remove(idx);
                }
            }
        }

        let to_append = final_tokens[m..].to_vec();
        if !to_append.is_empty() {
            let committed = self.commit(to_append);
            self.metrics.add_committed_by_final(committed as u64);
        }

        self.pending.clear();
    }

    fn roll_segment(&mut self, now_ms: i64) {
        self.segment_id += 1;
        self.segment_started_ms = Some(now_ms);
    }

    // ---------- public API ----------

    pub fn add_partial(&mut self, text: &str, now_override_s: Option<f64>) -> DisplayEvent {
        self.metrics.incr_total_partials();
        let now_ms = self.now_ms(now_override_s.map(|s| (s * 1000.0) as i64));
        self.ensure_segment_started(now_ms);
        self.expire_snapshots(now_ms);

        let cur_tokens = tokenize(text);
        self.record_partial_history(&cur_tokens, now_ms);

        let now_s = now_ms as f64 / 1000.0;
        self.align_and_update(&cur_tokens, now_s);
        self.promote_leftmost_ready(now_ms);

        if let Some(started) = self.segment_started_ms {
            if (now_ms - started) as f64 >= self.config.max_segment_s * 1000.0 {
                self.force_segment_break(Some(now_ms as f64 / 1000.0));
            }
        }

        self.build_display_event(false)
    }

    pub fn add_final(&mut self, text: &str, now_override_s: Option<f64>) -> DisplayEvent {
        self.metrics.incr_total_finals();
        let now_ms = self.now_ms(now_override_s.map(|s| (s * 1000.0) as i64));
        self.ensure_segment_started(now_ms);
        self.expire_snapshots(now_ms);

        let final_tokens = tokenize(text);
        if final_tokens.is_empty() {
            self.force_segment_break_at(now_ms);
            return self.build_display_event(true);
        }

        self.reconcile_final(final_tokens);
        self.roll_segment(now_ms);
        self.build_display_event(true)
    }

    pub fn force_segment_break(&mut self, now_override_s: Option<f64>) {
        let now_ms = self.now_ms(now_override_s.map(|s| (s * 1000.0) as i64));
        self.force_segment_break_at(now_ms);
    }

    fn force_segment_break_at(&mut self, now_ms: i64) {
        self.expire_snapshots(now_ms);
        self.snapshot_pending(now_ms);
        self.pending.clear();
        self.roll_segment(now_ms);
        self.metrics.incr_segment_rolls();
        info!(target: "transcript", "segment rolled, new segment={}", self.segment_id);
    }

    pub fn reset(&mut self) {
        self.stable.clear();
        self.pending.clear();
        self.awaiting_final.clear();
        self.partial_history.clear();
        self.segment_id = 0;
        self.segment_started_ms = None;
        self.last_now_ms = i64::MIN;
        info!(target: "transcript", "accumulator reset");
    }
}
