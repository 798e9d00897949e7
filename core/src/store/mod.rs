//! Reviewer state store: the single source of truth for reviewer state.
//!
//! RULE: Only the store mutates a `ReviewerState`.
//! The resolver, scorer and coordinator call store methods; they never
//! hold a record across calls.
//!
//! Records live in a sharded map. Every mutation runs under the write
//! guard of the record's shard, so concurrent callers touching the same
//! reviewer are serialized and the capacity invariant holds.
//! Never call back into the store while a guard is held.

mod availability;
mod metrics;
mod schedule;
mod workload;

use crate::{
    clock::Clock,
    config::DeskConfig,
    error::{DeskError, DeskResult},
    event::{DeskEvent, EventJournal},
    reviewer::ReviewerState,
    types::ReviewerId,
};
use dashmap::DashMap;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

pub struct ReviewerStore {
    reviewers:    DashMap<ReviewerId, ReviewerState>,
    config:       DeskConfig,
    clock:        Arc<dyn Clock>,
    events:       EventJournal,
    override_seq: AtomicU64,
}

impl ReviewerStore {
    /// An empty store. Records are created on first access.
    pub fn new(config: DeskConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            reviewers: DashMap::new(),
            events: EventJournal::with_capacity(config.event_journal_capacity),
            config,
            clock,
            override_seq: AtomicU64::new(1),
        }
    }

    pub fn config(&self) -> &DeskConfig {
        &self.config
    }

    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    // ── Access ─────────────────────────────────────────────────

    /// Create-on-first-access: returns the reviewer's record, inserting
    /// the defaults (AVAILABLE, default capacity, zeroed counters) if
    /// the reviewer has never been seen.
    pub fn ensure(&self, reviewer_id: &str) -> DeskResult<ReviewerState> {
        self.mutate_quiet(reviewer_id, |state| state.clone())
    }

    /// Read-only view. Unknown reviewers read as defaults and are not
    /// inserted.
    pub fn get_reviewer(&self, reviewer_id: &str) -> ReviewerState {
        self.read(reviewer_id, ReviewerState::clone)
    }

    pub fn contains(&self, reviewer_id: &str) -> bool {
        self.reviewers.contains_key(reviewer_id)
    }

    /// Every known reviewer, sorted for stable iteration.
    pub fn reviewer_ids(&self) -> Vec<ReviewerId> {
        let mut ids: Vec<ReviewerId> = self.reviewers.iter().map(|e| e.key().clone()).collect();
        ids.sort();
        ids
    }

    pub fn len(&self) -> usize {
        self.reviewers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.reviewers.is_empty()
    }

    // ── Events ─────────────────────────────────────────────────

    pub fn emit(&self, event: DeskEvent) {
        self.events.push(event);
    }

    pub fn drain_events(&self) -> Vec<DeskEvent> {
        self.events.drain()
    }

    /// Events pending in the journal.
    pub fn pending_events(&self) -> usize {
        self.events.len()
    }

    /// Events evicted from a full journal since the last drain.
    pub fn dropped_events(&self) -> u64 {
        self.events.dropped()
    }

    // ── Snapshot support ───────────────────────────────────────

    pub fn export(&self) -> BTreeMap<ReviewerId, ReviewerState> {
        self.reviewers
            .iter()
            .map(|e| (e.key().clone(), e.value().clone()))
            .collect()
    }

    /// Replace every record. The override sequence resumes past the
    /// highest imported value so new overrides still win overlaps.
    pub fn import(&self, records: BTreeMap<ReviewerId, ReviewerState>) {
        let next_seq = records
            .values()
            .flat_map(|s| s.schedule_overrides.iter().map(|o| o.created_seq))
            .max()
            .unwrap_or(0)
            + 1;
        self.reviewers.clear();
        for (id, state) in records {
            self.reviewers.insert(id, state);
        }
        self.override_seq.fetch_max(next_seq, Ordering::SeqCst);
    }

    // ── Internals ──────────────────────────────────────────────

    fn default_state(&self) -> ReviewerState {
        ReviewerState::new(self.config.default_max_assignments, self.clock.now())
    }

    /// Run `f` against the record under its shard's read guard.
    fn read<R>(&self, reviewer_id: &str, f: impl FnOnce(&ReviewerState) -> R) -> R {
        match self.reviewers.get(reviewer_id) {
            Some(state) => f(state.value()),
            None => f(&self.default_state()),
        }
    }

    /// Run `f` against the record under its shard's write guard,
    /// creating it first if needed, and stamp `updated_at`.
    fn mutate<R>(&self, reviewer_id: &str, f: impl FnOnce(&mut ReviewerState) -> R) -> DeskResult<R> {
        let now = self.clock.now();
        self.with_entry(reviewer_id, |state| {
            let out = f(state);
            state.updated_at = now;
            out
        })
    }

    /// As `mutate`, without touching `updated_at`.
    fn mutate_quiet<R>(&self, reviewer_id: &str, f: impl FnOnce(&mut ReviewerState) -> R) -> DeskResult<R> {
        self.with_entry(reviewer_id, f)
    }

    fn with_entry<R>(&self, reviewer_id: &str, f: impl FnOnce(&mut ReviewerState) -> R) -> DeskResult<R> {
        validate_reviewer_id(reviewer_id)?;
        let mut entry = self
            .reviewers
            .entry(reviewer_id.to_string())
            .or_insert_with(|| self.default_state());
        Ok(f(entry.value_mut()))
    }

    fn next_override_seq(&self) -> u64 {
        self.override_seq.fetch_add(1, Ordering::SeqCst)
    }
}

pub(crate) fn validate_reviewer_id(reviewer_id: &str) -> DeskResult<()> {
    if reviewer_id.trim().is_empty() {
        return Err(DeskError::InvalidReviewerId);
    }
    Ok(())
}
