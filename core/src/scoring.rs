//! Assignment scoring: turns a candidate pool and a ranking policy into
//! an ordered list of reviewers.
//!
//! Two phases:
//!   1. Filter: candidates minus exclusions, kept only if their effective
//!      availability is in the requested set and (optionally) their
//!      quality score meets the threshold.
//!   2. Score and rank with the selected algorithm. Zero scores are
//!      dropped; the sort is stable, so ties keep candidate order.
//!
//! Scoring is read-only. The round-robin pointer only moves through
//! `advance_round_robin`, so any ranking can be replayed.

use crate::{
    availability::effective_availability,
    error::{DeskError, DeskResult},
    reviewer::{Availability, ReviewerState},
    store::ReviewerStore,
    types::{ReviewerId, Timestamp},
};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

pub const DEFAULT_ROUND_ROBIN_KEY: &str = "default";

/// Score given to everyone when SPECIALTY/DEPARTMENT has nothing to match.
const NEUTRAL_SCORE: u32 = 50;
const MAX_SCORE: u32 = 100;

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Algorithm {
    #[default]
    Workload,
    Specialty,
    Department,
    Performance,
    RoundRobin,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum Candidates {
    /// Every reviewer the store knows about, in id order.
    #[default]
    All,
    Ids(Vec<ReviewerId>),
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AssignmentRequest {
    pub candidates:            Candidates,
    pub exclude:               Vec<ReviewerId>,
    /// Empty means AVAILABLE only.
    pub required_availability: Vec<Availability>,
    pub algorithm:             Algorithm,
    pub specialty:             Option<String>,
    pub department:            Option<String>,
    pub round_robin_key:       Option<String>,
    pub min_quality:           Option<u32>,
    /// Evaluate availability as of this instant. Defaults to the clock.
    pub at:                    Option<Timestamp>,
}

impl AssignmentRequest {
    pub fn new(algorithm: Algorithm) -> Self {
        Self { algorithm, ..Self::default() }
    }

    pub fn candidates<I, S>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<ReviewerId>,
    {
        self.candidates = Candidates::Ids(ids.into_iter().map(Into::into).collect());
        self
    }

    pub fn exclude<I, S>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<ReviewerId>,
    {
        self.exclude = ids.into_iter().map(Into::into).collect();
        self
    }

    pub fn require(mut self, availability: impl IntoIterator<Item = Availability>) -> Self {
        self.required_availability = availability.into_iter().collect();
        self
    }

    pub fn specialty(mut self, specialty: impl Into<String>) -> Self {
        self.specialty = Some(specialty.into());
        self
    }

    pub fn department(mut self, department: impl Into<String>) -> Self {
        self.department = Some(department.into());
        self
    }

    pub fn round_robin_key(mut self, key: impl Into<String>) -> Self {
        self.round_robin_key = Some(key.into());
        self
    }

    pub fn min_quality(mut self, threshold: u32) -> Self {
        self.min_quality = Some(threshold);
        self
    }

    pub fn at(mut self, at: Timestamp) -> Self {
        self.at = Some(at);
        self
    }

    fn accepts(&self, availability: Availability) -> bool {
        if self.required_availability.is_empty() {
            availability == Availability::Available
        } else {
            self.required_availability.contains(&availability)
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct AssignmentResult {
    pub reviewer_id: ReviewerId,
    /// 0–100.
    pub score:       u32,
    pub reason:      String,
}

pub struct AssignmentScorer {
    store:   Arc<ReviewerStore>,
    cursors: Mutex<HashMap<String, usize>>,
}

impl AssignmentScorer {
    pub fn new(store: Arc<ReviewerStore>) -> Self {
        Self {
            store,
            cursors: Mutex::new(HashMap::new()),
        }
    }

    /// The top-ranked reviewer.
    pub fn assign_reviewer(&self, request: &AssignmentRequest) -> DeskResult<AssignmentResult> {
        let mut ranked = self.rank(request)?;
        Ok(ranked.swap_remove(0))
    }

    /// The top `count` reviewers (fewer if the ranked pool is smaller).
    pub fn assign_multiple_reviewers(
        &self,
        count:   i64,
        request: &AssignmentRequest,
    ) -> DeskResult<Vec<AssignmentResult>> {
        let count = usize::try_from(count)
            .ok()
            .filter(|&c| c >= 1)
            .ok_or(DeskError::InvalidCount { value: count })?;
        let mut ranked = self.rank(request)?;
        ranked.truncate(count);
        Ok(ranked)
    }

    /// The full ranked list, best first.
    pub fn rank(&self, request: &AssignmentRequest) -> DeskResult<Vec<AssignmentResult>> {
        let at = request.at.unwrap_or_else(|| self.store.clock().now());

        let pool = self.candidate_pool(request);
        if pool.is_empty() {
            return Err(DeskError::NoReviewersAvailable);
        }

        let excluded: HashSet<&str> = request.exclude.iter().map(String::as_str).collect();
        let eligible: Vec<(ReviewerId, ReviewerState)> = pool
            .into_iter()
            .filter(|id| !excluded.contains(id.as_str()))
            .map(|id| {
                let state = self.store.get_reviewer(&id);
                (id, state)
            })
            .filter(|(_, state)| request.accepts(effective_availability(state, at)))
            .filter(|(_, state)| match request.min_quality {
                Some(threshold) => state.quality_score(&self.store.config().quality) >= threshold,
                None => true,
            })
            .collect();

        let mut scored = self.score(request, &eligible);
        scored.retain(|r| r.score > 0);
        // Stable: equal scores keep candidate order.
        scored.sort_by(|a, b| b.score.cmp(&a.score));

        log::debug!(
            "scoring: algorithm={:?} eligible={} ranked={}",
            request.algorithm,
            eligible.len(),
            scored.len(),
        );

        if scored.is_empty() {
            return Err(DeskError::NoSuitableReviewers);
        }
        Ok(scored)
    }

    // ── Round robin ────────────────────────────────────────────

    /// Move the rotation for `key` forward by one consumed assignment.
    /// Returns the new pointer.
    pub fn advance_round_robin(&self, key: &str, list_length: i64) -> DeskResult<usize> {
        let len = usize::try_from(list_length)
            .ok()
            .filter(|&l| l >= 1)
            .ok_or(DeskError::InvalidCount { value: list_length })?;
        let mut cursors = self.cursors.lock();
        let cursor = cursors.entry(key.to_string()).or_insert(0);
        *cursor = (*cursor + 1) % len;
        Ok(*cursor)
    }

    pub fn round_robin_pointer(&self, key: &str) -> usize {
        self.cursors.lock().get(key).copied().unwrap_or(0)
    }

    pub fn export_round_robin(&self) -> HashMap<String, usize> {
        self.cursors.lock().clone()
    }

    pub fn import_round_robin(&self, cursors: HashMap<String, usize>) {
        *self.cursors.lock() = cursors;
    }

    // ── Internals ──────────────────────────────────────────────

    fn candidate_pool(&self, request: &AssignmentRequest) -> Vec<ReviewerId> {
        match &request.candidates {
            Candidates::All => self.store.reviewer_ids(),
            Candidates::Ids(ids) => {
                let mut seen = HashSet::new();
                ids.iter()
                    .filter(|&id| seen.insert(id.as_str()))
                    .cloned()
                    .collect()
            }
        }
    }

    fn score(
        &self,
        request:  &AssignmentRequest,
        eligible: &[(ReviewerId, ReviewerState)],
    ) -> Vec<AssignmentResult> {
        match request.algorithm {
            Algorithm::Workload => eligible
                .iter()
                .map(|(id, state)| score_workload(id, state))
                .collect(),
            Algorithm::Specialty => eligible
                .iter()
                .map(|(id, state)| score_specialty(id, state, request.specialty.as_deref()))
                .collect(),
            Algorithm::Department => eligible
                .iter()
                .map(|(id, state)| score_department(id, state, request.department.as_deref()))
                .collect(),
            Algorithm::Performance => {
                let weights = &self.store.config().quality;
                eligible
                    .iter()
                    .map(|(id, state)| {
                        let quality = state.quality_score(weights);
                        AssignmentResult {
                            reviewer_id: id.clone(),
                            score:       quality,
                            reason:      format!("quality score {quality}"),
                        }
                    })
                    .collect()
            }
            Algorithm::RoundRobin => {
                let key = request
                    .round_robin_key
                    .as_deref()
                    .unwrap_or(DEFAULT_ROUND_ROBIN_KEY);
                let pointer = self.round_robin_pointer(key);
                let step = self.store.config().round_robin_step;
                let len = eligible.len();
                eligible
                    .iter()
                    .enumerate()
                    .map(|(position, (id, _))| {
                        let distance = (position + len - pointer % len) % len;
                        let penalty = u32::try_from(distance)
                            .unwrap_or(u32::MAX)
                            .saturating_mul(step);
                        AssignmentResult {
                            reviewer_id: id.clone(),
                            score:       MAX_SCORE.saturating_sub(penalty),
                            reason:      format!("round-robin distance {distance} in '{key}'"),
                        }
                    })
                    .collect()
            }
        }
    }
}

fn score_workload(id: &str, state: &ReviewerState) -> AssignmentResult {
    if state.is_over_capacity() {
        return AssignmentResult {
            reviewer_id: id.to_string(),
            score:       0,
            reason:      "at capacity".into(),
        };
    }
    let pct = state.capacity_percentage().min(MAX_SCORE);
    AssignmentResult {
        reviewer_id: id.to_string(),
        score:       MAX_SCORE - pct,
        reason:      format!("{pct}% of capacity in use"),
    }
}

fn score_specialty(id: &str, state: &ReviewerState, specialty: Option<&str>) -> AssignmentResult {
    let (score, reason) = match specialty {
        None => (NEUTRAL_SCORE, "no specialty requested".to_string()),
        Some(s) if state.has_specialty(s) => (MAX_SCORE, format!("specialty match: {s}")),
        Some(s) => (0, format!("no {s} specialty")),
    };
    AssignmentResult { reviewer_id: id.to_string(), score, reason }
}

fn score_department(id: &str, state: &ReviewerState, department: Option<&str>) -> AssignmentResult {
    let (score, reason) = match department {
        None => (NEUTRAL_SCORE, "no department requested".to_string()),
        Some(d) if state.department.as_deref() == Some(d) => {
            (MAX_SCORE, format!("department match: {d}"))
        }
        Some(d) => (0, format!("not in department {d}")),
    };
    AssignmentResult { reviewer_id: id.to_string(), score, reason }
}
