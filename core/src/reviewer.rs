//! The per-reviewer state record and its value types.
//!
//! Pure data plus derived metrics. All mutation goes through
//! `ReviewerStore`, which owns validation, clamping and locking.

use crate::{
    config::QualityWeights,
    error::DeskError,
    types::Timestamp,
};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, VecDeque};
use std::str::FromStr;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Availability {
    Available,
    Busy,
    Away,
    Vacation,
}

impl Availability {
    pub const ALL: [Availability; 4] = [
        Availability::Available,
        Availability::Busy,
        Availability::Away,
        Availability::Vacation,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Available => "AVAILABLE",
            Self::Busy      => "BUSY",
            Self::Away      => "AWAY",
            Self::Vacation  => "VACATION",
        }
    }

    /// AWAY and VACATION are the absences that trigger delegation.
    pub fn is_absent(&self) -> bool {
        matches!(self, Self::Away | Self::Vacation)
    }

    /// Only these may be scheduled as overrides.
    pub fn is_schedulable(&self) -> bool {
        !matches!(self, Self::Available)
    }
}

impl std::fmt::Display for Availability {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Availability {
    type Err = DeskError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Availability::ALL
            .into_iter()
            .find(|a| a.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| DeskError::InvalidAvailability { value: s.to_string() })
    }
}

/// A time-boxed availability that shadows the base value for
/// `[start_at, end_at)`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ScheduleOverride {
    pub id:           String,
    pub availability: Availability,
    pub start_at:     Timestamp,
    pub end_at:       Timestamp,
    #[serde(default)]
    pub note:         Option<String>,
    /// Store-wide creation order. Higher wins when overrides overlap.
    pub created_seq:  u64,
}

impl ScheduleOverride {
    pub fn covers(&self, at: Timestamp) -> bool {
        self.start_at <= at && at < self.end_at
    }

    pub fn has_ended_by(&self, at: Timestamp) -> bool {
        self.end_at <= at
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ReviewerState {
    pub availability:             Availability,
    pub max_assignments:          u32,
    pub current_assignments:      u32,
    pub schedule_overrides:       Vec<ScheduleOverride>,
    pub reviews_completed:        u64,
    pub total_review_duration_ms: u64,
    pub approvals_count:          u64,
    pub rejections_count:         u64,
    /// Most recent ratings, oldest at the front.
    pub ratings:                  VecDeque<u8>,
    pub specialties:              BTreeSet<String>,
    pub department:               Option<String>,
    pub updated_at:               Timestamp,
}

impl ReviewerState {
    pub fn new(max_assignments: u32, now: Timestamp) -> Self {
        Self {
            availability:             Availability::Available,
            max_assignments,
            current_assignments:      0,
            schedule_overrides:       Vec::new(),
            reviews_completed:        0,
            total_review_duration_ms: 0,
            approvals_count:          0,
            rejections_count:         0,
            ratings:                  VecDeque::new(),
            specialties:              BTreeSet::new(),
            department:               None,
            updated_at:               now,
        }
    }

    /// `round(current / max(max, 1) * 100)`.
    pub fn capacity_percentage(&self) -> u32 {
        let ceiling = self.max_assignments.max(1) as f64;
        (self.current_assignments as f64 / ceiling * 100.0).round() as u32
    }

    pub fn is_over_capacity(&self) -> bool {
        self.current_assignments >= self.max_assignments
    }

    /// Mean of the retained ratings, 0.0 when there are none.
    pub fn rating(&self) -> f64 {
        if self.ratings.is_empty() {
            return 0.0;
        }
        let sum: u64 = self.ratings.iter().map(|&r| r as u64).sum();
        sum as f64 / self.ratings.len() as f64
    }

    /// Approvals as a percentage of completed reviews.
    pub fn approval_rate(&self) -> f64 {
        if self.reviews_completed == 0 {
            return 0.0;
        }
        self.approvals_count as f64 / self.reviews_completed as f64 * 100.0
    }

    pub fn average_review_duration_ms(&self) -> u64 {
        if self.reviews_completed == 0 {
            return 0;
        }
        self.total_review_duration_ms / self.reviews_completed
    }

    /// Weighted blend of approval rate, average rating and volume.
    /// Exactly 0 until the first review is recorded.
    pub fn quality_score(&self, weights: &QualityWeights) -> u32 {
        if self.reviews_completed == 0 {
            return 0;
        }
        let rating_pct = self.rating() / 5.0 * 100.0;
        let target = weights.volume_target.max(1) as f64;
        let volume_pct = (self.reviews_completed as f64 / target * 100.0).min(100.0);

        let blended = weights.approval * self.approval_rate()
            + weights.rating * rating_pct
            + weights.volume * volume_pct;
        blended.round().clamp(0.0, 100.0) as u32
    }

    pub fn has_specialty(&self, specialty: &str) -> bool {
        self.specialties.contains(specialty)
    }

    /// Overrides ordered by start time (creation order on ties).
    pub fn sorted_overrides(&self) -> Vec<ScheduleOverride> {
        let mut overrides = self.schedule_overrides.clone();
        overrides.sort_by(|a, b| {
            a.start_at
                .cmp(&b.start_at)
                .then(a.created_seq.cmp(&b.created_seq))
        });
        overrides
    }
}
