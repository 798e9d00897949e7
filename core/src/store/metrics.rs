//! Review counters, ratings and the quality score.

use super::ReviewerStore;
use crate::error::{DeskError, DeskResult};

impl ReviewerStore {
    /// Count one completed review. Counters only ever grow.
    pub fn record_review(&self, reviewer_id: &str, duration_ms: i64, approved: bool) -> DeskResult<()> {
        let duration_ms =
            u64::try_from(duration_ms).map_err(|_| DeskError::InvalidDuration { value: duration_ms })?;

        self.mutate(reviewer_id, |state| {
            state.reviews_completed = state.reviews_completed.saturating_add(1);
            state.total_review_duration_ms = state.total_review_duration_ms.saturating_add(duration_ms);
            if approved {
                state.approvals_count = state.approvals_count.saturating_add(1);
            } else {
                state.rejections_count = state.rejections_count.saturating_add(1);
            }
        })
    }

    /// Append a 1..=5 rating. Only the most recent `rating_window`
    /// ratings are kept; the oldest is evicted first.
    pub fn add_rating(&self, reviewer_id: &str, rating: i64) -> DeskResult<()> {
        if !(1..=5).contains(&rating) {
            return Err(DeskError::InvalidRating { value: rating });
        }
        let window = self.config.rating_window.max(1);
        self.mutate(reviewer_id, |state| {
            state.ratings.push_back(rating as u8);
            while state.ratings.len() > window {
                state.ratings.pop_front();
            }
        })
    }

    /// Mean of the retained ratings (0.0 when none).
    pub fn rating(&self, reviewer_id: &str) -> f64 {
        self.read(reviewer_id, |state| state.rating())
    }

    pub fn approval_rate(&self, reviewer_id: &str) -> f64 {
        self.read(reviewer_id, |state| state.approval_rate())
    }

    pub fn average_review_duration_ms(&self, reviewer_id: &str) -> u64 {
        self.read(reviewer_id, |state| state.average_review_duration_ms())
    }

    /// The single 0–100 performance number used for ranking and filtering.
    pub fn quality_score(&self, reviewer_id: &str) -> u32 {
        self.read(reviewer_id, |state| state.quality_score(&self.config.quality))
    }
}
