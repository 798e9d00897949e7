//! Effective availability: base availability with scheduled overrides
//! laid on top.
//!
//! Resolution is computed on read against an explicit as-of instant.
//! Nothing is pushed when an override starts or ends, so no timer is
//! needed to keep state correct.

use crate::{
    error::{DeskError, DeskResult},
    event::DeskEvent,
    reviewer::{Availability, ReviewerState, ScheduleOverride},
    store::ReviewerStore,
    types::{ReviewerId, Timestamp},
};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// An override about to end, paired with its reviewer.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ExpiringSchedule {
    pub reviewer_id: ReviewerId,
    pub schedule:    ScheduleOverride,
}

/// The override in force at `at`, if any. When several overlap, the most
/// recently created one wins.
pub fn active_override(state: &ReviewerState, at: Timestamp) -> Option<&ScheduleOverride> {
    state
        .schedule_overrides
        .iter()
        .filter(|o| o.covers(at))
        .max_by_key(|o| o.created_seq)
}

pub fn effective_availability(state: &ReviewerState, at: Timestamp) -> Availability {
    active_override(state, at)
        .map(|o| o.availability)
        .unwrap_or(state.availability)
}

#[derive(Clone)]
pub struct AvailabilityResolver {
    store: Arc<ReviewerStore>,
}

impl AvailabilityResolver {
    pub fn new(store: Arc<ReviewerStore>) -> Self {
        Self { store }
    }

    pub fn effective_availability(&self, reviewer_id: &str, at: Timestamp) -> Availability {
        effective_availability(&self.store.get_reviewer(reviewer_id), at)
    }

    pub fn effective_availability_now(&self, reviewer_id: &str) -> Availability {
        self.effective_availability(reviewer_id, self.store.clock().now())
    }

    /// The override currently shadowing the base value, if any.
    pub fn active_override(&self, reviewer_id: &str, at: Timestamp) -> Option<ScheduleOverride> {
        active_override(&self.store.get_reviewer(reviewer_id), at).cloned()
    }

    /// Remove overrides whose end is at or before `now`.
    /// Meant to be driven by an external periodic scheduler.
    pub fn cleanup_expired_schedules(&self, reviewer_id: Option<&str>, now: Timestamp) -> usize {
        let removed = self.store.prune_schedules(reviewer_id, now);
        if removed > 0 {
            log::info!(
                "availability: removed {removed} expired schedule override(s) (scope={})",
                reviewer_id.unwrap_or("all"),
            );
            self.store.emit(DeskEvent::SchedulesExpired { at: now, removed });
        }
        removed
    }

    /// Overrides ending in `(now, now + window]`, soonest first.
    /// A window reaching past the representable range covers everything.
    pub fn schedules_expiring_within(
        &self,
        window: Duration,
        now:    Timestamp,
    ) -> DeskResult<Vec<ExpiringSchedule>> {
        if window <= Duration::zero() {
            return Err(DeskError::InvalidWindow { seconds: window.num_seconds() });
        }
        let horizon = now.checked_add_signed(window).unwrap_or(DateTime::<Utc>::MAX_UTC);

        let mut expiring: Vec<ExpiringSchedule> = self
            .store
            .all_schedule_overrides()
            .into_iter()
            .filter(|(_, o)| now < o.end_at && o.end_at <= horizon)
            .map(|(reviewer_id, schedule)| ExpiringSchedule { reviewer_id, schedule })
            .collect();
        expiring.sort_by(|a, b| {
            a.schedule
                .end_at
                .cmp(&b.schedule.end_at)
                .then_with(|| a.reviewer_id.cmp(&b.reviewer_id))
        });
        Ok(expiring)
    }
}
