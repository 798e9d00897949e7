//! Scheduled availability overrides.

use super::{validate_reviewer_id, ReviewerStore};
use crate::{
    error::{DeskError, DeskResult},
    event::DeskEvent,
    reviewer::{Availability, ScheduleOverride},
    types::{ReviewerId, Timestamp},
};
use uuid::Uuid;

impl ReviewerStore {
    /// Schedule `availability` for `[start_at, end_at)`. Overlaps are
    /// allowed; the most recently created override wins on read.
    pub fn add_schedule_override(
        &self,
        reviewer_id:  &str,
        availability: Availability,
        start_at:     Timestamp,
        end_at:       Timestamp,
        note:         Option<String>,
    ) -> DeskResult<ScheduleOverride> {
        if !availability.is_schedulable() {
            return Err(DeskError::InvalidScheduleAvailability {
                value: availability.to_string(),
            });
        }
        if end_at <= start_at {
            return Err(DeskError::InvalidTimeRange {
                start: start_at.to_rfc3339(),
                end:   end_at.to_rfc3339(),
            });
        }
        validate_reviewer_id(reviewer_id)?;

        let entry = ScheduleOverride {
            id: Uuid::new_v4().to_string(),
            availability,
            start_at,
            end_at,
            note,
            created_seq: self.next_override_seq(),
        };
        let stored = entry.clone();
        self.mutate(reviewer_id, move |state| state.schedule_overrides.push(stored))?;

        self.emit(DeskEvent::ScheduleAdded {
            at:           self.clock.now(),
            reviewer_id:  reviewer_id.to_string(),
            override_id:  entry.id.clone(),
            availability,
            start_at,
            end_at,
        });
        Ok(entry)
    }

    /// Returns false when the reviewer or override is unknown.
    pub fn remove_schedule_override(&self, reviewer_id: &str, override_id: &str) -> DeskResult<bool> {
        validate_reviewer_id(reviewer_id)?;
        let now = self.clock.now();
        let removed = match self.reviewers.get_mut(reviewer_id) {
            Some(mut state) => {
                let before = state.schedule_overrides.len();
                state.schedule_overrides.retain(|o| o.id != override_id);
                let removed = state.schedule_overrides.len() < before;
                if removed {
                    state.updated_at = now;
                }
                removed
            }
            None => false,
        };

        if removed {
            self.emit(DeskEvent::ScheduleRemoved {
                at:          now,
                reviewer_id: reviewer_id.to_string(),
                override_id: override_id.to_string(),
            });
        }
        Ok(removed)
    }

    /// Overrides sorted by start time.
    pub fn schedule_overrides(&self, reviewer_id: &str) -> Vec<ScheduleOverride> {
        self.read(reviewer_id, |state| state.sorted_overrides())
    }

    /// Every override in the store, paired with its reviewer.
    pub fn all_schedule_overrides(&self) -> Vec<(ReviewerId, ScheduleOverride)> {
        self.reviewers
            .iter()
            .flat_map(|e| {
                let id = e.key().clone();
                e.value()
                    .schedule_overrides
                    .iter()
                    .map(move |o| (id.clone(), o.clone()))
                    .collect::<Vec<_>>()
            })
            .collect()
    }

    /// Drop overrides that ended at or before `now`, for one reviewer or
    /// all of them. Returns how many were removed.
    pub fn prune_schedules(&self, reviewer_id: Option<&str>, now: Timestamp) -> usize {
        match reviewer_id {
            Some(id) => match self.reviewers.get_mut(id) {
                Some(mut state) => prune_one(&mut state.schedule_overrides, now),
                None => 0,
            },
            None => self
                .reviewers
                .iter_mut()
                .map(|mut e| prune_one(&mut e.value_mut().schedule_overrides, now))
                .sum(),
        }
    }
}

fn prune_one(overrides: &mut Vec<ScheduleOverride>, now: Timestamp) -> usize {
    let before = overrides.len();
    overrides.retain(|o| !o.has_ended_by(now));
    before - overrides.len()
}
