//! Capacity and workload.
//!
//! INVARIANT: 0 <= current_assignments <= max_assignments, enforced by
//! clamping on every mutation. Going past a bound is not an error.

use super::ReviewerStore;
use crate::{
    error::{DeskError, DeskResult},
    event::DeskEvent,
};

impl ReviewerStore {
    /// Set the capacity ceiling. If workload exceeds the new ceiling it is
    /// clamped down to it; the overflow is lost and a `WorkloadClamped`
    /// event records the previous value.
    pub fn set_max_assignments(&self, reviewer_id: &str, max: i64) -> DeskResult<u32> {
        let max = u32::try_from(max).map_err(|_| DeskError::InvalidMaxAssignments { value: max })?;

        let clamped = self.mutate(reviewer_id, |state| {
            state.max_assignments = max;
            if state.current_assignments > max {
                let previous = state.current_assignments;
                state.current_assignments = max;
                Some(previous)
            } else {
                None
            }
        })?;

        if let Some(previous) = clamped {
            log::warn!(
                "store: reviewer={reviewer_id} capacity lowered to {max}; workload clamped {previous} -> {max}"
            );
            self.emit(DeskEvent::WorkloadClamped {
                at:          self.clock.now(),
                reviewer_id: reviewer_id.to_string(),
                previous,
                current:     max,
            });
        }
        Ok(max)
    }

    /// Add `amount` to the workload, stopping at the ceiling.
    /// Returns the new workload.
    pub fn increment_workload(&self, reviewer_id: &str, amount: i64) -> DeskResult<u32> {
        let amount = validate_amount(amount)?;
        self.mutate(reviewer_id, |state| {
            state.current_assignments = state
                .current_assignments
                .saturating_add(amount)
                .min(state.max_assignments);
            state.current_assignments
        })
    }

    /// Remove `amount` from the workload, stopping at zero.
    /// Returns the new workload.
    pub fn decrement_workload(&self, reviewer_id: &str, amount: i64) -> DeskResult<u32> {
        let amount = validate_amount(amount)?;
        self.mutate(reviewer_id, |state| {
            state.current_assignments = state.current_assignments.saturating_sub(amount);
            state.current_assignments
        })
    }

    /// `(current_assignments, max_assignments)`.
    pub fn workload(&self, reviewer_id: &str) -> (u32, u32) {
        self.read(reviewer_id, |state| (state.current_assignments, state.max_assignments))
    }

    pub fn capacity_percentage(&self, reviewer_id: &str) -> u32 {
        self.read(reviewer_id, |state| state.capacity_percentage())
    }

    pub fn is_over_capacity(&self, reviewer_id: &str) -> bool {
        self.read(reviewer_id, |state| state.is_over_capacity())
    }
}

fn validate_amount(amount: i64) -> DeskResult<u32> {
    if amount < 1 {
        return Err(DeskError::InvalidAmount { value: amount });
    }
    // Anything past u32::MAX clamps identically.
    Ok(u32::try_from(amount).unwrap_or(u32::MAX))
}
