//! Base availability and reviewer profile.

use super::ReviewerStore;
use crate::{error::DeskResult, reviewer::Availability};

impl ReviewerStore {
    /// Set the base availability. Scheduled overrides still shadow it.
    pub fn set_availability(&self, reviewer_id: &str, availability: Availability) -> DeskResult<()> {
        self.mutate(reviewer_id, |state| state.availability = availability)?;
        log::debug!("store: reviewer={reviewer_id} availability={availability}");
        Ok(())
    }

    /// String-typed variant for callers holding raw input.
    /// Rejects anything outside the four members with INVALID_AVAILABILITY.
    pub fn set_availability_str(&self, reviewer_id: &str, value: &str) -> DeskResult<Availability> {
        let availability: Availability = value.parse()?;
        self.set_availability(reviewer_id, availability)?;
        Ok(availability)
    }

    /// Base availability, ignoring overrides.
    pub fn base_availability(&self, reviewer_id: &str) -> Availability {
        self.read(reviewer_id, |state| state.availability)
    }

    /// Replace the specialty set and department read by the
    /// SPECIALTY and DEPARTMENT ranking algorithms.
    pub fn set_profile(
        &self,
        reviewer_id: &str,
        specialties: impl IntoIterator<Item = String>,
        department:  Option<String>,
    ) -> DeskResult<()> {
        let specialties = specialties.into_iter().collect();
        self.mutate(reviewer_id, |state| {
            state.specialties = specialties;
            state.department = department;
        })
    }
}
