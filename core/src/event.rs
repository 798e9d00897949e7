//! Desk events: notable state changes surfaced to callers.
//!
//! The store appends to a journal; callers drain it when they want to
//! forward changes to notification or reporting collaborators.

use crate::{
    reviewer::Availability,
    types::{ItemId, ReviewerId, Timestamp},
};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// Variants are added over time. Never remove or reorder them.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DeskEvent {
    /// A capacity reduction dropped workload below its true value.
    WorkloadClamped {
        at:          Timestamp,
        reviewer_id: ReviewerId,
        previous:    u32,
        current:     u32,
    },
    ScheduleAdded {
        at:           Timestamp,
        reviewer_id:  ReviewerId,
        override_id:  String,
        availability: Availability,
        start_at:     Timestamp,
        end_at:       Timestamp,
    },
    ScheduleRemoved {
        at:          Timestamp,
        reviewer_id: ReviewerId,
        override_id: String,
    },
    SchedulesExpired {
        at:      Timestamp,
        removed: usize,
    },
    WorkItemReassigned {
        at:               Timestamp,
        item_id:          ItemId,
        from_reviewer_id: ReviewerId,
        to_reviewer_id:   ReviewerId,
    },
}

impl DeskEvent {
    /// Stable name, used for log lines and the runner's output.
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::WorkloadClamped { .. }    => "workload_clamped",
            Self::ScheduleAdded { .. }      => "schedule_added",
            Self::ScheduleRemoved { .. }    => "schedule_removed",
            Self::SchedulesExpired { .. }   => "schedules_expired",
            Self::WorkItemReassigned { .. } => "work_item_reassigned",
        }
    }
}

/// Pending events, oldest first. Holds at most `capacity` entries;
/// once full, each push evicts the oldest.
#[derive(Debug)]
pub struct EventJournal {
    capacity: usize,
    inner:    Mutex<JournalInner>,
}

#[derive(Debug, Default)]
struct JournalInner {
    entries: VecDeque<DeskEvent>,
    /// Evicted since the last drain.
    dropped: u64,
}

impl EventJournal {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            inner:    Mutex::new(JournalInner::default()),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn push(&self, event: DeskEvent) {
        log::debug!("event: {}", event.event_type());
        let mut inner = self.inner.lock();
        if inner.entries.len() >= self.capacity {
            if let Some(oldest) = inner.entries.pop_front() {
                inner.dropped += 1;
                if inner.dropped == 1 {
                    log::warn!(
                        "event: journal full ({} entries); evicting oldest ({}) until drained",
                        self.capacity,
                        oldest.event_type(),
                    );
                }
            }
        }
        inner.entries.push_back(event);
    }

    /// Take every pending event, oldest first.
    pub fn drain(&self) -> Vec<DeskEvent> {
        let mut inner = self.inner.lock();
        if inner.dropped > 0 {
            log::warn!("event: {} event(s) evicted before this drain", inner.dropped);
            inner.dropped = 0;
        }
        inner.entries.drain(..).collect()
    }

    /// Events evicted since the last drain.
    pub fn dropped(&self) -> u64 {
        self.inner.lock().dropped
    }

    pub fn len(&self) -> usize {
        self.inner.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().entries.is_empty()
    }
}
