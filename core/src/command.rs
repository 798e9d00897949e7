use crate::{
    delegation::TemporaryDelegation,
    scoring::AssignmentRequest,
    types::{ReviewerId, Timestamp},
    workflow::Actor,
};
use serde::{Deserialize, Serialize};

fn one() -> i64 {
    1
}

/// Every desk operation as data, for JSON-speaking callers.
/// Variants are added over time. Never remove or reorder them.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "cmd", rename_all = "snake_case")]
pub enum DeskCommand {
    // ── Reviewer state ────────────────────────────
    GetReviewer {
        reviewer_id: ReviewerId,
    },
    SetAvailability {
        reviewer_id:  ReviewerId,
        availability: String,
    },
    SetProfile {
        reviewer_id: ReviewerId,
        #[serde(default)]
        specialties: Vec<String>,
        #[serde(default)]
        department:  Option<String>,
    },
    SetMaxAssignments {
        reviewer_id: ReviewerId,
        max:         i64,
    },
    IncrementWorkload {
        reviewer_id: ReviewerId,
        #[serde(default = "one")]
        amount:      i64,
    },
    DecrementWorkload {
        reviewer_id: ReviewerId,
        #[serde(default = "one")]
        amount:      i64,
    },
    CapacityPercentage {
        reviewer_id: ReviewerId,
    },
    RecordReview {
        reviewer_id: ReviewerId,
        duration_ms: i64,
        approved:    bool,
    },
    AddRating {
        reviewer_id: ReviewerId,
        rating:      i64,
    },
    QualityScore {
        reviewer_id: ReviewerId,
    },

    // ── Schedules ─────────────────────────────────
    AddScheduleOverride {
        reviewer_id:  ReviewerId,
        availability: String,
        start_at:     Timestamp,
        end_at:       Timestamp,
        #[serde(default)]
        note:         Option<String>,
    },
    RemoveScheduleOverride {
        reviewer_id: ReviewerId,
        override_id: String,
    },
    EffectiveAvailability {
        reviewer_id: ReviewerId,
        #[serde(default)]
        at:          Option<Timestamp>,
    },
    CleanupExpiredSchedules {
        #[serde(default)]
        reviewer_id: Option<ReviewerId>,
        #[serde(default)]
        now:         Option<Timestamp>,
    },
    SchedulesExpiringWithin {
        window_secs: i64,
        #[serde(default)]
        now:         Option<Timestamp>,
    },

    // ── Assignment ────────────────────────────────
    AssignReviewer {
        #[serde(default)]
        request: AssignmentRequest,
    },
    AssignMultipleReviewers {
        count:   i64,
        #[serde(default)]
        request: AssignmentRequest,
    },
    AdvanceRoundRobin {
        key:         String,
        list_length: i64,
    },

    // ── Delegation ────────────────────────────────
    SetBackupReviewer {
        primary_id: ReviewerId,
        backup_id:  ReviewerId,
    },
    SetTemporaryDelegation {
        primary_id: ReviewerId,
        delegation: TemporaryDelegation,
    },
    GetActiveDelegate {
        primary_id: ReviewerId,
        #[serde(default)]
        at:         Option<Timestamp>,
    },
    BulkReassign {
        from_id: ReviewerId,
        to_id:   ReviewerId,
        actor:   Actor,
        reason:  String,
    },
    DelegateDuringVacation {
        primary_id: ReviewerId,
        actor:      Actor,
    },

    // ── Housekeeping ──────────────────────────────
    DrainEvents,
    Snapshot,

    // ── Reviewer state (continued) ────────────────
    EnsureReviewer {
        reviewer_id: ReviewerId,
    },
}

impl DeskCommand {
    /// Stable name, used in log lines.
    pub fn name(&self) -> &'static str {
        match self {
            Self::GetReviewer { .. }             => "get_reviewer",
            Self::SetAvailability { .. }         => "set_availability",
            Self::SetProfile { .. }              => "set_profile",
            Self::SetMaxAssignments { .. }       => "set_max_assignments",
            Self::IncrementWorkload { .. }       => "increment_workload",
            Self::DecrementWorkload { .. }       => "decrement_workload",
            Self::CapacityPercentage { .. }      => "capacity_percentage",
            Self::RecordReview { .. }            => "record_review",
            Self::AddRating { .. }               => "add_rating",
            Self::QualityScore { .. }            => "quality_score",
            Self::AddScheduleOverride { .. }     => "add_schedule_override",
            Self::RemoveScheduleOverride { .. }  => "remove_schedule_override",
            Self::EffectiveAvailability { .. }   => "effective_availability",
            Self::CleanupExpiredSchedules { .. } => "cleanup_expired_schedules",
            Self::SchedulesExpiringWithin { .. } => "schedules_expiring_within",
            Self::AssignReviewer { .. }          => "assign_reviewer",
            Self::AssignMultipleReviewers { .. } => "assign_multiple_reviewers",
            Self::AdvanceRoundRobin { .. }       => "advance_round_robin",
            Self::SetBackupReviewer { .. }       => "set_backup_reviewer",
            Self::SetTemporaryDelegation { .. }  => "set_temporary_delegation",
            Self::GetActiveDelegate { .. }       => "get_active_delegate",
            Self::BulkReassign { .. }            => "bulk_reassign",
            Self::DelegateDuringVacation { .. }  => "delegate_during_vacation",
            Self::DrainEvents                    => "drain_events",
            Self::Snapshot                       => "snapshot",
            Self::EnsureReviewer { .. }          => "ensure_reviewer",
        }
    }
}
