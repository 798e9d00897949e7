//! The desk engine: wires the store, resolver, scorer and coordinator
//! and exposes every operation in the uniform response shape.
//!
//! DEPENDENCY ORDER (leaves first):
//!   1. ReviewerStore          (no dependencies)
//!   2. AvailabilityResolver   (store)
//!   3. AssignmentScorer       (store + resolver logic)
//!   4. DelegationCoordinator  (store + resolver + workflow collaborators)
//!
//! RULES:
//!   - The store is an explicit dependency; there is no global instance.
//!   - Read-side operations take an explicit as-of instant; `None`
//!     means the engine clock's "now".
//!   - Typed access stays available through the component accessors.

use crate::{
    availability::{AvailabilityResolver, ExpiringSchedule},
    clock::Clock,
    command::DeskCommand,
    config::DeskConfig,
    delegation::{
        DelegationCoordinator, ReassignmentOutcome, TemporaryDelegation, VacationDelegation,
    },
    error::{DeskError, DeskResult},
    event::DeskEvent,
    ledger::SqliteLedger,
    response::ApiResponse,
    reviewer::{Availability, ReviewerState, ScheduleOverride},
    scoring::{AssignmentRequest, AssignmentResult, AssignmentScorer},
    snapshot::DeskSnapshot,
    store::{validate_reviewer_id, ReviewerStore},
    types::{ReviewerId, Timestamp},
    workflow::{Actor, AuditLog, WorkflowStore},
};
use chrono::Duration;
use std::sync::Arc;

pub struct DeskEngine {
    clock:       Arc<dyn Clock>,
    store:       Arc<ReviewerStore>,
    resolver:    AvailabilityResolver,
    scorer:      AssignmentScorer,
    coordinator: DelegationCoordinator,
}

impl DeskEngine {
    pub fn new(
        config:   DeskConfig,
        clock:    Arc<dyn Clock>,
        workflow: Arc<dyn WorkflowStore>,
        audit:    Arc<dyn AuditLog>,
    ) -> Self {
        let store = Arc::new(ReviewerStore::new(config, Arc::clone(&clock)));
        Self {
            clock,
            resolver:    AvailabilityResolver::new(Arc::clone(&store)),
            scorer:      AssignmentScorer::new(Arc::clone(&store)),
            coordinator: DelegationCoordinator::new(Arc::clone(&store), workflow, audit),
            store,
        }
    }

    /// Engine whose workflow and audit collaborators are one SQLite ledger.
    pub fn with_ledger(config: DeskConfig, clock: Arc<dyn Clock>, ledger: Arc<SqliteLedger>) -> Self {
        let workflow: Arc<dyn WorkflowStore> = ledger.clone();
        let audit: Arc<dyn AuditLog> = ledger;
        Self::new(config, clock, workflow, audit)
    }

    pub fn store(&self) -> &Arc<ReviewerStore> {
        &self.store
    }

    pub fn resolver(&self) -> &AvailabilityResolver {
        &self.resolver
    }

    pub fn scorer(&self) -> &AssignmentScorer {
        &self.scorer
    }

    pub fn coordinator(&self) -> &DelegationCoordinator {
        &self.coordinator
    }

    pub fn config(&self) -> &DeskConfig {
        self.store.config()
    }

    pub fn now(&self) -> Timestamp {
        self.clock.now()
    }

    // ── Reviewer state ─────────────────────────────────────────

    /// Read-only: an unknown reviewer reads as defaults and is not created.
    pub fn get_reviewer(&self, reviewer_id: &str) -> ApiResponse<ReviewerState> {
        validate_reviewer_id(reviewer_id)
            .map(|()| self.store.get_reviewer(reviewer_id))
            .into()
    }

    /// Register a reviewer with default state if it is not known yet.
    pub fn ensure_reviewer(&self, reviewer_id: &str) -> ApiResponse<ReviewerState> {
        self.store.ensure(reviewer_id).into()
    }

    pub fn set_availability(&self, reviewer_id: &str, value: &str) -> ApiResponse<Availability> {
        self.store.set_availability_str(reviewer_id, value).into()
    }

    pub fn set_profile(
        &self,
        reviewer_id: &str,
        specialties: Vec<String>,
        department:  Option<String>,
    ) -> ApiResponse<()> {
        self.store.set_profile(reviewer_id, specialties, department).into()
    }

    pub fn set_max_assignments(&self, reviewer_id: &str, max: i64) -> ApiResponse<u32> {
        self.store.set_max_assignments(reviewer_id, max).into()
    }

    pub fn increment_workload(&self, reviewer_id: &str, amount: i64) -> ApiResponse<u32> {
        self.store.increment_workload(reviewer_id, amount).into()
    }

    pub fn decrement_workload(&self, reviewer_id: &str, amount: i64) -> ApiResponse<u32> {
        self.store.decrement_workload(reviewer_id, amount).into()
    }

    pub fn capacity_percentage(&self, reviewer_id: &str) -> ApiResponse<u32> {
        ApiResponse::ok(self.store.capacity_percentage(reviewer_id))
    }

    pub fn is_over_capacity(&self, reviewer_id: &str) -> ApiResponse<bool> {
        ApiResponse::ok(self.store.is_over_capacity(reviewer_id))
    }

    pub fn record_review(&self, reviewer_id: &str, duration_ms: i64, approved: bool) -> ApiResponse<()> {
        self.store.record_review(reviewer_id, duration_ms, approved).into()
    }

    pub fn add_rating(&self, reviewer_id: &str, rating: i64) -> ApiResponse<()> {
        self.store.add_rating(reviewer_id, rating).into()
    }

    pub fn rating(&self, reviewer_id: &str) -> ApiResponse<f64> {
        ApiResponse::ok(self.store.rating(reviewer_id))
    }

    pub fn quality_score(&self, reviewer_id: &str) -> ApiResponse<u32> {
        ApiResponse::ok(self.store.quality_score(reviewer_id))
    }

    // ── Schedules ──────────────────────────────────────────────

    pub fn add_schedule_override(
        &self,
        reviewer_id:  &str,
        availability: &str,
        start_at:     Timestamp,
        end_at:       Timestamp,
        note:         Option<String>,
    ) -> ApiResponse<ScheduleOverride> {
        let result = availability
            .parse::<Availability>()
            .map_err(|_| DeskError::InvalidScheduleAvailability { value: availability.to_string() })
            .and_then(|a| self.store.add_schedule_override(reviewer_id, a, start_at, end_at, note));
        result.into()
    }

    pub fn remove_schedule_override(&self, reviewer_id: &str, override_id: &str) -> ApiResponse<bool> {
        self.store.remove_schedule_override(reviewer_id, override_id).into()
    }

    pub fn schedule_overrides(&self, reviewer_id: &str) -> ApiResponse<Vec<ScheduleOverride>> {
        ApiResponse::ok(self.store.schedule_overrides(reviewer_id))
    }

    pub fn effective_availability(&self, reviewer_id: &str, at: Option<Timestamp>) -> ApiResponse<Availability> {
        let at = at.unwrap_or_else(|| self.now());
        ApiResponse::ok(self.resolver.effective_availability(reviewer_id, at))
    }

    pub fn cleanup_expired_schedules(
        &self,
        reviewer_id: Option<&str>,
        now:         Option<Timestamp>,
    ) -> ApiResponse<usize> {
        let now = now.unwrap_or_else(|| self.now());
        ApiResponse::ok(self.resolver.cleanup_expired_schedules(reviewer_id, now))
    }

    pub fn schedules_expiring_within(
        &self,
        window: Duration,
        now:    Option<Timestamp>,
    ) -> ApiResponse<Vec<ExpiringSchedule>> {
        let now = now.unwrap_or_else(|| self.now());
        self.resolver.schedules_expiring_within(window, now).into()
    }

    // ── Assignment ─────────────────────────────────────────────

    pub fn assign_reviewer(&self, request: &AssignmentRequest) -> ApiResponse<AssignmentResult> {
        self.scorer.assign_reviewer(request).into()
    }

    pub fn assign_multiple_reviewers(
        &self,
        count:   i64,
        request: &AssignmentRequest,
    ) -> ApiResponse<Vec<AssignmentResult>> {
        self.scorer.assign_multiple_reviewers(count, request).into()
    }

    pub fn preview_ranking(&self, request: &AssignmentRequest) -> ApiResponse<Vec<AssignmentResult>> {
        self.scorer.rank(request).into()
    }

    pub fn advance_round_robin(&self, key: &str, list_length: i64) -> ApiResponse<usize> {
        self.scorer.advance_round_robin(key, list_length).into()
    }

    // ── Delegation ─────────────────────────────────────────────

    pub fn set_backup_reviewer(&self, primary_id: &str, backup_id: &str) -> ApiResponse<()> {
        self.coordinator.set_backup_reviewer(primary_id, backup_id).into()
    }

    pub fn get_backup_reviewer(&self, primary_id: &str) -> ApiResponse<Option<ReviewerId>> {
        ApiResponse::ok(self.coordinator.get_backup_reviewer(primary_id))
    }

    pub fn set_temporary_delegation(
        &self,
        primary_id: &str,
        delegation: TemporaryDelegation,
    ) -> ApiResponse<()> {
        self.coordinator.set_temporary_delegation(primary_id, delegation).into()
    }

    pub fn get_active_delegate(&self, primary_id: &str, at: Option<Timestamp>) -> ApiResponse<Option<ReviewerId>> {
        let at = at.unwrap_or_else(|| self.now());
        ApiResponse::ok(self.coordinator.get_active_delegate(primary_id, at))
    }

    pub fn bulk_reassign_from_to(
        &self,
        from_id: &str,
        to_id:   &str,
        actor:   &Actor,
        reason:  &str,
    ) -> ApiResponse<ReassignmentOutcome> {
        self.coordinator.bulk_reassign_from_to(from_id, to_id, actor, reason).into()
    }

    pub fn delegate_during_vacation(&self, primary_id: &str, actor: &Actor) -> ApiResponse<VacationDelegation> {
        self.coordinator
            .delegate_during_vacation(primary_id, actor, self.now())
            .into()
    }

    // ── Events & snapshots ─────────────────────────────────────

    pub fn drain_events(&self) -> Vec<DeskEvent> {
        self.store.drain_events()
    }

    pub fn snapshot(&self) -> DeskSnapshot {
        DeskSnapshot {
            taken_at:         self.now(),
            reviewers:        self.store.export(),
            delegation_links: self.coordinator.export_links(),
            round_robin:      self.scorer.export_round_robin().into_iter().collect(),
        }
    }

    /// Replace all in-process state with `snapshot`.
    pub fn restore(&self, snapshot: DeskSnapshot) {
        log::info!(
            "engine: restoring snapshot taken at {} ({} reviewer(s))",
            snapshot.taken_at,
            snapshot.reviewers.len(),
        );
        self.store.import(snapshot.reviewers);
        self.coordinator.import_links(snapshot.delegation_links);
        self.scorer.import_round_robin(snapshot.round_robin.into_iter().collect());
    }

    // ── Command dispatch ───────────────────────────────────────

    pub fn execute(&self, command: DeskCommand) -> ApiResponse<serde_json::Value> {
        log::debug!("engine: executing {}", command.name());
        match command {
            DeskCommand::GetReviewer { reviewer_id } => self.get_reviewer(&reviewer_id).into_json(),
            DeskCommand::SetAvailability { reviewer_id, availability } => {
                self.set_availability(&reviewer_id, &availability).into_json()
            }
            DeskCommand::SetProfile { reviewer_id, specialties, department } => {
                self.set_profile(&reviewer_id, specialties, department).into_json()
            }
            DeskCommand::SetMaxAssignments { reviewer_id, max } => {
                self.set_max_assignments(&reviewer_id, max).into_json()
            }
            DeskCommand::IncrementWorkload { reviewer_id, amount } => {
                self.increment_workload(&reviewer_id, amount).into_json()
            }
            DeskCommand::DecrementWorkload { reviewer_id, amount } => {
                self.decrement_workload(&reviewer_id, amount).into_json()
            }
            DeskCommand::CapacityPercentage { reviewer_id } => {
                self.capacity_percentage(&reviewer_id).into_json()
            }
            DeskCommand::RecordReview { reviewer_id, duration_ms, approved } => {
                self.record_review(&reviewer_id, duration_ms, approved).into_json()
            }
            DeskCommand::AddRating { reviewer_id, rating } => {
                self.add_rating(&reviewer_id, rating).into_json()
            }
            DeskCommand::QualityScore { reviewer_id } => self.quality_score(&reviewer_id).into_json(),
            DeskCommand::AddScheduleOverride { reviewer_id, availability, start_at, end_at, note } => {
                self.add_schedule_override(&reviewer_id, &availability, start_at, end_at, note)
                    .into_json()
            }
            DeskCommand::RemoveScheduleOverride { reviewer_id, override_id } => {
                self.remove_schedule_override(&reviewer_id, &override_id).into_json()
            }
            DeskCommand::EffectiveAvailability { reviewer_id, at } => {
                self.effective_availability(&reviewer_id, at).into_json()
            }
            DeskCommand::CleanupExpiredSchedules { reviewer_id, now } => {
                self.cleanup_expired_schedules(reviewer_id.as_deref(), now).into_json()
            }
            DeskCommand::SchedulesExpiringWithin { window_secs, now } => {
                match Duration::try_seconds(window_secs) {
                    Some(window) => self.schedules_expiring_within(window, now).into_json(),
                    None => ApiResponse::err(&DeskError::InvalidWindow { seconds: window_secs }),
                }
            }
            DeskCommand::AssignReviewer { request } => self.assign_reviewer(&request).into_json(),
            DeskCommand::AssignMultipleReviewers { count, request } => {
                self.assign_multiple_reviewers(count, &request).into_json()
            }
            DeskCommand::AdvanceRoundRobin { key, list_length } => {
                self.advance_round_robin(&key, list_length).into_json()
            }
            DeskCommand::SetBackupReviewer { primary_id, backup_id } => {
                self.set_backup_reviewer(&primary_id, &backup_id).into_json()
            }
            DeskCommand::SetTemporaryDelegation { primary_id, delegation } => {
                self.set_temporary_delegation(&primary_id, delegation).into_json()
            }
            DeskCommand::GetActiveDelegate { primary_id, at } => {
                self.get_active_delegate(&primary_id, at).into_json()
            }
            DeskCommand::BulkReassign { from_id, to_id, actor, reason } => {
                self.bulk_reassign_from_to(&from_id, &to_id, &actor, &reason).into_json()
            }
            DeskCommand::DelegateDuringVacation { primary_id, actor } => {
                self.delegate_during_vacation(&primary_id, &actor).into_json()
            }
            DeskCommand::DrainEvents => ApiResponse::ok(self.drain_events()).into_json(),
            DeskCommand::Snapshot => ApiResponse::ok(self.snapshot()).into_json(),
            DeskCommand::EnsureReviewer { reviewer_id } => self.ensure_reviewer(&reviewer_id).into_json(),
        }
    }
}

/// Build an engine over a fresh, migrated in-memory ledger.
/// Returns the ledger too so tests can seed and inspect work items.
pub fn build_test(clock: Arc<dyn Clock>) -> DeskResult<(DeskEngine, Arc<SqliteLedger>)> {
    let ledger = Arc::new(SqliteLedger::in_memory()?);
    ledger.migrate()?;
    let engine = DeskEngine::with_ledger(DeskConfig::default_test(), clock, Arc::clone(&ledger));
    Ok((engine, ledger))
}
