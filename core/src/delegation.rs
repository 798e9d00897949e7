//! Delegation: who covers for an absent reviewer, and moving in-flight
//! work between reviewers with an audit trail.
//!
//! Resolution order for an absent reviewer's work:
//!   1. An active temporary delegation (`start_at <= at < end_at`)
//!   2. The static backup reviewer
//!   3. Nobody, and delegation is a successful no-op
//!
//! Bulk moves are best-effort per item. A failed item is logged and
//! counted; it never aborts the rest. Callers needing all-or-nothing
//! must wrap the call in their own transaction.

use crate::{
    availability::AvailabilityResolver,
    error::{DeskError, DeskResult},
    event::DeskEvent,
    reviewer::Availability,
    store::{validate_reviewer_id, ReviewerStore},
    types::{ReviewerId, Timestamp},
    workflow::{Actor, AuditEntry, AuditLog, WorkflowStore},
};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TemporaryDelegation {
    pub delegate_id: ReviewerId,
    pub start_at:    Timestamp,
    pub end_at:      Timestamp,
    #[serde(default)]
    pub note:        Option<String>,
}

impl TemporaryDelegation {
    pub fn is_active(&self, at: Timestamp) -> bool {
        self.start_at <= at && at < self.end_at
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DelegationLink {
    pub backup_reviewer_id: Option<ReviewerId>,
    pub temporary:          Option<TemporaryDelegation>,
}

impl DelegationLink {
    fn is_empty(&self) -> bool {
        self.backup_reviewer_id.is_none() && self.temporary.is_none()
    }
}

/// Cooperative cancellation for long bulk moves. Checked between items.
#[derive(Debug, Default)]
pub struct CancelFlag(AtomicBool);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ReassignmentOutcome {
    /// False only when items were expected and none moved.
    pub success:   bool,
    pub expected:  usize,
    pub moved:     usize,
    pub failed:    usize,
    pub cancelled: bool,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SkipReason {
    NotAbsent,
    NoDelegate,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct VacationDelegation {
    pub availability: Availability,
    pub delegate_id:  Option<ReviewerId>,
    pub skipped:      Option<SkipReason>,
    pub outcome:      ReassignmentOutcome,
}

impl VacationDelegation {
    fn skipped(availability: Availability, reason: SkipReason) -> Self {
        Self {
            availability,
            delegate_id: None,
            skipped:     Some(reason),
            outcome:     ReassignmentOutcome { success: true, ..Default::default() },
        }
    }
}

pub struct DelegationCoordinator {
    store:    Arc<ReviewerStore>,
    resolver: AvailabilityResolver,
    workflow: Arc<dyn WorkflowStore>,
    audit:    Arc<dyn AuditLog>,
    links:    RwLock<HashMap<ReviewerId, DelegationLink>>,
}

impl DelegationCoordinator {
    pub fn new(
        store:    Arc<ReviewerStore>,
        workflow: Arc<dyn WorkflowStore>,
        audit:    Arc<dyn AuditLog>,
    ) -> Self {
        Self {
            resolver: AvailabilityResolver::new(Arc::clone(&store)),
            store,
            workflow,
            audit,
            links: RwLock::new(HashMap::new()),
        }
    }

    // ── Links ──────────────────────────────────────────────────

    pub fn set_backup_reviewer(&self, primary_id: &str, backup_id: &str) -> DeskResult<()> {
        validate_pair(primary_id, backup_id)?;
        self.links
            .write()
            .entry(primary_id.to_string())
            .or_default()
            .backup_reviewer_id = Some(backup_id.to_string());
        log::info!("delegation: backup for {primary_id} set to {backup_id}");
        Ok(())
    }

    pub fn get_backup_reviewer(&self, primary_id: &str) -> Option<ReviewerId> {
        self.links
            .read()
            .get(primary_id)
            .and_then(|l| l.backup_reviewer_id.clone())
    }

    /// Returns the backup that was removed, if any.
    pub fn clear_backup_reviewer(&self, primary_id: &str) -> Option<ReviewerId> {
        self.update_link(primary_id, |link| link.backup_reviewer_id.take())
    }

    pub fn set_temporary_delegation(
        &self,
        primary_id: &str,
        delegation: TemporaryDelegation,
    ) -> DeskResult<()> {
        validate_pair(primary_id, &delegation.delegate_id)?;
        if delegation.end_at <= delegation.start_at {
            return Err(DeskError::InvalidTimeRange {
                start: delegation.start_at.to_rfc3339(),
                end:   delegation.end_at.to_rfc3339(),
            });
        }
        log::info!(
            "delegation: {primary_id} delegates to {} from {} until {}",
            delegation.delegate_id,
            delegation.start_at,
            delegation.end_at,
        );
        self.links
            .write()
            .entry(primary_id.to_string())
            .or_default()
            .temporary = Some(delegation);
        Ok(())
    }

    pub fn clear_temporary_delegation(&self, primary_id: &str) -> Option<TemporaryDelegation> {
        self.update_link(primary_id, |link| link.temporary.take())
    }

    pub fn delegation_link(&self, primary_id: &str) -> DelegationLink {
        self.links.read().get(primary_id).cloned().unwrap_or_default()
    }

    /// Temporary delegate if one is active at `at`, else the static backup.
    pub fn get_active_delegate(&self, primary_id: &str, at: Timestamp) -> Option<ReviewerId> {
        let links = self.links.read();
        let link = links.get(primary_id)?;
        link.temporary
            .as_ref()
            .filter(|t| t.is_active(at))
            .map(|t| t.delegate_id.clone())
            .or_else(|| link.backup_reviewer_id.clone())
    }

    pub fn export_links(&self) -> BTreeMap<ReviewerId, DelegationLink> {
        self.links
            .read()
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }

    pub fn import_links(&self, links: BTreeMap<ReviewerId, DelegationLink>) {
        *self.links.write() = links.into_iter().collect();
    }

    // ── Reassignment ───────────────────────────────────────────

    /// Move every work item owned by `from_id` to `to_id`.
    pub fn bulk_reassign_from_to(
        &self,
        from_id: &str,
        to_id:   &str,
        actor:   &Actor,
        reason:  &str,
    ) -> DeskResult<ReassignmentOutcome> {
        self.bulk_reassign_from_to_with_cancel(from_id, to_id, actor, reason, &CancelFlag::new())
    }

    /// As `bulk_reassign_from_to`, stopping between items once `cancel`
    /// is raised. Items already moved stay moved.
    pub fn bulk_reassign_from_to_with_cancel(
        &self,
        from_id: &str,
        to_id:   &str,
        actor:   &Actor,
        reason:  &str,
        cancel:  &CancelFlag,
    ) -> DeskResult<ReassignmentOutcome> {
        self.ensure_enabled()?;
        validate_pair(from_id, to_id)?;

        let items = self.workflow.list_work_items_assigned_to(from_id)?;
        let mut outcome = ReassignmentOutcome {
            expected: items.len(),
            ..Default::default()
        };

        for item_id in &items {
            if cancel.is_cancelled() {
                outcome.cancelled = true;
                log::warn!(
                    "delegation: bulk move {from_id} -> {to_id} cancelled after {} of {} item(s)",
                    outcome.moved,
                    outcome.expected,
                );
                break;
            }

            let at = self.store.clock().now();
            match self.workflow.reassign_work_item(item_id, from_id, to_id, at) {
                Ok(true) => {
                    outcome.moved += 1;
                    self.record_move(item_id, from_id, to_id, actor, reason, at);
                }
                Ok(false) => {
                    outcome.failed += 1;
                    log::warn!("delegation: item {item_id} no longer assigned to {from_id}; skipped");
                }
                Err(e) => {
                    outcome.failed += 1;
                    log::warn!("delegation: failed to move item {item_id} {from_id} -> {to_id}: {e}");
                }
            }
        }

        if outcome.moved > 0 {
            let moved = i64::try_from(outcome.moved).unwrap_or(i64::MAX);
            self.store.decrement_workload(from_id, moved)?;
            self.store.increment_workload(to_id, moved)?;
        }

        outcome.success = outcome.expected == 0 || outcome.moved > 0;
        log::info!(
            "delegation: moved {}/{} item(s) {from_id} -> {to_id} (failed={}, actor={})",
            outcome.moved,
            outcome.expected,
            outcome.failed,
            actor.id,
        );
        Ok(outcome)
    }

    /// If `primary_id` is AWAY or VACATION at `at`, hand its work to the
    /// active delegate. Not being absent, or having nobody to delegate to,
    /// is a success with nothing moved.
    pub fn delegate_during_vacation(
        &self,
        primary_id: &str,
        actor:      &Actor,
        at:         Timestamp,
    ) -> DeskResult<VacationDelegation> {
        self.ensure_enabled()?;
        validate_reviewer_id(primary_id)?;

        let availability = self.resolver.effective_availability(primary_id, at);
        if !availability.is_absent() {
            log::debug!("delegation: {primary_id} is {availability}; nothing to delegate");
            return Ok(VacationDelegation::skipped(availability, SkipReason::NotAbsent));
        }

        let Some(delegate_id) = self.get_active_delegate(primary_id, at) else {
            log::info!("delegation: {primary_id} is {availability} but has no delegate configured");
            return Ok(VacationDelegation::skipped(availability, SkipReason::NoDelegate));
        };

        let delegate_availability = self.resolver.effective_availability(&delegate_id, at);
        if delegate_availability.is_absent() {
            log::warn!("delegation: delegate {delegate_id} for {primary_id} is itself {delegate_availability}");
        }

        let reason = format!("{primary_id} is {availability}; work delegated to {delegate_id}");
        let outcome = self.bulk_reassign_from_to(primary_id, &delegate_id, actor, &reason)?;
        Ok(VacationDelegation {
            availability,
            delegate_id: Some(delegate_id),
            skipped: None,
            outcome,
        })
    }

    // ── Internals ──────────────────────────────────────────────

    fn ensure_enabled(&self) -> DeskResult<()> {
        if self.store.config().delegation.enabled {
            Ok(())
        } else {
            Err(DeskError::DelegationDisabled)
        }
    }

    fn record_move(
        &self,
        item_id:   &str,
        from_id:   &str,
        to_id:     &str,
        actor:     &Actor,
        reason:    &str,
        timestamp: Timestamp,
    ) {
        let entry = AuditEntry {
            item_id:          item_id.to_string(),
            from_reviewer_id: from_id.to_string(),
            to_reviewer_id:   to_id.to_string(),
            actor_id:         actor.id.clone(),
            actor_email:      actor.email.clone(),
            reason:           reason.to_string(),
            timestamp,
        };
        // The item has already moved; a lost audit row must not undo that.
        if let Err(e) = self.audit.record(&entry) {
            log::warn!("delegation: audit entry for item {item_id} not recorded: {e}");
        }
        self.store.emit(DeskEvent::WorkItemReassigned {
            at:               timestamp,
            item_id:          item_id.to_string(),
            from_reviewer_id: from_id.to_string(),
            to_reviewer_id:   to_id.to_string(),
        });
    }

    fn update_link<R>(&self, primary_id: &str, f: impl FnOnce(&mut DelegationLink) -> Option<R>) -> Option<R> {
        let mut links = self.links.write();
        let link = links.get_mut(primary_id)?;
        let out = f(link);
        if link.is_empty() {
            links.remove(primary_id);
        }
        out
    }
}

fn validate_pair(primary_id: &str, other_id: &str) -> DeskResult<()> {
    validate_reviewer_id(primary_id)?;
    validate_reviewer_id(other_id)?;
    if primary_id == other_id {
        return Err(DeskError::InvalidDelegate { reviewer_id: primary_id.to_string() });
    }
    Ok(())
}
