//! Collaborators the coordinator calls into.
//!
//! The desk does not own work items; it only asks the workflow side to
//! list and move them, and hands every successful move to the audit log.

use crate::{
    error::DeskResult,
    types::{ItemId, ReviewerId, Timestamp},
};
use serde::{Deserialize, Serialize};

pub trait WorkflowStore: Send + Sync {
    fn list_work_items_assigned_to(&self, reviewer_id: &str) -> DeskResult<Vec<ItemId>>;

    /// Move one item, stamped `at`. `Ok(false)` means the item was not
    /// (or no longer) assigned to `from_reviewer_id`.
    fn reassign_work_item(
        &self,
        item_id:          &str,
        from_reviewer_id: &str,
        to_reviewer_id:   &str,
        at:               Timestamp,
    ) -> DeskResult<bool>;
}

pub trait AuditLog: Send + Sync {
    fn record(&self, entry: &AuditEntry) -> DeskResult<()>;
}

/// Who asked for a reassignment.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Actor {
    pub id:    String,
    pub email: String,
}

impl Actor {
    pub fn new(id: impl Into<String>, email: impl Into<String>) -> Self {
        Self { id: id.into(), email: email.into() }
    }
}

/// One entry per successfully moved work item.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AuditEntry {
    pub item_id:          ItemId,
    pub from_reviewer_id: ReviewerId,
    pub to_reviewer_id:   ReviewerId,
    pub actor_id:         String,
    pub actor_email:      String,
    pub reason:           String,
    pub timestamp:        Timestamp,
}
