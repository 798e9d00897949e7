//! Snapshot serialization: full desk state to/from JSON.
//!
//! A snapshot captures everything needed to resume the desk in another
//! process: reviewer records, delegation links and round-robin pointers.

use crate::{
    delegation::DelegationLink,
    error::DeskResult,
    reviewer::ReviewerState,
    types::{ReviewerId, Timestamp},
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DeskSnapshot {
    pub taken_at:         Timestamp,
    pub reviewers:        BTreeMap<ReviewerId, ReviewerState>,
    #[serde(default)]
    pub delegation_links: BTreeMap<ReviewerId, DelegationLink>,
    #[serde(default)]
    pub round_robin:      BTreeMap<String, usize>,
}

impl DeskSnapshot {
    pub fn to_json(&self) -> DeskResult<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_json(json: &str) -> DeskResult<Self> {
        Ok(serde_json::from_str(json)?)
    }
}
