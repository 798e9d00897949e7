//! Shared primitive types used across the desk.

use chrono::{DateTime, Utc};

/// A stable reviewer identifier (the key of the state store).
pub type ReviewerId = String;

/// An opaque work item identifier owned by the workflow collaborator.
pub type ItemId = String;

/// Every instant the desk reasons about is UTC.
pub type Timestamp = DateTime<Utc>;
