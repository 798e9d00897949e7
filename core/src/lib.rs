//! Reviewer capacity and assignment engine.
//!
//! Keeps per-reviewer availability, capacity, workload and quality
//! metrics consistent, ranks reviewers for new work, and moves work
//! between reviewers when someone is away.

pub mod availability;
pub mod clock;
pub mod command;
pub mod config;
pub mod delegation;
pub mod engine;
pub mod error;
pub mod event;
pub mod ledger;
pub mod response;
pub mod reviewer;
pub mod scoring;
pub mod snapshot;
pub mod store;
pub mod types;
pub mod workflow;
