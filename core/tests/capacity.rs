//! Integration tests for capacity and workload.
//!
//! INVARIANT under test: 0 <= current_assignments <= max_assignments
//! after every call, whatever the call sequence.

use chrono::{TimeZone, Utc};
use rand::Rng;
use rand::SeedableRng;
use rand_pcg::Pcg64Mcg;
use review_desk_core::{
    clock::ManualClock,
    config::DeskConfig,
    error::{DeskError, ErrorCode},
    event::DeskEvent,
    reviewer::Availability,
    store::ReviewerStore,
};
use std::sync::Arc;

fn build_store() -> ReviewerStore {
    let start = Utc.with_ymd_and_hms(2026, 3, 2, 9, 0, 0).single().expect("valid start time");
    let clock = Arc::new(ManualClock::new(start));
    ReviewerStore::new(DeskConfig::default_test(), clock)
}

fn assert_invariant(store: &ReviewerStore, id: &str) {
    let (current, max) = store.workload(id);
    assert!(current <= max, "workload {current} exceeds capacity {max} for {id}");
}

// ─────────────────────────────────────────────────────────────────────────────
// Defaults and lazy creation
// ─────────────────────────────────────────────────────────────────────────────

/// The first mutation creates an AVAILABLE record with default capacity.
#[test]
fn first_access_creates_default_record() {
    let store = build_store();
    assert!(!store.contains("alice"));

    let state = store.ensure("alice").unwrap();
    assert_eq!(state.availability, Availability::Available);
    assert_eq!(state.max_assignments, 10);
    assert_eq!(state.current_assignments, 0);
    assert_eq!(state.reviews_completed, 0);
    assert!(state.ratings.is_empty());
    assert!(store.contains("alice"));
}

/// Reading an unknown reviewer returns defaults without inserting a record.
#[test]
fn reads_do_not_create_records() {
    let store = build_store();
    assert_eq!(store.capacity_percentage("ghost"), 0);
    assert_eq!(store.workload("ghost"), (0, 10));
    assert!(!store.contains("ghost"), "a read must not insert a record");
}

/// Blank reviewer ids are refused before any record is created.
#[test]
fn empty_reviewer_id_is_rejected() {
    let store = build_store();
    let err = store.increment_workload("  ", 1).unwrap_err();
    assert_eq!(err.code(), ErrorCode::InvalidReviewerId);
    assert!(store.is_empty());
}

// ─────────────────────────────────────────────────────────────────────────────
// Clamping
// ─────────────────────────────────────────────────────────────────────────────

/// Incrementing past capacity stops at the ceiling, never errors.
#[test]
fn increment_clamps_at_ceiling_every_time() {
    let store = build_store();
    store.set_max_assignments("alice", 3).unwrap();

    for _ in 0..10 {
        store.increment_workload("alice", 1).unwrap();
        assert_invariant(&store, "alice");
    }
    assert_eq!(store.workload("alice"), (3, 3));

    // A huge amount is clamped too, not rejected.
    assert_eq!(store.increment_workload("alice", i64::MAX).unwrap(), 3);
}

/// Decrementing past zero stops at zero, never errors.
#[test]
fn decrement_floors_at_zero_every_time() {
    let store = build_store();
    store.increment_workload("bob", 2).unwrap();

    for _ in 0..5 {
        store.decrement_workload("bob", 1).unwrap();
    }
    assert_eq!(store.workload("bob").0, 0);
    assert_eq!(store.decrement_workload("bob", 100).unwrap(), 0);
}

/// Zero and negative amounts are refused and leave workload untouched.
#[test]
fn non_positive_amounts_are_rejected_without_mutation() {
    let store = build_store();
    store.increment_workload("carol", 4).unwrap();

    for bad in [0, -1, -50] {
        let err = store.increment_workload("carol", bad).unwrap_err();
        assert!(matches!(err, DeskError::InvalidAmount { value } if value == bad));
        let err = store.decrement_workload("carol", bad).unwrap_err();
        assert_eq!(err.code(), ErrorCode::InvalidAmount);
    }
    assert_eq!(store.workload("carol").0, 4, "failed calls must leave workload untouched");
}

/// Lowering capacity below workload clamps it and records a WorkloadClamped event.
#[test]
fn lowering_capacity_clamps_workload_and_reports_it() {
    let store = build_store();
    store.increment_workload("dave", 8).unwrap();
    store.drain_events();

    store.set_max_assignments("dave", 5).unwrap();
    assert_eq!(store.workload("dave"), (5, 5));

    let events = store.drain_events();
    assert!(
        events.iter().any(|e| matches!(
            e,
            DeskEvent::WorkloadClamped { reviewer_id, previous: 8, current: 5, .. } if reviewer_id == "dave"
        )),
        "expected a WorkloadClamped event, got {events:?}"
    );

    // Raising capacity again does not restore the lost overflow.
    store.set_max_assignments("dave", 10).unwrap();
    assert_eq!(store.workload("dave"), (5, 10));
}

/// A negative capacity ceiling is refused.
#[test]
fn negative_capacity_is_rejected() {
    let store = build_store();
    let err = store.set_max_assignments("erin", -1).unwrap_err();
    assert_eq!(err.code(), ErrorCode::InvalidMaxAssignments);
    assert_eq!(store.workload("erin"), (0, 10));
}

// ─────────────────────────────────────────────────────────────────────────────
// Capacity percentage
// ─────────────────────────────────────────────────────────────────────────────

/// Capacity percentage rounds to the nearest whole percent.
#[test]
fn capacity_percentage_rounds_to_nearest() {
    let store = build_store();
    store.increment_workload("fay", 3).unwrap();
    assert_eq!(store.capacity_percentage("fay"), 30);

    store.set_max_assignments("gus", 3).unwrap();
    store.increment_workload("gus", 2).unwrap();
    assert_eq!(store.capacity_percentage("gus"), 67);
    assert!(!store.is_over_capacity("gus"));

    store.increment_workload("gus", 1).unwrap();
    assert_eq!(store.capacity_percentage("gus"), 100);
    assert!(store.is_over_capacity("gus"));
}

/// A reviewer with zero capacity counts as over capacity.
#[test]
fn zero_capacity_reviewer_is_always_over_capacity() {
    let store = build_store();
    store.set_max_assignments("hal", 0).unwrap();
    assert_eq!(store.increment_workload("hal", 1).unwrap(), 0);
    assert_eq!(store.capacity_percentage("hal"), 0);
    assert!(store.is_over_capacity("hal"));
}

/// An unknown availability string is refused and nothing changes.
#[test]
fn invalid_availability_string_leaves_state_unchanged() {
    let store = build_store();
    store.set_availability("ivy", Availability::Busy).unwrap();

    let err = store.set_availability_str("ivy", "ON_LEAVE").unwrap_err();
    assert_eq!(err.code(), ErrorCode::InvalidAvailability);
    assert_eq!(store.base_availability("ivy"), Availability::Busy);

    assert_eq!(store.set_availability_str("ivy", "vacation").unwrap(), Availability::Vacation);
}

// ─────────────────────────────────────────────────────────────────────────────
// Randomised sequences
// ─────────────────────────────────────────────────────────────────────────────

/// Seeded random operation sequences never break 0 <= current <= max.
#[test]
fn random_operation_sequences_preserve_invariant() {
    let store = build_store();
    let ids = ["r1", "r2", "r3"];

    for seed in [1u64, 7, 42, 0xDEAD_BEEF] {
        let mut rng = Pcg64Mcg::seed_from_u64(seed);
        for step in 0..5_000 {
            let id = ids[rng.gen_range(0..ids.len())];
            let result = match rng.gen_range(0..3) {
                0 => store.increment_workload(id, rng.gen_range(-2..15)).map(|_| ()),
                1 => store.decrement_workload(id, rng.gen_range(-2..15)).map(|_| ()),
                _ => store.set_max_assignments(id, rng.gen_range(-3..25)).map(|_| ()),
            };
            if let Err(e) = result {
                assert!(e.is_validation(), "seed={seed} step={step}: unexpected {e}");
            }
            for id in ids {
                let (current, max) = store.workload(id);
                assert!(current <= max, "seed={seed} step={step}: {id} at {current}/{max}");
            }
        }
    }
}

/// Concurrent increments and decrements on one reviewer keep the invariant.
#[test]
fn concurrent_increments_never_exceed_ceiling() {
    let store = Arc::new(build_store());
    store.set_max_assignments("shared", 50).unwrap();

    std::thread::scope(|scope| {
        for worker in 0..8 {
            let store = Arc::clone(&store);
            scope.spawn(move || {
                for i in 0..1_000 {
                    if (worker + i) % 3 == 0 {
                        store.decrement_workload("shared", 1).unwrap();
                    } else {
                        store.increment_workload("shared", 1).unwrap();
                    }
                    let (current, max) = store.workload("shared");
                    assert!(current <= max);
                }
            });
        }
    });

    let (current, max) = store.workload("shared");
    assert!(current <= max, "final workload {current} exceeds {max}");
}

/// Concurrent increments under the ceiling all land.
#[test]
fn concurrent_increments_are_not_lost() {
    let store = Arc::new(build_store());
    store.set_max_assignments("counter", 100_000).unwrap();

    std::thread::scope(|scope| {
        for _ in 0..4 {
            let store = Arc::clone(&store);
            scope.spawn(move || {
                for _ in 0..2_500 {
                    store.increment_workload("counter", 1).unwrap();
                }
            });
        }
    });

    assert_eq!(store.workload("counter").0, 10_000);
}
