//! Integration tests for the engine facade: response shape, JSON command
//! dispatch, snapshots and config loading.

use chrono::{DateTime, Duration, TimeZone, Utc};
use review_desk_core::{
    clock::ManualClock,
    command::DeskCommand,
    config::DeskConfig,
    engine::{build_test, DeskEngine},
    error::ErrorCode,
    event::DeskEvent,
    ledger::SqliteLedger,
    response::ApiResponse,
    reviewer::Availability,
    scoring::{Algorithm, AssignmentRequest},
    snapshot::DeskSnapshot,
    workflow::Actor,
};
use serde_json::json;
use std::sync::Arc;

fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 2, 9, 0, 0).single().expect("valid start time")
}

fn build() -> (DeskEngine, Arc<SqliteLedger>) {
    let clock = Arc::new(ManualClock::new(t0()));
    build_test(clock).expect("build test engine")
}

fn run(engine: &DeskEngine, value: serde_json::Value) -> ApiResponse<serde_json::Value> {
    let command: DeskCommand = serde_json::from_value(value).unwrap();
    engine.execute(command)
}

// ─────────────────────────────────────────────────────────────────────────────
// Response shape
// ─────────────────────────────────────────────────────────────────────────────

/// A failed call carries a stable code and no data.
#[test]
fn validation_failure_has_code_and_no_data() {
    let (engine, _) = build();

    let response = engine.add_rating("ana", 6);
    assert!(!response.success);
    assert!(response.data.is_none());
    assert_eq!(response.code, Some(ErrorCode::InvalidRating));

    let json = serde_json::to_value(&response).unwrap();
    assert_eq!(json["success"], json!(false));
    assert_eq!(json["code"], json!("INVALID_RATING"));
    assert!(json["error"].is_string());
    assert!(json.get("data").is_none(), "absent fields are skipped");
}

/// A successful call serializes as success plus data only.
#[test]
fn success_carries_data_and_no_code() {
    let (engine, _) = build();

    let json = serde_json::to_value(engine.increment_workload("ana", 4)).unwrap();
    assert_eq!(json, json!({ "success": true, "data": 4 }));
}

/// Each validation failure maps to its SCREAMING_SNAKE code.
#[test]
fn every_error_code_renders_screaming_snake_case() {
    let (engine, _) = build();

    let cases = [
        (engine.set_availability("a", "ON_LEAVE").code, "INVALID_AVAILABILITY"),
        (engine.set_max_assignments("a", -1).code, "INVALID_MAX_ASSIGNMENTS"),
        (engine.increment_workload("a", 0).code, "INVALID_AMOUNT"),
        (engine.record_review("a", -5, true).code, "INVALID_DURATION"),
        (
            engine
                .add_schedule_override("a", "AVAILABLE", t0(), t0() + Duration::hours(1), None)
                .code,
            "INVALID_SCHEDULE_AVAILABILITY",
        ),
        (
            engine
                .add_schedule_override("a", "AWAY", t0(), t0() - Duration::hours(1), None)
                .code,
            "INVALID_TIME_RANGE",
        ),
        (engine.assign_multiple_reviewers(0, &AssignmentRequest::default()).code, "INVALID_COUNT"),
    ];
    for (code, expected) in cases {
        let code = code.expect("failure carries a code");
        assert_eq!(code.as_str(), expected);
        assert_eq!(serde_json::to_value(code).unwrap(), json!(expected));
    }
}

/// An unknown availability on a schedule gets the schedule-specific code.
#[test]
fn unparseable_schedule_availability_is_its_own_code() {
    let (engine, _) = build();
    let response = engine.add_schedule_override("a", "SICK", t0(), t0() + Duration::hours(1), None);
    assert_eq!(response.code, Some(ErrorCode::InvalidScheduleAvailability));
}

// ─────────────────────────────────────────────────────────────────────────────
// Command dispatch
// ─────────────────────────────────────────────────────────────────────────────

/// JSON commands dispatch to the matching engine operation.
#[test]
fn json_commands_drive_the_engine() {
    let (engine, _) = build();

    let r = run(&engine, json!({ "cmd": "increment_workload", "reviewer_id": "ana" }));
    assert_eq!(r.data, Some(json!(1)), "amount defaults to 1");

    let r = run(&engine, json!({ "cmd": "set_availability", "reviewer_id": "ben", "availability": "busy" }));
    assert_eq!(r.data, Some(json!("BUSY")));

    let r = run(&engine, json!({ "cmd": "capacity_percentage", "reviewer_id": "ana" }));
    assert_eq!(r.data, Some(json!(10)));

    let r = run(
        &engine,
        json!({
            "cmd": "assign_reviewer",
            "request": { "candidates": { "ids": ["ana", "ben", "cy"] }, "algorithm": "WORKLOAD" }
        }),
    );
    assert!(r.success);
    let data = r.data.unwrap();
    assert_eq!(data["reviewerId"], json!("cy"), "ben is busy, ana has work");
    assert_eq!(data["score"], json!(100));

    let r = run(&engine, json!({ "cmd": "add_rating", "reviewer_id": "ana", "rating": 0 }));
    assert_eq!(r.code, Some(ErrorCode::InvalidRating));
}

/// A command's name matches its serde tag.
#[test]
fn command_names_match_their_tags() {
    let command: DeskCommand =
        serde_json::from_value(json!({ "cmd": "advance_round_robin", "key": "cat", "list_length": 3 }))
            .unwrap();
    assert_eq!(command.name(), "advance_round_robin");

    let command: DeskCommand = serde_json::from_value(json!({ "cmd": "drain_events" })).unwrap();
    assert_eq!(command.name(), "drain_events");
}

/// Delegation works end to end through JSON commands.
#[test]
fn delegation_commands_round_trip_through_json() {
    let (engine, ledger) = build();
    ledger.assign_work_item("item-1", "P", t0()).unwrap();

    run(&engine, json!({ "cmd": "set_backup_reviewer", "primary_id": "P", "backup_id": "Q" }));
    run(&engine, json!({ "cmd": "set_availability", "reviewer_id": "P", "availability": "VACATION" }));

    let r = run(
        &engine,
        json!({
            "cmd": "delegate_during_vacation",
            "primary_id": "P",
            "actor": { "id": "admin-1", "email": "admin@example.com" }
        }),
    );
    assert!(r.success);
    let data = r.data.unwrap();
    assert_eq!(data["delegateId"], json!("Q"));
    assert_eq!(data["outcome"]["moved"], json!(1));
    assert_eq!(ledger.work_item_owner("item-1").unwrap().as_deref(), Some("Q"));
}

// ─────────────────────────────────────────────────────────────────────────────
// Events
// ─────────────────────────────────────────────────────────────────────────────

/// Drained events are handed out exactly once.
#[test]
fn drained_events_are_not_repeated() {
    let (engine, _) = build();
    engine.increment_workload("ana", 8);
    engine.set_max_assignments("ana", 5);

    let events = engine.drain_events();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].event_type(), "workload_clamped");
    assert!(matches!(
        &events[0],
        DeskEvent::WorkloadClamped { previous: 8, current: 5, .. }
    ));
    assert!(engine.drain_events().is_empty());
}

/// A full journal evicts its oldest events and counts them until drained.
#[test]
fn event_journal_evicts_oldest_past_capacity() {
    let clock = Arc::new(ManualClock::new(t0()));
    let ledger = Arc::new(SqliteLedger::in_memory().expect("open in-memory ledger"));
    ledger.migrate().expect("migrate ledger");
    let mut config = DeskConfig::default_test();
    config.event_journal_capacity = 3;
    let engine = DeskEngine::with_ledger(config, clock, ledger);

    let ids: Vec<String> = (0..5)
        .map(|i| {
            let start = t0() + Duration::days(i);
            engine
                .add_schedule_override("ana", "AWAY", start, start + Duration::hours(4), None)
                .data
                .unwrap()
                .id
        })
        .collect();

    assert_eq!(engine.store().pending_events(), 3);
    assert_eq!(engine.store().dropped_events(), 2);

    let kept: Vec<String> = engine
        .drain_events()
        .into_iter()
        .filter_map(|e| match e {
            DeskEvent::ScheduleAdded { override_id, .. } => Some(override_id),
            _ => None,
        })
        .collect();
    assert_eq!(kept, ids[2..].to_vec(), "the two oldest events were evicted");
    assert_eq!(engine.store().dropped_events(), 0, "drain resets the eviction count");
}

// ─────────────────────────────────────────────────────────────────────────────
// Snapshots
// ─────────────────────────────────────────────────────────────────────────────

/// A JSON snapshot restores reviewers, links and cursors into a new engine.
#[test]
fn snapshot_restores_into_a_fresh_engine() {
    let clock = Arc::new(ManualClock::new(t0()));
    let (engine, _) = build_test(clock.clone()).expect("build test engine");
    engine.increment_workload("ana", 3);
    engine.record_review("ana", 90_000, true);
    engine.add_rating("ana", 5);
    engine.set_profile("ana", vec!["TOYS".into()], Some("HOME".into()));
    engine.add_schedule_override("ben", "VACATION", t0(), t0() + Duration::days(3), None);
    engine.set_backup_reviewer("ben", "ana");
    engine.advance_round_robin("cat", 4);

    let json = engine.snapshot().to_json().unwrap();
    let snapshot = DeskSnapshot::from_json(&json).unwrap();

    let (fresh, _) = build_test(clock).expect("build test engine");
    fresh.restore(snapshot);

    assert_eq!(fresh.get_reviewer("ana").data, engine.get_reviewer("ana").data);
    assert_eq!(fresh.quality_score("ana").data, engine.quality_score("ana").data);
    assert_eq!(
        fresh.effective_availability("ben", None).data,
        Some(Availability::Vacation),
    );
    assert_eq!(fresh.get_backup_reviewer("ben").data, Some(Some("ana".to_string())));
    assert_eq!(fresh.scorer().round_robin_pointer("cat"), 1);

    // New overrides after restore do not collide with restored ones.
    let added = fresh
        .add_schedule_override("ben", "AWAY", t0(), t0() + Duration::hours(1), None)
        .data
        .unwrap();
    let restored = &fresh.schedule_overrides("ben").data.unwrap()[0];
    assert!(added.created_seq > restored.created_seq);
}

/// Snapshotting a restored engine reproduces the original snapshot.
#[test]
fn snapshot_after_restore_is_identical() {
    let clock = Arc::new(ManualClock::new(t0()));
    let (engine, _) = build_test(clock.clone()).expect("build test engine");
    engine.increment_workload("ana", 2);
    engine.set_backup_reviewer("ana", "ben");
    let first = engine.snapshot();

    let (fresh, _) = build_test(clock).expect("build test engine");
    fresh.restore(first.clone());
    assert_eq!(fresh.snapshot(), first);
}

// ─────────────────────────────────────────────────────────────────────────────
// Assignment through the facade
// ─────────────────────────────────────────────────────────────────────────────

/// Engine lookups of unknown ids do not register them as candidates.
#[test]
fn engine_reads_do_not_register_reviewers() {
    let (engine, _) = build();
    engine.increment_workload("alice", 3);

    let typo = engine.get_reviewer("alcie");
    assert!(typo.success);
    assert_eq!(typo.data.unwrap().current_assignments, 0);
    run(&engine, json!({ "cmd": "get_reviewer", "reviewer_id": "zed" }));
    assert_eq!(engine.store().reviewer_ids(), vec!["alice".to_string()]);

    let top = engine.assign_reviewer(&AssignmentRequest::default()).data.unwrap();
    assert_eq!(top.reviewer_id, "alice");
    assert_eq!(top.score, 70);

    let response = engine.get_reviewer(" ");
    assert_eq!(response.code, Some(ErrorCode::InvalidReviewerId));
}

/// ensure_reviewer is the explicit way to register a reviewer.
#[test]
fn ensure_reviewer_registers_explicitly() {
    let (engine, _) = build();

    let r = run(&engine, json!({ "cmd": "ensure_reviewer", "reviewer_id": "bob" }));
    assert!(r.success);
    assert_eq!(r.data.unwrap()["max_assignments"], json!(10));
    assert!(engine.ensure_reviewer("cy").success);
    assert_eq!(engine.store().reviewer_ids(), vec!["bob".to_string(), "cy".to_string()]);
}

/// The preview's first entry is what assign_reviewer returns.
#[test]
fn preview_and_assign_agree() {
    let (engine, _) = build();
    for (id, load) in [("a", 4), ("b", 2)] {
        engine.increment_workload(id, load);
    }
    let request = AssignmentRequest::new(Algorithm::Workload);
    let preview = engine.preview_ranking(&request).data.unwrap();
    let top = engine.assign_reviewer(&request).data.unwrap();
    assert_eq!(preview[0], top);
    assert_eq!(top.reviewer_id, "b");
}

/// Bulk reassignment reports its outcome through the response.
#[test]
fn bulk_reassign_reports_through_response() {
    let (engine, ledger) = build();
    ledger.assign_work_item("x", "P", t0()).unwrap();
    let response = engine.bulk_reassign_from_to("P", "Q", &Actor::new("a", "a@example.com"), "cover");
    assert!(response.success);
    assert_eq!(response.data.unwrap().moved, 1);
}

// ─────────────────────────────────────────────────────────────────────────────
// Config
// ─────────────────────────────────────────────────────────────────────────────

/// The test config is the default config.
#[test]
fn default_test_matches_defaults() {
    let config = DeskConfig::default_test();
    assert_eq!(config, DeskConfig::default());
    assert_eq!(config.default_max_assignments, 10);
    assert_eq!(config.rating_window, 100);
    assert!(config.delegation.enabled);
}

/// Fields missing from the config file fall back to defaults.
#[test]
fn config_loads_from_data_dir_with_defaults_for_missing_fields() {
    let dir = std::env::temp_dir().join(format!("desk-config-{}", uuid::Uuid::new_v4()));
    std::fs::create_dir_all(dir.join("desk")).unwrap();
    std::fs::write(
        dir.join("desk").join("desk_config.json"),
        r#"{ "default_max_assignments": 4, "delegation": { "enabled": false } }"#,
    )
    .unwrap();

    let config = DeskConfig::load(dir.to_str().unwrap()).unwrap();
    assert_eq!(config.default_max_assignments, 4);
    assert!(!config.delegation.enabled);
    assert_eq!(config.rating_window, 100);

    std::fs::remove_dir_all(&dir).unwrap();
}

/// Zero rating window or journal capacity, or a missing file, fails to load.
#[test]
fn config_rejects_zero_windows() {
    let dir = std::env::temp_dir().join(format!("desk-config-{}", uuid::Uuid::new_v4()));
    std::fs::create_dir_all(dir.join("desk")).unwrap();
    std::fs::write(dir.join("desk").join("desk_config.json"), r#"{ "rating_window": 0 }"#).unwrap();

    assert!(DeskConfig::load(dir.to_str().unwrap()).is_err());
    assert!(DeskConfig::load("/nonexistent/desk-data").is_err());

    std::fs::write(dir.join("desk").join("desk_config.json"), r#"{ "event_journal_capacity": 0 }"#).unwrap();
    assert!(DeskConfig::load(dir.to_str().unwrap()).is_err());

    std::fs::remove_dir_all(&dir).unwrap();
}

/// The shipped data/desk/desk_config.json matches the defaults.
#[test]
fn shipped_config_parses() {
    let data_dir = concat!(env!("CARGO_MANIFEST_DIR"), "/../data");
    let config = DeskConfig::load(data_dir).unwrap();
    assert_eq!(config, DeskConfig::default());
}
