//! Edge case tests for waitlist-engine
//!
//! These tests cover boundary conditions and unusual inputs.

use chrono::{TimeZone, Utc};
use waitlist_engine::{
    clock::parse_timestamp, schema::new_entry, ActionKind, CollectionSchema, Origin, Record,
    Store, StoreSnapshot, SyncAction, Timestamp,
};
use serde_json::json;

fn now() -> Timestamp {
    Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap()
}

fn entry(queue: i64, name: &str, seats: i64) -> Record {
    let mut record = new_entry(queue, None);
    record.set("entry_name", json!(name));
    record.set("entry_seats", json!(seats));
    record.set("entry_phone", json!("555-0100"));
    record
}

// ============================================================================
// Matching Edge Cases
// ============================================================================

#[test]
fn unicode_names_match_exactly() {
    let schema = CollectionSchema::entries();
    let names = ["日本語テスト", "Привет мир", "🎉🚀", "Hello\nWorld\tTab"];

    for name in names {
        let local = vec![entry(14, name, 2).with_id(-1)];
        let remote = vec![entry(14, name, 2).with_id(40)];
        let plan = schema.reconciler().plan(&local, &remote);
        assert_eq!(plan.count(ActionKind::CreateOnLocal), 1, "failed for {:?}", name);
    }
}

#[test]
fn names_differing_in_case_do_not_match() {
    let schema = CollectionSchema::entries();
    let local = vec![entry(14, "alice", 2).with_id(-1)];
    let remote = vec![entry(14, "Alice", 2).with_id(40)];

    let plan = schema.reconciler().plan(&local, &remote);
    assert_eq!(plan.count(ActionKind::CreateOnServer), 1);
}

#[test]
fn queue_id_as_string_matches_number() {
    let schema = CollectionSchema::entries();
    let local = vec![entry(14, "Al", 2)
        .with_id(-1)
        .with_field("entry_queue_id", json!("14"))];
    let remote = vec![entry(14, "Al", 2).with_id(40)];

    let plan = schema.reconciler().plan(&local, &remote);
    assert_eq!(plan.count(ActionKind::CreateOnLocal), 1);
}

#[test]
fn null_and_missing_fields_differ() {
    let schema = CollectionSchema::entries();
    let mut local = entry(14, "Al", 2).with_id(-1);
    local.set("entry_seats", json!(null));
    let mut remote = entry(14, "Al", 2).with_id(40);
    remote.fields.remove("entry_seats");

    let plan = schema.reconciler().plan(&[local], &[remote]);
    assert_eq!(plan.count(ActionKind::CreateOnServer), 1);
}

#[test]
fn comparable_field_can_be_a_fixed_attribute() {
    let reconciler = waitlist_engine::Reconciler::new(["entry_name", "updatedAt"]);
    let mut local = entry(14, "Al", 2).with_id(-1);
    let mut remote = entry(14, "Al", 2).with_id(40);
    local.updated_at = parse_timestamp("2024-03-01T12:00:00Z");
    remote.updated_at = parse_timestamp("2024-03-01T12:00:00Z");

    let plan = reconciler.plan(&[local], &[remote]);
    assert_eq!(plan.count(ActionKind::CreateOnLocal), 1);
}

// ============================================================================
// Identifier Edge Cases
// ============================================================================

#[test]
fn zero_id_is_treated_as_unassigned() {
    let schema = CollectionSchema::entries();
    let local = vec![entry(14, "Al", 2).with_id(0)];

    let plan = schema.reconciler().plan(&local, &[]);
    // Nothing to destroy: the record never had a store id
    assert_eq!(
        plan.actions(),
        &[SyncAction::CreateOnServer {
            record: local[0].clone()
        }]
    );
}

#[test]
fn extreme_ids() {
    let mut store = Store::new();
    store.put("entry", entry(14, "Al", 2).with_id(i64::MAX), Origin::Remote, now());
    let id = store.put("entry", entry(14, "Bo", 2), Origin::Local, now());
    assert_eq!(id, -1);
    assert!(store.get("entry", i64::MAX).is_some());
}

#[test]
fn duplicate_remote_ids_use_the_last_copy() {
    let schema = CollectionSchema::entries();
    let mut first = entry(14, "Al", 2).with_id(5);
    first.updated_at = parse_timestamp("2024-03-01T12:00:00Z");
    let mut second = entry(14, "Al", 3).with_id(5);
    second.updated_at = parse_timestamp("2024-03-01T13:00:00Z");

    let mut local = entry(14, "Al", 2).with_id(5);
    local.updated_at_local = parse_timestamp("2024-03-01T12:00:00Z");

    let plan = schema.reconciler().plan(&[local], &[first, second.clone()]);
    assert_eq!(plan.actions(), &[SyncAction::ServerToLocal { record: second }]);
}

// ============================================================================
// Timestamp Edge Cases
// ============================================================================

#[test]
fn epoch_millis_timestamps_are_accepted() {
    let record: Record = serde_json::from_value(json!({
        "id": 3,
        "updatedAt": 1_709_294_400_000i64
    }))
    .unwrap();
    assert_eq!(record.updated_at, parse_timestamp("2024-03-01T12:00:00Z"));
}

#[test]
fn sqlite_style_timestamps_are_accepted() {
    let record: Record = serde_json::from_value(json!({
        "id": 3,
        "updatedAt": "2024-03-01 12:00:00.123"
    }))
    .unwrap();
    assert_eq!(record.updated_at, parse_timestamp("2024-03-01T12:00:00.123Z"));
}

#[test]
fn garbage_remote_timestamp_takes_no_action() {
    let schema = CollectionSchema::entries();
    let local: Record = serde_json::from_value(json!({
        "id": 3, "updatedAtLocal": "2024-03-01T12:00:00Z"
    }))
    .unwrap();
    let remote: Record = serde_json::from_value(json!({
        "id": 3, "updatedAt": "soon"
    }))
    .unwrap();

    assert!(schema.reconciler().plan(&[local], &[remote]).is_empty());
}

#[test]
fn garbage_local_timestamp_yields_to_server() {
    let schema = CollectionSchema::entries();
    let local: Record = serde_json::from_value(json!({
        "id": 3, "updatedAtLocal": "soon", "entry_name": "old"
    }))
    .unwrap();
    let remote: Record = serde_json::from_value(json!({
        "id": 3, "updatedAt": "2024-03-01T12:00:00Z", "entry_name": "new"
    }))
    .unwrap();

    let plan = schema.reconciler().plan(&[local], &[remote.clone()]);
    assert_eq!(plan.actions(), &[SyncAction::ServerToLocal { record: remote }]);
}

#[test]
fn zero_tolerance_detects_one_millisecond() {
    let reconciler = CollectionSchema::entries().reconciler().with_tolerance_ms(0);
    let mut local = entry(14, "Al", 2).with_id(3);
    let mut remote = local.clone();
    local.updated_at_local = parse_timestamp("2024-03-01T12:00:00.000Z");
    remote.updated_at = parse_timestamp("2024-03-01T12:00:00.001Z");

    let plan = reconciler.plan(&[local], &[remote]);
    assert_eq!(plan.count(ActionKind::ServerToLocal), 1);
}

#[test]
fn negative_tolerance_is_clamped() {
    let reconciler = CollectionSchema::entries().reconciler().with_tolerance_ms(-50);
    assert_eq!(reconciler.tolerance_ms(), 0);
}

// ============================================================================
// Snapshot Edge Cases
// ============================================================================

#[test]
fn snapshot_with_many_records() {
    let mut store = Store::new();
    for i in 0..1000 {
        store.put("entry", entry(14, &format!("Guest {}", i), 2), Origin::Local, now());
    }

    let json = store.export_state().to_json_pretty().unwrap();
    let mut restored = Store::new();
    restored
        .import_state(StoreSnapshot::from_json(&json).unwrap())
        .unwrap();

    assert_eq!(restored.record_count(), 1000);
    assert_eq!(
        restored.put("entry", entry(14, "Next", 2), Origin::Local, now()),
        -1001
    );
}

#[test]
fn snapshot_without_collections_key() {
    let snapshot = StoreSnapshot::from_json(r#"{"formatVersion": 1}"#).unwrap();
    assert_eq!(snapshot.record_count(), 0);
}

#[test]
fn snapshot_preserves_nested_fields() {
    let mut store = Store::new();
    let record = entry(14, "Al", 2).with_field(
        "entry_messages",
        json!([{"body": "table ready", "sent": true}, null]),
    );
    let id = store.put("entry", record.clone(), Origin::Local, now());

    let json = store.export_state().to_json().unwrap();
    let mut restored = Store::new();
    restored
        .import_state(StoreSnapshot::from_json(&json).unwrap())
        .unwrap();

    assert_eq!(
        restored.get("entry", id).unwrap().get("entry_messages"),
        record.get("entry_messages")
    );
}
