use pretty_assertions::assert_eq;
use serde_json::json;
use touchline_core::OperationKind;

use crate::commands::common::{
    build_update_payload, format_relative_time, format_sync_timestamp, open_store,
    parse_player_line,
};
use crate::config::CliConfig;

#[test]
fn parse_player_line_accepts_all_arities() {
    let full = parse_player_line("sam:2:1").unwrap();
    assert_eq!((full.name.as_str(), full.goals, full.assists), ("sam", 2, 1));

    let goals_only = parse_player_line("ana:3").unwrap();
    assert_eq!(goals_only.goals, 3);
    assert_eq!(goals_only.assists, 0);

    let name_only = parse_player_line(" kit ").unwrap();
    assert_eq!(name_only.name, "kit");
    assert_eq!((name_only.goals, name_only.assists), (0, 0));
}

#[test]
fn parse_player_line_rejects_malformed_input() {
    assert!(parse_player_line("").is_err());
    assert!(parse_player_line(":2:1").is_err());
    assert!(parse_player_line("sam:two").is_err());
    assert!(parse_player_line("sam:2:1:extra").is_err());
}

#[test]
fn update_payload_includes_only_provided_fields() {
    let payload = build_update_payload(Some(3), None, None, &[], true, None).unwrap();
    assert_eq!(payload, json!({"goalsFor": 3, "finished": true}));
}

#[test]
fn update_payload_renders_player_lines() {
    let payload = build_update_payload(
        None,
        None,
        None,
        &["sam:2:1".to_string(), "ana".to_string()],
        false,
        None,
    )
    .unwrap();
    assert_eq!(
        payload["players"],
        json!([
            {"name": "sam", "goals": 2, "assists": 1},
            {"name": "ana", "goals": 0, "assists": 0}
        ])
    );
}

#[test]
fn update_payload_with_no_fields_is_an_error() {
    assert!(build_update_payload(None, None, None, &[], false, None).is_err());
    // a blank opponent correction does not count as a field
    assert!(build_update_payload(None, None, Some("  "), &[], false, None).is_err());
}

#[test]
fn format_relative_time_units() {
    let now = 10_000_000_000;
    assert_eq!(format_relative_time(now - 30_000, now), "just now");
    assert_eq!(format_relative_time(now - 120_000, now), "2m ago");
    assert_eq!(format_relative_time(now - 2 * 60 * 60_000, now), "2h ago");
    assert_eq!(format_relative_time(now - 3 * 24 * 60 * 60_000, now), "3d ago");
}

#[test]
fn format_sync_timestamp_returns_utc_label() {
    assert_eq!(format_sync_timestamp(0), "1970-01-01 00:00:00 UTC");
}

#[test]
fn store_opened_from_config_queues_and_lists() {
    let dir = tempfile::tempdir().unwrap();
    let config = CliConfig {
        data_dir: dir.path().to_path_buf(),
        sync_url: None,
        sync_token: None,
    };

    let store = open_store(&config).unwrap();
    store
        .enqueue_operation(OperationKind::Create, "m1", json!({"opponent": "FC"}))
        .unwrap();

    // a second open sees the same persisted queue
    let reopened = open_store(&config).unwrap();
    let queue = reopened.list_operations().unwrap();
    assert_eq!(queue.len(), 1);
    assert_eq!(queue[0].id, "m1");
}
