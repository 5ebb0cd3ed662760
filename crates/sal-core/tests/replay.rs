//! Replays of the scenario files shipped under `demos/`

use pretty_assertions::assert_eq;
use sal_core::config::{HidePolicy, SessionConfig};
use sal_core::test_harness::{Scenario, SessionCall, Simulator};
use sal_core::types::{AnchorHandle, Handedness};
use std::path::PathBuf;

fn demo_file(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("../../demos")
        .join(name)
}

#[test]
fn shipped_config_matches_defaults() {
    let config = SessionConfig::load(demo_file("sal.toml")).unwrap();

    assert_eq!(config.clear_threshold, 1);
    assert_eq!(config.ignored_handedness, vec![Handedness::Right]);
    assert_eq!(config.overlay.hide_policy, HidePolicy::PauseOnly);
    assert_eq!(config.overlay.selected_asset().unwrap().name, "feature");
    assert_eq!(config.storage_key, SessionConfig::default().storage_key);
}

#[tokio::test(start_paused = true)]
async fn two_session_scenario_replays_clean() {
    let raw = std::fs::read_to_string(demo_file("two-sessions.json")).unwrap();
    let scenario = Scenario::from_json(&raw).unwrap();
    let config = SessionConfig::load(demo_file("sal.toml")).unwrap();

    let report = Simulator::new(config).unwrap().run(&scenario).await.unwrap();

    assert!(report.passed(), "errors: {:?}", report.errors);
    assert_eq!(report.sessions, 2);
    assert_eq!(
        report.session_calls,
        vec![
            SessionCall::Restore(AnchorHandle::new("left-over")),
            SessionCall::Delete(AnchorHandle::new("left-over")),
            SessionCall::Create(AnchorHandle::new("wall-anchor")),
            SessionCall::Restore(AnchorHandle::new("wall-anchor")),
            SessionCall::Delete(AnchorHandle::new("wall-anchor")),
        ]
    );
    assert!(report.persisted.is_empty());
    assert_eq!(report.plane_markers, 1);
    assert_eq!(report.placed_objects, 1);
    assert_eq!(report.anchor_markers, 0);
    assert_eq!(report.overlay_attempts, 2);
    assert_eq!(report.overlay_attached, 1);
    assert!(report.generate_text().contains("Status: PASSED"));
}

#[test]
fn invalid_config_is_rejected() {
    let err = SessionConfig::from_toml_str("clear_threshold = 0").unwrap_err();
    assert!(err.to_string().contains("clear_threshold"), "{err}");
}
