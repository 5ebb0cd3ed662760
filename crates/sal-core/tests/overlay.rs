//! Overlay attachment: bounded retry, cancellation, serialization, hide

use pretty_assertions::assert_eq;
use sal_core::config::{HidePolicy, OverlayConfig, PlayoutAsset, SessionConfig, StereoLayout};
use sal_core::media::LayerRef;
use sal_core::overlay::{AttachOutcome, AttachState};
use sal_core::scene::SceneGraph;
use sal_core::types::{Geometry, Mat4, MarkerId, MarkerSpec, Material, Vec3};
use sal_test_utils::{session, Rig};
use std::time::Duration;

fn marker_at(rig: &Rig, position: Vec3) -> MarkerId {
    rig.scene.add(MarkerSpec::new(
        "anchor-test",
        Geometry::Box {
            width: 0.15,
            height: 0.075,
            depth: 0.02,
        },
        Material::opaque(0x00ff_0000),
        Mat4::from_translation(position),
    ))
}

fn bound_rig(config: SessionConfig) -> Rig {
    let rig = Rig::with_config(config);
    rig.overlay.bind_session(session().shared());
    rig
}

#[tokio::test(start_paused = true)]
async fn attach_places_quad_at_marker() {
    let rig = bound_rig(SessionConfig::default());
    let marker = marker_at(&rig, Vec3::new(0.5, 1.0, -2.0));

    let outcome = rig.overlay.attach(marker).await.unwrap();

    assert_eq!(outcome, AttachOutcome::Attached);
    assert_eq!(rig.overlay.state(), AttachState::Attached);
    assert_eq!(rig.overlay.retry_count(), 0);
    assert_eq!(rig.player.plays(), 1);

    let layers = rig.compositor.layers();
    assert_eq!(layers.len(), 1);
    assert_eq!(layers[0].transform, Mat4::from_translation(Vec3::new(0.5, 1.0, -2.0)));
    assert_eq!(layers[0].width, 0.36);
    assert_eq!(layers[0].height, 0.20);

    let states = rig.compositor.render_states();
    assert_eq!(states.len(), 1);
    assert!(matches!(states[0].as_slice(), [LayerRef::Quad(_), LayerRef::Base]));

    let binding = rig.overlay.active_binding().unwrap();
    assert_eq!(binding.marker, marker);
}

#[tokio::test(start_paused = true)]
async fn permanent_failure_makes_exactly_three_attempts() {
    let rig = bound_rig(SessionConfig::default());
    rig.compositor.set_fail_always(true);
    let marker = marker_at(&rig, Vec3::ZERO);

    let outcome = rig.overlay.attach(marker).await.unwrap();

    assert_eq!(outcome, AttachOutcome::GaveUp);
    assert_eq!(rig.compositor.binding_calls(), 3);
    assert_eq!(rig.overlay.retry_count(), 0);
    assert_eq!(rig.overlay.state(), AttachState::GaveUp);
    assert!(rig.overlay.active_binding().is_none());

    // Nothing else fires on its own
    tokio::time::sleep(Duration::from_secs(10)).await;
    assert_eq!(rig.compositor.binding_calls(), 3);

    // A new external attach starts a fresh cycle
    rig.compositor.set_fail_always(false);
    assert_eq!(rig.overlay.attach(marker).await.unwrap(), AttachOutcome::Attached);
    assert_eq!(rig.compositor.binding_calls(), 4);
}

#[tokio::test(start_paused = true)]
async fn retries_are_spaced_by_delay() {
    let rig = bound_rig(SessionConfig::default());
    rig.compositor.fail_next(2);
    let marker = marker_at(&rig, Vec3::ZERO);

    let started = tokio::time::Instant::now();
    let outcome = rig.overlay.attach(marker).await.unwrap();

    assert_eq!(outcome, AttachOutcome::Attached);
    assert_eq!(rig.compositor.binding_calls(), 3);
    assert_eq!(started.elapsed(), Duration::from_millis(1000));
}

#[tokio::test(start_paused = true)]
async fn retry_bound_is_configurable() {
    let config = SessionConfig::default()
        .with_overlay(OverlayConfig::default().with_max_retries(0));
    let rig = bound_rig(config);
    rig.compositor.set_fail_always(true);
    let marker = marker_at(&rig, Vec3::ZERO);

    assert_eq!(rig.overlay.attach(marker).await.unwrap(), AttachOutcome::GaveUp);
    assert_eq!(rig.compositor.binding_calls(), 1);
}

#[tokio::test(start_paused = true)]
async fn missing_session_is_a_retryable_failure() {
    let rig = Rig::new();
    let marker = marker_at(&rig, Vec3::ZERO);

    assert_eq!(rig.overlay.attach(marker).await.unwrap(), AttachOutcome::GaveUp);
    assert_eq!(rig.overlay.attempts(), 3);
    assert_eq!(rig.compositor.binding_calls(), 0);
}

#[tokio::test(start_paused = true)]
async fn release_session_cancels_pending_retry() {
    let rig = bound_rig(SessionConfig::default());
    rig.compositor.set_fail_always(true);
    let marker = marker_at(&rig, Vec3::ZERO);

    let handle = rig.overlay.attach(marker);
    while rig.compositor.binding_calls() == 0 {
        tokio::task::yield_now().await;
    }
    assert_eq!(rig.overlay.state(), AttachState::RetryScheduled { attempt: 1 });

    rig.overlay.release_session();

    assert_eq!(handle.await.unwrap(), AttachOutcome::Cancelled);
    tokio::time::sleep(Duration::from_secs(5)).await;
    assert_eq!(rig.compositor.binding_calls(), 1);
    assert_eq!(rig.overlay.state(), AttachState::Idle);
    assert_eq!(rig.overlay.pending_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn attaches_are_serialized() {
    let rig = bound_rig(SessionConfig::default());
    rig.compositor.fail_next(1);
    let first = marker_at(&rig, Vec3::new(1.0, 0.0, 0.0));
    let second = marker_at(&rig, Vec3::new(2.0, 0.0, 0.0));

    let a = rig.overlay.attach(first);
    let b = rig.overlay.attach(second);

    assert_eq!(a.await.unwrap(), AttachOutcome::Attached);
    assert_eq!(b.await.unwrap(), AttachOutcome::Attached);

    // The second cycle waited out the first one's retry
    let layers = rig.compositor.layers();
    assert_eq!(layers.len(), 2);
    assert_eq!(layers[0].transform, Mat4::from_translation(Vec3::new(1.0, 0.0, 0.0)));
    assert_eq!(layers[1].transform, Mat4::from_translation(Vec3::new(2.0, 0.0, 0.0)));
    assert_eq!(rig.overlay.active_binding().unwrap().marker, second);
}

#[tokio::test(start_paused = true)]
async fn newer_attach_supersedes_pending_one() {
    let rig = bound_rig(SessionConfig::default());
    let marker = marker_at(&rig, Vec3::ZERO);

    let stale = rig.overlay.attach(marker);
    let fresh = rig.overlay.attach(marker);

    assert_eq!(stale.await.unwrap(), AttachOutcome::Cancelled);
    assert_eq!(fresh.await.unwrap(), AttachOutcome::Attached);
    assert_eq!(rig.compositor.binding_calls(), 1);
}

#[tokio::test(start_paused = true)]
async fn removed_marker_fails_attach() {
    let rig = bound_rig(SessionConfig::default());
    let marker = marker_at(&rig, Vec3::ZERO);
    rig.scene.remove(marker);

    assert_eq!(rig.overlay.attach(marker).await.unwrap(), AttachOutcome::GaveUp);
    assert_eq!(rig.compositor.binding_calls(), 0);
}

#[tokio::test(start_paused = true)]
async fn hide_pause_only_keeps_layer() {
    let rig = bound_rig(SessionConfig::default());
    let marker = marker_at(&rig, Vec3::ZERO);
    rig.overlay.attach(marker).await.unwrap();

    rig.overlay.hide().await.unwrap();

    assert_eq!(rig.player.pauses(), 1);
    assert_eq!(rig.compositor.render_states().len(), 1);
    assert!(rig.overlay.active_binding().is_some());
    assert_eq!(rig.overlay.state(), AttachState::Attached);
}

#[tokio::test(start_paused = true)]
async fn hide_detach_layer_drops_quad() {
    let config = SessionConfig::default()
        .with_overlay(OverlayConfig::default().with_hide_policy(HidePolicy::DetachLayer));
    let rig = bound_rig(config);
    let marker = marker_at(&rig, Vec3::ZERO);
    rig.overlay.attach(marker).await.unwrap();

    rig.overlay.hide().await.unwrap();

    assert_eq!(rig.player.pauses(), 1);
    assert_eq!(rig.compositor.render_states().last().unwrap(), &vec![LayerRef::Base]);
    assert!(rig.overlay.active_binding().is_none());
    assert_eq!(rig.overlay.state(), AttachState::Idle);
}

#[tokio::test(start_paused = true)]
async fn hide_during_layer_creation_leaves_no_quad_behind() {
    let config = SessionConfig::default()
        .with_overlay(OverlayConfig::default().with_hide_policy(HidePolicy::DetachLayer));
    let rig = bound_rig(config);
    let marker = marker_at(&rig, Vec3::ZERO);
    let gate = rig.compositor.hold_layers();

    let cycle = rig.overlay.attach(marker);
    while rig.compositor.layer_requests() == 0 {
        tokio::task::yield_now().await;
    }

    // Teardown order used by the clear gesture
    assert!(rig.overlay.cancel(marker));
    rig.overlay.hide().await.unwrap();
    gate.notify_one();

    assert_eq!(cycle.await.unwrap(), AttachOutcome::Cancelled);
    assert!(rig
        .compositor
        .render_states()
        .iter()
        .all(|layers| !layers.iter().any(|l| matches!(l, LayerRef::Quad(_)))));
    assert!(rig.overlay.active_binding().is_none());
    assert_eq!(rig.overlay.state(), AttachState::Idle);
    assert_eq!(rig.player.plays(), 1);
    assert_eq!(rig.player.pauses(), 2);
}

#[tokio::test(start_paused = true)]
async fn selected_asset_is_loaded_once() {
    let asset = |name: &str, default: bool| PlayoutAsset {
        name: name.to_string(),
        stream_uri: format!("https://cdn.example.com/{name}/manifest.mpd"),
        drm_uri: None,
        fps: 30,
        layout: StereoLayout::Mono,
        default,
    };
    let config = SessionConfig::default().with_overlay(
        OverlayConfig::default().with_assets(vec![asset("trailer", false), asset("feature", true)]),
    );
    let rig = bound_rig(config);
    let marker = marker_at(&rig, Vec3::ZERO);

    rig.overlay.attach(marker).await.unwrap();
    rig.overlay.attach(marker).await.unwrap();

    assert_eq!(rig.player.loaded(), vec!["feature".to_string()]);
    assert_eq!(rig.player.plays(), 2);
}
