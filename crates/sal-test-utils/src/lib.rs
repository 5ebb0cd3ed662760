//! Testing utilities for SAL workspace
//!
//! Shared fixtures: a fully wired [`Rig`] of recording fakes, plane and input
//! builders, and test tracing.

#![allow(missing_docs)]

use sal_core::config::SessionConfig;
use sal_core::context::XrContext;
use sal_core::lifecycle::SessionLifecycleController;
use sal_core::overlay::OverlayAttachmentManager;
use sal_core::test_harness::{
    FakeCompositor, FakeMediaPlayer, FakeSession, RecordingScene, RecordingStore,
};
use sal_core::types::{
    AnchorHandle, DetectedPlane, Handedness, InputSource, PlaneId, PlaneOrientation, PolygonPoint,
    Quat, Vec3,
};
use sal_store::{KeyValueStore, PersistentHandleStore};
use std::sync::Arc;

/// Recording collaborators wired the way an embedding application would
pub struct Rig {
    pub scene: Arc<RecordingScene>,
    pub store: Arc<RecordingStore>,
    pub player: Arc<FakeMediaPlayer>,
    pub compositor: Arc<FakeCompositor>,
    pub overlay: Arc<OverlayAttachmentManager>,
    pub handles: PersistentHandleStore,
    pub config: Arc<SessionConfig>,
}

impl Rig {
    pub fn new() -> Self {
        Self::with_config(SessionConfig::default())
    }

    pub fn with_config(config: SessionConfig) -> Self {
        let scene = Arc::new(RecordingScene::new());
        let store = Arc::new(RecordingStore::new());
        let player = Arc::new(FakeMediaPlayer::new());
        let compositor = Arc::new(FakeCompositor::new());

        let overlay = Arc::new(OverlayAttachmentManager::new(
            config.overlay.clone(),
            scene.clone(),
            player.clone(),
            compositor.clone(),
        ));
        let handles = PersistentHandleStore::with_key(
            store.clone() as Arc<dyn KeyValueStore>,
            config.storage_key.clone(),
        );

        Self {
            scene,
            store,
            player,
            compositor,
            overlay,
            handles,
            config: Arc::new(config),
        }
    }

    pub fn context(&self) -> XrContext {
        XrContext::new(
            self.scene.clone(),
            self.handles.clone(),
            self.overlay.clone(),
            self.config.clone(),
        )
    }

    pub fn controller(&self) -> SessionLifecycleController {
        SessionLifecycleController::new(self.context())
    }

    /// Persist handles directly, bypassing the core
    pub fn seed_handles(&self, handles: &[&str]) {
        let handles: Vec<AnchorHandle> = handles.iter().map(|h| AnchorHandle::new(*h)).collect();
        self.handles.save(&handles).unwrap();
    }

    pub fn persisted(&self) -> Vec<String> {
        self.handles
            .load()
            .into_iter()
            .map(AnchorHandle::into_inner)
            .collect()
    }
}

impl Default for Rig {
    fn default() -> Self {
        Self::new()
    }
}

pub fn session() -> Arc<FakeSession> {
    Arc::new(FakeSession::new())
}

/// Axis-aligned rectangle polygon with a corner at the origin
pub fn rectangle(width: f32, height: f32) -> Vec<PolygonPoint> {
    vec![
        PolygonPoint::new(0.0, 0.0),
        PolygonPoint::new(width, 0.0),
        PolygonPoint::new(width, height),
        PolygonPoint::new(0.0, height),
    ]
}

pub fn vertical_plane(id: u64) -> DetectedPlane {
    DetectedPlane {
        id: PlaneId(id),
        orientation: PlaneOrientation::Vertical,
        polygon: rectangle(2.0, 1.0),
    }
}

pub fn horizontal_plane(id: u64) -> DetectedPlane {
    DetectedPlane {
        id: PlaneId(id),
        orientation: PlaneOrientation::Horizontal,
        polygon: rectangle(2.0, 1.0),
    }
}

pub fn left_hand() -> InputSource {
    InputSource::new(0, Handedness::Left).with_pose(Vec3::new(0.1, 1.2, -0.4), Quat::IDENTITY)
}

pub fn right_hand() -> InputSource {
    InputSource::new(1, Handedness::Right).with_pose(Vec3::new(-0.1, 1.2, -0.4), Quat::IDENTITY)
}

pub fn init_tracing() {
    use tracing_subscriber::{fmt, EnvFilter};

    let _ = fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}
