//! Handles survive an application restart through the file-backed store

use pretty_assertions::assert_eq;
use sal_core::config::SessionConfig;
use sal_core::context::XrContext;
use sal_core::events::XrEvent;
use sal_core::lifecycle::SessionLifecycleController;
use sal_core::overlay::OverlayAttachmentManager;
use sal_core::test_harness::{FakeCompositor, FakeMediaPlayer, RecordingScene, SessionCall};
use sal_core::types::AnchorHandle;
use sal_store::{JsonFileStore, KeyValueStore, PersistentHandleStore};
use sal_test_utils::{left_hand, session};
use std::path::Path;
use std::sync::Arc;

/// One application launch against the store file at `path`
fn launch(path: &Path) -> SessionLifecycleController {
    let config = SessionConfig::default();
    let scene = Arc::new(RecordingScene::new());
    let overlay = Arc::new(OverlayAttachmentManager::new(
        config.overlay.clone(),
        scene.clone(),
        Arc::new(FakeMediaPlayer::new()),
        Arc::new(FakeCompositor::new()),
    ));
    let handles = PersistentHandleStore::with_key(
        Arc::new(JsonFileStore::new(path)) as Arc<dyn KeyValueStore>,
        config.storage_key.clone(),
    );

    SessionLifecycleController::new(XrContext::new(scene, handles, overlay, Arc::new(config)))
}

#[tokio::test]
async fn anchor_created_in_one_run_is_restored_in_the_next() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("anchors.json");

    let first = session();
    first.queue_handle("persisted-1");
    let mut app = launch(&path);
    app.start(first.shared()).await.unwrap();
    app.handle(XrEvent::SelectEnd(left_hand())).await.unwrap();
    app.end();
    drop(app);

    let second = session();
    let mut app = launch(&path);
    app.start(second.shared()).await.unwrap();

    assert_eq!(second.restored(), vec![AnchorHandle::new("persisted-1")]);

    // Toggling now clears, and the empty array reaches disk
    app.handle(XrEvent::SelectEnd(left_hand())).await.unwrap();
    assert_eq!(
        second.calls(),
        vec![
            SessionCall::Restore(AnchorHandle::new("persisted-1")),
            SessionCall::Delete(AnchorHandle::new("persisted-1")),
        ]
    );
    app.end();

    let third = session();
    let mut app = launch(&path);
    app.start(third.shared()).await.unwrap();
    assert!(third.restored().is_empty());
}

#[tokio::test]
async fn unreadable_file_starts_with_nothing_to_restore() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("anchors.json");
    std::fs::write(&path, "not a json object").unwrap();

    let session = session();
    let mut app = launch(&path);
    app.start(session.shared()).await.unwrap();

    assert!(session.restored().is_empty());
}

#[tokio::test]
async fn corrupt_file_is_replaced_by_the_next_create() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("anchors.json");
    std::fs::write(&path, "garbage{").unwrap();

    let first = session();
    first.queue_handle("fresh");
    let mut app = launch(&path);
    app.start(first.shared()).await.unwrap();
    app.handle(XrEvent::SelectEnd(left_hand())).await.unwrap();
    app.end();

    assert_eq!(first.created_count(), 1);

    let second = session();
    let mut app = launch(&path);
    app.start(second.shared()).await.unwrap();
    assert_eq!(second.restored(), vec![AnchorHandle::new("fresh")]);
}
