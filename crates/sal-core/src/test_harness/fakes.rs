//! Recording fakes for every collaborator
//!
//! Each fake records what the core asked of it and can be told to fail, so
//! tests and the simulator can assert on exact call sequences.

use crate::config::PlayoutAsset;
use crate::error::{OverlayError, SessionError};
use crate::media::{LayerCompositor, LayerRef, MediaPlayer, QuadLayerInit};
use crate::scene::SceneGraph;
use crate::session::{SessionRef, TrackingSession, XrFrame};
use crate::types::{
    AnchorHandle, AnchorId, LayerId, Mat4, MarkerId, MarkerSpec, MediaBindingId, PlaneId, Pose,
    Quat, ReferenceSpace, SpaceRef, Vec3,
};
use async_trait::async_trait;
use parking_lot::Mutex;
use sal_store::{KeyValueStore, MemoryStore, StoreError};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::Notify;

/// Call made on [`FakeSession`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "op", content = "handle", rename_all = "kebab-case")]
pub enum SessionCall {
    /// `create_anchor`
    Create(AnchorHandle),
    /// `delete_anchor`
    Delete(AnchorHandle),
    /// `restore_anchor`
    Restore(AnchorHandle),
}

/// Frame with scripted poses and hit-test results
#[derive(Debug, Default)]
pub struct FakeFrame {
    poses: Mutex<HashMap<SpaceRef, Pose>>,
    hits: Mutex<Vec<Pose>>,
}

impl XrFrame for FakeFrame {
    fn pose(&self, space: SpaceRef, _reference: &ReferenceSpace) -> Option<Pose> {
        self.poses.lock().get(&space).copied()
    }

    fn hit_test_results(&self, _reference: &ReferenceSpace) -> Vec<Pose> {
        self.hits.lock().clone()
    }
}

/// Tracking session with scripted frames and recorded calls
#[derive(Debug)]
pub struct FakeSession {
    space: ReferenceSpace,
    frame: Arc<FakeFrame>,
    frame_available: AtomicBool,
    calls: Mutex<Vec<SessionCall>>,
    scripted_handles: Mutex<VecDeque<AnchorHandle>>,
    failing_restores: Mutex<HashSet<AnchorHandle>>,
    failing_deletes: Mutex<HashSet<AnchorHandle>>,
    fail_create: AtomicBool,
    fail_delete: AtomicBool,
}

impl Default for FakeSession {
    fn default() -> Self {
        Self {
            space: ReferenceSpace::local(),
            frame: Arc::new(FakeFrame::default()),
            frame_available: AtomicBool::new(true),
            calls: Mutex::new(Vec::new()),
            scripted_handles: Mutex::new(VecDeque::new()),
            failing_restores: Mutex::new(HashSet::new()),
            failing_deletes: Mutex::new(HashSet::new()),
            fail_create: AtomicBool::new(false),
            fail_delete: AtomicBool::new(false),
        }
    }
}

impl FakeSession {
    /// Create session
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// As a shared session reference
    #[must_use]
    pub fn shared(self: &Arc<Self>) -> SessionRef {
        Arc::clone(self) as SessionRef
    }

    /// Report a pose for an anchor in the current frame
    pub fn set_anchor_pose(&self, anchor: AnchorId, pose: Pose) {
        self.frame.poses.lock().insert(SpaceRef::Anchor(anchor), pose);
    }

    /// Report a pose for a plane in the current frame
    pub fn set_plane_pose(&self, plane: PlaneId, pose: Pose) {
        self.frame.poses.lock().insert(SpaceRef::Plane(plane), pose);
    }

    /// Stop reporting a pose for a space
    pub fn clear_pose(&self, space: SpaceRef) {
        self.frame.poses.lock().remove(&space);
    }

    /// Replace the hit-test results
    pub fn set_hits(&self, hits: Vec<Pose>) {
        *self.frame.hits.lock() = hits;
    }

    /// Whether `frame()` returns a frame
    pub fn set_frame_available(&self, available: bool) {
        self.frame_available.store(available, Ordering::SeqCst);
    }

    /// Handle returned by the next `create_anchor`
    pub fn queue_handle(&self, handle: impl Into<AnchorHandle>) {
        self.scripted_handles.lock().push_back(handle.into());
    }

    /// Make `restore_anchor` reject a handle
    pub fn fail_restore(&self, handle: impl Into<AnchorHandle>) {
        self.failing_restores.lock().insert(handle.into());
    }

    /// Make `delete_anchor` reject a handle
    pub fn fail_delete(&self, handle: impl Into<AnchorHandle>) {
        self.failing_deletes.lock().insert(handle.into());
    }

    /// Make every `create_anchor` fail
    pub fn set_fail_create(&self, fail: bool) {
        self.fail_create.store(fail, Ordering::SeqCst);
    }

    /// Make every `delete_anchor` fail
    pub fn set_fail_delete(&self, fail: bool) {
        self.fail_delete.store(fail, Ordering::SeqCst);
    }

    /// Calls in order
    #[must_use]
    pub fn calls(&self) -> Vec<SessionCall> {
        self.calls.lock().clone()
    }

    /// Handles passed to `delete_anchor`, in order
    #[must_use]
    pub fn deleted(&self) -> Vec<AnchorHandle> {
        self.calls
            .lock()
            .iter()
            .filter_map(|c| match c {
                SessionCall::Delete(h) => Some(h.clone()),
                _ => None,
            })
            .collect()
    }

    /// Handles passed to `restore_anchor`, in order
    #[must_use]
    pub fn restored(&self) -> Vec<AnchorHandle> {
        self.calls
            .lock()
            .iter()
            .filter_map(|c| match c {
                SessionCall::Restore(h) => Some(h.clone()),
                _ => None,
            })
            .collect()
    }

    /// Number of `create_anchor` calls that returned a handle
    #[must_use]
    pub fn created_count(&self) -> usize {
        self.calls
            .lock()
            .iter()
            .filter(|c| matches!(c, SessionCall::Create(_)))
            .count()
    }
}

#[async_trait]
impl TrackingSession for FakeSession {
    async fn create_anchor(
        &self,
        _position: Vec3,
        _orientation: Quat,
        _persistent: bool,
    ) -> Result<AnchorHandle, SessionError> {
        if self.fail_create.load(Ordering::SeqCst) {
            return Err(SessionError::CreateAnchorFailed("scripted failure".to_string()));
        }
        let handle = self
            .scripted_handles
            .lock()
            .pop_front()
            .unwrap_or_else(|| AnchorHandle::new(uuid::Uuid::new_v4().to_string()));
        self.calls.lock().push(SessionCall::Create(handle.clone()));
        Ok(handle)
    }

    async fn delete_anchor(&self, handle: &AnchorHandle) -> Result<(), SessionError> {
        if self.fail_delete.load(Ordering::SeqCst) || self.failing_deletes.lock().contains(handle) {
            return Err(SessionError::DeleteAnchorFailed {
                handle: handle.clone(),
                reason: "scripted failure".to_string(),
            });
        }
        self.calls.lock().push(SessionCall::Delete(handle.clone()));
        Ok(())
    }

    async fn restore_anchor(&self, handle: &AnchorHandle) -> Result<(), SessionError> {
        self.calls.lock().push(SessionCall::Restore(handle.clone()));
        if self.failing_restores.lock().contains(handle) {
            return Err(SessionError::RestoreAnchorFailed {
                handle: handle.clone(),
                reason: "unknown handle".to_string(),
            });
        }
        Ok(())
    }

    fn reference_space(&self) -> ReferenceSpace {
        self.space.clone()
    }

    fn frame(&self) -> Option<Arc<dyn XrFrame>> {
        if self.frame_available.load(Ordering::SeqCst) {
            Some(Arc::clone(&self.frame) as Arc<dyn XrFrame>)
        } else {
            None
        }
    }
}

#[derive(Debug, Default)]
struct SceneState {
    next_id: u64,
    markers: BTreeMap<MarkerId, MarkerSpec>,
    removed: Vec<MarkerId>,
    camera: Vec3,
    camera_resets: usize,
}

/// Scene graph that keeps every marker in memory
#[derive(Debug, Default)]
pub struct RecordingScene {
    state: Mutex<SceneState>,
}

impl RecordingScene {
    /// Create empty scene
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Move the camera
    pub fn set_camera(&self, position: Vec3) {
        self.state.lock().camera = position;
    }

    /// Marker currently in the scene
    #[must_use]
    pub fn marker(&self, marker: MarkerId) -> Option<MarkerSpec> {
        self.state.lock().markers.get(&marker).cloned()
    }

    /// Markers whose name starts with `prefix`
    #[must_use]
    pub fn named(&self, prefix: &str) -> Vec<MarkerId> {
        self.state
            .lock()
            .markers
            .iter()
            .filter(|(_, spec)| spec.name.starts_with(prefix))
            .map(|(id, _)| *id)
            .collect()
    }

    /// Markers currently in the scene
    #[must_use]
    pub fn len(&self) -> usize {
        self.state.lock().markers.len()
    }

    /// Whether the scene is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.state.lock().markers.is_empty()
    }

    /// Markers removed so far, in order
    #[must_use]
    pub fn removed(&self) -> Vec<MarkerId> {
        self.state.lock().removed.clone()
    }

    /// Times the camera was reset
    #[must_use]
    pub fn camera_resets(&self) -> usize {
        self.state.lock().camera_resets
    }
}

impl SceneGraph for RecordingScene {
    fn add(&self, spec: MarkerSpec) -> MarkerId {
        let mut state = self.state.lock();
        state.next_id += 1;
        let id = MarkerId(state.next_id);
        state.markers.insert(id, spec);
        id
    }

    fn remove(&self, marker: MarkerId) -> bool {
        let mut state = self.state.lock();
        let present = state.markers.remove(&marker).is_some();
        if present {
            state.removed.push(marker);
        }
        present
    }

    fn set_transform(&self, marker: MarkerId, transform: Mat4) {
        if let Some(spec) = self.state.lock().markers.get_mut(&marker) {
            spec.transform = transform;
        }
    }

    fn set_visible(&self, marker: MarkerId, visible: bool) {
        if let Some(spec) = self.state.lock().markers.get_mut(&marker) {
            spec.visible = visible;
        }
    }

    fn world_position(&self, marker: MarkerId) -> Option<Vec3> {
        self.state
            .lock()
            .markers
            .get(&marker)
            .map(|spec| spec.transform.w_axis.truncate())
    }

    fn camera_position(&self) -> Vec3 {
        self.state.lock().camera
    }

    fn reset_camera(&self) {
        let mut state = self.state.lock();
        state.camera = Vec3::ZERO;
        state.camera_resets += 1;
    }
}

/// Key-value store that counts reads and writes
#[derive(Debug, Default)]
pub struct RecordingStore {
    inner: MemoryStore,
    reads: AtomicUsize,
    writes: AtomicUsize,
}

impl RecordingStore {
    /// Create empty store
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Store holding one raw value
    #[must_use]
    pub fn with_entry(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            inner: MemoryStore::with_entry(key, value),
            ..Self::default()
        }
    }

    /// `get` calls so far
    #[must_use]
    pub fn reads(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }

    /// `set`/`remove` calls so far
    #[must_use]
    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    /// Raw value without counting a read
    ///
    /// # Errors
    /// Never for the in-memory backend.
    pub fn peek(&self, key: &str) -> Result<Option<String>, StoreError> {
        self.inner.get(key)
    }
}

impl KeyValueStore for RecordingStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        self.inner.get(key)
    }

    fn set(&self, key: &str, value: String) -> Result<(), StoreError> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        self.inner.set(key, value)
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        self.inner.remove(key)
    }
}

/// Media element that records load/play/pause
#[derive(Debug, Default)]
pub struct FakeMediaPlayer {
    loaded: Mutex<Vec<String>>,
    plays: AtomicUsize,
    pauses: AtomicUsize,
    fail_play: AtomicBool,
}

impl FakeMediaPlayer {
    /// Create player
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every `play` fail
    pub fn set_fail_play(&self, fail: bool) {
        self.fail_play.store(fail, Ordering::SeqCst);
    }

    /// Assets loaded, in order
    #[must_use]
    pub fn loaded(&self) -> Vec<String> {
        self.loaded.lock().clone()
    }

    /// Successful `play` calls
    #[must_use]
    pub fn plays(&self) -> usize {
        self.plays.load(Ordering::SeqCst)
    }

    /// `pause` calls
    #[must_use]
    pub fn pauses(&self) -> usize {
        self.pauses.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MediaPlayer for FakeMediaPlayer {
    async fn load(&self, asset: &PlayoutAsset) -> Result<(), OverlayError> {
        self.loaded.lock().push(asset.name.clone());
        Ok(())
    }

    async fn play(&self) -> Result<(), OverlayError> {
        if self.fail_play.load(Ordering::SeqCst) {
            return Err(OverlayError::PlaybackFailed("scripted failure".to_string()));
        }
        self.plays.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn pause(&self) {
        self.pauses.fetch_add(1, Ordering::SeqCst);
    }
}

#[derive(Debug, Default)]
struct CompositorState {
    next_id: u64,
    binding_calls: usize,
    fail_next: usize,
    fail_always: bool,
    layers: Vec<QuadLayerInit>,
    layer_requests: usize,
    layer_gate: Option<Arc<Notify>>,
    render_states: Vec<Vec<LayerRef>>,
}

/// Layer API whose media binding can be made to fail
#[derive(Debug, Default)]
pub struct FakeCompositor {
    state: Mutex<CompositorState>,
}

impl FakeCompositor {
    /// Create compositor
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail the next `count` media-binding requests
    pub fn fail_next(&self, count: usize) {
        self.state.lock().fail_next = count;
    }

    /// Fail every media-binding request
    pub fn set_fail_always(&self, fail: bool) {
        self.state.lock().fail_always = fail;
    }

    /// Media-binding requests so far, one per attach attempt
    #[must_use]
    pub fn binding_calls(&self) -> usize {
        self.state.lock().binding_calls
    }

    /// Park every `create_quad_layer` until the returned gate is notified
    pub fn hold_layers(&self) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        self.state.lock().layer_gate = Some(Arc::clone(&gate));
        gate
    }

    /// `create_quad_layer` calls so far, including parked ones
    #[must_use]
    pub fn layer_requests(&self) -> usize {
        self.state.lock().layer_requests
    }

    /// Quad layers created, in order
    #[must_use]
    pub fn layers(&self) -> Vec<QuadLayerInit> {
        self.state.lock().layers.clone()
    }

    /// Render-state updates, in order
    #[must_use]
    pub fn render_states(&self) -> Vec<Vec<LayerRef>> {
        self.state.lock().render_states.clone()
    }
}

#[async_trait]
impl LayerCompositor for FakeCompositor {
    fn create_media_binding(
        &self,
        _session: &SessionRef,
        _space: &ReferenceSpace,
    ) -> Result<MediaBindingId, OverlayError> {
        let mut state = self.state.lock();
        state.binding_calls += 1;
        if state.fail_always {
            return Err(OverlayError::BindingFailed("layers unavailable".to_string()));
        }
        if state.fail_next > 0 {
            state.fail_next -= 1;
            return Err(OverlayError::BindingFailed("layers not ready".to_string()));
        }
        state.next_id += 1;
        Ok(MediaBindingId(state.next_id))
    }

    async fn create_quad_layer(
        &self,
        _binding: MediaBindingId,
        init: QuadLayerInit,
    ) -> Result<LayerId, OverlayError> {
        let gate = {
            let mut state = self.state.lock();
            state.layer_requests += 1;
            state.layer_gate.clone()
        };
        if let Some(gate) = gate {
            gate.notified().await;
        }

        let mut state = self.state.lock();
        state.next_id += 1;
        state.layers.push(init);
        Ok(LayerId(state.next_id))
    }

    async fn update_render_state(
        &self,
        _session: &SessionRef,
        layers: &[LayerRef],
    ) -> Result<(), OverlayError> {
        self.state.lock().render_states.push(layers.to_vec());
        Ok(())
    }
}
