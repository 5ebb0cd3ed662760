//! Scenario simulator
//!
//! Replays a scripted scenario against a [`SessionLifecycleController`] wired
//! to the recording fakes, and summarizes what the core did.
//!
//! Scenarios are JSON documents; each step either scripts the fake runtime
//! (poses, hit results, failures) or delivers an event.

use super::fakes::{
    FakeCompositor, FakeMediaPlayer, FakeSession, RecordingScene, RecordingStore, SessionCall,
};
use crate::config::SessionConfig;
use crate::context::XrContext;
use crate::error::SalError;
use crate::events::XrEvent;
use crate::lifecycle::SessionLifecycleController;
use crate::overlay::{AttachOutcome, OverlayAttachmentManager};
use crate::types::{
    AnchorHandle, AnchorId, DetectedPlane, Handedness, InputSource, PlaneId, PlaneOrientation,
    PolygonPoint, Pose, Quat, SpaceRef, Vec3,
};
use sal_store::{KeyValueStore, PersistentHandleStore};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

/// One scenario step
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "step", rename_all = "kebab-case")]
pub enum Step {
    /// Start a fresh session
    StartSession,
    /// End the running session
    EndSession,
    /// Report an anchor pose in the current frame
    AnchorPose {
        /// Anchor identity
        anchor: u64,
        /// World position
        position: [f32; 3],
    },
    /// Report a plane pose in the current frame
    PlanePose {
        /// Plane identity
        plane: u64,
        /// World position
        position: [f32; 3],
    },
    /// Replace the hit-test results
    Hits {
        /// Hit positions, nearest first
        positions: Vec<[f32; 3]>,
    },
    /// Handle the next created anchor gets
    QueueHandle {
        /// Handle string
        handle: String,
    },
    /// Make restoring a handle fail
    FailRestore {
        /// Handle string
        handle: String,
    },
    /// Make the next overlay attach attempts fail
    FailOverlay {
        /// Attempts to fail
        times: usize,
    },
    /// `anchors-detected`
    AnchorsDetected {
        /// Identities in the detected set
        anchors: Vec<u64>,
    },
    /// `anchor-pose-changed`; no position means tracking was lost
    AnchorPoseChanged {
        /// Anchor identity
        anchor: u64,
        /// New world position
        #[serde(default)]
        position: Option<[f32; 3]>,
    },
    /// `planes-detected`
    PlanesDetected {
        /// Planes in the detected set
        planes: Vec<DetectedPlane>,
    },
    /// Input device connected
    Connect {
        /// Controller slot
        index: u8,
        /// Hand
        hand: Handedness,
    },
    /// `select`
    Select {
        /// Hand
        hand: Handedness,
    },
    /// `select-end`
    SelectEnd {
        /// Hand
        hand: Handedness,
        /// Controller position
        #[serde(default)]
        position: [f32; 3],
    },
    /// Render-loop tick
    Frame {
        /// Timestamp in milliseconds
        #[serde(default)]
        timestamp: f64,
    },
    /// Let time pass
    Wait {
        /// Milliseconds
        ms: u64,
    },
    /// Wait for every overlay attach cycle started so far
    Settle,
}

/// Scripted run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scenario {
    /// Display name
    pub name: String,
    /// Handles persisted before the first session
    #[serde(default)]
    pub initial_handles: Vec<String>,
    /// Steps in order
    pub steps: Vec<Step>,
}

impl Scenario {
    /// Parse a scenario from JSON
    ///
    /// # Errors
    /// Malformed JSON or unknown steps.
    pub fn from_json(raw: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(raw)
    }

    /// Built-in walkthrough: planes, anchor create, overlay retry, placement,
    /// clear, and a second session
    #[must_use]
    pub fn demo() -> Self {
        use Step::{
            AnchorPose, AnchorsDetected, Connect, EndSession, FailOverlay, Frame, Hits,
            PlanePose, PlanesDetected, QueueHandle, Select, SelectEnd, Settle, StartSession,
        };

        let wall = DetectedPlane {
            id: PlaneId(1),
            orientation: PlaneOrientation::Vertical,
            polygon: vec![
                PolygonPoint::new(0.0, 0.0),
                PolygonPoint::new(2.0, 0.0),
                PolygonPoint::new(2.0, 1.0),
                PolygonPoint::new(0.0, 1.0),
            ],
        };
        let floor = DetectedPlane {
            id: PlaneId(2),
            orientation: PlaneOrientation::Horizontal,
            polygon: wall.polygon.clone(),
        };

        Self {
            name: "demo".to_string(),
            initial_handles: Vec::new(),
            steps: vec![
                StartSession,
                Connect { index: 0, hand: Handedness::Left },
                Connect { index: 1, hand: Handedness::Right },
                PlanePose { plane: 1, position: [0.0, 1.0, -2.0] },
                PlanePose { plane: 2, position: [0.0, 0.0, 0.0] },
                PlanesDetected { planes: vec![wall.clone(), floor] },
                PlanesDetected { planes: vec![wall] },
                QueueHandle { handle: "demo-anchor".to_string() },
                SelectEnd { hand: Handedness::Left, position: [0.2, 1.2, -0.5] },
                SelectEnd { hand: Handedness::Right, position: [0.0, 0.0, 0.0] },
                FailOverlay { times: 1 },
                AnchorPose { anchor: 7, position: [0.2, 1.2, -0.5] },
                AnchorsDetected { anchors: vec![7] },
                AnchorsDetected { anchors: vec![7] },
                Settle,
                Hits { positions: vec![[0.0, 0.0, -1.0]] },
                Frame { timestamp: 16.0 },
                Select { hand: Handedness::Right },
                SelectEnd { hand: Handedness::Left, position: [0.0, 0.0, 0.0] },
                EndSession,
                StartSession,
                EndSession,
            ],
        }
    }
}

/// Summary of a run
#[derive(Debug, Clone, Default, Serialize)]
pub struct SimulatorReport {
    /// Scenario name
    pub scenario: String,
    /// Steps executed
    pub steps: usize,
    /// Sessions started
    pub sessions: usize,
    /// Anchor markers in the scene at the end
    pub anchor_markers: usize,
    /// Plane markers in the scene at the end
    pub plane_markers: usize,
    /// Objects placed at the reticle
    pub placed_objects: usize,
    /// Session calls across all sessions, in order
    pub session_calls: Vec<SessionCall>,
    /// Handles persisted at the end
    pub persisted: Vec<AnchorHandle>,
    /// Overlay attach attempts
    pub overlay_attempts: u64,
    /// Attach cycles that bound the overlay
    pub overlay_attached: usize,
    /// Attach cycles that exhausted their retries
    pub overlay_gave_up: usize,
    /// Attach cycles cancelled by session end
    pub overlay_cancelled: usize,
    /// Store writes
    pub store_writes: usize,
    /// Errors raised by event handling
    pub errors: Vec<String>,
}

impl SimulatorReport {
    /// Whether no step raised an error
    #[must_use]
    pub fn passed(&self) -> bool {
        self.errors.is_empty()
    }

    /// Human-readable summary
    #[must_use]
    pub fn generate_text(&self) -> String {
        let mut out = String::new();
        out.push_str(&format!("Scenario: {}\n", self.scenario));
        out.push_str(&format!("  Steps: {}\n", self.steps));
        out.push_str(&format!("  Sessions: {}\n", self.sessions));
        out.push_str(&format!(
            "  Markers: {} anchor, {} plane, {} placed\n",
            self.anchor_markers, self.plane_markers, self.placed_objects
        ));
        out.push_str(&format!("  Session calls: {}\n", self.session_calls.len()));
        for call in &self.session_calls {
            out.push_str(&format!("    {call:?}\n"));
        }
        out.push_str(&format!("  Persisted handles: {}\n", self.persisted.len()));
        out.push_str(&format!("  Store writes: {}\n", self.store_writes));
        out.push_str(&format!(
            "  Overlay: {} attempts, {} attached, {} gave up, {} cancelled\n",
            self.overlay_attempts,
            self.overlay_attached,
            self.overlay_gave_up,
            self.overlay_cancelled
        ));
        if self.passed() {
            out.push_str("  Status: PASSED\n");
        } else {
            out.push_str("  Status: FAILED\n");
            for error in &self.errors {
                out.push_str(&format!("    {error}\n"));
            }
        }
        out
    }
}

/// Controller wired to recording fakes
pub struct Simulator {
    controller: SessionLifecycleController,
    scene: Arc<RecordingScene>,
    store: Arc<RecordingStore>,
    compositor: Arc<FakeCompositor>,
    player: Arc<FakeMediaPlayer>,
    sessions: Vec<Arc<FakeSession>>,
    pending: Vec<JoinHandle<AttachOutcome>>,
    report: SimulatorReport,
}

impl Simulator {
    /// Create simulator
    ///
    /// # Errors
    /// `SalError::Config` if the configuration is invalid.
    pub fn new(config: SessionConfig) -> Result<Self, SalError> {
        config.validate()?;

        let scene = Arc::new(RecordingScene::new());
        let store = Arc::new(RecordingStore::new());
        let compositor = Arc::new(FakeCompositor::new());
        let player = Arc::new(FakeMediaPlayer::new());

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
        let ctx = XrContext::new(scene.clone(), handles, overlay, Arc::new(config));

        Ok(Self {
            controller: SessionLifecycleController::new(ctx),
            scene,
            store,
            compositor,
            player,
            sessions: Vec::new(),
            pending: Vec::new(),
            report: SimulatorReport::default(),
        })
    }

    /// Controller under test
    #[must_use]
    pub fn controller(&self) -> &SessionLifecycleController {
        &self.controller
    }

    /// Recording scene
    #[must_use]
    pub fn scene(&self) -> &RecordingScene {
        &self.scene
    }

    /// Media player fake
    #[must_use]
    pub fn player(&self) -> &FakeMediaPlayer {
        &self.player
    }

    /// Run a scenario to completion
    ///
    /// # Errors
    /// Store failures while seeding the initial handles.
    pub async fn run(mut self, scenario: &Scenario) -> Result<SimulatorReport, SalError> {
        self.report.scenario.clone_from(&scenario.name);

        if !scenario.initial_handles.is_empty() {
            let handles: Vec<AnchorHandle> = scenario
                .initial_handles
                .iter()
                .map(|h| AnchorHandle::new(h.as_str()))
                .collect();
            self.controller.context().store.save(&handles)?;
        }

        for (index, step) in scenario.steps.iter().enumerate() {
            tracing::debug!(index, ?step, "step");
            if let Err(e) = self.apply(step).await {
                tracing::warn!(index, "step failed: {}", e);
                self.report.errors.push(format!("step {index}: {e}"));
            }
            self.report.steps += 1;
        }

        self.settle().await;
        Ok(self.finish())
    }

    async fn apply(&mut self, step: &Step) -> Result<(), SalError> {
        match step {
            Step::StartSession => {
                let session = Arc::new(FakeSession::new());
                self.sessions.push(session.clone());
                self.controller.start(session.shared()).await?;
                self.report.sessions += 1;
            }
            Step::EndSession => {
                self.collect_attachments();
                self.controller.end();
            }
            Step::AnchorPose { anchor, position } => {
                if let Some(session) = self.sessions.last() {
                    session.set_anchor_pose(AnchorId(*anchor), Pose::at(Vec3::from(*position)));
                }
            }
            Step::PlanePose { plane, position } => {
                if let Some(session) = self.sessions.last() {
                    session.set_plane_pose(PlaneId(*plane), Pose::at(Vec3::from(*position)));
                }
            }
            Step::Hits { positions } => {
                if let Some(session) = self.sessions.last() {
                    session.set_hits(positions.iter().map(|p| Pose::at(Vec3::from(*p))).collect());
                }
            }
            Step::QueueHandle { handle } => {
                if let Some(session) = self.sessions.last() {
                    session.queue_handle(handle.as_str());
                }
            }
            Step::FailRestore { handle } => {
                if let Some(session) = self.sessions.last() {
                    session.fail_restore(handle.as_str());
                }
            }
            Step::FailOverlay { times } => self.compositor.fail_next(*times),
            Step::AnchorsDetected { anchors } => {
                let ids = anchors.iter().copied().map(AnchorId).collect();
                self.dispatch(XrEvent::AnchorsDetected(ids)).await?;
            }
            Step::AnchorPoseChanged { anchor, position } => {
                let anchor = AnchorId(*anchor);
                let pose = position.map(|p| Pose::at(Vec3::from(p)));
                if let Some(session) = self.sessions.last() {
                    match pose {
                        Some(pose) => session.set_anchor_pose(anchor, pose),
                        None => session.clear_pose(SpaceRef::Anchor(anchor)),
                    }
                }
                self.dispatch(XrEvent::AnchorPoseChanged { anchor, pose }).await?;
            }
            Step::PlanesDetected { planes } => {
                self.dispatch(XrEvent::PlanesDetected(planes.clone())).await?;
            }
            Step::Connect { index, hand } => {
                self.dispatch(XrEvent::InputConnected(InputSource::new(*index, *hand)))
                    .await?;
            }
            Step::Select { hand } => {
                self.dispatch(XrEvent::Select(InputSource::new(slot(*hand), *hand)))
                    .await?;
            }
            Step::SelectEnd { hand, position } => {
                let source = InputSource::new(slot(*hand), *hand)
                    .with_pose(Vec3::from(*position), Quat::IDENTITY);
                self.dispatch(XrEvent::SelectEnd(source)).await?;
            }
            Step::Frame { timestamp } => self.dispatch(XrEvent::Frame(*timestamp)).await?,
            Step::Wait { ms } => tokio::time::sleep(Duration::from_millis(*ms)).await,
            Step::Settle => self.settle().await,
        }
        Ok(())
    }

    async fn dispatch(&mut self, event: XrEvent) -> Result<(), SalError> {
        let result = self.controller.handle(event).await;
        self.collect_attachments();
        result
    }

    fn collect_attachments(&mut self) {
        self.pending.extend(self.controller.take_attachments());
    }

    async fn settle(&mut self) {
        for handle in std::mem::take(&mut self.pending) {
            match handle.await {
                Ok(AttachOutcome::Attached) => self.report.overlay_attached += 1,
                Ok(AttachOutcome::GaveUp) => self.report.overlay_gave_up += 1,
                Ok(AttachOutcome::Cancelled) => self.report.overlay_cancelled += 1,
                Err(e) => self.report.errors.push(format!("attach task failed: {e}")),
            }
        }
    }

    fn finish(mut self) -> SimulatorReport {
        let ctx = self.controller.context();
        self.report.anchor_markers = self.scene.named("anchor-").len();
        self.report.plane_markers = self.scene.named("plane-").len();
        self.report.placed_objects = self.scene.named("placed").len();
        self.report.session_calls = self.sessions.iter().flat_map(|s| s.calls()).collect();
        self.report.persisted = ctx.store.load();
        self.report.overlay_attempts = ctx.overlay.attempts();
        self.report.store_writes = self.store.writes();
        self.report
    }
}

impl std::fmt::Debug for Simulator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Simulator")
            .field("controller", &self.controller)
            .field("sessions", &self.sessions.len())
            .field("pending", &self.pending.len())
            .finish_non_exhaustive()
    }
}

/// Controller slot conventionally used by a hand
fn slot(hand: Handedness) -> u8 {
    match hand {
        Handedness::Right => 1,
        Handedness::Left | Handedness::None => 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn demo_scenario_runs_clean() {
        let report = Simulator::new(SessionConfig::default())
            .unwrap()
            .run(&Scenario::demo())
            .await
            .unwrap();

        assert!(report.passed(), "errors: {:?}", report.errors);
        assert_eq!(report.sessions, 2);
        assert_eq!(report.plane_markers, 1);
        assert_eq!(report.placed_objects, 1);
        // cleared by the second left select-end, then torn down
        assert_eq!(report.anchor_markers, 0);
        assert!(report.persisted.is_empty());
        assert_eq!(report.overlay_attached, 1);
        assert_eq!(report.overlay_attempts, 2);
        assert_eq!(
            report.session_calls,
            vec![
                SessionCall::Create(AnchorHandle::new("demo-anchor")),
                SessionCall::Delete(AnchorHandle::new("demo-anchor")),
            ]
        );
    }

    #[test]
    fn scenario_parses_from_json() {
        let raw = r#"{
            "name": "restore",
            "initial_handles": ["a", "b"],
            "steps": [
                {"step": "start-session"},
                {"step": "select-end", "hand": "left"},
                {"step": "anchor-pose-changed", "anchor": 3},
                {"step": "wait", "ms": 500}
            ]
        }"#;
        let scenario = Scenario::from_json(raw).unwrap();
        assert_eq!(scenario.initial_handles, vec!["a", "b"]);
        assert_eq!(
            scenario.steps[1],
            Step::SelectEnd { hand: Handedness::Left, position: [0.0, 0.0, 0.0] }
        );
        assert_eq!(scenario.steps[2], Step::AnchorPoseChanged { anchor: 3, position: None });
    }

    #[test]
    fn unknown_step_is_rejected() {
        let raw = r#"{"name": "x", "steps": [{"step": "teleport"}]}"#;
        assert!(Scenario::from_json(raw).is_err());
    }
}
