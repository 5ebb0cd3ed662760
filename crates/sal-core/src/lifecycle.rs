//! Session lifecycle controller
//!
//! Top-level owner of one tracking session at a time:
//! - `start`: reset camera, restore persisted anchors, build coordinators
//! - `handle`: route events to subscribed handlers in subscription order
//! - `end`: unsubscribe everything, cancel overlay retries, release session

use crate::anchors::AnchorEventCoordinator;
use crate::context::XrContext;
use crate::error::{LifecycleError, SalError};
use crate::events::XrEvent;
use crate::hit_test::HitTestCoordinator;
use crate::input::ControllerInputCoordinator;
use crate::listeners::{Handler, ListenerRegistry, Subscriber};
use crate::overlay::AttachOutcome;
use crate::planes::PlaneEventCoordinator;
use crate::session::SessionRef;
use tokio::task::JoinHandle;

/// Lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LifecycleState {
    /// No session yet
    #[default]
    NotStarted,
    /// Session running
    Active,
    /// Session ended; a new one may start
    Ended,
}

/// States reachable from `from`
#[must_use]
pub fn allowed_transitions(from: LifecycleState) -> Vec<LifecycleState> {
    use LifecycleState::{Active, Ended, NotStarted};
    match from {
        NotStarted | Ended => vec![Active],
        Active => vec![Ended],
    }
}

/// Validate a state transition
///
/// # Errors
/// `LifecycleError::IllegalTransition` if `to` is not reachable from `from`.
pub fn validate_transition(from: LifecycleState, to: LifecycleState) -> Result<(), LifecycleError> {
    if allowed_transitions(from).contains(&to) {
        Ok(())
    } else {
        Err(LifecycleError::IllegalTransition { from, to })
    }
}

struct ActiveSession {
    session: SessionRef,
    anchors: AnchorEventCoordinator,
    planes: PlaneEventCoordinator,
    input: ControllerInputCoordinator,
    hit_test: HitTestCoordinator,
}

/// Wires coordinators to session start/end
pub struct SessionLifecycleController {
    ctx: XrContext,
    state: LifecycleState,
    registry: ListenerRegistry,
    active: Option<ActiveSession>,
}

impl SessionLifecycleController {
    /// Create controller
    #[must_use]
    pub fn new(ctx: XrContext) -> Self {
        Self {
            ctx,
            state: LifecycleState::NotStarted,
            registry: ListenerRegistry::new(),
            active: None,
        }
    }

    /// Begin a session
    ///
    /// Restore requests are best-effort: a handle the runtime rejects is
    /// logged and skipped. The store is only read.
    ///
    /// # Errors
    /// `LifecycleError::IllegalTransition` if a session is already active.
    pub async fn start(&mut self, session: SessionRef) -> Result<(), SalError> {
        validate_transition(self.state, LifecycleState::Active)?;

        self.ctx.scene.reset_camera();

        let handles = self.ctx.store.load();
        for handle in &handles {
            match session.restore_anchor(handle).await {
                Ok(()) => tracing::debug!(%handle, "restore requested"),
                Err(e) => tracing::debug!(%handle, "restore skipped: {}", e),
            }
        }

        self.ctx.overlay.bind_session(session.clone());

        let active = ActiveSession {
            anchors: AnchorEventCoordinator::new(self.ctx.clone(), session.clone()),
            planes: PlaneEventCoordinator::new(self.ctx.clone(), session.clone()),
            input: ControllerInputCoordinator::new(self.ctx.clone(), session.clone()),
            hit_test: HitTestCoordinator::new(self.ctx.clone(), session.clone()),
            session,
        };
        active.anchors.subscribe(&mut self.registry);
        active.planes.subscribe(&mut self.registry);
        active.input.subscribe(&mut self.registry);
        active.hit_test.subscribe(&mut self.registry);

        self.active = Some(active);
        self.state = LifecycleState::Active;

        tracing::info!(
            restored = handles.len(),
            handlers = self.registry.len(),
            "session started"
        );
        Ok(())
    }

    /// End the current session; no-op unless active
    pub fn end(&mut self) {
        if validate_transition(self.state, LifecycleState::Ended).is_err() {
            tracing::debug!(state = ?self.state, "end ignored");
            return;
        }

        if let Some(mut active) = self.active.take() {
            active.anchors.unsubscribe(&mut self.registry);
            active.planes.unsubscribe(&mut self.registry);
            active.input.unsubscribe(&mut self.registry);
            active.hit_test.unsubscribe(&mut self.registry);

            let cancelled = self.ctx.overlay.cancel_pending();
            active.anchors.teardown();
            active.hit_test.teardown();
            self.ctx.overlay.release_session();

            tracing::info!(cancelled, "session ended");
        }

        self.state = LifecycleState::Ended;
    }

    /// Dispatch one event
    ///
    /// # Errors
    /// Session and store failures raised by the anchor toggle.
    pub async fn handle(&mut self, event: XrEvent) -> Result<(), SalError> {
        let Some(active) = self.active.as_mut() else {
            tracing::trace!(kind = ?event.kind(), "event outside active session");
            return Ok(());
        };

        for handler in self.registry.handlers(event.kind()) {
            tracing::trace!(?handler, owner = ?handler.owner(), "dispatch");

            match (handler, &event) {
                (Handler::AnchorAdded, XrEvent::AnchorAdded(id)) => active.anchors.on_added(*id),
                (Handler::AnchorRemoved, XrEvent::AnchorRemoved(id)) => {
                    active.anchors.on_removed(*id);
                }
                (Handler::AnchorPoseChanged, XrEvent::AnchorPoseChanged { anchor, pose }) => {
                    active.anchors.on_pose_changed(*anchor, *pose);
                }
                (Handler::AnchorsDetected, XrEvent::AnchorsDetected(ids)) => {
                    active.anchors.on_detected(ids);
                }
                (Handler::PlaneAdded, XrEvent::PlaneAdded(plane)) => active.planes.on_added(plane),
                (Handler::PlaneRemoved, XrEvent::PlaneRemoved(plane)) => {
                    active.planes.on_removed(plane);
                }
                (Handler::PlaneChanged, XrEvent::PlaneChanged(plane)) => {
                    active.planes.on_changed(plane);
                }
                (Handler::PlanesDetected, XrEvent::PlanesDetected(planes)) => {
                    active.planes.on_detected(planes);
                }
                (Handler::ControllerConnected, XrEvent::InputConnected(source)) => {
                    active.input.on_connected(source);
                }
                (Handler::AnchorToggle, XrEvent::SelectEnd(source)) => {
                    active
                        .input
                        .on_select_end(source, &mut active.anchors)
                        .await?;
                }
                (Handler::ReticleFrame, XrEvent::Frame(timestamp)) => {
                    active.hit_test.on_frame(*timestamp);
                }
                (Handler::ReticlePlacement, XrEvent::Select(source)) => {
                    active.hit_test.on_select(source);
                }
                (handler, event) => {
                    tracing::warn!(?handler, kind = ?event.kind(), "handler registered for wrong kind");
                }
            }
        }

        Ok(())
    }

    /// Current state
    #[must_use]
    pub fn state(&self) -> LifecycleState {
        self.state
    }

    /// Whether a session is running
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.state == LifecycleState::Active
    }

    /// Subscribed handlers
    #[must_use]
    pub fn registry(&self) -> &ListenerRegistry {
        &self.registry
    }

    /// Shared context
    #[must_use]
    pub fn context(&self) -> &XrContext {
        &self.ctx
    }

    /// Running session
    #[must_use]
    pub fn session(&self) -> Option<&SessionRef> {
        self.active.as_ref().map(|a| &a.session)
    }

    /// Anchor coordinator of the running session
    #[must_use]
    pub fn anchors(&self) -> Option<&AnchorEventCoordinator> {
        self.active.as_ref().map(|a| &a.anchors)
    }

    /// Plane coordinator of the running session
    #[must_use]
    pub fn planes(&self) -> Option<&PlaneEventCoordinator> {
        self.active.as_ref().map(|a| &a.planes)
    }

    /// Input coordinator of the running session
    #[must_use]
    pub fn input(&self) -> Option<&ControllerInputCoordinator> {
        self.active.as_ref().map(|a| &a.input)
    }

    /// Reticle coordinator of the running session
    #[must_use]
    pub fn hit_test(&self) -> Option<&HitTestCoordinator> {
        self.active.as_ref().map(|a| &a.hit_test)
    }

    /// Overlay attach cycles started since the last call
    pub fn take_attachments(&mut self) -> Vec<JoinHandle<AttachOutcome>> {
        self.active
            .as_mut()
            .map(|a| a.anchors.take_attachments())
            .unwrap_or_default()
    }
}

impl std::fmt::Debug for SessionLifecycleController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionLifecycleController")
            .field("state", &self.state)
            .field("registry", &self.registry)
            .field("anchors", &self.anchors())
            .finish_non_exhaustive()
    }
}
