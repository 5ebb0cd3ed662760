//! Overlay attachment manager
//!
//! Binds the single shared media element into a quad layer placed at a
//! marker's world position.
//!
//! The overlay APIs are often unavailable for a moment right after session
//! start, so failure is an expected outcome here:
//! - One attach cycle = first attempt plus up to `max_retries` retries,
//!   `retry_delay` apart; after that the failure is logged and dropped
//! - Cycles are serialized: only one attach is in flight at a time
//! - Each cycle is cancellable by marker, and all cycles are cancelled when
//!   the session ends

use crate::config::{HidePolicy, OverlayConfig};
use crate::error::OverlayError;
use crate::media::{LayerCompositor, LayerRef, MediaPlayer, QuadLayerInit};
use crate::scene::SceneGraph;
use crate::session::SessionRef;
use crate::types::{LayerId, Mat4, MarkerId, MediaBindingId, Vec3};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Attach state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AttachState {
    /// Nothing in flight
    #[default]
    Idle,
    /// Attempt `attempt` (1-based) running
    Attaching {
        /// Attempt number
        attempt: u32,
    },
    /// Attempt `attempt` failed, waiting for the retry delay
    RetryScheduled {
        /// Attempt that failed
        attempt: u32,
    },
    /// Overlay is bound
    Attached,
    /// Retries exhausted
    GaveUp,
}

/// Final result of one attach cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttachOutcome {
    /// Overlay bound to the marker
    Attached,
    /// Every attempt failed
    GaveUp,
    /// Cancelled before completing
    Cancelled,
}

/// Active overlay binding
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OverlayBinding {
    /// Marker the overlay is placed at
    pub marker: MarkerId,
    /// Media binding in use
    pub binding: MediaBindingId,
    /// Quad layer in the render state
    pub layer: LayerId,
    /// World position the quad was placed at
    pub position: Vec3,
}

struct PendingAttach {
    ticket: u64,
    token: CancellationToken,
}

#[derive(Default)]
struct Inner {
    state: AttachState,
    retry_count: u32,
    session: Option<SessionRef>,
    binding: Option<OverlayBinding>,
    pending: HashMap<MarkerId, PendingAttach>,
    media_loaded: bool,
    next_ticket: u64,
    attempts: u64,
}

/// Owner of the shared overlay/media pair
pub struct OverlayAttachmentManager {
    config: OverlayConfig,
    scene: Arc<dyn SceneGraph>,
    player: Arc<dyn MediaPlayer>,
    compositor: Arc<dyn LayerCompositor>,
    /// Capacity-one ownership token for the overlay
    slot: tokio::sync::Mutex<()>,
    inner: Mutex<Inner>,
}

impl OverlayAttachmentManager {
    /// Create manager
    #[must_use]
    pub fn new(
        config: OverlayConfig,
        scene: Arc<dyn SceneGraph>,
        player: Arc<dyn MediaPlayer>,
        compositor: Arc<dyn LayerCompositor>,
    ) -> Self {
        Self {
            config,
            scene,
            player,
            compositor,
            slot: tokio::sync::Mutex::new(()),
            inner: Mutex::new(Inner::default()),
        }
    }

    /// Scope the manager to a running session
    pub fn bind_session(&self, session: SessionRef) {
        self.inner.lock().session = Some(session);
    }

    /// Drop the session, cancelling every pending cycle
    pub fn release_session(&self) {
        let cancelled = self.cancel_pending();
        let mut inner = self.inner.lock();
        inner.session = None;
        inner.binding = None;
        inner.retry_count = 0;
        inner.state = AttachState::Idle;
        tracing::debug!(cancelled, "overlay released session");
    }

    /// Start an attach cycle for `marker`
    ///
    /// Returns immediately; the cycle runs on a spawned task. A pending cycle
    /// for the same marker is superseded.
    pub fn attach(self: &Arc<Self>, marker: MarkerId) -> JoinHandle<AttachOutcome> {
        let (ticket, token) = {
            let mut inner = self.inner.lock();
            inner.next_ticket += 1;
            let ticket = inner.next_ticket;
            let token = CancellationToken::new();
            let pending = PendingAttach {
                ticket,
                token: token.clone(),
            };
            if let Some(previous) = inner.pending.insert(marker, pending) {
                previous.token.cancel();
            }
            (ticket, token)
        };

        let this = Arc::clone(self);
        tokio::spawn(async move {
            let outcome = this.run_cycle(marker, &token).await;
            let mut inner = this.inner.lock();
            if inner.pending.get(&marker).is_some_and(|p| p.ticket == ticket) {
                inner.pending.remove(&marker);
            }
            outcome
        })
    }

    /// Cancel the pending cycle for one marker
    pub fn cancel(&self, marker: MarkerId) -> bool {
        match self.inner.lock().pending.remove(&marker) {
            Some(pending) => {
                pending.token.cancel();
                true
            }
            None => false,
        }
    }

    /// Cancel every pending cycle; returns how many were cancelled
    pub fn cancel_pending(&self) -> usize {
        let drained: Vec<_> = self.inner.lock().pending.drain().collect();
        for (_, pending) in &drained {
            pending.token.cancel();
        }
        drained.len()
    }

    /// Pause playback, and detach the layer under [`HidePolicy::DetachLayer`]
    ///
    /// # Errors
    /// `OverlayError::RenderStateFailed` if the layer list update is rejected;
    /// the binding is kept in that case.
    pub async fn hide(&self) -> Result<(), OverlayError> {
        self.player.pause();

        if self.config.hide_policy == HidePolicy::PauseOnly {
            tracing::debug!("overlay paused");
            return Ok(());
        }

        let (session, binding) = {
            let mut inner = self.inner.lock();
            (inner.session.clone(), inner.binding.take())
        };
        let (Some(session), Some(binding)) = (session, binding) else {
            return Ok(());
        };

        if let Err(e) = self
            .compositor
            .update_render_state(&session, &[LayerRef::Base])
            .await
        {
            self.inner.lock().binding = Some(binding);
            return Err(e);
        }

        let mut inner = self.inner.lock();
        if inner.state == AttachState::Attached {
            inner.state = AttachState::Idle;
        }
        tracing::debug!(marker = %binding.marker, "overlay layer detached");
        Ok(())
    }

    /// Current state
    #[must_use]
    pub fn state(&self) -> AttachState {
        self.inner.lock().state
    }

    /// Failures counted in the current cycle
    #[must_use]
    pub fn retry_count(&self) -> u32 {
        self.inner.lock().retry_count
    }

    /// Active binding, if attached
    #[must_use]
    pub fn active_binding(&self) -> Option<OverlayBinding> {
        self.inner.lock().binding
    }

    /// Cycles started and not yet finished
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.inner.lock().pending.len()
    }

    /// Attempts made over the manager's lifetime
    #[must_use]
    pub fn attempts(&self) -> u64 {
        self.inner.lock().attempts
    }

    async fn run_cycle(&self, marker: MarkerId, token: &CancellationToken) -> AttachOutcome {
        let _slot = tokio::select! {
            biased;
            () = token.cancelled() => {
                tracing::debug!(%marker, "overlay attach cancelled while queued");
                return AttachOutcome::Cancelled;
            }
            guard = self.slot.lock() => guard,
        };

        loop {
            if token.is_cancelled() {
                return self.cancelled(marker);
            }

            let attempt = {
                let mut inner = self.inner.lock();
                inner.attempts += 1;
                let attempt = inner.retry_count + 1;
                inner.state = AttachState::Attaching { attempt };
                attempt
            };

            let error = match self.try_attach(marker, token).await {
                Ok(Some(binding)) => {
                    let mut inner = self.inner.lock();
                    inner.retry_count = 0;
                    inner.state = AttachState::Attached;
                    inner.binding = Some(binding);
                    tracing::info!(%marker, attempt, "overlay attached");
                    return AttachOutcome::Attached;
                }
                Ok(None) => return self.cancelled(marker),
                Err(e) => e,
            };

            let retry = {
                let mut inner = self.inner.lock();
                inner.retry_count += 1;
                if inner.retry_count <= self.config.max_retries {
                    inner.state = AttachState::RetryScheduled { attempt };
                    true
                } else {
                    inner.retry_count = 0;
                    inner.state = AttachState::GaveUp;
                    false
                }
            };

            if !retry {
                tracing::warn!(%marker, attempts = attempt, "giving up on overlay: {}", error);
                return AttachOutcome::GaveUp;
            }

            tracing::debug!(
                %marker,
                attempt,
                delay_ms = self.config.retry_delay_ms,
                "overlay attach failed, retrying: {}",
                error
            );

            tokio::select! {
                biased;
                () = token.cancelled() => return self.cancelled(marker),
                () = tokio::time::sleep(self.config.retry_delay()) => {}
            }
        }
    }

    /// One attempt; `Ok(None)` when cancelled part way, with playback and
    /// layers rolled back
    async fn try_attach(
        &self,
        marker: MarkerId,
        token: &CancellationToken,
    ) -> Result<Option<OverlayBinding>, OverlayError> {
        let position = self
            .scene
            .world_position(marker)
            .ok_or(OverlayError::MarkerNotFound(marker))?;

        let (session, needs_load) = {
            let inner = self.inner.lock();
            let session = inner.session.clone().ok_or(OverlayError::NoSession)?;
            (session, !inner.media_loaded)
        };

        if needs_load {
            if let Some(asset) = self.config.selected_asset() {
                self.player.load(asset).await?;
                tracing::info!(asset = %asset.name, protected = asset.is_protected(), "playout asset loaded");
            }
            self.inner.lock().media_loaded = true;
        }

        let space = session.reference_space();
        let binding = self.compositor.create_media_binding(&session, &space)?;
        if token.is_cancelled() {
            return Ok(None);
        }

        self.player.play().await?;

        let layer = self
            .compositor
            .create_quad_layer(
                binding,
                QuadLayerInit {
                    space,
                    transform: Mat4::from_translation(position),
                    width: self.config.width,
                    height: self.config.height,
                },
            )
            .await;
        // A hide issued meanwhile saw no binding, so undo playback here
        if token.is_cancelled() {
            self.player.pause();
            return Ok(None);
        }
        let layer = layer?;

        self.compositor
            .update_render_state(&session, &[LayerRef::Quad(layer), LayerRef::Base])
            .await?;
        if token.is_cancelled() {
            self.player.pause();
            self.compositor
                .update_render_state(&session, &[LayerRef::Base])
                .await?;
            return Ok(None);
        }

        Ok(Some(OverlayBinding {
            marker,
            binding,
            layer,
            position,
        }))
    }

    /// Cancellation of the cycle holding the slot
    fn cancelled(&self, marker: MarkerId) -> AttachOutcome {
        let mut inner = self.inner.lock();
        inner.retry_count = 0;
        inner.state = AttachState::Idle;
        tracing::debug!(%marker, "overlay attach cancelled");
        AttachOutcome::Cancelled
    }
}

impl std::fmt::Debug for OverlayAttachmentManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.inner.lock();
        f.debug_struct("OverlayAttachmentManager")
            .field("config", &self.config)
            .field("state", &inner.state)
            .field("retry_count", &inner.retry_count)
            .field("binding", &inner.binding)
            .field("pending", &inner.pending.len())
            .finish_non_exhaustive()
    }
}
