//! Controller input coordinator
//!
//! Maps `select-end` to the anchor toggle: with fewer persisted handles than
//! the clear threshold a new persistent anchor is created at the controller,
//! otherwise every persisted anchor is deleted.

use crate::anchors::AnchorEventCoordinator;
use crate::context::XrContext;
use crate::error::SalError;
use crate::listeners::{Handler, Subscriber};
use crate::session::SessionRef;
use crate::types::{AnchorHandle, Handedness, InputSource};
use std::collections::HashMap;

/// What a `select-end` did
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToggleOutcome {
    /// Hand is excluded from anchor placement
    Ignored,
    /// A persistent anchor was created
    Created(AnchorHandle),
    /// This many persisted anchors were deleted
    Cleared(usize),
}

/// Turns controller gestures into anchor create/clear actions
pub struct ControllerInputCoordinator {
    ctx: XrContext,
    session: SessionRef,
    connected: HashMap<u8, Handedness>,
}

impl ControllerInputCoordinator {
    /// Create coordinator for one session
    #[must_use]
    pub fn new(ctx: XrContext, session: SessionRef) -> Self {
        Self {
            ctx,
            session,
            connected: HashMap::new(),
        }
    }

    /// Input device connected
    pub fn on_connected(&mut self, source: &InputSource) {
        self.connected.insert(source.index, source.handedness);
        tracing::debug!(index = source.index, hand = %source.handedness, "controller connected");
    }

    /// Handedness last reported by a controller slot
    #[must_use]
    pub fn handedness(&self, index: u8) -> Option<Handedness> {
        self.connected.get(&index).copied()
    }

    /// `select-end`
    ///
    /// # Errors
    /// Session failures from create/delete and store write failures. A clear
    /// interrupted by an error keeps the undeleted prefix persisted, and still
    /// drops markers and the overlay when anything was deleted.
    pub async fn on_select_end(
        &mut self,
        source: &InputSource,
        anchors: &mut AnchorEventCoordinator,
    ) -> Result<ToggleOutcome, SalError> {
        if self.ctx.config.ignores(source.handedness) {
            tracing::trace!(hand = %source.handedness, "select-end ignored");
            return Ok(ToggleOutcome::Ignored);
        }

        let mut handles = self.ctx.store.load();

        if handles.len() >= self.ctx.config.clear_threshold {
            let cleared = self.clear(&mut handles, anchors).await?;
            return Ok(ToggleOutcome::Cleared(cleared));
        }

        let handle = self
            .session
            .create_anchor(source.position, source.orientation, true)
            .await?;
        if !handles.contains(&handle) {
            handles.push(handle.clone());
        }
        self.ctx.store.save(&handles)?;

        tracing::info!(%handle, persisted = handles.len(), "anchor created");
        Ok(ToggleOutcome::Created(handle))
    }

    async fn clear(
        &self,
        handles: &mut Vec<AnchorHandle>,
        anchors: &mut AnchorEventCoordinator,
    ) -> Result<usize, SalError> {
        let mut cleared = 0;
        let mut failure = None;

        while let Some(handle) = handles.pop() {
            if let Err(e) = self.session.delete_anchor(&handle).await {
                handles.push(handle);
                failure = Some(SalError::from(e));
                break;
            }
            cleared += 1;
            if let Err(e) = self.ctx.store.save(handles) {
                failure = Some(e.into());
                break;
            }
            tracing::debug!(%handle, remaining = handles.len(), "anchor deleted");
        }

        // Whatever was deleted no longer has an anchor to show
        if cleared > 0 {
            anchors.clear_markers();
            if let Err(e) = self.ctx.overlay.hide().await {
                tracing::warn!("failed to hide overlay: {}", e);
            }
        }

        if let Some(e) = failure {
            tracing::warn!(cleared, remaining = handles.len(), "clear interrupted: {}", e);
            return Err(e);
        }
        tracing::info!(cleared, "anchors cleared");
        Ok(cleared)
    }
}

impl Subscriber for ControllerInputCoordinator {
    const HANDLERS: &'static [Handler] = &[Handler::ControllerConnected, Handler::AnchorToggle];
}

impl std::fmt::Debug for ControllerInputCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ControllerInputCoordinator")
            .field("connected", &self.connected)
            .finish_non_exhaustive()
    }
}
