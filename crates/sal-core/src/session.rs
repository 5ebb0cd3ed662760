//! Tracking session interface
//!
//! The host runtime owns the tracking algorithm. The core only sees it as an
//! event source (see [`crate::events`]) plus the small imperative API below.

use crate::error::SessionError;
use crate::types::{AnchorHandle, Pose, Quat, ReferenceSpace, SpaceRef, Vec3};
use async_trait::async_trait;
use std::sync::Arc;

/// Shared reference to the running session
pub type SessionRef = Arc<dyn TrackingSession>;

/// Imperative side of a spatial-tracking session
#[async_trait]
pub trait TrackingSession: Send + Sync {
    /// Create an anchor at a world pose
    ///
    /// With `persistent` set the returned handle can restore the anchor in a
    /// later session.
    async fn create_anchor(
        &self,
        position: Vec3,
        orientation: Quat,
        persistent: bool,
    ) -> Result<AnchorHandle, SessionError>;

    /// Forget a persistent anchor
    async fn delete_anchor(&self, handle: &AnchorHandle) -> Result<(), SessionError>;

    /// Ask the runtime to re-detect a persistent anchor
    ///
    /// Success only means the request was accepted; the anchor shows up later
    /// through `anchors-detected`, or never if the handle no longer resolves.
    async fn restore_anchor(&self, handle: &AnchorHandle) -> Result<(), SessionError>;

    /// Reference space poses are expressed in
    fn reference_space(&self) -> ReferenceSpace;

    /// Frame currently being processed, if any
    fn frame(&self) -> Option<Arc<dyn XrFrame>>;
}

/// Snapshot of one tracking frame
pub trait XrFrame: Send + Sync {
    /// Pose of `space` relative to `reference`, if currently tracked
    fn pose(&self, space: SpaceRef, reference: &ReferenceSpace) -> Option<Pose>;

    /// Hit-test results for the viewer ray, nearest first
    fn hit_test_results(&self, reference: &ReferenceSpace) -> Vec<Pose>;
}
