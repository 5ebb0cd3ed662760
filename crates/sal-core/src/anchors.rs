//! Anchor event coordinator
//!
//! Turns anchor detections into scene markers:
//! - At most one marker per anchor identity for the life of the session
//! - Markers follow pose changes and hide while tracking is lost
//! - Every new marker gets the shared overlay attached

use crate::context::XrContext;
use crate::listeners::{Handler, Subscriber};
use crate::overlay::AttachOutcome;
use crate::session::SessionRef;
use crate::types::{
    yaw_towards, AnchorId, Geometry, Mat4, MarkerId, MarkerSpec, Material, Pose, Quat, SpaceRef,
};
use std::collections::{HashMap, HashSet};
use tokio::task::JoinHandle;

/// Owner of the anchor identity → marker mapping
pub struct AnchorEventCoordinator {
    ctx: XrContext,
    session: SessionRef,
    records: HashMap<AnchorId, MarkerId>,
    /// Identities already materialized; survives `clear_markers`
    seen: HashSet<AnchorId>,
    attachments: Vec<JoinHandle<AttachOutcome>>,
}

impl AnchorEventCoordinator {
    /// Create coordinator for one session
    #[must_use]
    pub fn new(ctx: XrContext, session: SessionRef) -> Self {
        Self {
            ctx,
            session,
            records: HashMap::new(),
            seen: HashSet::new(),
            attachments: Vec::new(),
        }
    }

    /// `anchor-added`
    pub fn on_added(&self, anchor: AnchorId) {
        tracing::debug!(%anchor, "anchor added");
    }

    /// `anchor-removed`
    pub fn on_removed(&self, anchor: AnchorId) {
        tracing::debug!(%anchor, "anchor removed");
    }

    /// `anchor-pose-changed`
    pub fn on_pose_changed(&self, anchor: AnchorId, pose: Option<Pose>) {
        let Some(&marker) = self.records.get(&anchor) else {
            tracing::trace!(%anchor, "pose change for unrecorded anchor");
            return;
        };

        match pose {
            Some(pose) => {
                self.ctx.scene.set_transform(marker, pose.transform);
                self.ctx.scene.set_visible(marker, true);
            }
            None => self.ctx.scene.set_visible(marker, false),
        }
    }

    /// `anchors-detected`; returns the markers created
    pub fn on_detected(&mut self, anchors: &HashSet<AnchorId>) -> Vec<MarkerId> {
        let mut created = Vec::new();

        for &anchor in anchors {
            if self.seen.contains(&anchor) {
                continue;
            }

            // Not marked seen: the next detection gets another chance.
            let Some(pose) = self.current_pose(anchor) else {
                tracing::debug!(%anchor, "no pose for detected anchor yet");
                continue;
            };

            let marker = self.materialize(anchor, pose);
            self.records.insert(anchor, marker);
            self.seen.insert(anchor);
            self.attachments.push(self.ctx.overlay.attach(marker));
            created.push(marker);
        }

        created
    }

    /// Remove every marker from the scene and forget the records
    pub fn clear_markers(&mut self) -> usize {
        let cleared = self.records.len();
        for (_, marker) in self.records.drain() {
            self.ctx.overlay.cancel(marker);
            self.ctx.scene.remove(marker);
        }
        tracing::debug!(cleared, "anchor markers cleared");
        cleared
    }

    /// Release everything held for the session
    pub fn teardown(&mut self) {
        self.clear_markers();
        self.seen.clear();
    }

    /// Marker recorded for an anchor
    #[must_use]
    pub fn marker_for(&self, anchor: AnchorId) -> Option<MarkerId> {
        self.records.get(&anchor).copied()
    }

    /// Number of recorded anchors
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether no anchor is recorded
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Attach cycles started since the last call
    pub fn take_attachments(&mut self) -> Vec<JoinHandle<AttachOutcome>> {
        std::mem::take(&mut self.attachments)
    }

    fn current_pose(&self, anchor: AnchorId) -> Option<Pose> {
        let frame = self.session.frame()?;
        frame.pose(SpaceRef::Anchor(anchor), &self.session.reference_space())
    }

    fn materialize(&self, anchor: AnchorId, pose: Pose) -> MarkerId {
        let position = pose.position();
        let yaw = yaw_towards(self.ctx.scene.camera_position(), position);
        let size = self.ctx.config.anchor_marker;

        let spec = MarkerSpec::new(
            format!("anchor-{}", anchor.0),
            Geometry::Box {
                width: size.width,
                height: size.height,
                depth: size.depth,
            },
            Material::random_opaque(),
            Mat4::from_rotation_translation(Quat::from_rotation_y(yaw), position),
        );

        let marker = self.ctx.scene.add(spec);
        tracing::info!(%anchor, %marker, ?position, "anchor materialized");
        marker
    }
}

impl Subscriber for AnchorEventCoordinator {
    const HANDLERS: &'static [Handler] = &[
        Handler::AnchorAdded,
        Handler::AnchorRemoved,
        Handler::AnchorPoseChanged,
        Handler::AnchorsDetected,
    ];
}

impl std::fmt::Debug for AnchorEventCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnchorEventCoordinator")
            .field("records", &self.records)
            .field("seen", &self.seen.len())
            .finish_non_exhaustive()
    }
}
