//! Plane event coordinator
//!
//! Materializes each detected plane once, as an invisible box sized to the
//! bounding box of its polygon. Only vertical planes are drawn unless the
//! configuration opts into horizontal ones.

use crate::context::XrContext;
use crate::listeners::{Handler, Subscriber};
use crate::session::SessionRef;
use crate::types::{
    BoundingBox, DetectedPlane, Geometry, MarkerId, MarkerSpec, Material, PlaneId,
    PlaneOrientation, SpaceRef,
};
use std::collections::HashSet;

/// Thickness of a plane marker
const PLANE_MARKER_DEPTH: f32 = 0.01;

/// Owner of the materialized plane set
pub struct PlaneEventCoordinator {
    ctx: XrContext,
    session: SessionRef,
    recorded: HashSet<PlaneId>,
}

impl PlaneEventCoordinator {
    /// Create coordinator for one session
    #[must_use]
    pub fn new(ctx: XrContext, session: SessionRef) -> Self {
        Self {
            ctx,
            session,
            recorded: HashSet::new(),
        }
    }

    /// `plane-added`
    pub fn on_added(&self, plane: &DetectedPlane) {
        tracing::debug!(plane = %plane.id, orientation = %plane.orientation, "plane added");
    }

    /// `plane-removed`
    pub fn on_removed(&self, plane: &DetectedPlane) {
        tracing::debug!(plane = %plane.id, "plane removed");
    }

    /// `plane-changed`
    pub fn on_changed(&self, plane: &DetectedPlane) {
        tracing::trace!(plane = %plane.id, "plane changed");
    }

    /// `planes-detected`; returns the markers created
    pub fn on_detected(&mut self, planes: &[DetectedPlane]) -> Vec<MarkerId> {
        let mut created = Vec::new();

        for plane in planes {
            if self.recorded.contains(&plane.id) {
                continue;
            }
            if plane.orientation == PlaneOrientation::Horizontal
                && !self.ctx.config.include_horizontal_planes
            {
                continue;
            }
            if let Some(marker) = self.materialize(plane) {
                self.recorded.insert(plane.id);
                created.push(marker);
            }
        }

        created
    }

    /// Whether a plane has been materialized
    #[must_use]
    pub fn is_recorded(&self, plane: PlaneId) -> bool {
        self.recorded.contains(&plane)
    }

    /// Number of materialized planes
    #[must_use]
    pub fn len(&self) -> usize {
        self.recorded.len()
    }

    /// Whether no plane has been materialized
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.recorded.is_empty()
    }

    fn materialize(&self, plane: &DetectedPlane) -> Option<MarkerId> {
        let Some(bbox) = BoundingBox::from_polygon(&plane.polygon) else {
            tracing::warn!(
                plane = %plane.id,
                vertices = plane.polygon.len(),
                "plane polygon too small for a bounding box"
            );
            return None;
        };

        let frame = self.session.frame()?;
        let Some(pose) = frame.pose(SpaceRef::Plane(plane.id), &self.session.reference_space())
        else {
            tracing::debug!(plane = %plane.id, "no pose for detected plane yet");
            return None;
        };

        let spec = MarkerSpec::new(
            format!("plane-{}", plane.orientation),
            Geometry::Box {
                width: bbox.width(),
                height: PLANE_MARKER_DEPTH,
                depth: bbox.height(),
            },
            Material::transparent(rand::random::<u32>() & 0x00ff_ffff),
            pose.transform,
        );

        let marker = self.ctx.scene.add(spec);
        tracing::info!(
            plane = %plane.id,
            %marker,
            width = bbox.width(),
            height = bbox.height(),
            "plane materialized"
        );
        Some(marker)
    }
}

impl Subscriber for PlaneEventCoordinator {
    const HANDLERS: &'static [Handler] = &[
        Handler::PlaneAdded,
        Handler::PlaneRemoved,
        Handler::PlaneChanged,
        Handler::PlanesDetected,
    ];
}

impl std::fmt::Debug for PlaneEventCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlaneEventCoordinator")
            .field("recorded", &self.recorded)
            .finish_non_exhaustive()
    }
}
