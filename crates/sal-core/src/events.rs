//! Events delivered to the lifecycle controller
//!
//! Tracking-session detection/change events, input-device events and the
//! per-frame tick. Session start/end are not events here; they are the
//! controller's `start`/`end` operations.

use crate::types::{AnchorId, DetectedPlane, InputSource, Pose};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Event kind, the unit of subscription
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EventKind {
    /// An anchor was added to the tracked set
    AnchorAdded,
    /// An anchor was removed from the tracked set
    AnchorRemoved,
    /// A tracked anchor moved or lost tracking
    AnchorPoseChanged,
    /// Anchors tracked in the current frame
    AnchorsDetected,
    /// A plane was added to the tracked set
    PlaneAdded,
    /// A plane was removed from the tracked set
    PlaneRemoved,
    /// A tracked plane changed
    PlaneChanged,
    /// Planes tracked in the current frame
    PlanesDetected,
    /// An input device connected
    InputConnected,
    /// Primary action completed
    Select,
    /// Primary action released
    SelectEnd,
    /// Render-loop tick
    Frame,
}

/// Event payloads
#[derive(Debug, Clone, PartialEq)]
pub enum XrEvent {
    /// `anchor-added`
    AnchorAdded(AnchorId),
    /// `anchor-removed`
    AnchorRemoved(AnchorId),
    /// `anchor-pose-changed`; `pose` is `None` while tracking is lost
    AnchorPoseChanged {
        /// Anchor identity
        anchor: AnchorId,
        /// New pose
        pose: Option<Pose>,
    },
    /// `anchors-detected`
    AnchorsDetected(HashSet<AnchorId>),
    /// `plane-added`
    PlaneAdded(DetectedPlane),
    /// `plane-removed`
    PlaneRemoved(DetectedPlane),
    /// `plane-changed`
    PlaneChanged(DetectedPlane),
    /// `planes-detected`; identities are unique within one event
    PlanesDetected(Vec<DetectedPlane>),
    /// Input device connected
    InputConnected(InputSource),
    /// `select`
    Select(InputSource),
    /// `select-end`
    SelectEnd(InputSource),
    /// Render-loop tick with a timestamp in milliseconds
    Frame(f64),
}

impl XrEvent {
    /// Kind used for routing
    #[must_use]
    pub fn kind(&self) -> EventKind {
        match self {
            Self::AnchorAdded(_) => EventKind::AnchorAdded,
            Self::AnchorRemoved(_) => EventKind::AnchorRemoved,
            Self::AnchorPoseChanged { .. } => EventKind::AnchorPoseChanged,
            Self::AnchorsDetected(_) => EventKind::AnchorsDetected,
            Self::PlaneAdded(_) => EventKind::PlaneAdded,
            Self::PlaneRemoved(_) => EventKind::PlaneRemoved,
            Self::PlaneChanged(_) => EventKind::PlaneChanged,
            Self::PlanesDetected(_) => EventKind::PlanesDetected,
            Self::InputConnected(_) => EventKind::InputConnected,
            Self::Select(_) => EventKind::Select,
            Self::SelectEnd(_) => EventKind::SelectEnd,
            Self::Frame(_) => EventKind::Frame,
        }
    }
}
