//! Listener registry
//!
//! Every handler a coordinator registers is a named [`Handler`] value, so a
//! coordinator can remove exactly what it added, any number of times.

use crate::events::EventKind;
use std::collections::BTreeMap;

/// Coordinator that owns a handler
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Owner {
    /// [`crate::anchors::AnchorEventCoordinator`]
    Anchors,
    /// [`crate::planes::PlaneEventCoordinator`]
    Planes,
    /// [`crate::input::ControllerInputCoordinator`]
    Input,
    /// [`crate::hit_test::HitTestCoordinator`]
    HitTest,
}

/// Stable handler identity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Handler {
    /// Logs anchor additions
    AnchorAdded,
    /// Logs anchor removals
    AnchorRemoved,
    /// Moves or hides anchor markers
    AnchorPoseChanged,
    /// Materializes newly detected anchors
    AnchorsDetected,
    /// Logs plane additions
    PlaneAdded,
    /// Logs plane removals
    PlaneRemoved,
    /// Logs plane changes
    PlaneChanged,
    /// Materializes newly detected planes
    PlanesDetected,
    /// Records controller handedness
    ControllerConnected,
    /// Create/clear anchor toggle on select-end
    AnchorToggle,
    /// Follows hit-test results with the reticle
    ReticleFrame,
    /// Places an object at the reticle on select
    ReticlePlacement,
}

impl Handler {
    /// Event kind the handler listens to
    #[must_use]
    pub const fn kind(self) -> EventKind {
        match self {
            Self::AnchorAdded => EventKind::AnchorAdded,
            Self::AnchorRemoved => EventKind::AnchorRemoved,
            Self::AnchorPoseChanged => EventKind::AnchorPoseChanged,
            Self::AnchorsDetected => EventKind::AnchorsDetected,
            Self::PlaneAdded => EventKind::PlaneAdded,
            Self::PlaneRemoved => EventKind::PlaneRemoved,
            Self::PlaneChanged => EventKind::PlaneChanged,
            Self::PlanesDetected => EventKind::PlanesDetected,
            Self::ControllerConnected => EventKind::InputConnected,
            Self::AnchorToggle => EventKind::SelectEnd,
            Self::ReticleFrame => EventKind::Frame,
            Self::ReticlePlacement => EventKind::Select,
        }
    }

    /// Coordinator the handler belongs to
    #[must_use]
    pub const fn owner(self) -> Owner {
        match self {
            Self::AnchorAdded
            | Self::AnchorRemoved
            | Self::AnchorPoseChanged
            | Self::AnchorsDetected => Owner::Anchors,
            Self::PlaneAdded | Self::PlaneRemoved | Self::PlaneChanged | Self::PlanesDetected => {
                Owner::Planes
            }
            Self::ControllerConnected | Self::AnchorToggle => Owner::Input,
            Self::ReticleFrame | Self::ReticlePlacement => Owner::HitTest,
        }
    }
}

/// Handlers currently subscribed, per event kind, in subscription order
#[derive(Debug, Default)]
pub struct ListenerRegistry {
    by_kind: BTreeMap<EventKind, Vec<Handler>>,
}

impl ListenerRegistry {
    /// Create empty registry
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribe a handler; returns `false` if it already was
    pub fn subscribe(&mut self, handler: Handler) -> bool {
        let handlers = self.by_kind.entry(handler.kind()).or_default();
        if handlers.contains(&handler) {
            return false;
        }
        handlers.push(handler);
        true
    }

    /// Unsubscribe a handler; returns `false` if it was not subscribed
    pub fn unsubscribe(&mut self, handler: Handler) -> bool {
        let kind = handler.kind();
        let Some(handlers) = self.by_kind.get_mut(&kind) else {
            return false;
        };
        let before = handlers.len();
        handlers.retain(|h| *h != handler);
        let removed = handlers.len() != before;
        if handlers.is_empty() {
            self.by_kind.remove(&kind);
        }
        removed
    }

    /// Whether a handler is subscribed
    #[must_use]
    pub fn is_subscribed(&self, handler: Handler) -> bool {
        self.by_kind
            .get(&handler.kind())
            .is_some_and(|handlers| handlers.contains(&handler))
    }

    /// Handlers to invoke for an event kind
    #[must_use]
    pub fn handlers(&self, kind: EventKind) -> Vec<Handler> {
        self.by_kind.get(&kind).cloned().unwrap_or_default()
    }

    /// Total subscribed handlers
    #[must_use]
    pub fn len(&self) -> usize {
        self.by_kind.values().map(Vec::len).sum()
    }

    /// Whether nothing is subscribed
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.by_kind.is_empty()
    }
}

/// Coordinator with a fixed handler set
pub trait Subscriber {
    /// Handlers this coordinator registers
    const HANDLERS: &'static [Handler];

    /// Register every handler
    fn subscribe(&self, registry: &mut ListenerRegistry) {
        for handler in Self::HANDLERS {
            registry.subscribe(*handler);
        }
    }

    /// Remove every handler; safe to call repeatedly
    fn unsubscribe(&self, registry: &mut ListenerRegistry) {
        for handler in Self::HANDLERS {
            registry.unsubscribe(*handler);
        }
    }
}
