//! SAL Core - spatial anchor and plane lifecycle manager
//!
//! Subscribes to a spatial-tracking session's detection events and keeps the
//! scene, the durable handle store and a video overlay in step with them:
//! 1. **Anchors**: dedup by identity, one marker each, overlay attached
//! 2. **Planes**: vertical planes drawn once as bounding-box markers
//! 3. **Input**: `select-end` toggles between creating and clearing anchors
//! 4. **Overlay**: bounded, cancellable retry around a capacity-one resource
//! 5. **Lifecycle**: restore on start, exact unsubscribe on end
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use sal_core::prelude::*;
//!
//! let ctx = XrContext::new(scene, PersistentHandleStore::new(backend), overlay, config);
//! let mut controller = SessionLifecycleController::new(ctx);
//!
//! controller.start(session).await?;
//! controller.handle(XrEvent::AnchorsDetected(ids)).await?;
//! controller.end();
//! ```

pub mod anchors;
pub mod config;
pub mod context;
pub mod error;
pub mod events;
pub mod input;
pub mod lifecycle;
pub mod listeners;
pub mod media;
pub mod overlay;
pub mod planes;
pub mod scene;
pub mod session;
pub mod types;

// Test harness
pub mod test_harness;

pub use error::*;
pub use types::*;

/// Common imports for embedding the core
pub mod prelude {
    pub use crate::anchors::AnchorEventCoordinator;
    pub use crate::config::{HidePolicy, OverlayConfig, PlayoutAsset, SessionConfig, StereoLayout};
    pub use crate::context::XrContext;
    pub use crate::error::{ConfigError, LifecycleError, OverlayError, SalError, SessionError};
    pub use crate::events::{EventKind, XrEvent};
    pub use crate::hit_test::HitTestCoordinator;
    pub use crate::input::{ControllerInputCoordinator, ToggleOutcome};
    pub use crate::lifecycle::{LifecycleState, SessionLifecycleController};
    pub use crate::listeners::{Handler, ListenerRegistry, Owner, Subscriber};
    pub use crate::media::{LayerCompositor, LayerRef, MediaPlayer, QuadLayerInit};
    pub use crate::overlay::{AttachOutcome, AttachState, OverlayAttachmentManager, OverlayBinding};
    pub use crate::planes::PlaneEventCoordinator;
    pub use crate::scene::SceneGraph;
    pub use crate::session::{SessionRef, TrackingSession, XrFrame};
    pub use crate::types::{
        AnchorHandle, AnchorId, DetectedPlane, Handedness, InputSource, MarkerId, PlaneId,
        PlaneOrientation, Pose, ReferenceSpace,
    };
    pub use sal_store::{JsonFileStore, KeyValueStore, MemoryStore, PersistentHandleStore};
}

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
