//! Rendering engine interface
//!
//! The engine owns the scene graph and draw loop. Markers are opaque to the
//! core once added; the returned [`MarkerId`] is the only way back to them.

use crate::types::{Mat4, MarkerId, MarkerSpec, Vec3};

/// Scene graph operations used by the coordinators
///
/// Methods take `&self`; implementations use interior mutability so the
/// scene can be shared with the overlay manager's background tasks.
pub trait SceneGraph: Send + Sync {
    /// Add a marker to the scene
    fn add(&self, spec: MarkerSpec) -> MarkerId;

    /// Remove a marker; returns whether it was present
    fn remove(&self, marker: MarkerId) -> bool;

    /// Overwrite a marker's world transform
    fn set_transform(&self, marker: MarkerId, transform: Mat4);

    /// Show or hide a marker
    fn set_visible(&self, marker: MarkerId, visible: bool);

    /// World position of a marker still in the scene
    fn world_position(&self, marker: MarkerId) -> Option<Vec3>;

    /// Current camera (viewpoint) position
    fn camera_position(&self) -> Vec3;

    /// Move the camera back to the origin
    fn reset_camera(&self);
}
