//! Media playback and composition-layer interfaces

use crate::config::PlayoutAsset;
use crate::error::OverlayError;
use crate::session::SessionRef;
use crate::types::{LayerId, Mat4, MediaBindingId, ReferenceSpace};
use async_trait::async_trait;

/// Playable media element
#[async_trait]
pub trait MediaPlayer: Send + Sync {
    /// Load a stream, configuring the license server for protected assets
    async fn load(&self, asset: &PlayoutAsset) -> Result<(), OverlayError>;

    /// Start or resume playback
    async fn play(&self) -> Result<(), OverlayError>;

    /// Pause playback
    fn pause(&self);
}

/// Entry of a session's render-state layer list
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LayerRef {
    /// Media quad layer
    Quad(LayerId),
    /// The renderer's projection layer
    Base,
}

/// Parameters of a quad layer
#[derive(Debug, Clone, PartialEq)]
pub struct QuadLayerInit {
    /// Space the transform is expressed in
    pub space: ReferenceSpace,
    /// Quad placement
    pub transform: Mat4,
    /// Quad width in world units
    pub width: f32,
    /// Quad height in world units
    pub height: f32,
}

/// Overlay/layer API of the session
#[async_trait]
pub trait LayerCompositor: Send + Sync {
    /// Bind media playback to a session and reference space
    fn create_media_binding(
        &self,
        session: &SessionRef,
        space: &ReferenceSpace,
    ) -> Result<MediaBindingId, OverlayError>;

    /// Create a quad layer showing the bound media element
    async fn create_quad_layer(
        &self,
        binding: MediaBindingId,
        init: QuadLayerInit,
    ) -> Result<LayerId, OverlayError>;

    /// Replace the session's layer list
    async fn update_render_state(
        &self,
        session: &SessionRef,
        layers: &[LayerRef],
    ) -> Result<(), OverlayError>;
}
