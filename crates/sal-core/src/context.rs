//! Shared context handed to every coordinator

use crate::config::SessionConfig;
use crate::overlay::OverlayAttachmentManager;
use crate::scene::SceneGraph;
use sal_store::PersistentHandleStore;
use std::sync::Arc;

/// Long-lived collaborators shared by the coordinators
///
/// Cloning is cheap; every field is reference counted.
#[derive(Clone)]
pub struct XrContext {
    /// Rendering engine scene
    pub scene: Arc<dyn SceneGraph>,
    /// Persisted anchor handles
    pub store: PersistentHandleStore,
    /// Single shared overlay
    pub overlay: Arc<OverlayAttachmentManager>,
    /// Configuration
    pub config: Arc<SessionConfig>,
}

impl XrContext {
    /// Assemble a context
    #[must_use]
    pub fn new(
        scene: Arc<dyn SceneGraph>,
        store: PersistentHandleStore,
        overlay: Arc<OverlayAttachmentManager>,
        config: Arc<SessionConfig>,
    ) -> Self {
        Self {
            scene,
            store,
            overlay,
            config,
        }
    }
}

impl std::fmt::Debug for XrContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("XrContext")
            .field("store", &self.store)
            .field("overlay", &self.overlay)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
