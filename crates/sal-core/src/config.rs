//! Session configuration
//!
//! Every knob has a default matching the converged behaviour, so an empty
//! TOML document is a valid configuration.

use crate::error::ConfigError;
use crate::types::Handedness;
use sal_store::DEFAULT_HANDLES_KEY;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Top-level configuration for one lifecycle controller
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Durable store key holding the handle array
    pub storage_key: String,
    /// Persisted handle count at which a select-end clears instead of creating
    pub clear_threshold: usize,
    /// Hands whose select-end never touches anchors
    pub ignored_handedness: Vec<Handedness>,
    /// Materialize horizontal planes as well as vertical ones
    pub include_horizontal_planes: bool,
    /// Hand whose select places an object at the hit-test reticle
    pub placement_hand: Handedness,
    /// Anchor marker dimensions
    pub anchor_marker: MarkerSize,
    /// Overlay attachment settings
    pub overlay: OverlayConfig,
}

impl SessionConfig {
    /// Create default configuration
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// With clear threshold
    #[inline]
    #[must_use]
    pub fn with_clear_threshold(mut self, threshold: usize) -> Self {
        self.clear_threshold = threshold;
        self
    }

    /// With storage key
    #[inline]
    #[must_use]
    pub fn with_storage_key(mut self, key: impl Into<String>) -> Self {
        self.storage_key = key.into();
        self
    }

    /// With horizontal planes materialized
    #[inline]
    #[must_use]
    pub fn with_horizontal_planes(mut self, include: bool) -> Self {
        self.include_horizontal_planes = include;
        self
    }

    /// With overlay settings
    #[inline]
    #[must_use]
    pub fn with_overlay(mut self, overlay: OverlayConfig) -> Self {
        self.overlay = overlay;
        self
    }

    /// Whether select-end events from `hand` are ignored
    #[inline]
    #[must_use]
    pub fn ignores(&self, hand: Handedness) -> bool {
        self.ignored_handedness.contains(&hand)
    }

    /// Parse and validate a TOML document
    ///
    /// # Errors
    /// - `ConfigError::Parse` for malformed TOML or unknown values
    /// - `ConfigError::Invalid` for out-of-range values
    pub fn from_toml_str(raw: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a TOML file
    ///
    /// # Errors
    /// - `ConfigError::Read` if the file cannot be read
    /// - see [`Self::from_toml_str`]
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&raw)
    }

    /// Check value constraints
    ///
    /// # Errors
    /// `ConfigError::Invalid` naming the first offending field
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.storage_key.is_empty() {
            return Err(invalid("storage_key", "must not be empty"));
        }
        if self.clear_threshold == 0 {
            return Err(invalid("clear_threshold", "must be at least 1"));
        }
        if !(self.overlay.width > 0.0 && self.overlay.height > 0.0) {
            return Err(invalid("overlay", "width and height must be positive"));
        }
        if let Some(asset) = self.overlay.assets.iter().find(|a| !matches!(a.fps, 24 | 30)) {
            return Err(invalid(
                "overlay.assets.fps",
                format!("{} has unsupported frame rate {}", asset.name, asset.fps),
            ));
        }
        Ok(())
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            storage_key: DEFAULT_HANDLES_KEY.to_string(),
            clear_threshold: 1,
            ignored_handedness: vec![Handedness::Right],
            include_horizontal_planes: false,
            placement_hand: Handedness::Right,
            anchor_marker: MarkerSize::default(),
            overlay: OverlayConfig::default(),
        }
    }
}

fn invalid(field: &'static str, reason: impl Into<String>) -> ConfigError {
    ConfigError::Invalid {
        field,
        reason: reason.into(),
    }
}

/// Box marker dimensions in world units
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MarkerSize {
    /// Extent along X
    pub width: f32,
    /// Extent along Y
    pub height: f32,
    /// Extent along Z
    pub depth: f32,
}

impl Default for MarkerSize {
    fn default() -> Self {
        Self {
            width: 0.150,
            height: 0.075,
            depth: 0.02,
        }
    }
}

/// What `hide` does besides pausing playback
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum HidePolicy {
    /// Pause only; the quad layer stays in the render state
    #[default]
    PauseOnly,
    /// Pause and drop the quad layer from the render state
    DetachLayer,
}

/// Overlay attachment settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OverlayConfig {
    /// Quad width in world units
    pub width: f32,
    /// Quad height in world units
    pub height: f32,
    /// Retries after the first failed attempt
    pub max_retries: u32,
    /// Delay before each retry
    pub retry_delay_ms: u64,
    /// Behaviour of `hide`
    pub hide_policy: HidePolicy,
    /// Playout catalog
    pub assets: Vec<PlayoutAsset>,
}

impl OverlayConfig {
    /// Delay before each retry
    #[inline]
    #[must_use]
    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }

    /// With hide policy
    #[inline]
    #[must_use]
    pub fn with_hide_policy(mut self, policy: HidePolicy) -> Self {
        self.hide_policy = policy;
        self
    }

    /// With retry bound
    #[inline]
    #[must_use]
    pub fn with_max_retries(mut self, retries: u32) -> Self {
        self.max_retries = retries;
        self
    }

    /// With playout catalog
    #[inline]
    #[must_use]
    pub fn with_assets(mut self, assets: Vec<PlayoutAsset>) -> Self {
        self.assets = assets;
        self
    }

    /// Asset to play: the one flagged `default`, else the first
    #[must_use]
    pub fn selected_asset(&self) -> Option<&PlayoutAsset> {
        self.assets
            .iter()
            .find(|a| a.default)
            .or_else(|| self.assets.first())
    }
}

impl Default for OverlayConfig {
    fn default() -> Self {
        Self {
            width: 0.36,
            height: 0.20,
            max_retries: 2,
            retry_delay_ms: 500,
            hide_policy: HidePolicy::default(),
            assets: Vec::new(),
        }
    }
}

/// Frame packing of a stream
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StereoLayout {
    /// Single view
    #[default]
    Mono,
    /// Side by side
    StereoLeftRight,
    /// Above/below
    StereoTopBottom,
}

/// Playable stream
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayoutAsset {
    /// Display name
    pub name: String,
    /// Manifest or file URI
    pub stream_uri: String,
    /// Widevine license server, if the stream is protected
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub drm_uri: Option<String>,
    /// Frames per second (24 or 30)
    pub fps: u8,
    /// Frame packing
    #[serde(default)]
    pub layout: StereoLayout,
    /// Preferred entry of the catalog
    #[serde(default)]
    pub default: bool,
}

impl PlayoutAsset {
    /// Whether playback needs a license server
    #[inline]
    #[must_use]
    pub fn is_protected(&self) -> bool {
        self.drm_uri.is_some()
    }
}
