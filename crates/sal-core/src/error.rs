//! Error types for SAL Core
//!
//! Provides error handling for:
//! - Tracking-session API failures
//! - Overlay attachment failures (retried locally, never surfaced)
//! - Session lifecycle misuse
//! - Configuration loading

use crate::lifecycle::LifecycleState;
use crate::types::MarkerId;
use sal_store::{AnchorHandle, StoreError};
use std::path::PathBuf;

/// Main SAL error type
#[derive(Debug, thiserror::Error)]
pub enum SalError {
    /// Tracking session call failed
    #[error("session error: {0}")]
    Session(#[from] SessionError),

    /// Durable store write failed
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// Overlay operation failed
    #[error("overlay error: {0}")]
    Overlay(#[from] OverlayError),

    /// Lifecycle transition rejected
    #[error("lifecycle error: {0}")]
    Lifecycle(#[from] LifecycleError),

    /// Configuration could not be loaded
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
}

/// Tracking session errors
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SessionError {
    /// Anchor creation rejected by the runtime
    #[error("anchor creation failed: {0}")]
    CreateAnchorFailed(String),

    /// Anchor deletion rejected by the runtime
    #[error("anchor deletion failed for {handle}: {reason}")]
    DeleteAnchorFailed {
        /// Handle being deleted
        handle: AnchorHandle,
        /// Runtime message
        reason: String,
    },

    /// Persisted anchor could not be restored
    #[error("anchor restore failed for {handle}: {reason}")]
    RestoreAnchorFailed {
        /// Handle being restored
        handle: AnchorHandle,
        /// Runtime message
        reason: String,
    },

    /// Session has ended
    #[error("session ended")]
    Ended,
}

/// Overlay attachment errors
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum OverlayError {
    /// No session bound to the overlay manager
    #[error("no active session")]
    NoSession,

    /// Marker is no longer part of the scene
    #[error("{0} not found in scene")]
    MarkerNotFound(MarkerId),

    /// Media asset could not be loaded
    #[error("media load failed: {0}")]
    LoadFailed(String),

    /// Playback could not start
    #[error("playback failed: {0}")]
    PlaybackFailed(String),

    /// Media binding could not be created
    #[error("media binding failed: {0}")]
    BindingFailed(String),

    /// Quad layer could not be created
    #[error("layer creation failed: {0}")]
    LayerFailed(String),

    /// Render state update rejected
    #[error("render state update failed: {0}")]
    RenderStateFailed(String),
}

/// Lifecycle errors
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum LifecycleError {
    /// Transition not allowed from the current state
    #[error("illegal lifecycle transition: {from:?} -> {to:?}")]
    IllegalTransition {
        /// Current state
        from: LifecycleState,
        /// Requested state
        to: LifecycleState,
    },
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Config file could not be read
    #[error("failed to read {path}: {source}")]
    Read {
        /// Config path
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// Config is not valid TOML for [`crate::config::SessionConfig`]
    #[error("invalid configuration: {0}")]
    Parse(#[from] toml::de::Error),

    /// Config parsed but violates a constraint
    #[error("invalid value for {field}: {reason}")]
    Invalid {
        /// Offending field
        field: &'static str,
        /// Constraint violated
        reason: String,
    },
}
