//! SAL Store - durable anchor-handle persistence
//!
//! Anchors created with persistence enabled survive across sessions only as
//! opaque [`AnchorHandle`] strings. This crate keeps those handles in a single
//! JSON array under a fixed key of a [`KeyValueStore`]:
//! - [`PersistentHandleStore`]: typed read/write of the whole handle array
//! - [`MemoryStore`]: in-process backend (tests, simulation)
//! - [`JsonFileStore`]: file-backed backend with atomic replace
//!
//! # Example
//!
//! ```rust
//! use sal_store::{AnchorHandle, MemoryStore, PersistentHandleStore};
//! use std::sync::Arc;
//!
//! let store = PersistentHandleStore::new(Arc::new(MemoryStore::new()));
//! store.save(&[AnchorHandle::new("a"), AnchorHandle::new("b")]).unwrap();
//!
//! let handles = store.load();
//! assert_eq!(handles.len(), 2);
//! ```

#![warn(missing_docs)]
#![warn(unreachable_pub)]

mod backend;
mod error;
mod handle;
mod persistent;

pub use backend::{JsonFileStore, KeyValueStore, MemoryStore};
pub use error::StoreError;
pub use handle::AnchorHandle;
pub use persistent::{PersistentHandleStore, DEFAULT_HANDLES_KEY};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
