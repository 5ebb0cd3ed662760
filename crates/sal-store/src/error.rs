//! Error types for durable storage

use std::path::PathBuf;

/// Storage backend errors
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Reading the backing file failed
    #[error("failed to read {path}: {source}")]
    Read {
        /// Backing file
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// Writing the backing file failed
    #[error("failed to write {path}: {source}")]
    Write {
        /// Backing file
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// Backing file is not a JSON object of string values
    #[error("corrupt store file {path}: {source}")]
    Corrupt {
        /// Backing file
        path: PathBuf,
        /// Parse error
        #[source]
        source: serde_json::Error,
    },

    /// Value could not be encoded
    #[error("failed to encode value: {0}")]
    Encode(#[from] serde_json::Error),
}

impl StoreError {
    /// Path of the backing file involved, if any
    #[must_use]
    pub fn path(&self) -> Option<&PathBuf> {
        match self {
            Self::Read { path, .. } | Self::Write { path, .. } | Self::Corrupt { path, .. } => {
                Some(path)
            }
            Self::Encode(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_error_display_includes_path() {
        let err = StoreError::Write {
            path: PathBuf::from("/tmp/handles.json"),
            source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        };
        assert!(err.to_string().contains("/tmp/handles.json"));
        assert_eq!(err.path(), Some(&PathBuf::from("/tmp/handles.json")));
    }
}
