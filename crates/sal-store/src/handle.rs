//! Anchor handle type

use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque identifier returned by the tracking session when a persistent
/// anchor is created.
///
/// Serializes as a bare JSON string so the persisted array stays
/// `["uuid-1", "uuid-2"]`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AnchorHandle(String);

impl AnchorHandle {
    /// Wrap a raw handle string
    #[inline]
    #[must_use]
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    /// Raw handle string
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consume into the raw string
    #[inline]
    #[must_use]
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for AnchorHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for AnchorHandle {
    fn from(raw: &str) -> Self {
        Self::new(raw)
    }
}

impl From<String> for AnchorHandle {
    fn from(raw: String) -> Self {
        Self(raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn handle_serializes_as_plain_string() {
        let handles = vec![AnchorHandle::new("a"), AnchorHandle::new("b")];
        let json = serde_json::to_string(&handles).unwrap();
        assert_eq!(json, r#"["a","b"]"#);
    }

    #[test]
    fn handle_display() {
        assert_eq!(AnchorHandle::from("xyz").to_string(), "xyz");
    }
}
