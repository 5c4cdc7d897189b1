//! Caller-resolvable artifact locations.
//!
//! Renderers hand back an [`ArtifactKey`] instead of a host path. A key is a
//! relative, forward-slash path under the renderer's output root, so it can be
//! exposed to clients as a URL without leaking drive letters or absolute
//! filesystem layout.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ArtifactKeyError {
    #[error("artifact key is empty")]
    Empty,

    #[error("artifact key must be relative: {0}")]
    Absolute(String),

    #[error("artifact key contains a drive or scheme separator: {0}")]
    DriveSeparator(String),

    #[error("artifact key must use forward slashes: {0}")]
    Backslash(String),

    #[error("artifact key escapes the output root: {0}")]
    Traversal(String),
}

/// Relative location of a rendered artifact under the output root.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(try_from = "String", into = "String")]
pub struct ArtifactKey(String);

impl ArtifactKey {
    /// Validate and wrap a relative key.
    pub fn new(key: impl Into<String>) -> Result<Self, ArtifactKeyError> {
        let key = key.into();
        if key.trim().is_empty() {
            return Err(ArtifactKeyError::Empty);
        }
        if key.contains('\\') {
            return Err(ArtifactKeyError::Backslash(key));
        }
        if key.contains(':') {
            return Err(ArtifactKeyError::DriveSeparator(key));
        }
        if key.starts_with('/') {
            return Err(ArtifactKeyError::Absolute(key));
        }
        if key.split('/').any(|segment| segment == ".." || segment.is_empty()) {
            return Err(ArtifactKeyError::Traversal(key));
        }
        Ok(Self(key))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Public URL for this key under a mount prefix such as `/media`.
    pub fn to_url(&self, prefix: &str) -> String {
        format!("{}/{}", prefix.trim_end_matches('/'), self.0)
    }
}

impl TryFrom<String> for ArtifactKey {
    type Error = ArtifactKeyError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<ArtifactKey> for String {
    fn from(key: ArtifactKey) -> Self {
        key.0
    }
}

impl fmt::Display for ArtifactKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
