//! Error types for fetching, loading and mesh resolution.

use std::time::Duration;

use lam_core::ObjError;
use thiserror::Error;

/// Failure reported by a [`ResourceFetcher`](crate::fetch::ResourceFetcher).
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FetchError {
    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("IO error reading {locator}: {reason}")]
    Io { locator: String, reason: String },

    #[error("Resource {locator} rejected: {reason}")]
    Rejected { locator: String, reason: String },
}

/// Whole-model load failures; these are surfaced to the caller.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum LoadError {
    #[error("Failed to fetch model {locator}: {source}")]
    Fetch {
        locator: String,
        #[source]
        source: FetchError,
    },

    #[error("Invalid model description {locator}: {reason}")]
    Invalid { locator: String, reason: String },

    #[error("Failed to parse geometry {locator}: {source}")]
    Geometry {
        locator: String,
        #[source]
        source: ObjError,
    },

    #[error("Model {locator} has no links")]
    Empty { locator: String },

    #[error("Loading {locator} timed out after {after:?}")]
    Timeout { locator: String, after: Duration },

    /// The viewer was disposed, or another load replaced this one.
    #[error("Viewer was disposed during loading")]
    Disposed,
}

impl LoadError {
    /// Locator of the offending resource, when there is one.
    pub fn locator(&self) -> Option<&str> {
        match self {
            LoadError::Fetch { locator, .. }
            | LoadError::Invalid { locator, .. }
            | LoadError::Geometry { locator, .. }
            | LoadError::Empty { locator }
            | LoadError::Timeout { locator, .. } => Some(locator),
            LoadError::Disposed => None,
        }
    }
}

/// Failure to materialize one mesh reference. Logged, never fatal to a load.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum MeshResolutionError {
    #[error("Failed to fetch mesh {locator}: {source}")]
    Fetch {
        locator: String,
        #[source]
        source: FetchError,
    },

    #[error("Failed to parse mesh {locator}: {source}")]
    Parse {
        locator: String,
        #[source]
        source: ObjError,
    },

    #[error("Unsupported mesh format: {locator}")]
    UnsupportedFormat { locator: String },

    #[error("Unsupported mesh URI scheme: {locator}")]
    UnsupportedUri { locator: String },

    #[error("Mesh {locator} contains no geometry")]
    Empty { locator: String },
}

impl MeshResolutionError {
    pub fn locator(&self) -> &str {
        match self {
            MeshResolutionError::Fetch { locator, .. }
            | MeshResolutionError::Parse { locator, .. }
            | MeshResolutionError::UnsupportedFormat { locator }
            | MeshResolutionError::UnsupportedUri { locator }
            | MeshResolutionError::Empty { locator } => locator,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_carry_locator() {
        let err = LoadError::Fetch {
            locator: "robots/arm.urdf".to_string(),
            source: FetchError::NotFound("robots/arm.urdf".to_string()),
        };
        assert_eq!(err.locator(), Some("robots/arm.urdf"));
        assert!(err.to_string().contains("robots/arm.urdf"));
        assert_eq!(LoadError::Disposed.locator(), None);

        let err = MeshResolutionError::UnsupportedFormat {
            locator: "a.stl".to_string(),
        };
        assert_eq!(err.locator(), "a.stl");
    }
}
