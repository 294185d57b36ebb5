//! Resource fetch collaborators.
//!
//! The loader never touches storage directly; it asks a [`ResourceFetcher`]
//! for text or bytes by locator.

use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::path::{Component, Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use tracing::trace;

use crate::error::FetchError;

/// Asynchronous "locator in, contents out" capability.
#[async_trait(?Send)]
pub trait ResourceFetcher {
    async fn fetch_bytes(&self, locator: &str) -> Result<Vec<u8>, FetchError>;

    async fn fetch_text(&self, locator: &str) -> Result<String, FetchError> {
        let bytes = self.fetch_bytes(locator).await?;
        String::from_utf8(bytes).map_err(|e| FetchError::Rejected {
            locator: locator.to_string(),
            reason: format!("not valid UTF-8: {e}"),
        })
    }
}

/// Reads locators as paths below a root directory.
#[derive(Debug, Clone)]
pub struct FsFetcher {
    root: PathBuf,
}

impl FsFetcher {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Map a locator to a path inside the root; anything escaping it is rejected.
    fn resolve(&self, locator: &str) -> Result<PathBuf, FetchError> {
        let relative = Path::new(locator.trim_start_matches('/'));
        let escapes = relative
            .components()
            .any(|c| matches!(c, Component::ParentDir | Component::Prefix(_)));
        if escapes || locator.contains("://") {
            return Err(FetchError::Rejected {
                locator: locator.to_string(),
                reason: "outside of the resource root".to_string(),
            });
        }
        Ok(self.root.join(relative))
    }
}

#[async_trait(?Send)]
impl ResourceFetcher for FsFetcher {
    async fn fetch_bytes(&self, locator: &str) -> Result<Vec<u8>, FetchError> {
        let path = self.resolve(locator)?;
        trace!(?path, "Reading resource");
        tokio::fs::read(&path).await.map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => FetchError::NotFound(locator.to_string()),
            _ => FetchError::Io {
                locator: locator.to_string(),
                reason: e.to_string(),
            },
        })
    }
}

/// In-memory resources with per-locator latency and failure injection.
#[derive(Debug, Default)]
pub struct MemoryFetcher {
    resources: HashMap<String, Vec<u8>>,
    latency: HashMap<String, Duration>,
    failing: HashSet<String>,
    default_latency: Duration,
    requests: RefCell<Vec<String>>,
}

impl MemoryFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_text(mut self, locator: impl Into<String>, text: impl Into<String>) -> Self {
        self.insert(locator, text.into().into_bytes());
        self
    }

    pub fn insert(&mut self, locator: impl Into<String>, bytes: Vec<u8>) {
        self.resources.insert(locator.into(), bytes);
    }

    /// Delay before `locator` resolves.
    pub fn with_latency(mut self, locator: impl Into<String>, latency: Duration) -> Self {
        self.latency.insert(locator.into(), latency);
        self
    }

    /// Delay for locators without their own latency.
    pub fn with_default_latency(mut self, latency: Duration) -> Self {
        self.default_latency = latency;
        self
    }

    /// Make `locator` fail with an IO error even if it is present.
    pub fn with_failure(mut self, locator: impl Into<String>) -> Self {
        self.failing.insert(locator.into());
        self
    }

    /// Locators requested so far, in request order.
    pub fn requests(&self) -> Vec<String> {
        self.requests.borrow().clone()
    }
}

#[async_trait(?Send)]
impl ResourceFetcher for MemoryFetcher {
    async fn fetch_bytes(&self, locator: &str) -> Result<Vec<u8>, FetchError> {
        self.requests.borrow_mut().push(locator.to_string());

        let latency = self
            .latency
            .get(locator)
            .copied()
            .unwrap_or(self.default_latency);
        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }

        if self.failing.contains(locator) {
            return Err(FetchError::Io {
                locator: locator.to_string(),
                reason: "injected failure".to_string(),
            });
        }
        self.resources
            .get(locator)
            .cloned()
            .ok_or_else(|| FetchError::NotFound(locator.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_memory_fetcher() {
        let fetcher = MemoryFetcher::new()
            .with_text("a.obj", "v 0 0 0")
            .with_text("b.obj", "v 1 1 1")
            .with_latency("a.obj", Duration::from_secs(2))
            .with_failure("b.obj");

        let start = tokio::time::Instant::now();
        assert_eq!(fetcher.fetch_text("a.obj").await.unwrap(), "v 0 0 0");
        assert!(start.elapsed() >= Duration::from_secs(2));

        assert!(matches!(
            fetcher.fetch_text("b.obj").await,
            Err(FetchError::Io { .. })
        ));
        assert_eq!(
            fetcher.fetch_text("c.obj").await,
            Err(FetchError::NotFound("c.obj".to_string()))
        );
        assert_eq!(fetcher.requests(), vec!["a.obj", "b.obj", "c.obj"]);
    }

    #[tokio::test]
    async fn test_invalid_utf8_rejected() {
        let mut fetcher = MemoryFetcher::new();
        fetcher.insert("bin", vec![0xff, 0xfe]);
        assert!(matches!(
            fetcher.fetch_text("bin").await,
            Err(FetchError::Rejected { .. })
        ));
    }

    #[tokio::test]
    async fn test_fs_fetcher() {
        let root = std::env::temp_dir().join(format!("lam-fetch-{}", uuid::Uuid::new_v4()));
        tokio::fs::create_dir_all(root.join("meshes")).await.unwrap();
        tokio::fs::write(root.join("meshes/base.obj"), "v 0 0 0\n").await.unwrap();

        let fetcher = FsFetcher::new(&root);
        assert_eq!(fetcher.fetch_text("meshes/base.obj").await.unwrap(), "v 0 0 0\n");
        assert!(matches!(
            fetcher.fetch_text("meshes/none.obj").await,
            Err(FetchError::NotFound(_))
        ));
        assert!(matches!(
            fetcher.fetch_text("../etc/passwd").await,
            Err(FetchError::Rejected { .. })
        ));

        let _ = tokio::fs::remove_dir_all(&root).await;
    }
}
