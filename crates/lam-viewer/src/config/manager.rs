//! Configuration manager for loading and saving viewer configuration

use std::path::{Path, PathBuf};

use thiserror::Error;

use super::ViewerConfig;

/// Configuration error types
#[derive(Debug, Clone, Error)]
pub enum ConfigError {
    /// IO error during file operations
    #[error("IO error: {0}")]
    Io(String),
    /// Error during serialization
    #[error("Serialization error: {0}")]
    Serialize(String),
    /// Error during deserialization
    #[error("Deserialization error: {0}")]
    Deserialize(String),
}

/// Holds the active configuration and the file it came from
pub struct ConfigManager {
    config: ViewerConfig,
    config_path: PathBuf,
    dirty: bool,
}

impl ConfigManager {
    /// Load from `path`, falling back to defaults when the file is missing or malformed
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let config_path = path.into();
        let config = Self::load_from_path(&config_path).unwrap_or_else(|| {
            tracing::info!("No usable config file at {:?}, using defaults", config_path);
            ViewerConfig::new()
        });

        Self {
            config,
            config_path,
            dirty: false,
        }
    }

    /// Load configuration from a file path
    fn load_from_path(path: &Path) -> Option<ViewerConfig> {
        let content = std::fs::read_to_string(path).ok()?;
        match Self::parse(&content) {
            Ok(config) => {
                tracing::info!("Loaded config from {:?}", path);
                Some(config)
            }
            Err(e) => {
                tracing::warn!("Failed to parse config file: {}", e);
                None
            }
        }
    }

    /// Parse RON text into a configuration
    pub fn parse(content: &str) -> Result<ViewerConfig, ConfigError> {
        ron::from_str(content).map_err(|e| ConfigError::Deserialize(e.to_string()))
    }

    /// Get a reference to the current configuration
    pub fn config(&self) -> &ViewerConfig {
        &self.config
    }

    /// Get a mutable reference to the configuration (marks as dirty)
    pub fn config_mut(&mut self) -> &mut ViewerConfig {
        self.dirty = true;
        &mut self.config
    }

    /// Check if the configuration has unsaved changes
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Save the configuration to disk
    pub fn save(&mut self) -> Result<(), ConfigError> {
        if !self.dirty {
            return Ok(());
        }

        if let Some(parent) = self.config_path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent).map_err(|e| ConfigError::Io(e.to_string()))?;
        }

        let content = ron::ser::to_string_pretty(&self.config, ron::ser::PrettyConfig::default())
            .map_err(|e| ConfigError::Serialize(e.to_string()))?;

        std::fs::write(&self.config_path, &content).map_err(|e| ConfigError::Io(e.to_string()))?;

        tracing::info!("Saved config to {:?}", self.config_path);
        self.dirty = false;
        Ok(())
    }

    /// Reset configuration to defaults
    pub fn reset_to_defaults(&mut self) {
        self.config = ViewerConfig::new();
        self.dirty = true;
    }

    /// Get the config file path
    pub fn config_file_path(&self) -> &Path {
        &self.config_path
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scratch_path(name: &str) -> PathBuf {
        std::env::temp_dir()
            .join(format!("lam-viewer-config-{}", uuid::Uuid::new_v4()))
            .join(name)
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let manager = ConfigManager::new(scratch_path("absent.ron"));
        assert_eq!(manager.config(), &ViewerConfig::new());
        assert!(!manager.is_dirty());
    }

    #[test]
    fn test_save_and_reload() {
        let path = scratch_path("viewer.ron");
        let mut manager = ConfigManager::new(&path);

        // Clean managers do not write.
        manager.save().unwrap();
        assert!(!path.exists());

        manager.config_mut().camera.fov_degrees = 30.0;
        assert!(manager.is_dirty());
        manager.save().unwrap();
        assert!(!manager.is_dirty());

        let reloaded = ConfigManager::new(&path);
        assert_eq!(reloaded.config().camera.fov_degrees, 30.0);
        assert_eq!(reloaded.config_file_path(), path.as_path());

        if let Some(dir) = path.parent() {
            let _ = std::fs::remove_dir_all(dir);
        }
    }

    #[test]
    fn test_malformed_file_uses_defaults() {
        let path = scratch_path("broken.ron");
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, "(camera: oops").unwrap();

        let mut manager = ConfigManager::new(&path);
        assert_eq!(manager.config(), &ViewerConfig::new());
        assert!(ConfigManager::parse("(camera: oops").is_err());

        manager.reset_to_defaults();
        assert!(manager.is_dirty());

        let _ = std::fs::remove_dir_all(path.parent().unwrap());
    }
}
