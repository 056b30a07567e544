//! Configuration loading functionality.
//!
//! This module provides the [`ConfigLoader`] type for loading the engine
//! configuration from YAML files.

use std::fs;
use std::path::Path;

use tracing::info;

use crate::calculation::RotationAnchor;
use crate::error::{EngineError, EngineResult};
use crate::models::WorkPattern;
use crate::services::WorkPatternCalendar;
use crate::store::LeaveStore;

use super::types::{EngineConfig, EngineFile, EngineMetadata, WorkPatternsFile};

/// Loads and provides access to the engine configuration.
///
/// # Directory Structure
///
/// ```text
/// config/default/
/// ├── engine.yaml         # Metadata and calendar settings
/// └── work_patterns.yaml  # Patterns seeded into a fresh store
/// ```
///
/// # Example
///
/// ```no_run
/// use leave_engine::config::ConfigLoader;
/// use leave_engine::store::InMemoryStore;
///
/// let loader = ConfigLoader::load("./config/default").unwrap();
/// println!("Loaded: {}", loader.engine().name);
///
/// let mut store = InMemoryStore::new();
/// let seeded = loader.seed_work_patterns(&mut store).unwrap();
/// println!("Seeded {} work patterns", seeded.len());
/// ```
#[derive(Debug, Clone)]
pub struct ConfigLoader {
    config: EngineConfig,
}

impl ConfigLoader {
    /// Loads configuration from the specified directory.
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the configuration directory (e.g., "./config/default")
    ///
    /// # Returns
    ///
    /// Returns a `ConfigLoader` instance on success, or an error if:
    /// - Any required file is missing
    /// - Any file contains invalid YAML
    /// - Any required field is missing from the configuration
    pub fn load<P: AsRef<Path>>(path: P) -> EngineResult<Self> {
        let path = path.as_ref();

        let engine = Self::load_yaml::<EngineFile>(&path.join("engine.yaml"))?;
        let patterns = Self::load_yaml::<WorkPatternsFile>(&path.join("work_patterns.yaml"))?;

        let config = EngineConfig::new(engine.engine, engine.calendar, patterns.work_patterns);
        info!(
            path = %path.display(),
            name = %config.engine().name,
            work_patterns = config.work_patterns().len(),
            "Loaded engine configuration"
        );

        Ok(Self { config })
    }

    /// Loads and parses a YAML file.
    fn load_yaml<T: serde::de::DeserializeOwned>(path: &Path) -> EngineResult<T> {
        let path_str = path.display().to_string();

        let content = fs::read_to_string(path).map_err(|_| EngineError::ConfigNotFound {
            path: path_str.clone(),
        })?;

        serde_yaml::from_str(&content).map_err(|e| EngineError::ConfigParseError {
            path: path_str,
            message: e.to_string(),
        })
    }

    /// Returns the underlying configuration.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Returns the deployment metadata.
    pub fn engine(&self) -> &EngineMetadata {
        self.config.engine()
    }

    /// Returns the configured rotation anchor.
    pub fn rotation_anchor(&self) -> RotationAnchor {
        self.config.calendar().rotation_anchor
    }

    /// Creates the configured seed patterns in `store`.
    ///
    /// Patterns go through the same validation as any other create, so a
    /// bad seed fails with `Validation`.
    pub fn seed_work_patterns<S: LeaveStore>(&self, store: &mut S) -> EngineResult<Vec<WorkPattern>> {
        let mut calendar = WorkPatternCalendar::new(store, self.rotation_anchor());
        self.config
            .work_patterns()
            .iter()
            .map(|draft| calendar.create(draft.clone()))
            .collect()
    }
}
