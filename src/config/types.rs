//! Configuration types for the leave engine.
//!
//! This module contains the strongly-typed configuration structures that
//! are deserialized from YAML configuration files.

use serde::Deserialize;

use crate::calculation::RotationAnchor;
use crate::models::WorkPatternDraft;

/// Metadata about the engine deployment.
#[derive(Debug, Clone, Deserialize)]
pub struct EngineMetadata {
    /// Human-readable name of the deployment.
    pub name: String,
    /// Version of the configuration set.
    pub version: String,
}

/// Settings for the work pattern calendar.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CalendarConfig {
    /// Where week boundaries of a pattern rotation fall.
    #[serde(default)]
    pub rotation_anchor: RotationAnchor,
}

/// Structure of `engine.yaml`.
#[derive(Debug, Clone, Deserialize)]
pub struct EngineFile {
    /// Deployment metadata.
    pub engine: EngineMetadata,
    /// Calendar settings.
    #[serde(default)]
    pub calendar: CalendarConfig,
}

/// Structure of `work_patterns.yaml`.
#[derive(Debug, Clone, Deserialize)]
pub struct WorkPatternsFile {
    /// Patterns to seed into a fresh store, in creation order.
    pub work_patterns: Vec<WorkPatternDraft>,
}

/// The complete engine configuration loaded from YAML files.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    metadata: EngineMetadata,
    calendar: CalendarConfig,
    work_patterns: Vec<WorkPatternDraft>,
}

impl EngineConfig {
    /// Creates an EngineConfig from its component parts.
    pub fn new(
        metadata: EngineMetadata,
        calendar: CalendarConfig,
        work_patterns: Vec<WorkPatternDraft>,
    ) -> Self {
        Self {
            metadata,
            calendar,
            work_patterns,
        }
    }

    /// Returns the deployment metadata.
    pub fn engine(&self) -> &EngineMetadata {
        &self.metadata
    }

    /// Returns the calendar settings.
    pub fn calendar(&self) -> &CalendarConfig {
        &self.calendar
    }

    /// Returns the seed work patterns.
    pub fn work_patterns(&self) -> &[WorkPatternDraft] {
        &self.work_patterns
    }
}
