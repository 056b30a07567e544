//! Configuration loading and management for the leave engine.
//!
//! This module loads deployment metadata, calendar settings and the work
//! patterns seeded into a fresh store from YAML files.
//!
//! # Example
//!
//! ```no_run
//! use leave_engine::config::ConfigLoader;
//!
//! let config = ConfigLoader::load("./config/default").unwrap();
//! println!("Rotation anchor: {:?}", config.rotation_anchor());
//! ```

mod loader;
mod types;

pub use loader::ConfigLoader;
pub use types::{CalendarConfig, EngineConfig, EngineFile, EngineMetadata, WorkPatternsFile};
