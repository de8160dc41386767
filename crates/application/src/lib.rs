//! Knob application descriptors: what to optimize (resources, scenarios,
//! objectives) and how experiment names map back onto them.

#![forbid(unsafe_code)]

use std::path::Path;

use anyhow::{Context, Result};
use tracing::debug;

pub mod defaults;
pub mod filter;
pub mod name;
pub mod types;

pub use defaults::{default_cost_weights, DEFAULT_OBJECTIVES};
pub use filter::{filter_objectives, filter_scenarios};
pub use name::{clean_name, experiment_name, filter_by_experiment_name, NameError};
pub use types::*;

impl Application {
    /// Decodes a YAML application and applies defaults.
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let mut app: Application = serde_yaml::from_str(yaml).context("decode application")?;
        app.apply_defaults();
        Ok(app)
    }

    /// Reads an application file; its directory becomes the working directory for
    /// resource references.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
        let mut app = Self::from_yaml_str(&text).with_context(|| format!("load {}", path.display()))?;
        app.source = Some(path.to_path_buf());
        debug!(application = %app.name(), scenarios = app.scenarios.len(), objectives = app.objectives.len(), "application loaded");
        Ok(app)
    }
}
