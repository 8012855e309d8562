//! Run configuration, loaded from TOML.
//!
//! ```toml
//! [agent]
//! max_steps = 200
//! withdraw_when_stuck = false
//!
//! [layout]
//! damaged = [[3, 1], [3, 3]]
//! forklift = [1, 3]
//! package = [2, 3]
//! ```
//!
//! Every key is optional; a missing `[layout]` means the example layout.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, ConfigResult};
use crate::logic::solver::DEFAULT_DECISION_BUDGET;
use crate::world::Layout;

/// Agent behavior knobs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentConfig {
    /// Hard cap on actions per run.
    #[serde(default = "default_max_steps")]
    pub max_steps: u64,
    /// When no safe frontier cell remains, walk back and exit instead of
    /// stopping in place.
    #[serde(default = "default_true")]
    pub withdraw_when_stuck: bool,
    #[serde(default = "default_true")]
    pub use_shutdown_device: bool,
    /// Decision budget for the DPLL backend, per query.
    #[serde(default = "default_decision_budget")]
    pub solver_decision_budget: u64,
}

fn default_max_steps() -> u64 {
    500
}
fn default_true() -> bool {
    true
}
fn default_decision_budget() -> u64 {
    DEFAULT_DECISION_BUDGET
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            max_steps: default_max_steps(),
            withdraw_when_stuck: true,
            use_shutdown_device: true,
            solver_decision_budget: default_decision_budget(),
        }
    }
}

/// A config file: agent settings plus an optional layout.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunConfig {
    #[serde(default)]
    pub agent: AgentConfig,
    #[serde(default)]
    pub layout: Option<Layout>,
}

impl RunConfig {
    /// Parse from TOML text. `origin` names the source in errors.
    pub fn from_toml_str(content: &str, origin: &str) -> ConfigResult<Self> {
        toml::from_str(content).map_err(|e| ConfigError::Parse {
            path: origin.to_string(),
            message: e.to_string(),
        })
    }

    /// Load from a TOML file.
    pub fn load(path: &Path) -> ConfigResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Read {
            path: path.display().to_string(),
            source: e,
        })?;
        Self::from_toml_str(&content, &path.display().to_string())
    }

    /// The configured layout, or the example layout if none was given.
    pub fn layout_or_example(&self) -> Layout {
        self.layout.clone().unwrap_or_else(Layout::example)
    }
}
