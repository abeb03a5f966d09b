use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Compiler configuration, typically parsed from TOML.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompilerConfig {
    /// Number of components to divide the graph into.
    #[serde(default = "default_n_components")]
    pub n_components: usize,

    /// Partition strategy name. None resolves to the first available
    /// strategy in the default priority order.
    #[serde(default)]
    pub strategy: Option<String>,

    /// Simulation step size, recorded once in the plan metadata.
    #[serde(default = "default_dt")]
    pub dt: f64,

    /// Filtered edges at or above this communication weight are forced onto
    /// one component during coarsening. None means no limit.
    #[serde(default)]
    pub straddle_limit: Option<f64>,

    /// Whether coarse-graph edges are weighted by carried footprint size.
    /// When false, every filtered edge weighs 1.
    #[serde(default = "default_use_weights")]
    pub use_weights: bool,

    /// Fold zero-compute-weight coarse nodes into their most-communicating
    /// neighbor, so no component does nothing but relay messages.
    #[serde(default = "default_merge_passthrough")]
    pub merge_passthrough: bool,

    /// Seed for the random partition strategy.
    #[serde(default)]
    pub seed: u64,
}

fn default_n_components() -> usize {
    1
}
fn default_dt() -> f64 {
    0.001
}
fn default_use_weights() -> bool {
    true
}
fn default_merge_passthrough() -> bool {
    true
}

impl Default for CompilerConfig {
    fn default() -> Self {
        Self {
            n_components: default_n_components(),
            strategy: None,
            dt: default_dt(),
            straddle_limit: None,
            use_weights: default_use_weights(),
            merge_passthrough: default_merge_passthrough(),
            seed: 0,
        }
    }
}

impl CompilerConfig {
    /// Load configuration from a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&text)?)
    }

    /// The effective straddle limit (no limit means infinity).
    pub fn straddle_max(&self) -> f64 {
        self.straddle_limit.unwrap_or(f64::INFINITY)
    }
}
