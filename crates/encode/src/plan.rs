use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::info;

use splitbrain_core::Result;

/// One component's block of the plan container: its state-cell data and the
/// parallel descriptor arrays, plus operator and probe records in final
/// local order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ComponentBlock {
    /// Concatenated flattened cell contents, in `signal_keys` order.
    pub signals: Vec<f64>,
    pub signal_keys: Vec<u64>,
    /// Shapes padded to 2-D: scalars are `[1, 1]`, vectors `[n, 1]`.
    pub signal_shapes: Vec<[u16; 2]>,
    pub signal_labels: Vec<String>,
    pub operators: Vec<String>,
    pub probes: Vec<String>,
}

/// The whole-system plan consumed by the distributed runtime: global
/// metadata once at the top level, one block per component.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Plan {
    pub dt: f64,
    pub n_components: usize,
    pub components: Vec<ComponentBlock>,
    /// Every probe record, across all components.
    pub probe_info: Vec<String>,
}

impl Plan {
    pub fn to_msgpack(&self) -> Result<Vec<u8>> {
        Ok(rmp_serde::to_vec(self)?)
    }

    pub fn from_msgpack(bytes: &[u8]) -> Result<Self> {
        Ok(rmp_serde::from_slice(bytes)?)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Write the plan in one shot, MessagePack by default or pretty JSON.
    /// The plan is fully assembled in memory first, so a failure in any
    /// earlier stage leaves no partial file behind.
    pub fn write(&self, path: &Path, json: bool) -> Result<()> {
        let bytes = if json {
            self.to_json()?.into_bytes()
        } else {
            self.to_msgpack()?
        };
        std::fs::write(path, &bytes)?;
        info!(path = %path.display(), bytes = bytes.len(), "wrote plan");
        Ok(())
    }
}
