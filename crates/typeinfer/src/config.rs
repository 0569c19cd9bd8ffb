use std::path::Path;

use serde::Deserialize;

use crate::error::InferError;

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct InferConfig {
    #[serde(default)]
    pub solver: SolverConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SolverConfig {
    #[serde(default = "default_path_compression")]
    pub path_compression: bool,
    /// Diagnostics past this many are counted but not kept; the first one is always kept.
    /// Solving always runs to the end.
    #[serde(default)]
    pub max_errors: Option<usize>,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            path_compression: default_path_compression(),
            max_errors: None,
        }
    }
}

fn default_path_compression() -> bool {
    true
}

impl InferConfig {
    pub fn from_toml(text: &str) -> Result<InferConfig, InferError> {
        toml::from_str(text).map_err(|err| InferError::Config(err.to_string()))
    }
}

pub fn read_config(path: &Path) -> Result<InferConfig, InferError> {
    let text = std::fs::read_to_string(path)?;
    toml::from_str(&text)
        .map_err(|err| InferError::Config(format!("failed to parse {}: {err}", path.display())))
}
