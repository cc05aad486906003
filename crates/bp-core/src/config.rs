//! Engine configuration (JSON)

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Tunables shared by the CLI and FFI front ends
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Rule file used when none is given explicitly
    pub rules_path: PathBuf,
    /// Maximum suggestions returned per name
    pub suggestion_limit: usize,
    /// Suggestions at or below this confidence are dropped
    pub min_confidence: f64,
    /// Candidates per progress report during auto-mapping
    pub chunk_size: usize,
    /// Suggestion worker threads; 0 means one per available core
    pub workers: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            rules_path: PathBuf::from("auto_rules.txt"),
            suggestion_limit: 10,
            min_confidence: 0.0,
            chunk_size: 500,
            workers: 0,
        }
    }
}

impl EngineConfig {
    /// Load a config file from JSON; missing fields take their defaults
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref()).map_err(|e| Error::FileRead {
            path: path.as_ref().to_path_buf(),
            source: e,
        })?;
        serde_json::from_str(&content).map_err(Error::Json)
    }

    /// Save the config as pretty JSON
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }
}
