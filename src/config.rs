//! Agent configuration. Loaded from a JSON file; every section has defaults.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    /// Audit log to tail
    pub audit_log_path: PathBuf,
    /// Data directory (local store)
    pub data_dir: PathBuf,
    /// Directory holding the trained model artifacts and schema.json
    pub model_dir: PathBuf,
    /// Optional syscall category table (JSON); defaults to the built-in x86_64 table
    pub syscall_table_path: Option<PathBuf>,
    /// Window aggregation parameters
    pub window: WindowConfig,
    /// Log follower parameters
    pub follow: FollowConfig,
    /// Ensemble voting parameters
    pub ensemble: EnsembleConfig,
    /// Logging
    pub log: LogConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WindowConfig {
    /// Tumbling window duration (milliseconds)
    pub window_millis: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FollowConfig {
    /// Sleep between empty read attempts (milliseconds)
    pub idle_millis: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnsembleConfig {
    /// Soft-vote weight of the gradient-boost model
    pub vote_weight_boost: f32,
    /// Soft-vote weight of the random-forest model
    pub vote_weight_forest: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogConfig {
    pub level: String,
    pub json: bool,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            audit_log_path: PathBuf::from("/var/log/audit/audit.log"),
            data_dir: PathBuf::from(".overwatch"),
            model_dir: PathBuf::from("models"),
            syscall_table_path: None,
            window: WindowConfig::default(),
            follow: FollowConfig::default(),
            ensemble: EnsembleConfig::default(),
            log: LogConfig::default(),
        }
    }
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self { window_millis: 1000 }
    }
}

impl Default for FollowConfig {
    fn default() -> Self {
        Self { idle_millis: 100 }
    }
}

impl Default for EnsembleConfig {
    fn default() -> Self {
        Self {
            vote_weight_boost: 1.5,
            vote_weight_forest: 1.0,
        }
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: true,
        }
    }
}

impl AgentConfig {
    /// Load from JSON file if present; otherwise return default
    pub fn load(path: &std::path::Path) -> Self {
        if path.exists() {
            if let Ok(data) = std::fs::read_to_string(path) {
                if let Ok(c) = serde_json::from_str::<AgentConfig>(&data) {
                    return c;
                }
            }
        }
        Self::default()
    }
}
