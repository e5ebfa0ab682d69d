//! Per-window audit feature extraction: raw log lines → typed records →
//! window counters → fixed-schema feature vector.

mod extract;
mod syscalls;

pub use extract::{AuditRecord, FeatureExtractor, FeatureWindow};
pub use syscalls::{SyscallCategory, SyscallTable};

use serde::{Deserialize, Serialize};

/// Canonical feature schema. Name set and order are a contract shared with
/// the trained model artifacts; inference must reproduce it exactly.
pub const FEATURE_NAMES: [&str; 6] = [
    "syscall_rate",
    "open_unlink_ratio",
    "unique_files_accessed",
    "failed_syscall_ratio",
    "process_spawn_rate",
    "file_churn_rate",
];

/// Ordered, named feature values derived once from a closed window.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeatureVector {
    pub ts: i64,
    pub names: Vec<String>,
    pub values: Vec<f32>,
}

impl FeatureVector {
    pub fn get(&self, name: &str) -> Option<f32> {
        self.names
            .iter()
            .position(|n| n == name)
            .and_then(|i| self.values.get(i).copied())
    }
}
