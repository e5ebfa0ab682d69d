//! Syscall category table. Architecture-specific, shipped as versioned
//! configuration: porting to another instruction set swaps the table, not
//! the extractor.

use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyscallCategory {
    Open,
    Unlink,
    Clone,
    Exec,
}

/// Maps syscall numbers to the semantic categories the feature formulas
/// count. Unmapped numbers still count toward totals, just not toward any
/// category.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyscallTable {
    pub version: String,
    pub arch: String,
    pub open: Vec<u64>,
    pub unlink: Vec<u64>,
    pub clone: Vec<u64>,
    pub exec: Vec<u64>,
}

impl SyscallTable {
    /// Built-in x86_64 table: open/openat/creat, unlink/unlinkat/rmdir,
    /// clone/fork/vfork, execve.
    pub fn x86_64() -> Self {
        Self {
            version: "1".to_string(),
            arch: "x86_64".to_string(),
            open: vec![2, 257, 85],
            unlink: vec![87, 263, 84],
            clone: vec![56, 57, 58],
            exec: vec![59],
        }
    }

    /// Load a table from a JSON file. A configured-but-unreadable table is an
    /// error the caller treats as fatal at startup.
    pub fn load(path: &Path) -> Result<Self, Box<dyn std::error::Error + Send + Sync>> {
        let data = std::fs::read_to_string(path)
            .map_err(|e| format!("syscall table {}: {}", path.display(), e))?;
        Ok(serde_json::from_str(&data)?)
    }

    pub fn category(&self, number: u64) -> Option<SyscallCategory> {
        if self.open.contains(&number) {
            Some(SyscallCategory::Open)
        } else if self.unlink.contains(&number) {
            Some(SyscallCategory::Unlink)
        } else if self.clone.contains(&number) {
            Some(SyscallCategory::Clone)
        } else if self.exec.contains(&number) {
            Some(SyscallCategory::Exec)
        } else {
            None
        }
    }
}

impl Default for SyscallTable {
    fn default() -> Self {
        Self::x86_64()
    }
}
