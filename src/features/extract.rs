//! Audit line parsing and per-window counters.

use super::{FeatureVector, SyscallCategory, SyscallTable, FEATURE_NAMES};
use regex::Regex;
use std::collections::HashSet;

/// One parsed audit log line. Ephemeral: contributes to window counters and
/// is discarded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuditRecord {
    Syscall { number: u64, success: bool },
    PathAccess { path: String },
    Other,
}

/// Mutable counters for the currently open window. Owned exclusively by the
/// aggregation loop; consumed on flush, never shared across windows.
#[derive(Debug, Default)]
pub struct FeatureWindow {
    pub syscall_count: u64,
    pub failed_syscalls: u64,
    pub open_count: u64,
    pub unlink_count: u64,
    pub exec_count: u64,
    pub clone_count: u64,
    pub unique_files: HashSet<String>,
}

impl FeatureWindow {
    pub fn observe(&mut self, record: AuditRecord, table: &SyscallTable) {
        match record {
            AuditRecord::Syscall { number, success } => {
                self.syscall_count += 1;
                if !success {
                    self.failed_syscalls += 1;
                }
                match table.category(number) {
                    Some(SyscallCategory::Open) => self.open_count += 1,
                    Some(SyscallCategory::Unlink) => self.unlink_count += 1,
                    Some(SyscallCategory::Clone) => self.clone_count += 1,
                    Some(SyscallCategory::Exec) => self.exec_count += 1,
                    None => {}
                }
            }
            AuditRecord::PathAccess { path } => {
                self.unique_files.insert(path);
            }
            AuditRecord::Other => {}
        }
    }

    /// Derive the fixed-schema vector. Denominators are floored at 1, so
    /// ratios bias toward 0 on a quiet window. `file_churn_rate` is an
    /// absolute count; the name is part of the trained schema and stays.
    pub fn into_vector(self, ts: i64) -> FeatureVector {
        let values = vec![
            self.syscall_count as f32,
            self.open_count as f32 / self.unlink_count.max(1) as f32,
            self.unique_files.len() as f32,
            self.failed_syscalls as f32 / self.syscall_count.max(1) as f32,
            (self.clone_count + self.exec_count) as f32,
            self.unlink_count as f32,
        ];
        FeatureVector {
            ts,
            names: FEATURE_NAMES.iter().map(|n| n.to_string()).collect(),
            values,
        }
    }
}

/// Parses raw audit lines and folds a window of them into a feature vector.
/// Pure given its syscall table.
pub struct FeatureExtractor {
    syscall_re: Regex,
    path_re: Regex,
    table: SyscallTable,
}

impl FeatureExtractor {
    pub fn new(table: SyscallTable) -> Self {
        Self {
            syscall_re: Regex::new(r"type=SYSCALL.*syscall=(\d+).*success=(\w+)")
                .expect("syscall pattern"),
            path_re: Regex::new(r#"type=PATH.*name="([^"]*)""#).expect("path pattern"),
            table,
        }
    }

    /// Parse one line. Unrecognized shapes map to [`AuditRecord::Other`] and
    /// are never errors.
    pub fn parse_line(&self, line: &str) -> AuditRecord {
        if let Some(caps) = self.syscall_re.captures(line) {
            if let Ok(number) = caps[1].parse::<u64>() {
                // success=<yes|no>; only a literal "no" counts as a failure
                return AuditRecord::Syscall {
                    number,
                    success: &caps[2] != "no",
                };
            }
        }
        if let Some(caps) = self.path_re.captures(line) {
            return AuditRecord::PathAccess {
                path: caps[1].to_string(),
            };
        }
        AuditRecord::Other
    }

    /// Fold one closed window of raw lines into its feature vector.
    pub fn process_window(&self, lines: &[String], ts: i64) -> FeatureVector {
        let mut window = FeatureWindow::default();
        for line in lines {
            window.observe(self.parse_line(line), &self.table);
        }
        window.into_vector(ts)
    }

    pub fn table(&self) -> &SyscallTable {
        &self.table
    }
}
