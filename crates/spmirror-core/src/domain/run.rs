//! Sync runs - one orchestrator invocation each, with counters

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Lifecycle state of a sync run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Running,
    Completed,
    Failed,
}

impl RunStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunStatus::Running => "running",
            RunStatus::Completed => "completed",
            RunStatus::Failed => "failed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "running" => Some(RunStatus::Running),
            "completed" => Some(RunStatus::Completed),
            "failed" => Some(RunStatus::Failed),
            _ => None,
        }
    }
}

/// Per-run reconciliation counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunCounters {
    /// Documents newly mirrored
    pub added: u64,
    /// Documents whose content changed
    pub modified: u64,
    /// Documents retracted or deleted
    pub removed: u64,
    /// Documents visited without any content change
    pub unchanged: u64,
    /// Items rejected by the filter or skipped after per-item errors
    pub skipped: u64,
    /// Bytes of blob content newly written to the store this run
    pub bytes_downloaded: u64,
}

impl RunCounters {
    /// Total number of change entries that were applied or skipped.
    pub fn total_seen(&self) -> u64 {
        self.added + self.modified + self.removed + self.unchanged + self.skipped
    }
}

/// One end-to-end invocation of the sync orchestrator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncRun {
    pub id: i64,
    pub status: RunStatus,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    /// Whether the run ignored stored delta cursors
    pub is_full: bool,
    pub counters: RunCounters,
    pub error_message: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_roundtrip() {
        for status in [RunStatus::Running, RunStatus::Completed, RunStatus::Failed] {
            assert_eq!(RunStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(RunStatus::parse("bogus"), None);
    }

    #[test]
    fn test_counters_total() {
        let counters = RunCounters {
            added: 3,
            modified: 1,
            removed: 2,
            unchanged: 5,
            skipped: 4,
            bytes_downloaded: 999,
        };
        assert_eq!(counters.total_seen(), 15);
    }
}
