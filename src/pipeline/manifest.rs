//! Store manifest: generation counter, source tables and the last pipeline run

use serde::{Deserialize, Serialize};

/// Persistent metadata stored next to the table files
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Manifest {
    /// Bumped on every committed write; readers caching tables compare it
    pub generation: u64,
    /// Ingested tables that stages may read but never replace
    pub source_tables: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_run: Option<RunRecord>,
}

/// Outcome of one complete pipeline run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunRecord {
    /// RFC 3339 timestamps
    pub started_at: String,
    pub finished_at: String,
    pub status: RunStatus,
    pub stages: Vec<StageRecord>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum RunStatus {
    Succeeded,
    Failed { stage: String, message: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageRecord {
    pub name: String,
    pub outcome: StageOutcomeKind,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tables: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StageOutcomeKind {
    Completed,
    Skipped,
    Failed,
}

impl RunRecord {
    pub fn succeeded(&self) -> bool {
        self.status == RunStatus::Succeeded
    }
}
