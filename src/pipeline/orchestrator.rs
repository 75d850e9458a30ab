//! Pipeline orchestrator - runs named stages in order against a table store
//!
//! Failure policy is asymmetric:
//! - a stage whose script file cannot be found is skipped with a warning and
//!   the run continues;
//! - a stage whose statements fail is rolled back and aborts the run; later
//!   stages never execute.

use std::path::PathBuf;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use thiserror::Error;

use super::manifest::{RunRecord, RunStatus, StageOutcomeKind, StageRecord};
use super::stages::{Stage, StageSource};
use super::statements::{split_statements, StatementError};
use super::store::{StoreError, TableStore};
use crate::utils::{create_spinner, finish_with_success, finish_with_warning, print_warning};

/// Characters of a failing statement quoted in errors
pub const STATEMENT_PREFIX_LEN: usize = 400;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("stage '{stage}' failed at statement {index} [{statement_prefix}]: {source}")]
    StageFailed {
        stage: String,
        /// 1-based position of the statement within the stage
        index: usize,
        statement_prefix: String,
        #[source]
        source: StoreError,
    },

    #[error("stage '{stage}' script could not be split into statements: {source}")]
    ScriptInvalid {
        stage: String,
        #[source]
        source: StatementError,
    },

    #[error("stage '{stage}' script {} could not be read: {source}", .path.display())]
    ScriptUnreadable {
        stage: String,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("stage '{stage}' could not be committed: {source}")]
    CommitFailed {
        stage: String,
        #[source]
        source: StoreError,
    },

    #[error("pipeline finished but its run record could not be saved: {0}")]
    RecordFailed(#[source] StoreError),
}

impl PipelineError {
    /// Name of the stage the error is attributed to
    pub fn stage(&self) -> Option<&str> {
        match self {
            PipelineError::StageFailed { stage, .. }
            | PipelineError::ScriptInvalid { stage, .. }
            | PipelineError::ScriptUnreadable { stage, .. }
            | PipelineError::CommitFailed { stage, .. } => Some(stage),
            PipelineError::RecordFailed(_) => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum StageStatus {
    Completed {
        statements: usize,
        tables: Vec<String>,
    },
    Skipped {
        reason: String,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct StageOutcome {
    pub name: String,
    pub status: StageStatus,
    pub elapsed: Duration,
}

/// Result of a run in which every stage either completed or was skipped
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineRun {
    pub stages: Vec<StageOutcome>,
    /// Store generation after the run
    pub generation: u64,
    pub elapsed: Duration,
}

impl PipelineRun {
    pub fn completed(&self) -> usize {
        self.stages
            .iter()
            .filter(|s| matches!(s.status, StageStatus::Completed { .. }))
            .count()
    }

    pub fn skipped(&self) -> usize {
        self.stages.len() - self.completed()
    }
}

/// Run every stage in order. The first failing stage aborts the run and its
/// error is returned; the outcome is recorded in the store manifest either way.
pub fn run_pipeline(store: &mut TableStore, stages: &[Stage]) -> Result<PipelineRun, PipelineError> {
    let started_at = Utc::now();
    let clock = Instant::now();
    let mut outcomes: Vec<StageOutcome> = Vec::with_capacity(stages.len());

    for stage in stages {
        let stage_start = Instant::now();
        let spinner = create_spinner(&format!("Running stage '{}'...", stage.name));

        match run_stage(store, stage) {
            Ok(status) => {
                match &status {
                    StageStatus::Completed { tables, .. } => finish_with_success(
                        &spinner,
                        &format!("Stage '{}' complete ({} table(s))", stage.name, tables.len()),
                    ),
                    StageStatus::Skipped { reason } => {
                        finish_with_warning(&spinner, &format!("Stage '{}' skipped", stage.name));
                        print_warning(reason);
                    }
                }
                outcomes.push(StageOutcome {
                    name: stage.name.clone(),
                    status,
                    elapsed: stage_start.elapsed(),
                });
            }
            Err(err) => {
                finish_with_warning(&spinner, &format!("Stage '{}' failed", stage.name));
                let record = run_record(
                    started_at,
                    &outcomes,
                    RunStatus::Failed {
                        stage: stage.name.clone(),
                        message: err.to_string(),
                    },
                    Some(&stage.name),
                );
                if let Err(record_err) = store.record_run(record) {
                    print_warning(&format!("Could not record failed run: {}", record_err));
                }
                return Err(err);
            }
        }
    }

    let record = run_record(started_at, &outcomes, RunStatus::Succeeded, None);
    store.record_run(record).map_err(PipelineError::RecordFailed)?;

    Ok(PipelineRun {
        stages: outcomes,
        generation: store.generation(),
        elapsed: clock.elapsed(),
    })
}

/// Execute one stage inside a single transaction
fn run_stage(store: &mut TableStore, stage: &Stage) -> Result<StageStatus, PipelineError> {
    let script = match stage.load_script() {
        Ok(Some(script)) => script,
        Ok(None) => {
            let location = match &stage.source {
                StageSource::File(path) => path.display().to_string(),
                StageSource::Inline(_) => "inline".to_string(),
            };
            return Ok(StageStatus::Skipped {
                reason: format!("Script for stage '{}' not found: {}", stage.name, location),
            });
        }
        Err(source) => {
            let path = match &stage.source {
                StageSource::File(path) => path.clone(),
                StageSource::Inline(_) => PathBuf::new(),
            };
            return Err(PipelineError::ScriptUnreadable {
                stage: stage.name.clone(),
                path,
                source,
            });
        }
    };

    let statements = split_statements(&script).map_err(|source| PipelineError::ScriptInvalid {
        stage: stage.name.clone(),
        source,
    })?;

    let mut tx = store.begin();
    for (i, statement) in statements.iter().enumerate() {
        if let Err(source) = tx.execute(statement) {
            tx.rollback();
            return Err(PipelineError::StageFailed {
                stage: stage.name.clone(),
                index: i + 1,
                statement_prefix: statement_prefix(statement),
                source,
            });
        }
    }

    let tables = tx.commit().map_err(|source| PipelineError::CommitFailed {
        stage: stage.name.clone(),
        source,
    })?;

    Ok(StageStatus::Completed {
        statements: statements.len(),
        tables,
    })
}

fn statement_prefix(statement: &str) -> String {
    statement.chars().take(STATEMENT_PREFIX_LEN).collect()
}

fn run_record(
    started_at: DateTime<Utc>,
    outcomes: &[StageOutcome],
    status: RunStatus,
    failed_stage: Option<&str>,
) -> RunRecord {
    let mut stages: Vec<StageRecord> = outcomes
        .iter()
        .map(|outcome| match &outcome.status {
            StageStatus::Completed { tables, .. } => StageRecord {
                name: outcome.name.clone(),
                outcome: StageOutcomeKind::Completed,
                tables: tables.clone(),
            },
            StageStatus::Skipped { .. } => StageRecord {
                name: outcome.name.clone(),
                outcome: StageOutcomeKind::Skipped,
                tables: Vec::new(),
            },
        })
        .collect();
    if let Some(name) = failed_stage {
        stages.push(StageRecord {
            name: name.to_string(),
            outcome: StageOutcomeKind::Failed,
            tables: Vec::new(),
        });
    }

    RunRecord {
        started_at: started_at.to_rfc3339(),
        finished_at: Utc::now().to_rfc3339(),
        status,
        stages,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_statement_prefix_truncates_on_char_boundary() {
        let long = "é".repeat(STATEMENT_PREFIX_LEN + 50);
        let prefix = statement_prefix(&long);
        assert_eq!(prefix.chars().count(), STATEMENT_PREFIX_LEN);
    }

    #[test]
    fn test_run_record_marks_failed_stage() {
        let outcomes = vec![StageOutcome {
            name: "cleaning".to_string(),
            status: StageStatus::Completed {
                statements: 2,
                tables: vec!["listings_clean".to_string()],
            },
            elapsed: Duration::from_millis(5),
        }];
        let record = run_record(
            Utc::now(),
            &outcomes,
            RunStatus::Failed {
                stage: "features".to_string(),
                message: "boom".to_string(),
            },
            Some("features"),
        );
        assert!(!record.succeeded());
        assert_eq!(record.stages.len(), 2);
        assert_eq!(record.stages[1].outcome, StageOutcomeKind::Failed);
    }
}
