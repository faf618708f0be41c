//! Statistics collected during a job run

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::params::JobParameters;
use crate::writer::ChunkWriteStats;

/// Pipeline stages in execution order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Stage {
    AcquireFiles,
    ImportCategory,
    ImportForm,
    ImportFormData,
}

impl Stage {
    pub const ALL: [Stage; 4] = [
        Stage::AcquireFiles,
        Stage::ImportCategory,
        Stage::ImportForm,
        Stage::ImportFormData,
    ];

    /// Step name used in logs and in the report
    pub fn name(self) -> &'static str {
        match self {
            Stage::AcquireFiles => "acquireFilesStep",
            Stage::ImportCategory => "importCategoryStep",
            Stage::ImportForm => "importFormStep",
            Stage::ImportFormData => "importFormDataStep",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Terminal state of one stage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StepStatus {
    Completed,
    /// Stage was deliberately not executed (acquisition disabled)
    Skipped,
    Failed,
    /// An earlier stage failed
    NotRun,
}

impl fmt::Display for StepStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            StepStatus::Completed => "COMPLETED",
            StepStatus::Skipped => "SKIPPED",
            StepStatus::Failed => "FAILED",
            StepStatus::NotRun => "NOT_RUN",
        })
    }
}

/// Terminal state of the whole run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobStatus {
    Completed,
    Failed,
}

impl JobStatus {
    pub fn is_success(self) -> bool {
        self == JobStatus::Completed
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            JobStatus::Completed => "COMPLETED",
            JobStatus::Failed => "FAILED",
        })
    }
}

/// Counters for one stage
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepStats {
    pub stage: Stage,
    pub status: StepStatus,
    /// Records parsed, including those in a chunk that later failed
    pub read: u64,
    pub inserted: u64,
    pub updated: u64,
    /// Payloads stored as raw bytes because transcoding failed
    pub fallbacks: u64,
    /// Chunks committed
    pub commits: u64,
    /// Files fetched (acquisition only)
    pub files: u64,
    pub duration_secs: f64,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub error: Option<String>,
}

impl StepStats {
    /// Stats for a stage that has not started
    pub fn pending(stage: Stage) -> Self {
        Self {
            stage,
            status: StepStatus::NotRun,
            read: 0,
            inserted: 0,
            updated: 0,
            fallbacks: 0,
            commits: 0,
            files: 0,
            duration_secs: 0.0,
            started_at: None,
            completed_at: None,
            error: None,
        }
    }

    pub fn start(&mut self) {
        self.started_at = Some(Utc::now());
    }

    /// Record the terminal state and compute the duration
    pub fn finish(&mut self, status: StepStatus) {
        self.status = status;
        self.completed_at = Some(Utc::now());
        if let (Some(start), Some(end)) = (self.started_at, self.completed_at) {
            self.duration_secs = (end - start).num_milliseconds() as f64 / 1000.0;
        }
    }

    pub fn fail(&mut self, error: impl fmt::Display) {
        self.error = Some(error.to_string());
        self.finish(StepStatus::Failed);
    }

    /// Add the counts of one committed chunk
    pub fn add_commit(&mut self, chunk: ChunkWriteStats) {
        self.inserted += chunk.inserted;
        self.updated += chunk.updated;
        self.commits += 1;
    }

    pub fn written(&self) -> u64 {
        self.inserted + self.updated
    }

    /// Records per second over the stage duration
    pub fn records_per_second(&self) -> f64 {
        if self.duration_secs > 0.0 {
            self.read as f64 / self.duration_secs
        } else {
            0.0
        }
    }
}

/// Summary of one run, handed to the completion reporter
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobReport {
    pub job_name: String,
    pub params: JobParameters,
    pub status: JobStatus,
    pub steps: Vec<StepStats>,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    /// Failure that ended the run
    pub error: Option<String>,
}

impl JobReport {
    /// Report for a run about to start: every stage pending
    pub fn new(job_name: impl Into<String>, params: JobParameters) -> Self {
        Self {
            job_name: job_name.into(),
            params,
            status: JobStatus::Completed,
            steps: Stage::ALL.iter().copied().map(StepStats::pending).collect(),
            started_at: Utc::now(),
            completed_at: None,
            error: None,
        }
    }

    pub fn step(&self, stage: Stage) -> Option<&StepStats> {
        self.steps.iter().find(|s| s.stage == stage)
    }

    pub fn step_mut(&mut self, stage: Stage) -> Option<&mut StepStats> {
        self.steps.iter_mut().find(|s| s.stage == stage)
    }

    /// Records read across every stage
    pub fn total_read(&self) -> u64 {
        self.steps.iter().map(|s| s.read).sum()
    }

    pub fn total_written(&self) -> u64 {
        self.steps.iter().map(StepStats::written).sum()
    }

    pub fn total_fallbacks(&self) -> u64 {
        self.steps.iter().map(|s| s.fallbacks).sum()
    }

    pub fn finish(&mut self, status: JobStatus, error: Option<String>) {
        self.status = status;
        self.error = error;
        self.completed_at = Some(Utc::now());
    }

    pub fn duration_secs(&self) -> f64 {
        self.completed_at
            .map(|end| (end - self.started_at).num_milliseconds() as f64 / 1000.0)
            .unwrap_or(0.0)
    }
}
