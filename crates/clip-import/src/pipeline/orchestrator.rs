//! Sequential job runner
//!
//! Runs acquisition and the three import steps in order. The first failing
//! stage ends the run; chunks it already committed stay committed and the
//! remaining stages are reported as not run. Every run, successful or not,
//! is handed to the completion reporter.

use sqlx::AnyPool;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{error, info};

use super::params::JobParameters;
use super::stats::{JobReport, JobStatus, Stage, StepStats, StepStatus};
use super::step::ChunkStep;
use crate::acquire::{self, FileFetcher};
use crate::config::ImportConfig;
use crate::error::Result;
use crate::models::{CategoryRecord, FormDataRecord, FormRecord};
use crate::notify::CompletionReporter;
use crate::transcode::{FormDataProcessor, PassThrough};

/// The import job: acquisition followed by the category, form and form data
/// steps
pub struct ImportJob {
    config: Arc<ImportConfig>,
    pool: AnyPool,
    fetcher: Option<Arc<dyn FileFetcher>>,
    reporter: CompletionReporter,
}

impl ImportJob {
    /// Create a job; acquisition uses the configured source location if any
    pub fn new(
        config: Arc<ImportConfig>,
        pool: AnyPool,
        reporter: CompletionReporter,
    ) -> Result<Self> {
        let fetcher = match &config.source_url {
            Some(source) => {
                let timeout = Duration::from_secs(config.fetch_timeout_secs);
                Some(Arc::from(acquire::fetcher_for(source, timeout)?))
            },
            None => None,
        };

        Ok(Self {
            config,
            pool,
            fetcher,
            reporter,
        })
    }

    /// Replace the fetcher; `None` disables acquisition
    pub fn with_fetcher(mut self, fetcher: Option<Arc<dyn FileFetcher>>) -> Self {
        self.fetcher = fetcher;
        self
    }

    pub fn config(&self) -> &ImportConfig {
        &self.config
    }

    /// Execute the job and hand the report to the reporter. The returned
    /// handle resolves once the notification has been delivered or has failed.
    pub async fn run(&self, params: &JobParameters) -> (JobReport, JoinHandle<()>) {
        let report = self.execute(params).await;
        let delivery = self.reporter.report(report.clone());
        (report, delivery)
    }

    /// Execute every stage without notifying
    pub async fn execute(&self, params: &JobParameters) -> JobReport {
        let mut report = JobReport::new(self.config.job_name.clone(), params.clone());
        info!(
            job = %self.config.job_name,
            run_token = params.run_token,
            last_run_time = %params.last_run_time,
            "Job started"
        );

        for stage in Stage::ALL {
            let Some(stats) = report.step_mut(stage) else {
                continue;
            };
            stats.start();

            let outcome = self.run_stage(stage, stats).await;
            match outcome {
                Ok(status) => stats.finish(status),
                Err(e) => {
                    error!(
                        job = %self.config.job_name,
                        step = %stage,
                        kind = e.kind(),
                        error = %e,
                        "Step failed"
                    );
                    stats.fail(&e);
                    report.finish(JobStatus::Failed, Some(format!("{}: {}", stage, e)));
                    info!(
                        job = %report.job_name,
                        status = %report.status,
                        total_read = report.total_read(),
                        "Job finished"
                    );
                    return report;
                },
            }
        }

        report.finish(JobStatus::Completed, None);
        info!(
            job = %report.job_name,
            status = %report.status,
            total_read = report.total_read(),
            written = report.total_written(),
            fallbacks = report.total_fallbacks(),
            duration_secs = report.duration_secs(),
            "Job finished"
        );
        report
    }

    async fn run_stage(&self, stage: Stage, stats: &mut StepStats) -> Result<StepStatus> {
        let config = &self.config;
        match stage {
            Stage::AcquireFiles => {
                let Some(fetcher) = &self.fetcher else {
                    info!(
                        step = %stage,
                        "No source configured, using files in {}",
                        config.work_dir.display()
                    );
                    return Ok(StepStatus::Skipped);
                };
                let names = config.file_names();
                stats.files =
                    acquire::acquire_files(fetcher.as_ref(), &config.work_dir, &names).await?;
            },
            Stage::ImportCategory => {
                let path = config.file_path(&config.category);
                ChunkStep::new(stage, path, config.category.chunk_size, PassThrough)
                    .run::<CategoryRecord>(&self.pool, stats)
                    .await?;
            },
            Stage::ImportForm => {
                let path = config.file_path(&config.form);
                ChunkStep::new(stage, path, config.form.chunk_size, PassThrough)
                    .run::<FormRecord>(&self.pool, stats)
                    .await?;
            },
            Stage::ImportFormData => {
                let path = config.file_path(&config.form_data);
                ChunkStep::new(stage, path, config.form_data.chunk_size, FormDataProcessor)
                    .run::<FormDataRecord>(&self.pool, stats)
                    .await?;
            },
        }
        Ok(StepStatus::Completed)
    }
}
