//! Run completion notification
//!
//! The reporter formats a [`JobReport`] and delivers it on its own task. A
//! delivery failure is logged and never reaches the run outcome.

use async_trait::async_trait;
use serde_json::json;
use std::fmt::Write as _;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{error, info};

use crate::config::NotifyConfig;
use crate::error::{ImportError, Result};
use crate::pipeline::{JobReport, Stage, StepStatus};

/// Delivers one text message
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, message: &str) -> Result<()>;
}

/// Posts `{"text": ...}` to a Slack-compatible incoming webhook
pub struct SlackNotifier {
    client: reqwest::Client,
    webhook_url: String,
}

impl SlackNotifier {
    pub fn new(webhook_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ImportError::Notification(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            webhook_url: webhook_url.into(),
        })
    }
}

#[async_trait]
impl Notifier for SlackNotifier {
    async fn send(&self, message: &str) -> Result<()> {
        let response = self
            .client
            .post(&self.webhook_url)
            .json(&json!({ "text": message }))
            .send()
            .await
            .map_err(|e| ImportError::Notification(format!("Webhook request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ImportError::Notification(format!("Webhook returned HTTP {}", status)));
        }
        Ok(())
    }
}

/// Writes the message to the log; used when no webhook is configured
#[derive(Debug, Default)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn send(&self, message: &str) -> Result<()> {
        info!("{}", message);
        Ok(())
    }
}

/// Build the notifier the configuration asks for
pub fn notifier_from_config(config: &NotifyConfig) -> Result<Arc<dyn Notifier>> {
    match &config.webhook_url {
        Some(url) => Ok(Arc::new(SlackNotifier::new(
            url.clone(),
            Duration::from_secs(config.timeout_secs),
        )?)),
        None => Ok(Arc::new(LogNotifier)),
    }
}

/// Text summary of a run
pub fn format_report(report: &JobReport) -> String {
    let mut message = String::new();
    let _ = writeln!(message, "*Job completion*");
    let _ = writeln!(message, "- Job Name: {}", report.job_name);
    let _ = writeln!(message, "- Run: {} (last run {})", report.params.run_token, report.params.last_run_time);
    let _ = writeln!(message, "- Status: {}", report.status);
    let _ = write!(message, "- Total Read: {}", report.total_read());
    if !report.status.is_success() {
        let _ = write!(message, " (includes records of rolled-back chunks)");
    }

    for step in &report.steps {
        let _ = write!(message, "\n  - {}: {}", step.stage, step.status);
        match step.status {
            StepStatus::NotRun | StepStatus::Skipped => {},
            _ if step.stage == Stage::AcquireFiles => {
                let _ = write!(message, " files={} ({:.2}s)", step.files, step.duration_secs);
            },
            _ => {
                let _ = write!(
                    message,
                    " read={} inserted={} updated={} fallbacks={} commits={} ({:.2}s, {:.1} rec/s)",
                    step.read,
                    step.inserted,
                    step.updated,
                    step.fallbacks,
                    step.commits,
                    step.duration_secs,
                    step.records_per_second()
                );
            },
        }
    }

    if let Some(err) = &report.error {
        let _ = write!(message, "\n- Error: {}", err);
    }

    message
}

/// Hands finished runs to a [`Notifier`] without blocking the caller
#[derive(Clone)]
pub struct CompletionReporter {
    notifier: Arc<dyn Notifier>,
}

impl CompletionReporter {
    pub fn new(notifier: Arc<dyn Notifier>) -> Self {
        Self { notifier }
    }

    /// Spawn delivery of `report`. The handle can be awaited to wait for
    /// delivery; dropping it leaves the task running.
    pub fn report(&self, report: JobReport) -> JoinHandle<()> {
        let notifier = Arc::clone(&self.notifier);
        tokio::spawn(async move {
            let message = format_report(&report);
            match notifier.send(&message).await {
                Ok(()) => info!(job = %report.job_name, status = %report.status, "Completion notification sent"),
                Err(e) => error!(job = %report.job_name, error = %e, "Failed to send completion notification"),
            }
        })
    }
}
