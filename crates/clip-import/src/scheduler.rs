//! Cron trigger for the import job
//!
//! Fires the job on a seconds-resolution cron expression in local time. The
//! next fire time is computed only after the previous run returns, so runs
//! never overlap.

use chrono::{DateTime, Local};
use cron::Schedule;
use std::future::Future;
use std::str::FromStr;
use std::sync::Arc;
use tracing::{info, warn};

use crate::error::{ImportError, Result};
use crate::pipeline::{ImportJob, JobParameters};

/// Parse a cron expression
pub fn parse_schedule(expression: &str) -> Result<Schedule> {
    Schedule::from_str(expression)
        .map_err(|e| ImportError::Config(format!("Invalid schedule '{}': {}", expression, e)))
}

/// First fire time strictly after `after`
pub fn next_fire(schedule: &Schedule, after: &DateTime<Local>) -> Option<DateTime<Local>> {
    schedule.after(after).next()
}

/// Runs an [`ImportJob`] on a cron schedule
pub struct JobScheduler {
    job: Arc<ImportJob>,
    expression: String,
    schedule: Schedule,
}

impl JobScheduler {
    pub fn new(job: Arc<ImportJob>, expression: &str) -> Result<Self> {
        Ok(Self {
            job,
            expression: expression.to_string(),
            schedule: parse_schedule(expression)?,
        })
    }

    /// Fire the job until `shutdown` resolves. Shutdown is honoured while
    /// waiting for the next fire time; a run in progress is finished first.
    pub async fn run_until<F>(&self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);
        info!(job = %self.job.config().job_name, schedule = %self.expression, "Scheduler started");

        loop {
            let now = Local::now();
            let Some(fire_at) = next_fire(&self.schedule, &now) else {
                warn!("Schedule has no upcoming fire time, stopping");
                break;
            };
            let wait = (fire_at - now).to_std().unwrap_or_default();
            info!("Next run at {}", fire_at.format("%Y-%m-%d %H:%M:%S"));

            tokio::select! {
                _ = tokio::time::sleep(wait) => {},
                _ = &mut shutdown => {
                    info!("Shutdown requested, stopping scheduler");
                    break;
                },
            }

            let params = JobParameters::now();
            let (report, _delivery) = self.job.run(&params).await;
            info!(
                job = %report.job_name,
                status = %report.status,
                run_token = params.run_token,
                "Scheduled run finished"
            );
        }

        info!("Scheduler stopped");
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::config::DEFAULT_SCHEDULE;
    use chrono::TimeZone;

    #[test]
    fn test_default_schedule_fires_daily_at_one() {
        let schedule = parse_schedule(DEFAULT_SCHEDULE).unwrap();

        let before = Local.with_ymd_and_hms(2024, 3, 1, 0, 30, 0).unwrap();
        let next = next_fire(&schedule, &before).unwrap();
        assert_eq!(next, Local.with_ymd_and_hms(2024, 3, 1, 1, 0, 0).unwrap());

        let after = Local.with_ymd_and_hms(2024, 3, 1, 1, 0, 0).unwrap();
        let next = next_fire(&schedule, &after).unwrap();
        assert_eq!(next, Local.with_ymd_and_hms(2024, 3, 2, 1, 0, 0).unwrap());
    }

    #[test]
    fn test_invalid_expression_is_a_config_error() {
        assert!(matches!(parse_schedule("daily"), Err(ImportError::Config(_))));
    }
}
