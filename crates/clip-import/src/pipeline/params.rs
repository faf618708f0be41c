//! Run identity handed to each job execution

use chrono::{DateTime, Duration, Local, Utc};
use serde::{Deserialize, Serialize};

/// Format of [`JobParameters::last_run_time`]
pub const LAST_RUN_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Parameters that make each run distinct. They identify the run in logs and
/// in the report; the import steps do not read them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobParameters {
    /// Local time one day before the trigger, `%Y-%m-%d %H:%M:%S`
    pub last_run_time: String,
    /// Trigger time in epoch milliseconds
    pub run_token: i64,
}

impl JobParameters {
    /// Parameters for a run triggered now
    pub fn now() -> Self {
        Self::at(Local::now())
    }

    /// Parameters for a run triggered at `fired`
    pub fn at(fired: DateTime<Local>) -> Self {
        let last_run = fired - Duration::days(1);
        Self {
            last_run_time: last_run.format(LAST_RUN_FORMAT).to_string(),
            run_token: fired.with_timezone(&Utc).timestamp_millis(),
        }
    }
}
