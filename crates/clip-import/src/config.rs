//! Import job configuration
//!
//! Loaded from environment variables (a `.env` file is honoured by the binary)
//! and checked with [`ImportConfig::validate`] before anything runs.

use clip_common::error::{env_opt, env_or};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{ImportError, Result};

pub const DEFAULT_SCHEDULE: &str = "0 0 1 * * *";

/// Destination database settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// `postgres://...` or `sqlite://...`
    pub url: String,
    pub max_connections: u32,
    /// Connect timeout in seconds
    pub connect_timeout_secs: u64,
    /// Apply bundled migrations at startup
    pub run_migrations: bool,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "sqlite://clip-import.db?mode=rwc".to_string(),
            max_connections: 5,
            connect_timeout_secs: 10,
            run_migrations: false,
        }
    }
}

impl DatabaseConfig {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }
}

/// One import step: which file it reads and how many records per commit
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StepConfig {
    pub file_name: String,
    pub chunk_size: usize,
}

impl StepConfig {
    pub fn new(file_name: impl Into<String>, chunk_size: usize) -> Self {
        Self {
            file_name: file_name.into(),
            chunk_size,
        }
    }
}

/// Completion notification settings
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct NotifyConfig {
    /// Slack-compatible incoming webhook; `None` logs the summary instead
    pub webhook_url: Option<String>,
    pub timeout_secs: u64,
}

/// Main import configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportConfig {
    pub job_name: String,
    /// Where acquired files land and where the steps read them
    pub work_dir: PathBuf,
    /// Base location of the source files; `None` disables acquisition
    pub source_url: Option<String>,
    /// Per-file download timeout in seconds (HTTP)
    pub fetch_timeout_secs: u64,
    pub category: StepConfig,
    pub form: StepConfig,
    pub form_data: StepConfig,
    /// Six-field cron expression (seconds first), local time
    pub schedule: String,
    pub notify: NotifyConfig,
    pub database: DatabaseConfig,
}

impl Default for ImportConfig {
    fn default() -> Self {
        Self {
            job_name: "clipImportJob".to_string(),
            work_dir: PathBuf::from("temp"),
            source_url: None,
            fetch_timeout_secs: 300,
            category: StepConfig::new("file01.csv", 500),
            form: StepConfig::new("file02.csv", 500),
            form_data: StepConfig::new("file03.csv", 20),
            schedule: DEFAULT_SCHEDULE.to_string(),
            notify: NotifyConfig {
                webhook_url: None,
                timeout_secs: 10,
            },
            database: DatabaseConfig::default(),
        }
    }
}

impl ImportConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();

        let config = Self {
            job_name: env_or("IMPORT_JOB_NAME", defaults.job_name)?,
            work_dir: env_or("IMPORT_WORK_DIR", defaults.work_dir)?,
            source_url: env_opt("IMPORT_SOURCE_URL"),
            fetch_timeout_secs: env_or("IMPORT_FETCH_TIMEOUT_SECS", defaults.fetch_timeout_secs)?,
            category: StepConfig {
                file_name: env_or("IMPORT_CATEGORY_FILE", defaults.category.file_name)?,
                chunk_size: env_or("IMPORT_CATEGORY_CHUNK_SIZE", defaults.category.chunk_size)?,
            },
            form: StepConfig {
                file_name: env_or("IMPORT_FORM_FILE", defaults.form.file_name)?,
                chunk_size: env_or("IMPORT_FORM_CHUNK_SIZE", defaults.form.chunk_size)?,
            },
            form_data: StepConfig {
                file_name: env_or("IMPORT_FORM_DATA_FILE", defaults.form_data.file_name)?,
                chunk_size: env_or("IMPORT_FORM_DATA_CHUNK_SIZE", defaults.form_data.chunk_size)?,
            },
            schedule: env_or("IMPORT_SCHEDULE", defaults.schedule)?,
            notify: NotifyConfig {
                webhook_url: env_opt("NOTIFY_WEBHOOK_URL"),
                timeout_secs: env_or("NOTIFY_TIMEOUT_SECS", defaults.notify.timeout_secs)?,
            },
            database: DatabaseConfig {
                url: env_or("DATABASE_URL", defaults.database.url)?,
                max_connections: env_or(
                    "DATABASE_MAX_CONNECTIONS",
                    defaults.database.max_connections,
                )?,
                connect_timeout_secs: env_or(
                    "DATABASE_CONNECT_TIMEOUT",
                    defaults.database.connect_timeout_secs,
                )?,
                run_migrations: env_or(
                    "DATABASE_RUN_MIGRATIONS",
                    defaults.database.run_migrations,
                )?,
            },
        };

        config.validate()?;
        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.job_name.trim().is_empty() {
            return Err(ImportError::Config("Job name cannot be empty".to_string()));
        }

        if self.database.url.trim().is_empty() {
            return Err(ImportError::Config("Database URL cannot be empty".to_string()));
        }

        if self.database.max_connections == 0 {
            return Err(ImportError::Config(
                "Database max_connections must be greater than 0".to_string(),
            ));
        }

        if self.fetch_timeout_secs == 0 {
            return Err(ImportError::Config(
                "Fetch timeout must be greater than 0".to_string(),
            ));
        }

        for (step, settings) in self.steps() {
            if settings.chunk_size == 0 {
                return Err(ImportError::Config(format!(
                    "Chunk size for {} must be greater than 0",
                    step
                )));
            }
            validate_file_name(step, &settings.file_name)?;
        }

        crate::scheduler::parse_schedule(&self.schedule)?;

        Ok(())
    }

    /// Step settings in execution order
    pub fn steps(&self) -> [(&'static str, &StepConfig); 3] {
        [
            ("category", &self.category),
            ("form", &self.form),
            ("form_data", &self.form_data),
        ]
    }

    /// Source file names in execution order
    pub fn file_names(&self) -> Vec<String> {
        self.steps()
            .iter()
            .map(|(_, s)| s.file_name.clone())
            .collect()
    }

    /// Local path a step reads
    pub fn file_path(&self, step: &StepConfig) -> PathBuf {
        self.work_dir.join(&step.file_name)
    }
}

fn validate_file_name(step: &str, name: &str) -> Result<()> {
    if name.trim().is_empty() {
        return Err(ImportError::Config(format!("File name for {} cannot be empty", step)));
    }

    let mut components = Path::new(name).components();
    let plain = matches!(
        (components.next(), components.next()),
        (Some(std::path::Component::Normal(_)), None)
    );
    if !plain || name.contains('/') || name.contains('\\') {
        return Err(ImportError::Config(format!(
            "File name for {} must be a plain name without directories: '{}'",
            step, name
        )));
    }

    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = ImportConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.form_data.chunk_size, 20);
        assert_eq!(config.category.chunk_size, 500);
        assert_eq!(config.file_names(), vec!["file01.csv", "file02.csv", "file03.csv"]);
    }

    #[test]
    fn test_zero_chunk_size_is_rejected() {
        let mut config = ImportConfig::default();
        config.form_data.chunk_size = 0;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("form_data"));
    }

    #[test]
    fn test_bad_schedule_is_rejected() {
        let mut config = ImportConfig::default();
        config.schedule = "every night".to_string();
        assert!(matches!(config.validate(), Err(ImportError::Config(_))));
    }

    #[test]
    fn test_file_names_must_be_plain() {
        for bad in ["", "../file01.csv", "dir/file01.csv", "..", "/abs.csv", "a\\b.csv"] {
            let mut config = ImportConfig::default();
            config.category.file_name = bad.to_string();
            assert!(config.validate().is_err(), "accepted {:?}", bad);
        }
    }

    #[test]
    fn test_empty_job_name_is_rejected() {
        let mut config = ImportConfig::default();
        config.job_name = "  ".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_file_path_joins_work_dir() {
        let config = ImportConfig::default();
        assert_eq!(config.file_path(&config.form), PathBuf::from("temp/file02.csv"));
    }
}
