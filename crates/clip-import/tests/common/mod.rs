//! Common test utilities for clip-import integration tests
//!
//! Each [`TestEnv`] owns a temporary directory holding a SQLite database with
//! the bundled migrations applied and a working directory for source files.
//!
//! ```no_run
//! mod common;
//! use common::{RecordingNotifier, TestEnv};
//!
//! #[tokio::test]
//! async fn test_something() {
//!     let env = TestEnv::start().await;
//!     env.write_sources("CAT01|One|ACTIVE\n", "", "");
//!     let notifier = RecordingNotifier::new();
//!     let (report, delivery) = env.job(notifier.clone()).run(&env.params()).await;
//!     delivery.await.unwrap();
//! }
//! ```

#![allow(dead_code)]

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use clip_import::config::ImportConfig;
use clip_import::db;
use clip_import::notify::{CompletionReporter, Notifier};
use clip_import::{ImportError, ImportJob, JobParameters};
use sqlx::AnyPool;
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

pub struct TestEnv {
    pub dir: TempDir,
    pub pool: AnyPool,
    pub config: ImportConfig,
}

impl TestEnv {
    /// Fresh database and working directory
    pub async fn start() -> Self {
        Self::with_config(|_| {}).await
    }

    /// Fresh environment with the default configuration adjusted by `adjust`
    pub async fn with_config(adjust: impl FnOnce(&mut ImportConfig)) -> Self {
        let dir = TempDir::new().expect("Failed to create temp dir");
        let mut config = ImportConfig::default();
        config.work_dir = dir.path().join("work");
        config.database.url =
            format!("sqlite://{}?mode=rwc", dir.path().join("clip.db").display());
        config.database.max_connections = 1;
        config.database.run_migrations = true;
        adjust(&mut config);

        std::fs::create_dir_all(&config.work_dir).expect("Failed to create work dir");
        let pool = db::create_pool(&config.database)
            .await
            .expect("Failed to create pool");

        Self { dir, pool, config }
    }

    /// Write the category, form and form data files into the working directory
    pub fn write_sources(&self, category: &str, form: &str, form_data: &str) {
        self.write_source(&self.config.category.file_name, category);
        self.write_source(&self.config.form.file_name, form);
        self.write_source(&self.config.form_data.file_name, form_data);
    }

    pub fn write_source(&self, name: &str, contents: &str) {
        std::fs::write(self.config.work_dir.join(name), contents).expect("Failed to write source");
    }

    pub fn job(&self, notifier: Arc<dyn Notifier>) -> ImportJob {
        ImportJob::new(
            Arc::new(self.config.clone()),
            self.pool.clone(),
            CompletionReporter::new(notifier),
        )
        .expect("Failed to build job")
    }

    pub fn params(&self) -> JobParameters {
        JobParameters::now()
    }

    pub async fn count(&self, table: &str) -> i64 {
        let (count,): (i64,) = sqlx::query_as(&format!("SELECT COUNT(*) FROM {}", table))
            .fetch_one(&self.pool)
            .await
            .expect("Failed to count rows");
        count
    }

    pub async fn form_data(&self, form_id: i64) -> Vec<u8> {
        let (data,): (Vec<u8>,) =
            sqlx::query_as("SELECT form_data FROM clip_form_data WHERE form_id = $1")
                .bind(form_id)
                .fetch_one(&self.pool)
                .await
                .expect("Failed to load form data");
        data
    }

    pub async fn form_data_ids(&self) -> Vec<i64> {
        let rows: Vec<(i64,)> =
            sqlx::query_as("SELECT form_id FROM clip_form_data ORDER BY form_id")
                .fetch_all(&self.pool)
                .await
                .expect("Failed to list form ids");
        rows.into_iter().map(|(id,)| id).collect()
    }

    /// Make every insert of a form data row with this product id fail
    pub async fn reject_product(&self, product_id: &str) {
        let sql = format!(
            "CREATE TRIGGER reject_{0} BEFORE INSERT ON clip_form_data \
             WHEN NEW.product_id = '{0}' \
             BEGIN SELECT RAISE(ABORT, 'rejected product {0}'); END",
            product_id
        );
        sqlx::query(&sql)
            .execute(&self.pool)
            .await
            .expect("Failed to create trigger");
    }
}

/// base64 of the UTF-16LE encoding of `text`
pub fn encode_payload(text: &str) -> String {
    let bytes: Vec<u8> = text.encode_utf16().flat_map(|u| u.to_le_bytes()).collect();
    STANDARD.encode(bytes)
}

/// Keeps every message it is asked to send
#[derive(Default)]
pub struct RecordingNotifier {
    messages: Mutex<Vec<String>>,
}

impl RecordingNotifier {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn messages(&self) -> Vec<String> {
        self.messages.lock().expect("poisoned").clone()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send(&self, message: &str) -> clip_import::Result<()> {
        self.messages
            .lock()
            .expect("poisoned")
            .push(message.to_string());
        Ok(())
    }
}

/// Always fails to deliver
pub struct FailingNotifier;

#[async_trait]
impl Notifier for FailingNotifier {
    async fn send(&self, _message: &str) -> clip_import::Result<()> {
        Err(ImportError::Notification("transport down".to_string()))
    }
}
