//! Clip Import Library
#![deny(clippy::unwrap_used, clippy::expect_used)]
//!
//! Chunked import of pipe-delimited form exports into a relational store.
//!
//! # Pipeline
//!
//! - **Acquisition**: source files are fetched into a working directory
//!   over HTTP, FTP or from a local path ([`acquire`])
//! - **Read**: each file is read lazily into typed records ([`reader`])
//! - **Process**: form payloads are converted from base64 UTF-16LE to UTF-8,
//!   falling back to raw bytes when that fails ([`transcode`])
//! - **Write**: each record is updated by natural key, or inserted when no
//!   row matched, one transaction per chunk ([`writer`])
//! - **Report**: every run ends with a completion notification ([`notify`])
//!
//! # Example
//!
//! ```no_run
//! use clip_import::{db, ImportConfig, ImportJob, JobParameters};
//! use clip_import::notify::{notifier_from_config, CompletionReporter};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Arc::new(ImportConfig::from_env()?);
//!     let pool = db::create_pool(&config.database).await?;
//!     let reporter = CompletionReporter::new(notifier_from_config(&config.notify)?);
//!
//!     let job = ImportJob::new(config, pool, reporter)?;
//!     let (report, delivery) = job.run(&JobParameters::now()).await;
//!     delivery.await?;
//!     println!("{}", report.status);
//!     Ok(())
//! }
//! ```

pub mod acquire;
pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod notify;
pub mod pipeline;
pub mod reader;
pub mod scheduler;
pub mod transcode;
pub mod writer;

pub use config::ImportConfig;
pub use error::{ImportError, Result};
pub use pipeline::{ImportJob, JobParameters, JobReport, JobStatus};
