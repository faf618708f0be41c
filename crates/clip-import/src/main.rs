//! Clip Import - form export import job

use anyhow::Result;
use clap::{Parser, Subcommand};
use clip_common::logging::{init_logging, LogConfig, LogLevel};
use clip_import::notify::{notifier_from_config, CompletionReporter};
use clip_import::scheduler::JobScheduler;
use clip_import::{db, ImportConfig, ImportJob, JobParameters, JobReport};
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{error, info};

#[derive(Parser, Debug)]
#[command(name = "clip-import")]
#[command(author, version, about = "Import pipe-delimited form exports into the clip tables")]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the import once now
    Run {
        /// Use the files already in the working directory
        #[arg(long)]
        skip_acquire: bool,
    },

    /// Run the import on the configured cron schedule until Ctrl-C
    Schedule,
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let log_level = if cli.verbose {
        LogLevel::Debug
    } else {
        LogLevel::Info
    };
    let log_config = LogConfig::builder()
        .level(log_level)
        .log_file_prefix("clip-import")
        .build()
        .merge_env()?;
    let _guard = init_logging(&log_config)?;

    let config = Arc::new(ImportConfig::from_env()?);
    info!(job = %config.job_name, work_dir = %config.work_dir.display(), "Configuration loaded");

    let pool = db::create_pool(&config.database).await?;
    let reporter = CompletionReporter::new(notifier_from_config(&config.notify)?);
    let job = ImportJob::new(Arc::clone(&config), pool, reporter)?;

    match cli.command {
        Command::Run { skip_acquire } => {
            let job = if skip_acquire {
                job.with_fetcher(None)
            } else {
                job
            };

            let (report, delivery) = job.run(&JobParameters::now()).await;
            if let Err(e) = delivery.await {
                error!("Notification task failed: {}", e);
            }

            Ok(exit_code(&report))
        },
        Command::Schedule => {
            let scheduler = JobScheduler::new(Arc::new(job), &config.schedule)?;
            scheduler
                .run_until(async {
                    if let Err(e) = tokio::signal::ctrl_c().await {
                        error!("Failed to listen for Ctrl-C: {}", e);
                        std::future::pending::<()>().await;
                    }
                })
                .await?;
            Ok(ExitCode::SUCCESS)
        },
    }
}

/// Process status for a finished one-shot run
fn exit_code(report: &JobReport) -> ExitCode {
    if report.status.is_success() {
        info!("Import complete");
        ExitCode::SUCCESS
    } else {
        error!(error = report.error.as_deref().unwrap_or(""), "Import failed");
        ExitCode::FAILURE
    }
}
