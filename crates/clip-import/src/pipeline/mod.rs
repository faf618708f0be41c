//! Job pipeline: stage statistics, the chunk loop and the orchestrator

pub mod orchestrator;
pub mod params;
pub mod stats;
pub mod step;

pub use orchestrator::ImportJob;
pub use params::JobParameters;
pub use stats::{JobReport, JobStatus, Stage, StepStats, StepStatus};
pub use step::ChunkStep;
