//! Chunk-oriented import step
//!
//! Reads up to `chunk_size` records, runs the processor on each, writes the
//! chunk inside one transaction and commits. The loop ends when the file is
//! exhausted; the first error ends the step after rolling back the open chunk.

use sqlx::AnyPool;
use std::path::PathBuf;
use tracing::{debug, info, warn};

use super::stats::{Stage, StepStats};
use crate::error::Result;
use crate::models::SourceRecord;
use crate::reader::DelimitedReader;
use crate::transcode::{ItemProcessor, ProcessOutcome};
use crate::writer::{UpsertRecord, UpsertWriter};

/// One import step bound to a source file and a processor
pub struct ChunkStep<P> {
    stage: Stage,
    path: PathBuf,
    chunk_size: usize,
    processor: P,
}

impl<P> ChunkStep<P> {
    pub fn new(stage: Stage, path: impl Into<PathBuf>, chunk_size: usize, processor: P) -> Self {
        Self {
            stage,
            path: path.into(),
            chunk_size: chunk_size.max(1),
            processor,
        }
    }

    /// Run the step to completion. Counters in `stats` are updated as the step
    /// goes, so they stay meaningful when an error is returned.
    pub async fn run<T>(&self, pool: &AnyPool, stats: &mut StepStats) -> Result<()>
    where
        T: SourceRecord + UpsertRecord,
        P: ItemProcessor<T>,
    {
        let mut reader = DelimitedReader::<T>::open(&self.path)?;
        let writer = UpsertWriter::new(self.stage.name());
        let mut chunk_no = 0_u64;

        info!(
            step = %self.stage,
            entity = T::ENTITY,
            file = %self.path.display(),
            chunk_size = self.chunk_size,
            "Starting step"
        );

        loop {
            let mut chunk: Vec<T> = Vec::with_capacity(self.chunk_size);
            while chunk.len() < self.chunk_size {
                let Some(next) = reader.next() else {
                    break;
                };
                let mut item = next?;
                stats.read += 1;
                if self.processor.process(&mut item) == ProcessOutcome::RawFallback {
                    stats.fallbacks += 1;
                }
                chunk.push(item);
            }

            if chunk.is_empty() {
                break;
            }
            chunk_no += 1;

            let mut tx = pool.begin().await?;
            match writer.write_chunk(&mut *tx, &chunk).await {
                Ok(written) => {
                    tx.commit().await?;
                    stats.add_commit(written);
                    debug!(
                        step = %self.stage,
                        chunk = chunk_no,
                        records = chunk.len(),
                        inserted = written.inserted,
                        updated = written.updated,
                        "Chunk committed"
                    );
                },
                Err(e) => {
                    if let Err(rollback) = tx.rollback().await {
                        warn!(step = %self.stage, chunk = chunk_no, error = %rollback, "Rollback failed");
                    }
                    warn!(step = %self.stage, chunk = chunk_no, "Chunk rolled back");
                    return Err(e);
                },
            }

            if chunk.len() < self.chunk_size {
                break;
            }
        }

        info!(
            step = %self.stage,
            read = stats.read,
            inserted = stats.inserted,
            updated = stats.updated,
            fallbacks = stats.fallbacks,
            commits = stats.commits,
            "Step finished"
        );
        Ok(())
    }
}
