//! Update-or-insert persistence of record chunks
//!
//! For every record a keyed `UPDATE` runs first; when it matches no row the
//! full `INSERT` follows. Both statements run on the caller's connection, which
//! is the chunk transaction in the pipeline, so a failure leaves nothing of the
//! chunk behind once the caller rolls back.

pub mod statement;
pub mod tables;

use sqlx::AnyConnection;
use tracing::{debug, error};

use crate::error::{ImportError, Result};

pub use statement::{PositionalStatement, SqlParam};

/// A record that knows its keyed update and full insert
pub trait UpsertRecord: Send + Sync {
    /// `UPDATE` of all non-key columns, matched on the natural key
    fn update_statement(&self) -> PositionalStatement;

    /// `INSERT` of the full column set
    fn insert_statement(&self) -> PositionalStatement;

    /// Business identifiers for log lines, e.g. `formId=42`
    fn identifiers(&self) -> String;
}

/// Which statement persisted a record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOutcome {
    Updated,
    Inserted,
}

/// Per-chunk write counts
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ChunkWriteStats {
    pub updated: u64,
    pub inserted: u64,
}

impl ChunkWriteStats {
    pub fn record(&mut self, outcome: WriteOutcome) {
        match outcome {
            WriteOutcome::Updated => self.updated += 1,
            WriteOutcome::Inserted => self.inserted += 1,
        }
    }

    pub fn total(&self) -> u64 {
        self.updated + self.inserted
    }
}

/// Writes records one at a time with update-then-insert
#[derive(Debug, Clone)]
pub struct UpsertWriter {
    step: String,
}

impl UpsertWriter {
    pub fn new(step: impl Into<String>) -> Self {
        Self { step: step.into() }
    }

    /// Persist one record
    pub async fn write<T: UpsertRecord>(
        &self,
        conn: &mut AnyConnection,
        item: &T,
    ) -> Result<WriteOutcome> {
        let update = item.update_statement();
        let matched = self.execute(conn, item, &update).await?;
        if matched > 0 {
            debug!(step = %self.step, record = %item.identifiers(), "Record updated");
            return Ok(WriteOutcome::Updated);
        }

        let insert = item.insert_statement();
        self.execute(conn, item, &insert).await?;
        debug!(step = %self.step, record = %item.identifiers(), "Record inserted");
        Ok(WriteOutcome::Inserted)
    }

    /// Persist every record of a chunk in order, stopping at the first failure
    pub async fn write_chunk<T: UpsertRecord>(
        &self,
        conn: &mut AnyConnection,
        items: &[T],
    ) -> Result<ChunkWriteStats> {
        let mut stats = ChunkWriteStats::default();
        for item in items {
            let outcome = self.write(&mut *conn, item).await?;
            stats.record(outcome);
        }
        Ok(stats)
    }

    async fn execute<T: UpsertRecord>(
        &self,
        conn: &mut AnyConnection,
        item: &T,
        statement: &PositionalStatement,
    ) -> Result<u64> {
        let query = statement.query().inspect_err(|e| {
            error!(
                step = %self.step,
                record = %item.identifiers(),
                error = %e,
                "Statement rejected before execution"
            );
        })?;

        match query.execute(&mut *conn).await {
            Ok(done) => Ok(done.rows_affected()),
            Err(source) => {
                let record = item.identifiers();
                error!(
                    step = %self.step,
                    record = %record,
                    sql = statement.sql(),
                    error = %source,
                    "Failed to write record"
                );
                Err(ImportError::Persistence { record, source })
            },
        }
    }
}
