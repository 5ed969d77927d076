//! Dataset driver: streams one data file through the pattern builders and
//! fans completed batches out to store workers.
//!
//! A chunk is `batch_size x threads` rows. Each chunk is compiled and
//! validated synchronously, then its valid statements are split into
//! sub-batches of `batch_size` rows, one worker transaction each. Sub-batches
//! are submitted in row order but carry no cross-sub-batch commit ordering;
//! the chunk barrier is the join over all workers. The caller advances the
//! checkpoint only after that barrier.

pub mod logs;

use std::path::Path;
use std::sync::Arc;

use tokio::sync::Semaphore;
use tracing::{debug, warn};

use crate::config::ResolvedEntry;
use crate::error::{MigrateError, Result};
use crate::generator::{compile_row, Compiled, CompiledRow};
use crate::pattern::validate::is_complete;
use crate::source::RowSource;
use crate::store::{StoreClient, StoreError, StoreTransaction};

pub use logs::RowLogs;

/// Outcome of one submitted chunk.
#[derive(Debug, Default, Clone, Copy)]
pub struct ChunkOutcome {
    /// Raw data rows consumed from the source, whatever their fate. The
    /// checkpoint advances by this count.
    pub rows: u64,

    /// Statements committed to the store.
    pub submitted: u64,

    pub malformed: u64,
    pub invalid: u64,
    pub unavailable: u64,
}

/// An open position in one data file.
#[derive(Debug)]
pub struct DatasetStream {
    source: RowSource,
}

/// Drives one dataset entry against the store.
pub struct DatasetDriver {
    entry: ResolvedEntry,
    store: Arc<dyn StoreClient>,
    logs: RowLogs,
}

impl DatasetDriver {
    pub fn new(entry: ResolvedEntry, store: Arc<dyn StoreClient>, logs: RowLogs) -> Self {
        Self { entry, store, logs }
    }

    /// Open a data file, skipping the header and the first `skip` data rows
    /// (already-migrated rows on resume).
    pub fn open_stream(&self, path: &Path, skip: u64) -> Result<DatasetStream> {
        let mut source = RowSource::open(path, self.entry.separator)?;
        let skipped = source.skip(skip)?;
        if skipped < skip {
            return Err(MigrateError::dataset(
                &self.entry.key,
                format!(
                    "{}: checkpoint says {} rows migrated, file has {}",
                    path.display(),
                    skip,
                    skipped
                ),
            ));
        }
        Ok(DatasetStream { source })
    }

    /// Read, compile, and submit the next chunk. `None` at EOF.
    pub async fn next_chunk(&mut self, stream: &mut DatasetStream) -> Result<Option<ChunkOutcome>> {
        let mut raws = Vec::with_capacity(self.entry.chunk_size());
        while raws.len() < self.entry.chunk_size() {
            match stream.source.next_row()? {
                Some(raw) => raws.push(raw),
                None => break,
            }
        }
        if raws.is_empty() {
            self.logs.flush();
            return Ok(None);
        }

        let mut outcome = ChunkOutcome {
            rows: raws.len() as u64,
            ..Default::default()
        };

        // Compile and validate the whole chunk up front; building is pure and
        // never suspends.
        let header = stream.source.header().clone();
        let mut valid: Vec<CompiledRow> = Vec::new();
        for raw in &raws {
            let fields = stream.source.tokenize(raw);
            if fields.len() > header.len() {
                warn!(
                    "dataset '{}': row has {} fields for {} header columns",
                    self.entry.key,
                    fields.len(),
                    header.len()
                );
                self.logs.malformed(raw);
                outcome.malformed += 1;
            }
            match compile_row(&self.entry, &header, raw, &fields) {
                Compiled::Rejected(reason) => {
                    self.logs.invalid(raw, &reason);
                    outcome.invalid += 1;
                }
                Compiled::Statements(rows) => {
                    for row in rows {
                        if is_complete(&row.pattern, &self.entry) {
                            valid.push(row);
                        } else {
                            self.logs.invalid(&row.raw, &row.pattern.to_string());
                            outcome.invalid += 1;
                        }
                    }
                }
            }
        }

        // Fan sub-batches out to workers; each owns one transaction.
        let mut sub_batches: Vec<Vec<CompiledRow>> = Vec::new();
        let mut current = Vec::with_capacity(self.entry.batch_size);
        for row in valid {
            current.push(row);
            if current.len() == self.entry.batch_size {
                sub_batches.push(std::mem::take(&mut current));
            }
        }
        if !current.is_empty() {
            sub_batches.push(current);
        }

        let semaphore = Arc::new(Semaphore::new(self.entry.threads));
        let mut handles = Vec::with_capacity(sub_batches.len());
        for batch in sub_batches {
            let permit = semaphore
                .clone()
                .acquire_owned()
                .await
                .expect("semaphore closed");
            let store = self.store.clone();
            handles.push(tokio::spawn(async move {
                let report = run_sub_batch(store, batch).await;
                drop(permit);
                report
            }));
        }

        // Chunk barrier: every sub-batch has returned, success or classified
        // failure.
        for handle in handles {
            let report = handle
                .await
                .map_err(|e| MigrateError::dataset(&self.entry.key, format!("worker panicked: {}", e)))?;
            outcome.submitted += report.submitted;
            for (raw, statement) in &report.rejected {
                self.logs.invalid(raw, statement);
                outcome.invalid += 1;
            }
            if let Some(message) = &report.error {
                warn!(
                    "dataset '{}': sub-batch skipped, {} rows logged for replay: {}",
                    self.entry.key,
                    report.unavailable.len(),
                    message
                );
            }
            for raw in &report.unavailable {
                self.logs.unavailable(raw);
                outcome.unavailable += 1;
            }
        }

        self.logs.flush();
        debug!(
            "dataset '{}': chunk of {} rows, {} submitted, {} invalid, {} unavailable",
            self.entry.key, outcome.rows, outcome.submitted, outcome.invalid, outcome.unavailable
        );
        Ok(Some(outcome))
    }

    pub fn logs(&self) -> &RowLogs {
        &self.logs
    }
}

#[derive(Debug, Default)]
struct SubBatchReport {
    submitted: u64,
    /// (raw row, rendered statement) pairs the store rejected or that
    /// matched nothing with no fallback to take.
    rejected: Vec<(String, String)>,
    /// Raw rows that never reached a committed transaction.
    unavailable: Vec<String>,
    error: Option<String>,
}

enum RowResult {
    Submitted,
    Rejected { statement: String },
    Unavailable { message: String },
}

/// Execute one sub-batch in its own transaction.
async fn run_sub_batch(store: Arc<dyn StoreClient>, rows: Vec<CompiledRow>) -> SubBatchReport {
    let mut report = SubBatchReport::default();

    let mut txn = match store.transaction().await {
        Ok(txn) => txn,
        Err(e) => {
            report.error = Some(e.to_string());
            report.unavailable = rows.into_iter().map(|r| r.raw).collect();
            return report;
        }
    };

    let mut pending: Vec<String> = Vec::new();
    let mut aborted: Option<String> = None;
    let mut leftovers: Vec<String> = Vec::new();

    for row in rows {
        if aborted.is_some() {
            leftovers.push(row.raw);
            continue;
        }
        match execute_row(txn.as_mut(), &row).await {
            RowResult::Submitted => pending.push(row.raw),
            RowResult::Rejected { statement } => report.rejected.push((row.raw, statement)),
            RowResult::Unavailable { message } => {
                aborted = Some(message);
                leftovers.push(row.raw);
            }
        }
    }

    if let Some(message) = aborted {
        // The transaction never commits: executed rows are lost with it.
        report.error = Some(message);
        report.unavailable.extend(pending);
        report.unavailable.extend(leftovers);
        return report;
    }

    match txn.commit().await {
        Ok(()) => report.submitted = pending.len() as u64,
        Err(e) => {
            report.error = Some(e.to_string());
            report.unavailable.extend(pending);
        }
    }
    report
}

async fn execute_row(txn: &mut dyn StoreTransaction, row: &CompiledRow) -> RowResult {
    let statement = row.pattern.to_string();
    match txn.execute(&statement).await {
        Ok(outcome) if outcome.nothing_matched() => match &row.fallback {
            // Append-miss: fall back to the direct insert.
            Some(fallback) => {
                let fallback_statement = fallback.to_string();
                match txn.execute(&fallback_statement).await {
                    Ok(_) => RowResult::Submitted,
                    Err(StoreError::Rejected(_)) => RowResult::Rejected {
                        statement: fallback_statement,
                    },
                    Err(StoreError::Unavailable(message)) => RowResult::Unavailable { message },
                }
            }
            None => RowResult::Rejected { statement },
        },
        Ok(_) => RowResult::Submitted,
        Err(StoreError::Rejected(_)) => RowResult::Rejected { statement },
        Err(StoreError::Unavailable(message)) => RowResult::Unavailable { message },
    }
}
