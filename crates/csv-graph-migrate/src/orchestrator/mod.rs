//! Migration orchestrator - main workflow coordinator.
//!
//! Datasets run sequentially in dependency-class order, because later
//! classes' match patterns reference things inserted by earlier classes.
//! Within one dataset the driver parallelizes sub-batches; the orchestrator
//! owns the status file and advances it only after each chunk barrier, so a
//! crashed run resumes without re-reading completed chunks.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::config::validation::preflight;
use crate::config::{ConceptKind, PlayerKind, ResolvedEntry};
use crate::dataset::{DatasetDriver, RowLogs};
use crate::error::{MigrateError, Result};
use crate::schema::Schema;
use crate::state::MigrationStatus;
use crate::store::StoreClient;

/// Dependency classes, in processing order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum DependencyClass {
    IndependentAttribute,
    Entity,
    EntityRelation,
    NestedRelation,
    AttributeAppend,
    AttributeRelation,
}

/// Classify a dataset entry for scheduling.
pub fn classify(entry: &ResolvedEntry) -> DependencyClass {
    match entry.kind {
        ConceptKind::Attribute => DependencyClass::IndependentAttribute,
        ConceptKind::Entity => DependencyClass::Entity,
        ConceptKind::AttributeAppend | ConceptKind::AppendOrInsert => {
            DependencyClass::AttributeAppend
        }
        ConceptKind::Relation => {
            let nested = entry
                .players
                .iter()
                .any(|p| matches!(p.kind, PlayerKind::ByPlayers { .. }));
            let attribute_player = entry
                .players
                .iter()
                .any(|p| matches!(p.kind, PlayerKind::Attribute { .. }));
            if nested {
                DependencyClass::NestedRelation
            } else if attribute_player {
                DependencyClass::AttributeRelation
            } else {
                DependencyClass::EntityRelation
            }
        }
    }
}

/// Order entries: explicit `order_before` entries first (ascending), then the
/// class-ordered bulk, then explicit `order_after` entries (ascending).
pub(crate) fn schedule(entries: &[ResolvedEntry]) -> Vec<&ResolvedEntry> {
    let mut before: Vec<&ResolvedEntry> =
        entries.iter().filter(|e| e.order_before.is_some()).collect();
    before.sort_by_key(|e| e.order_before);

    let mut classed: Vec<&ResolvedEntry> = entries
        .iter()
        .filter(|e| e.order_before.is_none() && e.order_after.is_none())
        .collect();
    classed.sort_by_key(|e| classify(e));

    let mut after: Vec<&ResolvedEntry> =
        entries.iter().filter(|e| e.order_after.is_some()).collect();
    after.sort_by_key(|e| e.order_after);

    before.into_iter().chain(classed).chain(after).collect()
}

/// Migration orchestrator.
pub struct Orchestrator {
    entries: Vec<ResolvedEntry>,
    schema: Schema,
    store: Arc<dyn StoreClient>,
    status_path: PathBuf,
    log_dir: PathBuf,
    config_hash: Option<String>,
}

/// Result of a migration run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MigrationResult {
    /// Unique run identifier.
    pub run_id: String,

    /// Final status: completed, failed, or cancelled.
    pub status: String,

    /// Total duration in seconds.
    pub duration_seconds: f64,

    pub started_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,

    /// Dataset files scheduled (ignored and already-completed ones included).
    pub datasets_total: usize,
    pub datasets_completed: usize,
    pub datasets_failed: usize,

    /// Data rows consumed across all datasets this run.
    pub rows_migrated: u64,

    /// Statements committed to the store this run.
    pub statements_submitted: u64,

    /// Average throughput (rows/second).
    pub rows_per_second: u64,

    pub failed_datasets: Vec<String>,
}

impl MigrationResult {
    /// Convert to JSON string.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

impl Orchestrator {
    pub fn new(entries: Vec<ResolvedEntry>, schema: Schema, store: Arc<dyn StoreClient>) -> Self {
        Self {
            entries,
            schema,
            store,
            status_path: PathBuf::from("migration-status.json"),
            log_dir: PathBuf::from("logs"),
            config_hash: None,
        }
    }

    /// Set the status file path for resume capability.
    pub fn with_status_file(mut self, path: PathBuf) -> Self {
        self.status_path = path;
        self
    }

    /// Set the directory for the per-dataset row logs.
    pub fn with_log_dir(mut self, dir: PathBuf) -> Self {
        self.log_dir = dir;
        self
    }

    /// Guard resume against a changed configuration.
    pub fn with_config_hash(mut self, hash: String) -> Self {
        self.config_hash = Some(hash);
        self
    }

    /// Reset the checkpoint: the next run starts from scratch.
    pub fn clean(&self) -> Result<()> {
        if self.status_path.exists() {
            std::fs::remove_file(&self.status_path)?;
            info!("Removed status file {:?}", self.status_path);
        }
        Ok(())
    }

    /// Run the migration.
    pub async fn run(&self, cancel: CancellationToken) -> Result<MigrationResult> {
        let started_at = Utc::now();
        let started = Instant::now();
        let run_id = uuid::Uuid::new_v4().to_string();
        info!("Starting migration run: {}", run_id);

        // Pre-flight: migration must not start while config errors are
        // outstanding.
        let report = preflight(&self.entries, &self.schema);
        report.log();
        if report.is_blocking() {
            return Err(MigrateError::config(format!(
                "{} configuration error(s), see log",
                report.errors.len()
            )));
        }

        let mut status = MigrationStatus::load_or_default(&self.status_path)?;
        if let Some(hash) = &self.config_hash {
            status.validate_config(hash)?;
            status.config_hash = Some(hash.clone());
        }

        let scheduled = schedule(&self.entries);
        let mut result = MigrationResult {
            run_id,
            status: "completed".into(),
            duration_seconds: 0.0,
            started_at,
            completed_at: started_at,
            datasets_total: 0,
            datasets_completed: 0,
            datasets_failed: 0,
            rows_migrated: 0,
            statements_submitted: 0,
            rows_per_second: 0,
            failed_datasets: Vec::new(),
        };

        'outer: for entry in scheduled {
            if entry.ignore {
                info!("Dataset '{}': ignored", entry.key);
                continue;
            }
            for path in &entry.data_paths {
                result.datasets_total += 1;
                let entry_key = entry_key(entry, path);

                if status.is_completed(&entry_key) {
                    info!("Dataset '{}': already completed, skipping", entry_key);
                    result.datasets_completed += 1;
                    continue;
                }
                if cancel.is_cancelled() {
                    result.status = "cancelled".into();
                    break 'outer;
                }

                match self
                    .process_file(entry, path, &entry_key, &mut status, &cancel)
                    .await
                {
                    Ok(stats) => {
                        result.rows_migrated += stats.rows;
                        result.statements_submitted += stats.submitted;
                        if stats.completed {
                            result.datasets_completed += 1;
                        } else {
                            // Interrupted mid-stream; the checkpoint holds.
                            result.status = "cancelled".into();
                            break 'outer;
                        }
                    }
                    Err(e) => {
                        // A structural failure stops only this dataset.
                        error!("Dataset '{}': {}", entry_key, e);
                        result.datasets_failed += 1;
                        result.failed_datasets.push(entry_key);
                    }
                }
            }
        }

        if result.datasets_failed > 0 && result.status == "completed" {
            result.status = "failed".into();
        }

        result.completed_at = Utc::now();
        result.duration_seconds = started.elapsed().as_secs_f64();
        result.rows_per_second = if result.duration_seconds > 0.0 {
            (result.rows_migrated as f64 / result.duration_seconds) as u64
        } else {
            0
        };

        status.save(&self.status_path)?;

        info!(
            "Migration {}: {} datasets, {} rows in {:.1}s ({} rows/s)",
            result.status,
            result.datasets_total,
            result.rows_migrated,
            result.duration_seconds,
            result.rows_per_second
        );

        Ok(result)
    }

    async fn process_file(
        &self,
        entry: &ResolvedEntry,
        path: &Path,
        entry_key: &str,
        status: &mut MigrationStatus,
        cancel: &CancellationToken,
    ) -> Result<FileStats> {
        let skip = status.migrated_rows(entry_key);
        if skip > 0 {
            info!("Dataset '{}': resuming at row {}", entry_key, skip);
        } else {
            info!("Dataset '{}': starting", entry_key);
        }

        let logs = RowLogs::create(&self.log_dir, &entry.key)?;
        let mut driver = DatasetDriver::new(entry.clone(), self.store.clone(), logs);
        let mut stream = driver.open_stream(path, skip)?;

        let started = Instant::now();
        let mut stats = FileStats::default();

        loop {
            if cancel.is_cancelled() {
                warn!("Dataset '{}': cancelled between chunks", entry_key);
                return Ok(stats);
            }
            match driver.next_chunk(&mut stream).await? {
                None => break,
                Some(outcome) => {
                    stats.rows += outcome.rows;
                    stats.submitted += outcome.submitted;
                    status.advance(entry_key, outcome.rows);
                    status.save(&self.status_path)?;
                }
            }
        }

        status.mark_completed(entry_key);
        status.save(&self.status_path)?;
        stats.completed = true;

        let elapsed = started.elapsed().as_secs_f64();
        let throughput = if elapsed > 0.0 {
            (stats.rows as f64 / elapsed) as u64
        } else {
            0
        };
        let logs = driver.logs();
        info!(
            "Dataset '{}': completed, {} rows ({} rows/s), {} malformed, {} invalid, {} unavailable",
            entry_key,
            stats.rows,
            throughput,
            logs.malformed_rows,
            logs.invalid_rows,
            logs.unavailable_rows
        );

        Ok(stats)
    }
}

fn entry_key(entry: &ResolvedEntry, path: &Path) -> String {
    format!("{}:{}", entry.key, path.display())
}

#[derive(Debug, Default, Clone, Copy)]
struct FileStats {
    rows: u64,
    submitted: u64,
    completed: bool,
}
