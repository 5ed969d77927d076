//! File-based migration status for resume capability.
//!
//! The status file is the only entity with cross-run persistence: a flat,
//! human-diffable map from dataset entry key to progress, plus the config
//! hash guarding against resuming under a changed configuration. It is read
//! once at startup and rewritten atomically after each chunk barrier, by the
//! orchestrator only.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{MigrateError, Result};

/// Per-run migration status, keyed by dataset identity plus file path.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MigrationStatus {
    /// Hash of the configuration this status was written under.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config_hash: Option<String>,

    /// Progress per dataset entry.
    #[serde(default)]
    pub datasets: BTreeMap<String, EntryStatus>,
}

/// Progress of one dataset entry.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryStatus {
    /// The whole file was processed.
    pub completed: bool,

    /// Data rows whose chunk fully completed.
    pub migrated_rows: u64,
}

impl MigrationStatus {
    /// Load status from a file; a missing file means a fresh run.
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        let status: Self = serde_json::from_str(&content)
            .map_err(|e| MigrateError::State(format!("{}: {}", path.display(), e)))?;
        Ok(status)
    }

    /// Save status to a file (atomic write: temp file, then rename).
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let content = serde_json::to_string_pretty(self)?;
        let temp_path = path.with_extension("tmp");
        std::fs::write(&temp_path, &content)?;
        std::fs::rename(&temp_path, path)?;
        Ok(())
    }

    /// Refuse to resume under a changed configuration.
    pub fn validate_config(&self, config_hash: &str) -> Result<()> {
        match &self.config_hash {
            Some(stored) if stored != config_hash => Err(MigrateError::ConfigChanged),
            _ => Ok(()),
        }
    }

    pub fn is_completed(&self, key: &str) -> bool {
        self.datasets.get(key).map(|s| s.completed).unwrap_or(false)
    }

    /// Rows to skip on resume: 0 for unseen entries.
    pub fn migrated_rows(&self, key: &str) -> u64 {
        self.datasets.get(key).map(|s| s.migrated_rows).unwrap_or(0)
    }

    /// Advance progress after a chunk barrier.
    pub fn advance(&mut self, key: &str, rows: u64) {
        self.datasets.entry(key.to_string()).or_default().migrated_rows += rows;
    }

    pub fn mark_completed(&mut self, key: &str) {
        self.datasets.entry(key.to_string()).or_default().completed = true;
    }
}
