//! Error types for the migration library.

use thiserror::Error;

use crate::store::StoreError;

/// Main error type for migration operations.
#[derive(Error, Debug)]
pub enum MigrateError {
    /// Configuration error (invalid YAML, missing fields, unresolved generator
    /// references, etc.)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Schema error (unknown concept type, role, or attribute).
    #[error("Schema error: {0}")]
    Schema(String),

    /// Data source error (unreadable file, missing header line).
    #[error("Data source error: {0}")]
    Source(String),

    /// Store client error surfaced outside of the per-row classification path.
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// Dataset-level structural failure.
    #[error("Dataset {dataset} failed: {message}")]
    Dataset { dataset: String, message: String },

    /// Migration status file error.
    #[error("Status file error: {0}")]
    State(String),

    /// Config hash mismatch on resume.
    #[error("Config has changed since last run - cannot resume. Use --clean to start fresh.")]
    ConfigChanged,

    /// IO error (file operations)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML serialization/deserialization error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Migration was cancelled (SIGINT, etc.)
    #[error("Migration cancelled")]
    Cancelled,
}

impl MigrateError {
    /// Create a Config error.
    pub fn config(message: impl Into<String>) -> Self {
        MigrateError::Config(message.into())
    }

    /// Create a Dataset error.
    pub fn dataset(dataset: impl Into<String>, message: impl Into<String>) -> Self {
        MigrateError::Dataset {
            dataset: dataset.into(),
            message: message.into(),
        }
    }

    /// Format error with full details including error chain.
    pub fn format_detailed(&self) -> String {
        let mut output = format!("Error: {}\n", self);

        let mut source = std::error::Error::source(self);
        let mut depth = 1;
        while let Some(err) = source {
            output.push_str(&format!("\nCaused by:\n  {}: {}", depth, err));
            source = err.source();
            depth += 1;
        }

        output
    }

    /// Process exit code for the CLI.
    pub fn exit_code(&self) -> u8 {
        match self {
            MigrateError::Config(_) | MigrateError::Schema(_) | MigrateError::ConfigChanged => 2,
            MigrateError::State(_) => 3,
            MigrateError::Cancelled => 130,
            _ => 1,
        }
    }
}

/// Result type alias for migration operations.
pub type Result<T> = std::result::Result<T, MigrateError>;
