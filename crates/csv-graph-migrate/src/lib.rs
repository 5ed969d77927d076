//! # csv-graph-migrate
//!
//! Loads tabular data (CSV/TSV) into a schema-typed graph database by
//! compiling each row, under a declarative mapping configuration, into graph
//! write statements, then executing those statements in checkpointed,
//! concurrent batches. Supports:
//!
//! - **Row-to-statement compilation** per concept kind (attributes, entities,
//!   relations, attribute appends), including recursively nested relation
//!   players
//! - **Structural completeness validation** before anything is submitted
//! - **Parallel sub-batch workers**, one store transaction each
//! - **Resume capability** via a flat JSON status file
//! - **Per-dataset row logs** for malformed, invalid, and unavailable rows
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use csv_graph_migrate::{config, Config, MemoryStore, Orchestrator, Schema};
//! use tokio_util::sync::CancellationToken;
//!
//! #[tokio::main]
//! async fn main() -> csv_graph_migrate::Result<()> {
//!     let config = Config::load("config.yaml")?;
//!     let schema = Schema::load("schema.yaml")?;
//!     let entries = config::resolve(&config)?;
//!     let orchestrator = Orchestrator::new(entries, schema, Arc::new(MemoryStore::new()));
//!     let result = orchestrator.run(CancellationToken::new()).await?;
//!     println!("Migrated {} rows", result.rows_migrated);
//!     Ok(())
//! }
//! ```

pub mod codec;
pub mod config;
pub mod dataset;
pub mod error;
pub mod generator;
pub mod orchestrator;
pub mod pattern;
pub mod schema;
pub mod source;
pub mod state;
pub mod store;

// Re-exports for convenient access
pub use codec::{Preprocessor, PreprocessorSpec, Value, ValueType};
pub use config::{Config, MappingEntry, ResolvedEntry, ValidationReport};
pub use dataset::{ChunkOutcome, DatasetDriver, RowLogs};
pub use error::{MigrateError, Result};
pub use orchestrator::{MigrationResult, Orchestrator};
pub use pattern::Pattern;
pub use schema::Schema;
pub use state::MigrationStatus;
pub use store::{MemoryStore, ScriptStore, StoreClient, StoreError};
