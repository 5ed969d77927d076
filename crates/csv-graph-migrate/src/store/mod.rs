//! Store client boundary.
//!
//! The migrator renders statements and hands them to a store client; each
//! worker owns one transaction scoped to exactly one sub-batch. The client
//! reports match counts so append-or-insert entries can branch to their
//! direct-insert fallback on a zero-result match.

pub mod memory;
pub mod script;

use async_trait::async_trait;
use thiserror::Error;

pub use memory::{MemoryStore, MemoryStoreMode};
pub use script::ScriptStore;

/// Store-side failures, classified for the row-level error taxonomy.
#[derive(Debug, Clone, Error)]
pub enum StoreError {
    /// Connectivity or availability failure: the sub-batch is skipped and its
    /// rows logged for manual replay.
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// The store itself rejected the statement.
    #[error("store rejected statement: {0}")]
    Rejected(String),
}

/// Outcome of executing one statement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExecuteOutcome {
    /// How many existing things the match side found. Insert-only statements
    /// report 1 (the insert always applies).
    pub matched: usize,
}

impl ExecuteOutcome {
    pub fn applied() -> Self {
        Self { matched: 1 }
    }

    pub fn nothing_matched(&self) -> bool {
        self.matched == 0
    }
}

/// A connection to the graph store.
#[async_trait]
pub trait StoreClient: Send + Sync {
    /// Open a write transaction.
    async fn transaction(&self) -> Result<Box<dyn StoreTransaction>, StoreError>;
}

/// One write transaction, scoped to a single sub-batch.
#[async_trait]
pub trait StoreTransaction: Send {
    /// Execute one rendered statement within this transaction.
    async fn execute(&mut self, statement: &str) -> Result<ExecuteOutcome, StoreError>;

    /// Commit everything executed so far.
    async fn commit(self: Box<Self>) -> Result<(), StoreError>;
}
