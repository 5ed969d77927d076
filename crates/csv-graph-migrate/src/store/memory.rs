//! In-memory store client, for tests and dry runs.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::store::{ExecuteOutcome, StoreClient, StoreError, StoreTransaction};

/// Behavior knobs for exercising the driver's failure paths.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemoryStoreMode {
    /// Every statement applies; match sides find one result.
    Accept,

    /// Match/insert statements find nothing (drives append-or-insert
    /// fallbacks); insert-only statements still apply.
    NoMatch,

    /// Every transaction fails as unavailable.
    Unavailable,
}

/// Records committed statements in submission order.
#[derive(Clone)]
pub struct MemoryStore {
    mode: MemoryStoreMode,
    committed: Arc<Mutex<Vec<String>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::with_mode(MemoryStoreMode::Accept)
    }

    pub fn with_mode(mode: MemoryStoreMode) -> Self {
        Self {
            mode,
            committed: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Statements from committed transactions, in submission order.
    pub async fn committed(&self) -> Vec<String> {
        self.committed.lock().await.clone()
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl StoreClient for MemoryStore {
    async fn transaction(&self) -> Result<Box<dyn StoreTransaction>, StoreError> {
        if self.mode == MemoryStoreMode::Unavailable {
            return Err(StoreError::Unavailable("memory store is offline".into()));
        }
        Ok(Box::new(MemoryTransaction {
            mode: self.mode,
            committed: self.committed.clone(),
            staged: Vec::new(),
        }))
    }
}

struct MemoryTransaction {
    mode: MemoryStoreMode,
    committed: Arc<Mutex<Vec<String>>>,
    staged: Vec<String>,
}

#[async_trait]
impl StoreTransaction for MemoryTransaction {
    async fn execute(&mut self, statement: &str) -> Result<ExecuteOutcome, StoreError> {
        if self.mode == MemoryStoreMode::NoMatch && statement.starts_with("match ") {
            return Ok(ExecuteOutcome { matched: 0 });
        }
        self.staged.push(statement.to_string());
        Ok(ExecuteOutcome::applied())
    }

    async fn commit(self: Box<Self>) -> Result<(), StoreError> {
        self.committed.lock().await.extend(self.staged);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_commit_publishes_staged_statements() {
        let store = MemoryStore::new();
        let mut txn = store.transaction().await.unwrap();
        txn.execute("insert $a isa a;").await.unwrap();
        assert!(store.committed().await.is_empty());
        txn.commit().await.unwrap();
        assert_eq!(store.committed().await, vec!["insert $a isa a;"]);
    }

    #[tokio::test]
    async fn test_no_match_mode_reports_zero_for_match_inserts() {
        let store = MemoryStore::with_mode(MemoryStoreMode::NoMatch);
        let mut txn = store.transaction().await.unwrap();
        let outcome = txn.execute("match $a isa a; insert $a, has b 1;").await.unwrap();
        assert!(outcome.nothing_matched());
        let outcome = txn.execute("insert $a isa a;").await.unwrap();
        assert_eq!(outcome.matched, 1);
    }

    #[tokio::test]
    async fn test_unavailable_mode_fails_transactions() {
        let store = MemoryStore::with_mode(MemoryStoreMode::Unavailable);
        assert!(matches!(
            store.transaction().await,
            Err(StoreError::Unavailable(_))
        ));
    }
}
