//! Script-file store client: appends rendered statements to a file.
//!
//! Useful when the actual write should happen later through the store's own
//! console tooling: the migration compiles and sequences everything, the
//! resulting script is applied out of band. Match sides are assumed to find
//! their target, so append-or-insert entries never take the fallback path
//! with this client.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::store::{ExecuteOutcome, StoreClient, StoreError, StoreTransaction};

pub struct ScriptStore {
    path: PathBuf,
    // One writer across all worker transactions.
    sink: Arc<Mutex<std::fs::File>>,
}

impl ScriptStore {
    /// Open (or create) the script file in append mode.
    pub fn open(path: &Path) -> std::io::Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self {
            path: path.to_path_buf(),
            sink: Arc::new(Mutex::new(file)),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl StoreClient for ScriptStore {
    async fn transaction(&self) -> Result<Box<dyn StoreTransaction>, StoreError> {
        Ok(Box::new(ScriptTransaction {
            sink: self.sink.clone(),
            staged: Vec::new(),
        }))
    }
}

struct ScriptTransaction {
    sink: Arc<Mutex<std::fs::File>>,
    staged: Vec<String>,
}

#[async_trait]
impl StoreTransaction for ScriptTransaction {
    async fn execute(&mut self, statement: &str) -> Result<ExecuteOutcome, StoreError> {
        self.staged.push(statement.to_string());
        Ok(ExecuteOutcome::applied())
    }

    async fn commit(self: Box<Self>) -> Result<(), StoreError> {
        let mut file = self.sink.lock().await;
        for statement in &self.staged {
            writeln!(file, "{}", statement)
                .map_err(|e| StoreError::Unavailable(format!("script sink: {}", e)))?;
        }
        file.flush()
            .map_err(|e| StoreError::Unavailable(format!("script sink: {}", e)))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_commit_appends_statements() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("statements.tql");
        let store = ScriptStore::open(&path).unwrap();

        let mut txn = store.transaction().await.unwrap();
        txn.execute("insert $a isa a;").await.unwrap();
        txn.execute("insert $b isa b;").await.unwrap();
        txn.commit().await.unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(content, "insert $a isa a;\ninsert $b isa b;\n");
    }

    #[tokio::test]
    async fn test_uncommitted_statements_are_not_written() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("statements.tql");
        let store = ScriptStore::open(&path).unwrap();

        let mut txn = store.transaction().await.unwrap();
        txn.execute("insert $a isa a;").await.unwrap();
        drop(txn);

        assert_eq!(std::fs::read_to_string(&path).unwrap(), "");
    }
}
