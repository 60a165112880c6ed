//! Ledger storage.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::path::PathBuf;
use tokio::fs;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::LedgerError;
use crate::record::StateRecord;

/// Ledger storage trait.
///
/// `append` must be atomic: a crash before it returns leaves either the whole
/// record or nothing observable on recovery.
#[async_trait]
pub trait LedgerStore: Send + Sync {
    /// Append a record.
    async fn append(&self, record: &StateRecord) -> Result<(), LedgerError>;

    /// Load all records for an execution, ordered by sequence number.
    async fn load(&self, execution_id: &Uuid) -> Result<Vec<StateRecord>, LedgerError>;

    /// Load all records committed in a time range, across executions.
    async fn scan(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<StateRecord>, LedgerError>;

    /// List all execution ids present in the store.
    async fn executions(&self) -> Result<Vec<Uuid>, LedgerError>;
}

/// In-memory ledger store for testing and ephemeral runs.
pub struct MemoryLedgerStore {
    records: tokio::sync::RwLock<std::collections::HashMap<Uuid, Vec<StateRecord>>>,
}

impl MemoryLedgerStore {
    /// Create a new memory store.
    pub fn new() -> Self {
        Self {
            records: tokio::sync::RwLock::new(std::collections::HashMap::new()),
        }
    }
}

impl Default for MemoryLedgerStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LedgerStore for MemoryLedgerStore {
    async fn append(&self, record: &StateRecord) -> Result<(), LedgerError> {
        let mut store = self.records.write().await;
        store
            .entry(record.execution_id)
            .or_default()
            .push(record.clone());
        Ok(())
    }

    async fn load(&self, execution_id: &Uuid) -> Result<Vec<StateRecord>, LedgerError> {
        let store = self.records.read().await;
        let mut records = store.get(execution_id).cloned().unwrap_or_default();
        records.sort_by_key(|r| r.sequence_no);
        Ok(records)
    }

    async fn scan(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<StateRecord>, LedgerError> {
        let store = self.records.read().await;
        let mut records: Vec<StateRecord> = store
            .values()
            .flatten()
            .filter(|r| r.recorded_at >= from && r.recorded_at < to)
            .cloned()
            .collect();
        records.sort_by_key(|r| r.recorded_at);
        Ok(records)
    }

    async fn executions(&self) -> Result<Vec<Uuid>, LedgerError> {
        let store = self.records.read().await;
        Ok(store.keys().copied().collect())
    }
}

/// File system based ledger store.
///
/// Records are stored as individual JSON files organized by execution:
/// ```text
/// {storage_path}/
/// └── ledger/
///     └── {execution_id}/
///         ├── 0000000000.json
///         ├── 0000000001.json
///         └── ...
/// ```
///
/// Each append writes a temporary file and renames it into place, so a crash
/// mid-write never leaves a partial record.
pub struct FileLedgerStore {
    /// Base storage path.
    storage_path: PathBuf,
}

impl FileLedgerStore {
    /// Create a new file-based ledger store.
    pub async fn new(storage_path: impl Into<PathBuf>) -> Result<Self, LedgerError> {
        let storage_path = storage_path.into();
        let ledger_dir = storage_path.join("ledger");

        fs::create_dir_all(&ledger_dir).await?;

        debug!("FileLedgerStore initialized at {:?}", storage_path);

        Ok(Self { storage_path })
    }

    fn ledger_dir(&self) -> PathBuf {
        self.storage_path.join("ledger")
    }

    fn execution_dir(&self, execution_id: &Uuid) -> PathBuf {
        self.ledger_dir().join(execution_id.to_string())
    }

    fn record_path(&self, execution_id: &Uuid, sequence_no: u64) -> PathBuf {
        self.execution_dir(execution_id)
            .join(format!("{:010}.json", sequence_no))
    }

    /// Read all records in one execution directory, skipping unreadable
    /// files with a warning.
    async fn read_execution_records(
        &self,
        execution_id: &Uuid,
    ) -> Result<Vec<StateRecord>, LedgerError> {
        let dir = self.execution_dir(execution_id);

        if !dir.exists() {
            return Ok(Vec::new());
        }

        let mut records = Vec::new();
        let mut entries = fs::read_dir(&dir).await?;

        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().is_some_and(|ext| ext == "json") {
                match fs::read_to_string(&path).await {
                    Ok(content) => match serde_json::from_str::<StateRecord>(&content) {
                        Ok(record) => records.push(record),
                        Err(e) => {
                            warn!("Failed to deserialize record from {:?}: {}", path, e);
                        }
                    },
                    Err(e) => {
                        warn!("Failed to read record file {:?}: {}", path, e);
                    }
                }
            }
        }

        records.sort_by_key(|r| r.sequence_no);
        Ok(records)
    }
}

#[async_trait]
impl LedgerStore for FileLedgerStore {
    async fn append(&self, record: &StateRecord) -> Result<(), LedgerError> {
        let dir = self.execution_dir(&record.execution_id);
        fs::create_dir_all(&dir).await?;

        let path = self.record_path(&record.execution_id, record.sequence_no);
        let tmp_path = path.with_extension("json.tmp");

        let content = serde_json::to_string_pretty(record).map_err(|e| {
            LedgerError::Serialization(format!("Failed to serialize record: {}", e))
        })?;

        // Write-then-rename keeps the append atomic on the same filesystem.
        fs::write(&tmp_path, content).await?;
        fs::rename(&tmp_path, &path).await?;

        debug!(
            "Committed record {} for execution {} to {:?}",
            record.sequence_no, record.execution_id, path
        );
        Ok(())
    }

    async fn load(&self, execution_id: &Uuid) -> Result<Vec<StateRecord>, LedgerError> {
        self.read_execution_records(execution_id).await
    }

    async fn scan(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<StateRecord>, LedgerError> {
        let mut records = Vec::new();
        for execution_id in self.executions().await? {
            let all = self.read_execution_records(&execution_id).await?;
            records.extend(
                all.into_iter()
                    .filter(|r| r.recorded_at >= from && r.recorded_at < to),
            );
        }
        records.sort_by_key(|r| r.recorded_at);
        Ok(records)
    }

    async fn executions(&self) -> Result<Vec<Uuid>, LedgerError> {
        let ledger_dir = self.ledger_dir();

        if !ledger_dir.exists() {
            return Ok(Vec::new());
        }

        let mut ids = Vec::new();
        let mut entries = fs::read_dir(&ledger_dir).await?;

        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if !path.is_dir() {
                continue;
            }
            if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
                match Uuid::parse_str(name) {
                    Ok(id) => ids.push(id),
                    Err(_) => warn!("Ignoring non-execution directory {:?}", path),
                }
            }
        }

        Ok(ids)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{ExecutionState, TransitionProposal};
    use tempfile::TempDir;

    fn record(execution_id: Uuid, seq: u64, state: ExecutionState) -> StateRecord {
        let prior = if seq == 0 {
            None
        } else {
            Some(ExecutionState::Running)
        };
        TransitionProposal::new(execution_id, seq, prior, state, "test").into_record()
    }

    #[tokio::test]
    async fn test_memory_store_append_load() {
        let store = MemoryLedgerStore::new();
        let id = Uuid::new_v4();

        store
            .append(&record(id, 0, ExecutionState::Pending))
            .await
            .unwrap();
        store
            .append(&record(id, 1, ExecutionState::Running))
            .await
            .unwrap();

        let records = store.load(&id).await.unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].sequence_no, 0);
        assert_eq!(records[1].sequence_no, 1);
    }

    #[tokio::test]
    async fn test_file_store_append_load() {
        let temp_dir = TempDir::new().unwrap();
        let store = FileLedgerStore::new(temp_dir.path()).await.unwrap();
        let id = Uuid::new_v4();

        // Append out of order; load must come back sorted.
        store
            .append(&record(id, 1, ExecutionState::Running))
            .await
            .unwrap();
        store
            .append(&record(id, 0, ExecutionState::Pending))
            .await
            .unwrap();

        let records = store.load(&id).await.unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].sequence_no, 0);
        assert_eq!(records[1].sequence_no, 1);
    }

    #[tokio::test]
    async fn test_file_store_no_partial_record() {
        let temp_dir = TempDir::new().unwrap();
        let store = FileLedgerStore::new(temp_dir.path()).await.unwrap();
        let id = Uuid::new_v4();

        store
            .append(&record(id, 0, ExecutionState::Pending))
            .await
            .unwrap();

        // A leftover temp file from an interrupted write is never visible.
        let stray = store.record_path(&id, 1).with_extension("json.tmp");
        fs::write(&stray, "{\"partial\":").await.unwrap();

        let records = store.load(&id).await.unwrap();
        assert_eq!(records.len(), 1);
    }

    #[tokio::test]
    async fn test_file_store_executions_and_scan() {
        let temp_dir = TempDir::new().unwrap();
        let store = FileLedgerStore::new(temp_dir.path()).await.unwrap();
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();

        store
            .append(&record(a, 0, ExecutionState::Pending))
            .await
            .unwrap();
        store
            .append(&record(b, 0, ExecutionState::Pending))
            .await
            .unwrap();

        let mut ids = store.executions().await.unwrap();
        ids.sort();
        let mut expected = vec![a, b];
        expected.sort();
        assert_eq!(ids, expected);

        let now = Utc::now();
        let scanned = store
            .scan(now - chrono::Duration::minutes(1), now + chrono::Duration::minutes(1))
            .await
            .unwrap();
        assert_eq!(scanned.len(), 2);

        let nothing = store
            .scan(now + chrono::Duration::hours(1), now + chrono::Duration::hours(2))
            .await
            .unwrap();
        assert!(nothing.is_empty());
    }

    #[tokio::test]
    async fn test_load_unknown_execution() {
        let store = MemoryLedgerStore::new();
        let records = store.load(&Uuid::new_v4()).await.unwrap();
        assert!(records.is_empty());
    }
}
