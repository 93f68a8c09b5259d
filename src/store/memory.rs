//! In-process lot store for tests and embedding.

use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use tokio::sync::Mutex;

use super::{LotStore, Revision, StoreError, Table, VersionedTable};

#[derive(Debug, Default)]
pub struct MemoryLotStore {
    inner: Mutex<(Table, u64)>,
    unavailable: AtomicBool,
    writes: AtomicUsize,
}

impl MemoryLotStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_table(table: Table) -> Self {
        Self {
            inner: Mutex::new((table, 0)),
            ..Self::default()
        }
    }

    /// Make every subsequent read and write fail with `Unavailable`.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Number of successful writes so far.
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    fn check_available(&self) -> Result<(), StoreError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("memory store offline".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl LotStore for MemoryLotStore {
    async fn read_all(&self) -> Result<VersionedTable, StoreError> {
        self.check_available()?;
        let guard = self.inner.lock().await;
        Ok(VersionedTable {
            table: guard.0.clone(),
            revision: Revision::new(guard.1.to_string()),
        })
    }

    async fn write_all(&self, table: &Table, expected: &Revision) -> Result<Revision, StoreError> {
        self.check_available()?;
        let mut guard = self.inner.lock().await;
        let current = Revision::new(guard.1.to_string());
        if &current != expected {
            return Err(StoreError::Conflict {
                expected: expected.clone(),
                actual: current,
            });
        }
        guard.0 = table.clone();
        guard.1 += 1;
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(Revision::new(guard.1.to_string()))
    }
}
