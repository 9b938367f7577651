//! Persistence seam for committed batches

use std::collections::BTreeSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use crate::errors::{ExError, ExErrorKind};
use crate::ops::ModelStore;

/// Projects touched by one committed batch
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PersistBatch {
    /// Projects to write, as found in the staged model
    pub saved: BTreeSet<String>,
    /// Projects to remove from storage
    pub removed: BTreeSet<String>,
}

impl PersistBatch {
    pub fn is_empty(&self) -> bool {
        self.saved.is_empty() && self.removed.is_empty()
    }
}

/// Writes the projects of a batch all-or-nothing
pub trait ProjectPersister: Send + Sync {
    /// Persist `batch`, reading project contents from `model`
    ///
    /// # Errors
    ///
    /// Returns `Persistence` or `Io` errors; storage must be unchanged then.
    #[allow(clippy::result_large_err)]
    fn persist(&self, batch: &PersistBatch, model: &ModelStore) -> Result<(), ExError>;
}

/// Keeps the model in memory only
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopPersister;

impl ProjectPersister for NoopPersister {
    #[allow(clippy::result_large_err)]
    fn persist(&self, _: &PersistBatch, _: &ModelStore) -> Result<(), ExError> {
        Ok(())
    }
}

/// Records every batch it is asked to persist
///
/// Can be switched to fail, to exercise rollback after validation.
#[derive(Debug, Default)]
pub struct MemoryPersister {
    batches: Mutex<Vec<PersistBatch>>,
    failing: AtomicBool,
}

impl MemoryPersister {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn batches(&self) -> Vec<PersistBatch> {
        self.batches
            .lock()
            .map(|b| b.clone())
            .unwrap_or_default()
    }
}

impl ProjectPersister for MemoryPersister {
    #[allow(clippy::result_large_err)]
    fn persist(&self, batch: &PersistBatch, _: &ModelStore) -> Result<(), ExError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(ExError::new(ExErrorKind::Persistence)
                .with_op("persist")
                .with_message("memory persister set to fail"));
        }
        self.batches
            .lock()
            .map_err(|_| {
                ExError::new(ExErrorKind::Internal)
                    .with_op("persist")
                    .with_message("batch log poisoned")
            })?
            .push(batch.clone());
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_persister_records_and_fails() {
        let persister = MemoryPersister::new();
        let model = ModelStore::new();
        let batch = PersistBatch {
            saved: BTreeSet::from(["A".to_string()]),
            removed: BTreeSet::new(),
        };
        persister.persist(&batch, &model).unwrap();
        persister.set_failing(true);
        let err = persister.persist(&batch, &model).unwrap_err();
        assert_eq!(err.kind(), ExErrorKind::Persistence);
        assert_eq!(persister.batches(), vec![batch]);
    }

    #[test]
    fn test_noop_persister() {
        assert!(NoopPersister
            .persist(&PersistBatch::default(), &ModelStore::new())
            .is_ok());
        assert!(PersistBatch::default().is_empty());
    }
}
