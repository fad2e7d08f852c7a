//! Process-wide slot holding the one shared record store.

use std::sync::{Arc, PoisonError, RwLock};

use tracing::{debug, info};

use crate::error::Result;

use super::record_store::RecordStore;

/// Builds the record store at most once and hands out shared references.
///
/// Readers only clone the `Arc` under a read lock. The first caller of
/// [`get_or_load`](Self::get_or_load) builds the store under the write lock;
/// concurrent callers wait and then reuse it.
#[derive(Debug, Default)]
pub struct StoreCell {
    slot: RwLock<Option<Arc<RecordStore>>>,
}

impl StoreCell {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a cell that already holds `store`.
    pub fn with_store(store: RecordStore) -> Self {
        Self {
            slot: RwLock::new(Some(Arc::new(store))),
        }
    }

    /// The loaded store, if any.
    pub fn get(&self) -> Option<Arc<RecordStore>> {
        self.slot
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn is_loaded(&self) -> bool {
        self.get().is_some()
    }

    /// Return the store, building it with `loader` if this is the first use.
    ///
    /// A failed load leaves the cell empty so a later call can retry.
    pub fn get_or_load<F>(&self, loader: F) -> Result<Arc<RecordStore>>
    where
        F: FnOnce() -> Result<RecordStore>,
    {
        if let Some(store) = self.get() {
            return Ok(store);
        }

        let mut slot = self.slot.write().unwrap_or_else(PoisonError::into_inner);
        if let Some(store) = slot.as_ref() {
            debug!("Record store loaded by a concurrent caller");
            return Ok(Arc::clone(store));
        }
        let store = Arc::new(loader()?);
        *slot = Some(Arc::clone(&store));
        Ok(store)
    }

    /// Replace the store unconditionally.
    ///
    /// Readers holding the old `Arc` keep a consistent view until they drop it.
    pub fn reload<F>(&self, loader: F) -> Result<Arc<RecordStore>>
    where
        F: FnOnce() -> Result<RecordStore>,
    {
        let store = Arc::new(loader()?);
        let mut slot = self.slot.write().unwrap_or_else(PoisonError::into_inner);
        *slot = Some(Arc::clone(&store));
        info!(messages = store.len(), "Record store replaced");
        Ok(store)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use crate::error::ChatError;

    #[test]
    fn test_loads_once() {
        let cell = StoreCell::new();
        let calls = AtomicUsize::new(0);
        for _ in 0..3 {
            cell.get_or_load(|| {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok(RecordStore::default())
            })
            .unwrap();
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(cell.is_loaded());
    }

    #[test]
    fn test_concurrent_first_use_loads_once() {
        let cell = Arc::new(StoreCell::new());
        let calls = Arc::new(AtomicUsize::new(0));
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let cell = Arc::clone(&cell);
                let calls = Arc::clone(&calls);
                std::thread::spawn(move || {
                    cell.get_or_load(|| {
                        calls.fetch_add(1, Ordering::SeqCst);
                        std::thread::sleep(std::time::Duration::from_millis(20));
                        Ok(RecordStore::default())
                    })
                    .unwrap()
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_failed_load_can_retry() {
        let cell = StoreCell::new();
        let err = cell
            .get_or_load(|| Err(ChatError::NotInitialized("boom".into())))
            .unwrap_err();
        assert!(matches!(err, ChatError::NotInitialized(_)));
        assert!(!cell.is_loaded());
        assert!(cell.get_or_load(|| Ok(RecordStore::default())).is_ok());
    }

    #[test]
    fn test_reload_replaces() {
        let cell = StoreCell::with_store(RecordStore::default());
        let first = cell.get().unwrap();
        let second = cell.reload(|| Ok(RecordStore::default())).unwrap();
        assert!(!Arc::ptr_eq(&first, &second));
        assert!(Arc::ptr_eq(&second, &cell.get().unwrap()));
    }
}
