use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;

use super::{SessionStore, StorageError, StorageResult, StoreKey};

/// In-process session store.
///
/// Clones share the same records, so one clone can be handed to a
/// `SessionManager` while another observes what it persisted. A "restart"
/// is simulated by building a new manager over another clone.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    records: Rc<RefCell<HashMap<StoreKey, String>>>,
    quota_bytes: Option<usize>,
    disabled: Rc<Cell<bool>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Limit the total size of stored values, like a browser storage quota.
    pub fn with_quota(mut self, bytes: usize) -> Self {
        self.quota_bytes = Some(bytes);
        self
    }

    /// Make every operation fail with `StorageError::Disabled`.
    pub fn set_disabled(&self, disabled: bool) {
        self.disabled.set(disabled);
    }

    pub fn len(&self) -> usize {
        self.records.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.borrow().is_empty()
    }

    fn check_enabled(&self) -> StorageResult<()> {
        if self.disabled.get() {
            Err(StorageError::Disabled)
        } else {
            Ok(())
        }
    }
}

impl SessionStore for MemoryStore {
    fn read(&self, key: StoreKey) -> StorageResult<Option<String>> {
        self.check_enabled()?;
        Ok(self.records.borrow().get(&key).cloned())
    }

    fn write(&mut self, key: StoreKey, value: &str) -> StorageResult<()> {
        self.check_enabled()?;

        if let Some(quota) = self.quota_bytes {
            let others: usize = self
                .records
                .borrow()
                .iter()
                .filter(|(k, _)| **k != key)
                .map(|(_, v)| v.len())
                .sum();
            if others + value.len() > quota {
                return Err(StorageError::QuotaExceeded {
                    key,
                    bytes: value.len(),
                });
            }
        }

        self.records.borrow_mut().insert(key, value.to_string());
        Ok(())
    }

    fn clear(&mut self, key: StoreKey) -> StorageResult<()> {
        self.check_enabled()?;
        self.records.borrow_mut().remove(&key);
        Ok(())
    }
}
