//! Mutual exclusion for read-modify-write on the ledger.
//!
//! Lock order is always: barrier, then item, then sections. Item operations
//! hold the barrier shared; imports hold it exclusively so no item write
//! interleaves with a wholesale replacement.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, RwLock, RwLockReadGuard, RwLockWriteGuard};

use kennel_core::ItemId;

use crate::store::StoreError;

#[derive(Debug, Default)]
pub struct ItemLocks {
    barrier: RwLock<()>,
    items: Mutex<HashMap<ItemId, Arc<Mutex<()>>>>,
    sections: Mutex<()>,
}

impl ItemLocks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn shared(&self) -> Result<RwLockReadGuard<'_, ()>, StoreError> {
        self.barrier.read().map_err(|_| StoreError::Poisoned)
    }

    pub fn exclusive(&self) -> Result<RwLockWriteGuard<'_, ()>, StoreError> {
        self.barrier.write().map_err(|_| StoreError::Poisoned)
    }

    /// A lease on the mutex guarding one item; lock it for the duration of a
    /// mutation. The entry is dropped with the last outstanding lease.
    pub fn item(&self, item_id: ItemId) -> Result<ItemLease<'_>, StoreError> {
        let mut items = self.items.lock().map_err(|_| StoreError::Poisoned)?;
        let handle = items.entry(item_id).or_default().clone();
        Ok(ItemLease {
            locks: self,
            item_id,
            handle,
        })
    }

    /// Number of items that currently have a lock entry.
    pub fn tracked(&self) -> usize {
        self.items.lock().map(|items| items.len()).unwrap_or(0)
    }

    /// Guards the shared sections (settings, presets, reorders, alert gate).
    pub fn sections(&self) -> Result<MutexGuard<'_, ()>, StoreError> {
        self.sections.lock().map_err(|_| StoreError::Poisoned)
    }
}

#[derive(Debug)]
pub struct ItemLease<'a> {
    locks: &'a ItemLocks,
    item_id: ItemId,
    handle: Arc<Mutex<()>>,
}

impl ItemLease<'_> {
    pub fn lock(&self) -> Result<MutexGuard<'_, ()>, StoreError> {
        self.handle.lock().map_err(|_| StoreError::Poisoned)
    }
}

impl Drop for ItemLease<'_> {
    fn drop(&mut self) {
        // Leases are only cloned under the map lock, so a count of two (map
        // plus this lease) means nobody else is waiting on the item.
        if let Ok(mut items) = self.locks.items.lock() {
            if Arc::strong_count(&self.handle) == 2 {
                items.remove(&self.item_id);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_item_shares_one_mutex() {
        let locks = ItemLocks::new();
        let id = ItemId::new();
        let a = locks.item(id).unwrap();
        let b = locks.item(id).unwrap();
        assert!(Arc::ptr_eq(&a.handle, &b.handle));
        let other = locks.item(ItemId::new()).unwrap();
        assert!(!Arc::ptr_eq(&a.handle, &other.handle));
        assert_eq!(locks.tracked(), 2);
    }

    #[test]
    fn entry_is_dropped_with_last_lease() {
        let locks = ItemLocks::new();
        let id = ItemId::new();
        let first = locks.item(id).unwrap();
        let second = locks.item(id).unwrap();

        drop(first);
        assert_eq!(locks.tracked(), 1);
        {
            let _guard = second.lock().unwrap();
        }
        drop(second);
        assert_eq!(locks.tracked(), 0);
    }

    #[test]
    fn a_waiting_lease_keeps_the_entry() {
        let locks = Arc::new(ItemLocks::new());
        let id = ItemId::new();
        let lease = locks.item(id).unwrap();
        let guard = lease.lock().unwrap();

        let waiter = {
            let locks = Arc::clone(&locks);
            std::thread::spawn(move || {
                let lease = locks.item(id).unwrap();
                let _guard = lease.lock().unwrap();
            })
        };
        while Arc::strong_count(&lease.handle) < 3 {
            std::thread::yield_now();
        }
        drop(guard);
        drop(lease);
        waiter.join().unwrap();
        assert_eq!(locks.tracked(), 0);
    }
}
