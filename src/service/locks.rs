//! Per-database write locks
//!
//! Every mutation is a read-modify-write of whole table files. Holding the
//! database's lock for the full sequence keeps concurrent writers to the
//! same database from losing each other's updates.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

/// Registry of one async mutex per database name
#[derive(Debug, Default)]
pub struct DatabaseLocks {
    locks: Mutex<HashMap<String, Arc<AsyncMutex<()>>>>,
}

impl DatabaseLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive access to the database called `name`
    pub async fn lock(&self, name: &str) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
            // Only the map holds these, so no task is waiting on them.
            locks.retain(|_, lock| Arc::strong_count(lock) > 1);
            locks.entry(name.to_string()).or_default().clone()
        };
        lock.lock_owned().await
    }

    /// Number of databases with a held or awaited lock
    pub fn active(&self) -> usize {
        self.locks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .filter(|lock| Arc::strong_count(lock) > 1)
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_same_name_is_exclusive() {
        let locks = Arc::new(DatabaseLocks::new());
        let guard = locks.lock("shop").await;

        let waiter = {
            let locks = locks.clone();
            tokio::spawn(async move {
                let _guard = locks.lock("shop").await;
            })
        };

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!waiter.is_finished());

        drop(guard);
        waiter.await.unwrap();
    }

    #[tokio::test]
    async fn test_different_names_do_not_block() {
        let locks = DatabaseLocks::new();
        let _shop = locks.lock("shop").await;
        let _library = locks.lock("library").await;
        assert_eq!(locks.active(), 2);
    }

    #[tokio::test]
    async fn test_released_locks_are_pruned() {
        let locks = DatabaseLocks::new();
        drop(locks.lock("a").await);
        drop(locks.lock("b").await);
        assert_eq!(locks.active(), 0);
        assert!(locks.locks.lock().unwrap().len() <= 1);
    }
}
