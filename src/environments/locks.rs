use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

/// Lock table serializing mutating operations on the same slug.
///
/// Operations on distinct slugs never contend beyond the brief table lookup.
#[derive(Debug, Default)]
pub struct SlugLocks {
    table: Mutex<HashMap<String, Arc<AsyncMutex<()>>>>,
}

impl SlugLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive access to `slug`; released when the guard drops.
    pub async fn acquire(&self, slug: &str) -> OwnedMutexGuard<()> {
        let lock = {
            let mut table = self.table.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
            // Entries referenced only by the table are idle.
            table.retain(|key, lock| key == slug || Arc::strong_count(lock) > 1);
            table
                .entry(slug.to_string())
                .or_insert_with(|| Arc::new(AsyncMutex::new(())))
                .clone()
        };
        lock.lock_owned().await
    }

    /// Number of slugs currently tracked.
    pub fn len(&self) -> usize {
        self.table
            .lock()
            .map(|table| table.len())
            .unwrap_or_default()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
