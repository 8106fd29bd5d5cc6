//! Persisted best score
//!
//! Loaded once from the key/value store at startup and written back only
//! when beaten.

use crate::persistence::KeyValueStore;

pub struct BestScore {
    key: String,
    best: u64,
    store: Box<dyn KeyValueStore>,
}

impl BestScore {
    /// Read the stored best under `key` (0 when absent)
    pub fn load(store: Box<dyn KeyValueStore>, key: impl Into<String>) -> Self {
        let key = key.into();
        let best = store.get_int(&key, 0).max(0) as u64;
        log::info!("Best score {} (key {})", best, key);
        Self { key, best, store }
    }

    #[inline]
    pub fn best(&self) -> u64 {
        self.best
    }

    /// Record `score`; returns true when it set a new best
    ///
    /// A failed write is logged; the in-memory best still updates.
    pub fn submit(&mut self, score: u64) -> bool {
        if score <= self.best {
            return false;
        }
        self.best = score;
        let stored = i64::try_from(score).unwrap_or(i64::MAX);
        if let Err(e) = self.store.set_int(&self.key, stored) {
            log::warn!("Could not persist best score: {}", e);
        }
        true
    }
}

impl std::fmt::Debug for BestScore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BestScore")
            .field("key", &self.key)
            .field("best", &self.best)
            .finish_non_exhaustive()
    }
}
