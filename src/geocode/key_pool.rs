//! Round-robin API key selection.

use std::sync::atomic::{AtomicUsize, Ordering};

/// A fixed set of API keys handed out in rotation.
///
/// Shared by reference between concurrent lookups; the cursor is atomic so
/// no lock is needed.
#[derive(Debug, Default)]
pub struct KeyPool {
    keys: Vec<String>,
    cursor: AtomicUsize,
}

impl KeyPool {
    pub fn new(keys: impl IntoIterator<Item = String>) -> Self {
        let keys = keys
            .into_iter()
            .map(|k| k.trim().to_string())
            .filter(|k| !k.is_empty())
            .collect();
        Self {
            keys,
            cursor: AtomicUsize::new(0),
        }
    }

    /// Parse a comma-separated key list.
    pub fn from_csv(csv: &str) -> Self {
        Self::new(csv.split(',').map(str::to_string))
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    /// Next key in rotation, or `None` for an empty pool.
    pub fn next_key(&self) -> Option<&str> {
        if self.keys.is_empty() {
            return None;
        }
        let i = self.cursor.fetch_add(1, Ordering::Relaxed) % self.keys.len();
        Some(&self.keys[i])
    }
}
