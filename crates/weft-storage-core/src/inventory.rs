//! Engine-owned cache of existence/mtime facts, fed opportunistically by
//! storage objects to spare redundant remote round-trips.

use std::collections::HashMap;

/// Sink for facts a storage object happens to know already.
pub trait InventoryCache {
    fn record_exists(&mut self, query: &str, exists: bool);
    fn record_mtime(&mut self, query: &str, mtime: f64);
    fn record_size(&mut self, query: &str, size: u64);
}

/// In-memory inventory, used by tests and small runs.
#[derive(Debug, Default)]
pub struct MemoryInventory {
    pub exists: HashMap<String, bool>,
    pub mtime: HashMap<String, f64>,
    pub size: HashMap<String, u64>,
}

impl InventoryCache for MemoryInventory {
    fn record_exists(&mut self, query: &str, exists: bool) {
        self.exists.insert(query.to_string(), exists);
    }

    fn record_mtime(&mut self, query: &str, mtime: f64) {
        self.mtime.insert(query.to_string(), mtime);
    }

    fn record_size(&mut self, query: &str, size: u64) {
        self.size.insert(query.to_string(), size);
    }
}
