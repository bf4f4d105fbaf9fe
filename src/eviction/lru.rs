//! # LRU Eviction
//!
//! Keys ordered from most to least recently used. Accesses move the key to
//! the front in O(1) via the handle kept in the key map; the victim is
//! always the tail.

use hashbrown::HashMap;

use super::list::KeyList;

#[derive(Debug, Default)]
pub struct LruPolicy {
    order: KeyList,
    handles: HashMap<String, usize>,
}

impl LruPolicy {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_insert(&mut self, key: &str) {
        let idx = self.order.push_front(key.to_string());
        self.handles.insert(key.to_string(), idx);
    }

    pub fn on_access(&mut self, key: &str) {
        let idx = self.handle(key);
        self.order.move_to_front(idx);
    }

    pub fn on_remove(&mut self, key: &str) {
        let idx = self
            .handles
            .remove(key)
            .unwrap_or_else(|| panic!("lru: key '{key}' missing from policy state"));
        self.order.remove(idx);
    }

    pub fn pick_victim(&mut self) -> Option<String> {
        self.order.tail().map(|idx| self.order.key(idx).to_string())
    }

    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.handles.contains_key(key)
    }

    pub fn keys(&self) -> Vec<String> {
        self.order.keys_front_to_back()
    }

    fn handle(&self, key: &str) -> usize {
        *self
            .handles
            .get(key)
            .unwrap_or_else(|| panic!("lru: key '{key}' missing from policy state"))
    }
}
