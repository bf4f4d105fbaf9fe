//! # CLOCK Eviction
//!
//! A circular vector of key slots with a reference bit each and a rotating
//! hand. Accesses set the bit; the hand clears bits as it sweeps and evicts
//! the first slot found with the bit clear. Deleted keys leave holes that
//! the sweep skips and later inserts reuse.

use std::fmt;

use hashbrown::HashMap;

struct Slot {
    key: String,
    referenced: bool,
}

#[derive(Default)]
pub struct ClockPolicy {
    slots: Vec<Option<Slot>>,
    index: HashMap<String, usize>,
    holes: Vec<usize>,
    hand: usize,
}

impl ClockPolicy {
    pub fn new() -> Self {
        Self::default()
    }

    /// Places the key in a reusable hole if one exists, otherwise appends.
    pub fn on_insert(&mut self, key: &str) {
        let slot = Slot {
            key: key.to_string(),
            referenced: false,
        };

        let idx = match self.holes.pop() {
            Some(hole) => {
                self.slots[hole] = Some(slot);
                hole
            }
            None => {
                self.slots.push(Some(slot));
                self.slots.len() - 1
            }
        };
        self.index.insert(key.to_string(), idx);
    }

    pub fn on_access(&mut self, key: &str) {
        let idx = self.handle(key);
        if let Some(slot) = self.slots[idx].as_mut() {
            slot.referenced = true;
        }
    }

    pub fn on_remove(&mut self, key: &str) {
        let idx = self
            .index
            .remove(key)
            .unwrap_or_else(|| panic!("clock: key '{key}' missing from policy state"));
        self.slots[idx] = None;
        self.holes.push(idx);
    }

    /// Sweeps from the hand: holes are skipped, referenced slots get their
    /// bit cleared and a second chance, and the first unreferenced slot is
    /// the victim. The hand advances past the victim.
    pub fn pick_victim(&mut self) -> Option<String> {
        if self.index.is_empty() {
            return None;
        }

        loop {
            let idx = self.hand % self.slots.len();
            self.hand = idx + 1;

            match self.slots[idx].as_mut() {
                None => continue,
                Some(slot) if slot.referenced => {
                    slot.referenced = false;
                }
                Some(slot) => return Some(slot.key.clone()),
            }
        }
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.index.contains_key(key)
    }

    pub fn keys(&self) -> Vec<String> {
        self.slots
            .iter()
            .flatten()
            .map(|slot| slot.key.clone())
            .collect()
    }

    fn handle(&self, key: &str) -> usize {
        *self
            .index
            .get(key)
            .unwrap_or_else(|| panic!("clock: key '{key}' missing from policy state"))
    }
}

impl fmt::Debug for ClockPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClockPolicy")
            .field("slots", &self.slots.len())
            .field("live", &self.index.len())
            .field("hand", &self.hand)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn victim_is_first_unreferenced_slot() {
        let mut clock = ClockPolicy::new();
        clock.on_insert("a");
        clock.on_insert("b");
        clock.on_insert("c");

        assert_eq!(clock.pick_victim(), Some("a".to_string()));
    }

    #[test]
    fn referenced_slot_gets_second_chance() {
        let mut clock = ClockPolicy::new();
        clock.on_insert("a");
        clock.on_insert("b");

        clock.on_access("a");

        assert_eq!(clock.pick_victim(), Some("b".to_string()));
    }

    #[test]
    fn hand_advances_past_victim() {
        let mut clock = ClockPolicy::new();
        clock.on_insert("a");
        clock.on_insert("b");
        clock.on_insert("c");

        assert_eq!(clock.pick_victim(), Some("a".to_string()));
        clock.on_remove("a");

        assert_eq!(clock.pick_victim(), Some("b".to_string()));
    }

    #[test]
    fn holes_are_skipped() {
        let mut clock = ClockPolicy::new();
        clock.on_insert("a");
        clock.on_insert("b");
        clock.on_insert("c");
        clock.on_remove("b");

        assert_eq!(clock.pick_victim(), Some("a".to_string()));
        clock.on_remove("a");

        assert_eq!(clock.pick_victim(), Some("c".to_string()));
    }

    #[test]
    fn holes_are_reused_by_inserts() {
        let mut clock = ClockPolicy::new();
        clock.on_insert("a");
        clock.on_insert("b");
        clock.on_remove("a");

        clock.on_insert("c");

        assert_eq!(clock.len(), 2);
        // c took a's slot, so the sweep meets it first
        assert_eq!(clock.pick_victim(), Some("c".to_string()));
    }

    #[test]
    fn all_referenced_clears_bits_then_evicts() {
        let mut clock = ClockPolicy::new();
        clock.on_insert("a");
        clock.on_insert("b");
        clock.on_access("a");
        clock.on_access("b");

        assert_eq!(clock.pick_victim(), Some("a".to_string()));
    }

    #[test]
    fn empty_policy_has_no_victim() {
        let mut clock = ClockPolicy::new();

        assert_eq!(clock.pick_victim(), None);
    }
}
