//! Multi-valued index from a key to an insertion-ordered set of values.
//!
//! Serves as the live dependency graph (node -> edges reading it) and as the
//! per-plan edges-by-sink and pending-pull tables. Insertion order is kept so
//! iteration, and therefore scheduling, is deterministic.

use std::collections::HashMap;
use std::hash::Hash;

use indexmap::IndexSet;

#[derive(Debug, Clone)]
pub struct SetMap<K, V> {
    map: HashMap<K, IndexSet<V>>,
}

impl<K, V> SetMap<K, V>
where
    K: Eq + Hash,
    V: Eq + Hash,
{
    pub fn new() -> Self {
        Self {
            map: HashMap::new(),
        }
    }

    /// Add `value` under `key`. Returns `false` if it was already present.
    pub fn insert(&mut self, key: K, value: V) -> bool {
        self.map.entry(key).or_default().insert(value)
    }

    pub fn get(&self, key: &K) -> Option<&IndexSet<V>> {
        self.map.get(key)
    }

    pub fn contains_key(&self, key: &K) -> bool {
        self.map.contains_key(key)
    }

    /// Remove one value, dropping the key when its set becomes empty.
    pub fn remove(&mut self, key: &K, value: &V) -> bool {
        let Some(set) = self.map.get_mut(key) else {
            return false;
        };
        let removed = set.shift_remove(value);
        if set.is_empty() {
            self.map.remove(key);
        }
        removed
    }

    /// Number of keys.
    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    pub fn clear(&mut self) {
        self.map.clear();
    }
}

impl<K, V> Default for SetMap<K, V>
where
    K: Eq + Hash,
    V: Eq + Hash,
{
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keeps_insertion_order() {
        let mut map = SetMap::new();
        map.insert("a", 3);
        map.insert("a", 1);
        map.insert("a", 2);

        let values: Vec<_> = map.get(&"a").into_iter().flatten().copied().collect();
        assert_eq!(values, vec![3, 1, 2]);
    }

    #[test]
    fn deduplicates_values() {
        let mut map = SetMap::new();
        assert!(map.insert(1, "x"));
        assert!(!map.insert(1, "x"));
        assert_eq!(map.get(&1).map(|s| s.len()), Some(1));
    }

    #[test]
    fn remove_drops_empty_keys() {
        let mut map = SetMap::new();
        map.insert(1, 10);
        map.insert(1, 11);

        assert!(map.remove(&1, &10));
        assert!(map.contains_key(&1));
        assert!(map.remove(&1, &11));
        assert!(!map.contains_key(&1));
        assert!(!map.remove(&1, &11));
    }

    #[test]
    fn clear_drops_every_key() {
        let mut map: SetMap<u8, u8> = SetMap::new();
        map.insert(5, 1);
        map.insert(6, 1);
        assert_eq!(map.len(), 2);
        map.clear();
        assert!(map.is_empty());
    }
}
