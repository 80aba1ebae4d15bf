use std::collections::HashMap;
use std::hash::Hash;

use crate::history::PlayEvent;

/// Play events grouped by key, remembering the order keys were first seen.
///
/// Iteration follows first-insertion order, and events within a key keep
/// their insertion order, so everything built from a bucket is deterministic.
#[derive(Debug, Clone)]
pub struct Bucket<K> {
    index: HashMap<K, usize>,
    entries: Vec<(K, Vec<PlayEvent>)>,
}

impl<K> Default for Bucket<K> {
    fn default() -> Self {
        Self {
            index: HashMap::new(),
            entries: Vec::new(),
        }
    }
}

impl<K: Eq + Hash + Clone> Bucket<K> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, key: K, event: PlayEvent) {
        match self.index.get(&key) {
            Some(&i) => self.entries[i].1.push(event),
            None => {
                self.index.insert(key.clone(), self.entries.len());
                self.entries.push((key, vec![event]));
            }
        }
    }

    pub fn get(&self, key: &K) -> Option<&[PlayEvent]> {
        self.index.get(key).map(|&i| self.entries[i].1.as_slice())
    }

    pub fn contains_key(&self, key: &K) -> bool {
        self.index.contains_key(key)
    }

    /// Number of distinct keys.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of events across all keys.
    pub fn total_events(&self) -> usize {
        self.entries.iter().map(|(_, events)| events.len()).sum()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&K, &[PlayEvent])> {
        self.entries.iter().map(|(k, events)| (k, events.as_slice()))
    }

    pub fn keys(&self) -> impl Iterator<Item = &K> {
        self.entries.iter().map(|(k, _)| k)
    }

    /// A new bucket holding only the keys that satisfy `pred`, in the same order.
    pub fn retain_keys(&self, mut pred: impl FnMut(&K) -> bool) -> Self {
        let mut out = Self::new();
        for (key, events) in self.iter().filter(|(k, _)| pred(k)) {
            for event in events {
                out.push(key.clone(), event.clone());
            }
        }
        out
    }
}
