//! Bounded per-Worker LRU result cache (spec.md §4.5).
//!
//! Keyed by `(func_id, positional_args, default_args)`; an intrusive
//! doubly-linked list threaded through a slab gives O(1) `get`/`put`
//! moves without requiring unsafe code, in the spirit of the teacher's
//! hand-rolled data structures (e.g. `casparian_worker::type_inference`'s
//! arena-indexed trees) rather than reaching for an external LRU crate.

use serde::Serialize;
use std::collections::HashMap;
use std::hash::Hash;

type NodeIndex = usize;

struct Node<K, V> {
    key: K,
    value: V,
    prev: Option<NodeIndex>,
    next: Option<NodeIndex>,
}

/// A bounded LRU cache. `max_size == 0` makes every operation a no-op
/// (spec.md §4.5, §8 boundary behavior).
pub struct LruCache<K, V> {
    max_size: usize,
    nodes: Vec<Option<Node<K, V>>>,
    index: HashMap<K, NodeIndex>,
    head: Option<NodeIndex>, // most-recently-used
    tail: Option<NodeIndex>, // least-recently-used
    free_list: Vec<NodeIndex>,
}

impl<K: Clone + Eq + Hash, V: Clone> LruCache<K, V> {
    pub fn new(max_size: usize) -> Self {
        Self {
            max_size,
            nodes: Vec::new(),
            index: HashMap::new(),
            head: None,
            tail: None,
            free_list: Vec::new(),
        }
    }

    pub fn max_size(&self) -> usize {
        self.max_size
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// O(1): does the key have a cached entry?
    pub fn check(&self, key: &K) -> bool {
        if self.max_size == 0 {
            return false;
        }
        self.index.contains_key(key)
    }

    /// O(1): fetch the value, promoting the entry to most-recently-used.
    pub fn get(&mut self, key: &K) -> Option<V> {
        if self.max_size == 0 {
            return None;
        }
        let idx = *self.index.get(key)?;
        self.detach(idx);
        self.push_front(idx);
        self.nodes[idx].as_ref().map(|n| n.value.clone())
    }

    /// O(1): insert a new key. Evicts the LRU tail if at capacity.
    /// Caller must `check` first: re-inserting an existing key is a
    /// programmer error (spec.md §4.5).
    pub fn put(&mut self, key: K, value: V) {
        if self.max_size == 0 {
            return;
        }
        debug_assert!(
            !self.index.contains_key(&key),
            "LruCache::put called with a key already present; caller must check() first"
        );

        if self.index.len() >= self.max_size {
            self.evict_tail();
        }

        let idx = self.alloc(Node {
            key: key.clone(),
            value,
            prev: None,
            next: None,
        });
        self.index.insert(key, idx);
        self.push_front(idx);
    }

    /// Enumerate all entries, most-recently-used first (spec.md §4.5
    /// `dump`, used for `get_cache_dump`).
    pub fn dump(&self) -> Vec<(K, V)> {
        let mut out = Vec::with_capacity(self.index.len());
        let mut cur = self.head;
        while let Some(idx) = cur {
            let node = self.nodes[idx].as_ref().expect("dangling LRU index");
            out.push((node.key.clone(), node.value.clone()));
            cur = node.next;
        }
        out
    }

    fn alloc(&mut self, node: Node<K, V>) -> NodeIndex {
        if let Some(idx) = self.free_list.pop() {
            self.nodes[idx] = Some(node);
            idx
        } else {
            self.nodes.push(Some(node));
            self.nodes.len() - 1
        }
    }

    fn detach(&mut self, idx: NodeIndex) {
        let (prev, next) = {
            let node = self.nodes[idx].as_ref().expect("dangling LRU index");
            (node.prev, node.next)
        };
        match prev {
            Some(p) => self.nodes[p].as_mut().unwrap().next = next,
            None => self.head = next,
        }
        match next {
            Some(n) => self.nodes[n].as_mut().unwrap().prev = prev,
            None => self.tail = prev,
        }
    }

    fn push_front(&mut self, idx: NodeIndex) {
        let node = self.nodes[idx].as_mut().expect("dangling LRU index");
        node.prev = None;
        node.next = self.head;
        if let Some(h) = self.head {
            self.nodes[h].as_mut().unwrap().prev = Some(idx);
        }
        self.head = Some(idx);
        if self.tail.is_none() {
            self.tail = Some(idx);
        }
    }

    fn evict_tail(&mut self) {
        let Some(idx) = self.tail else { return };
        self.detach(idx);
        let node = self.nodes[idx].take().expect("dangling LRU index");
        self.index.remove(&node.key);
        self.free_list.push(idx);
    }
}

/// Key type for the cache: `(func_id, positional_tuple, frozen_defaults)`
/// (spec.md §3). `default_args` is canonicalized by `BTreeMap`'s sorted
/// iteration order, serialized to a string so the whole key is `Hash`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct CacheKey {
    pub func_id: String,
    pub positional: Vec<String>,
    pub defaults: String,
}

impl CacheKey {
    pub fn new(
        func_id: &str,
        positional_args: &[faas_protocol::ArgValue],
        default_args: &std::collections::BTreeMap<String, faas_protocol::ArgValue>,
    ) -> Self {
        Self {
            func_id: func_id.to_string(),
            positional: positional_args
                .iter()
                .map(|v| serde_json::to_string(v).unwrap_or_default())
                .collect(),
            defaults: serde_json::to_string(default_args).unwrap_or_default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn check_get_put_round_trip() {
        let mut cache: LruCache<&str, i32> = LruCache::new(2);
        assert!(!cache.check(&"a"));
        cache.put("a", 1);
        assert!(cache.check(&"a"));
        assert_eq!(cache.get(&"a"), Some(1));
    }

    #[test]
    fn evicts_least_recently_used_on_overflow() {
        let mut cache: LruCache<&str, i32> = LruCache::new(2);
        cache.put("a", 1);
        cache.put("b", 2);
        // touch "a" so "b" becomes LRU
        assert_eq!(cache.get(&"a"), Some(1));
        cache.put("c", 3);
        assert!(!cache.check(&"b"));
        assert!(cache.check(&"a"));
        assert!(cache.check(&"c"));
    }

    #[test]
    fn get_of_missing_key_does_not_evict() {
        let mut cache: LruCache<&str, i32> = LruCache::new(2);
        cache.put("a", 1);
        cache.put("b", 2);
        assert_eq!(cache.get(&"missing"), None);
        assert!(cache.check(&"a"));
        assert!(cache.check(&"b"));
    }

    #[test]
    fn max_size_zero_is_a_total_no_op() {
        let mut cache: LruCache<&str, i32> = LruCache::new(0);
        cache.put("a", 1);
        assert!(!cache.check(&"a"));
        assert_eq!(cache.get(&"a"), None);
        assert_eq!(cache.len(), 0);
    }

    #[test]
    fn dump_lists_entries_most_recently_used_first() {
        let mut cache: LruCache<&str, i32> = LruCache::new(3);
        cache.put("a", 1);
        cache.put("b", 2);
        cache.put("c", 3);
        let dumped: Vec<&str> = cache.dump().into_iter().map(|(k, _)| k).collect();
        assert_eq!(dumped, vec!["c", "b", "a"]);
    }

    #[test]
    fn cache_key_distinguishes_by_func_id_args_and_defaults() {
        let a = CacheKey::new("f1", &[faas_protocol::ArgValue::Int(1)], &Default::default());
        let b = CacheKey::new("f2", &[faas_protocol::ArgValue::Int(1)], &Default::default());
        assert_ne!(a, b);
    }
}
