//! Hash index implementation
//!
//! Vector-of-buckets table with per-bucket chains.

use std::fmt;

use super::{hash_name, DEFAULT_CAPACITY};

/// Callback run on every value the index drops (remove, clear, teardown)
pub type ReleaseHook<V> = Box<dyn FnMut(V) + Send + Sync>;

/// A single (name, value) node
struct Node<V> {
    name: Box<str>,
    value: V,
}

/// Case-insensitive chained hash index with a fixed bucket count
pub struct HashIndex<V> {
    /// One chain per bucket
    buckets: Vec<Vec<Node<V>>>,
    /// Number of live nodes across all chains
    len: usize,
    /// Optional destructor callback for values
    release: Option<ReleaseHook<V>>,
}

/// Position state for [`HashIndex::list`]
///
/// A fresh cursor starts at the first bucket. Reusing a cursor after the
/// index was mutated is allowed; it may then skip or repeat nodes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Cursor {
    bucket: usize,
    slot: usize,
}

impl Cursor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rewind to the first bucket
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

impl<V> HashIndex<V> {
    /// Create an index with `capacity` buckets (0 selects the default)
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = if capacity == 0 { DEFAULT_CAPACITY } else { capacity };
        let mut buckets = Vec::with_capacity(capacity);
        buckets.resize_with(capacity, Vec::new);
        Self {
            buckets,
            len: 0,
            release: None,
        }
    }

    /// Create an index whose dropped values are passed to `hook`
    pub fn with_release_hook(capacity: usize, hook: ReleaseHook<V>) -> Self {
        let mut index = Self::with_capacity(capacity);
        index.release = Some(hook);
        index
    }

    // =========================================================================
    // Lookups
    // =========================================================================

    /// Get a value by name (case-insensitive)
    pub fn get(&self, name: &str) -> Option<&V> {
        let bucket = &self.buckets[self.bucket_of(name)];
        bucket
            .iter()
            .find(|node| node.name.eq_ignore_ascii_case(name))
            .map(|node| &node.value)
    }

    /// Get a mutable value by name (case-insensitive)
    pub fn get_mut(&mut self, name: &str) -> Option<&mut V> {
        let idx = self.bucket_of(name);
        self.buckets[idx]
            .iter_mut()
            .find(|node| node.name.eq_ignore_ascii_case(name))
            .map(|node| &mut node.value)
    }

    /// Get the stored spelling of a name together with its value
    pub fn get_node(&self, name: &str) -> Option<(&str, &V)> {
        let bucket = &self.buckets[self.bucket_of(name)];
        bucket
            .iter()
            .find(|node| node.name.eq_ignore_ascii_case(name))
            .map(|node| (&*node.name, &node.value))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    // =========================================================================
    // Mutations
    // =========================================================================

    /// Insert a new node at the end of its bucket chain
    ///
    /// Returns `None` without touching the index when a node with the same
    /// name (ignoring ASCII case) already exists.
    pub fn add(&mut self, name: &str, value: V) -> Option<&mut V> {
        let idx = self.bucket_of(name);
        let chain = &mut self.buckets[idx];
        if chain.iter().any(|node| node.name.eq_ignore_ascii_case(name)) {
            return None;
        }

        chain.push(Node {
            name: name.into(),
            value,
        });
        self.len += 1;
        chain.last_mut().map(|node| &mut node.value)
    }

    /// Remove a node, running the release hook on its value
    pub fn remove(&mut self, name: &str) -> bool {
        match self.extract(name) {
            Some(node) => {
                self.release_value(node.value);
                true
            }
            None => false,
        }
    }

    /// Remove a node and hand its value back without running the hook
    pub fn take(&mut self, name: &str) -> Option<V> {
        self.extract(name).map(|node| node.value)
    }

    /// Move a node from `old_name` to `new_name`
    ///
    /// Fails (returns `None`, no mutation) when `new_name` already exists,
    /// including the case where both names differ only in case, or when
    /// `old_name` is unknown. The node is relinked at the end of the new
    /// bucket's chain.
    pub fn change_key(&mut self, old_name: &str, new_name: &str) -> Option<&mut V> {
        if self.contains(new_name) {
            return None;
        }

        let mut node = self.extract(old_name)?;
        node.name = new_name.into();

        let idx = self.bucket_of(new_name);
        let chain = &mut self.buckets[idx];
        chain.push(node);
        self.len += 1;
        chain.last_mut().map(|node| &mut node.value)
    }

    /// Drop every node (running the release hook), keeping the buckets
    pub fn clear(&mut self) {
        let mut release = self.release.take();
        for chain in &mut self.buckets {
            for node in chain.drain(..) {
                if let Some(hook) = release.as_mut() {
                    hook(node.value);
                }
            }
        }
        self.len = 0;
        self.release = release;
    }

    // =========================================================================
    // Traversal
    // =========================================================================

    /// Next node after `cursor`, advancing it
    ///
    /// Visits buckets in order and each chain front to back. Returns `None`
    /// once every bucket was visited; an empty index returns `None` at once.
    pub fn list(&self, cursor: &mut Cursor) -> Option<(&str, &V)> {
        while cursor.bucket < self.buckets.len() {
            if let Some(node) = self.buckets[cursor.bucket].get(cursor.slot) {
                cursor.slot += 1;
                return Some((&*node.name, &node.value));
            }
            cursor.bucket += 1;
            cursor.slot = 0;
        }
        None
    }

    /// Iterate every node in bucket order then chain order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &V)> + '_ {
        self.buckets
            .iter()
            .flat_map(|chain| chain.iter().map(|node| (&*node.name, &node.value)))
    }

    /// Iterate every value mutably (used for offset fixups)
    pub fn values_mut(&mut self) -> impl Iterator<Item = &mut V> + '_ {
        self.buckets
            .iter_mut()
            .flat_map(|chain| chain.iter_mut().map(|node| &mut node.value))
    }

    /// First node in traversal order
    pub fn first(&self) -> Option<(&str, &V)> {
        self.iter().next()
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn bucket_count(&self) -> usize {
        self.buckets.len()
    }

    // =========================================================================
    // Private Helpers
    // =========================================================================

    fn bucket_of(&self, name: &str) -> usize {
        hash_name(name) as usize % self.buckets.len()
    }

    /// Unlink a node from its chain
    fn extract(&mut self, name: &str) -> Option<Node<V>> {
        let idx = self.bucket_of(name);
        let chain = &mut self.buckets[idx];
        let pos = chain
            .iter()
            .position(|node| node.name.eq_ignore_ascii_case(name))?;
        self.len -= 1;
        Some(chain.remove(pos))
    }

    fn release_value(&mut self, value: V) {
        if let Some(hook) = self.release.as_mut() {
            hook(value);
        }
    }
}

impl<V> Drop for HashIndex<V> {
    fn drop(&mut self) {
        if self.release.is_some() {
            self.clear();
        }
    }
}

impl<V: fmt::Debug> fmt::Debug for HashIndex<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use super::*;

    #[test]
    fn test_add_and_get() {
        let mut index = HashIndex::with_capacity(8);
        assert!(index.add("alpha", 1).is_some());
        assert!(index.add("beta", 2).is_some());

        assert_eq!(index.get("alpha"), Some(&1));
        assert_eq!(index.get("beta"), Some(&2));
        assert_eq!(index.get("gamma"), None);
        assert_eq!(index.len(), 2);
    }

    #[test]
    fn test_lookup_is_case_insensitive() {
        let mut index = HashIndex::with_capacity(8);
        index.add("Config", 7);

        assert_eq!(index.get("config"), Some(&7));
        assert_eq!(index.get("CONFIG"), Some(&7));
        assert_eq!(index.get_node("cOnFiG"), Some(("Config", &7)));
    }

    #[test]
    fn test_add_rejects_case_insensitive_duplicate() {
        let mut index = HashIndex::with_capacity(8);
        index.add("name", 1);

        assert!(index.add("NAME", 2).is_none());
        assert_eq!(index.get("name"), Some(&1));
        assert_eq!(index.len(), 1);
    }

    #[test]
    fn test_single_bucket_chaining() {
        // Every name collides
        let mut index = HashIndex::with_capacity(1);
        for (i, name) in ["a", "b", "c", "d"].iter().enumerate() {
            index.add(name, i);
        }

        assert_eq!(index.len(), 4);
        assert!(index.remove("b"));
        assert_eq!(index.get("a"), Some(&0));
        assert_eq!(index.get("b"), None);
        assert_eq!(index.get("c"), Some(&2));

        // Chain order is insertion order
        let names: Vec<&str> = index.iter().map(|(n, _)| n).collect();
        assert_eq!(names, vec!["a", "c", "d"]);
    }

    #[test]
    fn test_zero_capacity_uses_default() {
        let index: HashIndex<u8> = HashIndex::with_capacity(0);
        assert_eq!(index.bucket_count(), DEFAULT_CAPACITY);
    }

    #[test]
    fn test_remove_missing_returns_false() {
        let mut index: HashIndex<u8> = HashIndex::with_capacity(4);
        assert!(!index.remove("ghost"));
    }

    #[test]
    fn test_take_returns_value() {
        let mut index = HashIndex::with_capacity(4);
        index.add("k", String::from("v"));

        assert_eq!(index.take("K"), Some(String::from("v")));
        assert!(index.is_empty());
    }

    #[test]
    fn test_change_key_moves_node() {
        let mut index = HashIndex::with_capacity(8);
        index.add("old", 42);

        let value = index.change_key("old", "new").copied();
        assert_eq!(value, Some(42));
        assert_eq!(index.get("old"), None);
        assert_eq!(index.get("new"), Some(&42));
        assert_eq!(index.len(), 1);
    }

    #[test]
    fn test_change_key_rejects_existing_target() {
        let mut index = HashIndex::with_capacity(8);
        index.add("one", 1);
        index.add("two", 2);

        assert!(index.change_key("one", "TWO").is_none());
        assert_eq!(index.get("one"), Some(&1));
        assert_eq!(index.get("two"), Some(&2));
    }

    #[test]
    fn test_change_key_case_only_is_conflict() {
        let mut index = HashIndex::with_capacity(8);
        index.add("abc", 1);

        assert!(index.change_key("abc", "ABC").is_none());
        assert_eq!(index.get_node("abc"), Some(("abc", &1)));
    }

    #[test]
    fn test_change_key_unknown_old() {
        let mut index: HashIndex<u8> = HashIndex::with_capacity(8);
        assert!(index.change_key("missing", "other").is_none());
        assert!(index.is_empty());
    }

    #[test]
    fn test_list_cursor_visits_all() {
        let mut index = HashIndex::with_capacity(3);
        for i in 0..10 {
            index.add(&format!("key{}", i), i);
        }

        let mut cursor = Cursor::new();
        let mut seen = Vec::new();
        while let Some((_, value)) = index.list(&mut cursor) {
            seen.push(*value);
        }
        seen.sort_unstable();
        assert_eq!(seen, (0..10).collect::<Vec<_>>());

        // Exhausted cursor stays exhausted, reset restarts
        assert!(index.list(&mut cursor).is_none());
        cursor.reset();
        assert!(index.list(&mut cursor).is_some());
    }

    #[test]
    fn test_list_empty_index() {
        let index: HashIndex<u8> = HashIndex::with_capacity(4);
        let mut cursor = Cursor::new();
        assert!(index.list(&mut cursor).is_none());
        assert!(index.first().is_none());
    }

    #[test]
    fn test_values_mut_updates_in_place() {
        let mut index = HashIndex::with_capacity(4);
        index.add("a", 10);
        index.add("b", 20);

        for value in index.values_mut() {
            *value += 1;
        }

        assert_eq!(index.get("a"), Some(&11));
        assert_eq!(index.get("b"), Some(&21));
    }

    #[test]
    fn test_release_hook_runs_on_remove_clear_and_drop() {
        let released = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&released);
        let mut index: HashIndex<u32> = HashIndex::with_release_hook(
            4,
            Box::new(move |_value: u32| {
                counter.fetch_add(1, Ordering::SeqCst);
            }),
        );

        index.add("a", 1);
        index.add("b", 2);
        index.add("c", 3);
        index.add("d", 4);

        index.remove("a");
        assert_eq!(released.load(Ordering::SeqCst), 1);

        // take() hands ownership back instead
        assert_eq!(index.take("b"), Some(2));
        assert_eq!(released.load(Ordering::SeqCst), 1);

        index.clear();
        assert_eq!(released.load(Ordering::SeqCst), 3);
        assert!(index.is_empty());

        index.add("e", 5);
        drop(index);
        assert_eq!(released.load(Ordering::SeqCst), 4);
    }
}
