//! Order-preserving name → object maps.
//!
//! Handed out by the catalog so that iteration order of session-local
//! registries follows catalog-wide conventions: names come back in the
//! order they were first inserted.

use indexmap::IndexMap;

#[derive(Debug, Clone)]
pub struct NameMap<V> {
    inner: IndexMap<String, V>,
}

impl<V> NameMap<V> {
    pub fn new() -> Self {
        Self {
            inner: IndexMap::new(),
        }
    }

    pub fn get(&self, name: &str) -> Option<&V> {
        self.inner.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.inner.contains_key(name)
    }

    pub fn insert(&mut self, name: &str, value: V) -> Option<V> {
        self.inner.insert(name.to_owned(), value)
    }

    /// Remove an entry, preserving the order of the remaining ones.
    pub fn remove(&mut self, name: &str) -> Option<V> {
        self.inner.shift_remove(name)
    }

    /// Keep only the entries the predicate accepts.
    pub fn retain<F>(&mut self, keep: F)
    where
        F: FnMut(&String, &mut V) -> bool,
    {
        self.inner.retain(keep);
    }

    /// Names in insertion order.
    pub fn names(&self) -> Vec<String> {
        self.inner.keys().cloned().collect()
    }

    pub fn values(&self) -> impl Iterator<Item = &V> {
        self.inner.values()
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

impl<V> Default for NameMap<V> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_insertion_order_preserved() {
        let mut map = NameMap::new();
        map.insert("c", 3);
        map.insert("a", 1);
        map.insert("b", 2);

        assert_eq!(map.names(), vec!["c", "a", "b"]);

        map.remove("a");
        assert_eq!(map.names(), vec!["c", "b"]);
    }

    #[test]
    fn test_insert_returns_old_value() {
        let mut map = NameMap::new();
        assert_eq!(map.insert("x", 1), None);
        assert_eq!(map.insert("x", 2), Some(1));
        assert_eq!(map.get("x"), Some(&2));
        assert_eq!(map.len(), 1);
    }
}
