use std::collections::BTreeMap;

/// A map from key to a small set of values, used to index addresses by their
/// normalized (name, number) key.
///
/// Values are unique within a key. The backing map is a `BTreeMap` so key
/// iteration is deterministic; within a key, insertion order is preserved
/// (removals shift rather than swap) so tie-breaks are reproducible too.
#[derive(Debug, Clone)]
pub struct MultiIndex<V> {
    map: BTreeMap<String, Vec<V>>,
    len: usize,
}

impl<V: PartialEq> MultiIndex<V> {
    pub fn new() -> Self {
        MultiIndex {
            map: BTreeMap::new(),
            len: 0,
        }
    }

    /// Add a value under a key. Returns false (and changes nothing) when the
    /// value is already present under that key.
    pub fn insert(&mut self, key: impl Into<String>, value: V) -> bool {
        let bucket = self.map.entry(key.into()).or_default();
        if bucket.contains(&value) {
            return false;
        }
        bucket.push(value);
        self.len += 1;
        true
    }

    /// Remove one value from a key's bucket. Returns whether it was present.
    pub fn remove_value(&mut self, key: &str, value: &V) -> bool {
        let Some(bucket) = self.map.get_mut(key) else {
            return false;
        };
        let Some(pos) = bucket.iter().position(|v| v == value) else {
            return false;
        };
        bucket.remove(pos);
        self.len -= 1;
        if bucket.is_empty() {
            self.map.remove(key);
        }
        true
    }

    /// Drop a key and everything under it. Returns the number of values
    /// removed.
    pub fn remove_key(&mut self, key: &str) -> usize {
        match self.map.remove(key) {
            Some(bucket) => {
                self.len -= bucket.len();
                bucket.len()
            }
            None => 0,
        }
    }

    /// The values under a key; empty for unknown keys, never absent.
    pub fn get(&self, key: &str) -> &[V] {
        self.map.get(key).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.map.contains_key(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.map.keys()
    }

    /// The union of all values, deduplicated by equality. A value inserted
    /// under several keys is yielded once, at its first position.
    pub fn values(&self) -> impl Iterator<Item = &V> {
        let mut seen: Vec<&V> = Vec::new();
        self.map.values().flatten().filter(move |v| {
            if seen.contains(v) {
                return false;
            }
            seen.push(*v);
            true
        })
    }

    /// Running element count; always equals the sum of bucket sizes.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Union another index into this one through the duplicate-checked
    /// insert path.
    pub fn merge(&mut self, other: MultiIndex<V>) {
        for (key, bucket) in other.map {
            for value in bucket {
                self.insert(key.clone(), value);
            }
        }
    }
}

impl<V: PartialEq> Default for MultiIndex<V> {
    fn default() -> Self {
        Self::new()
    }
}
