use indexmap::IndexMap;
use std::fmt;
use std::hash::{Hash, Hasher};

use super::{AtomicValue, Value};
use crate::collation::Collation;

/// An association from atomic keys to values, insertion-ordered.
///
/// Keys are unique under the map's collation: string keys are folded through
/// [`Collation::key`] on insertion, so `map:keys` reports the folded form for
/// non-codepoint collations. All mutators are copy-on-write and return a new
/// map; the receiver is never modified.
#[derive(Debug, Clone)]
pub struct ValueMap<N> {
    entries: IndexMap<AtomicValue, Value<N>>,
    collation: Collation,
}

impl<N: Clone> ValueMap<N> {
    pub fn new() -> Self {
        Self::with_collation(Collation::Codepoint)
    }

    pub fn with_collation(collation: Collation) -> Self {
        Self {
            entries: IndexMap::new(),
            collation,
        }
    }

    pub fn from_entries(entries: Vec<(AtomicValue, Value<N>)>) -> Self {
        let mut map = Self::new();
        for (key, value) in entries {
            map.insert(key, value);
        }
        map
    }

    pub fn collation(&self) -> Collation {
        self.collation
    }

    fn fold_key(&self, key: AtomicValue) -> AtomicValue {
        match key {
            AtomicValue::String(s) => AtomicValue::String(self.collation.key(&s)),
            AtomicValue::UntypedAtomic(s) => AtomicValue::UntypedAtomic(self.collation.key(&s)),
            other => other,
        }
    }

    /// In-place insertion, for construction only; the public mutation
    /// surface is [`ValueMap::put`].
    pub(crate) fn insert(&mut self, key: AtomicValue, value: Value<N>) {
        let key = self.fold_key(key);
        self.entries.insert(key, value);
    }

    pub fn get(&self, key: &AtomicValue) -> Option<&Value<N>> {
        self.entries.get(&self.fold_key(key.clone()))
    }

    pub fn contains_key(&self, key: &AtomicValue) -> bool {
        self.entries.contains_key(&self.fold_key(key.clone()))
    }

    /// Returns a new map with the entry added. Inserting an existing key
    /// overwrites its value.
    pub fn put(&self, key: AtomicValue, value: Value<N>) -> Self {
        let mut new_map = self.clone();
        new_map.insert(key, value);
        new_map
    }

    /// Returns a new map without the given key.
    pub fn remove(&self, key: &AtomicValue) -> Self {
        let mut new_map = self.clone();
        new_map.entries.shift_remove(&self.fold_key(key.clone()));
        new_map
    }

    pub fn keys(&self) -> impl Iterator<Item = &AtomicValue> {
        self.entries.keys()
    }

    pub fn values(&self) -> impl Iterator<Item = &Value<N>> {
        self.entries.values()
    }

    pub fn entries(&self) -> impl Iterator<Item = (&AtomicValue, &Value<N>)> {
        self.entries.iter()
    }

    pub fn size(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<N: Clone> Default for ValueMap<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<N: PartialEq + Clone> PartialEq for ValueMap<N> {
    fn eq(&self, other: &Self) -> bool {
        if self.entries.len() != other.entries.len() {
            return false;
        }
        self.entries
            .iter()
            .all(|(k, v)| other.entries.get(k).is_some_and(|other_v| v == other_v))
    }
}

impl<N: Eq + Clone> Eq for ValueMap<N> {}

impl<N: Hash + Clone> Hash for ValueMap<N> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.entries.len().hash(state);
        for (key, value) in &self.entries {
            key.hash(state);
            value.hash(state);
        }
    }
}

impl<N: fmt::Debug + Clone> fmt::Display for ValueMap<N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "map {{ ")?;
        for (i, (k, v)) in self.entries.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}: {:?}", k, v)?;
        }
        write!(f, " }}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(s: &str) -> AtomicValue {
        AtomicValue::String(s.to_string())
    }

    #[test]
    fn put_is_copy_on_write() {
        let original: ValueMap<()> = ValueMap::new();
        let with_a = original.put(key("a"), Value::from_integer(1));

        assert!(original.is_empty());
        assert_eq!(with_a.size(), 1);
        assert_eq!(with_a.get(&key("a")), Some(&Value::from_integer(1)));
    }

    #[test]
    fn put_overwrites_existing_key() {
        let map: ValueMap<()> =
            ValueMap::from_entries(vec![(key("a"), Value::from_integer(1))]);
        let map = map.put(key("a"), Value::from_integer(2));
        assert_eq!(map.size(), 1);
        assert_eq!(map.get(&key("a")), Some(&Value::from_integer(2)));
    }

    #[test]
    fn remove_is_copy_on_write() {
        let map: ValueMap<()> = ValueMap::from_entries(vec![
            (key("a"), Value::from_integer(1)),
            (key("b"), Value::from_integer(2)),
        ]);
        let smaller = map.remove(&key("a"));
        assert_eq!(map.size(), 2);
        assert_eq!(smaller.size(), 1);
        assert!(!smaller.contains_key(&key("a")));
    }

    #[test]
    fn collation_folds_string_keys() {
        let map: ValueMap<()> = ValueMap::with_collation(Collation::CaseBlind);
        let map = map.put(key("Alpha"), Value::from_integer(1));
        let map = map.put(key("ALPHA"), Value::from_integer(2));

        assert_eq!(map.size(), 1);
        assert_eq!(map.get(&key("alpha")), Some(&Value::from_integer(2)));
    }

    #[test]
    fn integer_keys_are_untouched_by_collation() {
        let map: ValueMap<()> = ValueMap::with_collation(Collation::CaseBlind);
        let map = map.put(AtomicValue::Integer(3), Value::from_string("x"));
        assert!(map.contains_key(&AtomicValue::Integer(3)));
    }

    #[test]
    fn equality_compares_values() {
        let m1: ValueMap<()> = ValueMap::from_entries(vec![(key("a"), Value::from_integer(1))]);
        let m2: ValueMap<()> = ValueMap::from_entries(vec![(key("a"), Value::from_integer(1))]);
        let m3: ValueMap<()> = ValueMap::from_entries(vec![(key("a"), Value::from_integer(9))]);
        assert_eq!(m1, m2);
        assert_ne!(m1, m3);
    }
}
