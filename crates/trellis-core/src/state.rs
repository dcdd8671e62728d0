//! Detachable component state.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use crate::collections::map::HashMap;

/// State captured from a released layout tree so the next tree built for the
/// same item starts where the old one left off.
///
/// Values are keyed by the component key that owns them. The bundle is cheap
/// to clone: values are shared, not copied.
#[derive(Clone, Default)]
pub struct StateSnapshot {
    values: HashMap<String, Arc<dyn Any + Send + Sync>>,
}

impl StateSnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores `value` under `key`, replacing any previous value.
    pub fn put<T: Any + Send + Sync>(&mut self, key: impl Into<String>, value: T) {
        self.values.insert(key.into(), Arc::new(value));
    }

    /// Returns the value under `key` if it has type `T`.
    pub fn get<T: Any + Send + Sync>(&self, key: &str) -> Option<&T> {
        self.values
            .get(key)
            .and_then(|value| value.downcast_ref::<T>())
    }

    pub fn contains(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    pub fn remove(&mut self, key: &str) -> bool {
        self.values.remove(key).is_some()
    }

    /// Copies every entry of `other` into `self`; entries of `other` win.
    pub fn merge(&mut self, other: &StateSnapshot) {
        for (key, value) in &other.values {
            self.values.insert(key.clone(), Arc::clone(value));
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl fmt::Debug for StateSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut keys: Vec<&str> = self.values.keys().map(String::as_str).collect();
        keys.sort_unstable();
        f.debug_struct("StateSnapshot").field("keys", &keys).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_put_and_get_typed_value() {
        let mut snapshot = StateSnapshot::new();
        snapshot.put("counter", 3i32);
        assert_eq!(snapshot.get::<i32>("counter"), Some(&3));
        assert_eq!(snapshot.get::<u32>("counter"), None);
        assert!(snapshot.contains("counter"));
    }

    #[test]
    fn test_clone_shares_values() {
        let mut snapshot = StateSnapshot::new();
        snapshot.put("text", String::from("hello"));
        let copy = snapshot.clone();
        snapshot.put("text", String::from("changed"));
        assert_eq!(copy.get::<String>("text").map(String::as_str), Some("hello"));
    }

    #[test]
    fn test_merge_overwrites_existing_keys() {
        let mut base = StateSnapshot::new();
        base.put("a", 1u8);
        base.put("b", 2u8);
        let mut update = StateSnapshot::new();
        update.put("b", 20u8);
        base.merge(&update);
        assert_eq!(base.get::<u8>("a"), Some(&1));
        assert_eq!(base.get::<u8>("b"), Some(&20));
        assert_eq!(base.len(), 2);
    }

    #[test]
    fn test_remove() {
        let mut snapshot = StateSnapshot::new();
        snapshot.put("a", ());
        assert!(snapshot.remove("a"));
        assert!(!snapshot.remove("a"));
        assert!(snapshot.is_empty());
    }
}
