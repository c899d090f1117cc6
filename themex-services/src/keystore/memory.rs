// SPDX-License-Identifier: LGPL-3.0-only
//! In-memory [KeyStore] with a fixed schema.

use std::cell::RefCell;

use indexmap::IndexMap;

use super::{Callback, KeyStore, Listeners, Owner, StoreError, StoreResult, Value, ValueKind};

/// A [KeyStore] that keeps its values in memory.
///
/// Used directly in tests and as the value cache of the persistent backends.
pub struct MemoryStore {
    name: String,
    values: RefCell<IndexMap<String, Value>>,
    listeners: Listeners,
}

impl MemoryStore {
    /// Create a store whose schema is given by the initial value of every key.
    pub fn new<'a>(name: impl Into<String>, schema: impl IntoIterator<Item = (&'a str, Value)>) -> Self {
        let values = schema
            .into_iter()
            .map(|(key, value)| (key.to_string(), value))
            .collect();
        Self {
            name: name.into(),
            values: RefCell::new(values),
            listeners: Listeners::new(),
        }
    }

    /// Keys of the schema, in declaration order.
    pub fn keys(&self) -> Vec<String> {
        self.values.borrow().keys().cloned().collect()
    }

    /// Snapshot of every key and value.
    pub fn snapshot(&self) -> Vec<(String, Value)> {
        self.values
            .borrow()
            .iter()
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect()
    }

    /// Number of registered listeners.
    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    /// Store `value` without notifying. Returns true if the value changed.
    pub(crate) fn replace(&self, key: &str, value: Value) -> StoreResult<bool> {
        let mut values = self.values.borrow_mut();
        let slot = values
            .get_mut(key)
            .ok_or_else(|| StoreError::unknown_key(&self.name, key))?;

        if slot.kind() != value.kind() {
            return Err(StoreError::TypeMismatch {
                key: key.to_string(),
                expected: slot.kind(),
                found: value.kind(),
            });
        }
        if *slot == value {
            return Ok(false);
        }
        *slot = value;
        Ok(true)
    }

    /// Notify the listeners of `key`.
    pub(crate) fn notify(&self, key: &str) {
        self.listeners.emit(&self.name, key);
    }
}

impl KeyStore for MemoryStore {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind_of(&self, key: &str) -> Option<ValueKind> {
        self.values.borrow().get(key).map(Value::kind)
    }

    fn get(&self, key: &str) -> Option<Value> {
        self.values.borrow().get(key).cloned()
    }

    fn set(&self, key: &str, value: Value) -> StoreResult<bool> {
        if !self.replace(key, value)? {
            log::trace!("{}: '{}' unchanged, not notifying", self.name, key);
            return Ok(false);
        }
        self.notify(key);
        Ok(true)
    }

    fn connect(&self, key: &str, owner: Owner, callback: Callback) -> StoreResult<()> {
        if !self.has_key(key) {
            return Err(StoreError::unknown_key(&self.name, key));
        }
        self.listeners.add(key, owner, callback);
        Ok(())
    }

    fn detach_all(&self, owner: Owner) {
        self.listeners.remove_owner(owner);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keystore::callback;
    use std::cell::Cell;
    use std::rc::Rc;

    fn store() -> MemoryStore {
        MemoryStore::new(
            "test",
            [
                ("gtk", Value::from("Adwaita")),
                ("gtk-night", Value::from("Adwaita-dark")),
                ("night", Value::from(false)),
            ],
        )
    }

    fn count_changes(store: &MemoryStore, key: &str) -> Rc<Cell<usize>> {
        let hits = Rc::new(Cell::new(0));
        let counter = hits.clone();
        store
            .connect(
                key,
                Owner::new(),
                callback(move |_| {
                    counter.set(counter.get() + 1);
                    Ok(())
                }),
            )
            .unwrap();
        hits
    }

    #[test]
    fn test_writing_current_value_notifies_nobody() {
        let store = store();
        let hits: Vec<_> = store.keys().iter().map(|key| count_changes(&store, key)).collect();

        for key in store.keys() {
            let current = store.get(&key).unwrap();
            assert!(!store.set(&key, current).unwrap());
        }

        assert!(hits.iter().all(|hits| hits.get() == 0));
    }

    #[test]
    fn test_effective_write_notifies_once() {
        let store = store();
        let hits = count_changes(&store, "gtk");

        assert!(store.set_string("gtk", "Yaru").unwrap());
        assert!(!store.set_string("gtk", "Yaru").unwrap());
        assert_eq!(hits.get(), 1);
        assert_eq!(store.get_string("gtk"), "Yaru");
    }

    #[test]
    fn test_unknown_key_is_rejected() {
        let store = store();
        assert!(matches!(
            store.set_string("nope", "x"),
            Err(StoreError::UnknownKey { .. })
        ));
        assert!(store.connect("nope", Owner::new(), callback(|_| Ok(()))).is_err());
        assert_eq!(store.get_string("nope"), "");
        assert!(!store.get_bool("nope"));
    }

    #[test]
    fn test_type_mismatch_is_rejected() {
        let store = store();
        assert!(matches!(
            store.set_bool("gtk", true),
            Err(StoreError::TypeMismatch { .. })
        ));
        assert_eq!(store.get_string("gtk"), "Adwaita");
    }

    #[test]
    fn test_detach_all_removes_only_owner() {
        let store = store();
        let owner = Owner::new();
        store.connect("gtk", owner, callback(|_| Ok(()))).unwrap();
        store.connect("night", owner, callback(|_| Ok(()))).unwrap();
        let other = count_changes(&store, "gtk");
        assert_eq!(store.listener_count(), 3);

        store.detach_all(owner);
        assert_eq!(store.listener_count(), 1);
        store.set_string("gtk", "Yaru").unwrap();
        assert_eq!(other.get(), 1);
    }

    #[test]
    fn test_listener_may_write_back_to_same_store() {
        let store = Rc::new(store());
        let weak = Rc::downgrade(&store);
        store
            .connect(
                "gtk",
                Owner::new(),
                callback(move |key| {
                    if let Some(store) = weak.upgrade() {
                        let value = store.get_string(key);
                        store.set_string("gtk-night", &format!("{}-dark", value))?;
                    }
                    Ok(())
                }),
            )
            .unwrap();

        store.set_string("gtk", "Yaru").unwrap();
        assert_eq!(store.get_string("gtk-night"), "Yaru-dark");
    }
}
