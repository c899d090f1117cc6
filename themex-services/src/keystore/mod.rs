// SPDX-License-Identifier: LGPL-3.0-only
//! Typed key/value stores with per-key change notification.
//!
//! A [KeyStore] holds a fixed set of keys, each with a string or boolean value.
//! Writing a key to the value it already holds is a no-op and notifies nobody;
//! synchronizers rely on this to stop write/notify cycles between stores.

pub mod gsettings;
mod gvariant;
pub mod memory;

pub use gsettings::GSettingsStore;
pub use memory::MemoryStore;

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};
use thiserror::Error;

/// A value held by a [KeyStore].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    /// A string value.
    String(String),
    /// A boolean value.
    Bool(bool),
}

/// The type of a [Value].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    /// String values.
    String,
    /// Boolean values.
    Bool,
}

impl Value {
    /// The type of this value.
    pub fn kind(&self) -> ValueKind {
        match self {
            Value::String(_) => ValueKind::String,
            Value::Bool(_) => ValueKind::Bool,
        }
    }

    /// The zero value of a type: empty string or `false`.
    pub fn zero(kind: ValueKind) -> Self {
        match kind {
            ValueKind::String => Value::String(String::new()),
            ValueKind::Bool => Value::Bool(false),
        }
    }

    /// Borrow the string, if this is a string value.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            Value::Bool(_) => None,
        }
    }

    /// Get the boolean, if this is a boolean value.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            Value::String(_) => None,
        }
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::String(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::String(value)
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::String(s) => write!(f, "{:?}", s),
            Value::Bool(b) => write!(f, "{}", b),
        }
    }
}

/// Errors raised by key stores.
#[derive(Error, Debug)]
pub enum StoreError {
    /// The key is not part of the store's schema. This is a programming error.
    #[error("Unknown key '{key}' in store '{store}'")]
    UnknownKey {
        /// Name of the store.
        store: String,
        /// The key that was not found.
        key: String,
    },

    /// The value has the wrong type for the key.
    #[error("Key '{key}' holds {expected:?} values, got {found:?}")]
    TypeMismatch {
        /// The key being written.
        key: String,
        /// The type declared for the key.
        expected: ValueKind,
        /// The type of the rejected value.
        found: ValueKind,
    },

    /// The storage backend failed.
    #[error("Backend error in store '{store}': {details}")]
    Backend {
        /// Name of the store.
        store: String,
        /// Details about the failure.
        details: String,
    },

    /// A stored value could not be parsed.
    #[error("Failed to parse value for '{key}': {details}")]
    Parse {
        /// The key whose value failed to parse.
        key: String,
        /// Details about the parse error.
        details: String,
    },

    /// Generic I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

impl StoreError {
    /// Create an unknown key error.
    pub fn unknown_key(store: impl Into<String>, key: impl Into<String>) -> Self {
        Self::UnknownKey {
            store: store.into(),
            key: key.into(),
        }
    }

    /// Create a backend error.
    pub fn backend(store: impl Into<String>, details: impl Into<String>) -> Self {
        Self::Backend {
            store: store.into(),
            details: details.into(),
        }
    }

    /// Create a parse error.
    pub fn parse(key: impl Into<String>, details: impl Into<String>) -> Self {
        Self::Parse {
            key: key.into(),
            details: details.into(),
        }
    }
}

/// Identifies the owner of a group of listeners, so they can be detached together.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Owner(u64);

impl Owner {
    /// Allocate a new, unique owner token.
    pub fn new() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        Self(NEXT.fetch_add(1, Ordering::Relaxed))
    }
}

impl Default for Owner {
    fn default() -> Self {
        Self::new()
    }
}

/// A change listener. Receives the key that changed.
pub type Callback = Rc<dyn Fn(&str) -> anyhow::Result<()>>;

/// Wrap a closure into a [Callback].
pub fn callback<F>(f: F) -> Callback
where
    F: Fn(&str) -> anyhow::Result<()> + 'static,
{
    Rc::new(f)
}

/// A typed key/value namespace with change notification.
///
/// Notifications are delivered synchronously from [KeyStore::set], in
/// registration order. A listener may write to any store, including this one.
pub trait KeyStore {
    /// Name of the store, used in logs and errors.
    fn name(&self) -> &str;

    /// The declared type of `key`, or [None] if the key is unknown.
    fn kind_of(&self, key: &str) -> Option<ValueKind>;

    /// Current value of `key`, or [None] if the key is unknown.
    fn get(&self, key: &str) -> Option<Value>;

    /// Write `value` to `key`.
    ///
    /// Returns `Ok(false)` without notifying if the key already holds `value`.
    fn set(&self, key: &str, value: Value) -> StoreResult<bool>;

    /// Register `callback` for changes of `key` on behalf of `owner`.
    fn connect(&self, key: &str, owner: Owner, callback: Callback) -> StoreResult<()>;

    /// Detach every listener registered by `owner`.
    fn detach_all(&self, owner: Owner);

    /// Returns true if `key` is part of this store.
    fn has_key(&self, key: &str) -> bool {
        self.kind_of(key).is_some()
    }

    /// Read a string key, defaulting to the empty string.
    fn get_string(&self, key: &str) -> String {
        match self.get(key) {
            Some(Value::String(s)) => s,
            _ => String::new(),
        }
    }

    /// Read a boolean key, defaulting to `false`.
    fn get_bool(&self, key: &str) -> bool {
        matches!(self.get(key), Some(Value::Bool(true)))
    }

    /// Write a string key.
    fn set_string(&self, key: &str, value: &str) -> StoreResult<bool> {
        self.set(key, Value::String(value.to_string()))
    }

    /// Write a boolean key.
    fn set_bool(&self, key: &str, value: bool) -> StoreResult<bool> {
        self.set(key, Value::Bool(value))
    }
}

struct Entry {
    key: String,
    owner: Owner,
    callback: Callback,
    alive: Rc<Cell<bool>>,
}

/// Listener registry shared by the store implementations.
#[derive(Default)]
pub struct Listeners {
    entries: RefCell<Vec<Entry>>,
}

impl Listeners {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a listener.
    pub fn add(&self, key: &str, owner: Owner, callback: Callback) {
        self.entries.borrow_mut().push(Entry {
            key: key.to_string(),
            owner,
            callback,
            alive: Rc::new(Cell::new(true)),
        });
    }

    /// Remove every listener of `owner`.
    ///
    /// Removed listeners never fire again, even from a dispatch already in progress.
    pub fn remove_owner(&self, owner: Owner) {
        self.entries.borrow_mut().retain(|entry| {
            if entry.owner == owner {
                entry.alive.set(false);
                false
            } else {
                true
            }
        });
    }

    /// Number of registered listeners.
    pub fn len(&self) -> usize {
        self.entries.borrow().len()
    }

    /// Returns true if no listener is registered.
    pub fn is_empty(&self) -> bool {
        self.entries.borrow().is_empty()
    }

    /// Invoke every listener of `key`.
    ///
    /// A failing listener is logged and does not stop the others.
    pub fn emit(&self, store: &str, key: &str) {
        let snapshot: Vec<(Rc<Cell<bool>>, Callback)> = self
            .entries
            .borrow()
            .iter()
            .filter(|entry| entry.key == key)
            .map(|entry| (entry.alive.clone(), entry.callback.clone()))
            .collect();

        for (alive, callback) in snapshot {
            if !alive.get() {
                continue;
            }
            if let Err(e) = callback(key) {
                log::warn!("Listener for '{}' in {} failed: {:#}", key, store, e);
            }
        }
    }
}
