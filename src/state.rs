//! Per-run orchestration state: a string-keyed bag of dynamically typed values.

use std::any::{self, Any};
use std::collections::HashMap;
use std::sync::Mutex;

/// Failure modes of [`StateBag`] operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StateError {
    #[error("state key '{0}' already exists; use update() or replace() to modify it")]
    DuplicateKey(String),
    #[error("state key '{0}' does not exist; use set() first")]
    KeyNotFound(String),
    #[error("state key '{key}' holds {found}, expected {expected}")]
    TypeMismatch {
        key: String,
        found: &'static str,
        expected: &'static str,
    },
    #[error("refusing to store callable value of type {type_name} under state key '{key}'")]
    InvalidValue {
        key: String,
        type_name: &'static str,
    },
}

struct Entry {
    value: Box<dyn Any + Send>,
    type_name: &'static str,
}

/// Typed key/value store scoped to one orchestration run.
///
/// Values are stored type-erased and checked at read time; a `get` or
/// `update` with the wrong type fails with [`StateError::TypeMismatch`]
/// rather than returning garbage. Every write rejects callable values
/// (closures, `fn` pointers, boxed `Fn` objects) so step wiring cannot leak
/// into durable-looking state.
///
/// Operations lock a per-bag mutex, so sub-steps of a parallel group may
/// share one bag without data races. The lock covers single operations only:
/// parallel branches writing overlapping keys still race logically, and key
/// disjointness across branches is the caller's responsibility.
#[derive(Default)]
pub struct StateBag {
    entries: Mutex<HashMap<String, Entry>>,
}

impl StateBag {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a new entry. Fails with `DuplicateKey` if the key is taken.
    pub fn set<T: Any + Send>(&self, key: &str, value: T) -> Result<(), StateError> {
        guard_callable::<T>(key)?;
        let mut entries = self.entries.lock().unwrap();
        if entries.contains_key(key) {
            return Err(StateError::DuplicateKey(key.to_string()));
        }
        entries.insert(key.to_string(), Entry::of(value));
        Ok(())
    }

    /// Mutate an existing entry in place through `updater`.
    ///
    /// Fails with `KeyNotFound` when the key is absent and `TypeMismatch`
    /// when the stored value is not a `T`.
    pub fn update<T, F>(&self, key: &str, updater: F) -> Result<(), StateError>
    where
        T: Any + Send,
        F: FnOnce(&mut T),
    {
        let mut entries = self.entries.lock().unwrap();
        let entry = entries
            .get_mut(key)
            .ok_or_else(|| StateError::KeyNotFound(key.to_string()))?;
        match entry.value.downcast_mut::<T>() {
            Some(value) => {
                updater(value);
                Ok(())
            }
            None => Err(StateError::TypeMismatch {
                key: key.to_string(),
                found: entry.type_name,
                expected: any::type_name::<T>(),
            }),
        }
    }

    /// Unconditional upsert.
    pub fn replace<T: Any + Send>(&self, key: &str, value: T) -> Result<(), StateError> {
        guard_callable::<T>(key)?;
        self.entries
            .lock()
            .unwrap()
            .insert(key.to_string(), Entry::of(value));
        Ok(())
    }

    /// Clone out the value stored under `key`.
    pub fn get<T: Any + Clone>(&self, key: &str) -> Result<T, StateError> {
        let entries = self.entries.lock().unwrap();
        let entry = entries
            .get(key)
            .ok_or_else(|| StateError::KeyNotFound(key.to_string()))?;
        entry
            .value
            .downcast_ref::<T>()
            .cloned()
            .ok_or(StateError::TypeMismatch {
                key: key.to_string(),
                found: entry.type_name,
                expected: any::type_name::<T>(),
            })
    }

    /// Remove an entry; no-op when the key is absent.
    pub fn remove(&self, key: &str) {
        self.entries.lock().unwrap().remove(key);
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.lock().unwrap().contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().unwrap().is_empty()
    }
}

impl Entry {
    fn of<T: Any + Send>(value: T) -> Self {
        Entry {
            value: Box::new(value),
            type_name: any::type_name::<T>(),
        }
    }
}

// Best-effort detection of callable types by their rendered name. Closures
// render as `path::{{closure}}`, fn pointers as `fn(..) -> ..`, and boxed
// trait objects spell out `dyn ... Fn...`.
fn guard_callable<T: ?Sized>(key: &str) -> Result<(), StateError> {
    let name = any::type_name::<T>();
    let callable = name.contains("{{closure}}")
        || name.starts_with("fn(")
        || (name.contains("dyn ") && name.contains("::Fn"));
    if callable {
        return Err(StateError::InvalidValue {
            key: key.to_string(),
            type_name: name,
        });
    }
    Ok(())
}
