//! Process-wide typed key/value store.
//!
//! Every value sits behind one string key space. Reads name the expected
//! type and the store checks it on the way out, so a reader that disagrees
//! with the writer gets `TypeMismatch` instead of a bogus value. Well-known
//! entries should be declared once as [`Key`] tokens so writer and reader
//! share the type at compile time.

use std::any::{type_name, Any};
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use dashmap::DashMap;

use crate::error::{Result, SiloError};

/// Typed name for a store entry.
pub struct Key<T> {
    name: &'static str,
    _ty: PhantomData<fn() -> T>,
}

impl<T> Key<T> {
    pub const fn new(name: &'static str) -> Self {
        Self {
            name,
            _ty: PhantomData,
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }
}

impl<T> Clone for Key<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Key<T> {}

impl<T> fmt::Debug for Key<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Key")
            .field("name", &self.name)
            .field("type", &type_name::<T>())
            .finish()
    }
}

struct Slot {
    value: Arc<dyn Any + Send + Sync>,
    type_name: &'static str,
}

/// Shared handle to the store. Clones see the same entries.
#[derive(Clone, Default)]
pub struct DataStore {
    entries: Arc<DashMap<String, Slot>>,
}

impl DataStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `value` under `key`, replacing whatever was there.
    pub fn set<T: Any + Send + Sync>(&self, key: impl Into<String>, value: T) {
        self.set_shared(key, Arc::new(value));
    }

    /// Like [`DataStore::set`] for a value that is already shared.
    pub fn set_shared<T: Any + Send + Sync>(&self, key: impl Into<String>, value: Arc<T>) {
        let key = key.into();
        tracing::trace!(key = %key, ty = type_name::<T>(), "store set");
        self.entries.insert(
            key,
            Slot {
                value,
                type_name: type_name::<T>(),
            },
        );
    }

    /// Fetch the value under `key` as a `T`.
    pub fn get<T: Any + Send + Sync>(&self, key: &str) -> Result<Arc<T>> {
        let (value, found) = {
            let slot = self
                .entries
                .get(key)
                .ok_or_else(|| SiloError::KeyNotFound { key: key.to_string() })?;
            (Arc::clone(&slot.value), slot.type_name)
        };

        value.downcast::<T>().map_err(|_| SiloError::TypeMismatch {
            key: key.to_string(),
            expected: type_name::<T>(),
            found,
        })
    }

    /// Owned copy of the value under `key`.
    pub fn get_cloned<T: Any + Send + Sync + Clone>(&self, key: &str) -> Result<T> {
        self.get::<T>(key).map(|v| T::clone(&v))
    }

    pub fn put<T: Any + Send + Sync>(&self, key: &Key<T>, value: T) {
        self.set(key.name(), value);
    }

    pub fn put_shared<T: Any + Send + Sync>(&self, key: &Key<T>, value: Arc<T>) {
        self.set_shared(key.name(), value);
    }

    pub fn fetch<T: Any + Send + Sync>(&self, key: &Key<T>) -> Result<Arc<T>> {
        self.get(key.name())
    }

    pub fn fetch_cloned<T: Any + Send + Sync + Clone>(&self, key: &Key<T>) -> Result<T> {
        self.get_cloned(key.name())
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Snapshot of the keys currently set (unordered).
    pub fn keys(&self) -> Vec<String> {
        self.entries.iter().map(|e| e.key().clone()).collect()
    }
}

impl fmt::Debug for DataStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DataStore")
            .field("entries", &self.entries.len())
            .finish()
    }
}
