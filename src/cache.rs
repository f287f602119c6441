//! Keyed cache module
//!
//! This module provides an in-memory cache holding at most one value per
//! cache key, together with the coalescing of concurrent fetches for the same
//! key into a single underlying request.

use crate::catalog::ApiError;
use futures::FutureExt;
use futures::future::{BoxFuture, Shared};
use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use thiserror::Error;
use tracing::debug;

/// Errors that can occur while deriving cache keys
#[derive(Debug, Error)]
pub enum CacheError {
    /// Failed to serialize the request parameters into a key
    #[error("Failed to serialize cache key parameters: {0}")]
    KeySerialization(#[from] serde_json::Error),
}

/// A deterministic identifier for one (resource, parameters) pair.
///
/// Logically identical requests always map to the same key: parameter
/// objects are serialized with their object keys sorted, so field order
/// never leaks into the key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CacheKey(String);

impl CacheKey {
    /// Builds a key for a single-valued resource such as `"languages"`.
    pub fn named(resource: &str) -> Self {
        Self(resource.to_string())
    }

    /// Builds a key of the form `"<resource>-<part>-<part>..."`.
    ///
    /// # Examples
    ///
    /// ```ignore
    /// let key = CacheKey::from_parts("similar-movies", &[603, 2]);
    /// assert_eq!(key.as_str(), "similar-movies-603-2");
    /// ```
    pub fn from_parts(resource: &str, parts: &[u64]) -> Self {
        let mut key = resource.to_string();
        for part in parts {
            key.push('-');
            key.push_str(&part.to_string());
        }
        Self(key)
    }

    /// Builds a key from a parameter object serialized in canonical form.
    ///
    /// # Arguments
    ///
    /// * `resource` - The resource name prefixing the key
    /// * `params` - The full parameter object of the request
    pub fn from_params<P>(resource: &str, params: &P) -> Result<Self, CacheError>
    where
        P: Serialize + ?Sized,
    {
        let value = serde_json::to_value(params)?;
        let mut key = format!("{}-", resource);
        write_canonical(&value, &mut key);
        Ok(Self(key))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Writes `value` as JSON with every object's keys in sorted order
fn write_canonical(value: &Value, out: &mut String) {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<_> = map.iter().collect();
            entries.sort_unstable_by(|a, b| a.0.cmp(b.0));

            out.push('{');
            for (index, (name, item)) in entries.into_iter().enumerate() {
                if index > 0 {
                    out.push(',');
                }
                // Serializing a string into JSON never fails
                out.push_str(&Value::String(name.clone()).to_string());
                out.push(':');
                write_canonical(item, out);
            }
            out.push('}');
        }
        Value::Array(items) => {
            out.push('[');
            for (index, item) in items.iter().enumerate() {
                if index > 0 {
                    out.push(',');
                }
                write_canonical(item, out);
            }
            out.push(']');
        }
        scalar => out.push_str(&scalar.to_string()),
    }
}

type SharedFetch<T> = Shared<BoxFuture<'static, Result<T, ApiError>>>;

struct CacheState<T> {
    entries: HashMap<CacheKey, T>,
    in_flight: HashMap<CacheKey, SharedFetch<T>>,
}

/// An in-memory cache with at most one entry per key.
///
/// Entries never expire on their own; they are replaced by the next
/// successful fetch for their key or removed with [`KeyedCache::delete`].
/// Clones share the same underlying storage.
pub struct KeyedCache<T> {
    state: Arc<Mutex<CacheState<T>>>,
}

impl<T> Clone for KeyedCache<T> {
    fn clone(&self) -> Self {
        Self {
            state: Arc::clone(&self.state),
        }
    }
}

impl<T> Default for KeyedCache<T>
where
    T: Clone + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<T> KeyedCache<T>
where
    T: Clone + Send + Sync + 'static,
{
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(CacheState {
                entries: HashMap::new(),
                in_flight: HashMap::new(),
            })),
        }
    }

    /// Returns the cached value for `key`, if any
    pub fn get(&self, key: &CacheKey) -> Option<T> {
        lock(&self.state).entries.get(key).cloned()
    }

    /// Stores `value` under `key`, replacing any previous entry
    pub fn set(&self, key: &CacheKey, value: T) {
        lock(&self.state).entries.insert(key.clone(), value);
    }

    /// Removes the entry for `key`, returning it if there was one.
    ///
    /// A fetch currently in flight for the key is not affected.
    pub fn delete(&self, key: &CacheKey) -> Option<T> {
        lock(&self.state).entries.remove(key)
    }

    /// Returns the number of cached entries
    pub fn len(&self) -> usize {
        lock(&self.state).entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Fetches the value for `key` through `fetcher`, sharing in-flight work.
    ///
    /// If a fetch for the same key is already running, the returned future
    /// resolves with that fetch's result and `fetcher` is never invoked.
    /// Otherwise `fetcher` is called once and its future is registered as the
    /// in-flight fetch for `key`. On success the result is stored as the
    /// key's cache entry; on failure the existing entry is left untouched.
    ///
    /// This does not consult the cached entry: it is a deduplication
    /// guarantee, not a freshness one.
    pub fn fetch<F, Fut>(&self, key: &CacheKey, fetcher: F) -> SharedFetch<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, ApiError>> + Send + 'static,
    {
        let mut state = lock(&self.state);

        if let Some(pending) = state.in_flight.get(key) {
            debug!(%key, "joining in-flight fetch");
            return pending.clone();
        }

        debug!(%key, "starting fetch");
        let request = fetcher();
        let storage = Arc::clone(&self.state);
        let owner = key.clone();

        let fetch = async move {
            let result = request.await;

            let mut state = lock(&storage);
            state.in_flight.remove(&owner);
            if let Ok(value) = &result {
                state.entries.insert(owner, value.clone());
            }

            result
        }
        .boxed()
        .shared();

        state.in_flight.insert(key.clone(), fetch.clone());
        fetch
    }
}

fn lock<T>(state: &Mutex<CacheState<T>>) -> MutexGuard<'_, CacheState<T>> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}
