//! Resource stores
//!
//! Every store follows the same stale-while-revalidate shape: show what the
//! cache already holds for the requested key, fetch a fresh value through
//! the cache, and replace the displayed value only when it actually changed.
//! Failures are reported to the [`ErrorSink`] and never returned.

mod genres;
mod keywords;
mod languages;
mod movie;
mod movies;

pub use genres::GenresStore;
pub use keywords::KeywordsStore;
pub use languages::LanguagesStore;
pub use movie::MovieStore;
pub use movies::{MovieList, MoviesStore};

use crate::cache::{CacheKey, KeyedCache};
use crate::catalog::ApiError;
use crate::error_sink::ErrorSink;
use crate::events::{EventHub, StoreEvent, StoreKind};
use crate::staleness;
use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::debug;

/// Tracks whether a store has operations in progress.
///
/// Overlapping operations are counted, so the flag stays raised until the
/// last of them finishes.
pub(crate) struct LoadingFlag {
    store: StoreKind,
    active: AtomicUsize,
    events: Arc<EventHub>,
}

impl LoadingFlag {
    pub(crate) fn new(store: StoreKind, events: Arc<EventHub>) -> Self {
        Self {
            store,
            active: AtomicUsize::new(0),
            events,
        }
    }

    pub(crate) fn is_loading(&self) -> bool {
        self.active.load(Ordering::SeqCst) > 0
    }

    /// Raises the flag until the returned guard is dropped
    pub(crate) fn begin(&self) -> LoadingGuard<'_> {
        if self.active.fetch_add(1, Ordering::SeqCst) == 0 {
            self.publish(true);
        }
        LoadingGuard { flag: self }
    }

    fn publish(&self, loading: bool) {
        self.events.publish(StoreEvent::LoadingChanged {
            store: self.store,
            loading,
        });
    }
}

/// Guard that lowers its [`LoadingFlag`] when dropped, on every exit path
pub(crate) struct LoadingGuard<'a> {
    flag: &'a LoadingFlag,
}

impl Drop for LoadingGuard<'_> {
    fn drop(&mut self) {
        if self.flag.active.fetch_sub(1, Ordering::SeqCst) == 1 {
            self.flag.publish(false);
        }
    }
}

struct Shown<T> {
    key: CacheKey,
    value: T,
}

/// A fresh value together with whether it differs from what was displayed
/// for its key
pub(crate) struct Checked<T> {
    fresh: T,
    changed: bool,
}

/// The displayed value of a store and the cache behind it.
pub(crate) struct Revalidating<T> {
    cache: KeyedCache<T>,
    shown: Mutex<Option<Shown<T>>>,
}

impl<T> Revalidating<T>
where
    T: Clone + PartialEq + Send + Sync + 'static,
{
    pub(crate) fn new() -> Self {
        Self {
            cache: KeyedCache::new(),
            shown: Mutex::new(None),
        }
    }

    pub(crate) fn cache(&self) -> &KeyedCache<T> {
        &self.cache
    }

    /// The value currently on display, whatever key it belongs to
    pub(crate) fn displayed(&self) -> Option<T> {
        self.lock().as_ref().map(|shown| shown.value.clone())
    }

    /// Puts the cached value for `key` on display.
    ///
    /// Only happens when the display currently belongs to another key and
    /// the cache holds a value for `key`; returns the value shown.
    pub(crate) fn show_cached(&self, key: &CacheKey) -> Option<T> {
        let mut shown = self.lock();
        if shown.as_ref().is_some_and(|current| &current.key == key) {
            return None;
        }

        let value = self.cache.get(key)?;
        debug!(%key, "showing cached value");
        *shown = Some(Shown {
            key: key.clone(),
            value: value.clone(),
        });
        Some(value)
    }

    /// Fetches `key` and validates the displayed value against the result.
    ///
    /// Nothing on display changes here; pass the result to [`commit`].
    ///
    /// [`commit`]: Revalidating::commit
    pub(crate) async fn check<F, Fut>(&self, key: &CacheKey, fetcher: F) -> Result<Checked<T>, ApiError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, ApiError>> + Send + 'static,
    {
        let current = self.displayed_for(key);
        let validation = staleness::validate(&self.cache, key, current.as_ref(), fetcher).await?;

        Ok(Checked {
            changed: validation.changed,
            fresh: validation.fresh,
        })
    }

    /// Applies a checked value, returning it when it replaced the display.
    ///
    /// The value replaces the display when it changed or when the display
    /// belongs to another key by now, so the load resolving last wins.
    pub(crate) fn commit(&self, key: &CacheKey, checked: Checked<T>) -> Option<T> {
        let mut shown = self.lock();
        let same_key = shown.as_ref().is_some_and(|current| &current.key == key);
        if same_key && !checked.changed {
            debug!(%key, "displayed value is current");
            return None;
        }

        *shown = Some(Shown {
            key: key.clone(),
            value: checked.fresh.clone(),
        });
        Some(checked.fresh)
    }

    fn displayed_for(&self, key: &CacheKey) -> Option<T> {
        self.lock()
            .as_ref()
            .filter(|shown| &shown.key == key)
            .map(|shown| shown.value.clone())
    }

    fn lock(&self) -> MutexGuard<'_, Option<Shown<T>>> {
        self.shown.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// A store whose displayed value is exactly the fetched payload.
///
/// Used for detail, genre, language and keyword resources; the typed stores
/// wrap it and supply keys and fetchers.
pub(crate) struct ResourceStore<T> {
    kind: StoreKind,
    data: Revalidating<T>,
    loading: LoadingFlag,
    errors: Arc<ErrorSink>,
    events: Arc<EventHub>,
}

impl<T> ResourceStore<T>
where
    T: Clone + PartialEq + Send + Sync + 'static,
{
    pub(crate) fn new(kind: StoreKind, errors: Arc<ErrorSink>, events: Arc<EventHub>) -> Self {
        Self {
            kind,
            data: Revalidating::new(),
            loading: LoadingFlag::new(kind, Arc::clone(&events)),
            errors,
            events,
        }
    }

    pub(crate) fn data(&self) -> Option<T> {
        self.data.displayed()
    }

    pub(crate) fn is_loading(&self) -> bool {
        self.loading.is_loading()
    }

    pub(crate) fn cache(&self) -> &KeyedCache<T> {
        self.data.cache()
    }

    pub(crate) fn errors(&self) -> &ErrorSink {
        &self.errors
    }

    /// Loads `key` with stale-while-revalidate semantics.
    ///
    /// Errors go to the error sink and leave the displayed value as it was.
    pub(crate) async fn load_with<F, Fut>(&self, key: CacheKey, fetcher: F)
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, ApiError>> + Send + 'static,
    {
        let _loading = self.loading.begin();

        if self.data.show_cached(&key).is_some() {
            self.publish_update();
        }

        match self.data.check(&key, fetcher).await {
            Ok(checked) => {
                if self.data.commit(&key, checked).is_some() {
                    self.publish_update();
                }
            }
            Err(error) => self.errors.set_error(error, None),
        }
    }

    fn publish_update(&self) {
        self.events.publish(StoreEvent::Updated { store: self.kind });
    }
}
