//! Staleness validation module
//!
//! Fetches a fresh value for a cache key and decides whether the value
//! currently on display has been superseded.

use crate::cache::{CacheKey, KeyedCache};
use crate::catalog::ApiError;
use std::future::Future;
use tracing::debug;

/// Outcome of validating a displayed value against a fresh fetch
#[derive(Debug, Clone, PartialEq)]
pub struct Validation<T> {
    /// Whether the fresh value differs from the displayed one
    pub changed: bool,
    /// The value returned by the fetch
    pub fresh: T,
}

/// Validates `current` against a fresh fetch for `key`.
///
/// The fetch goes through `cache`, so concurrent validations of the same key
/// share one request and a successful fetch primes the cache. Values are
/// compared structurally (`PartialEq`, order sensitive for sequences). When
/// they differ the cache entry for `key` is deleted so the next independent
/// read fetches again instead of trusting the superseded entry. With no
/// `current` value there is nothing to supersede: `changed` is `false` and
/// the entry stands.
///
/// # Errors
///
/// Errors from `fetcher` are returned unchanged and leave the cache entry as
/// it was.
pub async fn validate<T, F, Fut>(
    cache: &KeyedCache<T>,
    key: &CacheKey,
    current: Option<&T>,
    fetcher: F,
) -> Result<Validation<T>, ApiError>
where
    T: Clone + PartialEq + Send + Sync + 'static,
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<T, ApiError>> + Send + 'static,
{
    let fresh = cache.fetch(key, fetcher).await?;

    let changed = current.is_some_and(|displayed| *displayed != fresh);
    if changed {
        debug!(%key, "displayed value is stale, dropping cache entry");
        cache.delete(key);
    }

    Ok(Validation { changed, fresh })
}
