//! Favorite overlay module
//!
//! This module keeps the set of favorited movie ids for the active profile,
//! merges it into movie lists as an `is_favorite` flag, and toggles
//! membership against a remote favorites backend. The in-memory set is only
//! changed after the backend confirms the change.
mod supabase;

pub use supabase::SupabaseFavorites;

use crate::catalog::{ApiError, ListedMovie, Movie};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use thiserror::Error;
use tracing::debug;

/// Movie ids favorited by one profile
pub type FavoriteSet = HashSet<u64>;

/// Errors that can occur while toggling a favorite
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FavoriteError {
    /// Favorites belong to a profile and none is active
    #[error("No active profile to store favorites for")]
    NoActiveProfile,

    /// The favorites backend rejected the change
    #[error("Favorites backend error: {0}")]
    Backend(#[from] ApiError),
}

/// One favorite as stored by the backend
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FavoriteRecord {
    pub profile_id: String,
    pub movie_id: u64,
}

/// One row of a favorites listing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FavoriteRow {
    pub movie_id: u64,
}

/// Trait for remote stores persisting the favorites of a profile.
#[async_trait]
pub trait FavoritesBackend: Send + Sync {
    /// Lists the favorites of `profile_id`
    async fn fetch_favorites(&self, profile_id: &str) -> Result<Vec<FavoriteRow>, ApiError>;

    /// Adds one favorite
    async fn insert_favorite(&self, favorite: &FavoriteRecord) -> Result<(), ApiError>;

    /// Removes one favorite
    async fn delete_favorite(&self, favorite: &FavoriteRecord) -> Result<(), ApiError>;
}

/// Tags every movie with whether its id is in `favorites`.
///
/// The returned list has the same order and length as `movies`.
pub fn merge(movies: &[Movie], favorites: &FavoriteSet) -> Vec<ListedMovie> {
    movies
        .iter()
        .map(|movie| ListedMovie {
            movie: movie.clone(),
            is_favorite: favorites.contains(&movie.id),
        })
        .collect()
}

/// Re-derives the `is_favorite` flags of an already merged list in place.
///
/// Returns whether any flag changed.
pub fn reapply(listed: &mut [ListedMovie], favorites: &FavoriteSet) -> bool {
    let mut changed = false;
    for entry in listed {
        let is_favorite = favorites.contains(&entry.movie.id);
        changed |= entry.is_favorite != is_favorite;
        entry.is_favorite = is_favorite;
    }
    changed
}

/// Client-side owner of the active profile's favorite set.
pub struct FavoriteOverlay {
    backend: Arc<dyn FavoritesBackend>,
    profile_id: Option<String>,
    ids: Mutex<FavoriteSet>,
}

impl FavoriteOverlay {
    /// Creates an overlay with an empty favorite set.
    ///
    /// # Arguments
    ///
    /// * `backend` - Remote store of favorites
    /// * `profile_id` - The active profile; without one every list merges as
    ///   "not favorite" and toggling fails
    pub fn new(backend: Arc<dyn FavoritesBackend>, profile_id: Option<String>) -> Self {
        Self {
            backend,
            profile_id,
            ids: Mutex::new(FavoriteSet::new()),
        }
    }

    pub fn profile_id(&self) -> Option<&str> {
        self.profile_id.as_deref()
    }

    /// Fetches the authoritative favorite set without applying it
    pub async fn fetch(&self) -> Result<FavoriteSet, ApiError> {
        let Some(profile_id) = &self.profile_id else {
            return Ok(FavoriteSet::new());
        };

        let rows = self.backend.fetch_favorites(profile_id).await?;
        Ok(rows.into_iter().map(|row| row.movie_id).collect())
    }

    /// Replaces the in-memory set wholesale
    pub fn replace(&self, ids: FavoriteSet) {
        debug!(count = ids.len(), "favorite set replaced");
        *self.lock() = ids;
    }

    /// Fetches the favorite set and replaces the in-memory one with it
    pub async fn refresh(&self) -> Result<(), ApiError> {
        let ids = self.fetch().await?;
        self.replace(ids);
        Ok(())
    }

    pub fn contains(&self, movie_id: u64) -> bool {
        self.lock().contains(&movie_id)
    }

    /// Returns a snapshot of the favorite set
    pub fn ids(&self) -> FavoriteSet {
        self.lock().clone()
    }

    /// Flips the favorite state of `movie_id`.
    ///
    /// The backend is asked first; the in-memory set only changes once the
    /// backend has confirmed. Returns the new membership.
    ///
    /// # Errors
    ///
    /// Fails without touching the in-memory set if there is no active
    /// profile or the backend rejects the change.
    pub async fn toggle(&self, movie_id: u64) -> Result<bool, FavoriteError> {
        let profile_id = self
            .profile_id
            .clone()
            .ok_or(FavoriteError::NoActiveProfile)?;
        let record = FavoriteRecord {
            profile_id,
            movie_id,
        };

        if self.contains(movie_id) {
            self.backend.delete_favorite(&record).await?;
            self.lock().remove(&movie_id);
            debug!(movie_id, "favorite removed");
            Ok(false)
        } else {
            self.backend.insert_favorite(&record).await?;
            self.lock().insert(movie_id);
            debug!(movie_id, "favorite added");
            Ok(true)
        }
    }

    fn lock(&self) -> MutexGuard<'_, FavoriteSet> {
        self.ids.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Favorites backend that keeps everything in process memory.
///
/// Used when no remote backend is configured.
#[derive(Default)]
pub struct InMemoryFavorites {
    profiles: Mutex<HashMap<String, FavoriteSet>>,
}

impl InMemoryFavorites {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, FavoriteSet>> {
        self.profiles.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl FavoritesBackend for InMemoryFavorites {
    async fn fetch_favorites(&self, profile_id: &str) -> Result<Vec<FavoriteRow>, ApiError> {
        let mut movie_ids: Vec<u64> = self
            .lock()
            .get(profile_id)
            .map(|ids| ids.iter().copied().collect())
            .unwrap_or_default();
        movie_ids.sort_unstable();

        Ok(movie_ids
            .into_iter()
            .map(|movie_id| FavoriteRow { movie_id })
            .collect())
    }

    async fn insert_favorite(&self, favorite: &FavoriteRecord) -> Result<(), ApiError> {
        self.lock()
            .entry(favorite.profile_id.clone())
            .or_default()
            .insert(favorite.movie_id);
        Ok(())
    }

    async fn delete_favorite(&self, favorite: &FavoriteRecord) -> Result<(), ApiError> {
        if let Some(ids) = self.lock().get_mut(&favorite.profile_id) {
            ids.remove(&favorite.movie_id);
        }
        Ok(())
    }
}
