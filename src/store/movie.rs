//! Movie detail store

use super::ResourceStore;
use crate::cache::{CacheKey, KeyedCache};
use crate::catalog::{CatalogApi, MovieDetails, parse_movie_id};
use crate::error_sink::ErrorSink;
use crate::events::{EventHub, StoreKind};
use std::sync::{Arc, Mutex, PoisonError};

const RESOURCE: &str = "movie";

/// Store for the details of one movie at a time
pub struct MovieStore {
    catalog: Arc<dyn CatalogApi>,
    resource: ResourceStore<MovieDetails>,
    movie_id: Mutex<Option<u64>>,
    language: String,
}

impl MovieStore {
    pub fn new(
        catalog: Arc<dyn CatalogApi>,
        errors: Arc<ErrorSink>,
        events: Arc<EventHub>,
        language: &str,
    ) -> Self {
        Self {
            catalog,
            resource: ResourceStore::new(StoreKind::Movie, errors, events),
            movie_id: Mutex::new(None),
            language: language.to_string(),
        }
    }

    /// The displayed movie details
    pub fn movie(&self) -> Option<MovieDetails> {
        self.resource.data()
    }

    /// Id of the most recently requested movie
    pub fn movie_id(&self) -> Option<u64> {
        *self.movie_id.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn is_loading(&self) -> bool {
        self.resource.is_loading()
    }

    pub fn cache(&self) -> &KeyedCache<MovieDetails> {
        self.resource.cache()
    }

    /// Loads the details of the movie identified by `movie_id`.
    ///
    /// The id arrives as text, e.g. from a route segment. An absent or
    /// malformed id is reported with status 400 and nothing is fetched.
    pub async fn load(&self, movie_id: Option<&str>) {
        let movie_id = match parse_movie_id(movie_id) {
            Ok(movie_id) => movie_id,
            Err(error) => return self.resource.errors().set_error(error, Some(400)),
        };
        *self.movie_id.lock().unwrap_or_else(PoisonError::into_inner) = Some(movie_id);

        let catalog = Arc::clone(&self.catalog);
        let language = self.language.clone();
        self.resource
            .load_with(CacheKey::from_parts(RESOURCE, &[movie_id]), move || async move {
                catalog.movie_details(movie_id, &language).await
            })
            .await;
    }
}
