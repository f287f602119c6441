//! Genre list store

use super::ResourceStore;
use crate::cache::{CacheKey, KeyedCache};
use crate::catalog::{CatalogApi, Genre};
use crate::error_sink::ErrorSink;
use crate::events::{EventHub, StoreKind};
use std::sync::Arc;

/// Store for the localized list of movie genres
pub struct GenresStore {
    catalog: Arc<dyn CatalogApi>,
    resource: ResourceStore<Vec<Genre>>,
}

impl GenresStore {
    pub fn new(catalog: Arc<dyn CatalogApi>, errors: Arc<ErrorSink>, events: Arc<EventHub>) -> Self {
        Self {
            catalog,
            resource: ResourceStore::new(StoreKind::Genres, errors, events),
        }
    }

    /// The displayed genres, empty until the first load succeeds
    pub fn genres(&self) -> Vec<Genre> {
        self.resource.data().unwrap_or_default()
    }

    pub fn is_loading(&self) -> bool {
        self.resource.is_loading()
    }

    pub fn cache(&self) -> &KeyedCache<Vec<Genre>> {
        self.resource.cache()
    }

    /// Loads the genres with names in `language`
    pub async fn load(&self, language: &str) {
        let key = CacheKey::named(&format!("genres-{}", language));
        let catalog = Arc::clone(&self.catalog);
        let language = language.to_string();

        self.resource
            .load_with(key, move || async move { catalog.genres(&language).await })
            .await;
    }
}
