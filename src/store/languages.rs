//! Language list store

use super::ResourceStore;
use crate::cache::{CacheKey, KeyedCache};
use crate::catalog::{CatalogApi, Language};
use crate::error_sink::ErrorSink;
use crate::events::{EventHub, StoreKind};
use std::sync::Arc;

const RESOURCE: &str = "languages";

/// Store for the languages the catalog supports
pub struct LanguagesStore {
    catalog: Arc<dyn CatalogApi>,
    resource: ResourceStore<Vec<Language>>,
}

impl LanguagesStore {
    pub fn new(catalog: Arc<dyn CatalogApi>, errors: Arc<ErrorSink>, events: Arc<EventHub>) -> Self {
        Self {
            catalog,
            resource: ResourceStore::new(StoreKind::Languages, errors, events),
        }
    }

    pub fn languages(&self) -> Vec<Language> {
        self.resource.data().unwrap_or_default()
    }

    pub fn is_loading(&self) -> bool {
        self.resource.is_loading()
    }

    pub fn cache(&self) -> &KeyedCache<Vec<Language>> {
        self.resource.cache()
    }

    pub async fn load(&self) {
        let catalog = Arc::clone(&self.catalog);
        self.resource
            .load_with(CacheKey::named(RESOURCE), move || async move {
                catalog.languages().await
            })
            .await;
    }
}
