//! Keyword search store
//!
//! Keyword ids found here feed the `with_keywords` discovery filter.

use super::ResourceStore;
use crate::cache::{CacheKey, KeyedCache};
use crate::catalog::{CatalogApi, KeywordPage, KeywordQuery};
use crate::error_sink::ErrorSink;
use crate::events::{EventHub, StoreKind};
use std::sync::Arc;

const RESOURCE: &str = "keywords";

/// Store for keyword search results
pub struct KeywordsStore {
    catalog: Arc<dyn CatalogApi>,
    resource: ResourceStore<KeywordPage>,
}

impl KeywordsStore {
    pub fn new(catalog: Arc<dyn CatalogApi>, errors: Arc<ErrorSink>, events: Arc<EventHub>) -> Self {
        Self {
            catalog,
            resource: ResourceStore::new(StoreKind::Keywords, errors, events),
        }
    }

    /// The displayed page of keywords
    pub fn keywords(&self) -> Option<KeywordPage> {
        self.resource.data()
    }

    pub fn is_loading(&self) -> bool {
        self.resource.is_loading()
    }

    pub fn cache(&self) -> &KeyedCache<KeywordPage> {
        self.resource.cache()
    }

    /// Searches keywords matching `query`
    pub async fn search(&self, query: KeywordQuery) {
        let key = match CacheKey::from_params(RESOURCE, &query) {
            Ok(key) => key,
            Err(error) => return self.resource.errors().set_error(error, None),
        };
        let catalog = Arc::clone(&self.catalog);

        self.resource
            .load_with(key, move || async move { catalog.search_keywords(&query).await })
            .await;
    }
}
