//! Movie list store
//!
//! Discovery, search and similar-movie results share one displayed list,
//! merged with the active profile's favorites. Each list load fetches the
//! page and the favorite set concurrently and applies both only when both
//! succeed.

use super::{LoadingFlag, Revalidating};
use crate::cache::{CacheKey, KeyedCache};
use crate::catalog::{
    ApiError, CatalogApi, Filters, ListedMovie, MoviePage, SearchQuery, parse_movie_id,
};
use crate::error_sink::ErrorSink;
use crate::events::{EventHub, StoreEvent, StoreKind};
use crate::favorites::{self, FavoriteOverlay, FavoriteSet};
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

const DISCOVER_RESOURCE: &str = "movies";
const SEARCH_RESOURCE: &str = "search-movies";
const SIMILAR_RESOURCE: &str = "similar-movies";

/// The displayed movie list and its pagination
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MovieList {
    pub movies: Vec<ListedMovie>,
    pub current_page: Option<u32>,
    pub total_pages: Option<u32>,
}

/// Store for paginated movie lists and favorite toggling
pub struct MoviesStore {
    catalog: Arc<dyn CatalogApi>,
    favorites: Arc<FavoriteOverlay>,
    errors: Arc<ErrorSink>,
    events: Arc<EventHub>,
    pages: Revalidating<MoviePage>,
    list: Mutex<MovieList>,
    filters: Mutex<Filters>,
    loading: LoadingFlag,
    language: String,
}

impl MoviesStore {
    /// Creates an empty movie list store.
    ///
    /// # Arguments
    ///
    /// * `catalog` - Remote catalog to fetch pages from
    /// * `favorites` - Shared favorite overlay of the active profile
    /// * `errors` - Sink receiving every failure
    /// * `events` - Hub receiving change notifications
    /// * `language` - Language for similar-movie lookups
    pub fn new(
        catalog: Arc<dyn CatalogApi>,
        favorites: Arc<FavoriteOverlay>,
        errors: Arc<ErrorSink>,
        events: Arc<EventHub>,
        language: &str,
    ) -> Self {
        Self {
            catalog,
            favorites,
            errors,
            loading: LoadingFlag::new(StoreKind::Movies, Arc::clone(&events)),
            events,
            pages: Revalidating::new(),
            list: Mutex::new(MovieList::default()),
            filters: Mutex::new(Filters::default()),
            language: language.to_string(),
        }
    }

    /// Snapshot of the displayed list
    pub fn list(&self) -> MovieList {
        self.lock_list().clone()
    }

    pub fn movies(&self) -> Vec<ListedMovie> {
        self.lock_list().movies.clone()
    }

    pub fn current_page(&self) -> Option<u32> {
        self.lock_list().current_page
    }

    pub fn total_pages(&self) -> Option<u32> {
        self.lock_list().total_pages
    }

    pub fn is_loading(&self) -> bool {
        self.loading.is_loading()
    }

    /// The active discovery filters
    pub fn filters(&self) -> Filters {
        self.lock_filters().clone()
    }

    pub fn set_filters(&self, filters: Filters) {
        *self.lock_filters() = filters;
    }

    /// Cache of fetched pages, shared by discovery, search and similar lists
    pub fn cache(&self) -> &KeyedCache<MoviePage> {
        self.pages.cache()
    }

    /// Makes `filters` the active filters and loads the matching movies
    pub async fn load(&self, filters: Filters) {
        self.set_filters(filters.clone());

        let key = match CacheKey::from_params(DISCOVER_RESOURCE, &filters) {
            Ok(key) => key,
            Err(error) => return self.errors.set_error(error, None),
        };
        let catalog = Arc::clone(&self.catalog);

        self.load_page(key, move || async move { catalog.discover_movies(&filters).await })
            .await;
    }

    /// Loads the movies matching the active filters again
    pub async fn reload(&self) {
        self.load(self.filters()).await;
    }

    /// Searches movies by title, honoring the active filters' adult,
    /// language and page settings
    pub async fn search(&self, query: &str) {
        let search = SearchQuery::from_filters(query, &self.filters());

        let key = match CacheKey::from_params(SEARCH_RESOURCE, &search) {
            Ok(key) => key,
            Err(error) => return self.errors.set_error(error, None),
        };
        let catalog = Arc::clone(&self.catalog);

        self.load_page(key, move || async move { catalog.search_movies(&search).await })
            .await;
    }

    /// Loads movies similar to `movie_id`.
    ///
    /// An absent or malformed id is reported to the error sink without
    /// contacting the catalog. `page` defaults to the first page.
    pub async fn load_similar(&self, movie_id: Option<&str>, page: Option<u32>) {
        let movie_id = match parse_movie_id(movie_id) {
            Ok(movie_id) => movie_id,
            Err(error) => return self.errors.set_error(error, Some(400)),
        };
        let page = page.unwrap_or(1);

        let key = CacheKey::from_parts(SIMILAR_RESOURCE, &[movie_id, u64::from(page)]);
        let catalog = Arc::clone(&self.catalog);
        let language = self.language.clone();

        self.load_page(key, move || async move {
            catalog.similar_movies(movie_id, &language, page).await
        })
        .await;
    }

    /// Adds `movie_id` to or removes it from the favorites.
    ///
    /// The displayed flag follows the favorite set once the backend has
    /// confirmed the change; on failure neither changes.
    pub async fn toggle_favorite(&self, movie_id: u64) {
        let _loading = self.loading.begin();

        let is_favorite = match self.favorites.toggle(movie_id).await {
            Ok(is_favorite) => is_favorite,
            Err(error) => return self.errors.set_error(error, None),
        };

        for entry in self
            .lock_list()
            .movies
            .iter_mut()
            .filter(|entry| entry.movie.id == movie_id)
        {
            entry.is_favorite = is_favorite;
        }

        self.events.publish(StoreEvent::FavoriteChanged {
            movie_id,
            is_favorite,
        });
    }

    async fn load_page<F, Fut>(&self, key: CacheKey, fetcher: F)
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<MoviePage, ApiError>> + Send + 'static,
    {
        let _loading = self.loading.begin();

        if let Some(cached) = self.pages.show_cached(&key) {
            self.display(&cached, &self.favorites.ids());
        }

        let fetched = tokio::try_join!(self.pages.check(&key, fetcher), self.favorites.fetch());
        let (checked, favorite_ids) = match fetched {
            Ok(fetched) => fetched,
            Err(error) => return self.errors.set_error(error, None),
        };

        self.favorites.replace(favorite_ids.clone());
        match self.pages.commit(&key, checked) {
            Some(page) => self.display(&page, &favorite_ids),
            None => {
                let changed = favorites::reapply(&mut self.lock_list().movies, &favorite_ids);
                if changed {
                    self.publish_update();
                }
            }
        }
    }

    fn display(&self, page: &MoviePage, favorite_ids: &FavoriteSet) {
        {
            let mut list = self.lock_list();
            list.movies = favorites::merge(&page.results, favorite_ids);
            list.current_page = Some(page.page);
            list.total_pages = Some(page.total_pages);
        }
        self.publish_update();
    }

    fn publish_update(&self) {
        self.events.publish(StoreEvent::Updated {
            store: StoreKind::Movies,
        });
    }

    fn lock_list(&self) -> MutexGuard<'_, MovieList> {
        self.list.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn lock_filters(&self) -> MutexGuard<'_, Filters> {
        self.filters.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
