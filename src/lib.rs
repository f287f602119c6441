//! MovieScout - Browse, filter, search and favorite movies
//!
//! This library provides the client-side state layer of a movie catalog
//! browser: resource stores that show cached data immediately, revalidate it
//! against the remote catalog and replace it only when it actually changed,
//! plus a favorite overlay that marks movies favorited by the active profile.

mod cache;
mod catalog;
mod config;
mod error_sink;
mod events;
mod favorites;
mod staleness;
mod store;
#[cfg(test)]
mod test_support;

pub use cache::{CacheError, CacheKey, KeyedCache};
pub use catalog::{
    ApiError, CatalogApi, DEFAULT_TMDB_BASE_URL, Filters, Genre, InvalidMovieId, Keyword,
    KeywordPage, KeywordQuery, Language, ListedMovie, Movie, MovieDetails, MoviePage, Paginated,
    SearchQuery, SpokenLanguage, TmdbClient, parse_movie_id,
};
pub use config::{ClientConfig, ConfigError, FavoritesConfig};
pub use error_sink::{ActiveError, DEFAULT_STATUS_CODE, ErrorSink, ReportedError};
pub use events::{EventHub, StoreEvent, StoreKind};
pub use favorites::{
    FavoriteError, FavoriteOverlay, FavoriteRecord, FavoriteRow, FavoriteSet, FavoritesBackend,
    InMemoryFavorites, SupabaseFavorites, merge, reapply,
};
pub use staleness::{Validation, validate};
pub use store::{GenresStore, KeywordsStore, LanguagesStore, MovieList, MovieStore, MoviesStore};

use std::sync::Arc;
use thiserror::Error;
use tracing::info;

/// Top-level error type for MovieScout setup
#[derive(Debug, Error)]
pub enum MovieScoutError {
    /// Error while reading the configuration
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Error while constructing a remote client
    #[error("Client error: {0}")]
    Client(#[from] ApiError),
}

/// Per-session options of a [`MovieScout`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScoutOptions {
    /// The active profile; favorites are unavailable without one
    pub profile_id: Option<String>,
    /// Language for movie details and similar-movie lookups
    pub language: String,
}

impl Default for ScoutOptions {
    fn default() -> Self {
        Self {
            profile_id: None,
            language: config::DEFAULT_LANGUAGE.to_string(),
        }
    }
}

/// Application context owning one instance of every store.
///
/// All stores share a single error sink, event hub and favorite overlay.
/// Construct it once and hand out references to consumers.
pub struct MovieScout {
    events: Arc<EventHub>,
    errors: Arc<ErrorSink>,
    favorites: Arc<FavoriteOverlay>,
    movies: MoviesStore,
    movie: MovieStore,
    genres: GenresStore,
    languages: LanguagesStore,
    keywords: KeywordsStore,
}

impl MovieScout {
    /// Creates the context on top of the given remote services.
    ///
    /// # Arguments
    ///
    /// * `catalog` - The movie catalog every store reads from
    /// * `favorites_backend` - Where the favorites of `options.profile_id`
    ///   are persisted
    /// * `options` - Active profile and language
    pub fn new(
        catalog: Arc<dyn CatalogApi>,
        favorites_backend: Arc<dyn FavoritesBackend>,
        options: ScoutOptions,
    ) -> Self {
        let events = Arc::new(EventHub::new());
        let errors = Arc::new(ErrorSink::new(Arc::clone(&events)));
        let favorites = Arc::new(FavoriteOverlay::new(favorites_backend, options.profile_id));

        Self {
            movies: MoviesStore::new(
                Arc::clone(&catalog),
                Arc::clone(&favorites),
                Arc::clone(&errors),
                Arc::clone(&events),
                &options.language,
            ),
            movie: MovieStore::new(
                Arc::clone(&catalog),
                Arc::clone(&errors),
                Arc::clone(&events),
                &options.language,
            ),
            genres: GenresStore::new(Arc::clone(&catalog), Arc::clone(&errors), Arc::clone(&events)),
            languages: LanguagesStore::new(
                Arc::clone(&catalog),
                Arc::clone(&errors),
                Arc::clone(&events),
            ),
            keywords: KeywordsStore::new(catalog, Arc::clone(&errors), Arc::clone(&events)),
            events,
            errors,
            favorites,
        }
    }

    /// Creates the context with the remote clients described by `config`.
    ///
    /// Favorites are kept in process memory when no favorites backend is
    /// configured.
    ///
    /// # Errors
    ///
    /// Returns an error if one of the HTTP clients cannot be constructed.
    pub fn from_config(config: &ClientConfig) -> Result<Self, MovieScoutError> {
        let catalog = TmdbClient::new(&config.tmdb_base_url, &config.tmdb_token, config.timeout)?;

        let favorites_backend: Arc<dyn FavoritesBackend> = match &config.favorites {
            Some(remote) => {
                info!(url = %remote.url, table = %remote.table, "using Supabase favorites");
                Arc::new(SupabaseFavorites::new(
                    &remote.url,
                    &remote.anon_key,
                    remote.access_token.clone(),
                    &remote.table,
                    config.timeout,
                )?)
            }
            None => {
                info!("no favorites backend configured, keeping favorites in memory");
                Arc::new(InMemoryFavorites::new())
            }
        };

        Ok(Self::new(
            Arc::new(catalog),
            favorites_backend,
            ScoutOptions {
                profile_id: config.profile_id.clone(),
                language: config.language.clone(),
            },
        ))
    }

    pub fn movies(&self) -> &MoviesStore {
        &self.movies
    }

    pub fn movie(&self) -> &MovieStore {
        &self.movie
    }

    pub fn genres(&self) -> &GenresStore {
        &self.genres
    }

    pub fn languages(&self) -> &LanguagesStore {
        &self.languages
    }

    pub fn keywords(&self) -> &KeywordsStore {
        &self.keywords
    }

    pub fn favorites(&self) -> &FavoriteOverlay {
        &self.favorites
    }

    pub fn errors(&self) -> &ErrorSink {
        &self.errors
    }

    /// Registers a callback receiving every [`StoreEvent`] of every store
    pub fn subscribe<F>(&self, subscriber: F)
    where
        F: Fn(&StoreEvent) + Send + Sync + 'static,
    {
        self.events.subscribe(subscriber);
    }

    /// Loads the genres in the language of the active movie filters
    pub async fn load_genres(&self) {
        let language = self.movies.filters().language;
        self.genres.load(&language).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{FakeCatalog, FakeFavorites, genre, movie, page};
    use std::sync::Mutex;
    use std::time::Duration;

    fn scout(favorite_ids: &[u64]) -> (MovieScout, Arc<FakeCatalog>, Arc<FakeFavorites>) {
        let catalog = Arc::new(FakeCatalog::new());
        let backend = Arc::new(FakeFavorites::with_ids(favorite_ids));
        let scout = MovieScout::new(
            catalog.clone(),
            backend.clone(),
            ScoutOptions {
                profile_id: Some("profile-1".to_string()),
                ..ScoutOptions::default()
            },
        );
        (scout, catalog, backend)
    }

    #[tokio::test]
    async fn test_discover_revalidate_and_unfavorite() {
        let (scout, catalog, backend) = scout(&[5]);
        let filters = Filters::default();
        let key = CacheKey::from_params("movies", &filters).unwrap();

        catalog.set_page(page(vec![movie(5, "A")], 1, 10));
        scout.movies().load(filters.clone()).await;
        let first = scout.movies().movies();
        assert_eq!(first.len(), 1);
        assert_eq!((first[0].movie.id, first[0].is_favorite), (5, true));

        scout.movies().load(filters.clone()).await;
        assert_eq!(scout.movies().movies(), first);
        assert!(scout.movies().cache().get(&key).is_some());

        catalog.set_page(page(vec![movie(5, "A Remastered")], 1, 10));
        scout.movies().load(filters).await;
        assert_eq!(scout.movies().movies()[0].movie.title, "A Remastered");
        assert_eq!(scout.movies().total_pages(), Some(10));
        assert!(scout.movies().cache().get(&key).is_none());

        scout.movies().toggle_favorite(5).await;
        assert!(scout.favorites().ids().is_empty());
        assert!(!scout.movies().movies()[0].is_favorite);
        assert!(backend.stored().is_empty());
        assert_eq!(scout.errors().active_error(), None);
    }

    #[tokio::test]
    async fn test_stores_share_one_error_sink() {
        let (scout, catalog, _backend) = scout(&[]);
        let seen = Arc::new(Mutex::new(Vec::new()));
        let recorder = Arc::clone(&seen);
        scout.subscribe(move |event| recorder.lock().unwrap().push(event.clone()));

        scout.movie().load(Some("abc")).await;
        assert_eq!(scout.errors().active_error().unwrap().status_code, 400);

        catalog.fail_with(ApiError::Status {
            status_code: 401,
            message: "Invalid API key".to_string(),
        });
        scout.languages().load().await;

        let active = scout.errors().active_error().unwrap();
        assert_eq!(active.status_code, 401);
        assert!(
            seen.lock()
                .unwrap()
                .contains(&StoreEvent::ErrorRaised(active))
        );
    }

    #[tokio::test]
    async fn test_load_genres_follows_filter_language() {
        let (scout, catalog, _backend) = scout(&[]);
        catalog.set_genres(vec![genre(28, "Action")]);
        scout.movies().set_filters(Filters {
            language: "fr".to_string(),
            ..Filters::default()
        });

        scout.load_genres().await;

        assert_eq!(catalog.last_genres_language().as_deref(), Some("fr"));
        assert_eq!(scout.genres().genres(), vec![genre(28, "Action")]);
    }

    #[tokio::test]
    async fn test_movie_list_filters_are_passed_to_catalog() {
        let (scout, catalog, _backend) = scout(&[]);
        let filters = Filters {
            with_genres: Some("28,12".to_string()),
            include_adult: true,
            ..Filters::default()
        };

        scout.movies().load(filters.clone()).await;

        assert_eq!(catalog.last_filters(), Some(filters.clone()));
        assert_eq!(scout.movies().filters(), filters);
    }

    #[tokio::test]
    async fn test_from_config_without_favorites_backend() {
        let config = ClientConfig {
            tmdb_token: "token".to_string(),
            tmdb_base_url: "http://127.0.0.1:9".to_string(),
            favorites: None,
            profile_id: Some("profile-1".to_string()),
            language: "en".to_string(),
            timeout: Duration::from_secs(1),
        };

        let scout = MovieScout::from_config(&config).unwrap();

        assert_eq!(scout.favorites().profile_id(), Some("profile-1"));
        scout.movies().toggle_favorite(7).await;
        assert!(scout.favorites().contains(7));
    }
}
