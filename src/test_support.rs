//! Fakes shared by the unit tests of the stores.
//!
//! Every fake yields to the scheduler once before answering. A catalog
//! request can also be held at a [`Gate`] until the test opens it, so a
//! fetch stays in flight for as long as the test needs.

use crate::catalog::{
    ApiError, CatalogApi, Filters, Genre, Keyword, KeywordPage, KeywordQuery, Language, Movie,
    MovieDetails, MoviePage, Paginated, SearchQuery,
};
use crate::events::{EventHub, StoreEvent, StoreKind};
use crate::favorites::{FavoriteRecord, FavoriteRow, FavoritesBackend};
use async_trait::async_trait;
use futures::FutureExt;
use futures::channel::oneshot;
use futures::future::Shared;
use std::collections::{BTreeSet, HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

pub(crate) fn movie(id: u64, title: &str) -> Movie {
    Movie {
        id,
        title: title.to_string(),
        original_title: title.to_string(),
        original_language: "en".to_string(),
        ..Movie::default()
    }
}

pub(crate) fn page<T>(results: Vec<T>, page: u32, total_pages: u32) -> Paginated<T> {
    let total_results = results.len() as u64;
    Paginated {
        results,
        page,
        total_pages,
        total_results,
    }
}

pub(crate) fn details(id: u64, title: &str) -> MovieDetails {
    MovieDetails {
        id,
        title: title.to_string(),
        status: "Released".to_string(),
        ..MovieDetails::default()
    }
}

pub(crate) fn genre(id: u32, name: &str) -> Genre {
    Genre {
        id,
        name: name.to_string(),
    }
}

pub(crate) fn language(code: &str, english_name: &str) -> Language {
    Language {
        iso_639_1: code.to_string(),
        english_name: english_name.to_string(),
        name: String::new(),
    }
}

pub(crate) fn keyword(id: u64, name: &str) -> Keyword {
    Keyword {
        id,
        name: name.to_string(),
    }
}

/// A barrier held requests wait at until [`Gate::open`] is called
pub(crate) struct Gate {
    release: Mutex<Option<oneshot::Sender<()>>>,
    opened: Shared<oneshot::Receiver<()>>,
}

impl Gate {
    fn new() -> Self {
        let (release, opened) = oneshot::channel();
        Self {
            release: Mutex::new(Some(release)),
            opened: opened.shared(),
        }
    }

    pub(crate) fn open(&self) {
        if let Some(release) = self.release.lock().unwrap().take() {
            let _ = release.send(());
        }
    }

    async fn wait(&self) {
        let _ = self.opened.clone().await;
    }
}

struct Hold {
    gate: Arc<Gate>,
    page: Option<MoviePage>,
}

struct CatalogState {
    page: MoviePage,
    details: MovieDetails,
    genres: Vec<Genre>,
    languages: Vec<Language>,
    keywords: KeywordPage,
    failure: Option<ApiError>,
    last_filters: Option<Filters>,
    last_search: Option<SearchQuery>,
    last_similar: Option<(u64, u32)>,
    last_details: Option<(u64, String)>,
    last_genres_language: Option<String>,
    last_keyword_query: Option<KeywordQuery>,
    calls: HashMap<&'static str, usize>,
    holds: VecDeque<Hold>,
}

/// Scriptable catalog recording every request it receives
pub(crate) struct FakeCatalog {
    state: Mutex<CatalogState>,
}

impl FakeCatalog {
    pub(crate) fn new() -> Self {
        Self {
            state: Mutex::new(CatalogState {
                page: page(Vec::new(), 1, 1),
                details: MovieDetails::default(),
                genres: Vec::new(),
                languages: Vec::new(),
                keywords: page(Vec::new(), 1, 1),
                failure: None,
                last_filters: None,
                last_search: None,
                last_similar: None,
                last_details: None,
                last_genres_language: None,
                last_keyword_query: None,
                calls: HashMap::new(),
                holds: VecDeque::new(),
            }),
        }
    }

    /// Page returned by discover, search and similar requests
    pub(crate) fn set_page(&self, page: MoviePage) {
        self.state.lock().unwrap().page = page;
    }

    pub(crate) fn set_details(&self, details: MovieDetails) {
        self.state.lock().unwrap().details = details;
    }

    pub(crate) fn set_genres(&self, genres: Vec<Genre>) {
        self.state.lock().unwrap().genres = genres;
    }

    pub(crate) fn set_languages(&self, languages: Vec<Language>) {
        self.state.lock().unwrap().languages = languages;
    }

    pub(crate) fn set_keywords(&self, keywords: KeywordPage) {
        self.state.lock().unwrap().keywords = keywords;
    }

    /// Makes every following request fail with `error`
    pub(crate) fn fail_with(&self, error: ApiError) {
        self.state.lock().unwrap().failure = Some(error);
    }

    /// Holds the next request until the returned gate opens.
    ///
    /// Holds are handed to requests in the order they arrive.
    pub(crate) fn hold_next(&self) -> Arc<Gate> {
        self.push_hold(None)
    }

    /// Like [`hold_next`](Self::hold_next), and the held request answers
    /// with `page` once released
    pub(crate) fn hold_next_page(&self, page: MoviePage) -> Arc<Gate> {
        self.push_hold(Some(page))
    }

    fn push_hold(&self, page: Option<MoviePage>) -> Arc<Gate> {
        let gate = Arc::new(Gate::new());
        self.state.lock().unwrap().holds.push_back(Hold {
            gate: Arc::clone(&gate),
            page,
        });
        gate
    }

    pub(crate) fn recover(&self) {
        self.state.lock().unwrap().failure = None;
    }

    pub(crate) fn discover_calls(&self) -> usize {
        self.calls("discover")
    }

    pub(crate) fn similar_calls(&self) -> usize {
        self.calls("similar")
    }

    pub(crate) fn details_calls(&self) -> usize {
        self.calls("details")
    }

    pub(crate) fn genres_calls(&self) -> usize {
        self.calls("genres")
    }

    pub(crate) fn languages_calls(&self) -> usize {
        self.calls("languages")
    }

    pub(crate) fn last_filters(&self) -> Option<Filters> {
        self.state.lock().unwrap().last_filters.clone()
    }

    pub(crate) fn last_search(&self) -> Option<SearchQuery> {
        self.state.lock().unwrap().last_search.clone()
    }

    pub(crate) fn last_similar(&self) -> Option<(u64, u32)> {
        self.state.lock().unwrap().last_similar
    }

    pub(crate) fn last_details(&self) -> Option<(u64, String)> {
        self.state.lock().unwrap().last_details.clone()
    }

    pub(crate) fn last_genres_language(&self) -> Option<String> {
        self.state.lock().unwrap().last_genres_language.clone()
    }

    pub(crate) fn last_keyword_query(&self) -> Option<KeywordQuery> {
        self.state.lock().unwrap().last_keyword_query.clone()
    }

    fn calls(&self, endpoint: &str) -> usize {
        self.state
            .lock()
            .unwrap()
            .calls
            .get(endpoint)
            .copied()
            .unwrap_or(0)
    }

    /// Counts the request, waits at its gate or lets other tasks run, then
    /// answers it
    async fn answer<T>(
        &self,
        endpoint: &'static str,
        record: impl FnOnce(&mut CatalogState),
        respond: impl FnOnce(&CatalogState) -> T,
    ) -> Result<T, ApiError> {
        let hold = {
            let mut state = self.state.lock().unwrap();
            *state.calls.entry(endpoint).or_default() += 1;
            record(&mut *state);
            state.holds.pop_front()
        };

        match hold {
            Some(hold) => {
                hold.gate.wait().await;
                if let Some(page) = hold.page {
                    self.state.lock().unwrap().page = page;
                }
            }
            None => tokio::task::yield_now().await,
        }

        let state = self.state.lock().unwrap();
        match &state.failure {
            Some(error) => Err(error.clone()),
            None => Ok(respond(&*state)),
        }
    }
}

#[async_trait]
impl CatalogApi for FakeCatalog {
    async fn discover_movies(&self, filters: &Filters) -> Result<MoviePage, ApiError> {
        self.answer(
            "discover",
            |state| state.last_filters = Some(filters.clone()),
            |state| state.page.clone(),
        )
        .await
    }

    async fn search_movies(&self, query: &SearchQuery) -> Result<MoviePage, ApiError> {
        self.answer(
            "search",
            |state| state.last_search = Some(query.clone()),
            |state| state.page.clone(),
        )
        .await
    }

    async fn movie_details(&self, movie_id: u64, language: &str) -> Result<MovieDetails, ApiError> {
        self.answer(
            "details",
            |state| state.last_details = Some((movie_id, language.to_string())),
            |state| state.details.clone(),
        )
        .await
    }

    async fn similar_movies(
        &self,
        movie_id: u64,
        _language: &str,
        page: u32,
    ) -> Result<MoviePage, ApiError> {
        self.answer(
            "similar",
            |state| state.last_similar = Some((movie_id, page)),
            |state| state.page.clone(),
        )
        .await
    }

    async fn genres(&self, language: &str) -> Result<Vec<Genre>, ApiError> {
        self.answer(
            "genres",
            |state| state.last_genres_language = Some(language.to_string()),
            |state| state.genres.clone(),
        )
        .await
    }

    async fn languages(&self) -> Result<Vec<Language>, ApiError> {
        self.answer("languages", |_| {}, |state| state.languages.clone())
            .await
    }

    async fn search_keywords(&self, query: &KeywordQuery) -> Result<KeywordPage, ApiError> {
        self.answer(
            "keywords",
            |state| state.last_keyword_query = Some(query.clone()),
            |state| state.keywords.clone(),
        )
        .await
    }
}

/// Favorites backend holding one profile's favorites, with failure switches
#[derive(Default)]
pub(crate) struct FakeFavorites {
    ids: Mutex<BTreeSet<u64>>,
    fetch_calls: AtomicUsize,
    fail_reads: AtomicBool,
    fail_writes: AtomicBool,
}

impl FakeFavorites {
    pub(crate) fn with_ids(ids: &[u64]) -> Self {
        Self {
            ids: Mutex::new(ids.iter().copied().collect()),
            ..Self::default()
        }
    }

    /// Replaces the stored favorites behind the client's back
    pub(crate) fn set_ids(&self, ids: &[u64]) {
        *self.ids.lock().unwrap() = ids.iter().copied().collect();
    }

    /// The stored favorites in ascending order
    pub(crate) fn stored(&self) -> Vec<u64> {
        self.ids.lock().unwrap().iter().copied().collect()
    }

    pub(crate) fn fetch_calls(&self) -> usize {
        self.fetch_calls.load(Ordering::SeqCst)
    }

    pub(crate) fn fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    pub(crate) fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    fn unavailable() -> ApiError {
        ApiError::Status {
            status_code: 503,
            message: "favorites unavailable".to_string(),
        }
    }

    async fn write(&self, apply: impl FnOnce(&mut BTreeSet<u64>)) -> Result<(), ApiError> {
        tokio::task::yield_now().await;
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(Self::unavailable());
        }
        apply(&mut *self.ids.lock().unwrap());
        Ok(())
    }
}

#[async_trait]
impl FavoritesBackend for FakeFavorites {
    async fn fetch_favorites(&self, _profile_id: &str) -> Result<Vec<FavoriteRow>, ApiError> {
        self.fetch_calls.fetch_add(1, Ordering::SeqCst);
        tokio::task::yield_now().await;
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(Self::unavailable());
        }

        Ok(self
            .stored()
            .into_iter()
            .map(|movie_id| FavoriteRow { movie_id })
            .collect())
    }

    async fn insert_favorite(&self, favorite: &FavoriteRecord) -> Result<(), ApiError> {
        let movie_id = favorite.movie_id;
        self.write(|ids| {
            ids.insert(movie_id);
        })
        .await
    }

    async fn delete_favorite(&self, favorite: &FavoriteRecord) -> Result<(), ApiError> {
        let movie_id = favorite.movie_id;
        self.write(|ids| {
            ids.remove(&movie_id);
        })
        .await
    }
}

/// Event hub that records everything published on it
pub(crate) struct EventLog {
    hub: Arc<EventHub>,
    events: Arc<Mutex<Vec<StoreEvent>>>,
}

impl EventLog {
    pub(crate) fn new() -> Self {
        let hub = Arc::new(EventHub::new());
        let events = Arc::new(Mutex::new(Vec::new()));
        let recorder = Arc::clone(&events);
        hub.subscribe(move |event| recorder.lock().unwrap().push(event.clone()));

        Self { hub, events }
    }

    pub(crate) fn hub(&self) -> Arc<EventHub> {
        Arc::clone(&self.hub)
    }

    pub(crate) fn events(&self) -> Vec<StoreEvent> {
        self.events.lock().unwrap().clone()
    }

    pub(crate) fn clear(&self) {
        self.events.lock().unwrap().clear();
    }

    /// Number of `Updated` events published by `store`
    pub(crate) fn updates(&self, store: StoreKind) -> usize {
        self.events()
            .iter()
            .filter(|event| **event == StoreEvent::Updated { store })
            .count()
    }

    /// The loading transitions published by `store`, in order
    pub(crate) fn loading(&self, store: StoreKind) -> Vec<bool> {
        self.events()
            .iter()
            .filter_map(|event| match event {
                StoreEvent::LoadingChanged { store: from, loading } if *from == store => {
                    Some(*loading)
                }
                _ => None,
            })
            .collect()
    }
}
