//! Data structures and traits for movie catalog retrieval.
//!
//! This module provides structures to represent movies, genres, languages and
//! keywords as returned by the remote catalog, the query parameter objects the
//! catalog understands, and the trait remote catalog clients implement.
mod tmdb;
mod tmdb_types;

pub use tmdb::{DEFAULT_TMDB_BASE_URL, TmdbClient};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors returned by remote services (catalog and favorites backend).
///
/// The type is `Clone` so one in-flight request can hand its result to every
/// caller that was coalesced onto it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ApiError {
    /// The request could not be sent or no response was received
    #[error("Request failed: {0}")]
    Request(String),

    /// The remote service answered with a non-success status
    #[error("{message}")]
    Status { status_code: u16, message: String },

    /// The response body could not be decoded
    #[error("Failed to parse API response: {0}")]
    Parse(String),
}

impl ApiError {
    /// HTTP status code of the failed response, if one was received
    pub fn status_code(&self) -> Option<u16> {
        match self {
            ApiError::Status { status_code, .. } => Some(*status_code),
            _ => None,
        }
    }
}

/// Errors raised when a caller supplies an unusable movie identifier
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvalidMovieId {
    /// No identifier was supplied at all
    #[error("No movie id was provided")]
    Missing,

    /// The identifier is not a positive integer
    #[error("Invalid movie id '{0}': expected a positive number")]
    Malformed(String),
}

/// Parses a caller supplied movie identifier (usually a route parameter).
///
/// Only positive integers are accepted. `None`, empty strings, `NaN`,
/// fractional and negative values are rejected.
pub fn parse_movie_id(raw: Option<&str>) -> Result<u64, InvalidMovieId> {
    let raw = raw.ok_or(InvalidMovieId::Missing)?;

    match raw.trim().parse::<u64>() {
        Ok(id) if id > 0 => Ok(id),
        _ => Err(InvalidMovieId::Malformed(raw.to_string())),
    }
}

/// A movie as it appears in list results (discover, search, similar).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Movie {
    pub id: u64,
    pub title: String,
    #[serde(default)]
    pub original_title: String,
    #[serde(default)]
    pub original_language: String,
    #[serde(default)]
    pub overview: String,
    #[serde(default)]
    pub poster_path: Option<String>,
    #[serde(default)]
    pub backdrop_path: Option<String>,
    #[serde(default)]
    pub release_date: Option<String>,
    #[serde(default)]
    pub genre_ids: Vec<u32>,
    #[serde(default)]
    pub popularity: f64,
    #[serde(default)]
    pub vote_average: f64,
    #[serde(default)]
    pub vote_count: u64,
    #[serde(default)]
    pub adult: bool,
    #[serde(default)]
    pub video: bool,
}

/// A movie from a list, tagged with whether it is in the active profile's
/// favorites.
///
/// `is_favorite` is derived when the list is merged with the favorite set and
/// is never sent back to the catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListedMovie {
    #[serde(flatten)]
    pub movie: Movie,
    pub is_favorite: bool,
}

/// Full details for a single movie.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MovieDetails {
    pub id: u64,
    pub title: String,
    #[serde(default)]
    pub original_title: String,
    #[serde(default)]
    pub original_language: String,
    #[serde(default)]
    pub overview: String,
    #[serde(default)]
    pub tagline: Option<String>,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub release_date: Option<String>,
    #[serde(default)]
    pub runtime: Option<u32>,
    #[serde(default)]
    pub genres: Vec<Genre>,
    #[serde(default)]
    pub spoken_languages: Vec<SpokenLanguage>,
    #[serde(default)]
    pub homepage: Option<String>,
    #[serde(default)]
    pub poster_path: Option<String>,
    #[serde(default)]
    pub backdrop_path: Option<String>,
    #[serde(default)]
    pub budget: u64,
    #[serde(default)]
    pub revenue: u64,
    #[serde(default)]
    pub vote_average: f64,
    #[serde(default)]
    pub vote_count: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpokenLanguage {
    pub iso_639_1: String,
    #[serde(default)]
    pub english_name: String,
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Genre {
    pub id: u32,
    pub name: String,
}

/// A language the catalog can localize results into.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Language {
    pub iso_639_1: String,
    pub english_name: String,
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Keyword {
    pub id: u64,
    pub name: String,
}

/// One page of a paginated catalog result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Paginated<T> {
    pub results: Vec<T>,
    pub page: u32,
    pub total_pages: u32,
    #[serde(default)]
    pub total_results: u64,
}

pub type MoviePage = Paginated<Movie>;
pub type KeywordPage = Paginated<Keyword>;

/// Discovery filters, the canonical parameter object for list queries.
///
/// Optional filters that are unset are left out of the serialized form, so a
/// filter set with `with_genres: None` keys the same as one that never had
/// the field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Filters {
    pub page: u32,
    pub include_adult: bool,
    pub include_video: bool,
    pub language: String,
    pub sort_by: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub with_keywords: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub with_genres: Option<String>,
}

impl Default for Filters {
    fn default() -> Self {
        Self {
            page: 1,
            include_adult: false,
            include_video: false,
            language: "en".to_string(),
            sort_by: "popularity.desc".to_string(),
            with_keywords: None,
            with_genres: None,
        }
    }
}

/// Parameters of a free text movie search
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchQuery {
    pub query: String,
    pub include_adult: bool,
    pub language: String,
    pub page: u32,
}

impl SearchQuery {
    /// Builds a search that honors the adult, language and page settings of
    /// the given filters.
    pub fn from_filters(query: &str, filters: &Filters) -> Self {
        Self {
            query: query.to_string(),
            include_adult: filters.include_adult,
            language: filters.language.clone(),
            page: filters.page,
        }
    }
}

/// Parameters of a keyword lookup
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeywordQuery {
    pub query: String,
    pub page: u32,
}

/// Trait for remote movie catalogs.
///
/// Each method performs exactly one remote request and keeps no state. Any
/// caching or deduplication happens in the stores that call it.
#[async_trait]
pub trait CatalogApi: Send + Sync {
    /// Lists movies matching the discovery filters
    async fn discover_movies(&self, filters: &Filters) -> Result<MoviePage, ApiError>;

    /// Searches movies by title
    async fn search_movies(&self, query: &SearchQuery) -> Result<MoviePage, ApiError>;

    /// Fetches the full details of one movie
    async fn movie_details(&self, movie_id: u64, language: &str) -> Result<MovieDetails, ApiError>;

    /// Lists movies similar to the given one
    async fn similar_movies(
        &self,
        movie_id: u64,
        language: &str,
        page: u32,
    ) -> Result<MoviePage, ApiError>;

    /// Lists the movie genres, localized into `language`
    async fn genres(&self, language: &str) -> Result<Vec<Genre>, ApiError>;

    /// Lists every language the catalog supports
    async fn languages(&self) -> Result<Vec<Language>, ApiError>;

    /// Searches keywords usable as `with_keywords` filter values
    async fn search_keywords(&self, query: &KeywordQuery) -> Result<KeywordPage, ApiError>;
}
