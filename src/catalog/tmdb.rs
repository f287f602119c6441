/// TMDB catalog client implementation.
use super::tmdb_types::{TmdbErrorEnvelope, TmdbGenreList};
use super::{
    ApiError, CatalogApi, Filters, Genre, KeywordPage, KeywordQuery, Language, MovieDetails,
    MoviePage, SearchQuery,
};
use async_trait::async_trait;
use reqwest::header;
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::debug;

/// The public TMDB v3 API endpoint
pub const DEFAULT_TMDB_BASE_URL: &str = "https://api.themoviedb.org/3";

/// Catalog client for the TMDB API.
///
/// Every request is a `GET` authenticated with a bearer token.
pub struct TmdbClient {
    client: reqwest::Client,
    base_url: String,
    token: String,
}

impl TmdbClient {
    /// Creates a new TMDB client.
    ///
    /// # Arguments
    ///
    /// * `base_url` - API root, e.g. [`DEFAULT_TMDB_BASE_URL`]
    /// * `token` - API read access token sent as bearer credential
    /// * `timeout` - Per-request timeout
    pub fn new(base_url: &str, token: &str, timeout: Duration) -> Result<Self, ApiError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ApiError::Request(e.to_string()))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            token: token.to_string(),
        })
    }

    /// Performs a GET request against `endpoint` and decodes the JSON body.
    async fn get<T>(&self, endpoint: &str, query: &[(&str, String)]) -> Result<T, ApiError>
    where
        T: DeserializeOwned,
    {
        let url = format!("{}{}", self.base_url, endpoint);
        debug!(%url, "requesting catalog resource");

        let response = self
            .client
            .get(&url)
            .query(query)
            .header(header::ACCEPT, "application/json")
            .bearer_auth(&self.token)
            .send()
            .await
            .map_err(|e| ApiError::Request(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            // Prefer TMDB's own description over the bare status line
            let message = match response.json::<TmdbErrorEnvelope>().await {
                Ok(envelope) => envelope.status_message,
                Err(_) => format!(
                    "HTTP {} {}",
                    status.as_u16(),
                    status.canonical_reason().unwrap_or("Unknown")
                ),
            };
            return Err(ApiError::Status {
                status_code: status.as_u16(),
                message,
            });
        }

        response
            .json()
            .await
            .map_err(|e| ApiError::Parse(e.to_string()))
    }
}

#[async_trait]
impl CatalogApi for TmdbClient {
    async fn discover_movies(&self, filters: &Filters) -> Result<MoviePage, ApiError> {
        let mut query = vec![
            ("page", filters.page.to_string()),
            ("include_adult", filters.include_adult.to_string()),
            ("include_video", filters.include_video.to_string()),
            ("language", filters.language.clone()),
            ("sort_by", filters.sort_by.clone()),
        ];

        if let Some(keywords) = &filters.with_keywords {
            query.push(("with_keywords", keywords.clone()));
        }
        if let Some(genres) = &filters.with_genres {
            query.push(("with_genres", genres.clone()));
        }

        self.get("/discover/movie", &query).await
    }

    async fn search_movies(&self, search: &SearchQuery) -> Result<MoviePage, ApiError> {
        let query = [
            ("query", search.query.clone()),
            ("include_adult", search.include_adult.to_string()),
            ("language", search.language.clone()),
            ("page", search.page.to_string()),
        ];

        self.get("/search/movie", &query).await
    }

    async fn movie_details(&self, movie_id: u64, language: &str) -> Result<MovieDetails, ApiError> {
        let endpoint = format!("/movie/{}", movie_id);
        self.get(&endpoint, &[("language", language.to_string())])
            .await
    }

    async fn similar_movies(
        &self,
        movie_id: u64,
        language: &str,
        page: u32,
    ) -> Result<MoviePage, ApiError> {
        let endpoint = format!("/movie/{}/similar", movie_id);
        let query = [("language", language.to_string()), ("page", page.to_string())];

        self.get(&endpoint, &query).await
    }

    async fn genres(&self, language: &str) -> Result<Vec<Genre>, ApiError> {
        let list: TmdbGenreList = self
            .get("/genre/movie/list", &[("language", language.to_string())])
            .await?;

        Ok(list.genres)
    }

    async fn languages(&self) -> Result<Vec<Language>, ApiError> {
        self.get("/configuration/languages", &[]).await
    }

    async fn search_keywords(&self, keywords: &KeywordQuery) -> Result<KeywordPage, ApiError> {
        let query = [
            ("query", keywords.query.clone()),
            ("page", keywords.page.to_string()),
        ];

        self.get("/search/keyword", &query).await
    }
}
