/// Supabase (PostgREST) favorites backend implementation.
use super::{FavoriteRecord, FavoriteRow, FavoritesBackend};
use crate::catalog::ApiError;
use async_trait::async_trait;
use reqwest::{RequestBuilder, Response, header};
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

/// The error body PostgREST returns with non-success responses.
#[derive(Debug, Deserialize)]
struct PostgrestError {
    message: String,
}

/// Favorites backend talking to a Supabase project's REST endpoint.
///
/// Favorites are rows of `table` with `profile_id` and `movie_id` columns.
pub struct SupabaseFavorites {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    access_token: Option<String>,
    table: String,
}

impl SupabaseFavorites {
    /// Creates a new Supabase favorites backend.
    ///
    /// # Arguments
    ///
    /// * `base_url` - Project URL, e.g. `https://xyz.supabase.co`
    /// * `api_key` - The project's anon key
    /// * `access_token` - Signed-in user's JWT; the anon key is used as bearer
    ///   token when absent
    /// * `table` - Name of the favorites table
    /// * `timeout` - Per-request timeout
    pub fn new(
        base_url: &str,
        api_key: &str,
        access_token: Option<String>,
        table: &str,
        timeout: Duration,
    ) -> Result<Self, ApiError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ApiError::Request(e.to_string()))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            access_token,
            table: table.to_string(),
        })
    }

    fn table_url(&self) -> String {
        format!("{}/rest/v1/{}", self.base_url, self.table)
    }

    /// Adds the authentication headers every request needs
    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        let token = self.access_token.as_deref().unwrap_or(&self.api_key);
        request
            .header("apikey", &self.api_key)
            .header(header::ACCEPT, "application/json")
            .bearer_auth(token)
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response, ApiError> {
        let response = self
            .authorized(request)
            .send()
            .await
            .map_err(|e| ApiError::Request(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let message = match response.json::<PostgrestError>().await {
            Ok(error) => error.message,
            Err(_) => format!(
                "HTTP {} {}",
                status.as_u16(),
                status.canonical_reason().unwrap_or("Unknown")
            ),
        };
        Err(ApiError::Status {
            status_code: status.as_u16(),
            message,
        })
    }
}

#[async_trait]
impl FavoritesBackend for SupabaseFavorites {
    async fn fetch_favorites(&self, profile_id: &str) -> Result<Vec<FavoriteRow>, ApiError> {
        debug!(profile_id, "fetching favorites");
        let request = self.client.get(self.table_url()).query(&[
            ("select", "movie_id".to_string()),
            ("profile_id", format!("eq.{}", profile_id)),
        ]);

        self.send(request)
            .await?
            .json()
            .await
            .map_err(|e| ApiError::Parse(e.to_string()))
    }

    async fn insert_favorite(&self, favorite: &FavoriteRecord) -> Result<(), ApiError> {
        let request = self
            .client
            .post(self.table_url())
            .header("Prefer", "return=minimal")
            .json(favorite);

        self.send(request).await?;
        Ok(())
    }

    async fn delete_favorite(&self, favorite: &FavoriteRecord) -> Result<(), ApiError> {
        let request = self.client.delete(self.table_url()).query(&[
            ("profile_id", format!("eq.{}", favorite.profile_id)),
            ("movie_id", format!("eq.{}", favorite.movie_id)),
        ]);

        self.send(request).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn backend_for(server: &MockServer, access_token: Option<&str>) -> SupabaseFavorites {
        SupabaseFavorites::new(
            &server.uri(),
            "anon-key",
            access_token.map(str::to_string),
            "favorite_movies",
            Duration::from_secs(5),
        )
        .unwrap()
    }

    fn record() -> FavoriteRecord {
        FavoriteRecord {
            profile_id: "profile-1".to_string(),
            movie_id: 603,
        }
    }

    #[tokio::test]
    async fn test_fetch_filters_by_profile() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/rest/v1/favorite_movies"))
            .and(query_param("select", "movie_id"))
            .and(query_param("profile_id", "eq.profile-1"))
            .and(header("apikey", "anon-key"))
            .and(header("authorization", "Bearer user-jwt"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!([{"movie_id": 603}, {"movie_id": 604}])),
            )
            .expect(1)
            .mount(&server)
            .await;

        let rows = backend_for(&server, Some("user-jwt"))
            .fetch_favorites("profile-1")
            .await
            .unwrap();

        assert_eq!(
            rows,
            vec![FavoriteRow { movie_id: 603 }, FavoriteRow { movie_id: 604 }]
        );
    }

    #[tokio::test]
    async fn test_insert_posts_record_with_anon_bearer() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/rest/v1/favorite_movies"))
            .and(header("authorization", "Bearer anon-key"))
            .and(body_json(json!({"profile_id": "profile-1", "movie_id": 603})))
            .respond_with(ResponseTemplate::new(201))
            .expect(1)
            .mount(&server)
            .await;

        backend_for(&server, None)
            .insert_favorite(&record())
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_delete_targets_single_row() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .and(path("/rest/v1/favorite_movies"))
            .and(query_param("profile_id", "eq.profile-1"))
            .and(query_param("movie_id", "eq.603"))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;

        backend_for(&server, None)
            .delete_favorite(&record())
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_postgrest_error_message_is_kept() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/rest/v1/favorite_movies"))
            .respond_with(ResponseTemplate::new(409).set_body_json(json!({
                "code": "23505",
                "message": "duplicate key value violates unique constraint",
                "details": null,
                "hint": null
            })))
            .mount(&server)
            .await;

        let error = backend_for(&server, None)
            .insert_favorite(&record())
            .await
            .unwrap_err();

        assert_eq!(
            error,
            ApiError::Status {
                status_code: 409,
                message: "duplicate key value violates unique constraint".to_string(),
            }
        );
    }
}
