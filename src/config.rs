//! Client configuration module
//!
//! Reads the settings needed to talk to the movie catalog and the favorites
//! backend from environment variables.

use crate::catalog::DEFAULT_TMDB_BASE_URL;
use std::env;
use std::time::Duration;
use thiserror::Error;

/// Table holding favorites when `FAVORITES_TABLE` is not set
pub const DEFAULT_FAVORITES_TABLE: &str = "favorite_movies";
/// Language used when `MOVIE_SCOUT_LANGUAGE` is not set
pub const DEFAULT_LANGUAGE: &str = "en";
/// Request timeout used when `MOVIE_SCOUT_TIMEOUT_SECS` is not set
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Errors that can occur while reading the configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A required variable is not set
    #[error("Missing required environment variable {0}")]
    Missing(&'static str),

    /// A variable is set to something unusable
    #[error("Invalid config value for {field}: {reason}")]
    InvalidValue { field: &'static str, reason: String },
}

/// Connection settings of a Supabase favorites backend
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FavoritesConfig {
    pub url: String,
    pub anon_key: String,
    pub access_token: Option<String>,
    pub table: String,
}

/// Everything needed to construct a [`MovieScout`](crate::MovieScout)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Bearer token for the TMDB API
    pub tmdb_token: String,
    pub tmdb_base_url: String,
    /// Remote favorites backend; favorites stay in memory when absent
    pub favorites: Option<FavoritesConfig>,
    pub profile_id: Option<String>,
    pub language: String,
    pub timeout: Duration,
}

impl ClientConfig {
    /// Reads the configuration from the process environment
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Reads the configuration through `lookup`.
    ///
    /// Empty values count as unset.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Missing`] when `TMDB_API_KEY` is unset and
    /// [`ConfigError::InvalidValue`] when only one of `SUPABASE_URL` and
    /// `SUPABASE_ANON_KEY` is set or the timeout is not a positive number.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let read = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());

        let tmdb_token = read("TMDB_API_KEY").ok_or(ConfigError::Missing("TMDB_API_KEY"))?;

        let favorites = match (read("SUPABASE_URL"), read("SUPABASE_ANON_KEY")) {
            (Some(url), Some(anon_key)) => Some(FavoritesConfig {
                url,
                anon_key,
                access_token: read("SUPABASE_ACCESS_TOKEN"),
                table: read("FAVORITES_TABLE")
                    .unwrap_or_else(|| DEFAULT_FAVORITES_TABLE.to_string()),
            }),
            (None, None) => None,
            (Some(_), None) => {
                return Err(ConfigError::InvalidValue {
                    field: "SUPABASE_ANON_KEY",
                    reason: "must be set together with SUPABASE_URL".to_string(),
                });
            }
            (None, Some(_)) => {
                return Err(ConfigError::InvalidValue {
                    field: "SUPABASE_URL",
                    reason: "must be set together with SUPABASE_ANON_KEY".to_string(),
                });
            }
        };

        let timeout_secs = match read("MOVIE_SCOUT_TIMEOUT_SECS") {
            None => DEFAULT_TIMEOUT_SECS,
            Some(raw) => match raw.trim().parse::<u64>() {
                Ok(secs) if secs > 0 => secs,
                _ => {
                    return Err(ConfigError::InvalidValue {
                        field: "MOVIE_SCOUT_TIMEOUT_SECS",
                        reason: format!("expected a positive number of seconds, got {:?}", raw),
                    });
                }
            },
        };

        Ok(Self {
            tmdb_token,
            tmdb_base_url: read("TMDB_BASE_URL")
                .unwrap_or_else(|| DEFAULT_TMDB_BASE_URL.to_string()),
            favorites,
            profile_id: read("MOVIE_SCOUT_PROFILE_ID"),
            language: read("MOVIE_SCOUT_LANGUAGE").unwrap_or_else(|| DEFAULT_LANGUAGE.to_string()),
            timeout: Duration::from_secs(timeout_secs),
        })
    }
}
