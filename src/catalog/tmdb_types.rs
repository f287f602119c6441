/// TMDB API response types for deserialization.
///
/// These structures mirror the JSON envelopes of the TMDB API that do not map
/// one to one onto our catalog types.
use super::Genre;
use serde::Deserialize;

/// The error body TMDB returns with non-success responses.
#[derive(Debug, Deserialize)]
pub(super) struct TmdbErrorEnvelope {
    /// Human readable error description
    pub status_message: String,
}

/// The response from the genre list endpoint.
#[derive(Debug, Deserialize)]
pub(super) struct TmdbGenreList {
    pub genres: Vec<Genre>,
}
