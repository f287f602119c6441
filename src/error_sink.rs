//! Error sink module
//!
//! Records the most recent error raised by any store so the presentation
//! layer can display it. Stores never return errors to their callers; they
//! report them here instead.

use crate::cache::CacheError;
use crate::catalog::{ApiError, InvalidMovieId};
use crate::events::{EventHub, StoreEvent};
use crate::favorites::FavoriteError;
use std::error::Error as StdError;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::warn;

/// Status code used when an error carries none of its own
pub const DEFAULT_STATUS_CODE: u16 = 500;

/// An error as presented to the user
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActiveError {
    pub message: String,
    pub status_code: u16,
}

/// The shapes of error a store can report
#[derive(Debug)]
pub enum ReportedError {
    /// A plain description, e.g. from input validation
    Message(String),

    /// A failure returned by a remote service
    Api(ApiError),

    /// Any other error
    Failure(Box<dyn StdError + Send + Sync>),
}

impl From<&str> for ReportedError {
    fn from(message: &str) -> Self {
        ReportedError::Message(message.to_string())
    }
}

impl From<String> for ReportedError {
    fn from(message: String) -> Self {
        ReportedError::Message(message)
    }
}

impl From<ApiError> for ReportedError {
    fn from(error: ApiError) -> Self {
        ReportedError::Api(error)
    }
}

impl From<InvalidMovieId> for ReportedError {
    fn from(error: InvalidMovieId) -> Self {
        ReportedError::Message(error.to_string())
    }
}

impl From<FavoriteError> for ReportedError {
    fn from(error: FavoriteError) -> Self {
        match error {
            FavoriteError::Backend(api) => ReportedError::Api(api),
            other => ReportedError::Message(other.to_string()),
        }
    }
}

impl From<CacheError> for ReportedError {
    fn from(error: CacheError) -> Self {
        ReportedError::Failure(Box::new(error))
    }
}

#[derive(Default)]
struct SinkState {
    active: Option<ActiveError>,
    is_custom: bool,
}

/// Process-wide record of the most recent error
pub struct ErrorSink {
    state: Mutex<SinkState>,
    events: Arc<EventHub>,
}

impl ErrorSink {
    pub fn new(events: Arc<EventHub>) -> Self {
        Self {
            state: Mutex::new(SinkState::default()),
            events,
        }
    }

    /// Records `error` as the active error, replacing any previous one.
    ///
    /// # Arguments
    ///
    /// * `error` - The error to record
    /// * `custom_code` - Status code for errors that carry none of their own;
    ///   defaults to 500
    ///
    /// Plain messages are flagged as custom errors. Remote status errors keep
    /// their own message and status code. Everything else is recorded with
    /// its display text and `custom_code`.
    pub fn set_error(&self, error: impl Into<ReportedError>, custom_code: Option<u16>) {
        let fallback_code = custom_code.unwrap_or(DEFAULT_STATUS_CODE);

        let (active, is_custom) = match error.into() {
            ReportedError::Message(message) => (
                ActiveError {
                    message,
                    status_code: fallback_code,
                },
                true,
            ),
            ReportedError::Api(ApiError::Status {
                status_code,
                message,
            }) => (
                ActiveError {
                    message,
                    status_code,
                },
                false,
            ),
            ReportedError::Api(other) => (
                ActiveError {
                    message: other.to_string(),
                    status_code: fallback_code,
                },
                false,
            ),
            ReportedError::Failure(failure) => (
                ActiveError {
                    message: failure.to_string(),
                    status_code: fallback_code,
                },
                false,
            ),
        };

        warn!(status_code = active.status_code, message = %active.message, "error recorded");

        {
            let mut state = self.lock();
            state.active = Some(active.clone());
            state.is_custom = is_custom;
        }
        self.events.publish(StoreEvent::ErrorRaised(active));
    }

    /// Returns the currently recorded error, if any
    pub fn active_error(&self) -> Option<ActiveError> {
        self.lock().active.clone()
    }

    /// Whether the recorded error was reported as a plain message
    pub fn is_custom_error(&self) -> bool {
        self.lock().is_custom
    }

    pub fn clear_error(&self) {
        {
            let mut state = self.lock();
            state.active = None;
            state.is_custom = false;
        }
        self.events.publish(StoreEvent::ErrorCleared);
    }

    fn lock(&self) -> MutexGuard<'_, SinkState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
