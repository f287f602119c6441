//! Change notification module
//!
//! Stores publish [`StoreEvent`]s whenever their observable state changes so
//! a presentation layer can re-render without polling.

use crate::error_sink::ActiveError;
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};

/// Identifies the store that published an event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreKind {
    /// Movie lists (discover, search, similar)
    Movies,
    /// Single movie details
    Movie,
    Genres,
    Languages,
    Keywords,
}

impl StoreKind {
    pub fn as_str(self) -> &'static str {
        match self {
            StoreKind::Movies => "movies",
            StoreKind::Movie => "movie",
            StoreKind::Genres => "genres",
            StoreKind::Languages => "languages",
            StoreKind::Keywords => "keywords",
        }
    }
}

impl fmt::Display for StoreKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// State change published by a store
#[derive(Debug, Clone, PartialEq)]
pub enum StoreEvent {
    /// The store started or finished its last outstanding operation
    LoadingChanged { store: StoreKind, loading: bool },

    /// The displayed value of the store was replaced
    Updated { store: StoreKind },

    /// A movie was added to or removed from the favorites
    FavoriteChanged { movie_id: u64, is_favorite: bool },

    /// A new error was recorded by the error sink
    ErrorRaised(ActiveError),

    /// The recorded error was cleared
    ErrorCleared,
}

type Subscriber = Arc<dyn Fn(&StoreEvent) + Send + Sync>;

/// Fan-out of [`StoreEvent`]s to registered subscribers.
///
/// Subscribers are invoked synchronously, in registration order, on the task
/// that published the event.
#[derive(Default)]
pub struct EventHub {
    subscribers: Mutex<Vec<Subscriber>>,
}

impl EventHub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a callback that receives every subsequently published event
    pub fn subscribe<F>(&self, subscriber: F)
    where
        F: Fn(&StoreEvent) + Send + Sync + 'static,
    {
        self.subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(Arc::new(subscriber));
    }

    pub fn publish(&self, event: StoreEvent) {
        // Snapshot first so a subscriber may subscribe or publish re-entrantly
        let subscribers = self
            .subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();

        for subscriber in subscribers {
            subscriber(&event);
        }
    }
}
