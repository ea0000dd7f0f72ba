//! Global state container: search term and favorites behind one dispatch
//! entry point.
//!
//! A [`Store`] is built once at startup and handed to every consumer, either
//! directly or as a [`SharedStore`] when async tasks need it too.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::{broadcast, RwLock};
use tracing::debug;

use crate::error::StorageError;
use crate::favorites::{FavoritesState, FavoritesStore};
use crate::search::SearchState;
use crate::storage::KeyValueStore;

/// Everything a view can change through [`Store::dispatch`].
///
/// Deserializes from `{"type": "TOGGLE_FAVORITE", "id": 603}` style payloads;
/// an unrecognized `type` becomes [`Action::Unknown`], which is a no-op.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Action {
    ChangeSearch { term: String },
    ToggleFavorite { id: u64 },
    ClearFavorites,
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AppState {
    pub search: SearchState,
    pub favorites: FavoritesState,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreEvent {
    SearchChanged(String),
    FavoritesChanged(FavoritesState),
}

const EVENT_CAPACITY: usize = 64;

pub struct Store<S> {
    state: AppState,
    favorites: FavoritesStore<S>,
    events: broadcast::Sender<StoreEvent>,
}

impl<S: KeyValueStore> Store<S> {
    /// Hydrates favorites from `storage`; the search term starts empty.
    pub fn new(storage: S) -> Self {
        let favorites = FavoritesStore::new(storage);
        let state = AppState {
            search: SearchState::default(),
            favorites: favorites.hydrate(),
        };
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        debug!(favorites = state.favorites.len(), "store initialised");
        Self {
            state,
            favorites,
            events,
        }
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    pub fn search_term(&self) -> &str {
        &self.state.search.term
    }

    pub fn favorites(&self) -> &FavoritesState {
        &self.state.favorites
    }

    pub fn storage(&self) -> &S {
        self.favorites.storage()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<StoreEvent> {
        self.events.subscribe()
    }

    /// Applies `action`. Favorites changes are written to storage before this
    /// returns; if the write fails the state is left untouched.
    pub fn dispatch(&mut self, action: Action) -> Result<&AppState, StorageError> {
        let event = match action {
            Action::ChangeSearch { term } => {
                self.state.search = self.state.search.set_term(term);
                StoreEvent::SearchChanged(self.state.search.term.clone())
            }
            Action::ToggleFavorite { id } => {
                self.state.favorites = self.favorites.toggle(&self.state.favorites, id)?;
                StoreEvent::FavoritesChanged(self.state.favorites.clone())
            }
            Action::ClearFavorites => {
                self.state.favorites = self.favorites.clear()?;
                StoreEvent::FavoritesChanged(self.state.favorites.clone())
            }
            Action::Unknown => {
                debug!("ignoring unknown action");
                return Ok(&self.state);
            }
        };
        // nobody listening is fine
        let _ = self.events.send(event);
        Ok(&self.state)
    }
}

pub type SharedStore<S> = Arc<RwLock<Store<S>>>;

pub fn shared_store<S: KeyValueStore>(store: Store<S>) -> SharedStore<S> {
    Arc::new(RwLock::new(store))
}

/// Dispatches through a shared handle and returns the resulting snapshot.
pub async fn dispatch<S: KeyValueStore>(
    store: &SharedStore<S>,
    action: Action,
) -> Result<AppState, StorageError> {
    let mut guard = store.write().await;
    guard.dispatch(action).cloned()
}

pub async fn snapshot<S: KeyValueStore>(store: &SharedStore<S>) -> AppState {
    store.read().await.state().clone()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn actions_decode_from_tagged_json() {
        let a: Action = serde_json::from_str(r#"{"type":"CHANGE_SEARCH","term":"alien"}"#).unwrap();
        assert_eq!(a, Action::ChangeSearch { term: "alien".into() });
        let a: Action = serde_json::from_str(r#"{"type":"TOGGLE_FAVORITE","id":603}"#).unwrap();
        assert_eq!(a, Action::ToggleFavorite { id: 603 });
        let a: Action = serde_json::from_str(r#"{"type":"CLEAR_FAVORITES"}"#).unwrap();
        assert_eq!(a, Action::ClearFavorites);
    }

    #[test]
    fn unrecognized_action_kind_decodes_as_unknown() {
        let a: Action = serde_json::from_str(r#"{"type":"SET_THEME"}"#).unwrap();
        assert_eq!(a, Action::Unknown);
    }
}
