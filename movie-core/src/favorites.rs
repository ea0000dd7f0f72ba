use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::StorageError;
use crate::storage::KeyValueStore;

/// Storage key holding the serialized favorites mapping.
pub const FAVORITES_KEY: &str = "favorites";

/// Movie id -> favorited flag. A missing id counts as `false`.
///
/// Serializes as a JSON object keyed by the stringified id, e.g. `{"603":true}`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FavoritesState {
    pub items: BTreeMap<u64, bool>,
}

impl FavoritesState {
    pub fn is_favorite(&self, id: u64) -> bool {
        self.items.get(&id).copied().unwrap_or(false)
    }

    /// Ids currently flagged `true`, ascending.
    pub fn favorite_ids(&self) -> Vec<u64> {
        self.items
            .iter()
            .filter_map(|(id, fav)| fav.then_some(*id))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.items.values().filter(|fav| **fav).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn toggled(&self, id: u64) -> Self {
        let mut next = self.clone();
        let flag = next.items.entry(id).or_insert(false);
        *flag = !*flag;
        next
    }
}

/// Persists [`FavoritesState`] under [`FAVORITES_KEY`].
///
/// The store does not own the state: each mutation takes the current state,
/// writes the result, and hands it back for the caller to adopt. Nothing is
/// returned unless the write succeeded, so memory and storage never drift.
#[derive(Debug, Clone)]
pub struct FavoritesStore<S> {
    storage: S,
}

impl<S: KeyValueStore> FavoritesStore<S> {
    pub fn new(storage: S) -> Self {
        Self { storage }
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    /// Reads the persisted mapping. Missing, unreadable or malformed content
    /// yields the empty mapping.
    pub fn hydrate(&self) -> FavoritesState {
        let raw = match self.storage.get(FAVORITES_KEY) {
            Ok(Some(raw)) => raw,
            Ok(None) => {
                debug!("no persisted favorites");
                return FavoritesState::default();
            }
            Err(e) => {
                warn!(error = %e, "failed to read favorites, starting empty");
                return FavoritesState::default();
            }
        };
        match serde_json::from_str::<FavoritesState>(&raw) {
            Ok(state) => state,
            Err(e) => {
                warn!(error = %e, "persisted favorites are malformed, starting empty");
                FavoritesState::default()
            }
        }
    }

    pub fn toggle(
        &self,
        current: &FavoritesState,
        id: u64,
    ) -> Result<FavoritesState, StorageError> {
        let next = current.toggled(id);
        let json = serde_json::to_string(&next)?;
        self.storage.set(FAVORITES_KEY, &json)?;
        debug!(id, favorite = next.is_favorite(id), "favorite toggled");
        Ok(next)
    }

    /// Drops every favorite and removes the storage key itself.
    pub fn clear(&self) -> Result<FavoritesState, StorageError> {
        self.storage.remove(FAVORITES_KEY)?;
        debug!("favorites cleared");
        Ok(FavoritesState::default())
    }
}
