pub mod config;
pub mod error;
pub mod favorites;
pub mod feed;
pub mod models;
pub mod provider;
pub mod search;
pub mod storage;
pub mod store;

pub use config::{AppConfig, ProviderConfig, StorageConfig, ACCESS_TOKEN_ENV};
pub use error::{ConfigError, ProviderError, StorageError};
pub use favorites::{FavoritesState, FavoritesStore, FAVORITES_KEY};
pub use feed::{
    FeedPhase, FeedSnapshot, FeedState, LoadOutcome, PageRequest, PageSource, PaginatedFeed,
};
pub use models::{Genre, Identified, Movie, MovieDetails, PageResponse};
pub use provider::{PopularMovies, SearchMovies, TmdbClient};
pub use search::SearchState;
pub use storage::{FileStore, KeyValueStore, MemoryStore};
pub use store::{
    dispatch, shared_store, snapshot, Action, AppState, SharedStore, Store, StoreEvent,
};
