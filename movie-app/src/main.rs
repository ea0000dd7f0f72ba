use std::process::ExitCode;

use movie_core::{
    shared_store, snapshot, AppConfig, FileStore, PaginatedFeed, PopularMovies, SharedStore,
    Store, TmdbClient,
};
use tokio::runtime::Runtime;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

fn main() -> ExitCode {
    init_tracing();

    let runtime = match Runtime::new() {
        Ok(runtime) => runtime,
        Err(e) => {
            error!(error = %e, "failed to initialise Tokio runtime");
            return ExitCode::FAILURE;
        }
    };

    let config = AppConfig::load();
    let store = load_store(&config);

    let client = match TmdbClient::new(config.provider.clone()) {
        Ok(client) => client,
        Err(e) => {
            error!(error = %e, "cannot build the movie provider client");
            return ExitCode::FAILURE;
        }
    };

    runtime.block_on(run_session(store, client));
    ExitCode::SUCCESS
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}

fn load_store(config: &AppConfig) -> SharedStore<FileStore> {
    let dir = config.storage.resolved_data_dir();
    info!(dir = %dir.display(), "loading favorites");
    shared_store(Store::new(FileStore::new(dir)))
}

async fn run_session(store: SharedStore<FileStore>, client: TmdbClient) {
    let state = snapshot(&store).await;

    let popular = PaginatedFeed::new(PopularMovies::new(client.clone()));
    popular.reset(None).await;
    let feed = popular.snapshot().await;
    match &feed.error {
        Some(e) => warn!(error = %e, "popular movies unavailable"),
        None => info!(
            loaded = feed.items.len(),
            total_pages = ?feed.total_pages,
            total_results = ?feed.total_results,
            "popular movies"
        ),
    }
    for movie in feed.items.iter().take(5) {
        let favorite = if state.favorites.is_favorite(movie.id) { "*" } else { " " };
        let year = movie
            .release_year()
            .map(|y| y.to_string())
            .unwrap_or_default();
        info!("{favorite} {} ({year})", movie.title);
    }

    for id in state.favorites.favorite_ids() {
        match client.movie_details(id).await {
            Ok(details) => info!(
                id,
                title = %details.title,
                genres = %details.genre_names().join(", "),
                "favorite"
            ),
            Err(e) => warn!(id, error = %e, "failed to load favorite details"),
        }
    }
}
