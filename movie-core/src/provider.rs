//! TMDB client and the two page sources built on it.

use std::future::Future;
use std::time::Duration;

use reqwest::{Client, ClientBuilder};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::{debug, warn};
use url::Url;

use crate::config::ProviderConfig;
use crate::error::ProviderError;
use crate::feed::PageSource;
use crate::models::{Movie, MovieDetails, PageResponse};

const USER_AGENT: &str = "moviedeck/0.1";
pub const DEFAULT_POSTER_SIZE: &str = "w500";

#[derive(Debug, Deserialize)]
struct ErrorBody {
    status_message: Option<String>,
}

#[derive(Debug, Clone)]
pub struct TmdbClient {
    http: Client,
    config: ProviderConfig,
    token: String,
}

impl TmdbClient {
    /// Builds a client from config. Fails when no access token is available.
    pub fn new(config: ProviderConfig) -> Result<Self, ProviderError> {
        let token = config
            .access_token
            .clone()
            .filter(|t| !t.trim().is_empty())
            .ok_or(ProviderError::MissingCredential)?;
        let http = ClientBuilder::new()
            .timeout(config.request_timeout())
            .user_agent(USER_AGENT)
            .build()?;
        Ok(Self::with_client(http, config, token))
    }

    pub fn with_client(http: Client, config: ProviderConfig, token: impl Into<String>) -> Self {
        Self {
            http,
            config,
            token: token.into(),
        }
    }

    pub fn config(&self) -> &ProviderConfig {
        &self.config
    }

    pub async fn popular_movies(&self, page: u32) -> Result<PageResponse<Movie>, ProviderError> {
        let url = self.endpoint(
            "movie/popular",
            &[
                ("language", self.config.language.clone()),
                ("page", page.to_string()),
            ],
        )?;
        self.get_json(url).await
    }

    pub async fn search_movies(
        &self,
        query: &str,
        page: u32,
    ) -> Result<PageResponse<Movie>, ProviderError> {
        let url = self.endpoint(
            "search/movie",
            &[
                ("query", query.to_owned()),
                ("include_adult", "false".to_owned()),
                ("language", self.config.language.clone()),
                ("page", page.to_string()),
            ],
        )?;
        self.get_json(url).await
    }

    pub async fn movie_details(&self, id: u64) -> Result<MovieDetails, ProviderError> {
        let url = self.endpoint(
            &format!("movie/{id}"),
            &[("language", self.config.language.clone())],
        )?;
        self.get_json(url).await
    }

    /// Full image URL for a `poster_path` such as `/abc.jpg`.
    pub fn poster_url(&self, path: &str, size: &str) -> String {
        format!(
            "{}/{}/{}",
            self.config.image_base_url.trim_end_matches('/'),
            size,
            path.trim_start_matches('/')
        )
    }

    fn endpoint(&self, path: &str, query: &[(&str, String)]) -> Result<Url, ProviderError> {
        let mut url = Url::parse(&format!(
            "{}/{}",
            self.config.base_url.trim_end_matches('/'),
            path
        ))?;
        {
            let mut pairs = url.query_pairs_mut();
            for (key, value) in query {
                pairs.append_pair(key, value);
            }
        }
        Ok(url)
    }

    async fn get_json<T: DeserializeOwned>(&self, url: Url) -> Result<T, ProviderError> {
        let mut attempt: u32 = 0;
        loop {
            match self.get_once(&url).await {
                Ok(value) => return Ok(value),
                Err(err) if err.is_retryable() && attempt < self.config.max_retries => {
                    attempt += 1;
                    let backoff =
                        Duration::from_millis(self.config.retry_backoff_ms * u64::from(attempt));
                    warn!(url = %url.path(), attempt, error = %err, "request failed, retrying");
                    tokio::time::sleep(backoff).await;
                }
                Err(err) => return Err(err),
            }
        }
    }

    async fn get_once<T: DeserializeOwned>(&self, url: &Url) -> Result<T, ProviderError> {
        debug!(url = %url.path(), "provider request");
        let response = self
            .http
            .get(url.clone())
            .bearer_auth(&self.token)
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await?;
        let status = response.status();
        let bytes = response.bytes().await?;
        if !status.is_success() {
            let message = serde_json::from_slice::<ErrorBody>(&bytes)
                .ok()
                .and_then(|body| body.status_message)
                .unwrap_or_else(|| status.canonical_reason().unwrap_or("error").to_owned());
            return Err(ProviderError::Status {
                status: status.as_u16(),
                message,
            });
        }
        Ok(serde_json::from_slice(&bytes)?)
    }
}

/// The popular movies listing; ignores the feed term.
#[derive(Debug, Clone)]
pub struct PopularMovies {
    client: TmdbClient,
}

impl PopularMovies {
    pub fn new(client: TmdbClient) -> Self {
        Self { client }
    }
}

impl PageSource for PopularMovies {
    type Item = Movie;

    fn fetch_page(
        &self,
        _term: Option<&str>,
        page: u32,
    ) -> impl Future<Output = Result<PageResponse<Movie>, ProviderError>> + Send {
        self.client.popular_movies(page)
    }
}

/// Title search. A blank term answers with an empty page without hitting
/// the network.
#[derive(Debug, Clone)]
pub struct SearchMovies {
    client: TmdbClient,
}

impl SearchMovies {
    pub fn new(client: TmdbClient) -> Self {
        Self { client }
    }
}

impl PageSource for SearchMovies {
    type Item = Movie;

    fn fetch_page(
        &self,
        term: Option<&str>,
        page: u32,
    ) -> impl Future<Output = Result<PageResponse<Movie>, ProviderError>> + Send {
        let query = term
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(str::to_owned);
        async move {
            match query {
                Some(query) => self.client.search_movies(&query, page).await,
                None => Ok(PageResponse::empty()),
            }
        }
    }
}
