use movie_core::provider::DEFAULT_POSTER_SIZE;
use movie_core::{PageSource, ProviderConfig, ProviderError, SearchMovies, TmdbClient};
use reqwest::Client;
use serde_json::json;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client_for(server: &MockServer) -> TmdbClient {
    let cfg = ProviderConfig {
        base_url: server.uri(),
        max_retries: 1,
        retry_backoff_ms: 10,
        ..ProviderConfig::default()
    };
    TmdbClient::with_client(Client::new(), cfg, "test-token")
}

#[tokio::test]
async fn popular_movies_sends_bearer_and_decodes_page() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/movie/popular"))
        .and(query_param("page", "2"))
        .and(query_param("language", "en-US"))
        .and(header("authorization", "Bearer test-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "page": 2,
            "results": [
                {"id": 550, "title": "Fight Club", "vote_average": 8.4, "release_date": "1999-10-15"},
                {"id": 680, "title": "Pulp Fiction", "vote_average": 8.5, "release_date": "1994-09-10"}
            ],
            "total_pages": 500,
            "total_results": 10000
        })))
        .expect(1)
        .mount(&server)
        .await;

    let page = client_for(&server).popular_movies(2).await.unwrap();
    assert_eq!(page.page, 2);
    assert_eq!(page.total_pages, 500);
    assert_eq!(page.total_results, 10000);
    let ids: Vec<u64> = page.results.iter().map(|m| m.id).collect();
    assert_eq!(ids, vec![550, 680]);
    assert_eq!(page.results[0].release_year(), Some(1999));
}

#[tokio::test]
async fn search_passes_query_and_tolerates_missing_rating() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/search/movie"))
        .and(query_param("query", "the matrix"))
        .and(query_param("page", "1"))
        .and(query_param("include_adult", "false"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "page": 1,
            "results": [{"id": 603, "title": "The Matrix"}],
            "total_pages": 1,
            "total_results": 1
        })))
        .mount(&server)
        .await;

    let page = client_for(&server).search_movies("the matrix", 1).await.unwrap();
    assert_eq!(page.results.len(), 1);
    assert_eq!(page.results[0].vote_average, None);
}

#[tokio::test]
async fn blank_search_term_skips_the_network() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let source = SearchMovies::new(client_for(&server));
    let page = source.fetch_page(Some("   "), 1).await.unwrap();
    assert!(page.results.is_empty());
    assert_eq!(page.total_pages, 0);
    let page = source.fetch_page(None, 1).await.unwrap();
    assert!(page.results.is_empty());
}

#[tokio::test]
async fn movie_details_include_genres() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/movie/603"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": 603,
            "title": "The Matrix",
            "runtime": 136,
            "tagline": "Welcome to the Real World.",
            "genres": [{"id": 28, "name": "Action"}, {"id": 878, "name": "Science Fiction"}]
        })))
        .mount(&server)
        .await;

    let details = client_for(&server).movie_details(603).await.unwrap();
    assert_eq!(details.runtime, Some(136));
    assert_eq!(details.genre_names(), vec!["Action", "Science Fiction"]);
}

#[tokio::test]
async fn client_error_surfaces_status_message_without_retry() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/movie/popular"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "status_code": 7,
            "status_message": "Invalid API key: You must be granted a valid key.",
            "success": false
        })))
        .expect(1)
        .mount(&server)
        .await;

    let err = client_for(&server).popular_movies(1).await.unwrap_err();
    match err {
        ProviderError::Status { status, message } => {
            assert_eq!(status, 401);
            assert!(message.starts_with("Invalid API key"));
        }
        other => panic!("unexpected error {other:?}"),
    }
}

#[tokio::test]
async fn server_error_is_retried_once() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/movie/popular"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(1)
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/movie/popular"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "page": 1,
            "results": [{"id": 1}],
            "total_pages": 1,
            "total_results": 1
        })))
        .expect(1)
        .mount(&server)
        .await;

    let page = client_for(&server).popular_movies(1).await.unwrap();
    assert_eq!(page.results.len(), 1);
}

#[tokio::test]
async fn malformed_body_is_a_decode_error() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/movie/popular"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
        .expect(1)
        .mount(&server)
        .await;

    let err = client_for(&server).popular_movies(1).await.unwrap_err();
    assert!(matches!(err, ProviderError::Decode(_)));
}

#[test]
fn missing_token_is_rejected() {
    let err = TmdbClient::new(ProviderConfig::default()).unwrap_err();
    assert!(matches!(err, ProviderError::MissingCredential));
}

#[test]
fn poster_url_joins_size_and_path() {
    let client = TmdbClient::with_client(Client::new(), ProviderConfig::default(), "t");
    assert_eq!(
        client.poster_url("/f89U3ADr1oiB1s9GkdPOEpXUk5H.jpg", DEFAULT_POSTER_SIZE),
        "https://image.tmdb.org/t/p/w500/f89U3ADr1oiB1s9GkdPOEpXUk5H.jpg"
    );
}
