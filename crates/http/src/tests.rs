// Unit tests for the HTTP provider

use std::sync::Arc;
use std::time::Duration;

use imdbench_core::{
    BenchConfig, BenchmarkRunner, Operation, OperationError, OperationProvider,
    ProviderRegistry, QuerySpec, Target,
};
use serde_json::json;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use crate::{register_provider, HttpProvider, HTTP_TAG};

const MOVIE: &str = r#"{"data":{"movie":{"id":1,"title":"Heat"}}}"#;

fn target(server: &MockServer, path: &str) -> Target {
    Target {
        host: server.address().ip().to_string(),
        port: server.address().port(),
        path: path.to_string(),
    }
}

fn config(server: &MockServer, query: &str, ids_are_ints: bool) -> BenchConfig {
    BenchConfig::new(vec![vec!["1".to_string()], vec!["2".to_string()]])
        .with_target(target(server, "/graphql"))
        .with_query(QuerySpec {
            name: query.to_string(),
            text: "query movie($id: ID!) { movie(id: $id) { id title } }".to_string(),
            ids_are_ints,
        })
}

#[test]
fn test_endpoint() {
    let mut target = Target::default();
    assert_eq!(HttpProvider::endpoint(&target), "http://127.0.0.1:8080");

    target.path = "/graphql".to_string();
    assert_eq!(HttpProvider::endpoint(&target), "http://127.0.0.1:8080/graphql");

    target.path = "api/v1".to_string();
    assert_eq!(HttpProvider::endpoint(&target), "http://127.0.0.1:8080/api/v1");
}

#[test]
fn test_register_provider() {
    let mut registry = ProviderRegistry::new();
    assert!(!registry.has_provider(HTTP_TAG));

    register_provider(&mut registry);

    assert!(registry.has_provider(HTTP_TAG));
    assert_eq!(registry.create(HTTP_TAG).unwrap().name(), "http");
}

#[tokio::test]
async fn test_exec_posts_query_and_variables() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/graphql"))
        .and(header("content-type", "application/json"))
        .and(body_json(json!({
            "query": "query movie($id: ID!) { movie(id: $id) { id title } }",
            "variables": {"id": 1}
        })))
        .respond_with(ResponseTemplate::new(200).set_body_string(MOVIE))
        .expect(1)
        .mount(&server)
        .await;

    let config = config(&server, "get_movie", true);
    let mut op = HttpProvider::new().make_worker(&config).await.unwrap();

    let execution = op.exec(&["1".to_string()]).await.unwrap();
    assert_eq!(execution.sample, MOVIE);
    assert!(execution.latency > Duration::ZERO);

    op.close().await.unwrap();
}

#[tokio::test]
async fn test_error_status_is_an_operation_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .mount(&server)
        .await;

    let config = config(&server, "get_movie", false);
    let mut op = HttpProvider::new().make_worker(&config).await.unwrap();

    let err = op.exec(&["1".to_string()]).await.unwrap_err();
    match err {
        OperationError::Request(msg) => assert_eq!(msg, "HTTP 500: boom"),
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn test_exec_after_close_fails() {
    let server = MockServer::start().await;
    let config = config(&server, "get_movie", false);
    let mut op = HttpProvider::new().make_worker(&config).await.unwrap();

    op.close().await.unwrap();
    assert!(op.exec(&["1".to_string()]).await.is_err());
}

#[tokio::test]
async fn test_unknown_query_fails_worker_creation() {
    let server = MockServer::start().await;
    let config = config(&server, "drop_tables", false);

    match HttpProvider::new().make_worker(&config).await {
        Err(err) => assert!(matches!(err, OperationError::Connect(_))),
        Ok(_) => panic!("expected unknown query to be rejected"),
    }
}

#[test_log::test(tokio::test(flavor = "multi_thread", worker_threads = 2))]
async fn test_benchmark_against_mock_server() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/graphql"))
        .respond_with(ResponseTemplate::new(200).set_body_string(MOVIE))
        .mount(&server)
        .await;

    let config = config(&server, "get_movie", true)
        .with_concurrency(2)
        .with_warmup(Duration::from_millis(10))
        .with_duration(Duration::from_millis(50))
        .with_sample_count(3);

    let report = BenchmarkRunner::new(config, Arc::new(HttpProvider::new()))
        .run()
        .await
        .unwrap();

    assert!(report.queries > 0);
    assert_eq!(report.latency_counts.iter().sum::<u64>(), report.queries);
    assert_eq!(report.samples, vec![MOVIE; 3]);
}
