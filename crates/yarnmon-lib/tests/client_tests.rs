//! Integration tests for the paginated monitoring client
//!
//! The monitoring backend is stood in for by mockito so pagination, retry
//! and partial-failure behavior can be exercised without credentials.

use mockito::Matcher;
use std::sync::Arc;
use yarnmon_lib::query::{TimeSeriesQuery, CONTAINERS_METRIC, MEMORY_METRIC};
use yarnmon_lib::{ClientConfig, MonitoringClient, StaticTokenProvider, TimeWindow, YarnMetrics};

const PROJECT: &str = "test-proj";

fn test_client(endpoint: String) -> MonitoringClient {
    let config = ClientConfig {
        endpoint,
        // keep retries fast in tests
        initial_backoff_ms: 1,
        max_backoff_secs: 1,
        ..Default::default()
    };
    MonitoringClient::new(config, PROJECT, Arc::new(StaticTokenProvider::new("test-token")))
        .unwrap()
}

fn containers_query() -> TimeSeriesQuery {
    TimeSeriesQuery::dataproc(CONTAINERS_METRIC, "etl-cluster", TimeWindow::from_minutes(60))
}

fn int_series_body(values: &[i64], next_page_token: Option<&str>) -> String {
    let series: Vec<String> = values
        .iter()
        .map(|v| {
            format!(
                r#"{{
                    "metric": {{"type": "dataproc.googleapis.com/cluster/yarn/containers"}},
                    "points": [{{
                        "interval": {{"endTime": "2024-05-01T12:00:00Z"}},
                        "value": {{"int64Value": "{v}"}}
                    }}]
                }}"#
            )
        })
        .collect();

    match next_page_token {
        Some(token) => format!(
            r#"{{"timeSeries": [{}], "nextPageToken": "{}"}}"#,
            series.join(","),
            token
        ),
        None => format!(r#"{{"timeSeries": [{}]}}"#, series.join(",")),
    }
}

#[tokio::test]
async fn test_read_follows_pagination() {
    let mut server = mockito::Server::new_async().await;
    let path = format!("/projects/{PROJECT}/timeSeries");

    let first_page = server
        .mock("GET", path.as_str())
        .match_header("authorization", "Bearer test-token")
        .match_query(Matcher::UrlEncoded(
            "filter".into(),
            containers_query().filter(),
        ))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(int_series_body(&[12, 3], Some("page-2")))
        .create_async()
        .await;

    // Registered last so it takes precedence when the token is present
    let second_page = server
        .mock("GET", path.as_str())
        .match_query(Matcher::UrlEncoded("pageToken".into(), "page-2".into()))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(int_series_body(&[1], None))
        .create_async()
        .await;

    let client = test_client(server.url());
    let series = client.read_time_series(&containers_query()).await;

    assert_eq!(series.len(), 3);
    assert_eq!(series[0].latest().unwrap().value.int64_value, Some(12));
    assert_eq!(series[2].latest().unwrap().value.int64_value, Some(1));

    first_page.assert_async().await;
    second_page.assert_async().await;
}

/// mockito cannot serve different responses to identical requests, so the
/// 503-then-200 sequence uses a bare listener speaking just enough HTTP/1.1.
#[tokio::test]
async fn test_transient_error_then_success() {
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let ok_body = int_series_body(&[7], None);
    let server = tokio::spawn(async move {
        let responses = [
            ("503 Service Unavailable", "backend unavailable".to_string()),
            ("200 OK", ok_body),
        ];
        for (status, payload) in responses {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = [0u8; 4096];
            let _ = socket.read(&mut buf).await.unwrap();
            let response = format!(
                "HTTP/1.1 {status}\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{payload}",
                payload.len()
            );
            socket.write_all(response.as_bytes()).await.unwrap();
        }
    });

    let client = test_client(format!("http://{addr}"));
    let series = client.read_time_series(&containers_query()).await;

    assert_eq!(series.len(), 1);
    assert_eq!(series[0].latest().unwrap().value.int64_value, Some(7));
    server.await.unwrap();
}

#[tokio::test]
async fn test_transient_error_is_retried_to_exhaustion() {
    let mut server = mockito::Server::new_async().await;
    let path = format!("/projects/{PROJECT}/timeSeries");

    // Three hits prove the two retries happened before giving up
    let unavailable = server
        .mock("GET", path.as_str())
        .match_query(Matcher::Any)
        .with_status(503)
        .with_body("backend unavailable")
        .expect(3)
        .create_async()
        .await;

    let client = test_client(server.url());
    let series = client.read_time_series(&containers_query()).await;

    assert!(series.is_empty());
    unavailable.assert_async().await;
}

#[tokio::test]
async fn test_fatal_error_is_not_retried() {
    let mut server = mockito::Server::new_async().await;
    let path = format!("/projects/{PROJECT}/timeSeries");

    let bad_request = server
        .mock("GET", path.as_str())
        .match_query(Matcher::Any)
        .with_status(400)
        .with_body(r#"{"error": {"message": "invalid filter"}}"#)
        .expect(1)
        .create_async()
        .await;

    let client = test_client(server.url());
    let series = client.read_time_series(&containers_query()).await;

    // The failure is swallowed and nothing was accumulated
    assert!(series.is_empty());
    bad_request.assert_async().await;
}

#[tokio::test]
async fn test_exhausted_retries_return_partial_results() {
    let mut server = mockito::Server::new_async().await;
    let path = format!("/projects/{PROJECT}/timeSeries");

    let first_page = server
        .mock("GET", path.as_str())
        .match_query(Matcher::AllOf(vec![Matcher::UrlEncoded(
            "filter".into(),
            containers_query().filter(),
        )]))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(int_series_body(&[12, 3], Some("page-2")))
        .create_async()
        .await;

    let broken_page = server
        .mock("GET", path.as_str())
        .match_query(Matcher::UrlEncoded("pageToken".into(), "page-2".into()))
        .with_status(503)
        .with_body("backend unavailable")
        .expect(3)
        .create_async()
        .await;

    let client = test_client(server.url());
    let series = client.read_time_series(&containers_query()).await;

    // First page survives the second page's failure
    assert_eq!(series.len(), 2);
    first_page.assert_async().await;
    broken_page.assert_async().await;
}

#[tokio::test]
async fn test_memory_snapshot_end_to_end() {
    let mut server = mockito::Server::new_async().await;
    let path = format!("/projects/{PROJECT}/timeSeries");

    let body = r#"{
        "timeSeries": [
            {
                "metric": {"type": "dataproc.googleapis.com/cluster/yarn/memory_size",
                           "labels": {"status": "available"}},
                "points": [{"interval": {"endTime": "2024-05-01T12:00:00Z"},
                            "value": {"doubleValue": 4.0}}]
            },
            {
                "metric": {"type": "dataproc.googleapis.com/cluster/yarn/memory_size",
                           "labels": {"status": "allocated"}},
                "points": [{"interval": {"endTime": "2024-05-01T12:00:00Z"},
                            "value": {"doubleValue": 2.5}}]
            },
            {
                "metric": {"type": "dataproc.googleapis.com/cluster/yarn/memory_size",
                           "labels": {"status": "reserved"}},
                "points": [{"interval": {"endTime": "2024-05-01T12:00:00Z"},
                            "value": {"doubleValue": 0.5}}]
            }
        ]
    }"#;

    let mock = server
        .mock("GET", path.as_str())
        .match_query(Matcher::AllOf(vec![
            Matcher::UrlEncoded(
                "filter".into(),
                TimeSeriesQuery::dataproc(MEMORY_METRIC, "etl-cluster", TimeWindow::default())
                    .filter(),
            ),
            Matcher::Regex("interval.startTime".into()),
            Matcher::Regex("interval.endTime".into()),
        ]))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(body)
        .create_async()
        .await;

    let metrics = YarnMetrics::new(test_client(server.url()), "etl-cluster");
    let snapshot = metrics.memory_metrics().await.unwrap();

    assert_eq!(snapshot.available, 4096.0);
    assert_eq!(snapshot.allocated, 2560.0);
    assert_eq!(snapshot.reserved, 512.0);

    mock.assert_async().await;
}

#[tokio::test]
async fn test_empty_backend_response_is_missing_series() {
    let mut server = mockito::Server::new_async().await;
    let path = format!("/projects/{PROJECT}/timeSeries");

    server
        .mock("GET", path.as_str())
        .match_query(Matcher::Any)
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body("{}")
        .create_async()
        .await;

    let metrics = YarnMetrics::new(test_client(server.url()), "etl-cluster");
    let err = metrics.container_metrics().await.unwrap_err();

    assert!(matches!(
        err,
        yarnmon_lib::MetricsError::MissingSeries { index: 0, .. }
    ));
}
