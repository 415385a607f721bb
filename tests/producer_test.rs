use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde_json::{json, Value};
use url::Url;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use kafkabridge::producer::{ProducerClient, ProducerError, ProducerOptions, RecordRequest};

const RECORDS_PATH: &str = "/kafka/v3/clusters/abc-r2d2/topics/public.hello/records";

fn options_for(server: &MockServer) -> ProducerOptions {
    ProducerOptions::new(&server.uri(), "abc-r2d2").with_credentials("key", "secret")
}

fn basic(user_secret: &str) -> String {
    format!("Basic {}", STANDARD.encode(user_secret))
}

async fn last_body(server: &MockServer) -> Value {
    let requests = server.received_requests().await.unwrap();
    let request = requests.last().unwrap();
    serde_json::from_slice(&request.body).unwrap()
}

fn decode(data: &Value) -> String {
    String::from_utf8(STANDARD.decode(data.as_str().unwrap()).unwrap()).unwrap()
}

/// 200 with a delivery report returns the parsed response
#[tokio::test]
async fn test_produce_success() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(RECORDS_PATH))
        .and(header("content-type", "application/json"))
        .and(header("authorization", basic("key:secret").as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "error_code": 200,
            "cluster_id": "abc-r2d2",
            "topic_name": "public.hello",
            "partition_id": 1,
            "offset": 42,
            "timestamp": "2024-05-01T10:30:00.000Z"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = ProducerClient::new(options_for(&server)).unwrap();
    let response = client
        .produce(RecordRequest::new("public.hello", "Hello Hase!").with_key("k1"))
        .await
        .unwrap();

    assert_eq!(response.offset, 42);
    assert_eq!(response.partition_id, 1);
    assert_eq!(response.topic_name, "public.hello");

    let body = last_body(&server).await;
    assert_eq!(body["key"]["type"], "BINARY");
    assert_eq!(decode(&body["key"]["data"]), "k1");
    assert_eq!(body["value"]["type"], "STRING");
    assert_eq!(body["value"]["data"], "Hello Hase!");
}

/// Non-200 status is a client response error carrying the status
#[tokio::test]
async fn test_produce_forbidden() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(RECORDS_PATH))
        .respond_with(ResponseTemplate::new(403).set_body_string("forbidden"))
        .mount(&server)
        .await;

    let client = ProducerClient::new(options_for(&server)).unwrap();
    let err = client
        .produce(RecordRequest::new("public.hello", "x"))
        .await
        .unwrap_err();

    assert!(err.is_client_response());
    assert_eq!(err.status_code(), Some(403));
    assert!(matches!(err, ProducerError::UnexpectedStatus { status: 403, .. }));
}

/// Embedded error code other than 200 is rejected even with HTTP 200
#[tokio::test]
async fn test_produce_embedded_error_code() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(RECORDS_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "error_code": 40403,
            "message": "topic not found"
        })))
        .mount(&server)
        .await;

    let client = ProducerClient::new(options_for(&server)).unwrap();
    let err = client
        .produce(RecordRequest::new("public.hello", "x"))
        .await
        .unwrap_err();

    assert!(err.is_client_response());
    assert_eq!(err.status_code(), Some(40403));
    assert!(err.to_string().contains("topic not found"));
}

/// Unparseable body is reported with the raw body
#[tokio::test]
async fn test_produce_unparseable_response() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(RECORDS_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>gateway</html>"))
        .mount(&server)
        .await;

    let client = ProducerClient::new(options_for(&server)).unwrap();
    let err = client
        .produce(RecordRequest::new("public.hello", "x"))
        .await
        .unwrap_err();

    assert!(err.is_client_response());
    match err {
        ProducerError::InvalidResponse { body } => assert_eq!(body, "<html>gateway</html>"),
        other => panic!("unexpected error: {other}"),
    }
}

/// CloudEvent records carry the envelope and the content-type header
#[tokio::test]
async fn test_produce_cloud_event() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(RECORDS_PATH))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"error_code": 200, "offset": 7})),
        )
        .mount(&server)
        .await;

    let client = ProducerClient::new(options_for(&server)).unwrap();
    client
        .produce(
            RecordRequest::new("public.hello", r#"{"action":"test/me"}"#)
                .as_cloud_event("//testing/event", "demo.created")
                .with_subject("my.subject")
                .with_header("origin", "test"),
        )
        .await
        .unwrap();

    let body = last_body(&server).await;
    assert_eq!(body["value"]["type"], "JSON");
    let event = &body["value"]["data"];
    assert_eq!(event["specversion"], "1.0");
    assert_eq!(event["source"], "//testing/event");
    assert_eq!(event["type"], "demo.created");
    assert_eq!(event["subject"], "my.subject");
    assert_eq!(event["datacontenttype"], "application/json");
    assert_eq!(event["data"]["action"], "test/me");

    let headers = body["headers"].as_array().unwrap();
    let content_type = headers
        .iter()
        .find(|h| h["name"] == "content-type")
        .unwrap();
    assert_eq!(
        decode(&content_type["value"]),
        "application/cloudevents+json; charset=UTF-8"
    );
    let origin = headers.iter().find(|h| h["name"] == "origin").unwrap();
    assert_eq!(decode(&origin["value"]), "test");
}

/// Topic URL credentials override the configured key and the URL is
/// sent without them
#[tokio::test]
async fn test_produce_with_topic_url_override() {
    let server = MockServer::start().await;
    let server_url = Url::parse(&server.uri()).unwrap();
    let topic_url = Url::parse(&format!(
        "http://user1@127.0.0.1:{}/kafka/v3/clusters/abc-r2d2/topics/public.hello",
        server_url.port().unwrap()
    ))
    .unwrap();

    Mock::given(method("POST"))
        .and(path(
            "/kafka/v3/clusters/abc-r2d2/topics/public.welcome/records",
        ))
        .and(header("authorization", basic("user1:s3cr3t").as_str()))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"error_code": 200, "offset": 1})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let options = ProducerOptions::default()
        .with_credentials("ignored", "s3cr3t")
        .with_topic_url(topic_url);
    let client = ProducerClient::new(options).unwrap();

    let response = client
        .produce(RecordRequest::new("public.welcome", "x"))
        .await
        .unwrap();
    assert_eq!(response.offset, 1);
}

/// Unreachable proxy is a client response error wrapping the transport error
#[tokio::test]
async fn test_produce_transport_error() {
    let options = ProducerOptions::new("http://127.0.0.1:1", "abc-r2d2").with_http_timeout_secs(2);
    let client = ProducerClient::new(options).unwrap();

    let err = client
        .produce(RecordRequest::new("public.hello", "x"))
        .await
        .unwrap_err();

    assert!(matches!(err, ProducerError::Transport(_)));
    assert!(err.is_client_response());
    assert_eq!(err.status_code(), None);
}
