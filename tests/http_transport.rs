//! Integration tests for the HTTP endpoint.
//!
//! The router is driven in-process with `tower::ServiceExt::oneshot`, so no
//! socket is opened.

use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt;

use showcase_mcp::mcp::{router, McpServer};
use showcase_mcp::store::InMemoryStore;

const FIXTURE: &str = include_str!("fixtures/showcase.json");

fn app() -> Router {
    let store = InMemoryStore::from_snapshot_str(FIXTURE).expect("fixture should parse");
    router(Arc::new(McpServer::new(Arc::new(store))))
}

fn post(uri: &str, body: impl Into<Body>) -> Request<Body> {
    Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(body.into())
        .unwrap()
}

async fn send(request: Request<Body>) -> (StatusCode, axum::http::HeaderMap, Vec<u8>) {
    let response = app().oneshot(request).await.unwrap();
    let status = response.status();
    let headers = response.headers().clone();
    let body = response.into_body().collect().await.unwrap().to_bytes();
    (status, headers, body.to_vec())
}

fn json_body(body: &[u8]) -> Value {
    serde_json::from_slice(body).unwrap()
}

#[tokio::test]
async fn test_get_returns_discovery_document() {
    let request = Request::builder()
        .uri("/")
        .body(Body::empty())
        .unwrap();
    let (status, _, body) = send(request).await;

    assert_eq!(status, StatusCode::OK);
    let doc = json_body(&body);
    assert_eq!(doc["name"], "showcase-mcp");
    assert_eq!(doc["protocolVersion"], "2024-11-05");
    assert!(doc["description"].as_str().unwrap().contains("Read-only"));
    assert_eq!(doc["tools"].as_array().unwrap().len(), 8);
    assert!(doc["tools"][0].get("inputSchema").is_none());
}

#[tokio::test]
async fn test_post_ping_on_both_paths() {
    for path in ["/", "/mcp"] {
        let (status, headers, body) =
            send(post(path, r#"{"jsonrpc":"2.0","id":1,"method":"ping"}"#)).await;

        assert_eq!(status, StatusCode::OK, "{path}");
        assert!(headers[header::CONTENT_TYPE]
            .to_str()
            .unwrap()
            .starts_with("application/json"));
        assert_eq!(
            json_body(&body),
            json!({"jsonrpc": "2.0", "id": 1, "result": {}})
        );
    }
}

#[tokio::test]
async fn test_malformed_json_is_bad_request() {
    let (status, _, body) = send(post("/mcp", "{\"jsonrpc\": ")).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    let response = json_body(&body);
    assert_eq!(response["id"], Value::Null);
    assert_eq!(response["error"]["code"], -32700);
    assert_eq!(response["error"]["message"], "Parse error");
    assert!(response["error"]["data"].is_string());
}

#[tokio::test]
async fn test_notification_is_no_content() {
    let (status, _, body) = send(post(
        "/mcp",
        r#"{"jsonrpc":"2.0","method":"notifications/initialized"}"#,
    ))
    .await;

    assert_eq!(status, StatusCode::NO_CONTENT);
    assert!(body.is_empty());
}

#[tokio::test]
async fn test_batch_returns_array() {
    let (status, _, body) = send(post(
        "/mcp",
        r#"[{"jsonrpc":"2.0","id":1,"method":"ping"},
            {"jsonrpc":"2.0","method":"initialized"},
            {"jsonrpc":"2.0","id":2,"method":"tools/list"}]"#,
    ))
    .await;

    assert_eq!(status, StatusCode::OK);
    let responses = json_body(&body);
    let responses = responses.as_array().unwrap();
    assert_eq!(responses.len(), 2);
    assert_eq!(responses[0]["id"], 1);
    assert_eq!(responses[1]["id"], 2);
}

#[tokio::test]
async fn test_batch_of_notifications_is_empty_array() {
    let (status, _, body) = send(post("/mcp", r#"[{"jsonrpc":"2.0","method":"ping"}]"#)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json_body(&body), json!([]));
}

#[tokio::test]
async fn test_tool_call_over_http() {
    let (status, _, body) = send(post(
        "/mcp",
        json!({
            "jsonrpc": "2.0",
            "id": "call-1",
            "method": "tools/call",
            "params": {"name": "get_project_profile", "arguments": {"project_id": "p-chat"}}
        })
        .to_string(),
    ))
    .await;

    assert_eq!(status, StatusCode::OK);
    let response = json_body(&body);
    assert_eq!(response["id"], "call-1");
    let text = response["result"]["content"][0]["text"].as_str().unwrap();
    let output: Value = serde_json::from_str(text).unwrap();
    assert_eq!(output["profile_id"], "u-ada");
}

#[tokio::test]
async fn test_other_methods_not_allowed() {
    for method in [Method::PUT, Method::DELETE, Method::PATCH] {
        let request = Request::builder()
            .method(method.clone())
            .uri("/mcp")
            .body(Body::empty())
            .unwrap();
        let (status, _, body) = send(request).await;

        assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED, "{method}");
        assert_eq!(json_body(&body), json!({"error": "Method not allowed"}));
    }
}

#[tokio::test]
async fn test_cors_preflight() {
    let request = Request::builder()
        .method(Method::OPTIONS)
        .uri("/mcp")
        .header(header::ORIGIN, "https://client.example.com")
        .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
        .header(header::ACCESS_CONTROL_REQUEST_HEADERS, "content-type,apikey")
        .body(Body::empty())
        .unwrap();
    let (status, headers, body) = send(request).await;

    assert!(status.is_success());
    assert!(body.is_empty());
    assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_ORIGIN], "*");

    let methods = headers[header::ACCESS_CONTROL_ALLOW_METHODS]
        .to_str()
        .unwrap()
        .to_string();
    assert!(methods.contains("POST"));
    assert!(methods.contains("GET"));

    let allowed = headers[header::ACCESS_CONTROL_ALLOW_HEADERS]
        .to_str()
        .unwrap()
        .to_lowercase();
    assert!(allowed.contains("apikey"));
    assert!(allowed.contains("x-client-info"));
}

#[tokio::test]
async fn test_plain_options_is_empty() {
    let request = Request::builder()
        .method(Method::OPTIONS)
        .uri("/")
        .body(Body::empty())
        .unwrap();
    let (status, _, body) = send(request).await;

    assert!(status.is_success());
    assert!(body.is_empty());
}

#[tokio::test]
async fn test_cors_headers_on_responses() {
    let request = Request::builder()
        .method(Method::POST)
        .uri("/mcp")
        .header(header::ORIGIN, "https://client.example.com")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(r#"{"jsonrpc":"2.0","id":1,"method":"ping"}"#))
        .unwrap();
    let (status, headers, _) = send(request).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_ORIGIN], "*");
}
