//! REST surface driven through the axum router.

use assert_json_diff::assert_json_include;
use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;
use websource_runtime::acquisition::http_client::HttpClient;
use websource_runtime::acquisition::orchestrator::Orchestrator;
use websource_runtime::acquisition::strategy::{
    QueryValue, StrategyCatalog, StrategyDescriptor, UrlTransform,
};
use websource_runtime::acquisition::validity::ContentValidator;
use websource_runtime::config::BrowserSettings;
use websource_runtime::history::ErrorHistory;
use websource_runtime::renderer::{BrowserSlot, Renderer};
use websource_runtime::rest::router;
use websource_runtime::server::AppState;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn valid_page() -> String {
    format!(
        "<!DOCTYPE html>\n<html><head><title>Shop</title></head><body>{}</body></html>\n",
        "<section>Products and prices listed here.</section>".repeat(12)
    )
}

fn trap_page() -> String {
    format!(
        "<html><body><script src=\"/aes.js\"></script><p>Please wait...</p>{}</body></html>",
        "x".repeat(400)
    )
}

fn app() -> (Router, Arc<AppState>) {
    let catalog = StrategyCatalog::new(vec![
        StrategyDescriptor::http("direct", UrlTransform::Identity),
        StrategyDescriptor::http(
            "cache-bust",
            UrlTransform::AddQuery {
                key: "t".into(),
                value: QueryValue::Timestamp,
            },
        ),
    ]);
    let orchestrator = Orchestrator::new(
        HttpClient::new(5_000).unwrap(),
        catalog,
        ContentValidator::default(),
    );
    let state = Arc::new(AppState::new(orchestrator, None, ErrorHistory::new(5)));
    (router(Arc::clone(&state)), state)
}

fn encode(value: &str) -> String {
    url::form_urlencoded::byte_serialize(value.as_bytes()).collect()
}

async fn get(app: Router, uri: &str) -> (StatusCode, axum::http::HeaderMap, Vec<u8>) {
    let resp = app
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = resp.status();
    let headers = resp.headers().clone();
    let body = axum::body::to_bytes(resp.into_body(), usize::MAX)
        .await
        .unwrap()
        .to_vec();
    (status, headers, body)
}

fn json_body(body: &[u8]) -> Value {
    serde_json::from_slice(body).unwrap()
}

#[tokio::test]
async fn test_missing_url_is_bad_request() {
    let (app, _) = app();
    let (status, _, body) = get(app, "/api/protected").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json_body(&body)["error"]["code"], "E_INVALID_PARAMS");
}

#[tokio::test]
async fn test_unsupported_scheme_is_bad_request() {
    let (app, _) = app();
    let uri = format!("/api/protected?url={}", encode("ftp://example.com/x"));
    let (status, _, _) = get(app, &uri).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_download_contains_exact_content() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/shop"))
        .respond_with(ResponseTemplate::new(200).set_body_string(valid_page()))
        .mount(&server)
        .await;

    let (app, _) = app();
    let uri = format!("/api/protected?url={}", encode(&format!("{}/shop", server.uri())));
    let (status, headers, body) = get(app, &uri).await;

    assert_eq!(status, StatusCode::OK);
    let disposition = headers[header::CONTENT_DISPOSITION].to_str().unwrap();
    assert!(disposition.starts_with("attachment; filename=\"extracted-127.0.0.1-"));
    assert!(disposition.ends_with(".html\""));
    assert_eq!(headers["x-websource-strategy"], "direct");

    let text = String::from_utf8(body).unwrap();
    assert!(text.starts_with("<!--\nSource: "));
    assert!(text.contains("Strategy: direct\n"));
    assert!(text.ends_with(&valid_page()));
}

#[tokio::test]
async fn test_raw_returns_plain_text() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string(valid_page()))
        .mount(&server)
        .await;

    let (app, _) = app();
    let uri = format!("/api/recover?url={}&raw=true", encode(&server.uri()));
    let (status, headers, _) = get(app, &uri).await;

    assert_eq!(status, StatusCode::OK);
    assert!(headers[header::CONTENT_TYPE]
        .to_str()
        .unwrap()
        .starts_with("text/plain"));
    assert!(headers.get(header::CONTENT_DISPOSITION).is_none());
}

#[tokio::test]
async fn test_raw_accepts_numeric_flag() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string(valid_page()))
        .mount(&server)
        .await;

    let (app, _) = app();
    let uri = format!("/api/protected?url={}&raw=1", encode(&server.uri()));
    let (status, headers, body) = get(app, &uri).await;

    assert_eq!(status, StatusCode::OK);
    assert!(headers[header::CONTENT_TYPE]
        .to_str()
        .unwrap()
        .starts_with("text/plain"));
    assert!(String::from_utf8(body).unwrap().ends_with(&valid_page()));
}

#[tokio::test]
async fn test_malformed_raw_flag_is_json_bad_request() {
    let (app, _) = app();
    let uri = format!("/api/protected?url={}&raw=maybe", encode("https://example.com"));
    let (status, _, body) = get(app, &uri).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json_body(&body)["error"]["code"], "E_INVALID_PARAMS");
}

#[tokio::test]
async fn test_lazy_browser_launch_failure_reaches_history() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(403))
        .mount(&server)
        .await;

    let settings = BrowserSettings {
        settle_ms: 0,
        ..BrowserSettings::default()
    };
    let slot = Arc::new(BrowserSlot::with_launcher(settings, || async {
        Err::<Arc<dyn Renderer>, _>(anyhow::anyhow!("chromium not installed"))
    }));
    let orchestrator = Orchestrator::new(
        HttpClient::new(5_000).unwrap(),
        StrategyCatalog::new(vec![
            StrategyDescriptor::http("direct", UrlTransform::Identity),
            StrategyDescriptor::browser("browser"),
        ]),
        ContentValidator::default(),
    )
    .with_browser(Arc::clone(&slot));
    let state = Arc::new(AppState::new(orchestrator, Some(slot), ErrorHistory::new(10)));
    state.start().await;
    assert!(state.errors.is_empty());

    let app = router(Arc::clone(&state));
    let uri = format!("/api/protected?url={}", encode(&server.uri()));
    let (status, _, _) = get(app.clone(), &uri).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _, _) = get(app, &uri).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let stages: Vec<String> = state.errors.recent().into_iter().map(|e| e.stage).collect();
    assert_eq!(stages, ["resolve", "resolve", "browser"]);
    let browser = &state.errors.recent()[2];
    assert!(browser.message.contains("chromium not installed"));
}

#[tokio::test]
async fn test_not_found_is_recorded_in_health() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string(trap_page()))
        .mount(&server)
        .await;

    let (app, state) = app();
    let target = format!("{}/", server.uri());
    let uri = format!("/api/extract?url={}", encode(&target));
    let (status, _, body) = get(app.clone(), &uri).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    let err = json_body(&body);
    assert_eq!(err["error"]["code"], "E_NOT_FOUND");
    assert_eq!(err["error"]["attempts"], 2);
    assert!(err["error"]["message"]
        .as_str()
        .unwrap()
        .contains("might be protected"));
    assert_eq!(state.errors.len(), 1);

    let (status, _, body) = get(app, "/health").await;
    assert_eq!(status, StatusCode::OK);
    let health = json_body(&body);
    assert_json_include!(
        actual: health,
        expected: json!({
            "status": "ok",
            "browser": { "enabled": false },
            "recent_errors": [{ "stage": "resolve", "url": target }],
        })
    );
}

#[tokio::test]
async fn test_debug_issues_exactly_one_request() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("set-cookie", "__test=secret")
                .insert_header("x-served-by", "edge-1")
                .set_body_string(trap_page()),
        )
        .expect(1)
        .mount(&server)
        .await;

    let (app, _) = app();
    let uri = format!("/api/debug?url={}", encode(&server.uri()));
    let (status, _, body) = get(app, &uri).await;

    assert_eq!(status, StatusCode::OK);
    let report = json_body(&body);
    assert_eq!(report["status_code"], 200);
    assert_eq!(report["is_protected"], true);
    assert_eq!(report["is_bot_trap"], true);
    assert_eq!(report["headers"]["x-served-by"], "edge-1");
    assert!(report["headers"].get("set-cookie").is_none());
    assert!(report["content_preview"].as_str().unwrap().ends_with("..."));
}

#[tokio::test]
async fn test_debug_unreachable_is_internal_error() {
    let (app, state) = app();
    let uri = format!("/api/debug?url={}", encode("http://127.0.0.1:9/"));
    let (status, _, body) = get(app, &uri).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(json_body(&body)["error"]["code"], "E_INTERNAL");
    assert_eq!(state.errors.recent()[0].stage, "debug");
}

#[tokio::test]
async fn test_index_lists_endpoints() {
    let (app, _) = app();
    let (status, _, body) = get(app, "/").await;
    assert_eq!(status, StatusCode::OK);
    assert_json_include!(
        actual: json_body(&body),
        expected: json!({
            "endpoints": {
                "extract_source": "/api/protected?url=URL",
                "debug": "/api/debug?url=URL",
            }
        })
    );
}

#[tokio::test]
async fn test_info_lists_strategies() {
    let (app, _) = app();
    let (_, _, body) = get(app, "/api/info").await;
    let info = json_body(&body);
    assert_eq!(info["strategies"], json!(["direct", "cache-bust"]));
    assert_eq!(info["min_content_length"], 100);
}
