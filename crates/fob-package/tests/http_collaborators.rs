//! `RemoteGenerator` and `HttpObjectStore` against a local HTTP listener.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::Router;
use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::IntoResponse;
use axum::routing::{post, put};
use fob_package::{
    ComponentGenerator, DesignLanguage, FileType, GenerateError, GenerationOptions,
    HttpObjectStore, NormalizedDescription, ObjectStore, RemoteGenerator, StoreError,
    StyleSetDefinitions, StyleSheetGenerator,
};
use serde_json::{Value, json};
use tokio::net::TcpListener;

/// Every request the listener received, in arrival order.
#[derive(Clone, Default)]
struct Received(Arc<Mutex<Vec<(String, HeaderMap, Bytes)>>>);

impl Received {
    fn push(&self, route: String, headers: HeaderMap, body: Bytes) {
        self.0.lock().unwrap().push((route, headers, body));
    }

    fn all(&self) -> Vec<(String, HeaderMap, Bytes)> {
        self.0.lock().unwrap().clone()
    }
}

async fn serve(router: Router) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{addr}")
}

async fn component(
    State(received): State<Received>,
    headers: HeaderMap,
    body: Bytes,
) -> impl IntoResponse {
    received.push("component".into(), headers, body);
    (
        [(header::CONTENT_TYPE, "application/json")],
        json!({
            "files": [{ "name": "home", "fileType": "js", "content": "export default 1;" }],
            "dependencies": { "react-helmet": "^6.1.0" },
        })
        .to_string(),
    )
}

async fn style_sheet_down() -> impl IntoResponse {
    (StatusCode::BAD_GATEWAY, "upstream unavailable")
}

async fn not_json() -> impl IntoResponse {
    (StatusCode::OK, "<html>oops</html>")
}

async fn upload(
    State(received): State<Received>,
    Path(key): Path<String>,
    headers: HeaderMap,
    body: Bytes,
) -> StatusCode {
    received.push(key, headers, body);
    StatusCode::CREATED
}

async fn upload_denied() -> impl IntoResponse {
    (StatusCode::FORBIDDEN, "bucket is read-only")
}

fn description() -> NormalizedDescription {
    NormalizedDescription::new(json!({ "name": "Home", "node": { "type": "element" } }))
}

fn generator(base_url: &str) -> RemoteGenerator {
    RemoteGenerator::new(base_url, Duration::from_secs(5)).unwrap()
}

#[tokio::test]
async fn test_generator_posts_description_and_options() {
    let received = Received::default();
    let base = serve(
        Router::new()
            .route("/component", post(component))
            .with_state(received.clone()),
    )
    .await;

    let options = GenerationOptions::component(
        StyleSetDefinitions::default(),
        DesignLanguage::default(),
        true,
    );
    let output = generator(&format!("{base}/"))
        .generate_component(&description(), &options)
        .await
        .unwrap();

    assert_eq!(output.files.len(), 1);
    assert_eq!(output.files[0].file_type, FileType::Js);
    assert_eq!(output.dependencies["react-helmet"], "^6.1.0");

    let calls = received.all();
    assert_eq!(calls.len(), 1);
    let (route, headers, body) = &calls[0];
    assert_eq!(route, "component");
    assert_eq!(headers[header::CONTENT_TYPE], "application/json");

    let body: Value = serde_json::from_slice(body).unwrap();
    assert_eq!(body["description"]["name"], "Home");
    assert_eq!(body["options"]["isRootComponent"], false);
    assert_eq!(body["options"]["projectStyleSet"]["fileName"], "style");
    assert_eq!(body["options"]["projectStyleSet"]["importFile"], true);
}

#[tokio::test]
async fn test_generator_non_success_status() {
    let base = serve(Router::new().route("/style-sheet", post(style_sheet_down))).await;

    let err = generator(&base)
        .generate_style_sheet(&description(), &GenerationOptions::root())
        .await
        .unwrap_err();

    match err {
        GenerateError::Status { status, body } => {
            assert_eq!(status, 502);
            assert_eq!(body, "upstream unavailable");
        }
        other => panic!("expected a status error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_generator_undecodable_body() {
    let base = serve(Router::new().route("/component", post(not_json))).await;

    let err = generator(&base)
        .generate_component(&description(), &GenerationOptions::default())
        .await
        .unwrap_err();

    assert!(matches!(err, GenerateError::Transport(ref e) if e.is_decode()), "{err:?}");
}

#[tokio::test]
async fn test_generator_unreachable() {
    // Bind then drop so nothing listens on the port.
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let err = generator(&format!("http://{addr}"))
        .generate_component(&description(), &GenerationOptions::default())
        .await
        .unwrap_err();

    assert!(matches!(err, GenerateError::Transport(_)));
}

#[tokio::test]
async fn test_store_uploads_with_bearer_token() {
    let received = Received::default();
    let base = serve(
        Router::new()
            .route("/bucket/{key}", put(upload))
            .with_state(received.clone()),
    )
    .await;

    let store = HttpObjectStore::new(format!("{base}/bucket/"), Some("s3cr3t".to_string()));
    store
        .put("home_1.js", b"export default 1;".to_vec())
        .await
        .unwrap();

    let calls = received.all();
    assert_eq!(calls.len(), 1);
    let (key, headers, body) = &calls[0];
    assert_eq!(key, "home_1.js");
    assert_eq!(headers[header::AUTHORIZATION], "Bearer s3cr3t");
    assert_eq!(headers[header::CONTENT_TYPE], "application/javascript");
    assert_eq!(&body[..], b"export default 1;");
}

#[tokio::test]
async fn test_store_without_token_sends_no_authorization() {
    let received = Received::default();
    let base = serve(
        Router::new()
            .route("/bucket/{key}", put(upload))
            .with_state(received.clone()),
    )
    .await;

    HttpObjectStore::new(format!("{base}/bucket"), None)
        .put("home_2.js", b"x".to_vec())
        .await
        .unwrap();

    let calls = received.all();
    assert!(!calls[0].1.contains_key(header::AUTHORIZATION));
}

#[tokio::test]
async fn test_store_rejected_upload() {
    let base = serve(Router::new().route("/bucket/{key}", put(upload_denied))).await;

    let err = HttpObjectStore::new(format!("{base}/bucket"), None)
        .put("home_3.js", b"x".to_vec())
        .await
        .unwrap_err();

    match err {
        StoreError::Status { key, status, body } => {
            assert_eq!(key, "home_3.js");
            assert_eq!(status, 403);
            assert_eq!(body, "bucket is read-only");
        }
        other => panic!("expected a status error, got {other:?}"),
    }
}
