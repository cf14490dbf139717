//! HTTP surface.
//!
//! - `GET /` answers with a fixed liveness text.
//! - `POST /build-package` runs one build and answers `{id, url}` or
//!   `{error}` with a fixed message.

use std::net::SocketAddr;

use axum::body::Bytes;
use axum::extract::rejection::BytesRejection;
use axum::extract::{DefaultBodyLimit, State};
use axum::http::header::{ACCEPT, CONTENT_TYPE, ORIGIN};
use axum::http::{HeaderMap, HeaderName, Method, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use fob_package::{PackagePipeline, PackageRequest, PipelineError, RequestRejection};
use serde::Serialize;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};

use crate::error::{Result, ServerError};

/// Body of `GET /`.
pub const LIVENESS_TEXT: &str = "Package Server";

pub const BODY_TOO_LARGE_MESSAGE: &str = "Request body too large";

#[derive(Clone)]
struct AppState {
    pipeline: PackagePipeline,
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: &'static str,
}

fn error_response(status: StatusCode, message: &'static str) -> Response {
    (status, Json(ErrorBody { error: message })).into_response()
}

/// The service router. Hosts that manage their own listener mount this.
pub fn router(pipeline: PackagePipeline, body_limit: usize) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/build-package", post(build_package))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(cors())
        .with_state(AppState { pipeline })
}

fn cors() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([
            ORIGIN,
            HeaderName::from_static("x-requested-with"),
            CONTENT_TYPE,
            ACCEPT,
        ])
}

async fn index() -> &'static str {
    LIVENESS_TEXT
}

async fn build_package(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: std::result::Result<Bytes, BytesRejection>,
) -> Response {
    let body = match body {
        Ok(body) => body,
        Err(rejection) if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE => {
            tracing::info!("request body over the size limit");
            return error_response(StatusCode::PAYLOAD_TOO_LARGE, BODY_TOO_LARGE_MESSAGE);
        }
        Err(rejection) => {
            tracing::info!(error = %rejection, "failed to read request body");
            return error_response(StatusCode::BAD_REQUEST, RequestRejection::Malformed.message());
        }
    };

    // Bodies that are not declared as JSON are not parsed at all.
    let request = if is_json(&headers) {
        PackageRequest::from_slice(&body)
    } else {
        Ok(PackageRequest::default())
    };

    let request = match request {
        Ok(request) => request,
        Err(rejection) => {
            tracing::info!(%rejection, "request body does not match the schema");
            return error_response(StatusCode::BAD_REQUEST, rejection.message());
        }
    };

    match state.pipeline.build(request).await {
        Ok(package) => (StatusCode::OK, Json(package)).into_response(),
        Err(err) => pipeline_error_response(&err),
    }
}

fn pipeline_error_response(err: &PipelineError) -> Response {
    let status = if err.kind().is_client_error() {
        StatusCode::BAD_REQUEST
    } else {
        StatusCode::INTERNAL_SERVER_ERROR
    };
    error_response(status, err.user_message())
}

fn is_json(headers: &HeaderMap) -> bool {
    let Some(content_type) = headers.get(CONTENT_TYPE).and_then(|v| v.to_str().ok()) else {
        return false;
    };
    let essence = content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();
    essence == "application/json" || (essence.starts_with("application/") && essence.ends_with("+json"))
}

/// Bind `addr` and serve `router` until Ctrl-C.
pub async fn serve(router: Router, addr: SocketAddr) -> Result<()> {
    let listener = TcpListener::bind(addr)
        .await
        .map_err(|source| ServerError::Bind { addr, source })?;

    tracing::info!(%addr, "package server listening");

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(ServerError::Serve)
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => tracing::info!("shutting down"),
        Err(e) => {
            tracing::warn!(error = %e, "cannot listen for shutdown signal");
            std::future::pending::<()>().await;
        }
    }
}
