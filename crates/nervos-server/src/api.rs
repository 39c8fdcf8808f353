use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{rejection::BytesRejection, DefaultBodyLimit, State},
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::info;

use nervos_shared::constants::{
    HEADER_CHECKPOINT, HEADER_PASS_KEY, HEADER_USER_HASH, ITEMS_CONTENT_TYPE,
};
use nervos_shared::protocol::{decode_items, encode_items};
use nervos_shared::{Rev, UserHash};

use crate::chunk_log::{ChunkLog, SyncRequest};
use crate::config::ServerConfig;
use crate::error::ServerError;

#[derive(Clone)]
pub struct AppState {
    pub log: Arc<ChunkLog>,
    pub config: Arc<ServerConfig>,
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/", post(sync))
        .route("/health", get(health_check))
        .layer(DefaultBodyLimit::max(state.config.max_body_size))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// One sync round trip: upload `changes`, receive everything after
/// `checkpoint` from a single chunk.
async fn sync(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Result<Bytes, BytesRejection>,
) -> Result<Response, ServerError> {
    let user_hash = header_str(&headers, HEADER_USER_HASH)
        .and_then(|s| UserHash::parse(s).ok())
        .ok_or_else(|| ServerError::BadRequest("invalid user hash".into()))?;

    let pass_key = header_str(&headers, HEADER_PASS_KEY)
        .and_then(|s| hex::decode(s).ok())
        .filter(|key| !key.is_empty())
        .ok_or_else(|| ServerError::BadRequest("invalid passkey".into()))?;

    let checkpoint: Rev = header_str(&headers, HEADER_CHECKPOINT)
        .and_then(|s| s.trim().parse().ok())
        .ok_or_else(|| ServerError::BadRequest("invalid checkpoint".into()))?;

    let body = body.map_err(|rejection| body_error(rejection, &headers, &state.config))?;
    let changes = decode_items(&body)
        .map_err(|e| ServerError::BadRequest(format!("invalid body: {e}")))?;

    let response = state
        .log
        .sync(SyncRequest {
            user_hash,
            pass_key,
            checkpoint,
            changes,
        })
        .await?;

    let bytes = encode_items(&response.items).map_err(|e| ServerError::Internal(e.to_string()))?;

    Ok((
        StatusCode::OK,
        [
            (
                header::CONTENT_TYPE,
                HeaderValue::from_static(ITEMS_CONTENT_TYPE),
            ),
            (
                header::HeaderName::from_static(HEADER_CHECKPOINT),
                HeaderValue::from(response.checkpoint),
            ),
        ],
        bytes,
    )
        .into_response())
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

fn body_error(rejection: BytesRejection, headers: &HeaderMap, config: &ServerConfig) -> ServerError {
    if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
        let size = header_str(headers, header::CONTENT_LENGTH.as_str())
            .and_then(|s| s.parse().ok())
            .unwrap_or(0);
        ServerError::PayloadTooLarge {
            size,
            max: config.max_body_size,
        }
    } else {
        ServerError::BadRequest(rejection.body_text())
    }
}

pub async fn serve(state: AppState, addr: SocketAddr) -> anyhow::Result<()> {
    let listener = TcpListener::bind(addr).await?;
    serve_listener(state, listener).await
}

/// Serve on an already bound listener (ephemeral ports in tests).
pub async fn serve_listener(state: AppState, listener: TcpListener) -> anyhow::Result<()> {
    let app = build_router(state);

    info!(addr = %listener.local_addr()?, "Starting HTTP API server");

    axum::serve(listener, app).await?;
    Ok(())
}
