//! HTTP server exposing the shipment rows
//!
//! Serves `GET /api/van-don` and `GET /van-don` with identical behavior, plus a
//! small health endpoint. Any origin may call the API.

use std::io;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    extract::{RawQuery, State},
    http::{Method, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::{get, MethodRouter},
    Router,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::json;
use thiserror::Error;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{error, info};

use crate::cache::CacheCell;
use crate::cli::ServerConfig;
use crate::data::{DataSource, Record, RowSource, SheetClient, SheetError};
use crate::proxy::VanDonProxy;
use crate::query::QueryParams;

/// Errors that stop the server from starting or running
#[derive(Debug, Error)]
pub enum ServeError {
    /// The upstream HTTP client could not be built
    #[error("Failed to create sheet API client: {0}")]
    Client(#[from] SheetError),

    /// The listen address could not be bound
    #[error("Failed to bind to {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: io::Error,
    },

    /// The accept loop failed
    #[error("Server error: {0}")]
    Io(#[from] io::Error),
}

/// Shared state handed to every request
#[derive(Debug)]
pub struct AppState<S> {
    /// Cached proxy shared by all handlers
    pub proxy: VanDonProxy<S>,
}

impl<S: RowSource> AppState<S> {
    /// Wraps a proxy as handler state
    pub fn new(proxy: VanDonProxy<S>) -> Self {
        Self { proxy }
    }
}

/// Successful `/van-don` response body
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct VanDonResponse {
    success: bool,
    data: Vec<Record>,
    total: usize,
    page: usize,
    limit: usize,
    total_pages: usize,
    /// Same items as `data`, kept for older dashboard clients
    rows: Vec<Record>,
    cached: bool,
    source: DataSource,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct HealthResponse {
    status: &'static str,
    cached_at: Option<DateTime<Utc>>,
    cache_expired: Option<bool>,
}

/// Builds the router with CORS and request tracing applied
pub fn router<S: RowSource>(state: Arc<AppState<S>>) -> Router {
    let van_don: MethodRouter<Arc<AppState<S>>> = get(van_don::<S>)
        .options(preflight)
        .fallback(method_not_allowed);

    Router::new()
        .route("/api/van-don", van_don.clone())
        .route("/van-don", van_don)
        .route("/health", get(health::<S>))
        .layer(cors_layer())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::OPTIONS])
        .allow_headers(Any)
}

/// Starts the server and runs until Ctrl-C
pub async fn serve(config: ServerConfig) -> Result<(), ServeError> {
    let client = SheetClient::with_endpoint(&config.sheet_api_url, &config.sheet, config.timeout)?;
    let proxy = VanDonProxy::new(client, CacheCell::new(config.ttl))
        .with_mock_fallback(config.mock_fallback);
    let app = router(Arc::new(AppState::new(proxy)));

    let listener = TcpListener::bind(config.addr)
        .await
        .map_err(|source| ServeError::Bind {
            addr: config.addr,
            source,
        })?;

    info!(
        addr = %config.addr,
        sheet = %config.sheet,
        ttl_secs = config.ttl.as_secs(),
        "listening on http://{}/api/van-don",
        config.addr
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        error!(error = %err, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("shutdown signal received");
}

async fn van_don<S: RowSource>(
    State(state): State<Arc<AppState<S>>>,
    RawQuery(query): RawQuery,
) -> Response {
    let params = QueryParams::from_query(query.as_deref().unwrap_or_default());

    match state.proxy.load().await {
        Ok(fetched) => {
            let page = params.apply(&fetched.rows);
            Json(VanDonResponse {
                success: true,
                rows: page.items.clone(),
                data: page.items,
                total: page.total,
                page: page.page,
                limit: params.limit,
                total_pages: page.total_pages,
                cached: fetched.source.is_cached(),
                source: fetched.source,
            })
            .into_response()
        }
        Err(err) => {
            error!(error = %err, "failed to load shipment rows");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({
                    "success": false,
                    "error": err.to_string(),
                    "data": [],
                })),
            )
                .into_response()
        }
    }
}

async fn health<S: RowSource>(State(state): State<Arc<AppState<S>>>) -> Json<HealthResponse> {
    let cached = state.proxy.cache().read();
    Json(HealthResponse {
        status: "ok",
        cached_at: cached.as_ref().map(|c| c.cached_at),
        cache_expired: cached.as_ref().map(|c| c.is_expired),
    })
}

async fn preflight() -> StatusCode {
    StatusCode::OK
}

async fn method_not_allowed() -> Response {
    (
        StatusCode::METHOD_NOT_ALLOWED,
        Json(json!({
            "success": false,
            "error": "Method not allowed",
        })),
    )
        .into_response()
}
