//! HTTP and WebSocket serving layer.
//!
//! Only the [`RunningTotal`] crosses from the detection loop into the server;
//! track state stays private to the loop.

mod error;
mod handlers;
mod websocket;

use std::any::Any;
use std::time::Duration;

use axum::Router;
use axum::http::HeaderValue;
use axum::http::header::InvalidHeaderValue;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use tokio::net::TcpListener;
use tokio::sync::watch;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::{AllowHeaders, AllowMethods, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{error, info};

pub use error::ApiError;
pub use handlers::{Logged, PhReading, TrashCountReport};

use crate::counting::RunningTotal;

/// Shared by every handler.
#[derive(Clone)]
pub struct AppState {
    total: RunningTotal,
    push_interval: Duration,
    shutdown: watch::Receiver<bool>,
}

impl AppState {
    /// `shutdown` flips to `true` when the server is stopping; open
    /// WebSocket pushes end at that point.
    pub fn new(total: RunningTotal, push_interval: Duration, shutdown: watch::Receiver<bool>) -> Self {
        Self {
            total,
            push_interval,
            shutdown,
        }
    }
}

/// CORS for a single browser origin with credentials; methods and headers
/// are mirrored from the preflight request.
pub fn cors_layer(origin: &str) -> Result<CorsLayer, InvalidHeaderValue> {
    Ok(CorsLayer::new()
        .allow_origin(HeaderValue::from_str(origin)?)
        .allow_methods(AllowMethods::mirror_request())
        .allow_headers(AllowHeaders::mirror_request())
        .allow_credentials(true))
}

pub fn router(state: AppState, cors: CorsLayer) -> Router {
    Router::new()
        .route("/", get(handlers::root))
        .route("/health", get(handlers::health))
        .route("/status", get(handlers::status))
        .route("/trash-count", get(handlers::trash_count))
        .route("/log-ph", post(handlers::log_ph))
        .route("/log-trash-count", post(handlers::log_trash_count))
        .route("/ws/trash-count", get(websocket::trash_count_ws))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(CatchPanicLayer::custom(handle_panic))
        .layer(cors)
}

fn handle_panic(err: Box<dyn Any + Send + 'static>) -> Response {
    let detail = if let Some(s) = err.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = err.downcast_ref::<&str>() {
        s.to_string()
    } else {
        "unknown error".to_string()
    };
    error!(%detail, "An error occurred");
    ApiError::Internal(detail).into_response()
}

/// Serve `app` until `shutdown` flips to `true`.
pub async fn serve(
    listener: TcpListener,
    app: Router,
    mut shutdown: watch::Receiver<bool>,
) -> std::io::Result<()> {
    if let Ok(addr) = listener.local_addr() {
        info!(%addr, "Trash Detection API listening");
    }
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            loop {
                if *shutdown.borrow_and_update() {
                    break;
                }
                if shutdown.changed().await.is_err() {
                    break;
                }
            }
        })
        .await
}
