//! Read-only status reporting.
//!
//! [`StatusBoard`] holds the latest snapshot of producer state. The cycle driver is the
//! only writer and swaps fields under a short write lock; readers always get a clone.
//! [`StatusServer`] exposes the board over HTTP with axum:
//!
//! - `GET /health` — `200` with `{"status":"ok",...}` while connected, `503` otherwise.
//! - `GET /metrics` — the whole snapshot as JSON.

use crate::driver::DriverState;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use log::{error, info};
use price_common::{Instrument, ProducerError, Result};
use serde::Serialize;
use serde_json::json;
use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::sync::{Arc, RwLock};
use std::thread;

/// Point-in-time view of the producer.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct StatusSnapshot {
    /// Cycle driver state.
    pub state: DriverState,
    /// Whether a broker connection is open.
    pub connected: bool,
    /// RFC 3339 time of the last successful feed refresh.
    pub last_refresh: Option<String>,
    /// Current baselines.
    pub baselines: BTreeMap<Instrument, f64>,
    /// Completed cycles.
    pub cycles: u64,
    /// Records acknowledged since start.
    pub records_published: u64,
    /// Records that failed since start.
    pub publish_failures: u64,
}

impl Default for StatusSnapshot {
    fn default() -> Self {
        Self {
            state: DriverState::Disconnected,
            connected: false,
            last_refresh: None,
            baselines: BTreeMap::new(),
            cycles: 0,
            records_published: 0,
            publish_failures: 0,
        }
    }
}

/// Shared handle to the latest [`StatusSnapshot`].
#[derive(Debug, Clone, Default)]
pub struct StatusBoard {
    inner: Arc<RwLock<StatusSnapshot>>,
}

impl StatusBoard {
    /// Empty board.
    pub fn new() -> Self {
        Self::default()
    }

    /// Clone of the current snapshot.
    pub fn snapshot(&self) -> Result<StatusSnapshot> {
        Ok(self.inner.read()?.clone())
    }

    /// Apply `change` under the write lock.
    pub fn update<F: FnOnce(&mut StatusSnapshot)>(&self, change: F) -> Result<()> {
        let mut snapshot = self.inner.write()?;
        change(&mut snapshot);
        Ok(())
    }
}

/// Routes for `/health` and `/metrics` over `board`.
pub fn router(board: StatusBoard) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/metrics", get(metrics))
        .fallback(not_found)
        .with_state(board)
}

async fn health(State(board): State<StatusBoard>) -> Response {
    let snapshot = match board.snapshot() {
        Ok(snapshot) => snapshot,
        Err(e) => return internal_error(e),
    };
    let code = if snapshot.connected {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    let body = json!({
        "status": if snapshot.connected { "ok" } else { "degraded" },
        "connected": snapshot.connected,
        "state": snapshot.state,
        "last_refresh": snapshot.last_refresh,
    });
    (code, Json(body)).into_response()
}

async fn metrics(State(board): State<StatusBoard>) -> Response {
    match board.snapshot() {
        Ok(snapshot) => Json(snapshot).into_response(),
        Err(e) => internal_error(e),
    }
}

async fn not_found() -> Response {
    (StatusCode::NOT_FOUND, Json(json!({"error": "not found"}))).into_response()
}

fn internal_error(err: ProducerError) -> Response {
    error!("Status snapshot unavailable: {}", err);
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({"error": err.to_string()})),
    )
        .into_response()
}

/// Health/metrics listener running on its own thread with a single-threaded tokio
/// runtime. The producer itself stays on plain threads.
pub struct StatusServer;

impl StatusServer {
    /// Bind `addr` and serve [`router`] in the background. Returns the bound address.
    pub fn start(addr: &str, board: StatusBoard) -> Result<SocketAddr> {
        let listener = std::net::TcpListener::bind(addr)?;
        listener.set_nonblocking(true)?;
        let local = listener.local_addr()?;

        thread::Builder::new()
            .name("status-server".to_string())
            .spawn(move || {
                let runtime = match tokio::runtime::Builder::new_current_thread()
                    .enable_all()
                    .build()
                {
                    Ok(runtime) => runtime,
                    Err(e) => {
                        error!("Could not start status runtime: {}", e);
                        return;
                    }
                };
                runtime.block_on(async move {
                    let listener = match tokio::net::TcpListener::from_std(listener) {
                        Ok(listener) => listener,
                        Err(e) => {
                            error!("Could not register status listener: {}", e);
                            return;
                        }
                    };
                    info!("Status server is started on {}", local);
                    if let Err(e) = axum::serve(listener, router(board)).await {
                        error!("Status server stopped: {}", e);
                    }
                });
            })?;
        Ok(local)
    }
}
