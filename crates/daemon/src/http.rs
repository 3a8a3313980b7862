// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Long-running HTTP RPC transport.
//!
//! `POST /rpc` carries one request frame per call; `GET /rpc/ops` lists
//! the operation descriptors; `GET /health` answers without touching the
//! orchestrator's instance state.

use crate::rpc::{RpcRequest, RpcState};
use axum::extract::State;
use axum::routing::{get, post};
use axum::{Json, Router};
use foreman_adapters::PaneAdapter;
use foreman_core::{Clock, IdGen};
use foreman_engine::tools;
use serde_json::{json, Value};
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tower_http::trace::TraceLayer;

/// Build the axum `Router` with the RPC routes.
pub fn build_router<P: PaneAdapter, C: Clock, G: IdGen>(
    state: Arc<RpcState<P, C, G>>,
) -> Router {
    Router::new()
        .route("/health", get(health::<P, C, G>))
        .route("/rpc", post(rpc::<P, C, G>))
        .route("/rpc/ops", get(ops::<P, C, G>))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health<P: PaneAdapter, C: Clock, G: IdGen>(
    State(state): State<Arc<RpcState<P, C, G>>>,
) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "uptime_secs": state.orch.uptime_secs(),
    }))
}

async fn rpc<P: PaneAdapter, C: Clock, G: IdGen>(
    State(state): State<Arc<RpcState<P, C, G>>>,
    Json(request): Json<RpcRequest>,
) -> Json<crate::rpc::RpcResponse> {
    Json(state.handle(request).await)
}

async fn ops<P: PaneAdapter, C: Clock, G: IdGen>(
    State(state): State<Arc<RpcState<P, C, G>>>,
) -> Json<Value> {
    Json(json!({ "operations": tools::describe(&state.registry) }))
}

/// Serve the router on the given port until the token is cancelled.
pub async fn serve<P: PaneAdapter, C: Clock, G: IdGen>(
    state: Arc<RpcState<P, C, G>>,
    port: u16,
    shutdown: CancellationToken,
) -> std::io::Result<()> {
    let router = build_router(state);
    let listener = TcpListener::bind(("127.0.0.1", port)).await?;
    tracing::info!(port, "rpc server listening");
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown.cancelled_owned())
        .await
}

#[cfg(test)]
#[path = "http_tests.rs"]
mod tests;
