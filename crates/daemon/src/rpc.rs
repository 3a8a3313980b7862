// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! RPC frames shared by both transports.
//!
//! Wire format: JSON objects `{id, op, params}` in, `{id, result}` or
//! `{id, error: {kind, message, hint?}}` out. The id is echoed verbatim
//! for correlation and may be any JSON value.

use foreman_adapters::PaneAdapter;
use foreman_core::{Clock, IdGen, OrchestratorError, RpcErrorBody};
use foreman_engine::{tools, Orchestrator, ToolDescriptor};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;

/// One request frame.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcRequest {
    #[serde(default)]
    pub id: Value,
    pub op: String,
    #[serde(default)]
    pub params: Value,
}

/// One response frame. Exactly one of `result` / `error` is present.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcResponse {
    pub id: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<RpcErrorBody>,
}

impl RpcResponse {
    pub fn ok(id: Value, result: Value) -> Self {
        Self {
            id,
            result: Some(result),
            error: None,
        }
    }

    pub fn fail(id: Value, error: RpcErrorBody) -> Self {
        Self {
            id,
            result: None,
            error: Some(error),
        }
    }
}

/// Shared state of both transports: the orchestrator plus one registry
/// instance they both iterate.
pub struct RpcState<P: PaneAdapter, C: Clock, G: IdGen> {
    pub orch: Arc<Orchestrator<P, C, G>>,
    pub registry: Vec<ToolDescriptor<P, C, G>>,
}

impl<P: PaneAdapter, C: Clock, G: IdGen> RpcState<P, C, G> {
    pub fn new(orch: Arc<Orchestrator<P, C, G>>) -> Self {
        Self {
            orch,
            registry: tools::registry(),
        }
    }

    /// Execute one request frame.
    pub async fn handle(&self, request: RpcRequest) -> RpcResponse {
        let RpcRequest { id, op, params } = request;
        match tools::dispatch(&self.registry, &self.orch, &op, params).await {
            Ok(result) => RpcResponse::ok(id, result),
            Err(e) => {
                log_dispatch_error(&op, &e);
                RpcResponse::fail(id, e.to_body())
            }
        }
    }
}

fn log_dispatch_error(op: &str, error: &OrchestratorError) {
    match error {
        OrchestratorError::Internal(_) => {
            tracing::error!(op, error = %error, "operation failed");
        }
        _ => tracing::debug!(op, error = %error, "operation returned error"),
    }
}

#[cfg(test)]
#[path = "rpc_tests.rs"]
mod tests;
