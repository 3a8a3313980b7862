// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Error taxonomy shared by every layer and both RPC transports.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Machine-readable error kind carried on every error response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    NotFound,
    SpawnFailed,
    PaneGone,
    SendFailed,
    Timeout,
    QueueFull,
    CapacityExceeded,
    InvalidArgument,
    Internal,
}

/// Orchestrator error: kind plus human message, with a hint for
/// `InvalidArgument` enumerating acceptable values.
#[derive(Debug, Clone, Error)]
pub enum OrchestratorError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("spawn failed: {0}")]
    SpawnFailed(String),

    #[error("pane gone: {0}")]
    PaneGone(String),

    #[error("send failed: {0}")]
    SendFailed(String),

    #[error("timed out after {0} ms")]
    Timeout(u64),

    #[error("inbound queue full for instance {0}")]
    QueueFull(String),

    #[error("capacity exceeded: {current} of {max} instances running")]
    CapacityExceeded { current: usize, max: usize },

    #[error("invalid argument: {message}")]
    InvalidArgument { message: String, hint: String },

    #[error("internal error: {0}")]
    Internal(String),
}

impl OrchestratorError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            OrchestratorError::NotFound(_) => ErrorKind::NotFound,
            OrchestratorError::SpawnFailed(_) => ErrorKind::SpawnFailed,
            OrchestratorError::PaneGone(_) => ErrorKind::PaneGone,
            OrchestratorError::SendFailed(_) => ErrorKind::SendFailed,
            OrchestratorError::Timeout(_) => ErrorKind::Timeout,
            OrchestratorError::QueueFull(_) => ErrorKind::QueueFull,
            OrchestratorError::CapacityExceeded { .. } => ErrorKind::CapacityExceeded,
            OrchestratorError::InvalidArgument { .. } => ErrorKind::InvalidArgument,
            OrchestratorError::Internal(_) => ErrorKind::Internal,
        }
    }

    /// Invalid-argument constructor with an acceptable-values hint.
    pub fn invalid_argument(message: impl Into<String>, hint: impl Into<String>) -> Self {
        OrchestratorError::InvalidArgument {
            message: message.into(),
            hint: hint.into(),
        }
    }

    /// The wire shape carried in RPC error responses.
    pub fn to_body(&self) -> RpcErrorBody {
        RpcErrorBody {
            kind: self.kind(),
            message: self.to_string(),
            hint: match self {
                OrchestratorError::InvalidArgument { hint, .. } => Some(hint.clone()),
                _ => None,
            },
        }
    }
}

/// Error shape serialized in RPC responses: `{kind, message, hint?}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RpcErrorBody {
    pub kind: ErrorKind,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
