// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-process stdio RPC transport.
//!
//! Newline-delimited JSON frames on stdin/stdout, one response per
//! request, dispatched through the same registry as the HTTP transport.
//! This is the transport Codex-style children speak.

use crate::rpc::{RpcRequest, RpcResponse, RpcState};
use foreman_adapters::PaneAdapter;
use foreman_core::{Clock, IdGen, OrchestratorError};
use serde_json::Value;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};

/// Run the stdio loop until EOF on the reader.
pub async fn run<P, C, G, R, W>(
    state: Arc<RpcState<P, C, G>>,
    reader: R,
    mut writer: W,
) -> std::io::Result<()>
where
    P: PaneAdapter,
    C: Clock,
    G: IdGen,
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut lines = BufReader::new(reader).lines();

    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let response = match serde_json::from_str::<RpcRequest>(line) {
            Ok(request) => state.handle(request).await,
            Err(e) => RpcResponse::fail(
                Value::Null,
                OrchestratorError::invalid_argument(
                    format!("malformed request frame: {}", e),
                    "frames are JSON objects: {\"id\", \"op\", \"params\"}",
                )
                .to_body(),
            ),
        };

        let body = serde_json::to_string(&response).unwrap_or_else(|_| {
            "{\"id\":null,\"error\":{\"kind\":\"internal\",\"message\":\"unserializable response\"}}"
                .to_string()
        });
        writer.write_all(body.as_bytes()).await?;
        writer.write_all(b"\n").await?;
        writer.flush().await?;
    }

    tracing::debug!("stdio transport reached EOF");
    Ok(())
}

#[cfg(test)]
#[path = "stdio_tests.rs"]
mod tests;
