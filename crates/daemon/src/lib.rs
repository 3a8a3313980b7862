// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! foreman-daemon: the `foreman` binary and its two RPC transports.
//!
//! The same tool-surface registry backs a long-running HTTP server
//! (`foreman serve`) and a per-process stdio endpoint (`foreman stdio`);
//! the transports differ only in framing.

#[cfg(test)]
pub(crate) mod test_support;

pub mod http;
pub mod rpc;
pub mod stdio;

pub use rpc::{RpcRequest, RpcResponse, RpcState};
