// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Terminal pane adapters

mod tmux;

pub use tmux::TmuxPaneAdapter;

// Test support - only compiled for tests or when explicitly requested
#[cfg(any(test, feature = "test-support"))]
mod fake;
#[cfg(any(test, feature = "test-support"))]
pub use fake::{FakePane, FakePaneAdapter, PaneCall};

use async_trait::async_trait;
use std::path::Path;
use thiserror::Error;

/// Errors from pane operations
#[derive(Debug, Error)]
pub enum PaneError {
    /// The underlying session has exited.
    #[error("pane gone: {0}")]
    Gone(String),
    #[error("spawn failed: {0}")]
    SpawnFailed(String),
    #[error("command failed: {0}")]
    CommandFailed(String),
}

/// Named keystrokes a pane accepts beyond literal text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaneKey {
    /// Finalize the current input (Enter).
    Submit,
    /// Insert a line break without submitting (Shift-Enter).
    NewlineNoSubmit,
    /// Escape - clears pending input in assistant TUIs.
    Escape,
}

/// Adapter for driving one assistant CLI inside a persistent terminal pane.
///
/// All operations fail with [`PaneError::Gone`] once the underlying session
/// has exited.
#[async_trait]
pub trait PaneAdapter: Clone + Send + Sync + 'static {
    /// Create a detached pane running `cmd` in `cwd`; returns the pane id.
    async fn create(
        &self,
        name: &str,
        cwd: &Path,
        cmd: &str,
        env: &[(String, String)],
    ) -> Result<String, PaneError>;

    /// Write literal text into the pane. When `submit` is set, finalize
    /// with a submit key afterwards.
    async fn send_text(&self, id: &str, text: &str, submit: bool) -> Result<(), PaneError>;

    /// Send one named keystroke.
    async fn send_key(&self, id: &str, key: PaneKey) -> Result<(), PaneError>;

    /// Capture a bounded tail of the pane's rendered output.
    async fn capture_scrollback(&self, id: &str, max_lines: u32) -> Result<String, PaneError>;

    /// Check whether the session still exists.
    async fn is_alive(&self, id: &str) -> Result<bool, PaneError>;

    /// Kill the session. Killing an already-dead session succeeds.
    async fn kill(&self, id: &str) -> Result<(), PaneError>;
}
