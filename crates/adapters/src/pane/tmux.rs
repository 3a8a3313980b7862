// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Tmux pane adapter

use super::{PaneAdapter, PaneError, PaneKey};
use async_trait::async_trait;
use std::path::Path;
use tokio::process::Command;

/// Tmux-based pane adapter
#[derive(Clone, Default)]
pub struct TmuxPaneAdapter;

impl TmuxPaneAdapter {
    pub fn new() -> Self {
        Self
    }
}

fn key_name(key: PaneKey) -> &'static str {
    match key {
        PaneKey::Submit => "Enter",
        PaneKey::NewlineNoSubmit => "S-Enter",
        PaneKey::Escape => "Escape",
    }
}

#[async_trait]
impl PaneAdapter for TmuxPaneAdapter {
    async fn create(
        &self,
        name: &str,
        cwd: &Path,
        cmd: &str,
        env: &[(String, String)],
    ) -> Result<String, PaneError> {
        // Precondition: cwd must exist
        if !cwd.exists() {
            return Err(PaneError::SpawnFailed(format!(
                "working directory does not exist: {}",
                cwd.display()
            )));
        }

        let pane_id = format!("fm-{}", name);

        // Check if session already exists and clean it up
        let existing = Command::new("tmux")
            .args(["has-session", "-t", &pane_id])
            .output()
            .await;

        if existing.map(|o| o.status.success()).unwrap_or(false) {
            tracing::warn!(pane_id, "session already exists, killing first");
            let _ = Command::new("tmux")
                .args(["kill-session", "-t", &pane_id])
                .output()
                .await;
        }

        // Build tmux command
        let mut tmux_cmd = Command::new("tmux");
        tmux_cmd
            .arg("new-session")
            .arg("-d")
            .arg("-s")
            .arg(&pane_id)
            .arg("-c")
            .arg(cwd);

        // Add environment variables
        for (key, value) in env {
            tmux_cmd.arg("-e").arg(format!("{}={}", key, value));
        }

        tmux_cmd.arg(cmd);

        let output = tmux_cmd
            .output()
            .await
            .map_err(|e| PaneError::SpawnFailed(e.to_string()))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            tracing::error!(
                pane_id,
                stderr = %stderr,
                "tmux spawn failed"
            );
            return Err(PaneError::SpawnFailed(stderr.to_string()));
        }

        // Log stderr even on success - may contain useful warnings
        if !output.stderr.is_empty() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            tracing::warn!(
                pane_id,
                stderr = %stderr,
                "tmux spawn stderr (non-fatal)"
            );
        }

        Ok(pane_id)
    }

    async fn send_text(&self, id: &str, text: &str, submit: bool) -> Result<(), PaneError> {
        // -l = literal mode (no key name interpretation)
        // -- = end of options (handles text starting with -)
        let output = Command::new("tmux")
            .args(["send-keys", "-t", id, "-l", "--", text])
            .output()
            .await
            .map_err(|e| PaneError::CommandFailed(e.to_string()))?;

        if !output.status.success() {
            return Err(PaneError::Gone(id.to_string()));
        }

        if submit {
            self.send_key(id, PaneKey::Submit).await?;
        }
        Ok(())
    }

    async fn send_key(&self, id: &str, key: PaneKey) -> Result<(), PaneError> {
        let output = Command::new("tmux")
            .args(["send-keys", "-t", id, key_name(key)])
            .output()
            .await
            .map_err(|e| PaneError::CommandFailed(e.to_string()))?;

        if !output.status.success() {
            return Err(PaneError::Gone(id.to_string()));
        }
        Ok(())
    }

    async fn capture_scrollback(&self, id: &str, max_lines: u32) -> Result<String, PaneError> {
        let output = Command::new("tmux")
            .arg("capture-pane")
            .arg("-t")
            .arg(id)
            .arg("-p")
            .arg("-S")
            .arg(format!("-{}", max_lines))
            .output()
            .await
            .map_err(|e| PaneError::CommandFailed(e.to_string()))?;

        if !output.status.success() {
            return Err(PaneError::Gone(id.to_string()));
        }

        Ok(String::from_utf8_lossy(&output.stdout).to_string())
    }

    async fn is_alive(&self, id: &str) -> Result<bool, PaneError> {
        let output = Command::new("tmux")
            .arg("has-session")
            .arg("-t")
            .arg(id)
            .output()
            .await
            .map_err(|e| PaneError::CommandFailed(e.to_string()))?;

        Ok(output.status.success())
    }

    async fn kill(&self, id: &str) -> Result<(), PaneError> {
        let output = Command::new("tmux")
            .arg("kill-session")
            .arg("-t")
            .arg(id)
            .output()
            .await
            .map_err(|e| PaneError::CommandFailed(e.to_string()))?;

        if !output.status.success() {
            // Session might already be dead, which is fine
        }

        Ok(())
    }
}

#[cfg(test)]
#[path = "tmux_tests.rs"]
mod tests;
