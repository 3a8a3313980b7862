// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Assistant CLI launch plumbing: pane names, launch command lines, tool
//! surface configuration, and readiness polling.
//!
//! The two assistant kinds take their tool configuration differently:
//! Claude-style CLIs read a JSON file written into the workspace before
//! launch; Codex-style CLIs are configured by typing `tool add` commands
//! into the pane, and only support stdio endpoints.

use crate::pane::{PaneAdapter, PaneError};
use foreman_core::InstanceKind;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// File name of the Claude-style tool configuration, relative to the
/// instance workspace.
pub const TOOL_CONFIG_FILE: &str = ".assistant_tools.json";

/// Transport of one tool-surface endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToolTransport {
    /// HTTP endpoint at a URL.
    Http { url: String },
    /// Stdio endpoint launched as a subprocess.
    Stdio {
        command: String,
        args: Vec<String>,
        env: Vec<(String, String)>,
    },
}

/// One named tool-surface endpoint offered to a child assistant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolEndpoint {
    pub name: String,
    pub transport: ToolTransport,
}

impl ToolEndpoint {
    pub fn http(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            transport: ToolTransport::Http { url: url.into() },
        }
    }

    pub fn stdio(name: impl Into<String>, command: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            name: name.into(),
            transport: ToolTransport::Stdio {
                command: command.into(),
                args,
                env: Vec::new(),
            },
        }
    }
}

/// Everything needed to start one assistant CLI in a pane.
#[derive(Debug, Clone)]
pub struct LaunchPlan {
    pub kind: InstanceKind,
    pub model: Option<String>,
    pub system_prompt: Option<String>,
    pub initial_prompt: Option<String>,
    pub tools: Vec<ToolEndpoint>,
}

impl LaunchPlan {
    /// Build the shell command line launched inside the pane.
    ///
    /// The initial prompt is passed as an argument so paste detection never
    /// applies to it.
    pub fn command_line(&self, workspace: &Path) -> String {
        let mut parts: Vec<String> = Vec::new();
        match self.kind {
            InstanceKind::Claude => {
                parts.push("claude".to_string());
                parts.push("--dangerously-skip-permissions".to_string());
                parts.push("--allow-dangerously-skip-permissions".to_string());
                if let Some(model) = &self.model {
                    parts.push("--model".to_string());
                    parts.push(shell_quote(model));
                }
                if let Some(prompt) = &self.system_prompt {
                    parts.push("--append-system-prompt".to_string());
                    parts.push(shell_quote(prompt));
                }
                if !self.tools.is_empty() {
                    parts.push("--mcp-config".to_string());
                    parts.push(shell_quote(
                        &workspace.join(TOOL_CONFIG_FILE).display().to_string(),
                    ));
                }
            }
            InstanceKind::Codex => {
                parts.push("codex".to_string());
                parts.push("--full-auto".to_string());
                if let Some(model) = &self.model {
                    parts.push("--model".to_string());
                    parts.push(shell_quote(model));
                }
            }
        }
        if let Some(prompt) = &self.initial_prompt {
            parts.push(shell_quote(prompt));
        }
        parts.join(" ")
    }
}

/// Single-quote a string for the pane's shell.
fn shell_quote(s: &str) -> String {
    format!("'{}'", s.replace('\'', "'\\''"))
}

/// Generate a friendly pane name from instance context.
///
/// Format: `{name}-{role}-{random}` (fm- prefix added by TmuxPaneAdapter).
/// Sanitized for tmux compatibility and suffixed for uniqueness.
pub fn generate_pane_name(name: &str, role: &str) -> String {
    let sanitized_name = sanitize_for_tmux(name, 20);
    let sanitized_role = sanitize_for_tmux(role, 15);
    let random_suffix = generate_short_random(4);

    format!("{}-{}-{}", sanitized_name, sanitized_role, random_suffix)
}

/// Sanitize a string for use in tmux session names.
///
/// tmux session names cannot contain colon or period; other awkward
/// characters are replaced for shell friendliness.
fn sanitize_for_tmux(s: &str, max_len: usize) -> String {
    let sanitized: String = s
        .chars()
        .map(|c| match c {
            'a'..='z' | 'A'..='Z' | '0'..='9' | '-' | '_' => c,
            _ => '-',
        })
        .collect();

    // Collapse multiple hyphens and trim
    let collapsed = sanitized
        .split('-')
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join("-");

    // Truncate to max length (avoid cutting mid-hyphen)
    if collapsed.len() <= max_len {
        collapsed
    } else {
        collapsed[..max_len].trim_end_matches('-').to_string()
    }
}

/// Generate a short random hex string.
fn generate_short_random(len: usize) -> String {
    use rand::Rng;
    let mut rng = rand::rng();
    (0..len)
        .map(|_| format!("{:x}", rng.random::<u8>() % 16))
        .collect()
}

/// Write the Claude-style tool configuration file into a workspace.
///
/// HTTP endpoints carry only a `url`; stdio endpoints carry `command` (+
/// `args`), from which the CLI infers the transport. Returns the file path.
pub async fn write_tool_config(
    workspace: &Path,
    tools: &[ToolEndpoint],
) -> std::io::Result<PathBuf> {
    let mut entries = serde_json::Map::new();
    for tool in tools {
        let entry = match &tool.transport {
            ToolTransport::Http { url } => serde_json::json!({ "url": url }),
            ToolTransport::Stdio { command, args, env } => {
                let mut obj = serde_json::json!({ "command": command });
                if !args.is_empty() {
                    obj["args"] = serde_json::json!(args);
                }
                if !env.is_empty() {
                    let map: serde_json::Map<String, serde_json::Value> = env
                        .iter()
                        .map(|(k, v)| (k.clone(), serde_json::Value::String(v.clone())))
                        .collect();
                    obj["env"] = serde_json::Value::Object(map);
                }
                obj
            }
        };
        entries.insert(tool.name.clone(), entry);
    }

    let path = workspace.join(TOOL_CONFIG_FILE);
    let body = serde_json::to_string_pretty(&serde_json::Value::Object(entries))
        .unwrap_or_else(|_| "{}".to_string());
    tokio::fs::write(&path, body).await?;
    Ok(path)
}

/// Configure a Codex-style pane by typing `tool add` commands before the
/// CLI is launched. Only stdio endpoints are supported for this kind; HTTP
/// entries are skipped with a warning.
pub async fn configure_tools_in_pane<P: PaneAdapter>(
    panes: &P,
    pane_id: &str,
    tools: &[ToolEndpoint],
) -> Result<(), PaneError> {
    for tool in tools {
        match &tool.transport {
            ToolTransport::Http { url } => {
                tracing::warn!(
                    pane_id,
                    tool = %tool.name,
                    url = %url,
                    "codex-style assistants only support stdio tools, skipping"
                );
            }
            ToolTransport::Stdio { command, args, env } => {
                let mut line = format!("tool add {} {}", tool.name, command);
                for arg in args {
                    line.push(' ');
                    line.push_str(arg);
                }
                for (key, value) in env {
                    line.push_str(&format!(" --env {}={}", key, value));
                }
                panes.send_text(pane_id, &line, true).await?;
                tokio::time::sleep(Duration::from_millis(100)).await;
            }
        }
    }
    Ok(())
}

/// Result of polling for a startup prompt
#[derive(Debug, PartialEq)]
pub enum PromptResult {
    /// Prompt detected and answered
    Handled,
    /// No prompt detected (assistant started normally)
    NotPresent,
}

/// Check for and auto-accept the bypass-permissions confirmation dialog
/// shown by Claude-style CLIs launched with the skip-permissions flag.
pub async fn handle_bypass_prompt<P: PaneAdapter>(
    panes: &P,
    pane_id: &str,
    max_attempts: usize,
) -> Result<PromptResult, PaneError> {
    let check_interval = crate::env::ready_poll_ms();

    for attempt in 0..max_attempts {
        // Small delay before first check to let the TUI render
        if attempt > 0 {
            tokio::time::sleep(check_interval).await;
        }

        let output = match panes.capture_scrollback(pane_id, 50).await {
            Ok(out) => out,
            Err(_) => continue, // Pane might not be ready yet
        };

        let has_warning = output.contains("Bypass Permissions mode");
        let has_no_option = output.contains("1. No");
        let has_yes_option = output.contains("2. Yes");

        if has_warning && has_no_option && has_yes_option {
            tracing::info!(pane_id, "detected bypass permissions prompt, accepting");
            panes.send_text(pane_id, "2", false).await?;
            return Ok(PromptResult::Handled);
        }

        // Input prompt already rendered: no startup dialog is pending
        if output.contains(ready_sentinel(InstanceKind::Claude)) {
            return Ok(PromptResult::NotPresent);
        }
    }

    // Timeout - no prompt detected, assume the assistant started normally
    Ok(PromptResult::NotPresent)
}

/// Ready sentinel for each assistant kind: a string the CLI renders once it
/// is accepting input.
fn ready_sentinel(kind: InstanceKind) -> &'static str {
    match kind {
        InstanceKind::Claude => "? for shortcuts",
        InstanceKind::Codex => "Ctrl+C to exit",
    }
}

/// Block until the pane shows the kind's ready sentinel, or the timeout
/// elapses. Returns whether the sentinel was seen.
pub async fn wait_for_ready<P: PaneAdapter>(
    panes: &P,
    pane_id: &str,
    kind: InstanceKind,
    timeout: Duration,
) -> Result<bool, PaneError> {
    let sentinel = ready_sentinel(kind);
    let interval = crate::env::ready_poll_ms();
    let deadline = tokio::time::Instant::now() + timeout;

    loop {
        match panes.capture_scrollback(pane_id, 50).await {
            Ok(output) if output.contains(sentinel) => return Ok(true),
            Ok(_) => {}
            Err(PaneError::Gone(id)) => return Err(PaneError::Gone(id)),
            Err(_) => {}
        }
        if tokio::time::Instant::now() >= deadline {
            return Ok(false);
        }
        tokio::time::sleep(interval).await;
    }
}

#[cfg(test)]
#[path = "launch_tests.rs"]
mod tests;
