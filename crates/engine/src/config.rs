// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Orchestrator configuration.
//!
//! All inputs are read once from the environment at startup and never
//! re-read. Paths default to subdirectories of `~/.foreman`.

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Errors from configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not determine home directory")]
    NoHomeDir,
    #[error("invalid value for {var}: {value}")]
    InvalidValue { var: String, value: String },
}

/// Supervisor tuning, bundled so the evaluation loop has one source of
/// thresholds.
#[derive(Debug, Clone)]
pub struct SupervisorConfig {
    /// Evaluation cycle interval.
    pub interval: Duration,
    /// Transcript tail captured per instance per cycle, in lines.
    pub tail_lines: u32,
    /// No new signals for longer than this makes an instance a stuck candidate.
    pub stuck_threshold: Duration,
    /// Error signals within [`Self::error_window`] to call it an error loop.
    pub error_loop_threshold: u32,
    pub error_window: Duration,
    /// Quiet time after a completion signal before classifying as waiting.
    pub waiting_threshold: Duration,
    /// Minimum time between interventions on one instance.
    pub cooldown: Duration,
    /// Interventions per instance before escalating to external attention.
    pub max_interventions: u32,
}

impl Default for SupervisorConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(30),
            tail_lines: 200,
            stuck_threshold: Duration::from_secs(300),
            error_loop_threshold: 3,
            error_window: Duration::from_secs(300),
            waiting_threshold: Duration::from_secs(120),
            cooldown: Duration::from_secs(60),
            max_interventions: 3,
        }
    }
}

/// Orchestrator configuration, loaded once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    /// Per-instance working directories are created under here.
    pub workspace_root: PathBuf,
    /// Root for the orchestrator log, per-instance journals, and audit files.
    pub log_root: PathBuf,
    /// Preserved artifacts land under here, per instance id.
    pub artifacts_root: PathBuf,
    /// Maximum concurrently live instances.
    pub max_instances: usize,
    pub log_level: String,
    /// Whether artifacts are preserved at termination.
    pub preserve_artifacts: bool,
    /// Filename patterns (single `*` wildcard) selecting artifact files.
    pub artifact_patterns: Vec<String>,
    /// API key handed to spawned assistant CLIs via their environment.
    pub api_key: Option<String>,
    /// Port for the long-running HTTP RPC server.
    pub rpc_port: u16,
    pub supervisor: SupervisorConfig,
}

impl Config {
    /// Load configuration from the environment.
    pub fn load() -> Result<Self, ConfigError> {
        let home = dirs::home_dir().ok_or(ConfigError::NoHomeDir)?;
        let base = home.join(".foreman");

        Ok(Self {
            workspace_root: path_var("FOREMAN_WORKSPACE_ROOT", base.join("workspaces")),
            log_root: path_var("FOREMAN_LOG_ROOT", base.join("logs")),
            artifacts_root: path_var("FOREMAN_ARTIFACTS_ROOT", base.join("artifacts")),
            max_instances: parse_var("FOREMAN_MAX_INSTANCES", 10)?,
            log_level: std::env::var("FOREMAN_LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            preserve_artifacts: parse_var("FOREMAN_PRESERVE_ARTIFACTS", true)?,
            artifact_patterns: patterns_var(),
            api_key: std::env::var("FOREMAN_API_KEY").ok().filter(|s| !s.is_empty()),
            rpc_port: parse_var("FOREMAN_RPC_PORT", 7433)?,
            supervisor: SupervisorConfig::default(),
        })
    }

    /// In-memory configuration rooted at a directory, for tests.
    pub fn for_root(root: &std::path::Path) -> Self {
        Self {
            workspace_root: root.join("workspaces"),
            log_root: root.join("logs"),
            artifacts_root: root.join("artifacts"),
            max_instances: 10,
            log_level: "info".to_string(),
            preserve_artifacts: true,
            artifact_patterns: default_patterns(),
            api_key: None,
            rpc_port: 7433,
            supervisor: SupervisorConfig::default(),
        }
    }
}

fn default_patterns() -> Vec<String> {
    ["*.md", "*.txt", "*.json", "*.diff", "*.patch"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

fn path_var(var: &str, default: PathBuf) -> PathBuf {
    std::env::var(var)
        .ok()
        .filter(|s| !s.is_empty())
        .map(PathBuf::from)
        .unwrap_or(default)
}

fn patterns_var() -> Vec<String> {
    match std::env::var("FOREMAN_ARTIFACT_PATTERNS") {
        Ok(s) if !s.trim().is_empty() => s
            .split(',')
            .map(|p| p.trim().to_string())
            .filter(|p| !p.is_empty())
            .collect(),
        _ => default_patterns(),
    }
}

fn parse_var<T: std::str::FromStr>(var: &str, default: T) -> Result<T, ConfigError> {
    match std::env::var(var) {
        Ok(s) if !s.is_empty() => s.parse().map_err(|_| ConfigError::InvalidValue {
            var: var.to_string(),
            value: s,
        }),
        _ => Ok(default),
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
