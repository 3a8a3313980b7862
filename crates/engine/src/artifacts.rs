// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Artifact preservation and team artifact collection.
//!
//! At termination, files in an instance's workspace matching the configured
//! patterns are copied into a retained per-instance directory before the
//! workspace is deleted. Team collection walks every descendant of a root
//! instance, terminated ones included, preferring preserved artifacts over
//! live workspaces.

use foreman_core::InstanceRecord;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Where a descendant's artifacts were found.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactSource {
    /// Preserved artifacts directory written at termination.
    Preserved,
    /// Live workspace of a still-running instance.
    Workspace,
    /// Nothing found; recorded and skipped.
    Absent,
}

/// One descendant's entry in a team artifact manifest.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManifestEntry {
    pub instance_id: String,
    pub name: String,
    pub source: ArtifactSource,
    /// Workspace-relative paths of the files found.
    pub files: Vec<String>,
    pub file_count: usize,
}

/// Manifest produced by `collect_team_artifacts`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TeamArtifactManifest {
    pub root_id: String,
    pub entries: Vec<ManifestEntry>,
}

/// Match a file name against a pattern with at most one `*` wildcard.
///
/// `*.md` matches `notes.md`; `report*` matches `report-final.txt`; a
/// pattern without `*` must match exactly.
pub fn matches_pattern(name: &str, pattern: &str) -> bool {
    match pattern.split_once('*') {
        Some((prefix, suffix)) => {
            name.len() >= prefix.len() + suffix.len()
                && name.starts_with(prefix)
                && name.ends_with(suffix)
        }
        None => name == pattern,
    }
}

fn matches_any(name: &str, patterns: &[String]) -> bool {
    patterns.iter().any(|p| matches_pattern(name, p))
}

/// Recursively list files under `dir` whose names match any pattern.
/// Returned paths are relative to `dir`, sorted for determinism.
pub async fn scan_artifacts(dir: &Path, patterns: &[String]) -> std::io::Result<Vec<PathBuf>> {
    let mut found = Vec::new();
    let mut stack = vec![dir.to_path_buf()];

    while let Some(current) = stack.pop() {
        let mut entries = match tokio::fs::read_dir(&current).await {
            Ok(e) => e,
            Err(_) => continue,
        };
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            let file_type = entry.file_type().await?;
            if file_type.is_dir() {
                // Skip hidden directories (.git, .claude, ...)
                if entry.file_name().to_string_lossy().starts_with('.') {
                    continue;
                }
                stack.push(path);
            } else if file_type.is_file() {
                let name = entry.file_name().to_string_lossy().to_string();
                // Hidden files (assistant config, editor state) never count
                if name.starts_with('.') {
                    continue;
                }
                if matches_any(&name, patterns) {
                    if let Ok(rel) = path.strip_prefix(dir) {
                        found.push(rel.to_path_buf());
                    }
                }
            }
        }
    }

    found.sort();
    Ok(found)
}

/// Copy matching files from a workspace into the preserved artifacts
/// directory, keeping relative paths. Returns the copied relative paths.
pub async fn preserve_artifacts(
    workspace: &Path,
    dest: &Path,
    patterns: &[String],
) -> std::io::Result<Vec<PathBuf>> {
    let files = scan_artifacts(workspace, patterns).await?;
    if files.is_empty() {
        return Ok(files);
    }
    tokio::fs::create_dir_all(dest).await?;
    for rel in &files {
        let target = dest.join(rel);
        if let Some(parent) = target.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::copy(workspace.join(rel), target).await?;
    }
    Ok(files)
}

/// Write the `_metadata.json` describing a terminated instance alongside
/// its preserved artifacts.
pub async fn write_preservation_metadata(
    dest: &Path,
    record: &InstanceRecord,
    preserved: &[PathBuf],
) -> std::io::Result<()> {
    tokio::fs::create_dir_all(dest).await?;
    let metadata = serde_json::json!({
        "instance_id": record.id.as_str(),
        "name": &record.name,
        "kind": record.kind.as_str(),
        "role": &record.role,
        "parent_id": record.parent_id.as_ref().map(|p| p.as_str()),
        "requests": record.stats.requests,
        "tokens_estimate": record.stats.tokens_estimate,
        "cost_estimate": record.stats.cost_estimate,
        "created_at_ms": record.stats.created_at_ms,
        "files": preserved
            .iter()
            .map(|p| p.display().to_string())
            .collect::<Vec<_>>(),
    });
    let body = serde_json::to_string_pretty(&metadata).unwrap_or_else(|_| "{}".to_string());
    tokio::fs::write(dest.join("_metadata.json"), body).await
}

#[cfg(test)]
#[path = "artifacts_tests.rs"]
mod tests;
