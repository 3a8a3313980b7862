// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Log plane: per-instance communication journals, raw capture logs, and
//! the daily audit journal.
//!
//! Each journal has one writer task fed by a channel, so file appends are
//! serialized per journal without any caller holding a lock across I/O.
//! Records are newline-terminated JSON and flushed individually, so a
//! partial write at crash time cannot corrupt earlier records.

use foreman_core::{format_day_stamp, parse_day_stamp, AuditRecord, InstanceId};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use tokio::sync::mpsc;

/// Audit journals older than this many days are removed by the sweep.
const AUDIT_RETENTION_DAYS: u64 = 30;

/// Queue depth per journal writer.
const WRITER_QUEUE: usize = 256;

/// Direction of a communication-journal record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommDirection {
    /// Orchestrator wrote the payload into the instance's pane.
    Sent,
    /// A reply came back from the instance.
    Received,
}

/// One record of `instances/<id>/communication.jsonl` - one half of an
/// envelope exchange.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommRecord {
    /// ISO-8601 UTC timestamp.
    pub time: String,
    pub event: CommDirection,
    pub message_id: String,
    pub direction: String,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tokens: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cost: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_time: Option<f64>,
}

struct CommJob {
    instance_id: InstanceId,
    record: CommRecord,
}

struct RawJob {
    instance_id: InstanceId,
    capture: String,
}

struct AuditJob {
    day_stamp: String,
    record: AuditRecord,
}

/// Handle to the journal writer tasks.
pub struct LogPlane {
    root: PathBuf,
    comm_tx: mpsc::Sender<CommJob>,
    raw_tx: mpsc::Sender<RawJob>,
    audit_tx: mpsc::Sender<AuditJob>,
}

impl LogPlane {
    /// Create the log root and start the writer tasks.
    ///
    /// An unwritable log root is a fatal startup condition and surfaces
    /// here, before the orchestrator accepts any work.
    pub async fn start(root: &Path) -> std::io::Result<Self> {
        tokio::fs::create_dir_all(root.join("instances")).await?;
        tokio::fs::create_dir_all(root.join("audit")).await?;

        let (comm_tx, comm_rx) = mpsc::channel(WRITER_QUEUE);
        let (raw_tx, raw_rx) = mpsc::channel(WRITER_QUEUE);
        let (audit_tx, audit_rx) = mpsc::channel(WRITER_QUEUE);

        tokio::spawn(comm_writer(root.to_path_buf(), comm_rx));
        tokio::spawn(raw_writer(root.to_path_buf(), raw_rx));
        tokio::spawn(audit_writer(root.to_path_buf(), audit_rx));

        Ok(Self {
            root: root.to_path_buf(),
            comm_tx,
            raw_tx,
            audit_tx,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn instance_dir(&self, id: &InstanceId) -> PathBuf {
        self.root.join("instances").join(id.as_str())
    }

    /// Append one communication record for an instance.
    pub async fn log_comm(&self, instance_id: &InstanceId, record: CommRecord) {
        let job = CommJob {
            instance_id: instance_id.clone(),
            record,
        };
        if self.comm_tx.send(job).await.is_err() {
            tracing::warn!("communication journal writer is gone");
        }
    }

    /// Append a raw scrollback capture for an instance.
    pub async fn log_raw_capture(&self, instance_id: &InstanceId, capture: &str) {
        let job = RawJob {
            instance_id: instance_id.clone(),
            capture: capture.to_string(),
        };
        if self.raw_tx.send(job).await.is_err() {
            tracing::warn!("raw capture writer is gone");
        }
    }

    /// Append one audit record; `now_ms` selects the daily file.
    pub async fn log_audit(&self, now_ms: u64, record: AuditRecord) {
        let job = AuditJob {
            day_stamp: format_day_stamp(now_ms),
            record,
        };
        if self.audit_tx.send(job).await.is_err() {
            tracing::warn!("audit journal writer is gone");
        }
    }

    /// Write (or overwrite) an instance's metadata file.
    pub async fn write_metadata(
        &self,
        instance_id: &InstanceId,
        metadata: &serde_json::Value,
    ) -> std::io::Result<()> {
        let dir = self.instance_dir(instance_id);
        tokio::fs::create_dir_all(&dir).await?;
        let body = serde_json::to_string_pretty(metadata).unwrap_or_else(|_| "{}".to_string());
        tokio::fs::write(dir.join("metadata.json"), body).await
    }

    /// Read the tail of an instance's communication journal.
    pub async fn read_comm(
        &self,
        instance_id: &InstanceId,
        limit: usize,
    ) -> std::io::Result<Vec<CommRecord>> {
        let path = self.instance_dir(instance_id).join("communication.jsonl");
        let body = match tokio::fs::read_to_string(&path).await {
            Ok(b) => b,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e),
        };
        let records: Vec<CommRecord> = body
            .lines()
            .filter_map(|line| serde_json::from_str(line).ok())
            .collect();
        let start = if limit > 0 {
            records.len().saturating_sub(limit)
        } else {
            0
        };
        Ok(records[start..].to_vec())
    }

    /// Read the tail of a day's audit journal.
    pub async fn read_audit(
        &self,
        day_stamp: &str,
        limit: usize,
    ) -> std::io::Result<Vec<AuditRecord>> {
        let path = self.root.join("audit").join(format!("audit-{}.jsonl", day_stamp));
        let body = match tokio::fs::read_to_string(&path).await {
            Ok(b) => b,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e),
        };
        let records: Vec<AuditRecord> = body
            .lines()
            .filter_map(|line| serde_json::from_str(line).ok())
            .collect();
        let start = if limit > 0 {
            records.len().saturating_sub(limit)
        } else {
            0
        };
        Ok(records[start..].to_vec())
    }

    /// Remove audit journals older than the retention window.
    pub async fn sweep_audit_retention(&self, now_ms: u64) -> std::io::Result<usize> {
        let cutoff_ms = now_ms.saturating_sub(AUDIT_RETENTION_DAYS * 86_400_000);
        let audit_dir = self.root.join("audit");
        let mut removed = 0;

        let mut entries = tokio::fs::read_dir(&audit_dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            let name = entry.file_name().to_string_lossy().to_string();
            let Some(stamp) = name
                .strip_prefix("audit-")
                .and_then(|s| s.strip_suffix(".jsonl"))
            else {
                continue;
            };
            let Some(day_ms) = parse_day_stamp(stamp) else {
                continue;
            };
            if day_ms < cutoff_ms {
                if tokio::fs::remove_file(entry.path()).await.is_ok() {
                    removed += 1;
                }
            }
        }
        if removed > 0 {
            tracing::info!(removed, "swept expired audit journals");
        }
        Ok(removed)
    }
}

/// Append one newline-terminated line to a file, flushing before return.
async fn append_line(path: &Path, line: &str) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    let mut file = tokio::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .await?;
    file.write_all(line.as_bytes()).await?;
    file.write_all(b"\n").await?;
    file.flush().await
}

async fn comm_writer(root: PathBuf, mut rx: mpsc::Receiver<CommJob>) {
    while let Some(job) = rx.recv().await {
        let dir = root.join("instances").join(job.instance_id.as_str());
        let Ok(line) = serde_json::to_string(&job.record) else {
            continue;
        };
        if let Err(e) = append_line(&dir.join("communication.jsonl"), &line).await {
            tracing::error!(instance_id = %job.instance_id, error = %e, "communication journal append failed");
            continue;
        }
        // Human-readable sibling log
        let human = format!(
            "{} {} {} ({} bytes)",
            job.record.time,
            job.record.direction,
            job.record.message_id,
            job.record.content.len()
        );
        if let Err(e) = append_line(&dir.join("instance.log"), &human).await {
            tracing::warn!(instance_id = %job.instance_id, error = %e, "instance log append failed");
        }
    }
}

async fn raw_writer(root: PathBuf, mut rx: mpsc::Receiver<RawJob>) {
    while let Some(job) = rx.recv().await {
        let path = root
            .join("instances")
            .join(job.instance_id.as_str())
            .join("tmux_output.log");
        if let Err(e) = append_line(&path, &job.capture).await {
            tracing::warn!(instance_id = %job.instance_id, error = %e, "raw capture append failed");
        }
    }
}

async fn audit_writer(root: PathBuf, mut rx: mpsc::Receiver<AuditJob>) {
    while let Some(job) = rx.recv().await {
        let path = root
            .join("audit")
            .join(format!("audit-{}.jsonl", job.day_stamp));
        let Ok(line) = serde_json::to_string(&job.record) else {
            continue;
        };
        if let Err(e) = append_line(&path, &line).await {
            tracing::error!(error = %e, "audit journal append failed");
        }
    }
}

#[cfg(test)]
#[path = "logs_tests.rs"]
mod tests;
