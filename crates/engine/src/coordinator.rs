// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Multi-instance coordination: broadcasts, sequential and parallel
//! workflows, and team artifact collection.

use crate::artifacts::{self, ArtifactSource, ManifestEntry, TeamArtifactManifest};
use crate::orchestrator::Orchestrator;
use foreman_adapters::PaneAdapter;
use foreman_core::{
    Clock, IdGen, InstanceId, MessageSource, OrchestratorError, RpcErrorBody,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinSet;

/// Coordination mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CoordinateMode {
    /// Feed targets in order; each reply becomes context for the next.
    Sequential,
    /// Send to all targets concurrently with independent timeouts.
    Parallel,
    /// Parallel fan-out; reduction is delegated to the caller.
    Consensus,
}

impl CoordinateMode {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "sequential" => Some(CoordinateMode::Sequential),
            "parallel" => Some(CoordinateMode::Parallel),
            "consensus" => Some(CoordinateMode::Consensus),
            _ => None,
        }
    }
}

/// One target's result in a coordination or broadcast.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TargetReply {
    pub instance_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reply: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<RpcErrorBody>,
}

/// Outcome of a coordinate call. Sequential replies are ordered; parallel
/// and consensus replies carry no ordering guarantee.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoordinateOutcome {
    pub mode: CoordinateMode,
    pub replies: Vec<TargetReply>,
}

impl<P: PaneAdapter, C: Clock + 'static, G: IdGen + 'static> Orchestrator<P, C, G> {
    /// Deliver the same payload to every live child of `parent_id`
    /// concurrently. Returns one entry per child, ack or error; a
    /// terminated child shows up as `NotFound` rather than being skipped.
    pub async fn broadcast(
        self: &Arc<Self>,
        parent_id: &InstanceId,
        payload: &str,
    ) -> Result<Vec<TargetReply>, OrchestratorError> {
        // Parent may itself be terminated; broadcast still reaches children
        self.registry.get_required(parent_id, true)?;
        let children = self.registry.children_of(parent_id, true);

        let mut set: JoinSet<TargetReply> = JoinSet::new();
        for child in children {
            let orch = Arc::clone(self);
            let payload = payload.to_string();
            set.spawn(async move {
                let result = orch
                    .send_message(
                        &child.id,
                        &payload,
                        MessageSource::External,
                        false,
                        Duration::from_secs(30),
                    )
                    .await;
                match result {
                    Ok(_) => TargetReply {
                        instance_id: child.id.to_string(),
                        reply: None,
                        error: None,
                    },
                    Err(e) => TargetReply {
                        instance_id: child.id.to_string(),
                        reply: None,
                        error: Some(e.to_body()),
                    },
                }
            });
        }

        let mut replies = Vec::new();
        while let Some(joined) = set.join_next().await {
            match joined {
                Ok(reply) => replies.push(reply),
                Err(e) => tracing::error!(error = %e, "broadcast task panicked"),
            }
        }
        replies.sort_by(|a, b| a.instance_id.cmp(&b.instance_id));
        Ok(replies)
    }

    /// Run a multi-instance workflow over `targets`.
    ///
    /// Sequential mode fails fast on the first error; parallel and
    /// consensus modes succeed if at least one target succeeded.
    pub async fn coordinate(
        self: &Arc<Self>,
        targets: &[InstanceId],
        mode: CoordinateMode,
        payload: &str,
        per_step_timeout: Duration,
    ) -> Result<CoordinateOutcome, OrchestratorError> {
        if targets.is_empty() {
            return Err(OrchestratorError::invalid_argument(
                "no coordination targets",
                "pass at least one instance id",
            ));
        }
        match mode {
            CoordinateMode::Sequential => {
                self.coordinate_sequential(targets, payload, per_step_timeout)
                    .await
            }
            CoordinateMode::Parallel | CoordinateMode::Consensus => {
                self.coordinate_parallel(targets, mode, payload, per_step_timeout)
                    .await
            }
        }
    }

    async fn coordinate_sequential(
        &self,
        targets: &[InstanceId],
        payload: &str,
        per_step_timeout: Duration,
    ) -> Result<CoordinateOutcome, OrchestratorError> {
        let mut replies = Vec::with_capacity(targets.len());
        let mut context: Option<(InstanceId, String)> = None;

        for target in targets {
            let message = match &context {
                None => payload.to_string(),
                Some((prev_id, prev_reply)) => format!(
                    "{}\n\n[Reply from {}]\n{}",
                    payload, prev_id, prev_reply
                ),
            };
            let outcome = self
                .send_message(
                    target,
                    &message,
                    MessageSource::External,
                    true,
                    per_step_timeout,
                )
                .await?;
            let reply = outcome.reply.unwrap_or_default();
            context = Some((target.clone(), reply.clone()));
            replies.push(TargetReply {
                instance_id: target.to_string(),
                reply: Some(reply),
                error: None,
            });
        }

        Ok(CoordinateOutcome {
            mode: CoordinateMode::Sequential,
            replies,
        })
    }

    async fn coordinate_parallel(
        self: &Arc<Self>,
        targets: &[InstanceId],
        mode: CoordinateMode,
        payload: &str,
        per_step_timeout: Duration,
    ) -> Result<CoordinateOutcome, OrchestratorError> {
        let mut set: JoinSet<TargetReply> = JoinSet::new();
        for target in targets {
            let orch = Arc::clone(self);
            let target = target.clone();
            let payload = payload.to_string();
            set.spawn(async move {
                let result = orch
                    .send_message(
                        &target,
                        &payload,
                        MessageSource::External,
                        true,
                        per_step_timeout,
                    )
                    .await;
                match result {
                    Ok(outcome) => TargetReply {
                        instance_id: target.to_string(),
                        reply: outcome.reply,
                        error: None,
                    },
                    Err(e) => TargetReply {
                        instance_id: target.to_string(),
                        reply: None,
                        error: Some(e.to_body()),
                    },
                }
            });
        }

        let mut replies = Vec::new();
        while let Some(joined) = set.join_next().await {
            match joined {
                Ok(reply) => replies.push(reply),
                Err(e) => tracing::error!(error = %e, "coordinate task panicked"),
            }
        }

        if replies.iter().all(|r| r.error.is_some()) {
            return Err(OrchestratorError::SendFailed(
                "all coordination targets failed".to_string(),
            ));
        }
        Ok(CoordinateOutcome { mode, replies })
    }

    /// Gather artifacts from every descendant of a team root, terminated
    /// descendants included.
    ///
    /// Source priority per descendant: the preserved artifacts directory if
    /// one exists, the live workspace if the instance still runs, otherwise
    /// the descendant is recorded as absent and skipped.
    pub async fn collect_team_artifacts(
        &self,
        root_id: &InstanceId,
    ) -> Result<TeamArtifactManifest, OrchestratorError> {
        self.registry.get_required(root_id, true)?;
        let descendants = self.registry.descendants_of(root_id);

        let mut entries = Vec::with_capacity(descendants.len());
        for record in descendants {
            let preserved_dir = self.config.artifacts_root.join(record.id.as_str());
            let entry = if tokio::fs::try_exists(&preserved_dir).await.unwrap_or(false) {
                let files = list_preserved(&preserved_dir).await;
                ManifestEntry {
                    instance_id: record.id.to_string(),
                    name: record.name.clone(),
                    source: ArtifactSource::Preserved,
                    file_count: files.len(),
                    files,
                }
            } else if record.state.is_live() {
                let files = artifacts::scan_artifacts(
                    &record.workspace,
                    &self.config.artifact_patterns,
                )
                .await
                .unwrap_or_default()
                .iter()
                .map(|p| p.display().to_string())
                .collect::<Vec<_>>();
                ManifestEntry {
                    instance_id: record.id.to_string(),
                    name: record.name.clone(),
                    source: ArtifactSource::Workspace,
                    file_count: files.len(),
                    files,
                }
            } else {
                ManifestEntry {
                    instance_id: record.id.to_string(),
                    name: record.name.clone(),
                    source: ArtifactSource::Absent,
                    files: Vec::new(),
                    file_count: 0,
                }
            };
            entries.push(entry);
        }

        entries.sort_by(|a, b| a.instance_id.cmp(&b.instance_id));
        Ok(TeamArtifactManifest {
            root_id: root_id.to_string(),
            entries,
        })
    }
}

/// Preserved artifact files, relative to the preserved directory, with the
/// metadata file itself excluded.
async fn list_preserved(dir: &std::path::Path) -> Vec<String> {
    let all = artifacts::scan_artifacts(dir, &["*".to_string()])
        .await
        .unwrap_or_default();
    all.iter()
        .map(|p| p.display().to_string())
        .filter(|name| name != "_metadata.json")
        .collect()
}

#[cfg(test)]
#[path = "coordinator_tests.rs"]
mod tests;
