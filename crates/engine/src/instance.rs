// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Instance engine: spawning, message delivery, termination, and output
//! capture for one assistant instance.
//!
//! Every instance gets an owning task that drains its inbound queue and is
//! the only code that writes into its pane. This serializes the paste-safe
//! keystroke stream per instance while instances proceed in parallel.

use crate::artifacts;
use crate::bus::DeliveryJob;
use crate::logs::{CommDirection, CommRecord};
use crate::orchestrator::Orchestrator;
use foreman_adapters::launch::{self, LaunchPlan, ToolEndpoint};
use foreman_adapters::{deliver_text, PaneAdapter, PaneError, WriteError};
use foreman_core::{
    estimate_cost, estimate_tokens, format_iso_utc, AuditEvent, AuditRecord, Clock, FeedEvent,
    IdGen, InstanceId, InstanceKind, InstanceRecord, InstanceStats, LifecycleState,
    MessageEnvelope, MessageId, MessageSource, OrchestratorError, ProgressSnapshot,
};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

/// Bound on the ready-sentinel wait during spawn.
const READY_TIMEOUT: Duration = Duration::from_secs(120);

/// Scrollback depth captured when persisting final output at termination.
const FINAL_CAPTURE_LINES: u32 = 500;

/// Scrollback depth for reply fallback polls.
const FALLBACK_CAPTURE_LINES: u32 = 100;

/// Model names accepted for Codex-style instances. Legacy completion-era
/// names are rejected up front with a hint.
pub const VALID_CODEX_MODELS: &[&str] = &["gpt-5-codex", "gpt-5", "o4-mini"];

/// Everything needed to spawn one instance.
#[derive(Debug, Clone)]
pub struct SpawnRequest {
    pub name: String,
    pub kind: InstanceKind,
    pub role: String,
    pub parent_id: Option<InstanceId>,
    pub system_prompt: Option<String>,
    pub initial_prompt: Option<String>,
    pub model: Option<String>,
    pub wait_for_ready: bool,
}

impl SpawnRequest {
    pub fn new(name: impl Into<String>, kind: InstanceKind) -> Self {
        Self {
            name: name.into(),
            kind,
            role: "general".to_string(),
            parent_id: None,
            system_prompt: None,
            initial_prompt: None,
            model: None,
            wait_for_ready: false,
        }
    }
}

/// Result of a send: the message id, plus the reply when one was awaited.
#[derive(Debug, Clone)]
pub struct SendOutcome {
    pub message_id: MessageId,
    pub reply: Option<String>,
}

impl<P: PaneAdapter, C: Clock + 'static, G: IdGen + 'static> Orchestrator<P, C, G> {
    /// Spawn a new assistant instance.
    pub async fn spawn_instance(
        self: &Arc<Self>,
        req: SpawnRequest,
    ) -> Result<InstanceRecord, OrchestratorError> {
        self.check_capacity()?;
        validate_model(req.kind, req.model.as_deref())?;

        // Parent must exist at spawn time; it may terminate later.
        if let Some(parent) = &req.parent_id {
            self.registry.get_required(parent, true)?;
        }

        let id = InstanceId::new(self.id_gen.next());
        let now_ms = self.now_ms();
        let workspace = self.config.workspace_root.join(id.as_str());
        tokio::fs::create_dir_all(&workspace)
            .await
            .map_err(|e| OrchestratorError::SpawnFailed(format!("workspace: {}", e)))?;

        self.registry.insert(InstanceRecord {
            id: id.clone(),
            name: req.name.clone(),
            kind: req.kind,
            role: req.role.clone(),
            workspace: workspace.clone(),
            parent_id: req.parent_id.clone(),
            pane_id: String::new(),
            state: LifecycleState::Creating,
            model: req.model.clone(),
            system_prompt: req.system_prompt.clone(),
            stats: InstanceStats {
                created_at_ms: now_ms,
                last_activity_ms: now_ms,
                ..InstanceStats::default()
            },
            final_output: None,
        })?;
        self.progress
            .lock()
            .insert(id.clone(), ProgressSnapshot::new(now_ms));

        let plan = LaunchPlan {
            kind: req.kind,
            model: req.model.clone(),
            system_prompt: req.system_prompt.clone(),
            initial_prompt: req.initial_prompt.clone(),
            tools: self.child_tool_endpoints(req.kind),
        };

        let pane_id = match self.create_pane(&id, &req, &plan, &workspace).await {
            Ok(pane_id) => pane_id,
            Err(e) => {
                let _ = self.set_state(&id, LifecycleState::Error);
                return Err(e);
            }
        };

        self.registry
            .update(&id, |r| r.pane_id = pane_id.clone())?;
        self.set_state(&id, LifecycleState::Initializing)?;

        // Claude-style CLIs show a bypass-permissions dialog on first run
        if req.kind == InstanceKind::Claude {
            let attempts = foreman_adapters::env::prompt_poll_max_attempts();
            if let Err(e) = launch::handle_bypass_prompt(&self.panes, &pane_id, attempts).await {
                tracing::warn!(instance_id = %id, error = %e, "bypass prompt check failed");
            }
        }

        // Owning task: the only writer for this instance's pane
        let jobs = self.bus.register_instance(&id);
        tokio::spawn(writer_loop(
            Arc::clone(self),
            id.clone(),
            pane_id.clone(),
            jobs,
        ));

        if req.wait_for_ready {
            match launch::wait_for_ready(&self.panes, &pane_id, req.kind, READY_TIMEOUT).await {
                Ok(true) => self.set_state(&id, LifecycleState::Running)?,
                Ok(false) => {
                    let _ = self.panes.kill(&pane_id).await;
                    self.bus.unregister_instance(&id);
                    let _ = self.set_state(&id, LifecycleState::Error);
                    return Err(OrchestratorError::SpawnFailed(format!(
                        "instance {} not ready within {}s",
                        id,
                        READY_TIMEOUT.as_secs()
                    )));
                }
                Err(e) => {
                    self.bus.unregister_instance(&id);
                    let _ = self.set_state(&id, LifecycleState::Error);
                    return Err(OrchestratorError::SpawnFailed(e.to_string()));
                }
            }
        } else {
            // Transition to running asynchronously once the CLI is up
            let orch = Arc::clone(self);
            let ready_id = id.clone();
            let ready_pane = pane_id.clone();
            let kind = req.kind;
            tokio::spawn(async move {
                match launch::wait_for_ready(&orch.panes, &ready_pane, kind, READY_TIMEOUT).await {
                    Ok(true) => {
                        let _ = orch.set_state(&ready_id, LifecycleState::Running);
                    }
                    Ok(false) | Err(_) => {
                        let still_initializing = orch
                            .registry
                            .get(&ready_id, false)
                            .is_some_and(|r| r.state == LifecycleState::Initializing);
                        if still_initializing {
                            tracing::error!(instance_id = %ready_id, "assistant never became ready");
                            let _ = orch.set_state(&ready_id, LifecycleState::Error);
                        }
                    }
                }
            });
        }

        let record = self.registry.get_required(&id, true)?;
        let metadata = serde_json::json!({
            "instance_id": id.as_str(),
            "name": &record.name,
            "kind": record.kind.as_str(),
            "role": &record.role,
            "parent_id": record.parent_id.as_ref().map(|p| p.as_str()),
            "workspace": record.workspace.display().to_string(),
            "pane_id": &record.pane_id,
            "created_at": format_iso_utc(now_ms),
        });
        if let Err(e) = self.logs.write_metadata(&id, &metadata).await {
            tracing::warn!(instance_id = %id, error = %e, "metadata write failed");
        }

        self.logs
            .log_audit(
                now_ms,
                AuditRecord {
                    time: format_iso_utc(now_ms),
                    event_type: AuditEvent::InstanceSpawn,
                    instance_id: id.clone(),
                    details: serde_json::json!({
                        "name": &record.name,
                        "kind": record.kind.as_str(),
                        "role": &record.role,
                        "parent_id": record.parent_id.as_ref().map(|p| p.as_str()),
                    }),
                },
            )
            .await;

        tracing::info!(instance_id = %id, name = %record.name, kind = %record.kind, "instance spawned");
        Ok(record)
    }

    /// Tool endpoints handed to a child so it can call back into this
    /// orchestrator. Claude-style children use the HTTP server; Codex-style
    /// children only speak stdio.
    fn child_tool_endpoints(&self, kind: InstanceKind) -> Vec<ToolEndpoint> {
        match kind {
            InstanceKind::Claude => vec![ToolEndpoint::http(
                "foreman",
                format!("http://127.0.0.1:{}/rpc", self.config.rpc_port),
            )],
            InstanceKind::Codex => vec![ToolEndpoint::stdio(
                "foreman",
                "foreman",
                vec!["stdio".to_string()],
            )],
        }
    }

    async fn create_pane(
        &self,
        id: &InstanceId,
        req: &SpawnRequest,
        plan: &LaunchPlan,
        workspace: &std::path::Path,
    ) -> Result<String, OrchestratorError> {
        let pane_name = launch::generate_pane_name(&req.name, &req.role);
        let env = self.child_env(req.kind);

        match req.kind {
            InstanceKind::Claude => {
                // Tool config file must exist before the CLI starts
                if !plan.tools.is_empty() {
                    launch::write_tool_config(workspace, &plan.tools)
                        .await
                        .map_err(|e| {
                            OrchestratorError::SpawnFailed(format!("tool config: {}", e))
                        })?;
                }
                self.panes
                    .create(&pane_name, workspace, &plan.command_line(workspace), &env)
                    .await
                    .map_err(|e| OrchestratorError::SpawnFailed(e.to_string()))
            }
            InstanceKind::Codex => {
                // Codex-style config is issued as in-pane commands before
                // the CLI launches, so the pane starts as a plain shell.
                let pane_id = self
                    .panes
                    .create(&pane_name, workspace, "bash", &env)
                    .await
                    .map_err(|e| OrchestratorError::SpawnFailed(e.to_string()))?;
                launch::configure_tools_in_pane(&self.panes, &pane_id, &plan.tools)
                    .await
                    .map_err(|e| OrchestratorError::SpawnFailed(e.to_string()))?;
                self.panes
                    .send_text(&pane_id, &plan.command_line(workspace), true)
                    .await
                    .map_err(|e| OrchestratorError::SpawnFailed(e.to_string()))?;
                Ok(pane_id)
            }
        }
    }

    fn child_env(&self, kind: InstanceKind) -> Vec<(String, String)> {
        let Some(key) = &self.config.api_key else {
            return Vec::new();
        };
        let var = match kind {
            InstanceKind::Claude => "ANTHROPIC_API_KEY",
            InstanceKind::Codex => "OPENAI_API_KEY",
        };
        vec![(var.to_string(), key.clone())]
    }

    /// Send a payload to an instance.
    ///
    /// The payload is wrapped with a visible `[MSG:<id>]` correlation tag so
    /// the assistant can quote the id in an explicit reply. With
    /// `wait_for_reply`, blocks for an explicit reply up to `timeout`, then
    /// falls back to a scrollback poll before giving up.
    pub async fn send_message(
        &self,
        target: &InstanceId,
        payload: &str,
        source: MessageSource,
        wait_for_reply: bool,
        timeout: Duration,
    ) -> Result<SendOutcome, OrchestratorError> {
        let record = self.registry.get_required(target, false)?;
        let now_ms = self.now_ms();

        let message_id = MessageId::new(self.id_gen.next());
        let envelope = MessageEnvelope::new(
            message_id.clone(),
            source.clone(),
            target.clone(),
            payload,
            now_ms,
        );
        let text = format!("[MSG:{}] {}", message_id, payload);

        let ack = self.bus.deliver(envelope, text)?;
        match ack.await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                self.bus.discard_waiter(&message_id);
                return Err(e);
            }
            Err(_) => {
                self.bus.discard_waiter(&message_id);
                return Err(OrchestratorError::Internal(
                    "instance owner task ended before delivery".to_string(),
                ));
            }
        }

        // Delivery succeeded: account for the request
        let tokens = estimate_tokens(payload);
        let cost = estimate_cost(record.kind, tokens);
        let _ = self.registry.update(target, |r| {
            r.stats.requests += 1;
            r.stats.tokens_estimate += tokens;
            r.stats.cost_estimate += cost;
            r.stats.last_activity_ms = self.clock.epoch_ms();
        });

        let reply = if wait_for_reply {
            Some(self.wait_for_reply(&record, &message_id, timeout).await?)
        } else {
            // Nobody will await this slot; a later reply_to_caller still
            // resolves and journals the envelope.
            self.bus.discard_waiter(&message_id);
            None
        };

        let exchange_ms = self.now_ms();
        self.logs
            .log_audit(
                exchange_ms,
                AuditRecord {
                    time: format_iso_utc(exchange_ms),
                    event_type: AuditEvent::MessageExchange,
                    instance_id: target.clone(),
                    details: serde_json::json!({
                        "message_id": message_id.as_str(),
                        "source": source.to_string(),
                        "wait_for_reply": wait_for_reply,
                        "replied": reply.is_some(),
                    }),
                },
            )
            .await;

        Ok(SendOutcome { message_id, reply })
    }

    /// Await an explicit reply; on timeout run one fallback capture.
    async fn wait_for_reply(
        &self,
        record: &InstanceRecord,
        message_id: &MessageId,
        timeout: Duration,
    ) -> Result<String, OrchestratorError> {
        use crate::bus::ReplyOutcome;

        match self.bus.await_reply(message_id, timeout).await {
            Ok(ReplyOutcome::Replied(text)) => Ok(text),
            Ok(ReplyOutcome::TimedOut) => Err(OrchestratorError::Timeout(
                timeout.as_millis() as u64,
            )),
            Ok(ReplyOutcome::Failed(reason)) => Err(OrchestratorError::SendFailed(reason)),
            Err(OrchestratorError::Timeout(ms)) => {
                // No explicit reply; an older assistant may have answered in
                // the pane without the RPC path. One capture decides.
                match self.fallback_poll(record, message_id).await {
                    Some(text) if !text.is_empty() => {
                        let env = self.bus.reply(message_id, &text, &self.clock)?;
                        self.record_reply(&env).await;
                        Ok(text)
                    }
                    _ => {
                        self.bus.cancel(message_id, None);
                        Err(OrchestratorError::Timeout(ms))
                    }
                }
            }
            Err(e) => Err(e),
        }
    }

    /// Read a fresh scrollback capture and strip the delivered prompt/echo,
    /// leaving whatever the assistant printed after it.
    async fn fallback_poll(
        &self,
        record: &InstanceRecord,
        message_id: &MessageId,
    ) -> Option<String> {
        let capture = self
            .panes
            .capture_scrollback(&record.pane_id, FALLBACK_CAPTURE_LINES)
            .await
            .ok()?;
        self.logs.log_raw_capture(&record.id, &capture).await;
        strip_reply(&capture, message_id)
    }

    /// Attach an explicit reply to an outstanding message (the
    /// reply-to-caller path).
    pub async fn reply_to_message(
        &self,
        message_id: &MessageId,
        payload: &str,
    ) -> Result<(), OrchestratorError> {
        let env = self.bus.reply(message_id, payload, &self.clock)?;
        self.record_reply(&env).await;
        Ok(())
    }

    /// Journal and account for a resolved reply.
    async fn record_reply(&self, env: &MessageEnvelope) {
        let reply = env.reply.clone().unwrap_or_default();
        let tokens = estimate_tokens(&reply);
        let kind = self
            .registry
            .get(&env.target, true)
            .map(|r| r.kind)
            .unwrap_or(InstanceKind::Claude);
        let cost = estimate_cost(kind, tokens);
        let now_ms = self.now_ms();

        let _ = self.registry.update(&env.target, |r| {
            r.stats.tokens_estimate += tokens;
            r.stats.cost_estimate += cost;
            r.stats.last_activity_ms = now_ms;
        });

        self.logs
            .log_comm(
                &env.target,
                CommRecord {
                    time: format_iso_utc(now_ms),
                    event: CommDirection::Received,
                    message_id: env.id.to_string(),
                    direction: "in".to_string(),
                    content: reply,
                    tokens: Some(tokens),
                    cost: Some(cost),
                    response_time: env.response_time_secs(),
                },
            )
            .await;

        self.feed.emit(FeedEvent::MessageExchange {
            instance_id: env.target.clone(),
            message_id: env.id.clone(),
            direction: "received".to_string(),
            at_ms: now_ms,
        });
        self.mark_idle(&env.target);
    }

    /// Terminate an instance: preserve artifacts, kill the pane, delete the
    /// workspace, keep the record.
    pub async fn terminate_instance(
        &self,
        id: &InstanceId,
        force: bool,
    ) -> Result<InstanceRecord, OrchestratorError> {
        let record = self.registry.get_required(id, false)?;
        self.set_state(id, LifecycleState::Terminating)?;

        // Preserve the final scrollback so get_output keeps working
        match self
            .panes
            .capture_scrollback(&record.pane_id, FINAL_CAPTURE_LINES)
            .await
        {
            Ok(capture) => {
                self.logs.log_raw_capture(id, &capture).await;
                let _ = self.registry.update(id, |r| r.final_output = Some(capture));
            }
            Err(e) => tracing::warn!(instance_id = %id, error = %e, "final capture failed"),
        }

        // Preserve artifacts before the workspace goes away
        let mut preserved: Vec<PathBuf> = Vec::new();
        if self.config.preserve_artifacts {
            let dest = self.config.artifacts_root.join(id.as_str());
            match artifacts::preserve_artifacts(
                &record.workspace,
                &dest,
                &self.config.artifact_patterns,
            )
            .await
            {
                Ok(files) => {
                    preserved = files;
                    if !preserved.is_empty() {
                        let current = self.registry.get_required(id, true)?;
                        if let Err(e) =
                            artifacts::write_preservation_metadata(&dest, &current, &preserved)
                                .await
                        {
                            tracing::warn!(instance_id = %id, error = %e, "preservation metadata failed");
                        }
                    }
                }
                Err(e) => tracing::warn!(instance_id = %id, error = %e, "artifact preservation failed"),
            }
        }

        self.bus.unregister_instance(id);

        // Kill the pane. With force=false, give it a moment and escalate
        // to a second kill if it refuses to die.
        if let Err(e) = self.panes.kill(&record.pane_id).await {
            tracing::warn!(instance_id = %id, error = %e, "pane kill failed");
        }
        if !force {
            tokio::time::sleep(Duration::from_millis(200)).await;
            if self.panes.is_alive(&record.pane_id).await.unwrap_or(false) {
                tracing::warn!(instance_id = %id, "pane survived kill, force-killing");
                let _ = self.panes.kill(&record.pane_id).await;
            }
        }

        if let Err(e) = tokio::fs::remove_dir_all(&record.workspace).await {
            if e.kind() != std::io::ErrorKind::NotFound {
                tracing::warn!(instance_id = %id, error = %e, "workspace removal failed");
            }
        }

        self.set_state(id, LifecycleState::Terminated)?;
        let finished = self.registry.get_required(id, true)?;

        let now_ms = self.now_ms();
        self.logs
            .log_audit(
                now_ms,
                AuditRecord {
                    time: format_iso_utc(now_ms),
                    event_type: AuditEvent::InstanceTerminate,
                    instance_id: id.clone(),
                    details: serde_json::json!({
                        "name": &finished.name,
                        "requests": finished.stats.requests,
                        "tokens_estimate": finished.stats.tokens_estimate,
                        "cost_estimate": finished.stats.cost_estimate,
                        "preserved_files": preserved.len(),
                        "forced": force,
                    }),
                },
            )
            .await;

        tracing::info!(instance_id = %id, name = %finished.name, "instance terminated");
        Ok(finished)
    }

    /// Current pane output, or the persisted final capture for terminated
    /// instances.
    pub async fn get_output(
        &self,
        id: &InstanceId,
        tail_lines: u32,
    ) -> Result<String, OrchestratorError> {
        let record = self.registry.get_required(id, true)?;
        if record.state.is_terminal() {
            let output = record.final_output.unwrap_or_default();
            return Ok(tail_of(&output, tail_lines));
        }
        match self
            .panes
            .capture_scrollback(&record.pane_id, tail_lines)
            .await
        {
            Ok(capture) => Ok(capture),
            Err(PaneError::Gone(p)) => Err(OrchestratorError::PaneGone(p)),
            Err(e) => Err(OrchestratorError::Internal(e.to_string())),
        }
    }

    /// Terminate every live instance; used at shutdown so outputs and
    /// artifacts are preserved.
    pub async fn shutdown_all(&self) {
        for record in self.registry.list(false) {
            if record.state.is_live() {
                if let Err(e) = self.terminate_instance(&record.id, true).await {
                    tracing::warn!(instance_id = %record.id, error = %e, "shutdown terminate failed");
                }
            }
        }
    }
}

/// Last `lines` lines of a string (all of it when `lines` is 0).
fn tail_of(text: &str, lines: u32) -> String {
    if lines == 0 {
        return text.to_string();
    }
    let all: Vec<&str> = text.lines().collect();
    let start = all.len().saturating_sub(lines as usize);
    all[start..].join("\n")
}

/// Extract the assistant's answer from a capture: everything after the last
/// echo of the correlation tag, minus prompt chrome.
fn strip_reply(capture: &str, message_id: &MessageId) -> Option<String> {
    let tag = format!("[MSG:{}]", message_id);
    let lines: Vec<&str> = capture.lines().collect();
    let after_echo = lines
        .iter()
        .rposition(|l| l.contains(&tag))
        .map(|pos| pos + 1)
        .unwrap_or(0);

    let body: Vec<&str> = lines[after_echo..]
        .iter()
        .map(|l| l.trim_end())
        .filter(|l| !l.trim().is_empty())
        .filter(|l| !is_prompt_chrome(l))
        .collect();

    if body.is_empty() {
        None
    } else {
        Some(body.join("\n").trim().to_string())
    }
}

/// Lines that belong to the assistant's input box or status chrome.
fn is_prompt_chrome(line: &str) -> bool {
    let trimmed = line.trim_start();
    trimmed.starts_with('>')
        || trimmed.starts_with('│')
        || trimmed.starts_with('╭')
        || trimmed.starts_with('╰')
        || trimmed.starts_with("? for shortcuts")
        || trimmed.starts_with("Ctrl+C to exit")
}

/// The owning task for one instance: drains the inbound queue and performs
/// every pane write for that instance.
async fn writer_loop<P: PaneAdapter, C: Clock, G: IdGen>(
    orch: Arc<Orchestrator<P, C, G>>,
    instance_id: InstanceId,
    pane_id: String,
    mut jobs: mpsc::Receiver<DeliveryJob>,
) {
    while let Some(job) = jobs.recv().await {
        match deliver_text(&orch.panes, &pane_id, &job.text).await {
            Ok(report) => {
                let now_ms = orch.now_ms();
                orch.bus.mark_delivered(&job.message_id, now_ms);

                let content = orch
                    .bus
                    .envelope(&job.message_id)
                    .map(|e| e.payload)
                    .unwrap_or_default();
                let tokens = estimate_tokens(&content);
                orch.logs
                    .log_comm(
                        &instance_id,
                        CommRecord {
                            time: format_iso_utc(now_ms),
                            event: CommDirection::Sent,
                            message_id: job.message_id.to_string(),
                            direction: "out".to_string(),
                            content,
                            tokens: Some(tokens),
                            cost: None,
                            response_time: None,
                        },
                    )
                    .await;
                orch.feed.emit(FeedEvent::MessageExchange {
                    instance_id: instance_id.clone(),
                    message_id: job.message_id.clone(),
                    direction: "sent".to_string(),
                    at_ms: now_ms,
                });
                orch.mark_busy(&instance_id);

                tracing::debug!(
                    instance_id = %instance_id,
                    message_id = %job.message_id,
                    keystrokes = report.keystrokes,
                    "message delivered"
                );
                let _ = job.ack.send(Ok(()));
            }
            Err(WriteError::SendFailed { offset, reason }) => {
                let message = format!("at byte {}: {}", offset, reason);
                orch.bus.mark_failed(&job.message_id, &message);
                tracing::error!(
                    instance_id = %instance_id,
                    message_id = %job.message_id,
                    offset,
                    "pane write aborted"
                );
                let _ = job.ack.send(Err(OrchestratorError::SendFailed(message)));
            }
        }
    }
    tracing::debug!(instance_id = %instance_id, "owner task finished");
}

/// Reject legacy model names for Codex-style instances.
fn validate_model(kind: InstanceKind, model: Option<&str>) -> Result<(), OrchestratorError> {
    let Some(model) = model else {
        return Ok(());
    };
    if kind == InstanceKind::Codex && !VALID_CODEX_MODELS.contains(&model) {
        return Err(OrchestratorError::invalid_argument(
            format!("unsupported codex model '{}'", model),
            format!("valid models: {}", VALID_CODEX_MODELS.join(", ")),
        ));
    }
    Ok(())
}

#[cfg(test)]
#[path = "instance_tests.rs"]
mod tests;
