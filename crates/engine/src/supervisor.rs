// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Supervisor: periodic network evaluation and bounded interventions.
//!
//! Each cycle mines a bounded transcript tail per instance for progress
//! signals, classifies the instance, and intervenes through the message
//! bus only. The supervisor has no privileged pane access beyond read-only
//! capture; a per-instance error is recorded and the cycle moves on.

use crate::config::SupervisorConfig;
use crate::orchestrator::Orchestrator;
use foreman_adapters::{PaneAdapter, TranscriptParser};
use foreman_core::{
    Clock, FeedEvent, IdGen, InstanceId, InstanceKind, InstanceRecord, MessageSource,
    ProgressClass, Signal, SignalKind, TranscriptEvent,
};
use parking_lot::Mutex;
use regex::Regex;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::LazyLock;
use std::time::Duration;

/// Signal patterns with their confidences. Word-boundary, case-insensitive.
static SIGNAL_PATTERNS: LazyLock<Vec<(SignalKind, f64, Regex)>> = LazyLock::new(|| {
    [
        (SignalKind::Completion, 0.9, r"(?i)\b(done|finished|completed)\b"),
        (SignalKind::Active, 0.85, r"(?i)\b(working|analyzing|processing)\b"),
        (SignalKind::Blocked, 0.8, r"(?i)\b(blocked|stuck|waiting for)\b"),
        (SignalKind::Error, 0.9, r"(?i)\b(error|failed|exception)\b"),
    ]
    .into_iter()
    .filter_map(|(kind, confidence, pattern)| {
        Regex::new(pattern).ok().map(|re| (kind, confidence, re))
    })
    .collect()
});

/// Confidence assigned to structured tool_use events.
const TOOL_USE_CONFIDENCE: f64 = 0.95;

/// Retention patterns handed to each instance's transcript parser so the
/// human-readable lines the supervisor cares about survive parsing.
fn retain_patterns() -> Vec<Regex> {
    SIGNAL_PATTERNS.iter().map(|(_, _, re)| re.clone()).collect()
}

/// Smoothing factor for the per-instance signal-rate baseline.
const BASELINE_ALPHA: f64 = 0.2;

/// Per-instance supervisor bookkeeping.
struct InstanceWatch {
    parser: TranscriptParser,
    /// Timestamp of the most recent signal of any kind.
    last_signal_ms: u64,
    /// Most recent completion signal, cleared by later work signals.
    completion_ms: Option<u64>,
    /// Error signal timestamps inside the rolling window.
    error_times: Vec<u64>,
    /// One-shot error-loop probe latch.
    error_probed: bool,
    /// Rolling signals-per-cycle rate; the anomaly reference.
    baseline_rate: f64,
    created_ms: u64,
}

impl InstanceWatch {
    fn new(now_ms: u64) -> Self {
        Self {
            parser: TranscriptParser::new(retain_patterns()),
            last_signal_ms: now_ms,
            completion_ms: None,
            error_times: Vec::new(),
            error_probed: false,
            baseline_rate: 0.0,
            created_ms: now_ms,
        }
    }

    /// Fold this cycle's signal count into the rolling baseline.
    fn update_baseline(&mut self, signals_this_cycle: usize) {
        self.baseline_rate = (1.0 - BASELINE_ALPHA) * self.baseline_rate
            + BASELINE_ALPHA * signals_this_cycle as f64;
    }
}

/// Supervisor state: per-instance watches, owned by the orchestrator.
#[derive(Default)]
pub struct SupervisorState {
    watches: Mutex<HashMap<InstanceId, InstanceWatch>>,
}

impl SupervisorState {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn forget(&self, id: &InstanceId) {
        self.watches.lock().remove(id);
    }
}

/// What the evaluation decided to do about one instance.
enum Intervention {
    Message(&'static str),
    SpawnHelper,
    InterimResult,
}

impl<P: PaneAdapter, C: Clock, G: IdGen> Orchestrator<P, C, G> {
    /// Run one full supervisor evaluation cycle over every live instance,
    /// then check the wait-for graph for deadlocks.
    pub async fn supervise_cycle(self: &Arc<Self>) {
        let cfg = self.config.supervisor.clone();
        let now_ms = self.now_ms();

        for record in self.registry.list(false) {
            if !record.state.is_live() {
                continue;
            }
            self.evaluate_instance(&record, &cfg, now_ms).await;
        }

        self.detect_deadlocks(&cfg).await;
        self.health_check();
    }

    /// Evaluate one instance: capture, extract signals, classify,
    /// intervene if warranted.
    async fn evaluate_instance(
        self: &Arc<Self>,
        record: &InstanceRecord,
        cfg: &SupervisorConfig,
        now_ms: u64,
    ) {
        let capture = match self
            .panes
            .capture_scrollback(&record.pane_id, cfg.tail_lines)
            .await
        {
            Ok(capture) => capture,
            Err(e) => {
                tracing::warn!(instance_id = %record.id, error = %e, "supervisor capture failed");
                return;
            }
        };
        self.logs.log_raw_capture(&record.id, &capture).await;

        // Parse + classify under the watch lock (no awaits in this block)
        let (classification, signals, events) = {
            let mut watches = self.supervisor.watches.lock();
            let watch = watches
                .entry(record.id.clone())
                .or_insert_with(|| InstanceWatch::new(record.stats.created_at_ms));

            let parsed = watch.parser.parse(&capture, now_ms);
            let signals = extract_signals(&parsed.events, &parsed.retained_lines, now_ms);

            for signal in &signals {
                watch.last_signal_ms = now_ms;
                match signal.kind {
                    SignalKind::Completion => watch.completion_ms = Some(now_ms),
                    SignalKind::Active | SignalKind::ToolUse => watch.completion_ms = None,
                    SignalKind::Error => watch.error_times.push(now_ms),
                    SignalKind::Blocked => {}
                }
            }
            let window_start = now_ms.saturating_sub(cfg.error_window.as_millis() as u64);
            watch.error_times.retain(|t| *t >= window_start);

            let classification = classify(watch, cfg, now_ms, &signals);
            watch.update_baseline(signals.len());
            if classification != ProgressClass::ErrorLoop {
                watch.error_probed = false;
            }
            (classification, signals, parsed.events)
        };

        self.push_transcript(&record.id, &events);
        self.update_snapshot(&record.id, classification, &signals, now_ms);

        let action = self.plan_intervention(&record.id, classification, cfg, now_ms);
        if let Some(action) = action {
            self.intervene(record, action, now_ms).await;
        }
    }

    /// Update the progress snapshot and announce classification changes.
    fn update_snapshot(
        &self,
        id: &InstanceId,
        classification: ProgressClass,
        signals: &[Signal],
        now_ms: u64,
    ) {
        let changed = {
            let mut progress = self.progress.lock();
            let snapshot = progress
                .entry(id.clone())
                .or_insert_with(|| foreman_core::ProgressSnapshot::new(now_ms));
            let changed = snapshot.classification != classification;
            snapshot.classification = classification;
            for signal in signals {
                match signal.kind {
                    SignalKind::ToolUse => snapshot.tool_use_count += 1,
                    SignalKind::Error => snapshot.error_count += 1,
                    SignalKind::Active | SignalKind::Completion => {}
                    SignalKind::Blocked => {}
                }
                snapshot.last_activity_ms = now_ms;
            }
            changed
        };
        if changed {
            self.feed.emit(FeedEvent::ProgressUpdate {
                instance_id: id.clone(),
                classification,
                at_ms: now_ms,
            });
            tracing::info!(instance_id = %id, classification = %classification, "progress classification changed");
        }
    }

    /// Decide whether (and how) to intervene, honoring the cooldown, the
    /// per-instance cap, and the escalation latch.
    fn plan_intervention(
        &self,
        id: &InstanceId,
        classification: ProgressClass,
        cfg: &SupervisorConfig,
        now_ms: u64,
    ) -> Option<Intervention> {
        let mut progress = self.progress.lock();
        let snapshot = progress.get_mut(id)?;

        if snapshot.escalated {
            return None;
        }
        if let Some(last) = snapshot.last_intervention_ms {
            if now_ms.saturating_sub(last) < cfg.cooldown.as_millis() as u64 {
                return None;
            }
        }

        match classification {
            ProgressClass::Stuck => {
                if snapshot.interventions >= cfg.max_interventions {
                    snapshot.escalated = true;
                    tracing::warn!(
                        instance_id = %id,
                        interventions = snapshot.interventions,
                        "intervention cap reached, escalating for external attention"
                    );
                    return None;
                }
                Some(match snapshot.interventions {
                    0 => Intervention::Message(
                        "Status check: please summarize what you are currently doing.",
                    ),
                    1 => Intervention::Message(
                        "You appear stuck. Do you need help? Describe the blocker.",
                    ),
                    _ => Intervention::SpawnHelper,
                })
            }
            ProgressClass::Waiting => Some(Intervention::Message(
                "Standing by? A new task may be incoming; confirm you are idle.",
            )),
            ProgressClass::ErrorLoop => {
                let mut watches = self.supervisor.watches.lock();
                let watch = watches.get_mut(id)?;
                if watch.error_probed {
                    return None;
                }
                watch.error_probed = true;
                Some(Intervention::Message(
                    "Summarize the last error and what you already tried.",
                ))
            }
            _ => None,
        }
    }

    /// Execute one intervention through the message bus.
    async fn intervene(self: &Arc<Self>, record: &InstanceRecord, action: Intervention, now_ms: u64) {
        let sent = match action {
            Intervention::Message(text) => self.send_intervention(&record.id, text).await,
            Intervention::InterimResult => {
                self.send_intervention(
                    &record.id,
                    "Another instance is blocked waiting on you. Post an interim result \
                     with reply_to_caller for any pending message.",
                )
                .await
            }
            Intervention::SpawnHelper => self.spawn_helper(record).await,
        };
        if sent {
            let mut progress = self.progress.lock();
            if let Some(snapshot) = progress.get_mut(&record.id) {
                snapshot.interventions += 1;
                snapshot.last_intervention_ms = Some(now_ms);
            }
        }
    }

    async fn send_intervention(&self, id: &InstanceId, text: &str) -> bool {
        match self
            .send_message(id, text, MessageSource::External, false, Duration::from_secs(30))
            .await
        {
            Ok(_) => {
                tracing::info!(instance_id = %id, "intervention sent");
                true
            }
            Err(e) => {
                tracing::warn!(instance_id = %id, error = %e, "intervention send failed");
                false
            }
        }
    }

    /// Third-stage stuck intervention: spawn a debugger helper next to the
    /// stuck instance and tell the original about it.
    async fn spawn_helper(self: &Arc<Self>, record: &InstanceRecord) -> bool {
        let request = crate::instance::SpawnRequest {
            name: format!("{}-helper", record.name),
            kind: InstanceKind::Claude,
            role: "debugger".to_string(),
            parent_id: record.parent_id.clone(),
            system_prompt: None,
            initial_prompt: Some(format!(
                "Instance '{}' ({}) appears stuck. Inspect its recent output with \
                 get_output and help it make progress.",
                record.name, record.id
            )),
            model: None,
            wait_for_ready: false,
        };
        match self.spawn_instance(request).await {
            Ok(helper) => {
                tracing::info!(
                    instance_id = %record.id,
                    helper_id = %helper.id,
                    "spawned debugger helper"
                );
                self.send_intervention(
                    &record.id,
                    "A debugger helper instance has been spawned to assist you. \
                     Summarize your current state so it can pick up.",
                )
                .await
            }
            Err(e) => {
                tracing::warn!(instance_id = %record.id, error = %e, "helper spawn failed");
                false
            }
        }
    }

    /// Detect circular waits in the derived wait-for graph and nudge one
    /// participant (the highest id, deterministically) per cycle.
    async fn detect_deadlocks(self: &Arc<Self>, cfg: &SupervisorConfig) {
        let edges = self.bus.wait_edges();
        let Some(cycle) = find_cycle(&edges) else {
            return;
        };
        let Some(victim) = cycle.iter().max().cloned() else {
            return;
        };
        tracing::warn!(
            cycle = ?cycle.iter().map(|i| i.to_string()).collect::<Vec<_>>(),
            victim = %victim,
            "circular wait detected"
        );

        let now_ms = self.now_ms();
        let Some(record) = self.registry.get(&victim, false) else {
            return;
        };
        // Deadlock nudges honor the same cooldown and escalation gates
        let gate_ok = {
            let progress = self.progress.lock();
            progress
                .get(&victim)
                .map(|snapshot| {
                    !snapshot.escalated
                        && snapshot
                            .last_intervention_ms
                            .map(|last| {
                                now_ms.saturating_sub(last) >= cfg.cooldown.as_millis() as u64
                            })
                            .unwrap_or(true)
                })
                .unwrap_or(false)
        };
        if gate_ok {
            self.intervene(&record, Intervention::InterimResult, now_ms)
                .await;
        }
    }
}

/// Extract progress signals from structured events and retained lines.
fn extract_signals(
    events: &[TranscriptEvent],
    retained_lines: &[String],
    now_ms: u64,
) -> Vec<Signal> {
    let mut signals = Vec::new();

    for event in events {
        if event.is_tool_use() {
            signals.push(Signal {
                kind: SignalKind::ToolUse,
                confidence: TOOL_USE_CONFIDENCE,
                at_ms: now_ms,
            });
        }
        if event.is_error() {
            signals.push(Signal {
                kind: SignalKind::Error,
                confidence: 0.9,
                at_ms: now_ms,
            });
        }
        if let TranscriptEvent::AssistantText { text, .. } = event {
            push_pattern_signals(text, now_ms, &mut signals);
        }
    }
    for line in retained_lines {
        push_pattern_signals(line, now_ms, &mut signals);
    }

    signals
}

fn push_pattern_signals(text: &str, now_ms: u64, signals: &mut Vec<Signal>) {
    for (kind, confidence, pattern) in SIGNAL_PATTERNS.iter() {
        if pattern.is_match(text) {
            signals.push(Signal {
                kind: *kind,
                confidence: *confidence,
                at_ms: now_ms,
            });
        }
    }
}

/// Seven-way classification from the per-instance watch.
fn classify(
    watch: &InstanceWatch,
    cfg: &SupervisorConfig,
    now_ms: u64,
    new_signals: &[Signal],
) -> ProgressClass {
    if watch.error_times.len() >= cfg.error_loop_threshold as usize {
        return ProgressClass::ErrorLoop;
    }

    let quiet_ms = now_ms.saturating_sub(watch.last_signal_ms);
    if quiet_ms > cfg.stuck_threshold.as_millis() as u64 {
        return ProgressClass::Stuck;
    }

    if let Some(completion_ms) = watch.completion_ms {
        if now_ms.saturating_sub(completion_ms) > cfg.waiting_threshold.as_millis() as u64 {
            return ProgressClass::Waiting;
        }
    }

    let has_work = new_signals
        .iter()
        .any(|s| matches!(s.kind, SignalKind::Active | SignalKind::ToolUse));
    if has_work {
        return ProgressClass::Active;
    }

    // Output rate fell below the baseline while errors are around
    let below_baseline = (new_signals.len() as f64) < watch.baseline_rate / 2.0;
    if !watch.error_times.is_empty() && below_baseline {
        return ProgressClass::Degraded;
    }

    // Fresh instances have not had a chance to signal yet
    if now_ms.saturating_sub(watch.created_ms) < 2 * cfg.interval.as_millis() as u64 {
        return ProgressClass::Healthy;
    }

    ProgressClass::Idle
}

/// Find one cycle in the wait-for graph, if any. Returns the nodes on the
/// cycle. The graph is tiny (one edge per outstanding envelope), so a
/// simple colored DFS is enough.
fn find_cycle(
    edges: &[(InstanceId, InstanceId, foreman_core::MessageId)],
) -> Option<Vec<InstanceId>> {
    use std::collections::HashSet;

    let mut adjacency: HashMap<&InstanceId, Vec<&InstanceId>> = HashMap::new();
    for (source, target, _) in edges {
        adjacency.entry(source).or_default().push(target);
    }

    fn visit<'a>(
        node: &'a InstanceId,
        adjacency: &HashMap<&'a InstanceId, Vec<&'a InstanceId>>,
        done: &mut HashSet<&'a InstanceId>,
        path: &mut Vec<&'a InstanceId>,
    ) -> Option<Vec<InstanceId>> {
        if let Some(start) = path.iter().position(|n| *n == node) {
            return Some(path[start..].iter().map(|n| (*n).clone()).collect());
        }
        if done.contains(node) {
            return None;
        }
        path.push(node);
        if let Some(next) = adjacency.get(node) {
            for target in next {
                if let Some(cycle) = visit(*target, adjacency, done, path) {
                    return Some(cycle);
                }
            }
        }
        path.pop();
        done.insert(node);
        None
    }

    let mut done = HashSet::new();
    let roots: Vec<&InstanceId> = adjacency.keys().copied().collect();
    for node in roots {
        let mut path = Vec::new();
        if let Some(cycle) = visit(node, &adjacency, &mut done, &mut path) {
            return Some(cycle);
        }
    }
    None
}

/// Start the periodic supervisor task. Runs until the orchestrator is
/// dropped by every other holder.
pub fn spawn_supervisor<P: PaneAdapter, C: Clock, G: IdGen>(
    orch: Arc<Orchestrator<P, C, G>>,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(orch.config().supervisor.interval);
        // The first tick fires immediately; skip it so a fresh network is
        // not evaluated before instances settle.
        ticker.tick().await;
        loop {
            ticker.tick().await;
            orch.supervise_cycle().await;
        }
    })
}

#[cfg(test)]
#[path = "supervisor_tests.rs"]
mod tests;
