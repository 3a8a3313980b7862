// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The process-wide orchestrator value.
//!
//! Registry, bus, log plane, and monitor feed are deliberately not ambient
//! globals: one `Orchestrator` is created at startup and passed by `Arc`
//! to every handler, task, and transport.

use crate::bus::MessageBus;
use crate::config::Config;
use crate::feed::MonitorFeed;
use crate::logs::LogPlane;
use crate::registry::InstanceRegistry;
use crate::supervisor::SupervisorState;
use foreman_adapters::PaneAdapter;
use foreman_core::{
    Clock, FeedEvent, IdGen, InstanceId, LifecycleState, OrchestratorError, ProgressSnapshot,
    TranscriptEvent,
};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

/// Per-instance transcript history cap.
const TRANSCRIPT_HISTORY: usize = 1000;

/// The orchestrator: owns every process-wide component and the per-instance
/// state maps. Handlers receive it as `Arc<Orchestrator<...>>`.
pub struct Orchestrator<P: PaneAdapter, C: Clock, G: IdGen> {
    pub(crate) config: Config,
    pub(crate) panes: P,
    pub(crate) clock: C,
    pub(crate) id_gen: G,
    pub registry: InstanceRegistry,
    pub bus: MessageBus,
    pub logs: LogPlane,
    pub feed: MonitorFeed,
    pub(crate) progress: Mutex<HashMap<InstanceId, ProgressSnapshot>>,
    pub(crate) transcripts: Mutex<HashMap<InstanceId, Vec<TranscriptEvent>>>,
    pub(crate) supervisor: SupervisorState,
    started: Instant,
}

impl<P: PaneAdapter, C: Clock, G: IdGen> Orchestrator<P, C, G> {
    /// Create directories, start the log plane, and return the shared
    /// orchestrator value. An unwritable log root is fatal here.
    pub async fn start(
        config: Config,
        panes: P,
        clock: C,
        id_gen: G,
    ) -> Result<Arc<Self>, OrchestratorError> {
        tokio::fs::create_dir_all(&config.workspace_root)
            .await
            .map_err(|e| OrchestratorError::Internal(format!("workspace root: {}", e)))?;
        tokio::fs::create_dir_all(&config.artifacts_root)
            .await
            .map_err(|e| OrchestratorError::Internal(format!("artifacts root: {}", e)))?;

        let logs = LogPlane::start(&config.log_root)
            .await
            .map_err(|e| OrchestratorError::Internal(format!("log root: {}", e)))?;

        let now_ms = clock.epoch_ms();
        if let Err(e) = logs.sweep_audit_retention(now_ms).await {
            tracing::warn!(error = %e, "audit retention sweep failed");
        }

        Ok(Arc::new(Self {
            config,
            panes,
            clock,
            id_gen,
            registry: InstanceRegistry::new(),
            bus: MessageBus::new(),
            logs,
            feed: MonitorFeed::new(),
            progress: Mutex::new(HashMap::new()),
            transcripts: Mutex::new(HashMap::new()),
            supervisor: SupervisorState::new(),
            started: Instant::now(),
        }))
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    pub(crate) fn now_ms(&self) -> u64 {
        self.clock.epoch_ms()
    }

    pub fn uptime_secs(&self) -> u64 {
        self.started.elapsed().as_secs()
    }

    /// Transition an instance's lifecycle state and announce it on the
    /// monitor feed.
    pub(crate) fn set_state(
        &self,
        id: &InstanceId,
        to: LifecycleState,
    ) -> Result<(), OrchestratorError> {
        let (from, to) = self.registry.set_state(id, to)?;
        self.feed.emit(FeedEvent::InstanceStateChanged {
            instance_id: id.clone(),
            from,
            to,
            at_ms: self.now_ms(),
        });
        Ok(())
    }

    /// Mark a running instance busy. No-op when not in a state with a
    /// busy edge (already busy, still initializing).
    pub(crate) fn mark_busy(&self, id: &InstanceId) {
        if let Some(record) = self.registry.get(id, false) {
            if record.state.can_transition_to(LifecycleState::Busy) {
                let _ = self.set_state(id, LifecycleState::Busy);
            }
        }
    }

    /// Mark a running instance idle again after a reply.
    pub(crate) fn mark_idle(&self, id: &InstanceId) {
        if let Some(record) = self.registry.get(id, false) {
            if record.state.can_transition_to(LifecycleState::Idle) {
                let _ = self.set_state(id, LifecycleState::Idle);
            }
        }
    }

    /// Progress snapshot for one instance.
    pub fn progress_of(&self, id: &InstanceId) -> Option<ProgressSnapshot> {
        self.progress.lock().get(id).cloned()
    }

    /// All progress snapshots.
    pub fn progress_all(&self) -> Vec<(InstanceId, ProgressSnapshot)> {
        let mut all: Vec<_> = self
            .progress
            .lock()
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        all.sort_by(|a, b| a.0.cmp(&b.0));
        all
    }

    /// Transcript history for one instance, most recent last.
    pub fn transcript_of(&self, id: &InstanceId, limit: usize) -> Vec<TranscriptEvent> {
        let transcripts = self.transcripts.lock();
        let events = transcripts.get(id).cloned().unwrap_or_default();
        if limit > 0 && events.len() > limit {
            events[events.len() - limit..].to_vec()
        } else {
            events
        }
    }

    /// Append transcript events for an instance, keeping a bounded history.
    pub(crate) fn push_transcript(&self, id: &InstanceId, events: &[TranscriptEvent]) {
        if events.is_empty() {
            return;
        }
        let mut transcripts = self.transcripts.lock();
        let history = transcripts.entry(id.clone()).or_default();
        history.extend_from_slice(events);
        if history.len() > TRANSCRIPT_HISTORY {
            let excess = history.len() - TRANSCRIPT_HISTORY;
            history.drain(..excess);
        }
    }

    /// Remove a terminated instance entirely: registry record, progress,
    /// and transcript history.
    pub fn purge_instance(&self, id: &InstanceId) -> Result<(), OrchestratorError> {
        self.registry.purge(id)?;
        self.progress.lock().remove(id);
        self.transcripts.lock().remove(id);
        self.supervisor.forget(id);
        Ok(())
    }

    /// Capacity admission check for spawn.
    pub(crate) fn check_capacity(&self) -> Result<(), OrchestratorError> {
        let current = self.registry.occupancy();
        let max = self.config.max_instances;
        if current >= max {
            return Err(OrchestratorError::CapacityExceeded { current, max });
        }
        Ok(())
    }

    /// Emit a health-check event and return (live, max).
    pub fn health_check(&self) -> (usize, usize) {
        let live = self.registry.occupancy();
        self.feed.emit(FeedEvent::HealthCheck {
            live_instances: live,
            at_ms: self.now_ms(),
        });
        (live, self.config.max_instances)
    }
}

#[cfg(test)]
#[path = "orchestrator_tests.rs"]
mod tests;
