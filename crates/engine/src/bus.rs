// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Message bus: per-instance inbound queues, the outstanding-request table,
//! and reply correlation.
//!
//! Each instance's queue is a bounded channel drained by that instance's
//! owning task, which is the only code allowed to write into the pane. The
//! bus itself never touches panes; it hands delivery jobs to the owner and
//! correlates replies by message id, not arrival order.

use foreman_core::{
    Clock, InstanceId, MessageEnvelope, MessageId, MessageStatus, OrchestratorError,
};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};

/// Inbound queue capacity per instance. The 101st pending delivery is
/// refused with `QueueFull` rather than blocking the sender.
pub const INBOUND_CAPACITY: usize = 100;

/// One unit of work for an instance's owning task: write `text` into the
/// pane and acknowledge the outcome.
pub struct DeliveryJob {
    pub message_id: MessageId,
    pub text: String,
    pub ack: oneshot::Sender<Result<(), OrchestratorError>>,
}

/// How an outstanding request resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplyOutcome {
    Replied(String),
    TimedOut,
    Failed(String),
}

#[derive(Default)]
struct BusState {
    envelopes: HashMap<MessageId, MessageEnvelope>,
    outstanding: HashMap<MessageId, oneshot::Sender<ReplyOutcome>>,
    waiters: HashMap<MessageId, oneshot::Receiver<ReplyOutcome>>,
    inbound: HashMap<InstanceId, mpsc::Sender<DeliveryJob>>,
}

/// Process-wide message bus.
#[derive(Default)]
pub struct MessageBus {
    state: Mutex<BusState>,
}

impl MessageBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an instance's inbound queue; the returned receiver belongs
    /// to the instance's owning task.
    pub fn register_instance(&self, id: &InstanceId) -> mpsc::Receiver<DeliveryJob> {
        let (tx, rx) = mpsc::channel(INBOUND_CAPACITY);
        self.state.lock().inbound.insert(id.clone(), tx);
        rx
    }

    /// Drop an instance's inbound queue. Its owning task ends once the
    /// queue drains.
    pub fn unregister_instance(&self, id: &InstanceId) {
        self.state.lock().inbound.remove(id);
    }

    /// Deliver an envelope: record it, open its reply slot, and enqueue the
    /// pane write. Returns the delivery acknowledgement channel.
    ///
    /// Fails fast with `QueueFull` when the target's queue is at capacity
    /// and `NotFound` when the target has no queue.
    pub fn deliver(
        &self,
        envelope: MessageEnvelope,
        text: String,
    ) -> Result<oneshot::Receiver<Result<(), OrchestratorError>>, OrchestratorError> {
        let (ack_tx, ack_rx) = oneshot::channel();
        let (reply_tx, reply_rx) = oneshot::channel();
        let message_id = envelope.id.clone();
        let target = envelope.target.clone();

        let mut state = self.state.lock();
        let queue = state
            .inbound
            .get(&target)
            .ok_or_else(|| OrchestratorError::NotFound(format!("instance {}", target)))?
            .clone();

        match queue.try_send(DeliveryJob {
            message_id: message_id.clone(),
            text,
            ack: ack_tx,
        }) {
            Ok(()) => {}
            Err(mpsc::error::TrySendError::Full(_)) => {
                return Err(OrchestratorError::QueueFull(target.to_string()));
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                return Err(OrchestratorError::NotFound(format!("instance {}", target)));
            }
        }

        state.envelopes.insert(message_id.clone(), envelope);
        state.outstanding.insert(message_id.clone(), reply_tx);
        state.waiters.insert(message_id, reply_rx);
        Ok(ack_rx)
    }

    /// Snapshot of an envelope record.
    pub fn envelope(&self, id: &MessageId) -> Option<MessageEnvelope> {
        self.state.lock().envelopes.get(id).cloned()
    }

    /// Mark an envelope delivered (pane write completed). Never downgrades
    /// an envelope that already resolved.
    pub fn mark_delivered(&self, id: &MessageId, now_ms: u64) {
        let mut state = self.state.lock();
        if let Some(env) = state.envelopes.get_mut(id) {
            if env.status == MessageStatus::Pending {
                env.status = MessageStatus::Delivered;
            }
            env.delivered_at_ms = Some(now_ms);
        }
    }

    /// Mark an envelope failed (pane write aborted) and release its waiter.
    pub fn mark_failed(&self, id: &MessageId, reason: &str) {
        let mut state = self.state.lock();
        if let Some(env) = state.envelopes.get_mut(id) {
            env.status = MessageStatus::Failed;
        }
        if let Some(tx) = state.outstanding.remove(id) {
            let _ = tx.send(ReplyOutcome::Failed(reason.to_string()));
        }
    }

    /// Drop the reply slot of a message no caller will await (fire-and-
    /// forget sends). A later reply still resolves the envelope record.
    pub fn discard_waiter(&self, id: &MessageId) {
        self.state.lock().waiters.remove(id);
    }

    /// Block on the reply slot for a message.
    ///
    /// Returns `Timeout` when the deadline passes with no resolution; the
    /// caller decides whether to fall back to a scrollback poll.
    pub async fn await_reply(
        &self,
        id: &MessageId,
        timeout: Duration,
    ) -> Result<ReplyOutcome, OrchestratorError> {
        let waiter = self
            .state
            .lock()
            .waiters
            .remove(id)
            .ok_or_else(|| OrchestratorError::NotFound(format!("message {}", id)))?;

        match tokio::time::timeout(timeout, waiter).await {
            Ok(Ok(outcome)) => Ok(outcome),
            // Sender dropped without resolution - treat as cancelled
            Ok(Err(_)) => Ok(ReplyOutcome::Failed("request cancelled".to_string())),
            Err(_) => Err(OrchestratorError::Timeout(timeout.as_millis() as u64)),
        }
    }

    /// Attach a reply to an outstanding envelope and release its waiter.
    /// Returns the updated envelope for journaling and stats.
    pub fn reply<C: Clock>(
        &self,
        id: &MessageId,
        payload: &str,
        clock: &C,
    ) -> Result<MessageEnvelope, OrchestratorError> {
        let mut state = self.state.lock();
        let env = state
            .envelopes
            .get_mut(id)
            .ok_or_else(|| OrchestratorError::NotFound(format!("message {}", id)))?;
        if !env.status.is_open() {
            return Err(OrchestratorError::invalid_argument(
                format!("message {} already resolved ({:?})", id, env.status),
                "only pending or delivered messages accept a reply",
            ));
        }
        env.status = MessageStatus::Replied;
        env.reply = Some(payload.to_string());
        env.replied_at_ms = Some(clock.epoch_ms());
        let snapshot = env.clone();

        // The waiter entry stays: the outcome is buffered in the channel,
        // so an await_reply racing this reply still observes it.
        if let Some(tx) = state.outstanding.remove(id) {
            let _ = tx.send(ReplyOutcome::Replied(payload.to_string()));
        }
        Ok(snapshot)
    }

    /// Cancel an outstanding request. The envelope is marked timed-out (or
    /// failed, when a reason is given) but the delivered keystrokes are not
    /// retracted.
    pub fn cancel(&self, id: &MessageId, reason: Option<&str>) {
        let mut state = self.state.lock();
        if let Some(env) = state.envelopes.get_mut(id) {
            if env.status.is_open() {
                env.status = match reason {
                    Some(_) => MessageStatus::Failed,
                    None => MessageStatus::TimedOut,
                };
            }
        }
        if let Some(tx) = state.outstanding.remove(id) {
            let _ = tx.send(match reason {
                Some(r) => ReplyOutcome::Failed(r.to_string()),
                None => ReplyOutcome::TimedOut,
            });
        }
    }

    /// Open envelopes targeted at an instance, oldest first. Lets an
    /// assistant poll for request ids it has not answered yet.
    pub fn open_for_target(&self, target: &InstanceId) -> Vec<MessageEnvelope> {
        let state = self.state.lock();
        let mut open: Vec<MessageEnvelope> = state
            .envelopes
            .values()
            .filter(|e| &e.target == target && e.status.is_open())
            .cloned()
            .collect();
        open.sort_by_key(|e| e.created_at_ms);
        open
    }

    /// Instance-to-instance edges of the wait-for graph: one `(source,
    /// target, message)` triple per open envelope between instances.
    ///
    /// The graph is derived on demand and never stored; the supervisor
    /// rebuilds it each cycle for deadlock detection.
    pub fn wait_edges(&self) -> Vec<(InstanceId, InstanceId, MessageId)> {
        let state = self.state.lock();
        state
            .envelopes
            .values()
            .filter(|e| e.status.is_open())
            .filter_map(|e| {
                e.source
                    .instance_id()
                    .map(|src| (src.clone(), e.target.clone(), e.id.clone()))
            })
            .collect()
    }
}

#[cfg(test)]
#[path = "bus_tests.rs"]
mod tests;
