// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Monitor feed: pub/sub fan-out of orchestrator events to external
//! observers (dashboards, tooling).
//!
//! Events land in a bounded ring buffer so late subscribers can read recent
//! context, then fan out to per-subscriber bounded queues. A subscriber
//! that stops draining its queue is dropped rather than back-pressuring
//! the orchestrator.

use foreman_core::FeedEvent;
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet, VecDeque};
use tokio::sync::mpsc;

/// Ring buffer capacity for late-subscriber context.
pub const RING_CAPACITY: usize = 1000;

/// Per-subscriber queue capacity; overflow drops the subscriber.
pub const SUBSCRIBER_CAPACITY: usize = 100;

struct Subscriber {
    /// `None` is the wildcard subscription matching every event type.
    kinds: Option<HashSet<String>>,
    tx: mpsc::Sender<FeedEvent>,
}

#[derive(Default)]
struct FeedState {
    ring: VecDeque<FeedEvent>,
    subscribers: HashMap<u64, Subscriber>,
    next_id: u64,
}

/// Process-wide monitor feed.
#[derive(Default)]
pub struct MonitorFeed {
    state: Mutex<FeedState>,
}

impl MonitorFeed {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an event to the ring and fan it out to matching subscribers.
    /// Subscribers whose queues are full are dropped with a warning.
    pub fn emit(&self, event: FeedEvent) {
        let mut state = self.state.lock();

        state.ring.push_back(event.clone());
        if state.ring.len() > RING_CAPACITY {
            state.ring.pop_front();
        }

        let mut dropped: Vec<u64> = Vec::new();
        for (handle, sub) in &state.subscribers {
            let matches = match &sub.kinds {
                None => true,
                Some(kinds) => kinds.contains(event.type_name()),
            };
            if !matches {
                continue;
            }
            match sub.tx.try_send(event.clone()) {
                Ok(()) => {}
                Err(mpsc::error::TrySendError::Full(_)) => {
                    tracing::warn!(handle, "monitor subscriber queue full, dropping subscriber");
                    dropped.push(*handle);
                }
                Err(mpsc::error::TrySendError::Closed(_)) => {
                    dropped.push(*handle);
                }
            }
        }
        for handle in dropped {
            state.subscribers.remove(&handle);
        }
    }

    /// Subscribe to the given event types, or to everything when `kinds`
    /// is `None`. Returns the subscription handle and the event receiver.
    pub fn subscribe(
        &self,
        kinds: Option<Vec<String>>,
    ) -> (u64, mpsc::Receiver<FeedEvent>) {
        let (tx, rx) = mpsc::channel(SUBSCRIBER_CAPACITY);
        let mut state = self.state.lock();
        state.next_id += 1;
        let handle = state.next_id;
        state.subscribers.insert(
            handle,
            Subscriber {
                kinds: kinds.map(|k| k.into_iter().collect()),
                tx,
            },
        );
        (handle, rx)
    }

    /// Remove a subscriber.
    pub fn unsubscribe(&self, handle: u64) {
        self.state.lock().subscribers.remove(&handle);
    }

    /// Most recent `limit` buffered events (all of them when `limit` is 0).
    pub fn recent(&self, limit: usize) -> Vec<FeedEvent> {
        let state = self.state.lock();
        let skip = if limit > 0 {
            state.ring.len().saturating_sub(limit)
        } else {
            0
        };
        state.ring.iter().skip(skip).cloned().collect()
    }

    /// Number of live subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.state.lock().subscribers.len()
    }
}

#[cfg(test)]
#[path = "feed_tests.rs"]
mod tests;
