// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! In-memory instance registry.
//!
//! Authoritative record of every live and recently-terminated instance,
//! with name and parent/child indices. Terminated records stay queryable
//! until explicitly purged - the coordinator relies on this when gathering
//! team artifacts from descendants that already finished.

use foreman_core::{InstanceId, InstanceRecord, LifecycleState, OrchestratorError};
use parking_lot::RwLock;
use std::collections::{BTreeSet, HashMap};

#[derive(Default)]
struct RegistryState {
    instances: HashMap<InstanceId, InstanceRecord>,
    by_name: HashMap<String, InstanceId>,
    children: HashMap<InstanceId, BTreeSet<InstanceId>>,
}

/// Registry of instance records. All methods take `&self`; interior
/// locking uses a reader-writer lock, never held across await points.
#[derive(Default)]
pub struct InstanceRegistry {
    state: RwLock<RegistryState>,
}

impl InstanceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a new record. The id must be unused.
    pub fn insert(&self, record: InstanceRecord) -> Result<(), OrchestratorError> {
        let mut state = self.state.write();
        if state.instances.contains_key(&record.id) {
            return Err(OrchestratorError::Internal(format!(
                "duplicate instance id {}",
                record.id
            )));
        }
        state.by_name.insert(record.name.clone(), record.id.clone());
        if let Some(parent) = &record.parent_id {
            state
                .children
                .entry(parent.clone())
                .or_default()
                .insert(record.id.clone());
        }
        state.instances.insert(record.id.clone(), record);
        Ok(())
    }

    /// Look up a record. Terminated and errored records are only returned
    /// when `include_terminated` is set.
    pub fn get(&self, id: &InstanceId, include_terminated: bool) -> Option<InstanceRecord> {
        let state = self.state.read();
        state
            .instances
            .get(id)
            .filter(|r| include_terminated || !r.state.is_terminal())
            .cloned()
    }

    /// Look up a record or fail with `NotFound`.
    pub fn get_required(
        &self,
        id: &InstanceId,
        include_terminated: bool,
    ) -> Result<InstanceRecord, OrchestratorError> {
        self.get(id, include_terminated)
            .ok_or_else(|| OrchestratorError::NotFound(format!("instance {}", id)))
    }

    /// Resolve an instance by name.
    pub fn resolve_name(&self, name: &str) -> Option<InstanceId> {
        self.state.read().by_name.get(name).cloned()
    }

    /// Apply a mutation to a record.
    pub fn update<F>(&self, id: &InstanceId, f: F) -> Result<InstanceRecord, OrchestratorError>
    where
        F: FnOnce(&mut InstanceRecord),
    {
        let mut state = self.state.write();
        let record = state
            .instances
            .get_mut(id)
            .ok_or_else(|| OrchestratorError::NotFound(format!("instance {}", id)))?;
        f(record);
        Ok(record.clone())
    }

    /// Transition a record's lifecycle state, validating the edge.
    /// Returns the (from, to) pair for event emission.
    pub fn set_state(
        &self,
        id: &InstanceId,
        to: LifecycleState,
    ) -> Result<(LifecycleState, LifecycleState), OrchestratorError> {
        let mut state = self.state.write();
        let record = state
            .instances
            .get_mut(id)
            .ok_or_else(|| OrchestratorError::NotFound(format!("instance {}", id)))?;
        let from = record.state;
        if !from.can_transition_to(to) {
            return Err(OrchestratorError::Internal(format!(
                "illegal state transition {} -> {} for instance {}",
                from, to, id
            )));
        }
        record.state = to;
        Ok((from, to))
    }

    /// Direct children of an instance.
    pub fn children_of(&self, id: &InstanceId, include_terminated: bool) -> Vec<InstanceRecord> {
        let state = self.state.read();
        state
            .children
            .get(id)
            .map(|ids| {
                ids.iter()
                    .filter_map(|child| state.instances.get(child))
                    .filter(|r| include_terminated || !r.state.is_terminal())
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }

    /// All descendants of an instance, breadth-first, terminated included.
    pub fn descendants_of(&self, id: &InstanceId) -> Vec<InstanceRecord> {
        let state = self.state.read();
        let mut out = Vec::new();
        let mut frontier: Vec<InstanceId> = vec![id.clone()];
        while let Some(current) = frontier.pop() {
            if let Some(children) = state.children.get(&current) {
                for child in children {
                    if let Some(record) = state.instances.get(child) {
                        frontier.push(record.id.clone());
                        out.push(record.clone());
                    }
                }
            }
        }
        out
    }

    /// List all records.
    pub fn list(&self, include_terminated: bool) -> Vec<InstanceRecord> {
        let state = self.state.read();
        let mut records: Vec<InstanceRecord> = state
            .instances
            .values()
            .filter(|r| include_terminated || !r.state.is_terminal())
            .cloned()
            .collect();
        records.sort_by(|a, b| a.stats.created_at_ms.cmp(&b.stats.created_at_ms));
        records
    }

    /// Number of instances currently holding a pane (live or still starting).
    pub fn occupancy(&self) -> usize {
        let state = self.state.read();
        state
            .instances
            .values()
            .filter(|r| !r.state.is_terminal())
            .count()
    }

    /// Remove a record and its index entries. Live instances cannot be
    /// purged; terminate them first.
    pub fn purge(&self, id: &InstanceId) -> Result<(), OrchestratorError> {
        let mut state = self.state.write();
        let record = state
            .instances
            .get(id)
            .ok_or_else(|| OrchestratorError::NotFound(format!("instance {}", id)))?;
        if !record.state.is_terminal() {
            return Err(OrchestratorError::invalid_argument(
                format!("instance {} is still {}", id, record.state),
                "only terminated or errored instances can be purged",
            ));
        }
        let parent = record.parent_id.clone();
        let name = record.name.clone();
        state.instances.remove(id);
        // Keep the name index pointing at the purged id only if it still does
        if state.by_name.get(&name).is_some_and(|mapped| mapped == id) {
            state.by_name.remove(&name);
        }
        if let Some(parent) = parent {
            if let Some(set) = state.children.get_mut(&parent) {
                set.remove(id);
            }
        }
        state.children.remove(id);
        Ok(())
    }
}

#[cfg(test)]
#[path = "registry_tests.rs"]
mod tests;
