// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Fake pane adapter for testing

use super::{PaneAdapter, PaneError, PaneKey};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Recorded pane call
#[derive(Debug, Clone)]
pub enum PaneCall {
    Create {
        name: String,
        cwd: PathBuf,
        cmd: String,
        env: Vec<(String, String)>,
    },
    SendText {
        id: String,
        text: String,
        submit: bool,
    },
    SendKey {
        id: String,
        key: PaneKey,
    },
    CaptureScrollback {
        id: String,
        max_lines: u32,
    },
    IsAlive {
        id: String,
    },
    Kill {
        id: String,
    },
}

/// Fake pane state
#[derive(Debug, Clone)]
pub struct FakePane {
    pub name: String,
    pub cwd: PathBuf,
    pub cmd: String,
    pub env: Vec<(String, String)>,
    /// Scrollback lines served by `capture_scrollback`.
    pub output: Vec<String>,
    pub alive: bool,
    /// Literal text written so far, in order.
    pub written: Vec<String>,
    /// Named keys sent so far, in order.
    pub keys: Vec<PaneKey>,
}

struct FakePaneState {
    panes: HashMap<String, FakePane>,
    calls: Vec<PaneCall>,
    next_id: u64,
    /// Scrollback seeded into every newly created pane.
    default_output: Vec<String>,
    /// When set, `send_text` fails with `Gone` after this many successful writes.
    fail_writes_after: Option<usize>,
    writes_seen: usize,
}

/// Fake pane adapter for testing
#[derive(Clone)]
pub struct FakePaneAdapter {
    inner: Arc<Mutex<FakePaneState>>,
}

impl Default for FakePaneAdapter {
    fn default() -> Self {
        Self {
            inner: Arc::new(Mutex::new(FakePaneState {
                panes: HashMap::new(),
                calls: Vec::new(),
                next_id: 0,
                default_output: Vec::new(),
                fail_writes_after: None,
                writes_seen: 0,
            })),
        }
    }
}

impl FakePaneAdapter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get all recorded calls
    pub fn calls(&self) -> Vec<PaneCall> {
        self.inner.lock().calls.clone()
    }

    /// Get a pane by id
    pub fn get_pane(&self, id: &str) -> Option<FakePane> {
        self.inner.lock().panes.get(id).cloned()
    }

    /// Seed the scrollback of every pane created from now on
    pub fn set_default_output(&self, lines: Vec<String>) {
        self.inner.lock().default_output = lines;
    }

    /// Set the scrollback served for a pane
    pub fn set_output(&self, id: &str, output: Vec<String>) {
        if let Some(pane) = self.inner.lock().panes.get_mut(id) {
            pane.output = output;
        }
    }

    /// Append lines to the scrollback served for a pane
    pub fn push_output(&self, id: &str, lines: &[&str]) {
        if let Some(pane) = self.inner.lock().panes.get_mut(id) {
            pane.output.extend(lines.iter().map(|l| l.to_string()));
        }
    }

    /// Mark a pane as exited
    pub fn set_exited(&self, id: &str) {
        if let Some(pane) = self.inner.lock().panes.get_mut(id) {
            pane.alive = false;
        }
    }

    /// Make `send_text` fail with `Gone` after `n` more successful writes
    pub fn fail_writes_after(&self, n: usize) {
        let mut inner = self.inner.lock();
        inner.fail_writes_after = Some(n);
        inner.writes_seen = 0;
    }

    /// Add a pre-existing pane by id (for testing without create)
    pub fn add_pane(&self, id: &str, alive: bool) {
        self.inner.lock().panes.insert(
            id.to_string(),
            FakePane {
                name: id.to_string(),
                cwd: PathBuf::new(),
                cmd: String::new(),
                env: Vec::new(),
                output: Vec::new(),
                alive,
                written: Vec::new(),
                keys: Vec::new(),
            },
        );
    }
}

#[async_trait]
impl PaneAdapter for FakePaneAdapter {
    async fn create(
        &self,
        name: &str,
        cwd: &Path,
        cmd: &str,
        env: &[(String, String)],
    ) -> Result<String, PaneError> {
        let mut inner = self.inner.lock();

        inner.next_id += 1;
        let id = format!("fake-{}", inner.next_id);

        inner.calls.push(PaneCall::Create {
            name: name.to_string(),
            cwd: cwd.to_path_buf(),
            cmd: cmd.to_string(),
            env: env.to_vec(),
        });

        let pane = FakePane {
            name: name.to_string(),
            cwd: cwd.to_path_buf(),
            cmd: cmd.to_string(),
            env: env.to_vec(),
            output: inner.default_output.clone(),
            alive: true,
            written: Vec::new(),
            keys: Vec::new(),
        };

        inner.panes.insert(id.clone(), pane);

        Ok(id)
    }

    async fn send_text(&self, id: &str, text: &str, submit: bool) -> Result<(), PaneError> {
        let mut inner = self.inner.lock();

        inner.calls.push(PaneCall::SendText {
            id: id.to_string(),
            text: text.to_string(),
            submit,
        });

        if let Some(limit) = inner.fail_writes_after {
            if inner.writes_seen >= limit {
                return Err(PaneError::Gone(id.to_string()));
            }
            inner.writes_seen += 1;
        }

        match inner.panes.get_mut(id) {
            Some(pane) if pane.alive => {
                pane.written.push(text.to_string());
                if submit {
                    pane.keys.push(PaneKey::Submit);
                }
                Ok(())
            }
            _ => Err(PaneError::Gone(id.to_string())),
        }
    }

    async fn send_key(&self, id: &str, key: PaneKey) -> Result<(), PaneError> {
        let mut inner = self.inner.lock();

        inner.calls.push(PaneCall::SendKey {
            id: id.to_string(),
            key,
        });

        match inner.panes.get_mut(id) {
            Some(pane) if pane.alive => {
                pane.keys.push(key);
                Ok(())
            }
            _ => Err(PaneError::Gone(id.to_string())),
        }
    }

    async fn capture_scrollback(&self, id: &str, max_lines: u32) -> Result<String, PaneError> {
        let mut inner = self.inner.lock();

        inner.calls.push(PaneCall::CaptureScrollback {
            id: id.to_string(),
            max_lines,
        });

        match inner.panes.get(id) {
            Some(pane) if pane.alive => {
                let start = pane.output.len().saturating_sub(max_lines as usize);
                Ok(pane.output[start..].join("\n"))
            }
            _ => Err(PaneError::Gone(id.to_string())),
        }
    }

    async fn is_alive(&self, id: &str) -> Result<bool, PaneError> {
        let mut inner = self.inner.lock();

        inner.calls.push(PaneCall::IsAlive { id: id.to_string() });

        match inner.panes.get(id) {
            Some(pane) => Ok(pane.alive),
            None => Ok(false),
        }
    }

    async fn kill(&self, id: &str) -> Result<(), PaneError> {
        let mut inner = self.inner.lock();

        inner.calls.push(PaneCall::Kill { id: id.to_string() });

        if let Some(pane) = inner.panes.get_mut(id) {
            pane.alive = false;
        }

        Ok(())
    }
}

#[cfg(test)]
#[path = "fake_tests.rs"]
mod tests;
