// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! foreman-adapters: terminal panes, paste-safe delivery, transcript parsing,
//! and assistant CLI launch plumbing.

pub mod env;
pub mod launch;
pub mod pane;
pub mod transcript;
pub mod writer;

pub use launch::{LaunchPlan, ToolEndpoint, ToolTransport};
pub use pane::{PaneAdapter, PaneError, PaneKey, TmuxPaneAdapter};
pub use transcript::{ParsedCapture, TranscriptParser};
pub use writer::{deliver_text, WriteError, WriteReport};

#[cfg(any(test, feature = "test-support"))]
pub use pane::{FakePane, FakePaneAdapter, PaneCall};
