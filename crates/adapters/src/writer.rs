// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Paste-safe text delivery.
//!
//! Assistant CLIs classify fast keystroke bursts as pasted content and hold
//! it as non-submittable input. To have a multiline payload treated as typed
//! input, every keystroke is followed by a pause above the CLI's paste
//! threshold (empirically 10-15ms), with a longer settle before the final
//! submit key.

use crate::pane::{PaneAdapter, PaneError, PaneKey};
use std::time::Duration;
use thiserror::Error;

/// Pause thresholds by total payload size.
const LARGE_PAYLOAD: usize = 3072;
const MEDIUM_PAYLOAD: usize = 1024;

const LARGE_PAUSE: Duration = Duration::from_millis(20);
const MEDIUM_PAUSE: Duration = Duration::from_millis(15);
const SMALL_PAUSE: Duration = Duration::from_millis(10);

/// Errors from paste-safe delivery
#[derive(Debug, Error)]
pub enum WriteError {
    /// The pane disappeared mid-stream; `offset` is the payload byte offset
    /// reached before the failure.
    #[error("send failed at byte {offset}: {reason}")]
    SendFailed { offset: usize, reason: String },
}

/// Accounting for one delivered payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteReport {
    pub bytes: usize,
    pub lines: usize,
    pub keystrokes: usize,
    pub pause: Duration,
    pub elapsed: Duration,
}

/// Per-keystroke pause for a payload of the given size.
///
/// Values must stay above the assistant's paste-detection threshold; larger
/// payloads get a wider margin because TUI re-render latency grows with
/// buffered input.
pub fn pause_for(total_bytes: usize) -> Duration {
    if let Some(pause) = crate::env::key_pause_override() {
        return pause;
    }
    if total_bytes >= LARGE_PAYLOAD {
        LARGE_PAUSE
    } else if total_bytes >= MEDIUM_PAYLOAD {
        MEDIUM_PAUSE
    } else {
        SMALL_PAUSE
    }
}

/// Deliver `payload` into a pane as typed input and submit it.
///
/// Lines are written as literal text, line breaks as no-submit newline keys,
/// with a pause after every keystroke. One submit key finalizes the whole
/// payload.
pub async fn deliver_text<P: PaneAdapter>(
    panes: &P,
    pane_id: &str,
    payload: &str,
) -> Result<WriteReport, WriteError> {
    let started = tokio::time::Instant::now();
    let bytes = payload.len();
    let pause = pause_for(bytes);

    let mut offset = 0usize;
    let mut keystrokes = 0usize;
    let mut lines = 0usize;

    let send_failed = |e: PaneError, offset: usize| WriteError::SendFailed {
        offset,
        reason: e.to_string(),
    };

    let mut first = true;
    for line in payload.split('\n') {
        if !first {
            // Inter-line boundary: newline key, never a submit
            panes
                .send_key(pane_id, PaneKey::NewlineNoSubmit)
                .await
                .map_err(|e| send_failed(e, offset))?;
            keystrokes += 1;
            offset += 1;
            tokio::time::sleep(pause).await;
        }
        first = false;

        if line.is_empty() {
            continue;
        }
        panes
            .send_text(pane_id, line, false)
            .await
            .map_err(|e| send_failed(e, offset))?;
        keystrokes += 1;
        lines += 1;
        offset += line.len();
        tokio::time::sleep(pause).await;
    }

    // Let the TUI catch up before submitting
    tokio::time::sleep(crate::env::settle_ms()).await;
    panes
        .send_key(pane_id, PaneKey::Submit)
        .await
        .map_err(|e| send_failed(e, offset))?;
    keystrokes += 1;

    let report = WriteReport {
        bytes,
        lines,
        keystrokes,
        pause,
        elapsed: started.elapsed(),
    };
    tracing::debug!(
        pane_id,
        bytes = report.bytes,
        lines = report.lines,
        keystrokes = report.keystrokes,
        pause_ms = report.pause.as_millis() as u64,
        elapsed_ms = report.elapsed.as_millis() as u64,
        "paste-safe delivery complete"
    );
    Ok(report)
}

#[cfg(test)]
#[path = "writer_tests.rs"]
mod tests;
