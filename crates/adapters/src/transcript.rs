// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Transcript parsing: structured events from captured pane output.
//!
//! Captures overlap between polls, so the parser keeps a bounded set of
//! line fingerprints and drops exact repeats.

use foreman_core::TranscriptEvent;
use regex::Regex;
use std::collections::{HashSet, VecDeque};

/// How many line fingerprints to remember for duplicate suppression.
const FINGERPRINT_CAPACITY: usize = 2000;

/// Result of parsing one capture.
#[derive(Debug, Default)]
pub struct ParsedCapture {
    /// Structured events, in capture order, stamped with orchestrator time.
    pub events: Vec<TranscriptEvent>,
    /// Non-JSON lines retained because they matched a supervisor pattern.
    pub retained_lines: Vec<String>,
}

/// Streaming transcript parser with duplicate suppression.
pub struct TranscriptParser {
    retain: Vec<Regex>,
    seen: HashSet<u64>,
    order: VecDeque<u64>,
}

impl TranscriptParser {
    /// Create a parser that retains non-JSON lines matching any of the
    /// given patterns (the supervisor's signal patterns).
    pub fn new(retain: Vec<Regex>) -> Self {
        Self {
            retain,
            seen: HashSet::with_capacity(FINGERPRINT_CAPACITY),
            order: VecDeque::with_capacity(FINGERPRINT_CAPACITY),
        }
    }

    /// Parse a scrollback capture. Lines already seen in earlier captures
    /// are skipped; every emitted event is stamped with `now_ms`.
    pub fn parse(&mut self, capture: &str, now_ms: u64) -> ParsedCapture {
        let mut parsed = ParsedCapture::default();

        for raw in capture.lines() {
            let line = raw.trim();
            if line.is_empty() {
                continue;
            }
            if !self.mark_seen(line) {
                continue;
            }

            match classify_line(line, now_ms) {
                Some(event) => parsed.events.push(event),
                None => {
                    if self.retain.iter().any(|p| p.is_match(line)) {
                        parsed.retained_lines.push(line.to_string());
                    }
                }
            }
        }

        parsed
    }

    /// Record a line fingerprint. Returns false for exact repeats.
    fn mark_seen(&mut self, line: &str) -> bool {
        let fp = fingerprint(line);
        if !self.seen.insert(fp) {
            return false;
        }
        self.order.push_back(fp);
        if self.order.len() > FINGERPRINT_CAPACITY {
            if let Some(old) = self.order.pop_front() {
                self.seen.remove(&old);
            }
        }
        true
    }
}

/// FNV-1a 64-bit hash of a line.
fn fingerprint(line: &str) -> u64 {
    let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
    for byte in line.as_bytes() {
        hash ^= u64::from(*byte);
        hash = hash.wrapping_mul(0x0000_0100_0000_01b3);
    }
    hash
}

/// Classify one line as a structured transcript event, if it is one.
///
/// A line that parses as a JSON object with a known `type` yields the
/// corresponding event; unknown types and non-JSON lines yield `None`.
/// Embedded timestamps are not trusted - events carry `now_ms`.
fn classify_line(line: &str, now_ms: u64) -> Option<TranscriptEvent> {
    if !line.starts_with('{') {
        return None;
    }
    let json: serde_json::Value = serde_json::from_str(line).ok()?;
    let get_str = |key: &str| json.get(key).and_then(|v| v.as_str());

    match get_str("type")? {
        "tool_use" => Some(TranscriptEvent::ToolCall {
            name: get_str("name")?.to_string(),
            input: json.get("input").cloned().unwrap_or(serde_json::Value::Null),
            call_id: get_str("id").unwrap_or_default().to_string(),
            at_ms: now_ms,
        }),
        "tool_result" => Some(TranscriptEvent::ToolResult {
            call_id: get_str("tool_use_id").unwrap_or_default().to_string(),
            content: extract_content_text(&json),
            is_error: json
                .get("is_error")
                .and_then(|v| v.as_bool())
                .unwrap_or(false),
            at_ms: now_ms,
        }),
        "text" => Some(TranscriptEvent::AssistantText {
            text: get_str("text").unwrap_or_default().to_string(),
            at_ms: now_ms,
        }),
        "user" => Some(TranscriptEvent::UserText {
            text: extract_content_text(&json),
            at_ms: now_ms,
        }),
        _ => None,
    }
}

/// Pull text out of a `content` field that may be a string or a block array.
fn extract_content_text(json: &serde_json::Value) -> String {
    match json.get("content") {
        Some(serde_json::Value::String(s)) => s.clone(),
        Some(serde_json::Value::Array(blocks)) => blocks
            .iter()
            .filter_map(|b| b.get("text").and_then(|t| t.as_str()))
            .collect::<Vec<_>>()
            .join("\n"),
        _ => String::new(),
    }
}

#[cfg(test)]
#[path = "transcript_tests.rs"]
mod tests;
