//! Alert-level resolution, dedup guard and dispatch.
//!
//! Checkers produce [`AlertCandidate`]s; the [`dispatch::AlertDispatcher`]
//! resolves each candidate to a configured severity level, gates it through
//! the resend/mute guard, renders the alarmer's message template and invokes
//! the alarm transport, recording every dispatch in the event store.

pub mod dispatch;
pub mod routing;
pub mod template;


use serde::Deserialize;
use serde_json::{Map, Value};

/// A configured severity entry. `alert_name` is a single keyword token or a
/// comma-joined composite describing a simultaneously-true condition set.
#[derive(Debug, Clone, Deserialize)]
pub struct AlertLevel {
    #[serde(rename = "name")]
    pub alert_name: String,
    pub level: String,
}

impl AlertLevel {
    /// The comma-split token set of this entry.
    pub fn tokens(&self) -> Vec<&str> {
        self.alert_name
            .split(',')
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .collect()
    }
}

/// Message rendering mode for an alarmer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageFormat {
    #[default]
    Plain,
    Html,
    Custom,
}

/// A named outbound channel: the severities it fires for, its parameter
/// template, message format and resend throttle.
#[derive(Debug, Clone, Deserialize)]
pub struct Alarmer {
    pub name: String,
    pub target_levels: Vec<String>,
    #[serde(default)]
    pub params: Map<String, Value>,
    #[serde(default)]
    pub format: MessageFormat,
    pub resend_secs: i64,
}

impl Alarmer {
    pub fn resend_duration(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.resend_secs)
    }
}

/// One violated condition, as produced by a checker. `tokens` carries the
/// rule keyword plus any extra condition tokens (e.g. the stale event type
/// for heartbeat), so composite alert-level entries can match.
#[derive(Debug, Clone)]
pub struct AlertCandidate {
    pub agent_name: String,
    pub tokens: Vec<String>,
    pub message: String,
}

impl AlertCandidate {
    pub fn new(agent_name: &str, tokens: Vec<String>, message: String) -> Self {
        Self {
            agent_name: agent_name.to_string(),
            tokens,
            message,
        }
    }
}
