//! Shared data model for the chainmon validator fleet monitor.
//!
//! Every telemetry sample written by a monitor hangs off an [`types::Event`]
//! row; checkers read those rows back through the storage layer and raise
//! alert candidates keyed by [`AlertKind`].

pub mod types;

/// Service name stamped on every event produced by the tendermint monitors.
pub const TENDERMINT_SERVICE: &str = "tendermint";

/// Telemetry event types written by the monitors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventType {
    Status,
    NetInfo,
    Commit,
}

impl EventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventType::Status => "tm:event:status",
            EventType::NetInfo => "tm:event:net_info",
            EventType::Commit => "tm:event:commit",
        }
    }
}

impl std::fmt::Display for EventType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The statically-enumerable set of health rules the checker scheduler runs.
///
/// Config-driven selection maps names onto these variants instead of a
/// global registry, so the full set is visible to tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AlertKind {
    Heartbeat,
    HeightStuck,
    LowPeer,
    MissingBlock,
}

impl AlertKind {
    /// The keyword token this rule supplies to alert-level resolution.
    pub fn keyword(&self) -> &'static str {
        match self {
            AlertKind::Heartbeat => "tendermint:heartbeat",
            AlertKind::HeightStuck => "tendermint:height_stuck",
            AlertKind::LowPeer => "tendermint:low_peer",
            AlertKind::MissingBlock => "tendermint:missing_block",
        }
    }
}

impl std::fmt::Display for AlertKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.keyword())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn alert_kind_keywords_are_namespaced() {
        for kind in [
            AlertKind::Heartbeat,
            AlertKind::HeightStuck,
            AlertKind::LowPeer,
            AlertKind::MissingBlock,
        ] {
            assert!(kind.keyword().starts_with("tendermint:"));
        }
    }

    #[test]
    fn event_type_round_trips_through_display() {
        assert_eq!(EventType::NetInfo.to_string(), "tm:event:net_info");
    }
}
