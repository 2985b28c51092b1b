use serde::Deserialize;
use std::collections::HashMap;

pub const DEFAULT_MAX_STUCK_SECS: u64 = 300;
pub const DEFAULT_HEARTBEAT_WAIT_SECS: u64 = 180;
pub const DEFAULT_MIN_PEER_COUNT: u64 = 5;
pub const DEFAULT_MAX_MISSING_COUNT: u64 = 10;
pub const DEFAULT_TARGET_BLOCK_COUNT: u32 = 50;

/// Effective thresholds one agent is checked against.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CheckerThresholds {
    /// Height-stuck: how long the reported height may stay frozen.
    pub max_stuck_secs: u64,
    /// Heartbeat: maximum event age per event type. The `"default"` key
    /// covers types without their own entry.
    pub heartbeat_max_wait_secs: HashMap<String, u64>,
    /// Low-peer: the peer-count floor.
    pub min_peer_count: u64,
    /// Missing-block signing check; absent means the agent is not a
    /// validator and the check is skipped.
    pub missing_block: Option<MissingBlockConfig>,
}

impl Default for CheckerThresholds {
    fn default() -> Self {
        Self {
            max_stuck_secs: DEFAULT_MAX_STUCK_SECS,
            heartbeat_max_wait_secs: HashMap::new(),
            min_peer_count: DEFAULT_MIN_PEER_COUNT,
            missing_block: None,
        }
    }
}

impl CheckerThresholds {
    /// The heartbeat wait for `event_type`: its own entry, else the
    /// `"default"` entry, else the built-in default.
    pub fn heartbeat_wait_secs(&self, event_type: &str) -> u64 {
        self.heartbeat_max_wait_secs
            .get(event_type)
            .or_else(|| self.heartbeat_max_wait_secs.get("default"))
            .copied()
            .unwrap_or(DEFAULT_HEARTBEAT_WAIT_SECS)
    }

    /// Applies a partial per-agent override on top of this base, field by
    /// field. A field the override leaves unset keeps the base value.
    pub fn merged_with(&self, overrides: &CheckerOverrides) -> CheckerThresholds {
        CheckerThresholds {
            max_stuck_secs: overrides.max_stuck_secs.unwrap_or(self.max_stuck_secs),
            heartbeat_max_wait_secs: overrides
                .heartbeat_max_wait_secs
                .clone()
                .unwrap_or_else(|| self.heartbeat_max_wait_secs.clone()),
            min_peer_count: overrides.min_peer_count.unwrap_or(self.min_peer_count),
            missing_block: overrides
                .missing_block
                .clone()
                .or_else(|| self.missing_block.clone()),
        }
    }
}

/// Partial per-agent threshold override.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CheckerOverrides {
    pub max_stuck_secs: Option<u64>,
    pub heartbeat_max_wait_secs: Option<HashMap<String, u64>>,
    pub min_peer_count: Option<u64>,
    pub missing_block: Option<MissingBlockConfig>,
}

/// Missing-block parameters for a validator agent.
#[derive(Debug, Clone, Deserialize)]
pub struct MissingBlockConfig {
    /// Hex address whose signature presence is counted.
    pub validator_address: String,
    #[serde(default = "default_max_missing_count")]
    pub max_missing_count: u64,
    #[serde(default = "default_target_block_count")]
    pub target_block_count: u32,
}

fn default_max_missing_count() -> u64 {
    DEFAULT_MAX_MISSING_COUNT
}

fn default_target_block_count() -> u32 {
    DEFAULT_TARGET_BLOCK_COUNT
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn heartbeat_wait_prefers_specific_then_default_key() {
        let mut thresholds = CheckerThresholds::default();
        thresholds
            .heartbeat_max_wait_secs
            .insert("default".into(), 60);
        thresholds
            .heartbeat_max_wait_secs
            .insert("tm:event:commit".into(), 600);

        assert_eq!(thresholds.heartbeat_wait_secs("tm:event:commit"), 600);
        assert_eq!(thresholds.heartbeat_wait_secs("tm:event:status"), 60);
    }

    #[test]
    fn heartbeat_wait_falls_back_to_builtin() {
        let thresholds = CheckerThresholds::default();
        assert_eq!(
            thresholds.heartbeat_wait_secs("tm:event:status"),
            DEFAULT_HEARTBEAT_WAIT_SECS
        );
    }

    #[test]
    fn merge_keeps_base_values_for_unset_fields() {
        let base = CheckerThresholds {
            max_stuck_secs: 120,
            min_peer_count: 8,
            ..CheckerThresholds::default()
        };
        let overrides = CheckerOverrides {
            min_peer_count: Some(3),
            ..CheckerOverrides::default()
        };
        let merged = base.merged_with(&overrides);
        assert_eq!(merged.max_stuck_secs, 120);
        assert_eq!(merged.min_peer_count, 3);
        assert!(merged.missing_block.is_none());
    }

    #[test]
    fn merge_takes_override_missing_block_config() {
        let base = CheckerThresholds::default();
        let overrides = CheckerOverrides {
            missing_block: Some(MissingBlockConfig {
                validator_address: "VALIDATOR_A".into(),
                max_missing_count: DEFAULT_MAX_MISSING_COUNT,
                target_block_count: DEFAULT_TARGET_BLOCK_COUNT,
            }),
            ..CheckerOverrides::default()
        };
        let merged = base.merged_with(&overrides);
        assert_eq!(
            merged.missing_block.unwrap().validator_address,
            "VALIDATOR_A"
        );
    }

    #[test]
    fn missing_block_toml_defaults_apply() {
        let cfg: MissingBlockConfig =
            toml::from_str("validator_address = \"VALIDATOR_A\"").unwrap();
        assert_eq!(cfg.max_missing_count, DEFAULT_MAX_MISSING_COUNT);
        assert_eq!(cfg.target_block_count, DEFAULT_TARGET_BLOCK_COUNT);
    }
}
