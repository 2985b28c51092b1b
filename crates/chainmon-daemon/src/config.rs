use anyhow::{bail, Context};
use chainmon_alert::{Alarmer, AlertLevel};
use chainmon_checker::config::{
    CheckerOverrides, CheckerThresholds, MissingBlockConfig, DEFAULT_MAX_MISSING_COUNT,
    DEFAULT_TARGET_BLOCK_COUNT,
};
use chainmon_checker::CheckerKind;
use serde::Deserialize;
use std::path::{Path, PathBuf};

const DEFAULT_CHECK_INTERVAL_SECS: u64 = 10;
const DEFAULT_RPC_TIMEOUT_SECS: u64 = 5;
const DEFAULT_RPC_RETRIES: u32 = 3;
const DEFAULT_PUSH_INTERVAL_SECS: u64 = 5;
const DEFAULT_BACKFILL_CONCURRENCY: usize = 100;

/// Top-level daemon configuration, loaded from a TOML file with a small
/// set of `CHAINMON_*` environment overrides applied on top.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Deployment-generation tag stamped on every stored row. Queries only
    /// see rows written under the same tag.
    #[serde(default)]
    pub run_id: String,
    #[serde(default = "default_check_interval")]
    pub check_interval_secs: u64,
    #[serde(default = "default_rpc_timeout")]
    pub rpc_timeout_secs: u64,
    #[serde(default = "default_rpc_retries")]
    pub rpc_retries: u32,
    pub database: DatabaseConfig,
    #[serde(default = "MonitorKind::all")]
    pub monitors: Vec<MonitorKind>,
    #[serde(default = "all_checkers")]
    pub checkers: Vec<CheckerKind>,
    /// Fleet-wide thresholds; agents may override fields individually.
    #[serde(default)]
    pub default_checker: CheckerThresholds,
    /// Fleet-wide alert-level entries.
    #[serde(default)]
    pub alerts: Vec<AlertLevel>,
    /// Fleet-wide alarmers.
    #[serde(default)]
    pub alarmers: Vec<AlarmerConfig>,
    pub agents: Vec<AgentConfig>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DatabaseConfig {
    pub path: PathBuf,
}

/// The monitor set, as named in configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MonitorKind {
    Status,
    NetInfo,
    Backfill,
}

impl MonitorKind {
    fn all() -> Vec<MonitorKind> {
        vec![MonitorKind::Status, MonitorKind::NetInfo, MonitorKind::Backfill]
    }
}

impl std::str::FromStr for MonitorKind {
    type Err = String;

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        match name {
            "status" => Ok(MonitorKind::Status),
            "net_info" => Ok(MonitorKind::NetInfo),
            "backfill" => Ok(MonitorKind::Backfill),
            other => Err(format!("unknown monitor '{other}'")),
        }
    }
}

/// One monitored node.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AgentConfig {
    pub name: String,
    pub rpc_url: String,
    #[serde(default = "default_push_interval")]
    pub push_interval_secs: u64,
    #[serde(default = "default_backfill_concurrency")]
    pub backfill_max_concurrency: usize,
    /// Partial threshold override merged over `default_checker`.
    #[serde(default)]
    pub checker: CheckerOverrides,
    /// Agent-specific alert-level entries; empty means the fleet-wide set.
    #[serde(default)]
    pub alerts: Vec<AlertLevel>,
    /// Agent-specific alarmers; empty means the fleet-wide set.
    #[serde(default)]
    pub alarmers: Vec<AlarmerConfig>,
}

/// An alarmer definition plus the webhook endpoint it delivers to.
#[derive(Debug, Deserialize)]
pub struct AlarmerConfig {
    #[serde(flatten)]
    pub alarmer: Alarmer,
    pub url: String,
}

impl Config {
    pub fn load(path: &Path) -> anyhow::Result<Config> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading config file {}", path.display()))?;
        let mut config: Config = toml::from_str(&raw)
            .with_context(|| format!("parsing config file {}", path.display()))?;
        config.apply_env(std::env::vars());
        config.validate()?;
        Ok(config)
    }

    /// Applies `CHAINMON_*` overrides on top of the parsed file. Malformed
    /// values are logged and ignored; the file value stays in effect.
    fn apply_env(&mut self, vars: impl Iterator<Item = (String, String)>) {
        // Iteration order of the environment is arbitrary, and these two
        // only make sense once the validator address is known.
        let mut max_missing: Option<u64> = None;
        let mut target_blocks: Option<u32> = None;

        for (key, value) in vars {
            match key.as_str() {
                "CHAINMON_RUN_ID" => self.run_id = value,
                "CHAINMON_DB_PATH" => self.database.path = PathBuf::from(value),
                "CHAINMON_CHECK_INTERVAL_SECS" => {
                    parse_override(&key, &value, &mut self.check_interval_secs)
                }
                "CHAINMON_CHECKERS" => self.checkers = parse_name_list(&key, &value),
                "CHAINMON_MONITORS" => self.monitors = parse_name_list(&key, &value),
                "CHAINMON_HEIGHT_MAX_STUCK_SECS" => {
                    parse_override(&key, &value, &mut self.default_checker.max_stuck_secs)
                }
                "CHAINMON_HEARTBEAT_MAX_WAIT_SECS" => match value.parse() {
                    Ok(secs) => {
                        self.default_checker
                            .heartbeat_max_wait_secs
                            .insert("default".to_string(), secs);
                    }
                    Err(_) => tracing::warn!(key, value, "ignoring malformed override"),
                },
                "CHAINMON_LOW_PEER_COUNT" => {
                    parse_override(&key, &value, &mut self.default_checker.min_peer_count)
                }
                "CHAINMON_VALIDATOR_ADDRESS" => {
                    match &mut self.default_checker.missing_block {
                        Some(cfg) => cfg.validator_address = value,
                        None => {
                            self.default_checker.missing_block = Some(MissingBlockConfig {
                                validator_address: value,
                                max_missing_count: DEFAULT_MAX_MISSING_COUNT,
                                target_block_count: DEFAULT_TARGET_BLOCK_COUNT,
                            });
                        }
                    }
                }
                "CHAINMON_MAX_MISSING_COUNT" => match value.parse() {
                    Ok(n) => max_missing = Some(n),
                    Err(_) => tracing::warn!(key, value, "ignoring malformed override"),
                },
                "CHAINMON_TARGET_BLOCK_COUNT" => match value.parse() {
                    Ok(n) => target_blocks = Some(n),
                    Err(_) => tracing::warn!(key, value, "ignoring malformed override"),
                },
                _ => {}
            }
        }

        if max_missing.is_some() || target_blocks.is_some() {
            match &mut self.default_checker.missing_block {
                Some(cfg) => {
                    if let Some(n) = max_missing {
                        cfg.max_missing_count = n;
                    }
                    if let Some(n) = target_blocks {
                        cfg.target_block_count = n;
                    }
                }
                None => tracing::warn!(
                    "missing-block overrides ignored: no validator address configured"
                ),
            }
        }
    }

    fn validate(&self) -> anyhow::Result<()> {
        if self.run_id.is_empty() {
            bail!("run_id must be set (config key `run_id` or CHAINMON_RUN_ID)");
        }
        if self.agents.is_empty() {
            bail!("at least one [[agents]] entry is required");
        }
        if self.check_interval_secs == 0 {
            bail!("check_interval_secs must be positive");
        }
        for agent in &self.agents {
            if agent.push_interval_secs == 0 {
                bail!("agent '{}': push_interval_secs must be positive", agent.name);
            }
        }
        Ok(())
    }
}

fn parse_override<T: std::str::FromStr>(key: &str, value: &str, slot: &mut T) {
    match value.parse() {
        Ok(parsed) => *slot = parsed,
        Err(_) => tracing::warn!(key, value, "ignoring malformed override"),
    }
}

fn parse_name_list<T: std::str::FromStr<Err = String>>(key: &str, value: &str) -> Vec<T> {
    value
        .split(',')
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .filter_map(|name| match name.parse() {
            Ok(kind) => Some(kind),
            Err(e) => {
                tracing::warn!(key, error = %e, "skipping unknown name in override");
                None
            }
        })
        .collect()
}

fn default_check_interval() -> u64 {
    DEFAULT_CHECK_INTERVAL_SECS
}

fn default_rpc_timeout() -> u64 {
    DEFAULT_RPC_TIMEOUT_SECS
}

fn default_rpc_retries() -> u32 {
    DEFAULT_RPC_RETRIES
}

fn default_push_interval() -> u64 {
    DEFAULT_PUSH_INTERVAL_SECS
}

fn default_backfill_concurrency() -> usize {
    DEFAULT_BACKFILL_CONCURRENCY
}

fn all_checkers() -> Vec<CheckerKind> {
    vec![
        CheckerKind::Heartbeat,
        CheckerKind::HeightStuck,
        CheckerKind::LowPeer,
        CheckerKind::MissingBlock,
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use chainmon_alert::MessageFormat;

    const MINIMAL: &str = r#"
        run_id = "fleet-1"

        [database]
        path = "/var/lib/chainmon/chainmon.db"

        [[agents]]
        name = "val-1"
        rpc_url = "http://10.0.0.1:26657"
    "#;

    fn parse(raw: &str) -> Config {
        toml::from_str(raw).unwrap()
    }

    #[test]
    fn minimal_config_gets_all_defaults() {
        let config = parse(MINIMAL);
        config.validate().unwrap();
        assert_eq!(config.check_interval_secs, DEFAULT_CHECK_INTERVAL_SECS);
        assert_eq!(config.rpc_retries, DEFAULT_RPC_RETRIES);
        assert_eq!(config.monitors, MonitorKind::all());
        assert_eq!(config.checkers.len(), 4);
        assert_eq!(config.agents[0].push_interval_secs, DEFAULT_PUSH_INTERVAL_SECS);
        assert_eq!(
            config.agents[0].backfill_max_concurrency,
            DEFAULT_BACKFILL_CONCURRENCY
        );
    }

    #[test]
    fn full_config_parses() {
        let config = parse(
            r##"
            run_id = "fleet-1"
            check_interval_secs = 30
            monitors = ["status", "backfill"]
            checkers = ["heartbeat", "missing_block"]

            [database]
            path = "chainmon.db"

            [default_checker]
            max_stuck_secs = 120
            min_peer_count = 8

            [default_checker.heartbeat_max_wait_secs]
            default = 60
            "tm:event:commit" = 600

            [[alerts]]
            name = "tendermint:heartbeat"
            level = "high"

            [[alerts]]
            name = "tendermint:heartbeat,tm:event:net_info"
            level = "critical"

            [[alarmers]]
            name = "ops-webhook"
            url = "https://hooks.example.com/T000/B000"
            target_levels = ["high", "critical"]
            resend_secs = 3600
            format = "html"

            [alarmers.params]
            channel = "#alerts-$ALERT_LEVEL"

            [[agents]]
            name = "val-1"
            rpc_url = "http://10.0.0.1:26657"
            push_interval_secs = 10
            backfill_max_concurrency = 20

            [agents.checker]
            min_peer_count = 3

            [agents.checker.missing_block]
            validator_address = "VALIDATOR_A"
            max_missing_count = 5
            "##,
        );
        config.validate().unwrap();

        assert_eq!(config.monitors, vec![MonitorKind::Status, MonitorKind::Backfill]);
        assert_eq!(config.default_checker.max_stuck_secs, 120);
        assert_eq!(config.alerts[1].tokens().len(), 2);

        let alarmer = &config.alarmers[0].alarmer;
        assert_eq!(alarmer.format, MessageFormat::Html);
        assert_eq!(alarmer.resend_secs, 3600);
        assert_eq!(config.alarmers[0].url, "https://hooks.example.com/T000/B000");

        let agent = &config.agents[0];
        let merged = config.default_checker.merged_with(&agent.checker);
        assert_eq!(merged.min_peer_count, 3);
        assert_eq!(merged.max_stuck_secs, 120);
        assert_eq!(merged.missing_block.unwrap().max_missing_count, 5);
    }

    #[test]
    fn env_overrides_apply() {
        let mut config = parse(MINIMAL);
        config.apply_env(
            vec![
                ("CHAINMON_RUN_ID".to_string(), "fleet-2".to_string()),
                ("CHAINMON_DB_PATH".to_string(), "/tmp/other.db".to_string()),
                ("CHAINMON_CHECK_INTERVAL_SECS".to_string(), "99".to_string()),
                ("UNRELATED".to_string(), "x".to_string()),
            ]
            .into_iter(),
        );
        assert_eq!(config.run_id, "fleet-2");
        assert_eq!(config.database.path, PathBuf::from("/tmp/other.db"));
        assert_eq!(config.check_interval_secs, 99);
    }

    #[test]
    fn unit_list_overrides_parse_comma_separated_names() {
        let mut config = parse(MINIMAL);
        config.apply_env(
            vec![
                ("CHAINMON_CHECKERS".to_string(), "heartbeat,low_peer".to_string()),
                ("CHAINMON_MONITORS".to_string(), "status, bogus".to_string()),
            ]
            .into_iter(),
        );
        assert_eq!(
            config.checkers,
            vec![CheckerKind::Heartbeat, CheckerKind::LowPeer]
        );
        // Unknown names are skipped, not fatal.
        assert_eq!(config.monitors, vec![MonitorKind::Status]);
    }

    #[test]
    fn threshold_overrides_reach_the_default_checker() {
        let mut config = parse(MINIMAL);
        config.apply_env(
            vec![
                ("CHAINMON_HEIGHT_MAX_STUCK_SECS".to_string(), "600".to_string()),
                ("CHAINMON_HEARTBEAT_MAX_WAIT_SECS".to_string(), "90".to_string()),
                ("CHAINMON_LOW_PEER_COUNT".to_string(), "12".to_string()),
                ("CHAINMON_MAX_MISSING_COUNT".to_string(), "4".to_string()),
                ("CHAINMON_VALIDATOR_ADDRESS".to_string(), "VALIDATOR_A".to_string()),
            ]
            .into_iter(),
        );
        assert_eq!(config.default_checker.max_stuck_secs, 600);
        assert_eq!(config.default_checker.heartbeat_wait_secs("tm:event:status"), 90);
        assert_eq!(config.default_checker.min_peer_count, 12);
        let missing = config.default_checker.missing_block.unwrap();
        assert_eq!(missing.validator_address, "VALIDATOR_A");
        assert_eq!(missing.max_missing_count, 4);
        assert_eq!(missing.target_block_count, DEFAULT_TARGET_BLOCK_COUNT);
    }

    #[test]
    fn missing_block_counts_without_an_address_are_dropped() {
        let mut config = parse(MINIMAL);
        config.apply_env(
            vec![("CHAINMON_MAX_MISSING_COUNT".to_string(), "4".to_string())].into_iter(),
        );
        assert!(config.default_checker.missing_block.is_none());
    }

    #[test]
    fn malformed_interval_override_is_ignored() {
        let mut config = parse(MINIMAL);
        config.apply_env(
            vec![("CHAINMON_CHECK_INTERVAL_SECS".to_string(), "soon".to_string())].into_iter(),
        );
        assert_eq!(config.check_interval_secs, DEFAULT_CHECK_INTERVAL_SECS);
    }

    #[test]
    fn missing_run_id_is_fatal() {
        let config = parse(
            r#"
            [database]
            path = "chainmon.db"

            [[agents]]
            name = "val-1"
            rpc_url = "http://10.0.0.1:26657"
            "#,
        );
        assert!(config.validate().is_err());
    }

    #[test]
    fn empty_agent_list_is_fatal() {
        let config = parse(
            r#"
            run_id = "fleet-1"
            agents = []

            [database]
            path = "chainmon.db"
            "#,
        );
        assert!(config.validate().is_err());
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let raw = r#"
            run_id = "fleet-1"
            check_intervall_secs = 10

            [database]
            path = "chainmon.db"

            [[agents]]
            name = "val-1"
            rpc_url = "http://10.0.0.1:26657"
        "#;
        assert!(toml::from_str::<Config>(raw).is_err());
    }
}
