use crate::{Alarmer, AlertLevel};
use std::collections::HashMap;

/// Immutable alert routing table, built once at startup from the merged
/// fleet-wide defaults plus per-agent overrides, then shared read-only by
/// every checker.
pub struct AlertRouting {
    default_levels: Vec<AlertLevel>,
    default_alarmers: Vec<Alarmer>,
    agent_levels: HashMap<String, Vec<AlertLevel>>,
    agent_alarmers: HashMap<String, Vec<Alarmer>>,
}

impl AlertRouting {
    pub fn new(default_levels: Vec<AlertLevel>, default_alarmers: Vec<Alarmer>) -> Self {
        Self {
            default_levels,
            default_alarmers,
            agent_levels: HashMap::new(),
            agent_alarmers: HashMap::new(),
        }
    }

    /// Registers per-agent entries; empty lists mean "use the defaults".
    pub fn set_agent_entries(
        &mut self,
        agent: &str,
        levels: Vec<AlertLevel>,
        alarmers: Vec<Alarmer>,
    ) {
        if !levels.is_empty() {
            self.agent_levels.insert(agent.to_string(), levels);
        }
        if !alarmers.is_empty() {
            self.agent_alarmers.insert(agent.to_string(), alarmers);
        }
    }

    /// Resolves the severity level for `tokens` on `agent`.
    ///
    /// An entry matches when every one of its comma-split tokens is among
    /// the supplied tokens; among matches the largest token set wins, so a
    /// composite entry out-matches a single-token one when its full
    /// condition set is true. Agent entries take precedence; the fleet-wide
    /// defaults are consulted only when the agent has no matching entry.
    pub fn resolve(&self, agent: &str, tokens: &[&str]) -> Option<&AlertLevel> {
        self.agent_levels
            .get(agent)
            .and_then(|levels| best_match(levels, tokens))
            .or_else(|| best_match(&self.default_levels, tokens))
    }

    /// The alarmers registered for `(agent, level)`, falling back to the
    /// default set when the agent's own list yields none for this level.
    /// An empty result is a configuration gap the caller must log.
    pub fn alarmers_for(&self, agent: &str, level: &str) -> Vec<&Alarmer> {
        if let Some(alarmers) = self.agent_alarmers.get(agent) {
            let matched = targeting(alarmers, level);
            if !matched.is_empty() {
                return matched;
            }
        }
        targeting(&self.default_alarmers, level)
    }
}

fn best_match<'a>(levels: &'a [AlertLevel], tokens: &[&str]) -> Option<&'a AlertLevel> {
    levels
        .iter()
        .filter(|entry| entry.tokens().iter().all(|t| tokens.contains(t)))
        .max_by_key(|entry| entry.tokens().len())
}

fn targeting<'a>(alarmers: &'a [Alarmer], level: &str) -> Vec<&'a Alarmer> {
    alarmers
        .iter()
        .filter(|a| a.target_levels.iter().any(|l| l == level))
        .collect()
}
