use crate::routing::AlertRouting;
use crate::template::{self, TemplateVars};
use crate::{Alarmer, AlertCandidate, AlertLevel};
use chainmon_common::types::AlertRecord;
use chainmon_notify::AlarmTransport;
use chainmon_storage::EventStore;
use chrono::Utc;
use std::sync::Arc;
use uuid::Uuid;

/// Drives a candidate through resolution, the dedup/resend guard, message
/// rendering, transport invocation and alert recording.
///
/// Every failure short of a successful guard pass only drops the candidate
/// with a log line; nothing here may take down a checker cycle.
pub struct AlertDispatcher {
    routing: AlertRouting,
    store: Arc<dyn EventStore>,
    transport: Arc<dyn AlarmTransport>,
    run_id: String,
    service_name: String,
}

impl AlertDispatcher {
    pub fn new(
        routing: AlertRouting,
        store: Arc<dyn EventStore>,
        transport: Arc<dyn AlarmTransport>,
        run_id: &str,
        service_name: &str,
    ) -> Self {
        Self {
            routing,
            store,
            transport,
            run_id: run_id.to_string(),
            service_name: service_name.to_string(),
        }
    }

    /// Dispatches one alert candidate. Returns the number of alarmers the
    /// candidate was actually sent through (after dedup/mute gating).
    pub async fn dispatch(&self, candidate: &AlertCandidate) -> usize {
        let tokens: Vec<&str> = candidate.tokens.iter().map(String::as_str).collect();

        let Some(level) = self.routing.resolve(&candidate.agent_name, &tokens) else {
            tracing::error!(
                agent = %candidate.agent_name,
                tokens = ?candidate.tokens,
                "no alert level configured, dropping candidate"
            );
            return 0;
        };

        let alarmers = self.routing.alarmers_for(&candidate.agent_name, &level.level);
        if alarmers.is_empty() {
            tracing::error!(
                agent = %candidate.agent_name,
                alert = %level.alert_name,
                level = %level.level,
                "no alarmer configured for this level"
            );
            return 0;
        }

        let mut sent = 0;
        for alarmer in alarmers {
            if self.send_one(candidate, level, alarmer).await {
                sent += 1;
            }
        }
        sent
    }

    async fn send_one(
        &self,
        candidate: &AlertCandidate,
        level: &AlertLevel,
        alarmer: &Alarmer,
    ) -> bool {
        let now = Utc::now();

        match self.store.alert_sent_or_marked(
            &level.alert_name,
            &alarmer.name,
            &candidate.agent_name,
            alarmer.resend_duration(),
            now,
        ) {
            Ok(true) => {
                tracing::debug!(
                    agent = %candidate.agent_name,
                    alert = %level.alert_name,
                    alarmer = %alarmer.name,
                    "alert suppressed (recently sent or agent muted)"
                );
                return false;
            }
            Ok(false) => {}
            Err(e) => {
                tracing::error!(
                    agent = %candidate.agent_name,
                    alert = %level.alert_name,
                    error = %e,
                    "dedup guard query failed, skipping this alarmer"
                );
                return false;
            }
        }

        let text = template::render_message(
            alarmer.format,
            &candidate.agent_name,
            level,
            &self.service_name,
            &candidate.message,
        );
        let vars = TemplateVars {
            agent: &candidate.agent_name,
            alert_name: &level.alert_name,
            level: &level.level,
            service: &self.service_name,
            message: &candidate.message,
        };
        let payload = match template::render_params(&alarmer.params, &vars, &text) {
            Ok(payload) => payload,
            Err(e) => {
                tracing::error!(
                    alarmer = %alarmer.name,
                    error = %e,
                    "alarmer parameter template is invalid, dropping"
                );
                return false;
            }
        };

        if let Err(e) = self.transport.invoke(&alarmer.name, &payload).await {
            // At-least-once: the record below is still written so a
            // transient transport error cannot turn into an alert storm.
            tracing::error!(
                agent = %candidate.agent_name,
                alarmer = %alarmer.name,
                error = %e,
                "alarm transport failed"
            );
        }

        let record = AlertRecord {
            id: Uuid::new_v4(),
            created_at: now,
            alert_name: level.alert_name.clone(),
            level: level.level.clone(),
            alarmer_name: alarmer.name.clone(),
            agent_name: candidate.agent_name.clone(),
            run_id: self.run_id.clone(),
        };
        if let Err(e) = self.store.save_alert_record(&record) {
            tracing::error!(
                agent = %candidate.agent_name,
                alert = %level.alert_name,
                error = %e,
                "failed to record dispatched alert"
            );
        }

        tracing::info!(
            agent = %candidate.agent_name,
            alert = %level.alert_name,
            level = %level.level,
            alarmer = %alarmer.name,
            "alert dispatched"
        );
        true
    }
}
