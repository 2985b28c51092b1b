use crate::{AlertLevel, MessageFormat};
use chainmon_notify::AlarmPayload;
use serde_json::{Map, Value};

/// Errors raised while rendering an alarmer's parameter template.
#[derive(Debug, thiserror::Error)]
pub enum TemplateError {
    /// The template references a `$TOKEN` that is not a built-in.
    #[error("Template: unknown substitution token '${0}'")]
    UnknownToken(String),

    /// Parameter values must be scalars; nested structures are rejected
    /// rather than walked.
    #[error("Template: unsupported value for param '{0}' (must be a scalar)")]
    UnsupportedParam(String),
}

/// The fixed set of values available to `$TOKEN` substitution.
pub struct TemplateVars<'a> {
    pub agent: &'a str,
    pub alert_name: &'a str,
    pub level: &'a str,
    pub service: &'a str,
    pub message: &'a str,
}

impl TemplateVars<'_> {
    fn lookup(&self, token: &str) -> Option<&str> {
        match token {
            "AGENT_NAME" => Some(self.agent),
            "ALERT_NAME" => Some(self.alert_name),
            "ALERT_LEVEL" => Some(self.level),
            "SERVICE_NAME" => Some(self.service),
            "MESSAGE" => Some(self.message),
            _ => None,
        }
    }
}

/// Renders the human-readable message body for an alert.
///
/// The short alert name shown in the header is the last colon-separated
/// segment of the resolved entry's name.
pub fn render_message(
    format: MessageFormat,
    agent: &str,
    level: &AlertLevel,
    service: &str,
    detail: &str,
) -> String {
    let short_name = level
        .alert_name
        .rsplit(':')
        .next()
        .unwrap_or(&level.alert_name);
    match format {
        MessageFormat::Custom => detail.to_string(),
        MessageFormat::Html => format!(
            "<b>{agent}</b>\n\nAlertName: {short_name}\nAlertLevel: <b>{}</b>\nService: {service}\n\n{detail}",
            level.level
        ),
        MessageFormat::Plain => format!(
            "{agent}\n\nAlertName: {short_name}\nAlertLevel: {}\nService: {service}\n\n{detail}",
            level.level
        ),
    }
}

/// Renders an alarmer's parameter map into the transport payload,
/// substituting `$TOKEN` placeholders in string values from the fixed
/// built-in set and appending the rendered message as `text`.
///
/// Scalar non-string values pass through untouched. Arrays, objects and
/// nulls are rejected: substitution never reflects over arbitrary nesting.
pub fn render_params(
    params: &Map<String, Value>,
    vars: &TemplateVars<'_>,
    text: &str,
) -> Result<AlarmPayload, TemplateError> {
    let mut payload = AlarmPayload::new();
    for (key, value) in params {
        let rendered = match value {
            Value::String(s) => Value::String(substitute(s, vars)?),
            Value::Number(_) | Value::Bool(_) => value.clone(),
            Value::Null | Value::Array(_) | Value::Object(_) => {
                return Err(TemplateError::UnsupportedParam(key.clone()))
            }
        };
        payload.insert(key.clone(), rendered);
    }
    payload.insert("text".to_string(), Value::String(text.to_string()));
    Ok(payload)
}

fn substitute(input: &str, vars: &TemplateVars<'_>) -> Result<String, TemplateError> {
    let mut out = String::with_capacity(input.len());
    let mut chars = input.char_indices().peekable();
    while let Some((_, c)) = chars.next() {
        if c != '$' {
            out.push(c);
            continue;
        }
        let mut token = String::new();
        while let Some(&(_, next)) = chars.peek() {
            if next.is_ascii_uppercase() || next == '_' {
                token.push(next);
                chars.next();
            } else {
                break;
            }
        }
        if token.is_empty() {
            // A lone '$' is literal text.
            out.push('$');
            continue;
        }
        match vars.lookup(&token) {
            Some(value) => out.push_str(value),
            None => return Err(TemplateError::UnknownToken(token)),
        }
    }
    Ok(out)
}
