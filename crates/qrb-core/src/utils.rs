use std::{
    fs::OpenOptions,
    io::Write,
    path::{Path, PathBuf},
};

use chrono::Utc;
use serde::Serialize;

use crate::{errors::Error, Result};

// ============== Timestamp Helpers ==============

/// RFC3339 timestamp in UTC (for logs/telemetry).
pub fn iso_timestamp_utc() -> String {
    Utc::now().to_rfc3339()
}

// ============== Audit Logging ==============

const AUDIT_MAX_TEXT: usize = 500;

#[derive(Clone, Debug, Serialize)]
pub struct AuditEvent {
    pub timestamp: String,
    pub event: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub message_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub codes_found: Option<usize>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub retry_after: Option<f64>,
}

impl AuditEvent {
    fn base(event: &str, user_id: i64, username: &str) -> Self {
        Self {
            timestamp: iso_timestamp_utc(),
            event: event.to_string(),
            user_id: Some(user_id),
            username: Some(username.to_string()),
            message_type: None,
            content: None,
            response: None,
            codes_found: None,
            error: None,
            context: None,
            retry_after: None,
        }
    }

    /// A text message routed to the calculator.
    pub fn calc(user_id: i64, username: &str, expression: &str, response: Option<&str>) -> Self {
        let mut ev = Self::base("calc", user_id, username);
        ev.message_type = Some("text".to_string());
        ev.content = Some(expression.to_string());
        ev.response = response.map(|s| s.to_string());
        ev
    }

    /// An image scanned for codes.
    pub fn scan(user_id: i64, username: &str, message_type: &str, codes_found: usize) -> Self {
        let mut ev = Self::base("scan", user_id, username);
        ev.message_type = Some(message_type.to_string());
        ev.codes_found = Some(codes_found);
        ev
    }

    pub fn error(user_id: i64, username: &str, error: &str, context: Option<&str>) -> Self {
        let mut ev = Self::base("error", user_id, username);
        ev.error = Some(error.to_string());
        ev.context = context.map(|s| s.to_string());
        ev
    }

    pub fn rate_limit(user_id: i64, username: &str, retry_after: f64) -> Self {
        let mut ev = Self::base("rate_limit", user_id, username);
        ev.retry_after = Some(retry_after);
        ev
    }
}

#[derive(Clone, Debug)]
pub struct AuditLogger {
    path: PathBuf,
    json: bool,
}

impl AuditLogger {
    pub fn new(path: impl Into<PathBuf>, json: bool) -> Self {
        Self {
            path: path.into(),
            json,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn write(&self, mut event: AuditEvent) -> Result<()> {
        // Decoded payloads and expressions can be large; cap them.
        if let Some(s) = &event.content {
            event.content = Some(truncate_text(s, AUDIT_MAX_TEXT));
        }
        if let Some(s) = &event.response {
            event.response = Some(truncate_text(s, AUDIT_MAX_TEXT));
        }

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;

        if self.json {
            let line = serde_json::to_string(&event)?;
            writeln!(file, "{line}")?;
            return Ok(());
        }

        // Plain text format for readability.
        let mut out = String::new();
        out.push('\n');
        out.push_str(&"=".repeat(60));

        let value = serde_json::to_value(&event)?;
        let Some(obj) = value.as_object() else {
            return Err(Error::External(
                "audit event is not a JSON object".to_string(),
            ));
        };
        for (k, v) in obj {
            out.push('\n');
            out.push_str(k);
            out.push_str(": ");
            out.push_str(&json_value_to_display(v));
        }
        out.push('\n');

        file.write_all(out.as_bytes())?;
        Ok(())
    }
}

pub fn truncate_text(s: &str, max_len: usize) -> String {
    if s.len() <= max_len {
        return s.to_string();
    }
    let mut out = s.chars().take(max_len).collect::<String>();
    out.push_str("...");
    out
}

fn json_value_to_display(v: &serde_json::Value) -> String {
    match v {
        serde_json::Value::Null => "null".to_string(),
        serde_json::Value::Bool(b) => b.to_string(),
        serde_json::Value::Number(n) => n.to_string(),
        serde_json::Value::String(s) => s.to_string(),
        other => serde_json::to_string(other).unwrap_or_else(|_| "<unprintable>".to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tmp_file(prefix: &str) -> PathBuf {
        let ts = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis();
        let pid = std::process::id();
        PathBuf::from(format!("/tmp/{prefix}-{pid}-{ts}.log"))
    }

    #[test]
    fn truncate_text_adds_ellipsis() {
        let s = "a".repeat(AUDIT_MAX_TEXT + 10);
        let t = truncate_text(&s, AUDIT_MAX_TEXT);
        assert!(t.ends_with("..."));
        assert!(t.len() >= AUDIT_MAX_TEXT);
    }

    #[test]
    fn audit_writes_json_lines_and_truncates() {
        let log = AuditLogger::new(tmp_file("qrb-audit-test"), true);
        let content = "x".repeat(AUDIT_MAX_TEXT + 50);
        let ev = AuditEvent::calc(1, "u", &content, None);

        log.write(ev).unwrap();
        let written = std::fs::read_to_string(log.path()).unwrap();
        assert!(written.contains("\"event\":\"calc\""));
        assert!(written.contains("..."));

        let _ = std::fs::remove_file(log.path());
    }

    #[test]
    fn audit_plain_text_lists_fields() {
        let log = AuditLogger::new(tmp_file("qrb-audit-plain"), false);
        log.write(AuditEvent::scan(2, "someone", "photo", 3)).unwrap();

        let written = std::fs::read_to_string(log.path()).unwrap();
        assert!(written.contains("event: scan"));
        assert!(written.contains("codes_found: 3"));

        let _ = std::fs::remove_file(log.path());
    }
}
