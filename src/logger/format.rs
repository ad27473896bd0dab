//! Access log line rendering
//!
//! `combined` and `common` follow the Apache/Nginx layouts, `json` is one
//! object per line, and any other string is a pattern of `$variables`.

use chrono::{DateTime, Local};
use serde::Serialize;

/// Longest client-controlled field written to a log line
const MAX_FIELD_LEN: usize = 256;

const CLF_TIME: &str = "%d/%b/%Y:%H:%M:%S %z";

/// One served request, as it will appear in the access log
///
/// Client-controlled strings are escaped on the way in, so every
/// rendering is a single line.
#[derive(Debug, Clone, Serialize)]
pub struct AccessLogEntry {
    pub remote_addr: String,
    #[serde(serialize_with = "serialize_rfc3339")]
    pub time: DateTime<Local>,
    pub method: String,
    pub path: String,
    /// Without the leading `?`
    pub query: Option<String>,
    pub http_version: String,
    pub status: u16,
    pub body_bytes: usize,
    pub content_type: Option<String>,
    pub referer: Option<String>,
    pub user_agent: Option<String>,
    pub request_time_us: u64,
}

impl AccessLogEntry {
    /// Start an entry stamped with the current local time
    pub fn new(remote_addr: String, method: String, path: String) -> Self {
        Self {
            remote_addr,
            time: Local::now(),
            method,
            path: sanitize_field(&path),
            query: None,
            http_version: "1.1".to_string(),
            status: 200,
            body_bytes: 0,
            content_type: None,
            referer: None,
            user_agent: None,
            request_time_us: 0,
        }
    }

    pub fn with_query(mut self, query: Option<&str>) -> Self {
        self.query = query.map(sanitize_field);
        self
    }

    pub fn with_headers(mut self, referer: Option<&str>, user_agent: Option<&str>) -> Self {
        self.referer = referer.map(sanitize_field);
        self.user_agent = user_agent.map(sanitize_field);
        self
    }

    /// Render with a named layout or a `$variable` pattern
    pub fn format(&self, format: &str) -> String {
        match format {
            "common" => self.common_line(),
            "combined" => format!(
                "{} \"{}\" \"{}\"",
                self.common_line(),
                dash(self.referer.as_deref()),
                dash(self.user_agent.as_deref()),
            ),
            "json" => serde_json::to_string(self)
                .unwrap_or_else(|e| format!(r#"{{"error":"unserializable access log entry: {e}"}}"#)),
            pattern => self.expand(pattern),
        }
    }

    fn request_uri(&self) -> String {
        match &self.query {
            Some(q) => format!("{}?{q}", self.path),
            None => self.path.clone(),
        }
    }

    fn request_line(&self) -> String {
        format!("{} {} HTTP/{}", self.method, self.request_uri(), self.http_version)
    }

    fn common_line(&self) -> String {
        format!(
            "{} - - [{}] \"{}\" {} {}",
            self.remote_addr,
            self.time.format(CLF_TIME),
            self.request_line(),
            self.status,
            self.body_bytes,
        )
    }

    /// Substitute `$variables` in a custom pattern
    ///
    /// Variables: `$remote_addr`, `$time_local`, `$time_iso8601`, `$request`,
    /// `$request_method`, `$request_uri`, `$request_time` (seconds, three
    /// decimals), `$status`, `$body_bytes_sent`, `$content_type`,
    /// `$http_referer`, `$http_user_agent`. Unknown names are kept verbatim.
    ///
    /// The pattern is scanned once, so `$name` text inside substituted
    /// client values is never expanded.
    fn expand(&self, pattern: &str) -> String {
        let mut out = String::with_capacity(pattern.len() * 2);
        let mut rest = pattern;

        while let Some(dollar) = rest.find('$') {
            out.push_str(&rest[..dollar]);
            let after = &rest[dollar + 1..];
            let name_len = after
                .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
                .unwrap_or(after.len());
            let name = &after[..name_len];

            match self.variable(name) {
                Some(value) => out.push_str(&value),
                None => {
                    out.push('$');
                    out.push_str(name);
                }
            }
            rest = &after[name_len..];
        }
        out.push_str(rest);
        out
    }

    fn variable(&self, name: &str) -> Option<String> {
        let value = match name {
            "remote_addr" => self.remote_addr.clone(),
            "time_local" => self.time.format(CLF_TIME).to_string(),
            "time_iso8601" => self.time.to_rfc3339(),
            "request" => self.request_line(),
            "request_method" => self.method.clone(),
            "request_uri" => self.request_uri(),
            "request_time" => {
                #[allow(clippy::cast_precision_loss)]
                let seconds = self.request_time_us as f64 / 1_000_000.0;
                format!("{seconds:.3}")
            }
            "status" => self.status.to_string(),
            "body_bytes_sent" => self.body_bytes.to_string(),
            "content_type" => dash(self.content_type.as_deref()).to_string(),
            "http_referer" => dash(self.referer.as_deref()).to_string(),
            "http_user_agent" => dash(self.user_agent.as_deref()).to_string(),
            _ => return None,
        };
        Some(value)
    }
}

fn dash(value: Option<&str>) -> &str {
    value.unwrap_or("-")
}

/// Escape control characters and quotes, and cap the length
///
/// Keeps a hostile path from forging extra log lines.
pub fn sanitize_field(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len().min(MAX_FIELD_LEN));
    for (count, c) in raw.chars().enumerate() {
        if count == MAX_FIELD_LEN {
            out.push_str("...");
            break;
        }
        if c.is_control() || c == '"' {
            out.extend(c.escape_default());
        } else {
            out.push(c);
        }
    }
    out
}

fn serialize_rfc3339<S: serde::Serializer>(
    time: &DateTime<Local>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&time.to_rfc3339())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_entry() -> AccessLogEntry {
        let mut entry = AccessLogEntry::new(
            "192.168.1.1".to_string(),
            "GET".to_string(),
            "/api/protected-asset".to_string(),
        )
        .with_query(Some("path=images/logo.png"))
        .with_headers(Some("https://example.com"), Some("Mozilla/5.0"));
        entry.body_bytes = 1234;
        entry.content_type = Some("image/png".to_string());
        entry.request_time_us = 1600;
        entry
    }

    #[test]
    fn test_combined_and_common() {
        let entry = sample_entry();

        let combined = entry.format("combined");
        assert!(combined.starts_with("192.168.1.1 - - ["));
        assert!(combined
            .contains("\"GET /api/protected-asset?path=images/logo.png HTTP/1.1\" 200 1234"));
        assert!(combined.ends_with("\"https://example.com\" \"Mozilla/5.0\""));

        let common = entry.format("common");
        assert!(common.ends_with("200 1234"));
        assert!(!common.contains("Mozilla"));
    }

    #[test]
    fn test_json_line() {
        let value: serde_json::Value =
            serde_json::from_str(&sample_entry().format("json")).unwrap();
        assert_eq!(value["remote_addr"], "192.168.1.1");
        assert_eq!(value["status"], 200);
        assert_eq!(value["body_bytes"], 1234);
        assert_eq!(value["content_type"], "image/png");
        assert!(value["time"].as_str().unwrap().contains('T'));
    }

    #[test]
    fn test_pattern_variables() {
        let entry = sample_entry();
        assert_eq!(
            entry.format("$remote_addr - $status - $content_type - $request_time"),
            "192.168.1.1 - 200 - image/png - 0.002"
        );
        assert_eq!(
            entry.format("$request_method $request_uri"),
            "GET /api/protected-asset?path=images/logo.png"
        );
    }

    #[test]
    fn test_client_text_is_not_expanded() {
        let entry = AccessLogEntry::new(
            "10.0.0.1".to_string(),
            "GET".to_string(),
            "/api/protected-assets/$http_user_agent$status".to_string(),
        )
        .with_headers(None, Some("curl/8.0"));

        assert_eq!(
            entry.format("$request_uri [$http_user_agent] $unknown $"),
            "/api/protected-assets/$http_user_agent$status [curl/8.0] $unknown $"
        );
    }

    #[test]
    fn test_forged_newline_stays_on_one_line() {
        let entry = AccessLogEntry::new(
            "10.0.0.1".to_string(),
            "GET".to_string(),
            "/api/protected-assets/a\n127.0.0.1 - - fake".to_string(),
        );
        let line = entry.format("common");
        assert_eq!(line.lines().count(), 1);
        assert!(line.contains("a\\n127.0.0.1"));
    }

    #[test]
    fn test_long_field_truncated() {
        let sanitized = sanitize_field(&"a".repeat(1000));
        assert_eq!(sanitized.len(), MAX_FIELD_LEN + 3);
        assert!(sanitized.ends_with("..."));
    }
}
