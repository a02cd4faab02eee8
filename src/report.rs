//! Structured command output.
//!
//! Every command prints one report: JSON by default, or an indented text
//! rendering with `--human`.

use serde::Serialize;
use serde_json::{Map, Value};

use crate::error::EngineError;

/// Result of one command invocation
#[derive(Debug, Clone, Serialize)]
pub struct CommandReport {
    /// ULID identifying this invocation in logs
    pub operation_id: String,
    pub command: String,
    /// A deletion, creation, update or upload happened
    pub changed: bool,
    pub failed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub msg: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<String>,
    #[serde(flatten)]
    pub data: Map<String, Value>,
}

impl CommandReport {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            operation_id: ulid::Ulid::new().to_string(),
            command: command.into(),
            changed: false,
            failed: false,
            msg: None,
            error_kind: None,
            data: Map::new(),
        }
    }

    /// Set a data field
    pub fn with(mut self, key: &str, value: impl Serialize) -> Self {
        self.insert(key, value);
        self
    }

    pub fn insert(&mut self, key: &str, value: impl Serialize) {
        let value = serde_json::to_value(value).unwrap_or_else(|e| {
            tracing::warn!(key, error = %e, "unserializable report field");
            Value::Null
        });
        self.data.insert(key.to_string(), value);
    }

    pub fn changed(mut self, changed: bool) -> Self {
        self.changed = changed;
        self
    }

    /// Mark failed because of a fatal engine error
    pub fn fail(mut self, error: &EngineError) -> Self {
        self.failed = true;
        self.msg = Some(error.to_string());
        self.error_kind = Some(error.kind().to_string());
        self
    }

    /// Mark failed with a free-form message
    pub fn fail_with(mut self, kind: &str, msg: impl Into<String>) -> Self {
        self.failed = true;
        self.msg = Some(msg.into());
        self.error_kind = Some(kind.to_string());
        self
    }

    pub fn exit_code(&self) -> i32 {
        if self.failed {
            1
        } else {
            0
        }
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    pub fn to_human(&self) -> String {
        let mut out = String::new();
        let status = match (self.failed, self.changed) {
            (true, _) => "FAILED",
            (false, true) => "changed",
            (false, false) => "ok",
        };
        out.push_str(&format!("{}: {} ({})\n", self.command, status, self.operation_id));
        if let Some(msg) = &self.msg {
            out.push_str(&format!("  {}\n", msg));
        }
        for (key, value) in &self.data {
            render_field(&mut out, key, value);
        }
        out
    }
}

fn render_field(out: &mut String, key: &str, value: &Value) {
    match value {
        Value::Array(items) => {
            out.push_str(&format!("  {}: {}\n", key, items.len()));
            for item in items {
                out.push_str(&format!("    - {}\n", summarize(item)));
            }
        }
        Value::Object(map) if map.is_empty() => {}
        Value::Object(map) => {
            out.push_str(&format!("  {}:\n", key));
            for (k, v) in map {
                match v {
                    Value::Array(items) => {
                        out.push_str(&format!("    {}: {}\n", k, items.len()))
                    }
                    _ => out.push_str(&format!("    {}: {}\n", k, summarize(v))),
                }
            }
        }
        Value::Null => {}
        _ => out.push_str(&format!("  {}: {}\n", key, summarize(value))),
    }
}

/// One-line description of a value
fn summarize(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Object(map) => {
            let field = |k: &str| map.get(k).and_then(Value::as_str);
            match (field("name").or(field("source_name")), field("version").or(field("source_version"))) {
                (Some(name), Some(version)) => match field("status").or(field("state")) {
                    Some(status) => format!("{name} {version} [{status}]"),
                    None => format!("{name} {version}"),
                },
                (Some(name), None) => name.to_string(),
                _ => Value::Object(map.clone()).to_string(),
            }
        }
        other => other.to_string(),
    }
}
