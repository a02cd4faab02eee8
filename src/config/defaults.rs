//! Built-in defaults (layer 1)

use serde::{Deserialize, Serialize};

/// Built-in default configuration values
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuiltinDefaults {
    /// Web service root (default: Launchpad `devel`)
    pub service_root: String,

    /// OAuth consumer name sent with every request
    pub consumer: String,

    /// Per-request timeout in seconds (default: 30)
    pub timeout_seconds: u64,

    /// Live publications kept per channel (default: 2)
    pub max_sources: u64,

    /// Retention order key (default: "date")
    pub order_by: String,

    /// Version scheme for version ordering (default: "normalized")
    pub version_scheme: String,

    /// Aggregate deletion failure threshold (default: "all")
    pub failure_threshold: String,

    /// Build recency window in minutes (default: 168)
    pub time_frame_minutes: u64,

    /// Upload tool (default: "dput")
    pub upload_command: String,
}

impl Default for BuiltinDefaults {
    fn default() -> Self {
        Self {
            service_root: "https://api.launchpad.net/devel".to_string(),
            consumer: "ppa-steward".to_string(),
            timeout_seconds: 30,
            max_sources: 2,
            order_by: "date".to_string(),
            version_scheme: "normalized".to_string(),
            failure_threshold: "all".to_string(),
            time_frame_minutes: 168,
            upload_command: "dput".to_string(),
        }
    }
}

impl BuiltinDefaults {
    /// Convert to JSON Value for merging
    pub fn to_value(&self) -> serde_json::Value {
        serde_json::json!({
            "archive": {
                "service_root": self.service_root,
                "consumer": self.consumer,
                "timeout_seconds": self.timeout_seconds
            },
            "retention": {
                "max_sources": self.max_sources,
                "order_by": self.order_by,
                "version_scheme": self.version_scheme,
                "failure_threshold": self.failure_threshold
            },
            "builds": {
                "time_frame_minutes": self.time_frame_minutes
            },
            "upload": {
                "command": self.upload_command,
                "args": []
            },
            "credentials": {}
        })
    }
}
