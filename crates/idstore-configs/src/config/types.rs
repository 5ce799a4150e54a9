use super::defaults::*;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Root configuration, usually read from `idstore.toml`.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct IdentityConfig {
    #[serde(default)]
    pub backend: BackendSettings,
    #[serde(default)]
    pub tables: TableSettings,
    #[serde(default)]
    pub schema: SchemaSettings,
    #[serde(default)]
    pub logging: LoggingSettings,
}

/// Which table service to talk to.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendSettings {
    /// "memory" or "dynamodb"
    #[serde(default = "default_backend_kind")]
    pub kind: String,
    #[serde(default = "default_region")]
    pub region: String,
    /// Custom endpoint, e.g. a local DynamoDB at http://localhost:8000
    #[serde(default)]
    pub endpoint_url: Option<String>,
}

impl Default for BackendSettings {
    fn default() -> Self {
        Self {
            kind: default_backend_kind(),
            region: default_region(),
            endpoint_url: None,
        }
    }
}

/// Physical table names for the three identity tables.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TableSettings {
    #[serde(default = "default_users_table")]
    pub users: String,
    #[serde(default = "default_roles_table")]
    pub roles: String,
    #[serde(default = "default_role_users_table", alias = "role_users")]
    pub role_memberships: String,
}

impl Default for TableSettings {
    fn default() -> Self {
        Self {
            users: default_users_table(),
            roles: default_roles_table(),
            role_memberships: default_role_users_table(),
        }
    }
}

/// Schema initialization knobs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchemaSettings {
    /// Delay between two `describe_table` polls while waiting for activation
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    /// Upper bound on the activation wait before startup fails
    #[serde(default = "default_max_wait_ms")]
    pub max_wait_ms: u64,
    #[serde(default = "default_read_capacity_units")]
    pub read_capacity_units: i64,
    #[serde(default = "default_write_capacity_units")]
    pub write_capacity_units: i64,
}

impl Default for SchemaSettings {
    fn default() -> Self {
        Self {
            poll_interval_ms: default_poll_interval_ms(),
            max_wait_ms: default_max_wait_ms(),
            read_capacity_units: default_read_capacity_units(),
            write_capacity_units: default_write_capacity_units(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingSettings {
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Directory for log files (default: "./logs")
    #[serde(default = "default_logs_path")]
    pub logs_path: String,
    #[serde(default = "default_true")]
    pub log_to_console: bool,
    /// Disable the file layer entirely
    #[serde(default = "default_true")]
    pub log_to_file: bool,
    /// "compact" or "json"
    #[serde(default = "default_log_format")]
    pub format: String,
    /// Optional per-target log level overrides:
    /// [logging.targets]
    /// idstore_store = "debug"
    #[serde(default)]
    pub targets: HashMap<String, String>,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            logs_path: default_logs_path(),
            log_to_console: true,
            log_to_file: true,
            format: default_log_format(),
            targets: HashMap::new(),
        }
    }
}
