use idstore_commons::{DEFAULT_ROLES_TABLE, DEFAULT_ROLE_USERS_TABLE, DEFAULT_USERS_TABLE};

// Default value functions
pub fn default_true() -> bool {
    true
}

pub fn default_users_table() -> String {
    DEFAULT_USERS_TABLE.to_string()
}

pub fn default_roles_table() -> String {
    DEFAULT_ROLES_TABLE.to_string()
}

pub fn default_role_users_table() -> String {
    DEFAULT_ROLE_USERS_TABLE.to_string()
}

pub fn default_backend_kind() -> String {
    "memory".to_string()
}

pub fn default_region() -> String {
    "us-east-1".to_string()
}

pub fn default_poll_interval_ms() -> u64 {
    5_000
}

pub fn default_max_wait_ms() -> u64 {
    600_000 // 10 minutes
}

pub fn default_read_capacity_units() -> i64 {
    5
}

pub fn default_write_capacity_units() -> i64 {
    5
}

pub fn default_log_level() -> String {
    "info".to_string()
}

pub fn default_logs_path() -> String {
    "./logs".to_string()
}

pub fn default_log_format() -> String {
    "compact".to_string()
}
