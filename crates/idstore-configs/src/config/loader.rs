use super::types::IdentityConfig;
use std::fs;
use std::path::Path;

impl IdentityConfig {
    /// Load configuration from a TOML file and validate it.
    ///
    /// Environment overrides are applied separately via `apply_env_overrides()`.
    pub fn from_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let content = fs::read_to_string(path.as_ref())
            .map_err(|e| anyhow::anyhow!("Failed to read config file: {}", e))?;

        let config: IdentityConfig = toml::from_str(&content)
            .map_err(|e| anyhow::anyhow!("Failed to parse config file: {}", e))?;

        config.validate()?;

        Ok(config)
    }

    /// Apply `IDSTORE_*` environment variables on top of the file values.
    pub fn apply_env_overrides(&mut self) -> anyhow::Result<()> {
        self.apply_overrides_from(|key| std::env::var(key).ok())
    }

    /// Same as `apply_env_overrides` but reads variables through `lookup`.
    pub fn apply_overrides_from<F>(&mut self, lookup: F) -> anyhow::Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(level) = lookup("IDSTORE_LOG_LEVEL") {
            self.logging.level = level;
        }

        if let Some(val) = lookup("IDSTORE_LOG_TO_CONSOLE") {
            self.logging.log_to_console = parse_bool(&val);
        }

        if let Some(kind) = lookup("IDSTORE_BACKEND") {
            self.backend.kind = kind.to_lowercase();
        }

        if let Some(endpoint) = lookup("IDSTORE_DYNAMODB_ENDPOINT") {
            self.backend.endpoint_url = if endpoint.is_empty() { None } else { Some(endpoint) };
        }

        if let Some(region) = lookup("IDSTORE_DYNAMODB_REGION") {
            self.backend.region = region;
        }

        if let Some(name) = lookup("IDSTORE_USERS_TABLE") {
            self.tables.users = name;
        }

        if let Some(name) = lookup("IDSTORE_ROLES_TABLE") {
            self.tables.roles = name;
        }

        if let Some(name) = lookup("IDSTORE_ROLE_USERS_TABLE") {
            self.tables.role_memberships = name;
        }

        if let Some(raw) = lookup("IDSTORE_SCHEMA_MAX_WAIT_MS") {
            self.schema.max_wait_ms = raw
                .parse()
                .map_err(|_| anyhow::anyhow!("Invalid IDSTORE_SCHEMA_MAX_WAIT_MS value: {}", raw))?;
        }

        self.validate()
    }

    /// Validate configuration settings
    pub fn validate(&self) -> anyhow::Result<()> {
        let valid_levels = ["error", "warn", "info", "debug", "trace"];
        if !valid_levels.contains(&self.logging.level.as_str()) {
            return Err(anyhow::anyhow!(
                "Invalid log level '{}'. Must be one of: {}",
                self.logging.level,
                valid_levels.join(", ")
            ));
        }

        let valid_formats = ["compact", "json", "jsonl"];
        if !valid_formats.contains(&self.logging.format.to_lowercase().as_str()) {
            return Err(anyhow::anyhow!(
                "Invalid log format '{}'. Must be one of: {}",
                self.logging.format,
                valid_formats.join(", ")
            ));
        }

        let valid_backends = ["memory", "dynamodb"];
        if !valid_backends.contains(&self.backend.kind.as_str()) {
            return Err(anyhow::anyhow!(
                "Invalid backend '{}'. Must be one of: {}",
                self.backend.kind,
                valid_backends.join(", ")
            ));
        }

        let names = [
            ("tables.users", &self.tables.users),
            ("tables.roles", &self.tables.roles),
            ("tables.role_memberships", &self.tables.role_memberships),
        ];
        for (field, name) in names {
            if name.len() < 3 || name.len() > 255 {
                return Err(anyhow::anyhow!(
                    "{} must be between 3 and 255 characters, got '{}'",
                    field,
                    name
                ));
            }
        }
        if self.tables.users == self.tables.roles
            || self.tables.users == self.tables.role_memberships
            || self.tables.roles == self.tables.role_memberships
        {
            return Err(anyhow::anyhow!("Identity table names must be distinct"));
        }

        if self.schema.poll_interval_ms == 0 {
            return Err(anyhow::anyhow!("schema.poll_interval_ms must be greater than 0"));
        }
        if self.schema.max_wait_ms < self.schema.poll_interval_ms {
            return Err(anyhow::anyhow!(
                "schema.max_wait_ms ({}) must be at least schema.poll_interval_ms ({})",
                self.schema.max_wait_ms,
                self.schema.poll_interval_ms
            ));
        }
        if self.schema.read_capacity_units <= 0 || self.schema.write_capacity_units <= 0 {
            return Err(anyhow::anyhow!("Provisioned capacity units must be positive"));
        }

        if self.backend.kind == "dynamodb" && self.backend.region.is_empty() {
            log::warn!("DynamoDB backend selected without a region; SDK defaults will apply");
        }

        Ok(())
    }
}

fn parse_bool(val: &str) -> bool {
    matches!(val.to_lowercase().as_str(), "true" | "1" | "yes")
}
