// Logging module, powered by tracing-subscriber
//
// Library crates log through the `log` facade; `tracing_log::LogTracer`
// forwards those records into the subscriber installed here.

use std::collections::HashMap;
use std::fs::{self, OpenOptions};
use std::path::Path;

use idstore_configs::LoggingSettings;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

/// Log format type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// Compact text format: timestamp LEVEL target - message
    Compact,
    /// JSON Lines format for structured logging
    Json,
}

impl LogFormat {
    pub fn parse(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "json" | "jsonl" => LogFormat::Json,
            _ => LogFormat::Compact,
        }
    }
}

/// Build the `EnvFilter` from the base level, noisy-crate overrides, and
/// per-target overrides from config.
fn build_env_filter(level: &str, target_levels: &HashMap<String, String>) -> anyhow::Result<EnvFilter> {
    let mut directives = vec![level.to_string()];

    // The AWS SDK and its HTTP stack are chatty at debug
    let noisy: &[(&str, &str)] = &[
        ("aws_config", "warn"),
        ("aws_smithy_runtime", "warn"),
        ("aws_smithy_runtime_api", "warn"),
        ("aws_sdk_dynamodb", "warn"),
        ("hyper", "warn"),
        ("hyper_util", "warn"),
        ("rustls", "warn"),
        ("tracing", "warn"),
    ];
    for (target, lvl) in noisy {
        directives.push(format!("{}={}", target, lvl));
    }

    for (target, lvl) in target_levels {
        directives.push(format!("{}={}", target, lvl));
    }

    let filter_str = directives.join(",");
    EnvFilter::try_new(&filter_str)
        .map_err(|e| anyhow::anyhow!("Invalid tracing filter '{}': {}", filter_str, e))
}

/// Initialize logging from the `[logging]` section.
///
/// Console output is plain text; the file (`<logs_path>/<file_name>`) is
/// compact text or JSON lines depending on `format`.
pub fn init_logging(settings: &LoggingSettings, file_name: &str) -> anyhow::Result<()> {
    let log_format = LogFormat::parse(&settings.format);

    tracing_log::LogTracer::init().ok(); // ok() in case already initialized

    let console_layer = if settings.log_to_console {
        Some(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(true)
                .with_filter(build_env_filter(&settings.level, &settings.targets)?),
        )
    } else {
        None
    };

    let file_path = Path::new(&settings.logs_path).join(file_name);
    let file_layer = if settings.log_to_file {
        fs::create_dir_all(&settings.logs_path)?;
        let log_file = OpenOptions::new().create(true).append(true).open(&file_path)?;

        let layer = if log_format == LogFormat::Json {
            tracing_subscriber::fmt::layer()
                .json()
                .with_writer(log_file)
                .with_target(true)
                .with_thread_names(true)
                .with_filter(build_env_filter(&settings.level, &settings.targets)?)
                .boxed()
        } else {
            tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_writer(log_file)
                .with_target(true)
                .with_thread_names(true)
                .with_filter(build_env_filter(&settings.level, &settings.targets)?)
                .boxed()
        };
        Some(layer)
    } else {
        None
    };

    tracing_subscriber::registry()
        .with(console_layer)
        .with(file_layer)
        .init();

    tracing::trace!(
        "Logging initialized: level={}, console={}, file={}",
        settings.level,
        settings.log_to_console,
        file_path.display()
    );

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_format_parse() {
        assert_eq!(LogFormat::parse("JSON"), LogFormat::Json);
        assert_eq!(LogFormat::parse("jsonl"), LogFormat::Json);
        assert_eq!(LogFormat::parse("compact"), LogFormat::Compact);
        assert_eq!(LogFormat::parse("anything"), LogFormat::Compact);
    }

    #[test]
    fn test_env_filter_accepts_target_overrides() {
        let mut targets = HashMap::new();
        targets.insert("idstore_store".to_string(), "debug".to_string());
        assert!(build_env_filter("info", &targets).is_ok());
    }
}
