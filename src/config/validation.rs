use crate::config::parser::parse_time;
use crate::config::types::{
    Config, ConfigValue, CrawlerConfig, RawConfig, StorageConfig, DEFAULT_REQUEST_TIMEOUT,
    DEFAULT_TARGETS_CAP,
};

/// Turns a raw configuration into a usable one
///
/// Malformed values never fail startup: each is reported with a warning and
/// replaced by its default.
pub fn sanitize(raw: RawConfig) -> Config {
    let defaults = CrawlerConfig::default();

    let crawler = CrawlerConfig {
        request_timeout: sanitize_timeout(raw.request_timeout.as_ref()),
        targets_cap: sanitize_targets_cap(raw.targets_cap.as_ref()),
        unsafe_mode: raw.unsafe_mode.unwrap_or(defaults.unsafe_mode),
        generate_random_targets: raw
            .generate_random_targets
            .unwrap_or(defaults.generate_random_targets),
        log_to_console: raw.log_to_console.unwrap_or(defaults.log_to_console),
    };

    let storage = match raw.storage.database_path {
        Some(path) if !path.trim().is_empty() => StorageConfig {
            database_path: path,
        },
        Some(_) => {
            tracing::warn!("Invalid database-path: cannot be empty, using default");
            StorageConfig::default()
        }
        None => StorageConfig::default(),
    };

    Config { crawler, storage }
}

/// Validates the request timeout
fn sanitize_timeout(value: Option<&ConfigValue>) -> u64 {
    let parsed = match value {
        None => return DEFAULT_REQUEST_TIMEOUT,
        Some(ConfigValue::Int(ms)) => u64::try_from(*ms).ok(),
        Some(ConfigValue::Text(text)) => parse_time(text),
    };

    match parsed {
        Some(ms) if ms > 0 => ms,
        _ => {
            tracing::warn!(
                "Invalid request-timeout {:?}, using default of {}ms",
                value,
                DEFAULT_REQUEST_TIMEOUT
            );
            DEFAULT_REQUEST_TIMEOUT
        }
    }
}

/// Validates the frontier cap
fn sanitize_targets_cap(value: Option<&ConfigValue>) -> usize {
    let parsed = match value {
        None => return DEFAULT_TARGETS_CAP,
        Some(ConfigValue::Int(cap)) => usize::try_from(*cap).ok(),
        Some(ConfigValue::Text(text)) => text.trim().parse::<usize>().ok(),
    };

    match parsed {
        Some(cap) if cap >= 1 => cap,
        _ => {
            tracing::warn!(
                "Invalid targets-cap {:?}, using default of {}",
                value,
                DEFAULT_TARGETS_CAP
            );
            DEFAULT_TARGETS_CAP
        }
    }
}
