use crate::config::types::{Config, RawConfig};
use crate::config::validation::sanitize;
use crate::ConfigError;
use std::path::Path;

/// Loads and parses a configuration file from the given path
///
/// A missing file is not an error: the crawler starts with defaults and a
/// warning is logged. Malformed individual values are replaced by their
/// defaults during sanitization.
///
/// # Arguments
///
/// * `path` - Path to the TOML configuration file
///
/// # Returns
///
/// * `Ok(Config)` - Successfully loaded and sanitized configuration
/// * `Err(ConfigError)` - The file could not be read or is not valid TOML
///
/// # Example
///
/// ```no_run
/// use std::path::Path;
/// use knot_crawler::config::load_config;
///
/// let config = load_config(Path::new("config/crawler.toml")).unwrap();
/// println!("Timeout: {}ms", config.crawler.request_timeout);
/// ```
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    if !path.exists() {
        tracing::warn!(
            "Config file {} not found, using defaults",
            path.display()
        );
        return Ok(sanitize(RawConfig::default()));
    }

    let content = std::fs::read_to_string(path)?;
    parse_config(&content)
}

/// Parses configuration from TOML text
pub fn parse_config(content: &str) -> Result<Config, ConfigError> {
    let raw: RawConfig = toml::from_str(content)?;
    Ok(sanitize(raw))
}

/// Converts a time string to milliseconds
///
/// Accepted inputs: plain digits (milliseconds), `\d+ms`, `\d+s`, `\d+m`,
/// `\d+h` and `\d+d`.
///
/// # Examples
///
/// ```
/// use knot_crawler::config::parse_time;
///
/// assert_eq!(parse_time("1000ms"), Some(1000));
/// assert_eq!(parse_time("2m"), Some(120_000));
/// assert_eq!(parse_time("soon"), None);
/// ```
pub fn parse_time(value: &str) -> Option<u64> {
    let value = value.trim();
    let split = value
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(value.len());
    let (digits, unit) = value.split_at(split);

    if digits.is_empty() {
        return None;
    }
    let number: u64 = digits.parse().ok()?;

    let factor = match unit {
        "" | "ms" => 1,
        "s" => 1000,
        "m" => 60 * 1000,
        "h" => 60 * 60 * 1000,
        "d" => 24 * 60 * 60 * 1000,
        _ => return None,
    };

    number.checked_mul(factor)
}
