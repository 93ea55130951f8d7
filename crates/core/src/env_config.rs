//! Environment variable parsing with warn-level logging for invalid values.

use std::time::Duration;

/// Parse an environment variable with a default fallback.
///
/// - If the variable is not set: returns `default` silently (expected case).
/// - If the variable is set but cannot be parsed: logs a warning and returns `default`.
pub fn env_parse_with_default<T: std::str::FromStr + std::fmt::Display>(
    var: &str,
    default: T,
) -> T {
    match std::env::var(var) {
        Ok(v) => match v.trim().parse() {
            Ok(n) => n,
            Err(_) => {
                tracing::warn!(
                    var,
                    value = %v,
                    default = %default,
                    "invalid env var value, using default"
                );
                default
            },
        },
        Err(_) => default,
    }
}

/// Read a string variable, treating an empty or whitespace-only value as unset.
#[must_use]
pub fn env_non_empty(var: &str) -> Option<String> {
    std::env::var(var).ok().map(|v| v.trim().to_owned()).filter(|v| !v.is_empty())
}

/// Read a duration expressed in milliseconds.
#[must_use]
pub fn env_duration_ms(var: &str, default_ms: u64) -> Duration {
    Duration::from_millis(env_parse_with_default(var, default_ms))
}

/// Read a duration expressed in whole seconds.
#[must_use]
pub fn env_duration_secs(var: &str, default_secs: u64) -> Duration {
    Duration::from_secs(env_parse_with_default(var, default_secs))
}
