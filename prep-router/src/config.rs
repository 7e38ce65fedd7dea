//! Router configuration
//!
//! All knobs can be overridden through environment variables:
//!
//! | Env var | Default | Meaning |
//! |---------|---------|---------|
//! | PRINTER_TIMEOUT_MS | 10000 | Per-printer send timeout |
//! | DISPATCH_TIMEOUT_MS | 30000 | Overall dispatch timeout |
//! | RECONCILE_INTERVAL_SECS | 30 | Assignment drift check interval |
//! | FALLBACK_PRINTER_ID | default_printer | Destination for unrouted items |
//! | PAPER_WIDTH | 48 | Ticket width in characters |
//! | PRINT_TIMEZONE | Europe/Madrid | Timezone for ticket timestamps |
//! | MARK_SENT_ON_FAILURE | true | Mark items sent even when printing failed |

use chrono_tz::Tz;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct RouterConfig {
    /// Timeout for a single printer send; expiry fails that printer
    /// only and never aborts sibling dispatches
    pub printer_timeout: Duration,
    /// Outer deadline for one dispatch call; expiry still reports the
    /// order as saved
    pub dispatch_timeout: Duration,
    /// How often the reconciler compares persisted vs in-memory state
    pub reconcile_interval: Duration,
    /// Well-known destination applied when resolution is empty
    pub fallback_printer_id: String,
    /// Ticket width in characters (32 for 58mm, 48 for 80mm paper)
    pub paper_width: usize,
    /// Timezone used for ticket date/time lines
    pub timezone: Tz,
    /// Whether attempted items are marked sent even when every printer
    /// failed. The source system always marked them ("the operation
    /// was logged"); this makes that trade-off an explicit choice.
    pub mark_sent_on_failure: bool,
}

impl RouterConfig {
    /// Load configuration from environment variables, with defaults
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary variable lookup; malformed values fall
    /// back to their defaults
    fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Self {
        Self {
            printer_timeout: Duration::from_millis(
                get("PRINTER_TIMEOUT_MS")
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(10_000),
            ),
            dispatch_timeout: Duration::from_millis(
                get("DISPATCH_TIMEOUT_MS")
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(30_000),
            ),
            reconcile_interval: Duration::from_secs(
                get("RECONCILE_INTERVAL_SECS")
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(30),
            ),
            fallback_printer_id: get("FALLBACK_PRINTER_ID")
                .unwrap_or_else(|| "default_printer".into()),
            paper_width: get("PAPER_WIDTH").and_then(|v| v.parse().ok()).unwrap_or(48),
            timezone: get("PRINT_TIMEZONE")
                .and_then(|v| v.parse().ok())
                .unwrap_or(chrono_tz::Europe::Madrid),
            mark_sent_on_failure: get("MARK_SENT_ON_FAILURE")
                .and_then(|v| v.parse().ok())
                .unwrap_or(true),
        }
    }
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self::from_env()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults() {
        // Empty lookup, independent of the process environment
        let config = RouterConfig::from_lookup(|_| None);
        assert_eq!(config.printer_timeout, Duration::from_secs(10));
        assert_eq!(config.dispatch_timeout, Duration::from_secs(30));
        assert_eq!(config.reconcile_interval, Duration::from_secs(30));
        assert_eq!(config.fallback_printer_id, "default_printer");
        assert_eq!(config.paper_width, 48);
        assert_eq!(config.timezone, chrono_tz::Europe::Madrid);
        assert!(config.mark_sent_on_failure);
    }

    #[test]
    fn test_overrides() {
        let vars: HashMap<&str, &str> = [
            ("PRINTER_TIMEOUT_MS", "2500"),
            ("FALLBACK_PRINTER_ID", "backup"),
            ("PAPER_WIDTH", "32"),
            ("PRINT_TIMEZONE", "America/New_York"),
            ("MARK_SENT_ON_FAILURE", "false"),
        ]
        .into_iter()
        .collect();

        let config = RouterConfig::from_lookup(|k| vars.get(k).map(|v| v.to_string()));
        assert_eq!(config.printer_timeout, Duration::from_millis(2500));
        assert_eq!(config.fallback_printer_id, "backup");
        assert_eq!(config.paper_width, 32);
        assert_eq!(config.timezone, chrono_tz::America::New_York);
        assert!(!config.mark_sent_on_failure);
        // Untouched knobs keep their defaults
        assert_eq!(config.dispatch_timeout, Duration::from_secs(30));
    }

    #[test]
    fn test_malformed_value_falls_back() {
        let config =
            RouterConfig::from_lookup(|k| (k == "PRINTER_TIMEOUT_MS").then(|| "soon".to_string()));
        assert_eq!(config.printer_timeout, Duration::from_secs(10));
    }
}
