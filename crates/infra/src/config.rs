//! Engine configuration from environment variables.

use std::env;
use std::str::FromStr;

use flockerp_stock::LedgerDefaults;

/// Tunables of the workflow engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    /// Leading part of invoice numbers (`PREFIX-YYYY/MM/DD-NNNN`).
    pub invoice_prefix: String,
    /// Days between invoice date and due date.
    pub invoice_due_days: u32,
    /// Threshold for ledger entries opened by their first credit.
    pub default_minimum_threshold: i64,
    /// Chickens per container for ledger entries opened by their first credit.
    pub default_units_per_container: i64,
    /// Reload-and-retry budget when a commit loses an optimistic race.
    pub max_conflict_retries: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            invoice_prefix: "INVOICE".to_string(),
            invoice_due_days: 30,
            default_minimum_threshold: 100,
            default_units_per_container: 100,
            max_conflict_retries: 16,
        }
    }
}

impl EngineConfig {
    /// Create configuration from environment variables.
    ///
    /// # Environment Variables
    ///
    /// - `FLOCKERP_INVOICE_PREFIX` (default: INVOICE)
    /// - `FLOCKERP_INVOICE_DUE_DAYS` (default: 30)
    /// - `FLOCKERP_DEFAULT_MINIMUM_THRESHOLD` (default: 100)
    /// - `FLOCKERP_DEFAULT_UNITS_PER_CONTAINER` (default: 100)
    /// - `FLOCKERP_MAX_CONFLICT_RETRIES` (default: 16)
    ///
    /// Malformed values are logged and replaced by the default.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let prefix = lookup("FLOCKERP_INVOICE_PREFIX")
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .unwrap_or(defaults.invoice_prefix);

        Self {
            invoice_prefix: prefix,
            invoice_due_days: parse_or(
                &lookup,
                "FLOCKERP_INVOICE_DUE_DAYS",
                defaults.invoice_due_days,
                |_| true,
            ),
            default_minimum_threshold: parse_or(
                &lookup,
                "FLOCKERP_DEFAULT_MINIMUM_THRESHOLD",
                defaults.default_minimum_threshold,
                |v| *v >= 0,
            ),
            default_units_per_container: parse_or(
                &lookup,
                "FLOCKERP_DEFAULT_UNITS_PER_CONTAINER",
                defaults.default_units_per_container,
                |v| *v > 0,
            ),
            max_conflict_retries: parse_or(
                &lookup,
                "FLOCKERP_MAX_CONFLICT_RETRIES",
                defaults.max_conflict_retries,
                |_| true,
            ),
        }
    }

    pub fn ledger_defaults(&self) -> LedgerDefaults {
        LedgerDefaults {
            minimum_threshold: self.default_minimum_threshold,
            units_per_container: self.default_units_per_container,
        }
    }
}

fn parse_or<T>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: T,
    valid: impl Fn(&T) -> bool,
) -> T
where
    T: FromStr + Copy + std::fmt::Display,
{
    let Some(raw) = lookup(key) else {
        return default;
    };
    match raw.trim().parse::<T>() {
        Ok(value) if valid(&value) => value,
        _ => {
            tracing::warn!(key, value = %raw, %default, "ignoring malformed configuration value");
            default
        }
    }
}
