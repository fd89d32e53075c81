//! Core configuration
//!
//! Every tunable the services take: retry bounds, the statement timeout,
//! the overdraw policy, the USD fallback rate, and the filing template and
//! output paths. Passed as a struct at construction; there is no global
//! state.

use rust_decimal::Decimal;
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

use domain_compliance::AggregateScope;

/// Configuration for the exchange core services
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CoreConfig {
    /// Bound on sequence-allocator insert-race retries
    pub allocator_retry_bound: u32,
    /// Bound on whole-transaction retries for transient conflicts
    pub execute_retry_bound: u32,
    /// Per-transaction statement timeout in milliseconds
    pub statement_timeout_ms: u64,
    /// Whether balances may go negative at commit
    pub allow_overdraw: bool,
    /// USD reference rate used when USD is unpriced for the day
    pub usd_fallback_rate: Decimal,
    /// USD-equivalent floor for BOT Provider events
    pub provider_threshold_usd: Decimal,
    /// Window in which a re-submitted reservation is treated as the same one
    pub reservation_dedup_secs: u64,
    /// Directory holding the AMLO form templates
    pub amlo_template_dir: PathBuf,
    /// The BOT workbook template file
    pub bot_template_path: PathBuf,
    /// Root under which `amlo_pdfs/` and `bot_reports/` are written
    pub output_root: PathBuf,
    /// Default scope for cumulative customer aggregates
    pub aggregate_scope: AggregateScope,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            allocator_retry_bound: 5,
            execute_retry_bound: 3,
            statement_timeout_ms: 5_000,
            allow_overdraw: false,
            usd_fallback_rate: Decimal::new(35, 0),
            provider_threshold_usd: Decimal::new(20_000, 0),
            reservation_dedup_secs: 10,
            amlo_template_dir: PathBuf::from("templates/amlo"),
            bot_template_path: PathBuf::from("templates/bot_monthly.xlsx"),
            output_root: PathBuf::from("."),
            aggregate_scope: AggregateScope::CrossBranch,
        }
    }
}

impl CoreConfig {
    /// Loads configuration from `FX_*` environment variables
    pub fn from_env() -> Result<Self, config::ConfigError> {
        config::Config::builder()
            .add_source(config::Environment::with_prefix("FX"))
            .build()?
            .try_deserialize()
    }

    /// The statement timeout as a duration
    pub fn statement_timeout(&self) -> Duration {
        Duration::from_millis(self.statement_timeout_ms)
    }

    /// Where AMLO PDFs are written
    pub fn amlo_output_dir(&self) -> PathBuf {
        self.output_root.join("amlo_pdfs")
    }

    /// Where BOT workbooks are written
    pub fn bot_output_root(&self) -> PathBuf {
        self.output_root.join("bot_reports")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_defaults() {
        let config = CoreConfig::default();
        assert_eq!(config.allocator_retry_bound, 5);
        assert_eq!(config.statement_timeout(), Duration::from_secs(5));
        assert!(!config.allow_overdraw);
        assert_eq!(config.usd_fallback_rate, dec!(35));
        assert_eq!(config.provider_threshold_usd, dec!(20000));
        assert!(config.amlo_output_dir().ends_with("amlo_pdfs"));
    }
}
