//! Service configuration

use anyhow::Result;
use serde::Deserialize;

/// Optimizer service configuration
#[derive(Debug, Clone, Deserialize)]
pub struct OptimizerConfig {
    /// Instance name used in structured log events
    #[serde(default = "default_instance_name")]
    pub instance_name: String,

    /// API server port
    #[serde(default = "default_api_port")]
    pub api_port: u16,

    /// Lookback window for the utilization heuristics, in days
    #[serde(default = "default_lookback_days")]
    pub lookback_days: i64,

    /// Currency stamped on savings estimates
    #[serde(default = "default_currency")]
    pub currency: String,
}

fn default_instance_name() -> String {
    std::env::var("HOSTNAME").unwrap_or_else(|_| "optimizer".to_string())
}

fn default_api_port() -> u16 {
    8080
}

fn default_lookback_days() -> i64 {
    7
}

fn default_currency() -> String {
    "USD".to_string()
}

impl OptimizerConfig {
    /// Load configuration from OPTIMIZER_-prefixed environment variables
    pub fn load() -> Result<Self> {
        let config = config::Config::builder()
            .add_source(config::Environment::with_prefix("OPTIMIZER"))
            .build()?;

        Ok(config.try_deserialize().unwrap_or_else(|_| OptimizerConfig {
            instance_name: default_instance_name(),
            api_port: default_api_port(),
            lookback_days: default_lookback_days(),
            currency: default_currency(),
        }))
    }
}
