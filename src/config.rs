//! Configuration loading and validation

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

/// Main configuration structure
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub harness: HarnessConfig,
    #[serde(default)]
    pub analysis: AnalysisDefaults,
    #[serde(default)]
    pub notify: NotifyConfig,
}

/// Execution environment selection
#[derive(Debug, Clone, Default, Deserialize)]
pub struct HarnessConfig {
    /// Fork provider endpoint. Reserved: accepted and surfaced by
    /// `config`, but until a sandbox runtime implementation is wired
    /// every execution takes the statistical simulator path.
    #[serde(default)]
    pub fork_endpoint: Option<String>,
    /// Seed for the simulated harness; absent means entropy
    #[serde(default)]
    pub simulator_seed: Option<u64>,
}

/// Defaults applied to each new session's analysis settings
#[derive(Debug, Clone, Deserialize)]
pub struct AnalysisDefaults {
    /// Gas price in native units per gas (e.g. 30 gwei = 30e-9)
    #[serde(default)]
    pub gas_price_native: Option<f64>,
    #[serde(default = "default_token_concurrency")]
    pub token_concurrency: usize,
}

fn default_token_concurrency() -> usize {
    4
}

impl Default for AnalysisDefaults {
    fn default() -> Self {
        Self {
            gas_price_native: None,
            token_concurrency: default_token_concurrency(),
        }
    }
}

/// Outbound notification settings
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NotifyConfig {
    /// Webhook endpoint for pipeline events; absent means log-only
    #[serde(default)]
    pub webhook_url: Option<String>,
}

impl Config {
    /// Load configuration from a TOML file with environment overrides
    /// (prefix CHAINPROBE, e.g. CHAINPROBE__NOTIFY__WEBHOOK_URL)
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        let settings = config::Config::builder()
            .add_source(config::File::from(path).required(false))
            .add_source(
                config::Environment::with_prefix("CHAINPROBE")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .context("Failed to build configuration")?;

        let config: Config = settings
            .try_deserialize()
            .context("Failed to deserialize configuration")?;

        config.validate()?;

        Ok(config)
    }

    /// Validate configuration values
    fn validate(&self) -> Result<()> {
        if self.analysis.token_concurrency == 0 {
            anyhow::bail!("token_concurrency must be at least 1");
        }

        if let Some(price) = self.analysis.gas_price_native {
            if price <= 0.0 {
                anyhow::bail!("gas_price_native must be positive when set");
            }
        }

        if let Some(url) = &self.notify.webhook_url {
            if url.trim().is_empty() {
                anyhow::bail!("webhook_url must not be empty when set");
            }
        }

        Ok(())
    }

    /// Analysis settings for a new session
    pub fn analysis_config(&self) -> crate::pipeline::AnalysisConfig {
        crate::pipeline::AnalysisConfig {
            gas_price_native: self.analysis.gas_price_native,
            token_concurrency: self.analysis.token_concurrency,
            simulator_seed: self.harness.simulator_seed,
        }
    }
}
