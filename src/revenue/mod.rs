//! Revenue normalization
//!
//! Converts extracted token amounts into USD/native values, nets out gas,
//! and computes a composite risk level. Per-token failures are isolated:
//! one token's error never affects another's result or aborts the batch.

use std::sync::Arc;

use futures::stream::{self, StreamExt, TryStreamExt};
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::harness::{ExecutionResult, ExtractedToken};
use crate::pipeline::AnalysisConfig;
use crate::price::{LiquidityClass, PriceAggregator};
use crate::providers::TokenMetadataProvider;

/// Composite risk vocabulary
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
    VeryHigh,
}

impl std::fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RiskLevel::Low => write!(f, "low"),
            RiskLevel::Medium => write!(f, "medium"),
            RiskLevel::High => write!(f, "high"),
            RiskLevel::VeryHigh => write!(f, "very-high"),
        }
    }
}

impl RiskLevel {
    pub fn from_score(score: u32) -> Self {
        if score >= 8 {
            RiskLevel::VeryHigh
        } else if score >= 5 {
            RiskLevel::High
        } else if score >= 2 {
            RiskLevel::Medium
        } else {
            RiskLevel::Low
        }
    }
}

/// One extracted token after valuation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NormalizedToken {
    pub address: String,
    pub symbol: Option<String>,
    pub decimals: Option<u8>,
    /// Decimal amount after scaling the raw integer string
    pub amount: f64,
    pub price_usd: f64,
    pub price_eth: f64,
    pub value_usd: f64,
    pub value_eth: f64,
    pub liquidity: LiquidityClass,
    pub price_impact: f64,
    pub sources: Vec<String>,
    pub confidence: u8,
    pub error: Option<String>,
}

impl NormalizedToken {
    /// Zero-valued record for a token whose normalization failed
    fn errored(token: &ExtractedToken, error: impl Into<String>) -> Self {
        Self {
            address: token.address.clone(),
            symbol: token.symbol.clone(),
            decimals: token.decimals,
            amount: 0.0,
            price_usd: 0.0,
            price_eth: 0.0,
            value_usd: 0.0,
            value_eth: 0.0,
            liquidity: LiquidityClass::Unknown,
            price_impact: 0.0,
            sources: Vec::new(),
            confidence: 0,
            error: Some(error.into()),
        }
    }
}

/// Valuation of everything a successful execution extracted
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RevenueReport {
    pub tokens: Vec<NormalizedToken>,
    pub total_value_usd: f64,
    pub total_value_eth: f64,
    pub gas_cost_usd: f64,
    pub gas_cost_eth: f64,
    /// True when gas inputs were absent and cost defaulted to zero
    pub gas_estimated: bool,
    pub net_profit_usd: f64,
    pub is_profitable: bool,
    /// net / total when total > 0, else 0
    pub profitability_ratio: f64,
    pub risk_score: u32,
    pub risk: RiskLevel,
}

pub struct RevenueNormalizer {
    aggregator: Arc<PriceAggregator>,
    metadata: Arc<dyn TokenMetadataProvider>,
}

impl RevenueNormalizer {
    pub fn new(aggregator: Arc<PriceAggregator>, metadata: Arc<dyn TokenMetadataProvider>) -> Self {
        Self { aggregator, metadata }
    }

    /// Value an execution's extracted tokens and net out gas. The only
    /// error this returns is cancellation; per-token failures are recorded
    /// on the token and absorbed.
    pub async fn normalize(
        &self,
        execution: &ExecutionResult,
        chain_id: u64,
        block_number: u64,
        config: &AnalysisConfig,
        cancel: &CancellationToken,
    ) -> Result<RevenueReport> {
        let concurrency = config.token_concurrency.max(1);

        // buffered() preserves input order, so token results line up with
        // the extraction list
        let token_futures: Vec<_> = execution
            .extracted_tokens
            .iter()
            .map(|t| self.normalize_one(t, chain_id, block_number, cancel))
            .collect();
        let tokens: Vec<NormalizedToken> = stream::iter(token_futures)
            .buffered(concurrency)
            .try_collect()
            .await?;

        let total_value_usd: f64 = tokens.iter().map(|t| t.value_usd).sum();
        let total_value_eth: f64 = tokens.iter().map(|t| t.value_eth).sum();

        let native_usd = self.aggregator.native_price_usd(chain_id, block_number).await;
        let (gas_cost_eth, gas_cost_usd, gas_estimated) =
            gas_cost(execution.gas_used, config.gas_price_native, native_usd);

        let net_profit_usd = total_value_usd - gas_cost_usd;
        let is_profitable = net_profit_usd > 0.0;
        let profitability_ratio = if total_value_usd > 0.0 {
            net_profit_usd / total_value_usd
        } else {
            0.0
        };

        let risk_score = risk_score(&tokens, net_profit_usd);
        let risk = RiskLevel::from_score(risk_score);

        debug!(
            tokens = tokens.len(),
            total_value_usd,
            net_profit_usd,
            risk_score,
            risk = %risk,
            "revenue normalized"
        );

        Ok(RevenueReport {
            tokens,
            total_value_usd,
            total_value_eth,
            gas_cost_usd,
            gas_cost_eth,
            gas_estimated,
            net_profit_usd,
            is_profitable,
            profitability_ratio,
            risk_score,
            risk,
        })
    }

    async fn normalize_one(
        &self,
        token: &ExtractedToken,
        chain_id: u64,
        block_number: u64,
        cancel: &CancellationToken,
    ) -> Result<NormalizedToken> {
        if cancel.is_cancelled() {
            return Err(Error::Cancelled("revenue normalization".to_string()));
        }

        // Resolve missing metadata from chain state; a failure here only
        // fails this token
        let (symbol, decimals) = match (token.symbol.clone(), token.decimals) {
            (Some(s), Some(d)) => (s, d),
            _ => match self.metadata.metadata(&token.address, chain_id, block_number).await {
                Ok(meta) => (meta.symbol, meta.decimals),
                Err(e) => {
                    warn!(token = %token.address, error = %e, "metadata resolution failed");
                    return Ok(NormalizedToken::errored(token, e.to_string()));
                }
            },
        };

        let amount = match scale_raw_amount(&token.raw_amount, decimals) {
            Ok(a) => a,
            Err(e) => {
                warn!(token = %token.address, error = %e, "raw amount not parseable");
                return Ok(NormalizedToken::errored(token, e.to_string()));
            }
        };

        let price = self
            .aggregator
            .quote(&token.address, chain_id, block_number, cancel)
            .await?;

        Ok(NormalizedToken {
            address: token.address.clone(),
            symbol: Some(symbol),
            decimals: Some(decimals),
            amount,
            price_usd: price.price_usd,
            price_eth: price.price_eth,
            value_usd: amount * price.price_usd,
            value_eth: amount * price.price_eth,
            liquidity: LiquidityClass::classify(price.liquidity_usd),
            price_impact: price.price_impact,
            sources: price.sources,
            confidence: price.confidence,
            error: None,
        })
    }
}

/// Scale an integer string by the token's decimals
fn scale_raw_amount(raw: &str, decimals: u8) -> Result<f64> {
    let units: u128 = raw
        .trim()
        .parse()
        .map_err(|_| Error::TokenMetadata(format!("raw amount not an integer: {raw}")))?;
    Ok(units as f64 / 10f64.powi(decimals as i32))
}

fn gas_cost(gas_used: u64, gas_price_native: Option<f64>, native_usd: Option<f64>) -> (f64, f64, bool) {
    match gas_price_native {
        Some(price) if gas_used > 0 => {
            let eth = gas_used as f64 * price;
            let usd = eth * native_usd.unwrap_or(0.0);
            (eth, usd, native_usd.is_none())
        }
        _ => (0.0, 0.0, true),
    }
}

/// Composite risk score over the normalized token set
fn risk_score(tokens: &[NormalizedToken], net_profit_usd: f64) -> u32 {
    let thin = tokens.iter().filter(|t| t.liquidity.is_thin()).count() as u32;
    let impacted = tokens.iter().filter(|t| t.price_impact > 0.05).count() as u32;
    let errored = tokens.iter().filter(|t| t.error.is_some()).count() as u32;

    let mut score = 2 * thin + 3 * impacted + 4 * errored;
    if net_profit_usd < 1_000.0 {
        score += 2;
    }
    if net_profit_usd < 100.0 {
        score += 3;
    }
    score
}
