//! Price aggregation
//!
//! Resolves a token's USD/native price from two independent evidence
//! sources: a curated oracle-feed registry and on-chain exchange
//! reserves. Either source may fail without affecting the other; total
//! failure yields a zero price with zero confidence, never an error.

pub mod registry;

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::providers::{DexQuoteProvider, PriceFeedProvider};

/// Coarse bucket for how much capital backs a token's market
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LiquidityClass {
    VeryLow,
    Low,
    Medium,
    High,
    /// Used for tokens whose normalization errored before any market read
    Unknown,
}

impl std::fmt::Display for LiquidityClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LiquidityClass::VeryLow => write!(f, "very-low"),
            LiquidityClass::Low => write!(f, "low"),
            LiquidityClass::Medium => write!(f, "medium"),
            LiquidityClass::High => write!(f, "high"),
            LiquidityClass::Unknown => write!(f, "unknown"),
        }
    }
}

impl LiquidityClass {
    /// Threshold-exact classification over liquidity in USD
    pub fn classify(liquidity_usd: f64) -> Self {
        if liquidity_usd > 1_000_000.0 {
            LiquidityClass::High
        } else if liquidity_usd > 100_000.0 {
            LiquidityClass::Medium
        } else if liquidity_usd > 10_000.0 {
            LiquidityClass::Low
        } else {
            LiquidityClass::VeryLow
        }
    }

    pub fn is_thin(&self) -> bool {
        matches!(self, LiquidityClass::Low | LiquidityClass::VeryLow)
    }
}

/// Aggregated price evidence for one token
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenPrice {
    pub price_usd: f64,
    pub price_eth: f64,
    pub liquidity_usd: f64,
    /// Estimated impact of a 1%-of-reserves trade, in [0, 0.10]
    pub price_impact: f64,
    /// Which evidence sources contributed ("oracle", "dex")
    pub sources: Vec<String>,
    /// Additive evidence confidence, capped at 100
    pub confidence: u8,
}

impl TokenPrice {
    fn empty() -> Self {
        Self {
            price_usd: 0.0,
            price_eth: 0.0,
            liquidity_usd: 0.0,
            price_impact: MAX_PRICE_IMPACT,
            sources: Vec::new(),
            confidence: 0,
        }
    }
}

/// Cap on the price impact estimate
const MAX_PRICE_IMPACT: f64 = 0.10;

/// Impact of a fixed 1%-of-reserves trade when reserves are observed
const RESERVE_TRADE_IMPACT: f64 = 0.01;

pub struct PriceAggregator {
    feeds: Arc<dyn PriceFeedProvider>,
    dex: Arc<dyn DexQuoteProvider>,
}

impl PriceAggregator {
    pub fn new(feeds: Arc<dyn PriceFeedProvider>, dex: Arc<dyn DexQuoteProvider>) -> Self {
        Self { feeds, dex }
    }

    /// Resolve a token's price at a block. The only error this returns is
    /// cancellation; source failures degrade the result instead.
    pub async fn quote(
        &self,
        token_address: &str,
        chain_id: u64,
        block_number: u64,
        cancel: &CancellationToken,
    ) -> Result<TokenPrice> {
        if cancel.is_cancelled() {
            return Err(Error::Cancelled("price aggregation".to_string()));
        }

        let Some(reg) = registry::for_chain(chain_id) else {
            warn!(chain_id, "no pricing registry for chain");
            return Ok(TokenPrice::empty());
        };

        // Native price first: the dex leg and the ETH conversion need it
        let native_usd = match self.feeds.latest_price(reg.native_feed, block_number).await {
            Ok(p) if p > 0.0 => Some(p),
            Ok(p) => {
                warn!(price = p, "native feed returned a non-positive price");
                None
            }
            Err(e) => {
                warn!(error = %e, "native price feed unavailable");
                None
            }
        };

        if cancel.is_cancelled() {
            return Err(Error::Cancelled("price aggregation".to_string()));
        }

        // Source 1: curated oracle feed, allow-listed tokens only
        let oracle_usd = match registry::feed_for(chain_id, token_address) {
            Some(feed_id) => match self.feeds.latest_price(feed_id, block_number).await {
                Ok(p) if p > 0.0 => Some(p),
                Ok(_) => None,
                Err(e) => {
                    warn!(feed_id, error = %e, "oracle feed read failed");
                    None
                }
            },
            None => None,
        };

        if cancel.is_cancelled() {
            return Err(Error::Cancelled("price aggregation".to_string()));
        }

        // Source 2: exchange reserves against the wrapped-native pair
        let dex_leg = self
            .dex_implied_price(token_address, reg.wrapped_native, native_usd, block_number)
            .await;

        let mut sources = Vec::new();
        let mut confidence: u32 = 0;

        if oracle_usd.is_some() {
            sources.push("oracle".to_string());
            confidence += 40;
        }
        let (dex_usd, liquidity_usd) = match dex_leg {
            Some((price, liq)) => {
                sources.push("dex".to_string());
                confidence += 30;
                (Some(price), liq)
            }
            None => (None, 0.0),
        };

        if native_usd.is_some() {
            confidence += 20;
        }
        if liquidity_usd > 1_000_000.0 {
            confidence += 10;
        }
        if oracle_usd.is_some() && dex_usd.is_some() {
            confidence += 10;
        }
        let confidence = confidence.min(100) as u8;

        let price_usd = match (oracle_usd, dex_usd) {
            (Some(o), Some(d)) => (o + d) / 2.0,
            (Some(o), None) => o,
            (None, Some(d)) => d,
            (None, None) => {
                debug!(token = %token_address, "no price evidence from any source");
                return Ok(TokenPrice::empty());
            }
        };

        let price_eth = match native_usd {
            Some(n) if n > 0.0 => price_usd / n,
            _ => 0.0,
        };

        let price_impact = if liquidity_usd > 0.0 {
            RESERVE_TRADE_IMPACT.min(MAX_PRICE_IMPACT)
        } else {
            MAX_PRICE_IMPACT
        };

        debug!(
            token = %token_address,
            price_usd,
            liquidity_usd,
            confidence,
            sources = ?sources,
            "price aggregated"
        );

        Ok(TokenPrice {
            price_usd,
            price_eth,
            liquidity_usd,
            price_impact,
            sources,
            confidence,
        })
    }

    /// USD price of the chain's native asset from its curated feed.
    /// None when the chain is unknown or the feed is unreachable.
    pub async fn native_price_usd(&self, chain_id: u64, block_number: u64) -> Option<f64> {
        let reg = registry::for_chain(chain_id)?;
        match self.feeds.latest_price(reg.native_feed, block_number).await {
            Ok(p) if p > 0.0 => Some(p),
            Ok(_) => None,
            Err(e) => {
                warn!(error = %e, "native price feed unavailable");
                None
            }
        }
    }

    /// Implied USD price and USD liquidity from the token/wrapped-native
    /// pair. Needs the native USD price to convert; returns None when any
    /// read fails.
    async fn dex_implied_price(
        &self,
        token: &str,
        wrapped_native: &str,
        native_usd: Option<f64>,
        block_number: u64,
    ) -> Option<(f64, f64)> {
        let native_usd = native_usd?;

        let (_token_reserve, native_reserve) = match self
            .dex
            .pair_reserves(token, wrapped_native, block_number)
            .await
        {
            Ok(r) => r,
            Err(e) => {
                warn!(token = %token, error = %e, "pair reserve read failed");
                return None;
            }
        };

        // Unit-amount constant-product quote gives the implied native price
        let native_out = match self.dex.quote(token, wrapped_native, 1.0, block_number).await {
            Ok(q) if q > 0.0 => q,
            Ok(_) => return None,
            Err(e) => {
                warn!(token = %token, error = %e, "dex quote failed");
                return None;
            }
        };

        let price_usd = native_out * native_usd;
        let liquidity_usd = native_reserve * native_usd * 2.0;
        Some((price_usd, liquidity_usd))
    }
}
