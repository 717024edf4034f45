//! Per-chain pricing registries
//!
//! Process-wide read-only configuration: curated oracle-feed allow-lists,
//! wrapped-native assets, and well-known stablecoins, indexed by chain id.
//! Loaded once at startup; never mutated.

use lazy_static::lazy_static;
use std::collections::HashMap;

/// A well-known token with a curated oracle feed
#[derive(Debug, Clone, Copy)]
pub struct FeedEntry {
    pub token: &'static str,
    pub feed_id: &'static str,
}

/// A stablecoin-like token the simulator can synthesize extractions in
#[derive(Debug, Clone, Copy)]
pub struct StableToken {
    pub address: &'static str,
    pub symbol: &'static str,
    pub decimals: u8,
}

#[derive(Debug, Clone)]
pub struct ChainRegistry {
    pub chain_id: u64,
    pub wrapped_native: &'static str,
    /// Feed id for the native asset's USD price
    pub native_feed: &'static str,
    pub feeds: Vec<FeedEntry>,
    pub stables: Vec<StableToken>,
}

const WETH: &str = "0xc02aaa39b223fe8d0a0e5c4f27ead9083c756cc2";
const USDC: &str = "0xa0b86991c6218b36c1d19d4a2e9eb0ce3606eb48";
const USDT: &str = "0xdac17f958d2ee523a2206206994597c13d831ec7";
const DAI: &str = "0x6b175474e89094c44da98b954eedeac495271d0f";
const WBTC: &str = "0x2260fac5e5542a773aa44fbcfedf7c193bc2c599";

const WMATIC: &str = "0x0d500b1d8e8ef31e21c99d1db9a6444d3adf1270";
const USDC_POLYGON: &str = "0x2791bca1f2de4661ed88a30c99a7a9449aa84174";
const USDT_POLYGON: &str = "0xc2132d05d31c914a87c6611c10748aeb04b58e8f";

lazy_static! {
    static ref REGISTRIES: HashMap<u64, ChainRegistry> = {
        let mut m = HashMap::new();

        // Ethereum mainnet
        m.insert(
            1,
            ChainRegistry {
                chain_id: 1,
                wrapped_native: WETH,
                native_feed: "eth-usd",
                feeds: vec![
                    FeedEntry { token: WETH, feed_id: "eth-usd" },
                    FeedEntry { token: USDC, feed_id: "usdc-usd" },
                    FeedEntry { token: USDT, feed_id: "usdt-usd" },
                    FeedEntry { token: DAI, feed_id: "dai-usd" },
                    FeedEntry { token: WBTC, feed_id: "wbtc-usd" },
                ],
                stables: vec![
                    StableToken { address: USDC, symbol: "USDC", decimals: 6 },
                    StableToken { address: USDT, symbol: "USDT", decimals: 6 },
                    StableToken { address: DAI, symbol: "DAI", decimals: 18 },
                ],
            },
        );

        // Polygon
        m.insert(
            137,
            ChainRegistry {
                chain_id: 137,
                wrapped_native: WMATIC,
                native_feed: "matic-usd",
                feeds: vec![
                    FeedEntry { token: WMATIC, feed_id: "matic-usd" },
                    FeedEntry { token: USDC_POLYGON, feed_id: "usdc-usd" },
                    FeedEntry { token: USDT_POLYGON, feed_id: "usdt-usd" },
                ],
                stables: vec![
                    StableToken { address: USDC_POLYGON, symbol: "USDC", decimals: 6 },
                    StableToken { address: USDT_POLYGON, symbol: "USDT", decimals: 6 },
                ],
            },
        );

        m
    };
}

/// Registry for a chain, if we know it
pub fn for_chain(chain_id: u64) -> Option<&'static ChainRegistry> {
    REGISTRIES.get(&chain_id)
}

/// Curated feed id for a token on a chain, if allow-listed
pub fn feed_for(chain_id: u64, token_address: &str) -> Option<&'static str> {
    let wanted = token_address.to_ascii_lowercase();
    for_chain(chain_id)?
        .feeds
        .iter()
        .find(|f| f.token == wanted)
        .map(|f| f.feed_id)
}
