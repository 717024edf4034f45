//! In-memory session store
//!
//! Backs local runs and tests. Sessions live in a concurrent map; stage
//! records and discoveries are append-only vectors keyed by session.

use async_trait::async_trait;
use dashmap::DashMap;
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::pipeline::{ExploitDiscovery, Session, StageRecord};

use super::SessionStore;

#[derive(Debug, Default)]
pub struct MemorySessionStore {
    sessions: DashMap<Uuid, Session>,
    records: DashMap<Uuid, Vec<StageRecord>>,
    discoveries: DashMap<Uuid, Vec<ExploitDiscovery>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn create_session(&self, session: Session) -> Result<()> {
        self.sessions.insert(session.id, session);
        Ok(())
    }

    async fn update_session(&self, session: &Session) -> Result<()> {
        if !self.sessions.contains_key(&session.id) {
            return Err(Error::SessionNotFound(session.id.to_string()));
        }
        self.sessions.insert(session.id, session.clone());
        Ok(())
    }

    async fn get_session(&self, id: Uuid) -> Result<Session> {
        self.sessions
            .get(&id)
            .map(|s| s.clone())
            .ok_or_else(|| Error::SessionNotFound(id.to_string()))
    }

    async fn list_sessions(&self) -> Result<Vec<Session>> {
        let mut all: Vec<Session> = self.sessions.iter().map(|s| s.clone()).collect();
        all.sort_by_key(|s| s.created_at);
        Ok(all)
    }

    async fn append_record(&self, record: StageRecord) -> Result<()> {
        self.records
            .entry(record.session_id)
            .or_default()
            .push(record);
        Ok(())
    }

    async fn records_for(&self, session_id: Uuid) -> Result<Vec<StageRecord>> {
        Ok(self
            .records
            .get(&session_id)
            .map(|r| r.clone())
            .unwrap_or_default())
    }

    async fn record_discovery(&self, discovery: ExploitDiscovery) -> Result<()> {
        self.discoveries
            .entry(discovery.session_id)
            .or_default()
            .push(discovery);
        Ok(())
    }

    async fn discoveries_for(&self, session_id: Uuid) -> Result<Vec<ExploitDiscovery>> {
        Ok(self
            .discoveries
            .get(&session_id)
            .map(|d| d.clone())
            .unwrap_or_default())
    }
}

/// Price feed over a fixed book of feed prices. Backs local runs where
/// no live feed provider is wired.
#[derive(Debug, Clone)]
pub struct FixturePriceFeed {
    book: std::collections::HashMap<String, f64>,
}

impl FixturePriceFeed {
    pub fn new(book: std::collections::HashMap<String, f64>) -> Self {
        Self { book }
    }

    /// Round-number defaults for the registry's curated feeds
    pub fn with_defaults() -> Self {
        let mut book = std::collections::HashMap::new();
        book.insert("eth-usd".to_string(), 2_500.0);
        book.insert("matic-usd".to_string(), 0.5);
        book.insert("usdc-usd".to_string(), 1.0);
        book.insert("usdt-usd".to_string(), 1.0);
        book.insert("dai-usd".to_string(), 1.0);
        book.insert("wbtc-usd".to_string(), 60_000.0);
        Self::new(book)
    }
}

#[async_trait]
impl crate::providers::PriceFeedProvider for FixturePriceFeed {
    async fn latest_price(&self, feed_id: &str, _block_number: u64) -> Result<f64> {
        self.book
            .get(feed_id)
            .copied()
            .ok_or_else(|| Error::PriceFeed(format!("no fixture price for feed {feed_id}")))
    }
}

/// Dex provider with no pairs. Reserve lookups fail, which the price
/// aggregator absorbs as an absent evidence source.
#[derive(Debug, Default)]
pub struct NoDex;

#[async_trait]
impl crate::providers::DexQuoteProvider for NoDex {
    async fn pair_reserves(&self, token_a: &str, _b: &str, _block: u64) -> Result<(f64, f64)> {
        Err(Error::DexQuote(format!("no pair for {token_a}")))
    }

    async fn quote(&self, token_in: &str, _out: &str, _amount: f64, _block: u64) -> Result<f64> {
        Err(Error::DexQuote(format!("no route for {token_in}")))
    }
}

/// Metadata resolution from the static chain registries
#[derive(Debug, Default)]
pub struct RegistryMetadata;

#[async_trait]
impl crate::providers::TokenMetadataProvider for RegistryMetadata {
    async fn metadata(
        &self,
        token_address: &str,
        chain_id: u64,
        _block_number: u64,
    ) -> Result<crate::providers::TokenMetadata> {
        let wanted = token_address.to_ascii_lowercase();
        crate::price::registry::for_chain(chain_id)
            .and_then(|reg| reg.stables.iter().find(|s| s.address == wanted))
            .map(|s| crate::providers::TokenMetadata {
                symbol: s.symbol.to_string(),
                decimals: s.decimals,
            })
            .ok_or_else(|| Error::TokenMetadata(format!("unknown token {token_address}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::AnalysisConfig;

    const ADDR: &str = "0x4444444444444444444444444444444444444444";

    #[tokio::test]
    async fn test_session_roundtrip() {
        let store = MemorySessionStore::new();
        let session = Session::new(ADDR, 1, 100, AnalysisConfig::default()).unwrap();
        let id = session.id;

        store.create_session(session).await.unwrap();
        let loaded = store.get_session(id).await.unwrap();
        assert_eq!(loaded.contract_address, ADDR);
    }

    #[tokio::test]
    async fn test_update_unknown_session_fails() {
        let store = MemorySessionStore::new();
        let session = Session::new(ADDR, 1, 100, AnalysisConfig::default()).unwrap();
        assert!(store.update_session(&session).await.is_err());
    }

    #[tokio::test]
    async fn test_records_keep_append_order() {
        use crate::pipeline::{StageName, StageStatus};

        let store = MemorySessionStore::new();
        let id = Uuid::new_v4();
        for stage in [StageName::Scan, StageName::Select, StageName::Execute] {
            store
                .append_record(StageRecord {
                    session_id: id,
                    stage,
                    status: StageStatus::Completed,
                    input: serde_json::Value::Null,
                    output: serde_json::Value::Null,
                    error: None,
                    duration_ms: 1,
                })
                .await
                .unwrap();
        }

        let records = store.records_for(id).await.unwrap();
        assert_eq!(records.len(), 3);
        assert_eq!(records[0].stage, StageName::Scan);
        assert_eq!(records[2].stage, StageName::Execute);
    }
}
