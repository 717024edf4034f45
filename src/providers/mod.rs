//! Collaborator interfaces consumed by the pipeline
//!
//! Retrieval, sandboxing, pricing, metadata, and storage are external
//! subsystems; the core talks to them through these traits. In-memory
//! implementations suitable for tests and local runs live in
//! [`memory`].

pub mod memory;

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::Result;
use crate::pipeline::{ExploitDiscovery, Session, StageRecord};

/// Supplies the scanner with sanitized, verified contract source
#[async_trait]
pub trait SourceProvider: Send + Sync {
    async fn sanitized_source(
        &self,
        contract_address: &str,
        chain_id: u64,
        block_number: u64,
    ) -> Result<String>;
}

/// Opaque handle for an ephemeral fork. One teardown per handle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForkHandle(pub String);

/// Result of invoking an entrypoint inside a fork
#[derive(Debug, Clone)]
pub struct Invocation {
    /// Caller balance delta in native units (profit when positive)
    pub balance_delta: f64,
    pub gas_used: u64,
    pub trace: Vec<String>,
}

/// Isolated-fork execution environment
#[async_trait]
pub trait SandboxRuntime: Send + Sync {
    async fn create_fork(&self, chain_id: u64, block_number: u64) -> Result<ForkHandle>;

    async fn deploy(&self, fork: &ForkHandle, source: &str) -> Result<String>;

    async fn invoke(
        &self,
        fork: &ForkHandle,
        deployed_address: &str,
        entrypoint: &str,
    ) -> Result<Invocation>;

    /// Guaranteed to be called exactly once per create_fork
    async fn teardown(&self, fork: ForkHandle) -> Result<()>;
}

/// Curated on-chain oracle feeds for well-known tokens
#[async_trait]
pub trait PriceFeedProvider: Send + Sync {
    async fn latest_price(&self, feed_id: &str, block_number: u64) -> Result<f64>;
}

/// Decentralized exchange reserve and quote reads
#[async_trait]
pub trait DexQuoteProvider: Send + Sync {
    /// Reserves of the (token_a, token_b) pair, in each token's decimal units
    async fn pair_reserves(
        &self,
        token_a: &str,
        token_b: &str,
        block_number: u64,
    ) -> Result<(f64, f64)>;

    /// Constant-product amount out for amount_in of token_in
    async fn quote(
        &self,
        token_in: &str,
        token_out: &str,
        amount_in: f64,
        block_number: u64,
    ) -> Result<f64>;
}

/// ERC-20 metadata as reported on chain
#[derive(Debug, Clone)]
pub struct TokenMetadata {
    pub symbol: String,
    pub decimals: u8,
}

#[async_trait]
pub trait TokenMetadataProvider: Send + Sync {
    async fn metadata(
        &self,
        token_address: &str,
        chain_id: u64,
        block_number: u64,
    ) -> Result<TokenMetadata>;
}

/// Durable session and record storage. Records are append-only.
#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn create_session(&self, session: Session) -> Result<()>;

    async fn update_session(&self, session: &Session) -> Result<()>;

    async fn get_session(&self, id: Uuid) -> Result<Session>;

    async fn list_sessions(&self) -> Result<Vec<Session>>;

    async fn append_record(&self, record: StageRecord) -> Result<()>;

    async fn records_for(&self, session_id: Uuid) -> Result<Vec<StageRecord>>;

    async fn record_discovery(&self, discovery: ExploitDiscovery) -> Result<()>;

    async fn discoveries_for(&self, session_id: Uuid) -> Result<Vec<ExploitDiscovery>>;
}
