//! Pipeline session types and state machine
//!
//! A session is one end-to-end analysis run against a single
//! contract/chain/block target. Sessions move `Pending -> Running ->
//! {Completed, Failed}`; terminal states absorb.

pub mod notify;
pub mod orchestrator;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::scanner::{Severity, VulnerabilityKind};

/// Session lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    Pending,
    Running,
    Completed,
    Failed,
}

impl SessionStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, SessionStatus::Completed | SessionStatus::Failed)
    }
}

impl std::fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SessionStatus::Pending => write!(f, "pending"),
            SessionStatus::Running => write!(f, "running"),
            SessionStatus::Completed => write!(f, "completed"),
            SessionStatus::Failed => write!(f, "failed"),
        }
    }
}

/// Per-session analysis settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisConfig {
    /// Gas price in native units per gas; absent means gas cost is
    /// reported as zero and flagged estimated
    #[serde(default)]
    pub gas_price_native: Option<f64>,
    /// Bounded concurrency for per-token normalization
    #[serde(default = "default_token_concurrency")]
    pub token_concurrency: usize,
    /// Seed for the simulated harness; absent means entropy
    #[serde(default)]
    pub simulator_seed: Option<u64>,
}

fn default_token_concurrency() -> usize {
    4
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            gas_price_native: None,
            token_concurrency: default_token_concurrency(),
            simulator_seed: None,
        }
    }
}

/// One end-to-end analysis run. Mutated only by the orchestrator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub id: Uuid,
    pub contract_address: String,
    pub chain_id: u64,
    pub block_number: u64,
    pub status: SessionStatus,
    pub config: AnalysisConfig,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Session {
    /// Validate inputs and create a pending session. Malformed targets are
    /// rejected here; no session record is ever created for them.
    pub fn new(
        contract_address: &str,
        chain_id: i64,
        block_number: i64,
        config: AnalysisConfig,
    ) -> Result<Self> {
        if !is_valid_address(contract_address) {
            return Err(Error::InvalidAddress(contract_address.to_string()));
        }
        if chain_id <= 0 {
            return Err(Error::InvalidChainId(chain_id));
        }
        if block_number <= 0 {
            return Err(Error::InvalidBlockNumber(block_number));
        }

        let now = Utc::now();
        Ok(Self {
            id: Uuid::new_v4(),
            contract_address: contract_address.to_string(),
            chain_id: chain_id as u64,
            block_number: block_number as u64,
            status: SessionStatus::Pending,
            config,
            created_at: now,
            updated_at: now,
        })
    }

    /// Move the session to a new status. Terminal states absorb; the only
    /// legal sequence is pending -> running -> completed|failed.
    pub fn transition(&mut self, to: SessionStatus) -> Result<()> {
        let legal = matches!(
            (self.status, to),
            (SessionStatus::Pending, SessionStatus::Running)
                | (SessionStatus::Running, SessionStatus::Completed)
                | (SessionStatus::Running, SessionStatus::Failed)
        );
        if !legal {
            return Err(Error::InvalidTransition {
                from: self.status.to_string(),
                to: to.to_string(),
            });
        }
        self.status = to;
        self.updated_at = Utc::now();
        Ok(())
    }
}

/// 0x-prefixed, 40 hex chars
pub fn is_valid_address(address: &str) -> bool {
    let Some(hex) = address.strip_prefix("0x") else {
        return false;
    };
    hex.len() == 40 && hex.chars().all(|c| c.is_ascii_hexdigit())
}

/// Pipeline stage names
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageName {
    Scan,
    Select,
    Execute,
    Normalize,
}

impl std::fmt::Display for StageName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StageName::Scan => write!(f, "scan"),
            StageName::Select => write!(f, "select"),
            StageName::Execute => write!(f, "execute"),
            StageName::Normalize => write!(f, "normalize"),
        }
    }
}

/// Stage outcome
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageStatus {
    Completed,
    Failed,
}

/// Append-only record of one stage run. Never mutated after finalization.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageRecord {
    pub session_id: Uuid,
    pub stage: StageName,
    pub status: StageStatus,
    pub input: serde_json::Value,
    pub output: serde_json::Value,
    pub error: Option<String>,
    pub duration_ms: u64,
}

/// A confirmed exploit, persisted only when execution succeeded
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExploitDiscovery {
    pub session_id: Uuid,
    pub kind: VulnerabilityKind,
    pub severity: Severity,
    pub confidence: u8,
    pub total_value_usd: f64,
    pub poc_source: String,
    pub description: String,
    pub discovered_at: DateTime<Utc>,
}
