//! Execution harness
//!
//! Runs the selected strategy against an ephemeral fork of the target
//! chain, or a statistical simulator when no fork environment is
//! configured. Both implementations sit behind [`ExploitHarness`] so the
//! orchestrator is agnostic to which is active.

pub mod fork;
pub mod simulator;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use crate::error::Result;
use crate::strategy::Strategy;

pub use fork::ForkHarness;
pub use simulator::SimulatedHarness;

/// A token extracted by a successful run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractedToken {
    pub address: String,
    /// Integer string in the token's smallest units
    pub raw_amount: String,
    pub symbol: Option<String>,
    pub decimals: Option<u8>,
}

/// Outcome of one strategy execution
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionResult {
    pub success: bool,
    pub gas_used: u64,
    /// Caller balance delta in native units
    pub profit_raw: f64,
    pub extracted_tokens: Vec<ExtractedToken>,
    pub trace: Vec<String>,
    pub error_message: Option<String>,
    /// True iff this result came from the statistical fallback
    pub simulated: bool,
}

impl ExecutionResult {
    /// A failed execution with no tokens and no trace. This is a normal
    /// "no exploit" outcome, not a session failure.
    pub fn failure(message: impl Into<String>, simulated: bool) -> Self {
        Self {
            success: false,
            gas_used: 0,
            profit_raw: 0.0,
            extracted_tokens: Vec::new(),
            trace: Vec::new(),
            error_message: Some(message.into()),
            simulated,
        }
    }
}

/// Executes one strategy against one target.
///
/// Internal sandbox failures never surface as `Err`: they come back as a
/// failed [`ExecutionResult`] with `error_message` set. The only `Err`
/// this returns is cancellation, which the orchestrator records as a
/// failed stage after any sandbox has been torn down.
#[async_trait]
pub trait ExploitHarness: Send + Sync {
    async fn execute(
        &self,
        strategy: &Strategy,
        contract_address: &str,
        chain_id: u64,
        block_number: u64,
        cancel: &CancellationToken,
    ) -> Result<ExecutionResult>;
}
