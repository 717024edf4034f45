//! Statistical execution fallback
//!
//! Stands in for the fork harness when no fork environment is configured.
//! Synthesizes plausible outcomes from the strategy's confidence; every
//! result is tagged `simulated = true` so it can never be mistaken for a
//! real run.

use async_trait::async_trait;
use rand::prelude::*;
use rand::rngs::StdRng;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::price::registry;
use crate::strategy::Strategy;

use super::{ExecutionResult, ExtractedToken, ExploitHarness};

/// Success threshold is drawn uniformly from this range per run
const THRESHOLD_MIN: f64 = 60.0;
const THRESHOLD_MAX: f64 = 80.0;

/// Native price assumed when proportioning synthesized stablecoins.
/// This is simulation bookkeeping, not a market read.
const ASSUMED_NATIVE_USD: f64 = 2_500.0;

pub struct SimulatedHarness {
    rng: Mutex<StdRng>,
}

impl SimulatedHarness {
    /// Seeded construction gives reproducible simulation runs
    pub fn new(seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(s) => StdRng::seed_from_u64(s),
            None => StdRng::from_entropy(),
        };
        Self { rng: Mutex::new(rng) }
    }

    pub fn from_entropy() -> Self {
        Self::new(None)
    }
}

#[async_trait]
impl ExploitHarness for SimulatedHarness {
    async fn execute(
        &self,
        strategy: &Strategy,
        contract_address: &str,
        chain_id: u64,
        _block_number: u64,
        cancel: &CancellationToken,
    ) -> Result<ExecutionResult> {
        if cancel.is_cancelled() {
            return Err(Error::Cancelled("execution stage".to_string()));
        }

        let mut rng = self.rng.lock().await;

        let threshold = rng.gen_range(THRESHOLD_MIN..=THRESHOLD_MAX);
        let success = (strategy.confidence as f64) > threshold;
        debug!(
            kind = %strategy.kind,
            confidence = strategy.confidence,
            threshold,
            success,
            "simulated execution draw"
        );

        if !success {
            return Ok(ExecutionResult {
                success: false,
                gas_used: rng.gen_range(40_000..=120_000),
                profit_raw: 0.0,
                extracted_tokens: Vec::new(),
                trace: vec![format!(
                    "simulation: {} attack below success threshold ({:.1})",
                    strategy.kind, threshold
                )],
                error_message: None,
                simulated: true,
            });
        }

        let gas_used = rng.gen_range(180_000..=750_000);
        let profit_raw =
            rng.gen_range(0.5..4.0) * strategy.profit_tier.profit_multiplier();
        let tokens = synthesize_tokens(&mut rng, chain_id, profit_raw);

        info!(
            kind = %strategy.kind,
            profit = profit_raw,
            tokens = tokens.len(),
            "simulated attack succeeded"
        );

        Ok(ExecutionResult {
            success: true,
            gas_used,
            profit_raw,
            trace: vec![
                format!("simulation: fork chain {chain_id} (synthetic)"),
                format!("simulation: deploy {} harness", strategy.kind),
                format!("simulation: call attack() on {contract_address}"),
                format!("simulation: balance delta +{profit_raw:.4} native"),
            ],
            extracted_tokens: tokens,
            error_message: None,
            simulated: true,
        })
    }
}

/// 1-2 stablecoin-like extractions proportioned from the profit figure
fn synthesize_tokens(rng: &mut StdRng, chain_id: u64, profit_native: f64) -> Vec<ExtractedToken> {
    let stables = registry::for_chain(chain_id)
        .or_else(|| registry::for_chain(1))
        .map(|r| r.stables.clone())
        .unwrap_or_default();
    if stables.is_empty() {
        return Vec::new();
    }

    let total_usd = profit_native * ASSUMED_NATIVE_USD;
    let count = if stables.len() > 1 && rng.gen_bool(0.5) { 2 } else { 1 };
    let split = if count == 2 { rng.gen_range(0.3..0.7) } else { 1.0 };

    let mut picks = stables;
    picks.shuffle(rng);

    (0..count)
        .map(|i| {
            let stable = picks[i];
            let share = if i == 0 { split } else { 1.0 - split };
            let raw = (total_usd * share * 10f64.powi(stable.decimals as i32)) as u128;
            ExtractedToken {
                address: stable.address.to_string(),
                raw_amount: raw.to_string(),
                symbol: Some(stable.symbol.to_string()),
                decimals: Some(stable.decimals),
            }
        })
        .collect()
}
