//! Strategy factory
//!
//! Maps each finding to a concrete exploit strategy through a closed match
//! over the seven vulnerability categories. Generators are pure: no I/O,
//! no clock, no randomness.

use tracing::debug;

use crate::scanner::{Finding, VulnerabilityKind, MIN_CONFIDENCE};

use super::templates;
use super::types::{ProfitTier, Strategy};

/// Build one strategy per finding. Unknown kinds cannot occur: the kind
/// enum is closed, so every finding dispatches.
pub fn strategies_for(findings: &[Finding], contract_address: &str) -> Vec<Strategy> {
    findings
        .iter()
        .map(|f| strategy_for(f, contract_address))
        .collect()
}

/// Derive a strategy from exactly one finding
pub fn strategy_for(finding: &Finding, contract_address: &str) -> Strategy {
    let recipe = match finding.kind {
        VulnerabilityKind::Reentrancy => AttackRecipe {
            deflation: 1.0,
            profit_tier: ProfitTier::High,
            description: "Recursive withdrawal through the value-bearing external call",
            requirements: &[
                "target accepts deposits from arbitrary senders",
                "withdrawal pays out before balances settle",
            ],
            steps: &[
                "deploy the reentrant harness funded with the seed deposit",
                "deposit the seed into the target",
                "trigger withdraw and re-enter from receive() until drained",
                "sweep the harness balance",
            ],
        },
        VulnerabilityKind::IntegerOverflow => AttackRecipe {
            deflation: 0.7,
            profit_tier: ProfitTier::Medium,
            description: "Balance inflation through unchecked arithmetic wraparound",
            requirements: &[
                "an accounting path runs inside an unchecked block",
                "wrapped balance is spendable afterwards",
            ],
            steps: &[
                "compute the probe amount that wraps the accumulator",
                "submit the transfer that underflows the sender balance",
                "withdraw against the inflated balance",
            ],
        },
        VulnerabilityKind::AccessControl => AttackRecipe {
            deflation: 0.8,
            profit_tier: ProfitTier::High,
            description: "Privilege takeover through a spoofable authorization check",
            requirements: &[
                "privileged entrypoint gated on tx.origin or left ungated",
                "ownership transfer is not timelocked",
            ],
            steps: &[
                "call the privileged setter routed through the harness",
                "assume the owner role",
                "drain via the owner-only withdrawal",
            ],
        },
        VulnerabilityKind::Delegatecall => AttackRecipe {
            deflation: 1.0,
            profit_tier: ProfitTier::VeryHigh,
            description: "Storage overwrite through attacker-influenced delegatecall",
            requirements: &[
                "delegatecall destination or calldata is externally influenced",
                "victim slot 0 holds a privileged address",
            ],
            steps: &[
                "deploy the harness with a mirrored storage layout",
                "route a delegatecall into the harness claim()",
                "overwrite the owner slot with the attacker address",
                "withdraw with the stolen role",
            ],
        },
        VulnerabilityKind::UncheckedCall => AttackRecipe {
            deflation: 0.6,
            profit_tier: ProfitTier::Low,
            description: "Accounting drift from low-level calls with dropped results",
            requirements: &[
                "payout path ignores the call/send return value",
                "internal balances are debited regardless of delivery",
            ],
            steps: &[
                "request repeated payouts to the harness",
                "let failed sends desynchronize internal accounting",
                "exit through the drifted balance",
            ],
        },
        VulnerabilityKind::PriceOracle => AttackRecipe {
            deflation: 1.0,
            profit_tier: ProfitTier::High,
            description: "Borrow against a reserve-derived spot price after skewing it",
            requirements: &[
                "valuation reads spot reserves from a single AMM pair",
                "pair depth is small relative to available capital",
            ],
            steps: &[
                "swap into the pair to skew the spot price",
                "borrow or mint at the inflated valuation",
                "unwind the swap",
            ],
        },
        VulnerabilityKind::FlashLoan => AttackRecipe {
            deflation: 1.0,
            profit_tier: ProfitTier::VeryHigh,
            description: "Single-transaction price manipulation with borrowed liquidity",
            requirements: &[
                "a flash-loan lender holds the collateral asset",
                "share price is computed from current pool balances",
            ],
            steps: &[
                "take the flash loan",
                "deposit to inflate the share price",
                "redeem shares at the inflated price",
                "repay the loan inside the same transaction",
            ],
        },
    };

    let confidence = deflate(finding.confidence, recipe.deflation);
    debug!(
        kind = %finding.kind,
        finding_confidence = finding.confidence,
        strategy_confidence = confidence,
        "synthesized strategy"
    );

    Strategy {
        kind: finding.kind,
        severity: finding.severity,
        confidence,
        description: recipe.description.to_string(),
        poc_source: templates::poc_for(finding.kind, contract_address),
        profit_tier: recipe.profit_tier,
        requirements: recipe.requirements.iter().map(|s| s.to_string()).collect(),
        steps: recipe.steps.iter().map(|s| s.to_string()).collect(),
    }
}

struct AttackRecipe {
    deflation: f64,
    profit_tier: ProfitTier,
    description: &'static str,
    requirements: &'static [&'static str],
    steps: &'static [&'static str],
}

fn deflate(confidence: u8, factor: f64) -> u8 {
    let adjusted = (confidence as f64 * factor).round();
    adjusted.max(MIN_CONFIDENCE as f64) as u8
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scanner::{Severity, ALL_KINDS};

    fn finding(kind: VulnerabilityKind, confidence: u8) -> Finding {
        Finding {
            kind,
            severity: kind.severity(),
            description: String::new(),
            match_count: 1,
            confidence,
        }
    }

    const ADDR: &str = "0x1111111111111111111111111111111111111111";

    #[test]
    fn test_every_kind_yields_a_strategy() {
        for kind in ALL_KINDS {
            let s = strategy_for(&finding(kind, 60), ADDR);
            assert_eq!(s.kind, kind);
            assert!(!s.steps.is_empty());
            assert!(!s.requirements.is_empty());
            assert!(s.poc_source.contains(ADDR));
        }
    }

    #[test]
    fn test_confidence_deflation_per_kind() {
        assert_eq!(strategy_for(&finding(VulnerabilityKind::AccessControl, 50), ADDR).confidence, 40);
        assert_eq!(strategy_for(&finding(VulnerabilityKind::IntegerOverflow, 50), ADDR).confidence, 35);
        assert_eq!(strategy_for(&finding(VulnerabilityKind::UncheckedCall, 50), ADDR).confidence, 30);
        assert_eq!(strategy_for(&finding(VulnerabilityKind::Reentrancy, 50), ADDR).confidence, 50);
    }

    #[test]
    fn test_deflation_floors_at_minimum() {
        let s = strategy_for(&finding(VulnerabilityKind::UncheckedCall, 5), ADDR);
        assert_eq!(s.confidence, MIN_CONFIDENCE);
    }

    #[test]
    fn test_severity_carries_over_from_finding() {
        let s = strategy_for(&finding(VulnerabilityKind::Delegatecall, 64), ADDR);
        assert_eq!(s.severity, Severity::Critical);
    }
}
