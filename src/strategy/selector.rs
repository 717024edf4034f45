//! Strategy selection
//!
//! Exactly one strategy per run. Maximum confidence wins; ties break by
//! the fixed category precedence order, so identical inputs always select
//! the identical strategy.

use tracing::debug;

use super::types::Strategy;

/// Pick the single best strategy, or none if the list is empty
pub fn select(strategies: &[Strategy]) -> Option<&Strategy> {
    let best = strategies.iter().min_by_key(|s| {
        // Sort key: higher confidence first, then earlier precedence
        (std::cmp::Reverse(s.confidence), s.kind.precedence())
    });

    if let Some(s) = best {
        debug!(kind = %s.kind, confidence = s.confidence, "strategy selected");
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scanner::VulnerabilityKind;
    use crate::strategy::factory::strategy_for;
    use crate::scanner::Finding;

    fn strategy(kind: VulnerabilityKind, confidence: u8) -> Strategy {
        let mut s = strategy_for(
            &Finding {
                kind,
                severity: kind.severity(),
                description: String::new(),
                match_count: 1,
                confidence,
            },
            "0x2222222222222222222222222222222222222222",
        );
        // Pin the confidence directly; deflation is factory behavior
        s.confidence = confidence;
        s
    }

    #[test]
    fn test_empty_input_selects_nothing() {
        assert!(select(&[]).is_none());
    }

    #[test]
    fn test_highest_confidence_wins() {
        let list = vec![
            strategy(VulnerabilityKind::FlashLoan, 40),
            strategy(VulnerabilityKind::Reentrancy, 70),
            strategy(VulnerabilityKind::Delegatecall, 55),
        ];
        let s = select(&list).unwrap();
        assert_eq!(s.kind, VulnerabilityKind::Reentrancy);
        assert_eq!(s.confidence, 70);
    }

    #[test]
    fn test_tie_breaks_by_precedence_order() {
        // delegatecall comes after integer-overflow in precedence
        let list = vec![
            strategy(VulnerabilityKind::Delegatecall, 60),
            strategy(VulnerabilityKind::IntegerOverflow, 60),
        ];
        assert_eq!(select(&list).unwrap().kind, VulnerabilityKind::IntegerOverflow);

        // order of the input list does not matter
        let flipped = vec![
            strategy(VulnerabilityKind::IntegerOverflow, 60),
            strategy(VulnerabilityKind::Delegatecall, 60),
        ];
        assert_eq!(select(&flipped).unwrap().kind, VulnerabilityKind::IntegerOverflow);
    }

    #[test]
    fn test_selection_is_deterministic() {
        let list = vec![
            strategy(VulnerabilityKind::PriceOracle, 62),
            strategy(VulnerabilityKind::UncheckedCall, 62),
            strategy(VulnerabilityKind::AccessControl, 48),
        ];
        for _ in 0..10 {
            let s = select(&list).unwrap();
            assert_eq!(s.kind, VulnerabilityKind::UncheckedCall);
            assert_eq!(s.confidence, 62);
        }
    }
}
