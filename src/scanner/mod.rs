//! Vulnerability scanner
//!
//! Scans sanitized contract source for a fixed set of lexical danger
//! signatures and emits typed findings with a confidence score. Heuristic
//! by design: a finding is a hypothesis for the strategy factory, not a
//! verified vulnerability.

pub mod signatures;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::{debug, warn};

/// The seven vulnerability categories the scanner knows about.
///
/// Declaration order is load-bearing: it is the tie-break precedence used
/// by strategy selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VulnerabilityKind {
    Reentrancy,
    IntegerOverflow,
    AccessControl,
    Delegatecall,
    UncheckedCall,
    PriceOracle,
    FlashLoan,
}

/// All categories in tie-break precedence order
pub const ALL_KINDS: [VulnerabilityKind; 7] = [
    VulnerabilityKind::Reentrancy,
    VulnerabilityKind::IntegerOverflow,
    VulnerabilityKind::AccessControl,
    VulnerabilityKind::Delegatecall,
    VulnerabilityKind::UncheckedCall,
    VulnerabilityKind::PriceOracle,
    VulnerabilityKind::FlashLoan,
];

impl VulnerabilityKind {
    /// Per-category base-confidence multiplier
    pub fn multiplier(&self) -> f64 {
        match self {
            VulnerabilityKind::Reentrancy => 1.5,
            VulnerabilityKind::IntegerOverflow => 1.1,
            VulnerabilityKind::AccessControl => 1.2,
            VulnerabilityKind::Delegatecall => 1.8,
            VulnerabilityKind::UncheckedCall => 1.0,
            VulnerabilityKind::PriceOracle => 1.4,
            VulnerabilityKind::FlashLoan => 1.3,
        }
    }

    /// Fixed severity for the category
    pub fn severity(&self) -> Severity {
        match self {
            VulnerabilityKind::Reentrancy => Severity::Critical,
            VulnerabilityKind::Delegatecall => Severity::Critical,
            VulnerabilityKind::AccessControl => Severity::High,
            VulnerabilityKind::PriceOracle => Severity::High,
            VulnerabilityKind::FlashLoan => Severity::High,
            VulnerabilityKind::IntegerOverflow => Severity::Medium,
            VulnerabilityKind::UncheckedCall => Severity::Medium,
        }
    }

    /// Position in the tie-break precedence order (lower wins a tie)
    pub fn precedence(&self) -> usize {
        ALL_KINDS.iter().position(|k| k == self).unwrap_or(ALL_KINDS.len())
    }
}

impl std::fmt::Display for VulnerabilityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            VulnerabilityKind::Reentrancy => write!(f, "reentrancy"),
            VulnerabilityKind::IntegerOverflow => write!(f, "integer-overflow"),
            VulnerabilityKind::AccessControl => write!(f, "access-control"),
            VulnerabilityKind::Delegatecall => write!(f, "delegatecall"),
            VulnerabilityKind::UncheckedCall => write!(f, "unchecked-call"),
            VulnerabilityKind::PriceOracle => write!(f, "price-oracle-manipulation"),
            VulnerabilityKind::FlashLoan => write!(f, "flash-loan"),
        }
    }
}

/// Boundary severity vocabulary
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Severity::Low => write!(f, "low"),
            Severity::Medium => write!(f, "medium"),
            Severity::High => write!(f, "high"),
            Severity::Critical => write!(f, "critical"),
        }
    }
}

/// A detected textual signature of a known vulnerability class.
/// Immutable once produced.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Finding {
    pub kind: VulnerabilityKind,
    pub severity: Severity,
    pub description: String,
    pub match_count: u32,
    /// Always in [5, 95]
    pub confidence: u8,
}

/// Scanner output: findings plus audit fields
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanReport {
    pub findings: Vec<Finding>,
    /// Protective signatures seen across the whole source
    pub protective_count: u32,
    /// sha256 of the analyzed source, hex-encoded
    pub source_digest: String,
    /// Non-fatal analysis warnings (e.g. empty source)
    pub warnings: Vec<String>,
}

/// Confidence bounds for findings and strategies
pub const MIN_CONFIDENCE: u8 = 5;
pub const MAX_CONFIDENCE: u8 = 95;

/// Compute a finding's confidence from match and protective counts.
///
/// base 30 x category multiplier, plus 10 per match capped at +30, minus 5
/// per protective signature capped at -20, clipped to [5, 95].
pub fn confidence_for(kind: VulnerabilityKind, match_count: u32, protective: u32) -> u8 {
    let base = 30.0 * kind.multiplier();
    let bonus = (match_count as f64 * 10.0).min(30.0);
    let penalty = (protective as f64 * 5.0).min(20.0);
    let raw = (base + bonus - penalty).round();
    raw.clamp(MIN_CONFIDENCE as f64, MAX_CONFIDENCE as f64) as u8
}

/// Lexical vulnerability scanner over sanitized source text
#[derive(Debug, Default, Clone)]
pub struct VulnerabilityScanner;

impl VulnerabilityScanner {
    pub fn new() -> Self {
        Self
    }

    /// Scan source text. Analysis problems never abort the scan: they
    /// degrade to zero findings plus a warning.
    pub fn scan(&self, source: &str) -> ScanReport {
        let digest = hex_digest(source);

        if source.trim().is_empty() {
            warn!("Source text is empty, scan degrades to zero findings");
            return ScanReport {
                findings: Vec::new(),
                protective_count: 0,
                source_digest: digest,
                warnings: vec!["source text is empty".to_string()],
            };
        }

        let protective = signatures::protective_count(source);
        let mut findings = Vec::new();

        for kind in ALL_KINDS {
            let matches = signatures::match_count(kind, source);
            if matches == 0 {
                continue;
            }
            let confidence = confidence_for(kind, matches, protective);
            debug!(
                kind = %kind,
                matches,
                protective,
                confidence,
                "danger signature matched"
            );
            findings.push(Finding {
                kind,
                severity: kind.severity(),
                description: describe(kind, matches),
                match_count: matches,
                confidence,
            });
        }

        debug!(
            findings = findings.len(),
            protective, "scan complete"
        );

        ScanReport {
            findings,
            protective_count: protective,
            source_digest: digest,
            warnings: Vec::new(),
        }
    }
}

fn describe(kind: VulnerabilityKind, matches: u32) -> String {
    let what = match kind {
        VulnerabilityKind::Reentrancy => {
            "external value-bearing call reachable before state settlement"
        }
        VulnerabilityKind::IntegerOverflow => "arithmetic with overflow checks disabled",
        VulnerabilityKind::AccessControl => "tx.origin-style authorization check",
        VulnerabilityKind::Delegatecall => "delegatecall into externally influenced code",
        VulnerabilityKind::UncheckedCall => "low-level call with unchecked return value",
        VulnerabilityKind::PriceOracle => "spot price read directly from AMM reserves",
        VulnerabilityKind::FlashLoan => "flash-loan entrypoint or callback surface",
    };
    format!("{what} ({matches} occurrence(s))")
}

fn hex_digest(source: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(source.as_bytes());
    let out = hasher.finalize();
    out.iter().map(|b| format!("{b:02x}")).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_delegatecall_without_protections_scores_64() {
        // 30 x 1.8 + 10 = 64, nothing to subtract
        let scanner = VulnerabilityScanner::new();
        let report = scanner.scan("target.delegatecall(payload);");

        assert_eq!(report.findings.len(), 1);
        let f = &report.findings[0];
        assert_eq!(f.kind, VulnerabilityKind::Delegatecall);
        assert_eq!(f.severity, Severity::Critical);
        assert_eq!(f.confidence, 64);
    }

    #[test]
    fn test_confidence_always_in_bounds() {
        for kind in ALL_KINDS {
            for matches in 0..20 {
                for protective in 0..20 {
                    let c = confidence_for(kind, matches, protective);
                    assert!((MIN_CONFIDENCE..=MAX_CONFIDENCE).contains(&c));
                }
            }
        }
    }

    #[test]
    fn test_match_bonus_caps_at_30() {
        let three = confidence_for(VulnerabilityKind::UncheckedCall, 3, 0);
        let ten = confidence_for(VulnerabilityKind::UncheckedCall, 10, 0);
        assert_eq!(three, 60);
        assert_eq!(ten, 60);
    }

    #[test]
    fn test_protective_penalty_caps_at_20() {
        let four = confidence_for(VulnerabilityKind::Reentrancy, 1, 4);
        let twelve = confidence_for(VulnerabilityKind::Reentrancy, 1, 12);
        assert_eq!(four, 35);
        assert_eq!(twelve, 35);
    }

    #[test]
    fn test_empty_source_degrades_with_warning() {
        let scanner = VulnerabilityScanner::new();
        let report = scanner.scan("   \n\t ");
        assert!(report.findings.is_empty());
        assert_eq!(report.warnings.len(), 1);
    }

    #[test]
    fn test_guarded_source_scores_lower() {
        let scanner = VulnerabilityScanner::new();
        let bare = scanner.scan("msg.sender.call{value: amount}(\"\");");
        let guarded = scanner.scan(
            "function withdraw() nonReentrant { require(ok); msg.sender.call{value: amount}(\"\"); }",
        );

        let bare_conf = bare
            .findings
            .iter()
            .find(|f| f.kind == VulnerabilityKind::Reentrancy)
            .unwrap()
            .confidence;
        let guarded_conf = guarded
            .findings
            .iter()
            .find(|f| f.kind == VulnerabilityKind::Reentrancy)
            .unwrap()
            .confidence;
        assert!(guarded_conf < bare_conf);
    }

    #[test]
    fn test_digest_is_stable() {
        let scanner = VulnerabilityScanner::new();
        let a = scanner.scan("delegatecall");
        let b = scanner.scan("delegatecall");
        assert_eq!(a.source_digest, b.source_digest);
        assert_eq!(a.source_digest.len(), 64);
    }
}
