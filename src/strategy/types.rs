//! Shared types for exploit strategy synthesis

use serde::{Deserialize, Serialize};

use crate::scanner::{Severity, VulnerabilityKind};

/// Coarse estimate of what a successful run of the strategy extracts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProfitTier {
    Low,
    Medium,
    High,
    VeryHigh,
}

impl std::fmt::Display for ProfitTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProfitTier::Low => write!(f, "low"),
            ProfitTier::Medium => write!(f, "medium"),
            ProfitTier::High => write!(f, "high"),
            ProfitTier::VeryHigh => write!(f, "very_high"),
        }
    }
}

impl ProfitTier {
    /// Multiplier applied to the simulator's baseline profit draw
    pub fn profit_multiplier(&self) -> f64 {
        match self {
            ProfitTier::Low => 0.3,
            ProfitTier::Medium => 1.0,
            ProfitTier::High => 3.0,
            ProfitTier::VeryHigh => 8.0,
        }
    }
}

/// A synthesized exploit plan derived from exactly one Finding
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Strategy {
    pub kind: VulnerabilityKind,
    pub severity: Severity,
    /// Always in [5, 95]; some generators deflate the finding's confidence
    pub confidence: u8,
    pub description: String,
    /// Complete proof-of-concept contract source, ready for deployment
    pub poc_source: String,
    pub profit_tier: ProfitTier,
    /// Preconditions that must hold for the attack to work
    pub requirements: Vec<String>,
    /// Ordered attack steps
    pub steps: Vec<String>,
}
