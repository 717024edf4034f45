//! Lexical danger signatures for the vulnerability scanner
//!
//! One compiled regex per vulnerability category, plus the fixed set of
//! protective signatures that discount confidence. Compiled once at startup.

use lazy_static::lazy_static;
use regex::Regex;

use super::VulnerabilityKind;

lazy_static! {
    /// Low-level value-bearing calls that can re-enter the caller
    static ref REENTRANCY: Regex =
        Regex::new(r"\.call\s*\{\s*value\s*:|\.call\.value\s*\(").unwrap();

    /// Arithmetic blocks with overflow checks explicitly disabled
    static ref INTEGER_OVERFLOW: Regex = Regex::new(r"unchecked\s*\{").unwrap();

    /// tx.origin auth checks are spoofable through an intermediate contract
    static ref ACCESS_CONTROL: Regex = Regex::new(r"tx\.origin").unwrap();

    /// delegatecall executes foreign code against local storage
    static ref DELEGATECALL: Regex = Regex::new(r"\.delegatecall\s*\(|\bdelegatecall\b").unwrap();

    /// Low-level sends whose return value is commonly dropped
    static ref UNCHECKED_CALL: Regex = Regex::new(r"\.send\s*\(|\.call\s*\(").unwrap();

    /// Spot-price reads straight off an AMM pair
    static ref PRICE_ORACLE: Regex =
        Regex::new(r"getReserves\s*\(|balanceOf\s*\(\s*address\s*\(\s*this\s*\)").unwrap();

    /// Flash-loan entrypoints and callbacks
    static ref FLASH_LOAN: Regex =
        Regex::new(r"(?i)flash[_]?loan|onFlashLoan|executeOperation").unwrap();

    /// Guard-style constructs that reduce exploitability
    static ref PROTECTIVE: Regex = Regex::new(
        r"require\s*\(|assert\s*\(|\bnonReentrant\b|\bReentrancyGuard\b|\bSafeMath\b|\bonlyOwner\b|\bOwnable\b",
    )
    .unwrap();
}

/// Count matches of the danger signature for one category
pub fn match_count(kind: VulnerabilityKind, source: &str) -> u32 {
    let re: &Regex = match kind {
        VulnerabilityKind::Reentrancy => &REENTRANCY,
        VulnerabilityKind::IntegerOverflow => &INTEGER_OVERFLOW,
        VulnerabilityKind::AccessControl => &ACCESS_CONTROL,
        VulnerabilityKind::Delegatecall => &DELEGATECALL,
        VulnerabilityKind::UncheckedCall => &UNCHECKED_CALL,
        VulnerabilityKind::PriceOracle => &PRICE_ORACLE,
        VulnerabilityKind::FlashLoan => &FLASH_LOAN,
    };
    re.find_iter(source).count() as u32
}

/// Count protective signatures across the whole source
pub fn protective_count(source: &str) -> u32 {
    PROTECTIVE.find_iter(source).count() as u32
}
