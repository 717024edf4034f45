//! Exploit strategy synthesis and selection
//!
//! The factory turns findings into concrete exploit strategies; the
//! selector deterministically picks one per run.

pub mod factory;
pub mod selector;
pub mod templates;
pub mod types;

pub use factory::{strategies_for, strategy_for};
pub use selector::select;
pub use types::{ProfitTier, Strategy};
