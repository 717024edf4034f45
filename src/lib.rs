//! Smart contract exploit triage pipeline
//!
//! Scans verified source for danger signatures, synthesizes candidate
//! attack strategies, executes the most promising one in isolation, and
//! values the proceeds with a composite risk score.

pub mod cli;
pub mod config;
pub mod error;
pub mod harness;
pub mod pipeline;
pub mod price;
pub mod providers;
pub mod revenue;
pub mod scanner;
pub mod strategy;

// Re-export commonly used types
pub use config::Config;
pub use error::{Error, Result};
