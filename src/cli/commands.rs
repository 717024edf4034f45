//! CLI command implementations

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::config::Config;
use crate::harness::{ExploitHarness, SimulatedHarness};
use crate::pipeline::notify::{LogSink, NotificationSink, WebhookSink};
use crate::pipeline::orchestrator::PipelineOrchestrator;
use crate::price::PriceAggregator;
use crate::providers::memory::{FixturePriceFeed, MemorySessionStore, NoDex, RegistryMetadata};
use crate::providers::{SessionStore, SourceProvider};
use crate::revenue::RevenueNormalizer;
use crate::scanner::VulnerabilityScanner;

/// Source provider that reads sanitized source from a local file
struct FileSourceProvider {
    path: PathBuf,
}

#[async_trait]
impl SourceProvider for FileSourceProvider {
    async fn sanitized_source(
        &self,
        _contract_address: &str,
        _chain_id: u64,
        _block_number: u64,
    ) -> crate::error::Result<String> {
        tokio::fs::read_to_string(&self.path)
            .await
            .map_err(|e| crate::error::Error::SourceProvider(e.to_string()))
    }
}

/// Run the full triage pipeline against one target
pub async fn analyze(
    config: &Config,
    contract: &str,
    chain_id: i64,
    block_number: i64,
    source_file: PathBuf,
) -> Result<()> {
    let harness: Arc<dyn ExploitHarness> = build_harness(config);

    let aggregator = Arc::new(PriceAggregator::new(
        Arc::new(FixturePriceFeed::with_defaults()),
        Arc::new(NoDex),
    ));
    let normalizer = Arc::new(RevenueNormalizer::new(aggregator, Arc::new(RegistryMetadata)));
    let store: Arc<dyn SessionStore> = Arc::new(MemorySessionStore::new());

    let sink: Arc<dyn NotificationSink> = match &config.notify.webhook_url {
        Some(url) => {
            info!(endpoint = %url, "webhook notifications enabled");
            Arc::new(WebhookSink::new(url.clone()))
        }
        None => Arc::new(LogSink),
    };

    let orchestrator = Arc::new(PipelineOrchestrator::new(
        Arc::new(FileSourceProvider { path: source_file }),
        harness,
        normalizer,
        Arc::clone(&store),
        sink,
    ));

    let session = orchestrator
        .create_session(contract, chain_id, block_number, config.analysis_config())
        .await
        .context("Session rejected")?;

    let cancel = CancellationToken::new();
    let outcome = orchestrator.run(session.id, cancel).await?;

    println!("Session {} completed", session.id);
    match &outcome.strategy {
        Some(s) => println!(
            "Selected strategy: {} (severity {}, confidence {})",
            s.kind, s.severity, s.confidence
        ),
        None => {
            println!("No exploitable findings.");
            return Ok(());
        }
    }

    if let Some(exec) = &outcome.execution {
        let mode = if exec.simulated { "simulated" } else { "fork" };
        println!(
            "Execution ({mode}): success={}, gas={}, profit={:.4} native",
            exec.success, exec.gas_used, exec.profit_raw
        );
    }

    if let Some(revenue) = &outcome.revenue {
        println!(
            "Valuation: {:.2} USD extracted, {:.2} USD gas, net {:.2} USD ({})",
            revenue.total_value_usd,
            revenue.gas_cost_usd,
            revenue.net_profit_usd,
            if revenue.is_profitable { "profitable" } else { "unprofitable" }
        );
        println!("Risk: {} (score {})", revenue.risk, revenue.risk_score);
    }

    if outcome.discovery.is_some() {
        let records = store.records_for(session.id).await?;
        println!("Exploit discovery recorded ({} stage records).", records.len());
    }

    Ok(())
}

/// Scan a local source file and print findings, no execution
pub async fn scan(source_file: PathBuf) -> Result<()> {
    let source = tokio::fs::read_to_string(&source_file)
        .await
        .with_context(|| format!("Cannot read {}", source_file.display()))?;

    let report = VulnerabilityScanner::new().scan(&source);

    for warning in &report.warnings {
        warn!("scan warning: {warning}");
    }

    if report.findings.is_empty() {
        println!("No danger signatures found.");
        return Ok(());
    }

    println!("source sha256: {}", report.source_digest);
    println!("protective signatures: {}", report.protective_count);
    for finding in &report.findings {
        println!(
            "[{}] {} (confidence {}, {} match(es)): {}",
            finding.severity, finding.kind, finding.confidence, finding.match_count,
            finding.description
        );
    }

    Ok(())
}

/// Show the effective configuration
pub fn show_config(config: &Config) -> Result<()> {
    println!("harness:");
    println!(
        "  fork_endpoint: {}",
        config.harness.fork_endpoint.as_deref().unwrap_or("(none, simulation)")
    );
    println!(
        "  simulator_seed: {}",
        config
            .harness
            .simulator_seed
            .map(|s| s.to_string())
            .unwrap_or_else(|| "(entropy)".to_string())
    );
    println!("analysis:");
    println!(
        "  gas_price_native: {}",
        config
            .analysis
            .gas_price_native
            .map(|p| format!("{p:e}"))
            .unwrap_or_else(|| "(absent, gas cost estimated as zero)".to_string())
    );
    println!("  token_concurrency: {}", config.analysis.token_concurrency);
    println!("notify:");
    println!(
        "  webhook_url: {}",
        config.notify.webhook_url.as_deref().unwrap_or("(log only)")
    );
    Ok(())
}

/// Pick the execution harness from configuration. Without a fork-capable
/// sandbox every execution takes the simulator path; `fork_endpoint` is
/// reserved until a sandbox runtime implementation is wired.
fn build_harness(config: &Config) -> Arc<dyn ExploitHarness> {
    if let Some(endpoint) = &config.harness.fork_endpoint {
        warn!(
            endpoint = %endpoint,
            "fork endpoint configured but no sandbox runtime is wired, using simulation"
        );
    }
    Arc::new(SimulatedHarness::new(config.harness.simulator_seed))
}
