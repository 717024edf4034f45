//! End-to-end pipeline tests over in-memory providers

use std::sync::Arc;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use chainprobe::error::{Error, Result};
use chainprobe::harness::SimulatedHarness;
use chainprobe::pipeline::notify::LogSink;
use chainprobe::pipeline::orchestrator::{PipelineOrchestrator, PipelineOutcome};
use chainprobe::pipeline::{AnalysisConfig, SessionStatus, StageName, StageStatus};
use chainprobe::price::PriceAggregator;
use chainprobe::providers::memory::{
    FixturePriceFeed, MemorySessionStore, NoDex, RegistryMetadata,
};
use chainprobe::providers::{SessionStore, SourceProvider};
use chainprobe::revenue::RevenueNormalizer;

const TARGET: &str = "0xabcdefabcdefabcdefabcdefabcdefabcdefabcd";

/// Three delegatecall hits, no guards: confidence 30x1.8 + 30 = 84,
/// which beats any simulator threshold in 60-80.
const HOT_SOURCE: &str = r#"
contract Proxy {
    function a(address t, bytes memory d) public { t.delegatecall(d); }
    function b(address t, bytes memory d) public { t.delegatecall(d); }
    function c(address t, bytes memory d) public { t.delegatecall(d); }
}
"#;

/// One unchecked send: confidence 30x1.0 + 10 = 40, below the 60-80
/// threshold range, so simulated execution never succeeds.
const COLD_SOURCE: &str = "payable(to).send(amount);";

/// Nothing dangerous at all
const CLEAN_SOURCE: &str = "contract Empty { uint256 public x; }";

struct StaticSource(&'static str);

#[async_trait]
impl SourceProvider for StaticSource {
    async fn sanitized_source(&self, _c: &str, _chain: u64, _block: u64) -> Result<String> {
        Ok(self.0.to_string())
    }
}

struct FailingSource;

#[async_trait]
impl SourceProvider for FailingSource {
    async fn sanitized_source(&self, _c: &str, _chain: u64, _block: u64) -> Result<String> {
        Err(Error::SourceProvider("explorer unreachable".to_string()))
    }
}

fn orchestrator(
    source: Arc<dyn SourceProvider>,
    store: Arc<MemorySessionStore>,
    seed: u64,
) -> Arc<PipelineOrchestrator> {
    let aggregator = Arc::new(PriceAggregator::new(
        Arc::new(FixturePriceFeed::with_defaults()),
        Arc::new(NoDex),
    ));
    let normalizer = Arc::new(RevenueNormalizer::new(aggregator, Arc::new(RegistryMetadata)));
    Arc::new(PipelineOrchestrator::new(
        source,
        Arc::new(SimulatedHarness::new(Some(seed))),
        normalizer,
        store,
        Arc::new(LogSink),
    ))
}

fn config() -> AnalysisConfig {
    AnalysisConfig {
        gas_price_native: Some(30e-9),
        ..Default::default()
    }
}

async fn run_with(source: &'static str, seed: u64) -> (PipelineOutcome, Arc<MemorySessionStore>) {
    let store = Arc::new(MemorySessionStore::new());
    let orch = orchestrator(Arc::new(StaticSource(source)), Arc::clone(&store), seed);
    let session = orch
        .create_session(TARGET, 1, 19_000_000, config())
        .await
        .unwrap();
    let outcome = orch.run(session.id, CancellationToken::new()).await.unwrap();
    (outcome, store)
}

#[tokio::test]
async fn test_full_pipeline_records_a_discovery() {
    let (outcome, store) = run_with(HOT_SOURCE, 11).await;

    let session = store.get_session(outcome.session_id).await.unwrap();
    assert_eq!(session.status, SessionStatus::Completed);

    let strategy = outcome.strategy.as_ref().unwrap();
    assert_eq!(strategy.confidence, 84);

    let execution = outcome.execution.as_ref().unwrap();
    assert!(execution.success);
    assert!(execution.simulated);

    let revenue = outcome.revenue.as_ref().unwrap();
    assert!(revenue.total_value_usd > 0.0);
    assert!(
        (revenue.net_profit_usd - (revenue.total_value_usd - revenue.gas_cost_usd)).abs() < 1e-6
    );
    assert_eq!(revenue.is_profitable, revenue.net_profit_usd > 0.0);

    let discoveries = store.discoveries_for(outcome.session_id).await.unwrap();
    assert_eq!(discoveries.len(), 1);
    assert_eq!(discoveries[0].total_value_usd, revenue.total_value_usd);
    assert!(!discoveries[0].poc_source.is_empty());

    let records = store.records_for(outcome.session_id).await.unwrap();
    let stages: Vec<StageName> = records.iter().map(|r| r.stage).collect();
    assert_eq!(
        stages,
        vec![StageName::Scan, StageName::Select, StageName::Execute, StageName::Normalize]
    );
    assert!(records.iter().all(|r| r.status == StageStatus::Completed));
}

#[tokio::test]
async fn test_clean_source_completes_without_execution() {
    // No findings: pipeline stops after selection, still completed
    let (outcome, store) = run_with(CLEAN_SOURCE, 1).await;

    let session = store.get_session(outcome.session_id).await.unwrap();
    assert_eq!(session.status, SessionStatus::Completed);
    assert!(outcome.strategy.is_none());
    assert!(outcome.execution.is_none());
    assert!(outcome.discovery.is_none());

    let records = store.records_for(outcome.session_id).await.unwrap();
    let stages: Vec<StageName> = records.iter().map(|r| r.stage).collect();
    assert_eq!(stages, vec![StageName::Scan, StageName::Select]);

    let discoveries = store.discoveries_for(outcome.session_id).await.unwrap();
    assert!(discoveries.is_empty());
}

#[tokio::test]
async fn test_unsuccessful_execution_is_not_a_failure() {
    let (outcome, store) = run_with(COLD_SOURCE, 5).await;

    let session = store.get_session(outcome.session_id).await.unwrap();
    assert_eq!(session.status, SessionStatus::Completed);

    let execution = outcome.execution.as_ref().unwrap();
    assert!(!execution.success);
    assert!(execution.simulated);
    assert!(outcome.revenue.is_none());

    // No discovery without a successful execution
    let discoveries = store.discoveries_for(outcome.session_id).await.unwrap();
    assert!(discoveries.is_empty());

    let records = store.records_for(outcome.session_id).await.unwrap();
    let stages: Vec<StageName> = records.iter().map(|r| r.stage).collect();
    assert_eq!(
        stages,
        vec![StageName::Scan, StageName::Select, StageName::Execute]
    );
}

#[tokio::test]
async fn test_unreachable_source_fails_the_session() {
    let store = Arc::new(MemorySessionStore::new());
    let orch = orchestrator(Arc::new(FailingSource), Arc::clone(&store), 1);
    let session = orch
        .create_session(TARGET, 1, 19_000_000, config())
        .await
        .unwrap();

    let err = orch
        .run(session.id, CancellationToken::new())
        .await
        .unwrap_err();
    assert!(matches!(err, Error::SourceProvider(_)));

    let session = store.get_session(session.id).await.unwrap();
    assert_eq!(session.status, SessionStatus::Failed);

    let records = store.records_for(session.id).await.unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].stage, StageName::Scan);
    assert_eq!(records[0].status, StageStatus::Failed);
    assert!(records[0].error.is_some());
}

#[tokio::test]
async fn test_malformed_target_never_creates_a_session() {
    let store = Arc::new(MemorySessionStore::new());
    let orch = orchestrator(Arc::new(StaticSource(CLEAN_SOURCE)), Arc::clone(&store), 1);

    assert!(orch.create_session("bogus", 1, 1, config()).await.is_err());
    assert!(orch.create_session(TARGET, 0, 1, config()).await.is_err());
    assert!(orch.create_session(TARGET, 1, -3, config()).await.is_err());

    assert!(store.list_sessions().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_cancellation_fails_the_session() {
    let store = Arc::new(MemorySessionStore::new());
    let orch = orchestrator(Arc::new(StaticSource(HOT_SOURCE)), Arc::clone(&store), 1);
    let session = orch
        .create_session(TARGET, 1, 19_000_000, config())
        .await
        .unwrap();

    let cancel = CancellationToken::new();
    cancel.cancel();
    let err = orch.run(session.id, cancel).await.unwrap_err();
    assert!(matches!(err, Error::Cancelled(_)));

    let session = store.get_session(session.id).await.unwrap();
    assert_eq!(session.status, SessionStatus::Failed);

    // The cancelled stage is recorded as failed
    let records = store.records_for(session.id).await.unwrap();
    assert_eq!(records[0].status, StageStatus::Failed);
}

#[test]
fn test_run_future_is_send() {
    // Spawning a run as its own task requires the whole future to be Send
    fn assert_send<F: std::future::Future + Send>(_: &F) {}

    let store = Arc::new(MemorySessionStore::new());
    let orch = orchestrator(Arc::new(StaticSource(CLEAN_SOURCE)), store, 1);
    let fut = orch.run(uuid::Uuid::nil(), CancellationToken::new());
    assert_send(&fut);
}

#[tokio::test]
async fn test_sessions_run_concurrently_and_independently() {
    let store = Arc::new(MemorySessionStore::new());
    let orch = orchestrator(Arc::new(StaticSource(HOT_SOURCE)), Arc::clone(&store), 21);

    let mut handles = Vec::new();
    for _ in 0..4 {
        let session = orch
            .create_session(TARGET, 1, 19_000_000, config())
            .await
            .unwrap();
        handles.push((session.id, orch.spawn(session.id, CancellationToken::new())));
    }

    for (id, handle) in handles {
        handle.await.unwrap().unwrap();
        let session = store.get_session(id).await.unwrap();
        assert_eq!(session.status, SessionStatus::Completed);
    }
}

#[tokio::test]
async fn test_rerun_of_terminal_session_is_rejected() {
    // No retries in the core: a finished session cannot be restarted
    let (outcome, store) = run_with(CLEAN_SOURCE, 1).await;
    let orch = orchestrator(
        Arc::new(StaticSource(CLEAN_SOURCE)),
        Arc::clone(&store),
        1,
    );
    let err = orch
        .run(outcome.session_id, CancellationToken::new())
        .await
        .unwrap_err();
    assert!(matches!(err, Error::InvalidTransition { .. }));
}
