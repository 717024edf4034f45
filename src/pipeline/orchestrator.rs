//! Pipeline orchestrator
//!
//! Drives a session through scan -> select -> execute -> normalize,
//! persisting a stage record at every boundary and emitting progress
//! notifications. Stages are strictly sequential within a session;
//! sessions run concurrently as independent tasks.

use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use futures::future::BoxFuture;
use serde_json::json;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::harness::{ExecutionResult, ExploitHarness};
use crate::pipeline::notify::{NotificationEvent, NotificationSink};
use crate::pipeline::{
    AnalysisConfig, ExploitDiscovery, Session, SessionStatus, StageName, StageRecord, StageStatus,
};
use crate::revenue::{RevenueNormalizer, RevenueReport};
use crate::scanner::VulnerabilityScanner;
use crate::strategy::{self, Strategy};
use crate::providers::{SessionStore, SourceProvider};

/// What one pipeline run produced
#[derive(Debug, Clone)]
pub struct PipelineOutcome {
    pub session_id: Uuid,
    pub strategy: Option<Strategy>,
    pub execution: Option<ExecutionResult>,
    pub revenue: Option<RevenueReport>,
    pub discovery: Option<ExploitDiscovery>,
}

pub struct PipelineOrchestrator {
    scanner: VulnerabilityScanner,
    source: Arc<dyn SourceProvider>,
    harness: Arc<dyn ExploitHarness>,
    normalizer: Arc<RevenueNormalizer>,
    store: Arc<dyn SessionStore>,
    sink: Arc<dyn NotificationSink>,
}

impl PipelineOrchestrator {
    pub fn new(
        source: Arc<dyn SourceProvider>,
        harness: Arc<dyn ExploitHarness>,
        normalizer: Arc<RevenueNormalizer>,
        store: Arc<dyn SessionStore>,
        sink: Arc<dyn NotificationSink>,
    ) -> Self {
        Self {
            scanner: VulnerabilityScanner::new(),
            source,
            harness,
            normalizer,
            store,
            sink,
        }
    }

    /// Validate the target and create a pending session. Malformed input
    /// is rejected here; no session record is created for it.
    pub async fn create_session(
        &self,
        contract_address: &str,
        chain_id: i64,
        block_number: i64,
        config: AnalysisConfig,
    ) -> Result<Session> {
        let session = Session::new(contract_address, chain_id, block_number, config)?;
        self.store.create_session(session.clone()).await?;
        info!(
            session = %session.id,
            contract = %session.contract_address,
            chain_id = session.chain_id,
            block = session.block_number,
            "session created"
        );
        Ok(session)
    }

    /// Run a pending session to a terminal state. The session completes
    /// whenever the stage sequence runs to its natural end, found exploit
    /// or not; it fails only when a stage raises an unexpected error.
    pub async fn run(
        &self,
        session_id: Uuid,
        cancel: CancellationToken,
    ) -> Result<PipelineOutcome> {
        let mut session = self.store.get_session(session_id).await?;
        session.transition(SessionStatus::Running)?;
        self.store.update_session(&session).await?;

        match self.run_stages(session.clone(), &cancel).await {
            Ok(outcome) => {
                session.transition(SessionStatus::Completed)?;
                self.store.update_session(&session).await?;
                self.sink
                    .notify(NotificationEvent::SessionCompleted { session_id })
                    .await;
                info!(session = %session_id, "session completed");
                Ok(outcome)
            }
            Err(e) => {
                warn!(session = %session_id, error = %e, "session failed");
                session.transition(SessionStatus::Failed)?;
                self.store.update_session(&session).await?;
                self.sink
                    .notify(NotificationEvent::SessionFailed {
                        session_id,
                        error: e.to_string(),
                    })
                    .await;
                Err(e)
            }
        }
    }

    /// Spawn a session run as an independent unit of work
    pub fn spawn(
        self: &Arc<Self>,
        session_id: Uuid,
        cancel: CancellationToken,
    ) -> tokio::task::JoinHandle<Result<PipelineOutcome>> {
        let this = Arc::clone(self);
        tokio::spawn(async move { this.run(session_id, cancel).await })
    }

    // Takes the session by value and boxes each stage body so the
    // future stays Send when a run is spawned as its own task.
    async fn run_stages(
        &self,
        session: Session,
        cancel: &CancellationToken,
    ) -> Result<PipelineOutcome> {
        let session = &session;
        let mut outcome = PipelineOutcome {
            session_id: session.id,
            strategy: None,
            execution: None,
            revenue: None,
            discovery: None,
        };

        // Scan
        let report = self
            .stage(session, StageName::Scan, json!({
                "contract": session.contract_address,
                "chain_id": session.chain_id,
                "block_number": session.block_number,
            }), Box::pin(async {
                if cancel.is_cancelled() {
                    return Err(Error::Cancelled("scan stage".to_string()));
                }
                let source = self
                    .source
                    .sanitized_source(
                        &session.contract_address,
                        session.chain_id,
                        session.block_number,
                    )
                    .await?;
                let report = self.scanner.scan(&source);
                let output = serde_json::to_value(&report)?;
                Ok((report, output))
            }))
            .await?;

        // Select
        let selected = self
            .stage(session, StageName::Select, json!({
                "findings": report.findings.len(),
            }), Box::pin(async {
                if cancel.is_cancelled() {
                    return Err(Error::Cancelled("select stage".to_string()));
                }
                let candidates =
                    strategy::strategies_for(&report.findings, &session.contract_address);
                let chosen = strategy::select(&candidates).cloned();
                let output = json!({
                    "candidates": candidates.len(),
                    "selected": chosen.as_ref().map(|s| json!({
                        "kind": s.kind,
                        "confidence": s.confidence,
                    })),
                });
                Ok((chosen, output))
            }))
            .await?;

        let Some(chosen) = selected else {
            debug!(session = %session.id, "no strategy selected, nothing to execute");
            return Ok(outcome);
        };
        outcome.strategy = Some(chosen.clone());

        // Execute
        let execution = self
            .stage(session, StageName::Execute, json!({
                "kind": chosen.kind,
                "confidence": chosen.confidence,
            }), Box::pin(async {
                let result = self
                    .harness
                    .execute(
                        &chosen,
                        &session.contract_address,
                        session.chain_id,
                        session.block_number,
                        cancel,
                    )
                    .await?;
                let output = serde_json::to_value(&result)?;
                Ok((result, output))
            }))
            .await?;
        outcome.execution = Some(execution.clone());

        if !execution.success {
            debug!(session = %session.id, "execution unsuccessful, no exploit");
            return Ok(outcome);
        }

        // Normalize, only on successful execution
        let revenue = self
            .stage(session, StageName::Normalize, json!({
                "tokens": execution.extracted_tokens.len(),
                "gas_used": execution.gas_used,
            }), Box::pin(async {
                let report = self
                    .normalizer
                    .normalize(
                        &execution,
                        session.chain_id,
                        session.block_number,
                        &session.config,
                        cancel,
                    )
                    .await?;
                let output = serde_json::to_value(&report)?;
                Ok((report, output))
            }))
            .await?;
        outcome.revenue = Some(revenue.clone());

        // Discovery record, persisted iff execution succeeded
        let discovery = ExploitDiscovery {
            session_id: session.id,
            kind: chosen.kind,
            severity: chosen.severity,
            confidence: chosen.confidence,
            total_value_usd: revenue.total_value_usd,
            poc_source: chosen.poc_source.clone(),
            description: format!(
                "{} ({} severity): {}",
                chosen.kind, chosen.severity, chosen.description
            ),
            discovered_at: Utc::now(),
        };
        self.store.record_discovery(discovery.clone()).await?;
        self.sink
            .notify(NotificationEvent::ExploitDiscovered {
                session_id: session.id,
                summary: format!(
                    "{} exploit, {:.2} USD at risk",
                    discovery.kind, discovery.total_value_usd
                ),
            })
            .await;
        outcome.discovery = Some(discovery);

        Ok(outcome)
    }

    /// Run one stage: notify start, time the body, persist the record,
    /// notify the outcome. A failed stage propagates its error to fail
    /// the session.
    async fn stage<'a, T>(
        &'a self,
        session: &'a Session,
        name: StageName,
        input: serde_json::Value,
        body: BoxFuture<'a, Result<(T, serde_json::Value)>>,
    ) -> Result<T> {
        self.sink
            .notify(NotificationEvent::StageStarted {
                session_id: session.id,
                stage: name,
            })
            .await;

        let started = Instant::now();
        let result = body.await;
        let duration_ms = started.elapsed().as_millis() as u64;

        let (status, output, error) = match &result {
            Ok((_, output)) => (StageStatus::Completed, output.clone(), None),
            Err(e) => (StageStatus::Failed, serde_json::Value::Null, Some(e.to_string())),
        };

        self.store
            .append_record(StageRecord {
                session_id: session.id,
                stage: name,
                status,
                input,
                output,
                error,
                duration_ms,
            })
            .await?;

        self.sink
            .notify(NotificationEvent::StageCompleted {
                session_id: session.id,
                stage: name,
                status,
            })
            .await;

        debug!(session = %session.id, stage = %name, ?status, duration_ms, "stage finished");
        result.map(|(value, _)| value)
    }
}
