//! Default orchestrator: wave scheduling over the intent graph.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use wayline_ledger::ExecutionView;
use wayline_protocols::contract::Intent;

use crate::cursor::LedgerCursor;
use crate::error::OrchestratorError;
use crate::orchestrator::{Orchestrator, RunContext};
use crate::step::{run_step, StepOutcome};

/// Orchestrator that walks the intent graph wave by wave.
///
/// All intents whose dependencies are satisfied run concurrently; a
/// dependent intent starts only after every dependency's task has joined.
/// Before running, committed records are replayed and already-completed
/// intents are skipped, so a restarted execution resumes instead of
/// re-running from scratch.
pub struct GraphOrchestrator {
    journey_type: String,
}

impl GraphOrchestrator {
    /// Create an orchestrator for a journey type tag.
    pub fn new(journey_type: impl Into<String>) -> Self {
        Self {
            journey_type: journey_type.into(),
        }
    }
}

#[async_trait]
impl Orchestrator for GraphOrchestrator {
    fn journey_type(&self) -> &str {
        &self.journey_type
    }

    async fn run(&self, ctx: RunContext) -> Result<(), OrchestratorError> {
        ctx.graph.validate()?;

        let cursor = Arc::new(
            LedgerCursor::load(ctx.surface.clone(), ctx.execution_id, ctx.actor.clone()).await?,
        );

        // Resume frontier: skip intents whose completion is already
        // committed. Their outputs are not recoverable from the ledger (it
        // carries hashes, not payloads), so dependents of replayed steps see
        // an empty output.
        let records = ctx.surface.read(&ctx.execution_id).await?;
        let mut completed: HashSet<String> = ExecutionView::replay(&records)
            .map(|v| v.completed_intents)
            .unwrap_or_default();
        let mut results: HashMap<String, serde_json::Value> = completed
            .iter()
            .map(|id| (id.clone(), serde_json::Value::Null))
            .collect();

        if !completed.is_empty() {
            info!(
                "Resuming execution {} with {} committed steps",
                ctx.execution_id,
                completed.len()
            );
        }

        loop {
            if ctx.cancel.is_cancelled() {
                return Err(OrchestratorError::Cancelled);
            }

            let ready: Vec<Intent> = ctx
                .graph
                .ready_after(&completed)
                .into_iter()
                .cloned()
                .collect();
            if ready.is_empty() {
                break;
            }

            debug!(
                "Execution {} wave of {} intents: {:?}",
                ctx.execution_id,
                ready.len(),
                ready.iter().map(|i| i.id.as_str()).collect::<Vec<_>>()
            );

            let mut wave = JoinSet::new();
            for intent in ready {
                let step_ctx = RunContext {
                    completed: results.clone(),
                    ..ctx.clone()
                };
                let cursor = cursor.clone();
                wave.spawn(async move {
                    let intent_id = intent.id.clone();
                    let result = run_step(&step_ctx, &cursor, &intent).await;
                    (intent_id, result)
                });
            }

            // Barrier: the wave joins completely before dependents start.
            while let Some(joined) = wave.join_next().await {
                let (intent_id, result) = match joined {
                    Ok(pair) => pair,
                    Err(e) => {
                        drain(&mut wave, &mut completed, &mut results).await;
                        return Err(OrchestratorError::Internal(e.to_string()));
                    }
                };

                match result {
                    Ok(outcome) => {
                        record_success(&mut completed, &mut results, outcome);
                    }
                    Err(e) => {
                        match self
                            .try_fallback(&ctx, &cursor, &results, &intent_id, e)
                            .await
                        {
                            Ok(outcome) => {
                                // The fallback stands in for the failed
                                // intent: dependents unblock on the original
                                // id.
                                completed.insert(intent_id.clone());
                                results.insert(intent_id.clone(), outcome.output);
                            }
                            Err(e) => {
                                drain(&mut wave, &mut completed, &mut results).await;
                                return Err(e);
                            }
                        }
                    }
                }
            }
        }

        info!(
            "Execution {} completed {} intents",
            ctx.execution_id,
            completed.len()
        );
        Ok(())
    }
}

impl GraphOrchestrator {
    /// Run the declared fallback for a failed intent, if the error allows
    /// one and the graph declares one.
    async fn try_fallback(
        &self,
        ctx: &RunContext,
        cursor: &Arc<LedgerCursor>,
        results: &HashMap<String, serde_json::Value>,
        failed_intent: &str,
        error: OrchestratorError,
    ) -> Result<StepOutcome, OrchestratorError> {
        if !error.fallback_eligible() {
            return Err(error);
        }
        let Some(fallback) = ctx.graph.fallback_of(failed_intent) else {
            return Err(error);
        };

        warn!(
            "Intent {} failed ({}), running declared fallback {}",
            failed_intent, error, fallback.id
        );

        let step_ctx = RunContext {
            completed: results.clone(),
            ..ctx.clone()
        };
        run_step(&step_ctx, cursor, fallback).await
    }
}

fn record_success(
    completed: &mut HashSet<String>,
    results: &mut HashMap<String, serde_json::Value>,
    outcome: StepOutcome,
) {
    completed.insert(outcome.intent_id.clone());
    results.insert(outcome.intent_id, outcome.output);
}

/// Let in-flight steps of a failed wave finish; their commits stay valid,
/// their outcomes no longer matter beyond the ledger.
async fn drain(
    wave: &mut JoinSet<(String, Result<StepOutcome, OrchestratorError>)>,
    completed: &mut HashSet<String>,
    results: &mut HashMap<String, serde_json::Value>,
) {
    while let Some(joined) = wave.join_next().await {
        if let Ok((_, Ok(outcome))) = joined {
            record_success(completed, results, outcome);
        }
    }
}

#[cfg(test)]
#[path = "graph_run_tests.rs"]
mod tests;
