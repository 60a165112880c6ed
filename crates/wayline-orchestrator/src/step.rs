//! Execution of one intent: propose, validate, record, execute, record.

use std::time::{Duration, Instant};

use tokio::time::timeout;
use tracing::{debug, warn};

use wayline_ledger::ExecutionState;
use wayline_protocols::agent::ProposalContext;
use wayline_protocols::connector::{ActionRequest, ConnectorContext};
use wayline_protocols::contract::Intent;
use wayline_protocols::error::{AgentError, ConnectorError};
use wayline_protocols::telemetry::TelemetryEvent;
use wayline_protocols::types::hash_payload;

use crate::cursor::LedgerCursor;
use crate::error::OrchestratorError;
use crate::orchestrator::RunContext;

/// Output of a completed step.
#[derive(Debug, Clone)]
pub struct StepOutcome {
    /// Intent that completed.
    pub intent_id: String,

    /// Connector output, handed to dependent intents.
    pub output: serde_json::Value,
}

/// Run one intent to completion.
///
/// Write-ahead discipline: a `StepStarted` record carrying the proposal hash
/// is committed before the connector runs, a `StepCompleted` record carrying
/// the result hash after. The stable pre/post idempotency keys make replay
/// after a crash safe.
pub async fn run_step(
    ctx: &RunContext,
    cursor: &LedgerCursor,
    intent: &Intent,
) -> Result<StepOutcome, OrchestratorError> {
    if ctx.cancel.is_cancelled() {
        return Err(OrchestratorError::Cancelled);
    }

    let started = Instant::now();
    debug!(
        "Executing intent {} for execution {}",
        intent.id, ctx.execution_id
    );

    let agent = ctx
        .agents
        .get(&intent.agent_id)
        .ok_or_else(|| AgentError::NotFound(intent.agent_id.clone()))?;

    let mut proposal_ctx =
        ProposalContext::new(ctx.execution_id, ctx.journey_id.clone(), ctx.input.clone());
    proposal_ctx.completed = ctx.completed.clone();
    proposal_ctx.cancel = ctx.cancel.clone();

    let proposal = timeout(
        Duration::from_secs(ctx.config.agent_timeout_secs),
        agent.propose(intent, proposal_ctx),
    )
    .await
    .map_err(|_| AgentError::Timeout(ctx.config.agent_timeout_secs))??;

    // Contract gate: an out-of-contract proposal fails the step before any
    // connector is touched.
    if !intent
        .capabilities
        .allows(&proposal.connector_id, &proposal.action)
    {
        warn!(
            "Intent {} proposed {}/{} outside its capability set",
            intent.id, proposal.connector_id, proposal.action
        );
        ctx.telemetry.report(
            TelemetryEvent::counter("orchestrator", "capability_violations", 1.0)
                .with_execution(ctx.execution_id),
        );
        return Err(OrchestratorError::CapabilityViolation {
            intent_id: intent.id.clone(),
            connector_id: proposal.connector_id,
            action: proposal.action,
        });
    }

    cursor
        .commit(
            ExecutionState::StepStarted {
                intent_id: intent.id.clone(),
            },
            Some(hash_payload(&proposal.params)),
            format!("{}:{}:pre", ctx.execution_id, intent.id),
        )
        .await?;

    let connector = ctx
        .connectors
        .get(&proposal.connector_id)
        .ok_or_else(|| ConnectorError::NotFound(proposal.connector_id.clone()))?;
    if !connector.supports(&proposal.action) {
        return Err(ConnectorError::UnknownAction {
            connector_id: proposal.connector_id.clone(),
            action: proposal.action.clone(),
        }
        .into());
    }

    let request = ActionRequest::new(
        ctx.execution_id,
        intent.id.clone(),
        proposal.action.clone(),
        proposal.params.clone(),
    );
    let connector_ctx = ConnectorContext::with_cancel(ctx.cancel.clone());

    let outcome = timeout(
        Duration::from_secs(ctx.config.connector_timeout_secs),
        connector.execute(request, connector_ctx),
    )
    .await
    .map_err(|_| OrchestratorError::StepTimeout {
        intent_id: intent.id.clone(),
        seconds: ctx.config.connector_timeout_secs,
    })??;

    if !outcome.success {
        return Err(ConnectorError::ExecutionFailed(
            outcome
                .error
                .unwrap_or_else(|| "action reported failure".to_string()),
        )
        .into());
    }

    cursor
        .commit(
            ExecutionState::StepCompleted {
                intent_id: intent.id.clone(),
            },
            Some(hash_payload(&outcome.output)),
            format!("{}:{}:post", ctx.execution_id, intent.id),
        )
        .await?;

    ctx.telemetry.report(
        TelemetryEvent::duration_ms(
            "orchestrator",
            "step_duration",
            started.elapsed().as_secs_f64() * 1000.0,
        )
        .with_execution(ctx.execution_id)
        .with_tag("intent", intent.id.clone()),
    );
    ctx.telemetry.report(
        TelemetryEvent::counter("orchestrator", "steps_completed", 1.0)
            .with_execution(ctx.execution_id),
    );

    Ok(StepOutcome {
        intent_id: intent.id.clone(),
        output: outcome.output,
    })
}
