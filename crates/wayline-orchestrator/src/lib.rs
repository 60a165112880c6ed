//! # Wayline Orchestrator
//!
//! Executes one Journey's intent graph: agents propose actions, proposals are
//! validated against each intent's declared capability set, connectors carry
//! the side effects, and every step is bracketed by write-ahead ledger
//! records so a crashed execution resumes from its last committed step.

pub mod capability;
pub mod config;
pub mod cursor;
pub mod error;
pub mod graph_run;
pub mod orchestrator;
pub mod step;

pub use capability::{AgentRegistry, ConnectorRegistry};
pub use config::OrchestratorConfig;
pub use cursor::LedgerCursor;
pub use error::OrchestratorError;
pub use graph_run::GraphOrchestrator;
pub use orchestrator::{Orchestrator, RunContext};
pub use step::StepOutcome;
