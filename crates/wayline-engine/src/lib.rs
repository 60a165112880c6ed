//! # Wayline Engine
//!
//! Top-level runtime execution engine: resolves which orchestrator handles a
//! submission, creates the execution's ledger record before dispatch,
//! supervises completion against a deadline, and exposes status and
//! cancellation.

pub mod catalog;
pub mod config;
pub mod engine;
pub mod error;
pub mod registry;

pub use catalog::ContractCatalog;
pub use config::EngineConfig;
pub use engine::{CancelAck, ExecutionEngine, ExecutionStatusView};
pub use error::EngineError;
pub use registry::{GraphOrchestratorFactory, OrchestratorFactory, OrchestratorRegistry};
