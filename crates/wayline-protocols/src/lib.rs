//! # Wayline Protocols
//!
//! Core protocol definitions (traits and the contract model) for the Wayline
//! orchestration platform. Contains interface definitions and shared types -
//! no runtime implementations.
//!
//! ## Core Traits
//!
//! - [`Agent`] - Trait for pluggable reasoning components proposing actions
//! - [`Connector`] - Trait for pluggable external action executors
//! - [`TelemetrySink`] - Fire-and-forget metric reporting interface

pub mod agent;
pub mod connector;
pub mod contract;
pub mod error;
pub mod retry;
pub mod signal;
pub mod telemetry;
pub mod types;

pub use agent::{Agent, ProposalContext, ProposedAction};
pub use connector::{ActionOutcome, ActionRequest, Connector, ConnectorContext};
pub use contract::{Capability, CapabilitySet, Intent, IntentGraph, Journey, Solution};
pub use error::{AgentError, ConnectorError, ContractError};
pub use retry::RetryConfig;
pub use signal::CancelSignal;
pub use telemetry::{MetricKind, MetricUnit, NoopSink, TelemetryEvent, TelemetrySink};
pub use types::*;
