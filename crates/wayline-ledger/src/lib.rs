//! # Wayline Ledger
//!
//! Append-only consistency ledger of execution state transitions - the sole
//! source of truth for execution status.
//!
//! ## Guarantees
//!
//! - Per-execution sequence numbers form a contiguous chain starting at 0
//! - Idempotent commit: retrying a proposal returns the committed record
//! - Terminal states are absorbing
//! - A commit is acknowledged only after the record is persisted

pub mod config;
pub mod error;
pub mod record;
pub mod replay;
pub mod store;
pub mod surface;

pub use config::LedgerConfig;
pub use error::LedgerError;
pub use record::{ExecutionState, StateRecord, TransitionProposal};
pub use replay::ExecutionView;
pub use store::{FileLedgerStore, LedgerStore, MemoryLedgerStore};
pub use surface::StateSurface;
