//! # Wayline Telemetry
//!
//! Non-blocking telemetry pipeline and fleet-wide aggregation.
//!
//! ## Features
//!
//! - Fire-and-forget [`Reporter`] with a bounded buffer and background flush
//! - Bounded, observable loss: drop-oldest plus a dropped-event counter
//! - [`ControlTower`] rolling aggregates with windowed snapshot queries
//! - HTTP export endpoint for aggregate snapshots

pub mod config;
pub mod error;
pub mod export;
pub mod reporter;
pub mod tower;
pub mod transport;

pub use config::TelemetryConfig;
pub use error::TelemetryError;
pub use export::TowerEndpoint;
pub use reporter::Reporter;
pub use tower::{AggregateSnapshot, ControlTower, SeriesSnapshot};
pub use transport::{ChannelTransport, TelemetryTransport};
