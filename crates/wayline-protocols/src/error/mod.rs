//! Error types for the Wayline protocol layer.

mod agent;
mod connector;
mod contract;

pub use agent::*;
pub use connector::*;
pub use contract::*;
