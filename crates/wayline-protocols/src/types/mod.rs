//! Shared types used across the platform.

mod common;

pub use common::*;
