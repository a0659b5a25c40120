//! Process-wide plumbing shared by the agent stream crates.

pub mod config;
pub mod observability;

pub use observability::{LogTarget, ObservabilityConfig, init_observability};
