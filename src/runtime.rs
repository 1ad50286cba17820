//! Runtime glue that wires configuration, tracing, the batch orchestrator,
//! and rate-limited dispatch.

pub mod config;
pub mod dispatcher;
pub mod orchestrator;
pub mod telemetry;
