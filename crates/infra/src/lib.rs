//! # vkrpc Infrastructure
//!
//! Infrastructure implementations of core ports.
//!
//! This crate contains:
//! - The reqwest-backed HTTP transport
//! - The configuration loader (environment, TOML, JSON)
//! - Tracing initialisation and per-call observers (metrics, statistics)
//! - The [`VkClient`] facade used by endpoint wrappers
//!
//! ## Architecture
//! - Implements traits defined in `vkrpc-core`
//! - Contains all "impure" code (network, filesystem, environment)

pub mod client;
pub mod config;
pub mod errors;
pub mod http;
pub mod observability;

// Re-export commonly used items
pub use client::{ExecuteReport, VkClient, VkClientBuilder};
pub use errors::InfraError;
pub use http::{HttpTransport, HttpTransportBuilder};
pub use observability::{init_tracing, CallMetrics, LogFormat, RequestStat, StatsObserver};
