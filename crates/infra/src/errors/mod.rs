//! Error conversions for infrastructure-specific failures.

pub mod conversions;

pub use conversions::{error_chain, InfraError};
