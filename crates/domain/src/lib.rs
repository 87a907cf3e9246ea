//! # vkrpc Domain
//!
//! Data types and models shared by every layer of the client.
//!
//! This crate contains:
//! - Call specifications, credentials and the response envelope
//! - Error taxonomy and Result definitions
//! - Configuration structures
//! - Platform constants
//!
//! ## Architecture
//! - No dependencies on other vkrpc crates
//! - Only external dependencies allowed
//! - Pure data structures, no I/O

pub mod config;
pub mod constants;
pub mod errors;
pub mod types;

// Re-export commonly used items
pub use config::*;
pub use errors::*;
pub use types::*;
