//! # vkrpc Core
//!
//! Request execution core - no HTTP code.
//!
//! This crate contains:
//! - Port interfaces for transports and call observers
//! - The process-boundary cancellation registry
//! - Response classification and the retry governor
//! - The request orchestrator (one logical call)
//! - The batch script compiler
//!
//! ## Architecture Principles
//! - Only depends on `vkrpc-domain`
//! - All network access goes through [`ports::Transport`]
//! - Pure, testable retry and termination logic

pub mod cancellation;
pub mod classify;
pub mod orchestrator;
pub mod ports;
pub mod retry;
pub mod script;

pub use cancellation::{CancellationRegistry, CancellationToken, InFlightGuard};
pub use classify::{QuietErrors, ResponseClassifier, TransientKind, Verdict};
pub use orchestrator::RequestOrchestrator;
pub use ports::{CallObserver, CallRecord, FanoutObserver, NoopObserver, Transport};
pub use retry::{Ladder, RetryDecision, RetryGovernor, RetryState};
pub use script::{
    BatchCompiler, BatchPlan, ChunkedLookupPlan, MultiEntityPlan, PageWalk, PaginatedPlan, ScriptError,
    SubCall,
};
