//! Batch script compiler
//!
//! Folds many sub-calls into one `execute` round trip. Plans build a small
//! statement tree; a dialect renders it as text; the compiler wraps the text
//! in a [`CallSpec`](vkrpc_domain::CallSpec) that the orchestrator runs like
//! any other call.

mod ast;
mod compiler;
mod plan;
mod render;
mod walk;

use thiserror::Error;
use vkrpc_domain::ApiError;

pub use ast::{BinOp, Expr, Script, Stmt};
pub use compiler::BatchCompiler;
pub use plan::{chunk_ids, BatchPlan, ChunkedLookupPlan, MultiEntityPlan, PaginatedPlan, SubCall};
pub use render::{ScriptDialect, VkScript};
pub use walk::PageWalk;

/// A plan that cannot be compiled.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ScriptError {
    #[error("plan issues no sub-calls")]
    Empty,

    #[error("plan needs {requested} sub-calls, limit is {limit} per script")]
    TooManySubcalls { requested: usize, limit: u32 },

    #[error("invalid identifier: {0:?}")]
    InvalidIdentifier(String),

    #[error("invalid method name: {0:?}")]
    InvalidMethod(String),

    #[error("{0}")]
    InvalidPlan(String),
}

impl From<ScriptError> for ApiError {
    fn from(err: ScriptError) -> Self {
        Self::Script(err.to_string())
    }
}
