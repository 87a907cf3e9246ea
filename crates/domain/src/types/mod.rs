//! Domain data types
//!
//! Organized by concern:
//! - `call`: logical call specification (method + parameters)
//! - `credential`: bearer access token bound to a client
//! - `envelope`: the platform's response envelope and its error shapes
//! - `page`: return shapes of paginated execute scripts

pub mod call;
pub mod credential;
pub mod envelope;
pub mod page;

pub use call::*;
pub use credential::*;
pub use envelope::*;
pub use page::*;
