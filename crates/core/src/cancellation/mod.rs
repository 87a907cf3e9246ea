//! Process-boundary cancellation
//!
//! Every physical call runs under its own [`CancellationToken`], a child of
//! the caller's token. While the call is on the wire its token is also
//! listed in a [`CancellationRegistry`] so that a process shutdown can abort
//! everything in flight at once.

mod registry;

pub use registry::{call_key, CancellationRegistry, InFlightGuard};
pub use tokio_util::sync::CancellationToken;
