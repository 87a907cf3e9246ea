//! HTTP transport for the method endpoint

pub mod transport;

pub use transport::{HttpTransport, HttpTransportBuilder};
