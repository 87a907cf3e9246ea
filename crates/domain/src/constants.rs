//! Platform constants
//!
//! Values dictated by the remote method API. Changing any of these breaks
//! interoperability with the platform.

// Method dispatch
pub const API_METHOD_URL: &str = "https://api.vk.com/method/";
pub const API_VERSION: &str = "5.92";
pub const VERSION_PARAM: &str = "v";
pub const ACCESS_TOKEN_PARAM: &str = "access_token";

// Execute (server-side script) facility
pub const EXECUTE_METHOD: &str = "execute";
pub const EXECUTE_CODE_PARAM: &str = "code";
/// Sub-calls the platform allows inside a single execute script.
pub const MAX_SUBCALLS_PER_SCRIPT: u32 = 25;
pub const DEFAULT_PAGE_SIZE: u32 = 1000;

// Flood control
pub const FLOOD_CONTROL_MESSAGE: &str = "Too many requests per second";
pub const FLOOD_CONTROL_CODE: i64 = 6;

/// Prefix of every runtime failure reported by the execute facility.
pub const SCRIPT_RUNTIME_ERROR_PREFIX: &str = "Runtime error occurred during code invocation";
