//! Shared helpers for infra integration tests.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::Value;
use vkrpc_core::CancellationRegistry;
use vkrpc_domain::RetryConfig;
use vkrpc_infra::{VkClient, VkClientBuilder};
use wiremock::{MockServer, Request, ResponseTemplate};

pub const TOKEN: &str = "integration-token";

/// Install a test-writer subscriber once; later calls are no-ops.
pub fn init_test_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().with_env_filter("debug").try_init();
}

/// Builder pointed at `server`, with its own registry and zero retry delays.
pub fn client_builder(server: &MockServer, registry: Arc<CancellationRegistry>) -> VkClientBuilder {
    VkClient::builder()
        .access_token(TOKEN)
        .api_url(format!("{}/method/", server.uri()))
        .retry(RetryConfig::default().without_delays())
        .registry(registry)
}

pub fn client(server: &MockServer) -> (VkClient, Arc<CancellationRegistry>) {
    let registry = Arc::new(CancellationRegistry::new());
    let client = client_builder(server, Arc::clone(&registry)).build().expect("client");
    (client, registry)
}

/// Decoded form body of a captured request.
pub fn form(request: &Request) -> HashMap<String, String> {
    url::form_urlencoded::parse(&request.body).into_owned().collect()
}

/// Script text of a captured execute request.
pub fn script(request: &Request) -> String {
    form(request).remove("code").unwrap_or_default()
}

/// Right-hand side of `var <name> = ...;` in a rendered script.
pub fn script_var(code: &str, name: &str) -> Option<String> {
    let prefix = format!("var {name} = ");
    code.lines()
        .map(str::trim)
        .find_map(|line| line.strip_prefix(prefix.as_str()))
        .map(|rest| rest.trim_end_matches(';').to_string())
}

pub fn ok(payload: Value) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(serde_json::json!({ "response": payload }))
}

pub fn api_error(code: i64, message: &str) -> ResponseTemplate {
    ResponseTemplate::new(200)
        .set_body_json(serde_json::json!({ "error": { "error_code": code, "error_msg": message } }))
}
