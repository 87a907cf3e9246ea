use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::constants::{EXECUTE_CODE_PARAM, EXECUTE_METHOD};

/// One logical call: a method name plus its parameters.
///
/// Parameter keys are unique; setting the same key twice keeps the last
/// value. The map is ordered so the encoded form body is deterministic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallSpec {
    method: String,
    params: BTreeMap<String, String>,
}

impl CallSpec {
    pub fn new(method: impl Into<String>) -> Self {
        Self { method: method.into(), params: BTreeMap::new() }
    }

    /// Build an `execute` call carrying the given script text.
    pub fn execute(code: impl Into<String>) -> Self {
        Self::new(EXECUTE_METHOD).param(EXECUTE_CODE_PARAM, code.into())
    }

    /// Add a parameter (builder style).
    #[must_use]
    pub fn param(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.params.insert(key.into(), value.to_string());
        self
    }

    /// Add every parameter from an iterator (builder style).
    #[must_use]
    pub fn params<K, V, I>(mut self, params: I) -> Self
    where
        K: Into<String>,
        V: ToString,
        I: IntoIterator<Item = (K, V)>,
    {
        for (key, value) in params {
            self.params.insert(key.into(), value.to_string());
        }
        self
    }

    pub fn method(&self) -> &str {
        &self.method
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.params.get(key).map(String::as_str)
    }

    pub fn parameters(&self) -> &BTreeMap<String, String> {
        &self.params
    }

    pub fn is_execute(&self) -> bool {
        self.method == EXECUTE_METHOD
    }
}

impl fmt::Display for CallSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({} params)", self.method, self.params.len())
    }
}
