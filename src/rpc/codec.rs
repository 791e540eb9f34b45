//! JSON-RPC wire format.
//!
//! Messages are JSON-serialized and newline-delimited, in the shape a Go
//! `net/rpc/jsonrpc` server reads and writes: requests carry the method, a
//! single-element params array and a numeric id; responses echo the id and
//! carry either `result` or a string `error`.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{PoolctlError, Result};

/// Request from client to manager.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Request {
    pub method: String,
    pub params: Vec<Value>,
    pub id: u64,
}

/// Response from manager to client.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Response {
    pub id: u64,
    #[serde(default)]
    pub result: Value,
    #[serde(default)]
    pub error: Option<String>,
}

impl Request {
    /// Create a request with a single positional argument.
    pub fn new(id: u64, method: impl Into<String>, param: Value) -> Self {
        Self {
            method: method.into(),
            params: vec![param],
            id,
        }
    }

    /// Serialize to JSON line (with newline).
    pub fn to_line(&self) -> Result<String> {
        let mut json = serde_json::to_string(self)?;
        json.push('\n');
        Ok(json)
    }

    /// Deserialize from JSON line.
    #[cfg(test)]
    pub fn from_line(line: &str) -> Result<Self> {
        Ok(serde_json::from_str(line.trim())?)
    }
}

impl Response {
    /// Create a successful response.
    #[cfg(test)]
    pub fn ok(id: u64, result: Value) -> Self {
        Self {
            id,
            result,
            error: None,
        }
    }

    /// Create an error response.
    #[cfg(test)]
    pub fn err(id: u64, message: impl Into<String>) -> Self {
        Self {
            id,
            result: Value::Null,
            error: Some(message.into()),
        }
    }

    #[cfg(test)]
    /// Serialize to JSON line (with newline).
    pub fn to_line(&self) -> Result<String> {
        let mut json = serde_json::to_string(self)?;
        json.push('\n');
        Ok(json)
    }

    /// Deserialize from JSON line.
    pub fn from_line(line: &str) -> Result<Self> {
        serde_json::from_str(line.trim())
            .map_err(|e| PoolctlError::Protocol(format!("malformed response: {e}")))
    }

    /// Match this response to the request it answers and unwrap the result.
    pub fn into_result(self, request: &Request) -> Result<Value> {
        if self.id != request.id {
            return Err(PoolctlError::Protocol(format!(
                "response id {} does not match request id {}",
                self.id, request.id
            )));
        }
        match self.error {
            // Go servers send an empty string for "no error" in some versions.
            Some(message) if !message.is_empty() => {
                Err(PoolctlError::remote(&request.method, message))
            }
            _ => Ok(self.result),
        }
    }
}
