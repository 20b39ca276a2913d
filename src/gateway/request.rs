//! Execute endpoint wire types.

use serde::{Deserialize, Serialize};

use crate::exec::ExecResult;

/// Body of `POST /api/execute`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ExecuteRequest {
    #[serde(default)]
    pub driver: String,
    #[serde(default)]
    pub code: String,
    /// Named connection under `[drivers.<driver>.connections]`.
    #[serde(default)]
    pub connection: Option<String>,
}

impl ExecuteRequest {
    pub fn from_json(body: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(body)
    }

    /// Connection name, with blank treated as absent.
    pub fn connection_name(&self) -> Option<&str> {
        self.connection.as_deref().map(str::trim).filter(|s| !s.is_empty())
    }
}

/// Status code plus the result body sent back to the caller.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExecuteResponse {
    #[serde(skip)]
    pub status: u16,
    #[serde(flatten)]
    pub result: ExecResult,
}

impl ExecuteResponse {
    pub fn new(status: u16, result: ExecResult) -> Self {
        Self { status, result }
    }

    pub fn error(status: u16, message: impl Into<String>) -> Self {
        Self::new(status, ExecResult::failed(message))
    }

    /// Mirror a driver result: 200 on success, 500 otherwise.
    pub fn from_result(result: ExecResult) -> Self {
        let status = if result.success { 200 } else { 500 };
        Self::new(status, result)
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| {
            r#"{"success":false,"error":"failed to encode result"}"#.to_string()
        })
    }
}
