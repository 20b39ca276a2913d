//! Execute Gateway
//!
//! Request/response boundary in front of the [`Registry`]:
//!
//! 1. Check method and parse the body
//! 2. Resolve the connection from the current presentation's `[drivers]`
//! 3. Resolve the timeout (driver override, else `[execute] timeout`)
//! 4. Run under a deadline and mirror the result
//!
//! | Condition                  | Status |
//! |----------------------------|--------|
//! | not `POST`                 | 405    |
//! | no registry                | 500    |
//! | unparseable body           | 400    |
//! | empty `driver`             | 400    |
//! | unknown driver             | 400    |
//! | unknown named connection   | 400    |
//! | execution failed           | 500    |
//! | success                    | 200    |

pub mod request;

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;

pub use request::{ExecuteRequest, ExecuteResponse};

use crate::config::{PresentationConfig, PresentationStore};
use crate::debug;
use crate::exec::{Deadline, DriverConfig, Registry};

/// Largest accepted request body.
pub const MAX_BODY_BYTES: usize = 1024 * 1024;

/// Execute endpoint handler, shared by every HTTP worker.
#[derive(Clone)]
pub struct Gateway {
    registry: Option<Arc<Registry>>,
    store: Arc<PresentationStore>,
}

impl Gateway {
    pub fn new(registry: Option<Arc<Registry>>, store: Arc<PresentationStore>) -> Self {
        Self { registry, store }
    }

    pub fn registry(&self) -> Option<&Registry> {
        self.registry.as_deref()
    }

    /// Handle one request. Blocks for the duration of the execution.
    pub fn handle(&self, method: &str, body: &[u8]) -> ExecuteResponse {
        if !method.eq_ignore_ascii_case("POST") {
            return ExecuteResponse::error(405, "method not allowed");
        }
        let Some(registry) = self.registry.as_deref() else {
            return ExecuteResponse::error(500, "execution registry not configured");
        };
        if body.len() > MAX_BODY_BYTES {
            return ExecuteResponse::error(400, "request body too large");
        }

        let request = match ExecuteRequest::from_json(body) {
            Ok(request) => request,
            Err(e) => return ExecuteResponse::error(400, format!("invalid request body: {e}")),
        };

        let response = self.dispatch(registry, &request);
        debug!(
            "exec";
            "{} -> {}{}",
            if request.driver.is_empty() { "?" } else { &request.driver },
            response.status,
            response.result.error.as_deref().map(|e| format!(" ({e})")).unwrap_or_default()
        );
        response
    }

    fn dispatch(&self, registry: &Registry, request: &ExecuteRequest) -> ExecuteResponse {
        let driver = request.driver.trim();
        if driver.is_empty() {
            return ExecuteResponse::error(400, "driver field is required");
        }
        if !registry.has(driver) {
            return ExecuteResponse::error(400, format!("driver not found: {driver}"));
        }

        // Snapshot once so connection and timeout come from the same config
        let presentation = self.store.current();
        match resolve(&presentation.config, driver, request.connection_name()) {
            Ok(plan) => ExecuteResponse::from_result(registry.execute(
                plan.deadline,
                driver,
                &request.code,
                &plan.settings,
            )),
            Err(e) => ExecuteResponse::error(e.status(), e.to_string()),
        }
    }
}

/// Why a known driver could not be given settings and a deadline.
#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("connection not found: {name} (driver {driver})")]
    UnknownConnection { driver: String, name: String },

    #[error("invalid timeout: {}s", .0.as_secs())]
    InvalidTimeout(Duration),
}

impl ResolveError {
    pub fn status(&self) -> u16 {
        match self {
            Self::UnknownConnection { .. } => 400,
            Self::InvalidTimeout(_) => 500,
        }
    }
}

/// Connection settings and deadline for one execution.
#[derive(Debug)]
pub struct ExecPlan {
    pub settings: DriverConfig,
    pub timeout: Duration,
    pub deadline: Deadline,
}

/// Resolve the connection and timeout for `driver` from one config.
///
/// Shared by the execute endpoint and `lectern exec`.
pub fn resolve(
    config: &PresentationConfig,
    driver: &str,
    connection: Option<&str>,
) -> Result<ExecPlan, ResolveError> {
    let settings = config.drivers.connection(driver, connection).ok_or_else(|| {
        ResolveError::UnknownConnection {
            driver: driver.to_string(),
            name: connection.unwrap_or_default().to_string(),
        }
    })?;

    let timeout = config.timeout_for(driver);
    let deadline = Deadline::after(timeout).ok_or(ResolveError::InvalidTimeout(timeout))?;

    Ok(ExecPlan {
        settings,
        timeout,
        deadline,
    })
}
