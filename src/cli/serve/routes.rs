//! API routes.
//!
//! | Route               | Method | Body                                   |
//! |---------------------|--------|----------------------------------------|
//! | `/api/execute`      | POST   | `ExecuteResponse`                      |
//! | `/api/deck`         | GET    | `{"path", "source"}` of the snapshot   |
//! | `/api/status`       | GET    | `{"clients", "drivers", "wsPort"}`     |
//! | `/api/drivers`      | GET    | registered driver names                |

use serde::Serialize;

use super::ServeContext;

/// Status plus encoded JSON body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiResponse {
    pub status: u16,
    pub body: String,
}

impl ApiResponse {
    fn json<T: Serialize>(status: u16, value: &T) -> Self {
        match serde_json::to_string(value) {
            Ok(body) => Self { status, body },
            Err(e) => Self::error(500, &format!("failed to encode response: {e}")),
        }
    }

    fn error(status: u16, message: &str) -> Self {
        Self {
            status,
            body: serde_json::json!({ "error": message }).to_string(),
        }
    }
}

#[derive(Serialize)]
struct DeckInfo<'a> {
    path: String,
    source: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct StatusInfo {
    clients: usize,
    drivers: Vec<String>,
    ws_port: u16,
}

/// Route one request. `None` means no such route.
pub fn route(ctx: &ServeContext, method: &str, path: &str, body: &[u8]) -> Option<ApiResponse> {
    let is_get = matches!(method, "GET" | "HEAD");

    let response = match path {
        "/api/execute" => {
            let response = ctx.gateway.handle(method, body);
            ApiResponse {
                status: response.status,
                body: response.to_json(),
            }
        }
        "/api/deck" | "/api/status" | "/api/drivers" if !is_get => {
            ApiResponse::error(405, "method not allowed")
        }
        "/api/deck" => {
            let presentation = ctx.store.current();
            ApiResponse::json(
                200,
                &DeckInfo {
                    path: presentation.deck.display().to_string(),
                    source: &presentation.source,
                },
            )
        }
        "/api/status" => ApiResponse::json(
            200,
            &StatusInfo {
                clients: ctx.hub.client_count(),
                drivers: driver_names(ctx),
                ws_port: ctx.ws_port,
            },
        ),
        "/api/drivers" => ApiResponse::json(200, &driver_names(ctx)),
        _ => return None,
    };
    Some(response)
}

fn driver_names(ctx: &ServeContext) -> Vec<String> {
    ctx.gateway
        .registry()
        .map(|registry| registry.names())
        .unwrap_or_default()
}

/// Strip the query string and fragment.
pub fn request_path(url: &str) -> &str {
    url.split(['?', '#']).next().unwrap_or(url)
}
