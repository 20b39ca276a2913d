//! HTTP response helpers.

use anyhow::Result;
use serde::Serialize;
use tiny_http::{Header, Request, Response, StatusCode};

const JSON: &str = "application/json; charset=utf-8";
const PLAIN: &str = "text/plain; charset=utf-8";

/// Serialize `value` and send it with `status`.
pub fn respond_json<T: Serialize>(request: Request, status: u16, value: &T) -> Result<()> {
    let body = serde_json::to_vec(value)?;
    send_body(request, status, JSON, body)
}

/// Send an already encoded JSON body.
pub fn respond_raw_json(request: Request, status: u16, body: String) -> Result<()> {
    send_body(request, status, JSON, body.into_bytes())
}

/// `{"error": ...}` with `status`.
pub fn respond_error(request: Request, status: u16, message: &str) -> Result<()> {
    respond_json(request, status, &serde_json::json!({ "error": message }))
}

pub fn respond_not_found(request: Request) -> Result<()> {
    respond_error(request, 404, "not found")
}

/// Respond with 503 Service Unavailable (server shutting down).
pub fn respond_unavailable(request: Request) -> Result<()> {
    send_body(request, 503, PLAIN, b"503 Service Unavailable".to_vec())
}

/// CORS preflight: the preview page may be served from another origin.
pub fn respond_preflight(request: Request) -> Result<()> {
    let mut response = Response::empty(StatusCode(204));
    add_cors(&mut response);
    add_header(&mut response, "Access-Control-Allow-Methods", "GET, POST, OPTIONS");
    add_header(&mut response, "Access-Control-Allow-Headers", "Content-Type");
    request.respond(response)?;
    Ok(())
}

fn send_body(request: Request, status: u16, content_type: &str, body: Vec<u8>) -> Result<()> {
    let mut response = Response::from_data(body).with_status_code(StatusCode(status));
    add_header(&mut response, "Content-Type", content_type);
    add_header(&mut response, "Cache-Control", "no-store");
    add_cors(&mut response);
    request.respond(response)?;
    Ok(())
}

fn add_cors<R: std::io::Read>(response: &mut Response<R>) {
    add_header(response, "Access-Control-Allow-Origin", "*");
}

fn add_header<R: std::io::Read>(response: &mut Response<R>, key: &str, value: &str) {
    if let Ok(header) = Header::from_bytes(key, value) {
        response.add_header(header);
    }
}
