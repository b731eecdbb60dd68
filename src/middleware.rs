//! Built-in JSON body parser. It stores the parsed body as a `ParsedBody` request extension;
//! with `disableBodyParser` set, a caller's pre middleware is expected to insert it instead.

use crate::error::CrudError;
use axum::{
    body::Body,
    extract::{Request, State},
    http::Method,
    middleware::Next,
    response::{IntoResponse, Response},
};
use serde_json::Value;

/// Parsed request body as seen by the route handlers.
#[derive(Clone, Debug)]
pub struct ParsedBody(pub Value);

#[derive(Clone, Copy, Debug)]
pub struct BodyLimit(pub usize);

pub async fn parse_json_body(State(limit): State<BodyLimit>, req: Request, next: Next) -> Response {
    if !matches!(*req.method(), Method::POST | Method::PUT | Method::PATCH) {
        return next.run(req).await;
    }
    let (parts, body) = req.into_parts();
    let bytes = match axum::body::to_bytes(body, limit.0).await {
        Ok(b) => b,
        Err(e) => {
            tracing::debug!(error = %e, limit = limit.0, "request body rejected");
            return CrudError::PayloadTooLarge.into_response();
        }
    };
    let value = if bytes.iter().all(u8::is_ascii_whitespace) {
        Value::Object(Default::default())
    } else {
        match serde_json::from_slice(&bytes) {
            Ok(v) => v,
            Err(e) => return CrudError::BadRequest(format!("malformed JSON body: {}", e)).into_response(),
        }
    };
    let mut req = Request::from_parts(parts, Body::from(bytes));
    req.extensions_mut().insert(ParsedBody(value));
    next.run(req).await
}
