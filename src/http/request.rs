//! Request identification.
//!
//! Every request gets an `x-request-id` as early as possible so log lines
//! from different subsystems correlate. Caller-supplied IDs are kept, which
//! lets upstream proxies stitch their traces through this hop.

use axum::body::Body;
use axum::http::{HeaderValue, Request};
use axum::middleware::Next;
use axum::response::Response;
use uuid::Uuid;

pub const X_REQUEST_ID: &str = "x-request-id";

/// Attach a request ID to the request and echo it on the response.
pub async fn request_id_middleware(mut request: Request<Body>, next: Next) -> Response {
    let id = request
        .headers()
        .get(X_REQUEST_ID)
        .and_then(|v| v.to_str().ok())
        .map(ToString::to_string)
        .unwrap_or_else(|| Uuid::new_v4().to_string());

    match HeaderValue::from_str(&id) {
        Ok(value) => {
            request.headers_mut().insert(X_REQUEST_ID, value.clone());
            let mut response = next.run(request).await;
            response.headers_mut().insert(X_REQUEST_ID, value);
            response
        }
        // Unrepresentable caller-supplied ID; proceed without one rather
        // than reject the request over a tracing header.
        Err(_) => next.run(request).await,
    }
}
