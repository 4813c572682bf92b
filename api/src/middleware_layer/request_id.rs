use axum::{
    body::Body,
    http::{HeaderName, HeaderValue, Request},
    middleware::Next,
    response::Response,
};
use chrono::Utc;
use tracing::{Instrument, info_span};

pub static REQUEST_ID: HeaderName = HeaderName::from_static("x-request-id");

/// Reuses the caller's non-blank `X-Request-Id` or mints `req-<nanos>`.
fn request_id_of(req: &Request<Body>) -> HeaderValue {
    if let Some(h) = req.headers().get(&REQUEST_ID) {
        if h.to_str().is_ok_and(|v| !v.trim().is_empty()) {
            return h.clone();
        }
    }
    let nanos = Utc::now()
        .timestamp_nanos_opt()
        .unwrap_or_else(|| Utc::now().timestamp_micros() * 1000);
    // ASCII digits only, always a valid header value.
    HeaderValue::from_str(&format!("req-{nanos}")).unwrap_or(HeaderValue::from_static("req-0"))
}

/// Tags the request span and the response with a request id.
pub async fn request_id(req: Request<Body>, next: Next) -> Response {
    let id = request_id_of(&req);
    let span = info_span!(
        "http_request",
        request_id = id.to_str().unwrap_or_default(),
        method = %req.method(),
        path = req.uri().path()
    );

    let mut res = next.run(req).instrument(span).await;
    res.headers_mut().insert(REQUEST_ID.clone(), id);
    res
}
