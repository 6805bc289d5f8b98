//! Request adaptation and identification.
//!
//! # Responsibilities
//! - Extract routing-relevant information (method, path, host, query)
//! - Resolve the effective host (`X-Forwarded-Host` over `Host`)
//! - Attach a request ID as early as possible for tracing

use axum::body::Body;
use axum::http::{header, Request};
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};

use crate::redirects::RequestContext;

pub const X_REQUEST_ID: &str = "x-request-id";
pub const X_FORWARDED_HOST: &str = "x-forwarded-host";

/// Layer that stamps a UUID request ID on requests missing one.
pub fn set_request_id_layer() -> SetRequestIdLayer<MakeRequestUuid> {
    SetRequestIdLayer::x_request_id(MakeRequestUuid)
}

/// Layer that copies the request ID onto the response.
pub fn propagate_request_id_layer() -> PropagateRequestIdLayer {
    PropagateRequestIdLayer::x_request_id()
}

/// Build a [`RequestContext`] from an inbound request.
///
/// Returns `None` when no usable host header is present; callers
/// treat that as "no rule matched" and pass the request through.
pub fn request_context(req: &Request<Body>) -> Option<RequestContext> {
    let host = req
        .headers()
        .get(X_FORWARDED_HOST)
        .or_else(|| req.headers().get(header::HOST))
        .and_then(|value| value.to_str().ok())?
        .to_string();

    let query = req
        .uri()
        .query()
        .map(|q| {
            url::form_urlencoded::parse(q.as_bytes())
                .into_owned()
                .collect()
        })
        .unwrap_or_default();

    Some(RequestContext {
        method: req.method().clone(),
        path: req.uri().path().to_string(),
        host,
        query,
    })
}
