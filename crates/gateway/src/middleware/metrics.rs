//! Per-request metrics keyed by the matched route template

use axum::{
    extract::{MatchedPath, Request},
    middleware::Next,
    response::Response,
};
use talentforge_common::metrics::RequestMetrics;

/// Record request count and latency; install with `route_layer` so the
/// matched path is known
pub async fn track_requests(request: Request, next: Next) -> Response {
    let endpoint = request
        .extensions()
        .get::<MatchedPath>()
        .map(|path| path.as_str().to_string())
        .unwrap_or_else(|| "unmatched".to_string());
    let tracker = RequestMetrics::start(request.method().as_str(), &endpoint);

    let response = next.run(request).await;
    tracker.finish(response.status().as_u16());
    response
}
