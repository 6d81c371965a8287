use axum::{
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::Response,
};

use super::gate::found;
use crate::AppState;

/// Redirect plain-HTTP requests to HTTPS when `server.require_https` is set.
///
/// A request is secure when the URI carries the `https` scheme or a proxy
/// reports `x-forwarded-proto: https`.
pub async fn https_redirect_middleware(
    State(state): State<AppState>,
    req: Request,
    next: Next,
) -> Response {
    if !state.config.server.require_https || is_secure(&req) {
        return next.run(req).await;
    }

    let host = req
        .headers()
        .get(header::HOST)
        .and_then(|v| v.to_str().ok())
        .or_else(|| req.uri().authority().map(|a| a.as_str()))
        .unwrap_or_default();
    let path_and_query = req
        .uri()
        .path_and_query()
        .map(|pq| pq.as_str())
        .unwrap_or("/");

    let location = format!("https://{host}{path_and_query}");
    tracing::debug!(%location, "Redirecting to HTTPS");
    found(&location)
}

fn is_secure(req: &Request) -> bool {
    req.uri().scheme_str() == Some("https")
        || req
            .headers()
            .get("x-forwarded-proto")
            .and_then(|v| v.to_str().ok())
            .is_some_and(|proto| proto.eq_ignore_ascii_case("https"))
}
