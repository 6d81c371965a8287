//! Request gate.
//!
//! Runs in front of every protected route and decides, in order:
//! 1. a session that already holds a profile passes through
//! 2. bypass mode synthesizes an administrator for the request and passes
//!    through
//! 3. an unauthenticated GET for the library (or an app asking for its user
//!    setup) is sent to `/login`, or gets a widget denial when framed
//! 4. anything else is a 403

use std::sync::LazyLock;

use axum::{
    extract::{Request, State},
    http::{HeaderMap, Method, StatusCode, Uri, header},
    middleware::Next,
    response::{Html, IntoResponse, Response},
};
use regex::Regex;
use tower_cookies::Cookies;

use crate::{
    AppState,
    auth::{AuthError, SessionProfile},
    db::DbError,
    observability::metrics,
};

static LIBRARY_PATH: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^/(book/[^/]*|\?.*)?$").expect("Invalid regex"));

static USER_SETUP_PATH: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^/usersetup\.json").expect("Invalid regex"));

/// Header set by the mobile apps on every request.
pub const APP_REQUEST_HEADER: &str = "app-request";

const WIDGET_DENIAL: &str = r#"
<script>
  parent.postMessage({
      action: 'forbidden',
      iframeid: window.name,
      payload: 'Unable to display book. You are not logged in.',
  }, '*');
</script>
"#;

/// How an unauthenticated request may be answered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestClass {
    /// A library or app setup request that can be sent through login.
    Interactive { app: bool, widget: bool },
    /// Must not be redirected.
    Api,
}

/// Classify a request by method, path and query, and headers.
pub fn classify(method: &Method, uri: &Uri, headers: &HeaderMap) -> RequestClass {
    if method != Method::GET {
        return RequestClass::Api;
    }

    let path_and_query = uri.path_and_query().map(|pq| pq.as_str()).unwrap_or("/");
    let app = headers
        .get(APP_REQUEST_HEADER)
        .is_some_and(|v| !v.as_bytes().is_empty());

    let interactive = LIBRARY_PATH.is_match(path_and_query)
        || (app && USER_SETUP_PATH.is_match(path_and_query));
    if !interactive {
        return RequestClass::Api;
    }

    let widget = uri.query().is_some_and(|query| {
        url::form_urlencoded::parse(query.as_bytes()).any(|(k, v)| k == "widget" && !v.is_empty())
    });

    RequestClass::Interactive { app, widget }
}

/// What the gate did with a request. Used for logging and metrics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateDecision {
    Allow,
    Bypass,
    WidgetDenied,
    RedirectToLogin,
    Reject,
}

impl GateDecision {
    pub fn as_str(self) -> &'static str {
        match self {
            GateDecision::Allow => "allow",
            GateDecision::Bypass => "bypass",
            GateDecision::WidgetDenied => "widget_denied",
            GateDecision::RedirectToLogin => "redirect",
            GateDecision::Reject => "reject",
        }
    }
}

fn record(decision: GateDecision, uri: &Uri) {
    tracing::debug!(decision = decision.as_str(), path = %uri.path(), "Gate decision");
    metrics::record_gate_decision(decision.as_str());
}

pub(crate) fn found(location: &str) -> Response {
    (StatusCode::FOUND, [(header::LOCATION, location.to_string())]).into_response()
}

/// Middleware guarding the library. On pass-through the caller's
/// [`SessionProfile`] is added to the request extensions.
pub async fn gate_middleware(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, AuthError> {
    let cookies = req
        .extensions()
        .get::<Cookies>()
        .cloned()
        .ok_or_else(|| AuthError::Internal("cookie manager layer missing".into()))?;

    let session = state.sessions.load(&cookies).await?;

    if let Some(profile) = session.as_ref().and_then(|s| s.profile.clone()) {
        record(GateDecision::Allow, req.uri());
        req.extensions_mut().insert(profile);
        return Ok(next.run(req).await);
    }

    let bypass = &state.config.auth.bypass;
    if bypass.enabled {
        let services = state
            .services
            .as_ref()
            .ok_or(AuthError::Store(DbError::NotConfigured))?;
        let grant = services
            .access
            .compute_accessible_books(&[], std::slice::from_ref(&bypass.idp_code), true)
            .await?;
        // Per request only; never written to the session.
        let profile = SessionProfile::bypass(bypass, grant.book_ids);

        record(GateDecision::Bypass, req.uri());
        req.extensions_mut().insert(profile);
        return Ok(next.run(req).await);
    }

    match classify(req.method(), req.uri(), req.headers()) {
        RequestClass::Interactive { widget: true, .. } => {
            record(GateDecision::WidgetDenied, req.uri());
            Ok(Html(WIDGET_DENIAL).into_response())
        }
        RequestClass::Interactive { app, .. } => {
            let mut session = session.unwrap_or_else(|| state.sessions.new_record());
            session.login_redirect = req.uri().path_and_query().map(|pq| pq.to_string());
            if app && let Some(max_age) = state.sessions.config().app_duration_secs {
                tracing::debug!(max_age, "Extending session lifetime for app request");
                session.set_max_age(max_age);
            }
            state.sessions.save(&cookies, &session).await?;

            record(GateDecision::RedirectToLogin, req.uri());
            Ok(found("/login"))
        }
        RequestClass::Api => {
            record(GateDecision::Reject, req.uri());
            Err(AuthError::Unauthorized)
        }
    }
}

#[cfg(test)]
mod tests {
    use axum::http::HeaderValue;
    use rstest::rstest;

    use super::*;

    fn headers(app: Option<&str>) -> HeaderMap {
        let mut headers = HeaderMap::new();
        if let Some(value) = app {
            headers.insert(APP_REQUEST_HEADER, HeaderValue::from_str(value).unwrap());
        }
        headers
    }

    #[rstest]
    #[case("/", None, RequestClass::Interactive { app: false, widget: false })]
    #[case("/?book=10", None, RequestClass::Interactive { app: false, widget: false })]
    #[case("/book/10", None, RequestClass::Interactive { app: false, widget: false })]
    #[case("/book/", None, RequestClass::Interactive { app: false, widget: false })]
    #[case("/book/10?widget=1", None, RequestClass::Interactive { app: false, widget: true })]
    #[case("/?widget=", None, RequestClass::Interactive { app: false, widget: false })]
    #[case("/book/10", Some("1"), RequestClass::Interactive { app: true, widget: false })]
    #[case("/usersetup.json", Some("1"), RequestClass::Interactive { app: true, widget: false })]
    #[case("/usersetup.json", None, RequestClass::Api)]
    #[case("/usersetup.json", Some(""), RequestClass::Api)]
    #[case("/book/10/chapter1.xhtml", None, RequestClass::Api)]
    #[case("/epub_content/book_10/content.opf", None, RequestClass::Api)]
    #[case("/api/highlights", None, RequestClass::Api)]
    fn test_classify_get(
        #[case] uri: &str,
        #[case] app: Option<&str>,
        #[case] expected: RequestClass,
    ) {
        let uri: Uri = uri.parse().unwrap();
        assert_eq!(classify(&Method::GET, &uri, &headers(app)), expected);
    }

    #[rstest]
    #[case(Method::POST)]
    #[case(Method::HEAD)]
    #[case(Method::DELETE)]
    fn test_non_get_is_api(#[case] method: Method) {
        let uri: Uri = "/book/10".parse().unwrap();
        assert_eq!(classify(&method, &uri, &headers(None)), RequestClass::Api);
    }

    #[test]
    fn test_found_is_302() {
        let response = found("/login");
        assert_eq!(response.status(), StatusCode::FOUND);
        assert_eq!(response.headers()[header::LOCATION], "/login");
    }
}
