//! SAML login, assertion consumer, metadata and logout endpoints.

use axum::{
    Form,
    extract::{Path, Query, State},
    http::header,
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use tower_cookies::Cookies;

use crate::{
    AppState,
    auth::{AuthError, SamlStrategy},
    db::DbError,
    middleware::found,
    observability::metrics,
};

/// Query parameters for `GET /login`.
#[derive(Debug, Deserialize)]
pub struct LoginQuery {
    /// IdP code. Overrides `auth.default_idp`.
    pub idp: Option<String>,
}

/// Form data from the IdP (HTTP-POST binding).
#[derive(Debug, Deserialize)]
pub struct SamlAcsForm {
    #[serde(rename = "SAMLResponse")]
    pub saml_response: String,
    #[serde(rename = "RelayState")]
    pub relay_state: Option<String>,
}

fn strategy(state: &AppState, code: &str) -> Result<std::sync::Arc<SamlStrategy>, AuthError> {
    state
        .registry
        .get(code)
        .ok_or_else(|| AuthError::UnknownIdp(code.to_string()))
}

/// Only local paths are accepted as post-login destinations.
fn local_redirect(target: Option<String>) -> String {
    target
        .filter(|url| url.starts_with('/') && !url.starts_with("//"))
        .unwrap_or_else(|| "/".to_string())
}

/// Entry point: pick an IdP and hand over to its login route.
#[tracing::instrument(name = "auth.login", skip(state))]
pub async fn login(
    State(state): State<AppState>,
    Query(query): Query<LoginQuery>,
) -> Result<Response, AuthError> {
    let code = query
        .idp
        .filter(|c| !c.is_empty())
        .or_else(|| state.config.auth.default_idp.clone())
        .or_else(|| match state.registry.codes().as_slice() {
            [only] => Some(only.clone()),
            _ => None,
        })
        .ok_or(AuthError::NoIdpSelected)?;

    strategy(&state, &code)?;
    Ok(found(&format!("/login/{code}")))
}

/// Redirect to the IdP with a signed AuthnRequest.
#[tracing::instrument(name = "auth.saml.login", skip(state))]
pub async fn saml_login(
    State(state): State<AppState>,
    Path(code): Path<String>,
) -> Result<Response, AuthError> {
    let strategy = strategy(&state, &code)?;
    let url = strategy.authorization_url(&code)?;

    tracing::info!(idp = %code, "Initiating SAML login");
    Ok(found(&url))
}

/// Assertion consumer: validate the response, provision the user and bind
/// the resulting profile to a fresh session id.
#[tracing::instrument(name = "auth.saml.acs", skip(state, cookies, form))]
pub async fn saml_acs(
    State(state): State<AppState>,
    Path(code): Path<String>,
    cookies: Cookies,
    Form(form): Form<SamlAcsForm>,
) -> Result<Response, AuthError> {
    let strategy = strategy(&state, &code)?;
    let services = state
        .services
        .as_ref()
        .ok_or(AuthError::Store(DbError::NotConfigured))?;

    let assertion = strategy.parse_response(&form.saml_response).map_err(|e| {
        tracing::warn!(idp = %code, error = %e, "Rejected SAML response");
        metrics::record_login(&code, "invalid_response");
        AuthError::from(e)
    })?;

    let profile = services
        .provisioner
        .provision(strategy.idp(), &assertion)
        .await?;

    let mut session = match state.sessions.load(&cookies).await? {
        Some(mut existing) => {
            state.sessions.rotate(&mut existing).await?;
            existing
        }
        None => state.sessions.new_record(),
    };
    let redirect_to = local_redirect(session.login_redirect.take());
    let user_id = profile.id;
    session.profile = Some(profile);
    state.sessions.save(&cookies, &session).await?;

    tracing::info!(idp = %code, user_id, redirect_to = %redirect_to, "SAML session created");
    Ok(found(&redirect_to))
}

/// This service's SP metadata for registration with the IdP.
#[tracing::instrument(name = "auth.saml.metadata", skip(state))]
pub async fn saml_metadata(
    State(state): State<AppState>,
    Path(code): Path<String>,
) -> Result<Response, AuthError> {
    let strategy = strategy(&state, &code)?;
    Ok((
        [(header::CONTENT_TYPE, "application/samlmetadata+xml")],
        strategy.metadata(),
    )
        .into_response())
}

/// Start logout: single logout at the IdP when the session supports it,
/// local completion otherwise.
#[tracing::instrument(name = "auth.logout", skip(state, cookies))]
pub async fn logout(State(state): State<AppState>, cookies: Cookies) -> Result<Response, AuthError> {
    let profile = state
        .sessions
        .load(&cookies)
        .await?
        .and_then(|session| session.profile);

    let Some(profile) = profile else {
        return Ok(found("/logout/callback"));
    };

    let strategy = state
        .registry
        .get(&profile.idp_code)
        .filter(|_| profile.supports_single_logout());
    let slo_url = match strategy {
        Some(strategy) => strategy.logout_url(&profile)?,
        None => None,
    };

    match slo_url {
        Some(url) => {
            tracing::info!(idp = %profile.idp_code, user_id = profile.id, "Redirecting to SLO");
            Ok(found(&url))
        }
        None => {
            tracing::debug!(idp = %profile.idp_code, "No single logout for session");
            Ok(found("/logout/callback"))
        }
    }
}

/// Logout completion: drop the session and go home.
#[tracing::instrument(name = "auth.logout.callback", skip(state, cookies))]
pub async fn logout_callback(
    State(state): State<AppState>,
    cookies: Cookies,
) -> Result<Response, AuthError> {
    state.sessions.destroy(&cookies).await?;
    Ok(found("/"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_local_redirect() {
        assert_eq!(local_redirect(Some("/book/10".into())), "/book/10");
        assert_eq!(local_redirect(Some("/?widget=".into())), "/?widget=");
        assert_eq!(local_redirect(Some("//evil.example".into())), "/");
        assert_eq!(local_redirect(Some("https://evil.example".into())), "/");
        assert_eq!(local_redirect(None), "/");
    }
}
