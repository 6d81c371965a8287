use std::{collections::BTreeSet, sync::Arc};

use chrono::Utc;

use super::AccessFilter;
use crate::{
    auth::{AuthError, SamlAssertion, SessionProfile},
    config::AuthConfig,
    db::{DbError, DbPool, DbResult, UserRepo},
    models::{CreateUser, Idp},
    observability::metrics,
};

/// Turns a validated assertion into a local user and a session profile.
#[derive(Clone)]
pub struct LoginProvisioner {
    db: Arc<DbPool>,
    access: AccessFilter,
    config: AuthConfig,
}

impl LoginProvisioner {
    pub fn new(db: Arc<DbPool>, access: AccessFilter, config: AuthConfig) -> Self {
        Self { db, access, config }
    }

    /// Validate, filter, upsert, then assemble. A failed step aborts the
    /// login and no profile is produced.
    #[tracing::instrument(name = "auth.login.provision", skip_all, fields(idp = %idp.code))]
    pub async fn provision(
        &self,
        idp: &Idp,
        assertion: &SamlAssertion,
    ) -> Result<SessionProfile, AuthError> {
        let attrs = &self.config.attributes;

        let (Some(email), Some(subject)) = (
            assertion.attribute(&attrs.email),
            assertion.attribute(&attrs.subject),
        ) else {
            tracing::warn!("Assertion lacks email or subject attribute");
            metrics::record_login(&idp.code, "bad_assertion");
            return Err(AuthError::BadAssertion);
        };

        let is_admin_claim = self.admin_claim(idp, assertion, email);
        let claimed = parse_book_ids(assertion.attribute(&attrs.book_ids).unwrap_or_default());

        let grant = self
            .access
            .compute_accessible_books(&claimed, std::slice::from_ref(&idp.code), is_admin_claim)
            .await
            .inspect_err(|_| metrics::record_login(&idp.code, "store_error"))?;

        let user_id = self
            .upsert_user(subject, &idp.code, email)
            .await
            .inspect_err(|_| metrics::record_login(&idp.code, "store_error"))?;

        let profile = SessionProfile {
            id: user_id,
            email: email.to_string(),
            firstname: assertion
                .attribute(&attrs.given_name)
                .unwrap_or_default()
                .to_string(),
            lastname: assertion
                .attribute(&attrs.surname)
                .unwrap_or_default()
                .to_string(),
            book_ids: grant.book_ids,
            is_admin: grant.is_admin,
            idp_code: idp.code.clone(),
            idp_name: idp.name.clone(),
            idp_logo_src: idp.logo_src.clone(),
            idp_small_logo_src: idp.small_logo().map(String::from),
            idp_lang: idp.language_or_default().to_string(),
            name_id: assertion.name_id.clone(),
            name_id_format: assertion.name_id_format.clone(),
            session_index: assertion.session_index.clone(),
            attributes: Default::default(),
        }
        .with_attributes(assertion.attributes.clone());

        metrics::record_login(&idp.code, "success");
        tracing::info!(
            user_id = profile.id,
            is_admin = profile.is_admin,
            books = profile.book_ids.len(),
            "Login provisioned"
        );
        Ok(profile)
    }

    /// Admin when the IdP asserts it or the email is on the allowlist.
    fn admin_claim(&self, idp: &Idp, assertion: &SamlAssertion, email: &str) -> bool {
        let attribute = idp
            .admin_attribute
            .as_deref()
            .unwrap_or(&self.config.attributes.admin);

        let asserted = assertion.attribute(attribute).is_some_and(is_truthy);
        asserted
            || self
                .config
                .admin_email_set()
                .contains(&email.to_lowercase())
    }

    /// Insert on first login, otherwise refresh email and last-login time.
    /// A concurrent first login surfaces as a conflict and falls back to
    /// the update.
    async fn upsert_user(&self, subject: &str, idp_code: &str, email: &str) -> DbResult<i64> {
        let users: Arc<dyn UserRepo> = self.db.users();
        let now = Utc::now();

        match users.record_login(subject, idp_code, email, now).await {
            Err(DbError::NotFound) => {}
            other => return other,
        }

        let created = users
            .create(CreateUser {
                user_id_from_idp: subject.to_string(),
                idp_code: idp_code.to_string(),
                email: email.to_string(),
                last_login_at: now,
            })
            .await;

        match created {
            Ok(user) => {
                tracing::info!(user_id = user.id, "Created user on first login");
                Ok(user.id)
            }
            Err(DbError::Conflict(_)) => users.record_login(subject, idp_code, email, now).await,
            Err(e) => Err(e),
        }
    }
}

fn is_truthy(value: &str) -> bool {
    !matches!(value.to_ascii_lowercase().as_str(), "" | "0" | "false")
}

/// Space-delimited integers. Unparseable tokens are dropped.
pub(crate) fn parse_book_ids(raw: &str) -> Vec<i64> {
    raw.split_whitespace()
        .filter_map(|token| match token.parse::<i64>() {
            Ok(id) => Some(id),
            Err(_) => {
                tracing::warn!(token, "Ignoring invalid book id in assertion");
                None
            }
        })
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}
