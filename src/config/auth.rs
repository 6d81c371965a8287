use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use super::ConfigError;

/// Sign-on configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AuthConfig {
    /// Space-delimited list of e-mail addresses that are always granted the
    /// admin claim. Compared case-insensitively.
    #[serde(default)]
    pub admin_emails: String,

    /// IdP used by `GET /login` when the request does not name one.
    #[serde(default)]
    pub default_idp: Option<String>,

    #[serde(default)]
    pub session: SessionConfig,

    #[serde(default)]
    pub bypass: BypassConfig,

    #[serde(default)]
    pub attributes: AttributeMapping,
}

impl AuthConfig {
    /// The admin allowlist, lowercased.
    pub fn admin_email_set(&self) -> HashSet<String> {
        self.admin_emails
            .split_whitespace()
            .map(str::to_lowercase)
            .collect()
    }

    pub(super) fn validate(&self) -> Result<(), ConfigError> {
        self.session.validate()?;
        if self.bypass.enabled {
            if self.bypass.idp_code.is_empty() {
                return Err(ConfigError::Validation(
                    "auth.bypass.idp_code cannot be empty".into(),
                ));
            }
            tracing::warn!(
                idp_code = %self.bypass.idp_code,
                "Authentication bypass is enabled: every request runs as a synthetic administrator"
            );
        }
        Ok(())
    }
}

/// Session cookie configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SessionConfig {
    /// Cookie name.
    #[serde(default = "default_session_cookie")]
    pub cookie_name: String,

    /// Session duration in seconds.
    #[serde(default = "default_session_duration")]
    pub duration_secs: u64,

    /// Lifetime used instead of `duration_secs` when an unauthenticated
    /// request carrying the `app-request` header is sent to log in.
    #[serde(default)]
    pub app_duration_secs: Option<u64>,

    /// Secure cookie (HTTPS only).
    #[serde(default = "default_true")]
    pub secure: bool,

    /// SameSite cookie attribute. SAML responses arrive as a cross-site POST,
    /// so `strict` would drop the cookie on the assertion consumer.
    #[serde(default)]
    pub same_site: SameSite,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            cookie_name: default_session_cookie(),
            duration_secs: default_session_duration(),
            app_duration_secs: None,
            secure: true,
            same_site: SameSite::default(),
        }
    }
}

impl SessionConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        if self.cookie_name.is_empty() {
            return Err(ConfigError::Validation(
                "auth.session.cookie_name cannot be empty".into(),
            ));
        }
        if self.duration_secs == 0 {
            return Err(ConfigError::Validation(
                "auth.session.duration_secs must be greater than 0".into(),
            ));
        }
        if self.app_duration_secs == Some(0) {
            return Err(ConfigError::Validation(
                "auth.session.app_duration_secs must be greater than 0".into(),
            ));
        }
        Ok(())
    }
}

fn default_session_cookie() -> String {
    "readgate_session".to_string()
}

fn default_session_duration() -> u64 {
    86400 * 7
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SameSite {
    #[default]
    Lax,
    Strict,
    None,
}

/// Fixed identity used when authentication is bypassed.
///
/// Meant for local and offline operation only. The synthesized user is an
/// administrator of `idp_code` and sees every book licensed to it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BypassConfig {
    #[serde(default)]
    pub enabled: bool,

    #[serde(default = "default_bypass_user_id")]
    pub user_id: i64,

    #[serde(default = "default_bypass_email")]
    pub email: String,

    #[serde(default = "default_bypass_firstname")]
    pub firstname: String,

    #[serde(default = "default_bypass_lastname")]
    pub lastname: String,

    #[serde(default = "default_bypass_idp_code")]
    pub idp_code: String,

    #[serde(default = "default_bypass_idp_name")]
    pub idp_name: String,

    #[serde(default)]
    pub idp_logo_src: Option<String>,

    #[serde(default)]
    pub idp_small_logo_src: Option<String>,

    #[serde(default = "default_language")]
    pub idp_lang: String,
}

impl Default for BypassConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            user_id: default_bypass_user_id(),
            email: default_bypass_email(),
            firstname: default_bypass_firstname(),
            lastname: default_bypass_lastname(),
            idp_code: default_bypass_idp_code(),
            idp_name: default_bypass_idp_name(),
            idp_logo_src: None,
            idp_small_logo_src: None,
            idp_lang: default_language(),
        }
    }
}

fn default_bypass_user_id() -> i64 {
    1
}

fn default_bypass_email() -> String {
    "local@localhost".to_string()
}

fn default_bypass_firstname() -> String {
    "Local".to_string()
}

fn default_bypass_lastname() -> String {
    "Reader".to_string()
}

fn default_bypass_idp_code() -> String {
    "local".to_string()
}

fn default_bypass_idp_name() -> String {
    "Local Library".to_string()
}

pub fn default_language() -> String {
    "en".to_string()
}

/// Names of the SAML attributes read at login.
///
/// Matched against both `Name` and `FriendlyName` of each assertion attribute.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AttributeMapping {
    #[serde(default = "default_email_attribute")]
    pub email: String,

    /// Opaque subject identifier issued by the IdP.
    #[serde(default = "default_subject_attribute")]
    pub subject: String,

    /// Admin claim. An IdP row may override this per provider.
    #[serde(default = "default_admin_attribute")]
    pub admin: String,

    #[serde(default = "default_given_name_attribute")]
    pub given_name: String,

    #[serde(default = "default_surname_attribute")]
    pub surname: String,

    /// Space-delimited list of claimed book ids.
    #[serde(default = "default_book_ids_attribute")]
    pub book_ids: String,
}

impl Default for AttributeMapping {
    fn default() -> Self {
        Self {
            email: default_email_attribute(),
            subject: default_subject_attribute(),
            admin: default_admin_attribute(),
            given_name: default_given_name_attribute(),
            surname: default_surname_attribute(),
            book_ids: default_book_ids_attribute(),
        }
    }
}

fn default_email_attribute() -> String {
    "urn:oid:0.9.2342.19200300.100.1.3".to_string()
}

fn default_subject_attribute() -> String {
    "idpUserId".to_string()
}

fn default_admin_attribute() -> String {
    "isAdmin".to_string()
}

fn default_given_name_attribute() -> String {
    "urn:oid:2.5.4.42".to_string()
}

fn default_surname_attribute() -> String {
    "urn:oid:2.5.4.4".to_string()
}

fn default_book_ids_attribute() -> String {
    "bookIds".to_string()
}
