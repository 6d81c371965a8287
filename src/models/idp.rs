use std::fmt;

use serde::{Deserialize, Serialize};

/// An institutional identity provider.
///
/// Loaded once at startup; `code` is the join key against book licences and
/// user rows.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Idp {
    pub code: String,
    pub name: String,
    /// IdP entity id expected as the assertion issuer. Rows without one are
    /// not registered.
    pub entity_id: Option<String>,
    /// Single sign-on endpoint (HTTP-Redirect binding).
    pub entry_point: String,
    /// Single logout endpoint. IdPs without SLO leave this empty.
    pub logout_url: Option<String>,
    /// IdP signing certificate, PEM.
    pub idp_cert: String,
    /// Service-provider private key used for signing and decryption, PEM.
    pub sp_key: String,
    /// Service-provider certificate published in SP metadata, PEM.
    pub sp_cert: String,
    pub language: Option<String>,
    pub logo_src: Option<String>,
    pub small_logo_src: Option<String>,
    /// Assertion attribute carrying the admin claim for this IdP.
    pub admin_attribute: Option<String>,
}

impl Idp {
    /// Non-blank entity id.
    pub fn issuer_entity_id(&self) -> Option<&str> {
        self.entity_id
            .as_deref()
            .map(str::trim)
            .filter(|id| !id.is_empty())
    }

    /// Small logo, defaulting to the regular logo.
    pub fn small_logo(&self) -> Option<&str> {
        self.small_logo_src.as_deref().or(self.logo_src.as_deref())
    }

    pub fn language_or_default(&self) -> &str {
        self.language.as_deref().unwrap_or("en")
    }
}

impl fmt::Debug for Idp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Idp")
            .field("code", &self.code)
            .field("name", &self.name)
            .field("entity_id", &self.entity_id)
            .field("entry_point", &self.entry_point)
            .field("logout_url", &self.logout_url)
            .field("sp_key", &"****")
            .field("language", &self.language)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn idp() -> Idp {
        Idp {
            code: "uni1".into(),
            name: "University One".into(),
            entity_id: None,
            entry_point: "https://idp.uni1.edu/sso".into(),
            logout_url: None,
            idp_cert: "cert".into(),
            sp_key: "super-secret-key".into(),
            sp_cert: "sp-cert".into(),
            language: None,
            logo_src: Some("https://cdn/logo.png".into()),
            small_logo_src: None,
            admin_attribute: None,
        }
    }

    #[test]
    fn test_fallbacks() {
        let idp = idp();
        assert_eq!(idp.small_logo(), Some("https://cdn/logo.png"));
        assert_eq!(idp.language_or_default(), "en");
    }

    #[test]
    fn test_entity_id_never_falls_back_to_entry_point() {
        let mut idp = idp();
        assert_eq!(idp.issuer_entity_id(), None);

        idp.entity_id = Some("  ".into());
        assert_eq!(idp.issuer_entity_id(), None);

        idp.entity_id = Some("https://idp.uni1.edu/idp/shibboleth".into());
        assert_eq!(
            idp.issuer_entity_id(),
            Some("https://idp.uni1.edu/idp/shibboleth")
        );
    }

    #[test]
    fn test_debug_masks_key() {
        let rendered = format!("{:?}", idp());
        assert!(!rendered.contains("super-secret-key"));
        assert!(rendered.contains("uni1"));
    }
}
