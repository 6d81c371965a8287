//! The user profile bound to an authenticated session.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::config::BypassConfig;

/// Keys owned by [`SessionProfile`]'s own fields. Assertion attributes with
/// these names are dropped so derived values always win.
const RESERVED_KEYS: &[&str] = &[
    "id",
    "email",
    "firstname",
    "lastname",
    "bookIds",
    "isAdmin",
    "idpCode",
    "idpName",
    "idpLogoSrc",
    "idpSmallLogoSrc",
    "idpLang",
    "nameID",
    "nameIDFormat",
    "sessionIndex",
];

/// Session-scoped view of the signed-in reader.
///
/// Serialized in camelCase; this is also the `/usersetup.json` document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionProfile {
    /// Local user id.
    pub id: i64,
    pub email: String,
    pub firstname: String,
    pub lastname: String,
    /// Books this reader may open. Always the access filter's output.
    pub book_ids: BTreeSet<i64>,
    pub is_admin: bool,
    pub idp_code: String,
    pub idp_name: String,
    pub idp_logo_src: Option<String>,
    pub idp_small_logo_src: Option<String>,
    pub idp_lang: String,
    #[serde(rename = "nameID")]
    pub name_id: Option<String>,
    #[serde(rename = "nameIDFormat")]
    pub name_id_format: Option<String>,
    pub session_index: Option<String>,
    /// Remaining assertion attributes, passed through as-is.
    #[serde(flatten)]
    pub attributes: BTreeMap<String, String>,
}

impl SessionProfile {
    /// Replace the pass-through attributes, dropping reserved keys.
    pub fn with_attributes(mut self, attributes: BTreeMap<String, String>) -> Self {
        self.attributes = attributes
            .into_iter()
            .filter(|(key, _)| !RESERVED_KEYS.contains(&key.as_str()))
            .collect();
        self
    }

    /// Whether the IdP can be asked to end the federated session.
    pub fn supports_single_logout(&self) -> bool {
        self.name_id.is_some() && self.name_id_format.is_some()
    }

    /// The fixed administrator used when authentication is bypassed.
    pub fn bypass(config: &BypassConfig, book_ids: BTreeSet<i64>) -> Self {
        Self {
            id: config.user_id,
            email: config.email.clone(),
            firstname: config.firstname.clone(),
            lastname: config.lastname.clone(),
            book_ids,
            is_admin: true,
            idp_code: config.idp_code.clone(),
            idp_name: config.idp_name.clone(),
            idp_logo_src: config.idp_logo_src.clone(),
            idp_small_logo_src: config
                .idp_small_logo_src
                .clone()
                .or_else(|| config.idp_logo_src.clone()),
            idp_lang: config.idp_lang.clone(),
            name_id: None,
            name_id_format: None,
            session_index: None,
            attributes: BTreeMap::new(),
        }
    }
}
