use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A local reader account.
///
/// Identified by the IdP's opaque subject plus the IdP code: the same subject
/// from two IdPs is two users.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub user_id_from_idp: String,
    pub idp_code: String,
    pub email: String,
    pub last_login_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct CreateUser {
    pub user_id_from_idp: String,
    pub idp_code: String,
    pub email: String,
    pub last_login_at: DateTime<Utc>,
}
