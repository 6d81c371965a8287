use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::{
    db::error::DbResult,
    models::{CreateUser, User},
};

#[async_trait]
pub trait UserRepo: Send + Sync {
    async fn get_by_idp_subject(
        &self,
        user_id_from_idp: &str,
        idp_code: &str,
    ) -> DbResult<Option<User>>;

    /// Insert a new user. Fails with `DbError::Conflict` when the
    /// (subject, idp) pair already exists.
    async fn create(&self, input: CreateUser) -> DbResult<User>;

    /// Set email and last-login time on an existing user and return its id.
    /// Fails with `DbError::NotFound` when no row matches.
    async fn record_login(
        &self,
        user_id_from_idp: &str,
        idp_code: &str,
        email: &str,
        at: DateTime<Utc>,
    ) -> DbResult<i64>;
}
