use async_trait::async_trait;

use crate::{db::error::DbResult, models::Idp};

#[async_trait]
pub trait IdpRepo: Send + Sync {
    /// All configured identity providers, ordered by code.
    async fn list(&self) -> DbResult<Vec<Idp>>;

    /// Insert or replace an IdP keyed by its code.
    async fn upsert(&self, idp: &Idp) -> DbResult<()>;
}
