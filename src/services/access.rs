use std::{collections::BTreeSet, sync::Arc};

use crate::db::{BookIdpRepo, DbPool, DbResult};

/// The authoritative entitlement for one login.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AccessGrant {
    pub book_ids: BTreeSet<i64>,
    pub is_admin: bool,
}

/// Reconciles claimed book entitlements with the books licensed to an IdP.
#[derive(Clone)]
pub struct AccessFilter {
    db: Arc<DbPool>,
}

impl AccessFilter {
    pub fn new(db: Arc<DbPool>) -> Self {
        Self { db }
    }

    fn book_idps(&self) -> Arc<dyn BookIdpRepo> {
        self.db.book_idps()
    }

    /// Compute the books a reader may open.
    ///
    /// Admin status holds only for a true claim through exactly one IdP; an
    /// admin gets every book licensed to that IdP. Everyone else gets the
    /// claimed ids that are also licensed to one of `idp_codes`. Lookup errors
    /// propagate; there is no fallback set.
    #[tracing::instrument(name = "access.filter", skip(self, claimed), fields(claimed = claimed.len()))]
    pub async fn compute_accessible_books(
        &self,
        claimed: &[i64],
        idp_codes: &[String],
        is_admin_claim: bool,
    ) -> DbResult<AccessGrant> {
        let is_admin = is_admin_claim && idp_codes.len() == 1;
        if is_admin_claim && !is_admin {
            tracing::debug!(
                idp_count = idp_codes.len(),
                "Admin claim ignored for multi-IdP login"
            );
        }

        let within = if is_admin { None } else { Some(claimed) };
        let book_ids = self
            .book_idps()
            .licensed_book_ids(idp_codes, within)
            .await?
            .into_iter()
            .collect();

        Ok(AccessGrant { book_ids, is_admin })
    }
}
