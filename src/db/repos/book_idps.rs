use async_trait::async_trait;

use crate::db::error::DbResult;

/// Padding value for IdP-code lists. No IdP may use the empty code.
pub const NO_IDP_CODE: &str = "";

/// Padding value for book-id lists. Book ids are positive.
pub const NO_BOOK_ID: i64 = -1;

#[async_trait]
pub trait BookIdpRepo: Send + Sync {
    /// Distinct book ids licensed to any of `idp_codes`, ascending.
    ///
    /// With `within = Some(ids)` only ids from that list are returned. Both
    /// lists are padded with a never-matching sentinel, so an empty list
    /// matches nothing rather than everything.
    async fn licensed_book_ids(
        &self,
        idp_codes: &[String],
        within: Option<&[i64]>,
    ) -> DbResult<Vec<i64>>;

    /// License a book to an IdP. Granting twice is a no-op.
    async fn grant(&self, book_id: i64, idp_code: &str) -> DbResult<()>;
}

/// `idp_codes` followed by [`NO_IDP_CODE`].
pub fn padded_idp_codes(idp_codes: &[String]) -> Vec<String> {
    idp_codes
        .iter()
        .cloned()
        .chain(std::iter::once(NO_IDP_CODE.to_string()))
        .collect()
}

/// `book_ids` followed by [`NO_BOOK_ID`].
pub fn padded_book_ids(book_ids: &[i64]) -> Vec<i64> {
    book_ids
        .iter()
        .copied()
        .chain(std::iter::once(NO_BOOK_ID))
        .collect()
}
