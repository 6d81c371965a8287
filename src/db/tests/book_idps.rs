//! Shared tests for BookIdpRepo implementations

use crate::db::repos::BookIdpRepo;

async fn seed(repo: &dyn BookIdpRepo) {
    for (book_id, code) in [(10, "uni1"), (20, "uni1"), (20, "uni2"), (30, "uni2"), (40, "uni3")] {
        repo.grant(book_id, code).await.expect("Failed to grant");
    }
}

fn codes(codes: &[&str]) -> Vec<String> {
    codes.iter().map(|c| c.to_string()).collect()
}

pub async fn test_all_books_for_idps(repo: &dyn BookIdpRepo) {
    seed(repo).await;

    let ids = repo
        .licensed_book_ids(&codes(&["uni1", "uni2"]), None)
        .await
        .expect("Failed to query");
    assert_eq!(ids, vec![10, 20, 30]);
}

pub async fn test_books_within_claimed(repo: &dyn BookIdpRepo) {
    seed(repo).await;

    let ids = repo
        .licensed_book_ids(&codes(&["uni1"]), Some(&[30, 20, 99]))
        .await
        .expect("Failed to query");
    assert_eq!(ids, vec![20]);
}

pub async fn test_empty_claim_matches_nothing(repo: &dyn BookIdpRepo) {
    seed(repo).await;

    let ids = repo
        .licensed_book_ids(&codes(&["uni1"]), Some(&[]))
        .await
        .expect("Failed to query");
    assert!(ids.is_empty());
}

pub async fn test_empty_idp_list_matches_nothing(repo: &dyn BookIdpRepo) {
    seed(repo).await;

    let ids = repo
        .licensed_book_ids(&[], None)
        .await
        .expect("Failed to query");
    assert!(ids.is_empty());
}

pub async fn test_unknown_idp_matches_nothing(repo: &dyn BookIdpRepo) {
    seed(repo).await;

    let ids = repo
        .licensed_book_ids(&codes(&["nowhere"]), Some(&[10, 20]))
        .await
        .expect("Failed to query");
    assert!(ids.is_empty());
}

pub async fn test_grant_is_idempotent(repo: &dyn BookIdpRepo) {
    repo.grant(10, "uni1").await.expect("Failed to grant");
    repo.grant(10, "uni1").await.expect("Second grant should be a no-op");

    let ids = repo
        .licensed_book_ids(&codes(&["uni1"]), None)
        .await
        .expect("Failed to query");
    assert_eq!(ids, vec![10]);
}

pub async fn test_sentinel_values_cannot_be_granted(repo: &dyn BookIdpRepo) {
    assert!(repo.grant(-1, "uni1").await.is_err());
    assert!(repo.grant(0, "uni1").await.is_err());
    assert!(repo.grant(10, "").await.is_err());

    let ids = repo
        .licensed_book_ids(&codes(&["uni1"]), None)
        .await
        .expect("Failed to query");
    assert!(ids.is_empty());
}

super::harness::backend_tests!(
    crate::db::sqlite::SqliteBookIdpRepo,
    crate::db::postgres::PostgresBookIdpRepo;
    test_all_books_for_idps,
    test_books_within_claimed,
    test_empty_claim_matches_nothing,
    test_empty_idp_list_matches_nothing,
    test_unknown_idp_matches_nothing,
    test_grant_is_idempotent,
    test_sentinel_values_cannot_be_granted,
);
