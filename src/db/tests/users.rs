//! Shared tests for UserRepo implementations

use chrono::{Duration, Utc};

use crate::{
    db::{error::DbError, repos::UserRepo},
    models::CreateUser,
};

fn create_user_input(subject: &str, idp_code: &str, email: &str) -> CreateUser {
    CreateUser {
        user_id_from_idp: subject.to_string(),
        idp_code: idp_code.to_string(),
        email: email.to_string(),
        last_login_at: Utc::now(),
    }
}

pub async fn test_create_and_get(repo: &dyn UserRepo) {
    let created = repo
        .create(create_user_input("u-1", "uni1", "a@uni1.edu"))
        .await
        .expect("Failed to create user");

    let fetched = repo
        .get_by_idp_subject("u-1", "uni1")
        .await
        .expect("Failed to query")
        .expect("User should exist");

    assert_eq!(fetched.id, created.id);
    assert_eq!(fetched.email, "a@uni1.edu");
    assert_eq!(fetched.idp_code, "uni1");
}

pub async fn test_get_missing(repo: &dyn UserRepo) {
    let fetched = repo
        .get_by_idp_subject("nobody", "uni1")
        .await
        .expect("Failed to query");
    assert!(fetched.is_none());
}

pub async fn test_same_subject_different_idps_are_distinct(repo: &dyn UserRepo) {
    let a = repo
        .create(create_user_input("u-1", "uni1", "a@uni1.edu"))
        .await
        .expect("Failed to create first user");
    let b = repo
        .create(create_user_input("u-1", "uni2", "a@uni2.edu"))
        .await
        .expect("Failed to create second user");

    assert_ne!(a.id, b.id);
}

pub async fn test_duplicate_is_conflict(repo: &dyn UserRepo) {
    repo.create(create_user_input("u-1", "uni1", "a@uni1.edu"))
        .await
        .expect("Failed to create user");

    let result = repo
        .create(create_user_input("u-1", "uni1", "other@uni1.edu"))
        .await;
    assert!(matches!(result, Err(DbError::Conflict(_))));
}

pub async fn test_record_login_updates_row(repo: &dyn UserRepo) {
    let created = repo
        .create(create_user_input("u-1", "uni1", "old@uni1.edu"))
        .await
        .expect("Failed to create user");

    let later = Utc::now() + Duration::hours(1);
    let id = repo
        .record_login("u-1", "uni1", "new@uni1.edu", later)
        .await
        .expect("Failed to record login");
    assert_eq!(id, created.id);

    let fetched = repo
        .get_by_idp_subject("u-1", "uni1")
        .await
        .expect("Failed to query")
        .expect("User should exist");
    assert_eq!(fetched.email, "new@uni1.edu");
    assert!(fetched.last_login_at > created.last_login_at);
}

pub async fn test_record_login_missing_is_not_found(repo: &dyn UserRepo) {
    let result = repo
        .record_login("ghost", "uni1", "g@uni1.edu", Utc::now())
        .await;
    assert!(matches!(result, Err(DbError::NotFound)));
}

super::harness::backend_tests!(
    crate::db::sqlite::SqliteUserRepo,
    crate::db::postgres::PostgresUserRepo;
    test_create_and_get,
    test_get_missing,
    test_same_subject_different_idps_are_distinct,
    test_duplicate_is_conflict,
    test_record_login_updates_row,
    test_record_login_missing_is_not_found,
);
