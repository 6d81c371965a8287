use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Row};

use crate::{
    db::{
        error::{DbError, DbResult},
        repos::UserRepo,
    },
    models::{CreateUser, User},
};

pub struct PostgresUserRepo {
    pool: PgPool,
}

impl PostgresUserRepo {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserRepo for PostgresUserRepo {
    async fn get_by_idp_subject(
        &self,
        user_id_from_idp: &str,
        idp_code: &str,
    ) -> DbResult<Option<User>> {
        let result = sqlx::query(
            r#"
            SELECT id, user_id_from_idp, idp_code, email, last_login_at, created_at
            FROM users
            WHERE user_id_from_idp = $1 AND idp_code = $2
            "#,
        )
        .bind(user_id_from_idp)
        .bind(idp_code)
        .fetch_optional(&self.pool)
        .await?;

        Ok(result.map(|row| User {
            id: row.get("id"),
            user_id_from_idp: row.get("user_id_from_idp"),
            idp_code: row.get("idp_code"),
            email: row.get("email"),
            last_login_at: row.get("last_login_at"),
            created_at: row.get("created_at"),
        }))
    }

    async fn create(&self, input: CreateUser) -> DbResult<User> {
        let row = sqlx::query(
            r#"
            INSERT INTO users (user_id_from_idp, idp_code, email, last_login_at)
            VALUES ($1, $2, $3, $4)
            RETURNING id, created_at
            "#,
        )
        .bind(&input.user_id_from_idp)
        .bind(&input.idp_code)
        .bind(&input.email)
        .bind(input.last_login_at)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
                DbError::Conflict(format!(
                    "User '{}' from IdP '{}' already exists",
                    input.user_id_from_idp, input.idp_code
                ))
            }
            _ => DbError::from(e),
        })?;

        Ok(User {
            id: row.get("id"),
            user_id_from_idp: input.user_id_from_idp,
            idp_code: input.idp_code,
            email: input.email,
            last_login_at: input.last_login_at,
            created_at: row.get("created_at"),
        })
    }

    async fn record_login(
        &self,
        user_id_from_idp: &str,
        idp_code: &str,
        email: &str,
        at: DateTime<Utc>,
    ) -> DbResult<i64> {
        let row = sqlx::query(
            r#"
            UPDATE users
            SET last_login_at = $1, email = $2
            WHERE user_id_from_idp = $3 AND idp_code = $4
            RETURNING id
            "#,
        )
        .bind(at)
        .bind(email)
        .bind(user_id_from_idp)
        .bind(idp_code)
        .fetch_optional(&self.pool)
        .await?;

        row.map(|r| r.get("id")).ok_or(DbError::NotFound)
    }
}
