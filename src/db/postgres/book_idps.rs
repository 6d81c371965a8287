use async_trait::async_trait;
use sqlx::{PgPool, Row};

use crate::db::{
    error::DbResult,
    repos::{BookIdpRepo, padded_book_ids, padded_idp_codes},
};

pub struct PostgresBookIdpRepo {
    pool: PgPool,
}

impl PostgresBookIdpRepo {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl BookIdpRepo for PostgresBookIdpRepo {
    async fn licensed_book_ids(
        &self,
        idp_codes: &[String],
        within: Option<&[i64]>,
    ) -> DbResult<Vec<i64>> {
        let codes = padded_idp_codes(idp_codes);

        let rows = match within {
            Some(book_ids) => {
                sqlx::query(
                    r#"
                    SELECT DISTINCT book_id FROM book_idps
                    WHERE idp_code = ANY($1) AND book_id = ANY($2)
                    ORDER BY book_id
                    "#,
                )
                .bind(codes)
                .bind(padded_book_ids(book_ids))
                .fetch_all(&self.pool)
                .await?
            }
            None => {
                sqlx::query(
                    r#"
                    SELECT DISTINCT book_id FROM book_idps
                    WHERE idp_code = ANY($1)
                    ORDER BY book_id
                    "#,
                )
                .bind(codes)
                .fetch_all(&self.pool)
                .await?
            }
        };

        Ok(rows.iter().map(|row| row.get::<i64, _>("book_id")).collect())
    }

    async fn grant(&self, book_id: i64, idp_code: &str) -> DbResult<()> {
        sqlx::query(
            r#"
            INSERT INTO book_idps (book_id, idp_code)
            VALUES ($1, $2)
            ON CONFLICT (book_id, idp_code) DO NOTHING
            "#,
        )
        .bind(book_id)
        .bind(idp_code)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}
