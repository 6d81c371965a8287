use async_trait::async_trait;
use sqlx::{QueryBuilder, Row, Sqlite, SqlitePool};

use crate::db::{
    error::DbResult,
    repos::{BookIdpRepo, padded_book_ids, padded_idp_codes},
};

pub struct SqliteBookIdpRepo {
    pool: SqlitePool,
}

impl SqliteBookIdpRepo {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl BookIdpRepo for SqliteBookIdpRepo {
    async fn licensed_book_ids(
        &self,
        idp_codes: &[String],
        within: Option<&[i64]>,
    ) -> DbResult<Vec<i64>> {
        let mut query: QueryBuilder<Sqlite> =
            QueryBuilder::new("SELECT DISTINCT book_id FROM book_idps WHERE idp_code IN (");
        let mut codes = query.separated(", ");
        for code in padded_idp_codes(idp_codes) {
            codes.push_bind(code);
        }
        codes.push_unseparated(")");

        if let Some(book_ids) = within {
            query.push(" AND book_id IN (");
            let mut ids = query.separated(", ");
            for id in padded_book_ids(book_ids) {
                ids.push_bind(id);
            }
            ids.push_unseparated(")");
        }

        query.push(" ORDER BY book_id");

        let rows = query.build().fetch_all(&self.pool).await?;
        Ok(rows.iter().map(|row| row.get::<i64, _>("book_id")).collect())
    }

    async fn grant(&self, book_id: i64, idp_code: &str) -> DbResult<()> {
        sqlx::query(
            r#"
            INSERT INTO book_idps (book_id, idp_code)
            VALUES (?, ?)
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
