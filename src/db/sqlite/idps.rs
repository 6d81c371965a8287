use async_trait::async_trait;
use sqlx::{Row, SqlitePool, sqlite::SqliteRow};

use crate::{
    db::{error::DbResult, repos::IdpRepo},
    models::Idp,
};

pub struct SqliteIdpRepo {
    pool: SqlitePool,
}

impl SqliteIdpRepo {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    fn idp_from_row(row: &SqliteRow) -> Idp {
        Idp {
            code: row.get("code"),
            name: row.get("name"),
            entity_id: row.get("entity_id"),
            entry_point: row.get("entry_point"),
            logout_url: row.get("logout_url"),
            idp_cert: row.get("idp_cert"),
            sp_key: row.get("sp_key"),
            sp_cert: row.get("sp_cert"),
            language: row.get("language"),
            logo_src: row.get("logo_src"),
            small_logo_src: row.get("small_logo_src"),
            admin_attribute: row.get("admin_attribute"),
        }
    }
}

#[async_trait]
impl IdpRepo for SqliteIdpRepo {
    async fn list(&self) -> DbResult<Vec<Idp>> {
        let rows = sqlx::query(
            r#"
            SELECT code, name, entity_id, entry_point, logout_url, idp_cert, sp_key, sp_cert,
                   language, logo_src, small_logo_src, admin_attribute
            FROM idps
            ORDER BY code
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(Self::idp_from_row).collect())
    }

    async fn upsert(&self, idp: &Idp) -> DbResult<()> {
        sqlx::query(
            r#"
            INSERT INTO idps (code, name, entity_id, entry_point, logout_url, idp_cert, sp_key,
                              sp_cert, language, logo_src, small_logo_src, admin_attribute)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT (code) DO UPDATE SET
                name = excluded.name,
                entity_id = excluded.entity_id,
                entry_point = excluded.entry_point,
                logout_url = excluded.logout_url,
                idp_cert = excluded.idp_cert,
                sp_key = excluded.sp_key,
                sp_cert = excluded.sp_cert,
                language = excluded.language,
                logo_src = excluded.logo_src,
                small_logo_src = excluded.small_logo_src,
                admin_attribute = excluded.admin_attribute
            "#,
        )
        .bind(&idp.code)
        .bind(&idp.name)
        .bind(&idp.entity_id)
        .bind(&idp.entry_point)
        .bind(&idp.logout_url)
        .bind(&idp.idp_cert)
        .bind(&idp.sp_key)
        .bind(&idp.sp_cert)
        .bind(&idp.language)
        .bind(&idp.logo_src)
        .bind(&idp.small_logo_src)
        .bind(&idp.admin_attribute)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}
