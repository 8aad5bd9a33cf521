use std::str::FromStr;

use async_trait::async_trait;
use sqlx::{postgres::PgRow, PgPool, Row};
use uuid::Uuid;

use crate::bans::models::{Ban, BanKind};
use crate::bans::repositories::BanRepository;
use crate::map_db_err;
use expertline_common::error::{ExpertError, ExpertResult};

#[derive(Clone)]
pub struct PgBanRepository {
    pool: PgPool,
}

impl PgBanRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn map_row(row: &PgRow) -> ExpertResult<Ban> {
        let kind_raw: String = row.get("kind");
        Ok(Ban {
            id: row.get("id"),
            kind: BanKind::from_str(&kind_raw).map_err(ExpertError::Internal)?,
            value: row.get("value"),
            reason: row.get("reason"),
            created_at: row.get("created_at"),
        })
    }
}

#[async_trait]
impl BanRepository for PgBanRepository {
    async fn is_banned(&self, kind: BanKind, value: &str) -> ExpertResult<bool> {
        sqlx::query_scalar::<_, bool>(
            "select exists (select 1 from bans where kind = $1 and value = $2)",
        )
        .bind(kind.as_str())
        .bind(kind.normalize(value))
        .fetch_one(&self.pool)
        .await
        .map_err(map_db_err)
    }

    async fn add(&self, kind: BanKind, value: &str, reason: Option<String>) -> ExpertResult<Ban> {
        let row = sqlx::query(
            "insert into bans (id, kind, value, reason) values ($1, $2, $3, $4)
             on conflict (kind, value) do update set kind = excluded.kind
             returning id, kind, value, reason, created_at",
        )
        .bind(Uuid::new_v4())
        .bind(kind.as_str())
        .bind(kind.normalize(value))
        .bind(reason)
        .fetch_one(&self.pool)
        .await
        .map_err(map_db_err)?;

        Self::map_row(&row)
    }

    async fn list(&self) -> ExpertResult<Vec<Ban>> {
        let rows = sqlx::query(
            "select id, kind, value, reason, created_at from bans order by created_at desc",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(map_db_err)?;

        rows.iter().map(Self::map_row).collect()
    }
}
