use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{postgres::PgRow, PgPool, Postgres, QueryBuilder, Row, Transaction};
use uuid::Uuid;

use crate::map_db_err;
use crate::moderation::models::{
    ModerationFilter, ModerationRecord, NewModerationRecord, ParticipantSnapshot, SenderRole,
};
use crate::moderation::repositories::ModerationRepository;
use expertline_common::error::{ExpertError, ExpertResult};

#[derive(Clone)]
pub struct PgModerationRepository {
    pool: PgPool,
}

impl PgModerationRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn snapshot_to_json(snapshot: &Option<ParticipantSnapshot>) -> Option<serde_json::Value> {
    snapshot
        .as_ref()
        .and_then(|s| serde_json::to_value(s).ok())
}

fn map_record_row(row: &PgRow) -> ExpertResult<ModerationRecord> {
    let role_raw: String = row.get("sender_role");
    let sender_role = SenderRole::from_str(&role_raw).map_err(ExpertError::Internal)?;
    let asker: Option<serde_json::Value> = row.get("asker");
    let expert: Option<serde_json::Value> = row.get("expert");

    Ok(ModerationRecord {
        id: row.get("id"),
        message_id: row.get("message_id"),
        session_id: row.get("session_id"),
        sender: row.get("sender"),
        sender_role,
        original_text: row.get("original_text"),
        redacted_text: row.get("redacted_text"),
        offending_token: row.get("offending_token"),
        asker: asker.and_then(|v| serde_json::from_value(v).ok()),
        expert: expert.and_then(|v| serde_json::from_value(v).ok()),
        question_topic: row.get("question_topic"),
        question_body: row.get("question_body"),
        created_at: row.get("created_at"),
    })
}

/// Insert an audit record inside the caller's transaction. `message_id` is
/// unique, so a second record for the same message fails with `Conflict`.
pub(crate) async fn insert_record(
    tx: &mut Transaction<'_, Postgres>,
    record: &NewModerationRecord,
    message_id: Uuid,
    created_at: DateTime<Utc>,
) -> ExpertResult<()> {
    sqlx::query(
        "insert into moderation_records
         (id, message_id, session_id, sender, sender_role, original_text, redacted_text,
          offending_token, asker, expert, question_topic, question_body, created_at)
         values ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)",
    )
    .bind(record.id)
    .bind(message_id)
    .bind(record.session_id)
    .bind(&record.sender)
    .bind(record.sender_role.as_str())
    .bind(&record.original_text)
    .bind(&record.redacted_text)
    .bind(&record.offending_token)
    .bind(snapshot_to_json(&record.asker))
    .bind(snapshot_to_json(&record.expert))
    .bind(&record.question_topic)
    .bind(&record.question_body)
    .bind(created_at)
    .execute(&mut **tx)
    .await
    .map_err(map_db_err)?;

    Ok(())
}

#[async_trait]
impl ModerationRepository for PgModerationRepository {
    async fn list(&self, filter: ModerationFilter) -> ExpertResult<Vec<ModerationRecord>> {
        let mut qb = QueryBuilder::new(
            "select id, message_id, session_id, sender, sender_role, original_text, \
             redacted_text, offending_token, asker, expert, question_topic, question_body, \
             created_at from moderation_records where 1=1",
        );

        if let Some(session_id) = filter.session_id {
            qb.push(" and session_id = ").push_bind(session_id);
        }
        if let Some(message_id) = filter.message_id {
            qb.push(" and message_id = ").push_bind(message_id);
        }

        qb.push(" order by created_at desc");
        qb.push(" limit ").push_bind(filter.limit.unwrap_or(50));
        qb.push(" offset ").push_bind(filter.offset.unwrap_or(0));

        let rows = qb
            .build()
            .fetch_all(&self.pool)
            .await
            .map_err(map_db_err)?;

        rows.iter().map(map_record_row).collect()
    }
}
