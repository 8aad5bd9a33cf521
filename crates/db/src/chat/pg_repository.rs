use async_trait::async_trait;
use chrono::Utc;
use sqlx::{postgres::PgRow, PgPool, Row};
use uuid::Uuid;

use crate::chat::models::{AppendOutcome, ChatMessage, ChatSession, EndOutcome, NewMessage};
use crate::chat::repositories::ChatRepository;
use crate::map_db_err;
use crate::moderation::models::NewModerationRecord;
use crate::moderation::pg_repository::insert_record;
use expertline_common::error::{ExpertError, ExpertResult};

const SESSION_COLUMNS: &str = "session_id, ended, created_at, ended_at";
const MESSAGE_COLUMNS: &str =
    "id, seq, session_id, sender, original_text, stored_text, redacted, created_at";

#[derive(Clone)]
pub struct PgChatRepository {
    pool: PgPool,
}

impl PgChatRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn map_session(row: &PgRow) -> ChatSession {
        ChatSession {
            session_id: row.get("session_id"),
            ended: row.get("ended"),
            created_at: row.get("created_at"),
            ended_at: row.get("ended_at"),
        }
    }

    fn map_message(row: &PgRow) -> ChatMessage {
        ChatMessage {
            id: row.get("id"),
            seq: row.get("seq"),
            session_id: row.get("session_id"),
            sender: row.get("sender"),
            original_text: row.get("original_text"),
            stored_text: row.get("stored_text"),
            redacted: row.get("redacted"),
            created_at: row.get("created_at"),
        }
    }
}

#[async_trait]
impl ChatRepository for PgChatRepository {
    async fn ensure_session(&self, session_id: Uuid) -> ExpertResult<ChatSession> {
        sqlx::query(
            "insert into chat_sessions (session_id) values ($1)
             on conflict (session_id) do nothing",
        )
        .bind(session_id)
        .execute(&self.pool)
        .await
        .map_err(map_db_err)?;

        self.get_session(session_id)
            .await?
            .ok_or_else(|| ExpertError::NotFound(format!("chat session {session_id}")))
    }

    async fn get_session(&self, session_id: Uuid) -> ExpertResult<Option<ChatSession>> {
        let row = sqlx::query(&format!(
            "select {SESSION_COLUMNS} from chat_sessions where session_id = $1"
        ))
        .bind(session_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_db_err)?;

        Ok(row.as_ref().map(Self::map_session))
    }

    async fn end_session(&self, session_id: Uuid) -> ExpertResult<EndOutcome> {
        sqlx::query(
            "insert into chat_sessions (session_id) values ($1)
             on conflict (session_id) do nothing",
        )
        .bind(session_id)
        .execute(&self.pool)
        .await
        .map_err(map_db_err)?;

        // Waits for any in-flight append holding the row share lock.
        let updated = sqlx::query(&format!(
            "update chat_sessions set ended = true, ended_at = $1
             where session_id = $2 and not ended
             returning {SESSION_COLUMNS}"
        ))
        .bind(Utc::now())
        .bind(session_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_db_err)?;

        if let Some(row) = updated {
            return Ok(EndOutcome {
                session: Self::map_session(&row),
                transitioned: true,
            });
        }

        let session = self
            .get_session(session_id)
            .await?
            .ok_or_else(|| ExpertError::NotFound(format!("chat session {session_id}")))?;

        Ok(EndOutcome {
            session,
            transitioned: false,
        })
    }

    async fn append_message(
        &self,
        message: NewMessage,
        audit: Option<NewModerationRecord>,
    ) -> ExpertResult<AppendOutcome> {
        let mut tx = self.pool.begin().await.map_err(map_db_err)?;

        sqlx::query(
            "insert into chat_sessions (session_id) values ($1)
             on conflict (session_id) do nothing",
        )
        .bind(message.session_id)
        .execute(&mut *tx)
        .await
        .map_err(map_db_err)?;

        // The share lock makes a concurrent end_session wait until this
        // transaction settles, so no message lands after the end commits.
        let ended: Option<bool> = sqlx::query_scalar(
            "select ended from chat_sessions where session_id = $1 for share",
        )
        .bind(message.session_id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(map_db_err)?;

        match ended {
            None => {
                return Err(ExpertError::NotFound(format!(
                    "chat session {}",
                    message.session_id
                )))
            }
            Some(true) => {
                tx.rollback().await.map_err(map_db_err)?;
                return Ok(AppendOutcome::SessionClosed);
            }
            Some(false) => {}
        }

        let now = Utc::now();
        if let Some(record) = &audit {
            insert_record(&mut tx, record, message.id, now).await?;
        }

        let row = sqlx::query(&format!(
            "insert into chat_messages
             (id, session_id, sender, original_text, stored_text, redacted, created_at)
             values ($1, $2, $3, $4, $5, $6, $7)
             returning {MESSAGE_COLUMNS}"
        ))
        .bind(message.id)
        .bind(message.session_id)
        .bind(&message.sender)
        .bind(&message.original_text)
        .bind(&message.stored_text)
        .bind(message.redacted())
        .bind(now)
        .fetch_one(&mut *tx)
        .await
        .map_err(map_db_err)?;

        tx.commit().await.map_err(map_db_err)?;

        Ok(AppendOutcome::Accepted(Self::map_message(&row)))
    }

    async fn list_messages(&self, session_id: Uuid) -> ExpertResult<Vec<ChatMessage>> {
        let rows = sqlx::query(&format!(
            "select {MESSAGE_COLUMNS} from chat_messages
             where session_id = $1
             order by seq asc"
        ))
        .bind(session_id)
        .fetch_all(&self.pool)
        .await
        .map_err(map_db_err)?;

        Ok(rows.iter().map(Self::map_message).collect())
    }

    async fn list_recent(&self, limit: i64) -> ExpertResult<Vec<ChatMessage>> {
        let rows = sqlx::query(&format!(
            "select {MESSAGE_COLUMNS} from chat_messages order by seq desc limit $1"
        ))
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(map_db_err)?;

        Ok(rows.iter().map(Self::map_message).collect())
    }
}
