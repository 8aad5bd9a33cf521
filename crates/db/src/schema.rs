use expertline_common::error::{ExpertError, ExpertResult};
use sqlx::PgPool;

const STATEMENTS: &[&str] = &[
    "create table if not exists users (
      id uuid primary key,
      seq bigserial not null,
      name text not null,
      email text not null unique,
      expertise text[] not null default '{}',
      is_admin boolean not null default false,
      created_at timestamptz not null default now()
    )",
    "create index if not exists users_expertise_idx on users using gin (expertise)",
    "create table if not exists questions (
      id uuid primary key,
      topic text not null,
      body text not null,
      asked_by text not null,
      assigned_to text,
      session_id uuid not null unique,
      created_at timestamptz not null default now()
    )",
    "create index if not exists questions_asked_by_idx on questions(asked_by)",
    "create index if not exists questions_assigned_to_idx on questions(assigned_to)",
    "create table if not exists chat_sessions (
      session_id uuid primary key,
      ended boolean not null default false,
      created_at timestamptz not null default now(),
      ended_at timestamptz
    )",
    "create table if not exists chat_messages (
      id uuid primary key,
      seq bigserial not null,
      session_id uuid not null,
      sender text not null,
      original_text text not null,
      stored_text text not null,
      redacted boolean not null default false,
      created_at timestamptz not null default now()
    )",
    "create index if not exists chat_messages_session_idx on chat_messages(session_id, seq)",
    "create table if not exists moderation_records (
      id uuid primary key,
      message_id uuid not null unique,
      session_id uuid not null,
      sender text not null,
      sender_role text not null,
      original_text text not null,
      redacted_text text not null,
      offending_token text not null,
      asker jsonb,
      expert jsonb,
      question_topic text,
      question_body text,
      created_at timestamptz not null default now()
    )",
    "create index if not exists moderation_records_session_idx on moderation_records(session_id)",
    "create table if not exists bans (
      id uuid primary key,
      kind text not null,
      value text not null,
      reason text,
      created_at timestamptz not null default now(),
      unique (kind, value)
    )",
];

/// Create every table and index the repositories rely on. Safe to run on
/// every start.
pub async fn ensure_schema(pool: &PgPool) -> ExpertResult<()> {
    for statement in STATEMENTS {
        sqlx::query(statement)
            .execute(pool)
            .await
            .map_err(|e| ExpertError::Database(format!("schema bootstrap failed: {e}")))?;
    }
    tracing::info!(statements = STATEMENTS.len(), "schema ensured");
    Ok(())
}
