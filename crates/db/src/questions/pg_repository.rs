use async_trait::async_trait;
use sqlx::{postgres::PgRow, PgPool, QueryBuilder, Row};
use uuid::Uuid;

use crate::map_db_err;
use crate::questions::models::{Question, QuestionFilter};
use crate::questions::repositories::QuestionRepository;
use expertline_common::error::ExpertResult;

#[derive(Clone)]
pub struct PgQuestionRepository {
    pool: PgPool,
}

impl PgQuestionRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn map_question_row(row: &PgRow) -> Question {
    Question {
        id: row.get("id"),
        topic: row.get("topic"),
        body: row.get("body"),
        asked_by: row.get("asked_by"),
        assigned_to: row.get("assigned_to"),
        session_id: row.get("session_id"),
        created_at: row.get("created_at"),
    }
}

#[async_trait]
impl QuestionRepository for PgQuestionRepository {
    async fn create_with_session(&self, question: Question) -> ExpertResult<Question> {
        let mut tx = self.pool.begin().await.map_err(map_db_err)?;

        let row = sqlx::query(
            "insert into questions (id, topic, body, asked_by, assigned_to, session_id, created_at)
             values ($1, $2, $3, $4, $5, $6, $7)
             returning id, topic, body, asked_by, assigned_to, session_id, created_at",
        )
        .bind(question.id)
        .bind(&question.topic)
        .bind(&question.body)
        .bind(&question.asked_by)
        .bind(&question.assigned_to)
        .bind(question.session_id)
        .bind(question.created_at)
        .fetch_one(&mut *tx)
        .await
        .map_err(map_db_err)?;

        sqlx::query(
            "insert into chat_sessions (session_id) values ($1)
             on conflict (session_id) do nothing",
        )
        .bind(question.session_id)
        .execute(&mut *tx)
        .await
        .map_err(map_db_err)?;

        tx.commit().await.map_err(map_db_err)?;

        Ok(map_question_row(&row))
    }

    async fn get_by_session(&self, session_id: Uuid) -> ExpertResult<Option<Question>> {
        let row = sqlx::query(
            "select id, topic, body, asked_by, assigned_to, session_id, created_at
             from questions
             where session_id = $1",
        )
        .bind(session_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_db_err)?;

        Ok(row.as_ref().map(map_question_row))
    }

    async fn list(&self, filter: QuestionFilter) -> ExpertResult<Vec<Question>> {
        let mut qb = QueryBuilder::new(
            "select id, topic, body, asked_by, assigned_to, session_id, created_at \
             from questions where 1=1",
        );

        if let Some(participant) = filter.participant {
            qb.push(" and (asked_by = ")
                .push_bind(participant.clone())
                .push(" or assigned_to = ")
                .push_bind(participant)
                .push(")");
        }

        qb.push(" order by created_at asc");
        qb.push(" limit ").push_bind(filter.limit.unwrap_or(100));
        qb.push(" offset ").push_bind(filter.offset.unwrap_or(0));

        let rows = qb
            .build()
            .fetch_all(&self.pool)
            .await
            .map_err(map_db_err)?;

        Ok(rows.iter().map(map_question_row).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::create_pool;
    use crate::schema::ensure_schema;
    use chrono::Utc;

    async fn test_repo() -> Option<(PgQuestionRepository, PgPool)> {
        let url = std::env::var("TEST_DATABASE_URL").ok()?;
        let pool = create_pool(&url).await.expect("db should connect");
        ensure_schema(&pool).await.expect("schema");
        Some((PgQuestionRepository::new(pool.clone()), pool))
    }

    fn make_question(asked_by: &str, assigned_to: Option<&str>) -> Question {
        Question {
            id: Uuid::new_v4(),
            topic: "volcanoes".to_string(),
            body: "Why do volcanoes erupt?".to_string(),
            asked_by: asked_by.to_string(),
            assigned_to: assigned_to.map(str::to_string),
            session_id: Uuid::new_v4(),
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn create_with_session_opens_the_session() {
        let (repo, pool) = match test_repo().await {
            Some(r) => r,
            None => return,
        };
        let question = make_question("asker@example.com", Some("expert@example.com"));
        let saved = repo.create_with_session(question.clone()).await.expect("save");
        assert_eq!(saved.session_id, question.session_id);

        let ended: bool =
            sqlx::query_scalar("select ended from chat_sessions where session_id = $1")
                .bind(question.session_id)
                .fetch_one(&pool)
                .await
                .expect("session row");
        assert!(!ended);

        let fetched = repo
            .get_by_session(question.session_id)
            .await
            .expect("get")
            .expect("present");
        assert_eq!(fetched.assigned_to.as_deref(), Some("expert@example.com"));
    }

    #[tokio::test]
    async fn list_filters_by_participant() {
        let (repo, _pool) = match test_repo().await {
            Some(r) => r,
            None => return,
        };
        let asker = format!("{}@example.com", Uuid::new_v4());
        let expert = format!("{}@example.com", Uuid::new_v4());
        repo.create_with_session(make_question(&asker, Some(&expert)))
            .await
            .expect("save");
        repo.create_with_session(make_question("someone@example.com", None))
            .await
            .expect("save");

        let as_expert = repo
            .list(QuestionFilter {
                participant: Some(expert.clone()),
                ..Default::default()
            })
            .await
            .expect("list");
        assert_eq!(as_expert.len(), 1);
        assert!(as_expert[0].involves(&expert));
    }
}
