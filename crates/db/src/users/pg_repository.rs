use async_trait::async_trait;
use sqlx::{postgres::PgRow, PgPool, Row};
use uuid::Uuid;

use crate::map_db_err;
use crate::users::models::{NewUser, User, UserUpdate};
use crate::users::repositories::{ExpertDirectory, UserRepository};
use expertline_common::error::{ExpertError, ExpertResult};

const USER_COLUMNS: &str = "id, name, email, expertise, is_admin, created_at";

#[derive(Clone)]
pub struct PgUserRepository {
    pool: PgPool,
}

impl PgUserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn map_row(row: &PgRow) -> User {
        User {
            id: row.get("id"),
            name: row.get("name"),
            email: row.get("email"),
            expertise: row.get("expertise"),
            is_admin: row.get("is_admin"),
            created_at: row.get("created_at"),
        }
    }
}

#[async_trait]
impl UserRepository for PgUserRepository {
    async fn create(&self, user: NewUser) -> ExpertResult<User> {
        let user = user.normalized();
        let row = sqlx::query(&format!(
            "insert into users (id, name, email, expertise, is_admin)
             values ($1, $2, $3, $4, $5)
             returning {USER_COLUMNS}"
        ))
        .bind(Uuid::new_v4())
        .bind(&user.name)
        .bind(&user.email)
        .bind(&user.expertise)
        .bind(user.is_admin)
        .fetch_one(&self.pool)
        .await
        .map_err(map_db_err)?;

        Ok(Self::map_row(&row))
    }

    async fn get_by_id(&self, id: Uuid) -> ExpertResult<Option<User>> {
        let row = sqlx::query(&format!("select {USER_COLUMNS} from users where id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_db_err)?;

        Ok(row.as_ref().map(Self::map_row))
    }

    async fn get_by_email(&self, email: &str) -> ExpertResult<Option<User>> {
        let row = sqlx::query(&format!(
            "select {USER_COLUMNS} from users where email = lower(trim($1))"
        ))
        .bind(email)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_db_err)?;

        Ok(row.as_ref().map(Self::map_row))
    }

    async fn list(&self) -> ExpertResult<Vec<User>> {
        let rows = sqlx::query(&format!("select {USER_COLUMNS} from users order by seq"))
            .fetch_all(&self.pool)
            .await
            .map_err(map_db_err)?;

        Ok(rows.iter().map(Self::map_row).collect())
    }

    async fn update(&self, id: Uuid, update: UserUpdate) -> ExpertResult<User> {
        let update = update.normalized();
        let row = sqlx::query(&format!(
            "update users
             set name = coalesce($1, name),
                 email = coalesce($2, email),
                 expertise = coalesce($3, expertise),
                 is_admin = coalesce($4, is_admin)
             where id = $5
             returning {USER_COLUMNS}"
        ))
        .bind(update.name)
        .bind(update.email)
        .bind(update.expertise)
        .bind(update.is_admin)
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_db_err)?;

        row.as_ref()
            .map(Self::map_row)
            .ok_or_else(|| ExpertError::NotFound(format!("user not found: {id}")))
    }
}

#[async_trait]
impl ExpertDirectory for PgUserRepository {
    async fn find_expert(&self, candidates: &[String]) -> ExpertResult<Option<User>> {
        if candidates.is_empty() {
            return Ok(None);
        }

        let row = sqlx::query(&format!(
            "select {USER_COLUMNS} from users u
             where u.expertise && $1::text[]
               and not exists (
                 select 1 from bans b where b.kind = 'identity' and b.value = u.email
               )
             order by u.seq
             limit 1"
        ))
        .bind(candidates)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_db_err)?;

        Ok(row.as_ref().map(Self::map_row))
    }
}
