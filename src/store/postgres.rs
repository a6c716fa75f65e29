use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;

use super::Store;
use crate::models::{NewTeacher, NewUser, Session, SessionDraft, Teacher, User};

const SCHEMA: &[&str] = &[
    "CREATE TABLE IF NOT EXISTS users (
        id BIGSERIAL PRIMARY KEY,
        email VARCHAR(50) NOT NULL UNIQUE,
        first_name VARCHAR(20) NOT NULL,
        last_name VARCHAR(20) NOT NULL,
        password_hash VARCHAR(255) NOT NULL,
        admin BOOLEAN NOT NULL DEFAULT FALSE,
        created_at TIMESTAMPTZ NOT NULL,
        updated_at TIMESTAMPTZ NOT NULL
    )",
    "CREATE TABLE IF NOT EXISTS teachers (
        id BIGSERIAL PRIMARY KEY,
        first_name VARCHAR(20) NOT NULL,
        last_name VARCHAR(20) NOT NULL,
        created_at TIMESTAMPTZ NOT NULL,
        updated_at TIMESTAMPTZ NOT NULL
    )",
    "CREATE TABLE IF NOT EXISTS sessions (
        id BIGSERIAL PRIMARY KEY,
        name VARCHAR(50) NOT NULL,
        date TIMESTAMPTZ NOT NULL,
        description VARCHAR(2500) NOT NULL,
        teacher_id BIGINT REFERENCES teachers (id) ON DELETE SET NULL,
        created_at TIMESTAMPTZ NOT NULL,
        updated_at TIMESTAMPTZ NOT NULL
    )",
    "CREATE TABLE IF NOT EXISTS participate (
        session_id BIGINT NOT NULL REFERENCES sessions (id) ON DELETE CASCADE,
        user_id BIGINT NOT NULL REFERENCES users (id) ON DELETE CASCADE,
        seq BIGSERIAL NOT NULL,
        PRIMARY KEY (session_id, user_id)
    )",
];

#[derive(sqlx::FromRow)]
struct SessionRow {
    id: i64,
    name: String,
    date: DateTime<Utc>,
    description: String,
    teacher_id: Option<i64>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl SessionRow {
    fn with_users(self, users: Vec<i64>) -> Session {
        Session {
            id: self.id,
            name: self.name,
            date: self.date,
            description: self.description,
            teacher_id: self.teacher_id,
            users,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

pub struct PostgresStore {
    pg: PgPool,
}

impl PostgresStore {
    pub async fn connect(url: &str, max_connections: u32) -> anyhow::Result<Self> {
        let pg = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(url)
            .await?;
        let store = Self { pg };
        store.prepare().await?;
        Ok(store)
    }

    /// Creates missing tables. Existing ones are left alone.
    pub async fn prepare(&self) -> anyhow::Result<()> {
        for statement in SCHEMA {
            sqlx::query(statement).execute(&self.pg).await?;
        }
        Ok(())
    }

    async fn participants(&self, session_id: i64) -> anyhow::Result<Vec<i64>> {
        let users = sqlx::query_scalar::<_, i64>(
            "SELECT user_id FROM participate WHERE session_id = $1 ORDER BY seq",
        )
        .bind(session_id)
        .fetch_all(&self.pg)
        .await?;
        Ok(users)
    }
}

#[async_trait]
impl Store for PostgresStore {
    async fn find_user(&self, id: i64) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1 LIMIT 1")
            .bind(id)
            .fetch_optional(&self.pg)
            .await?;
        Ok(user)
    }

    async fn find_user_by_email(&self, email: &str) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE email = $1 LIMIT 1")
            .bind(email)
            .fetch_optional(&self.pg)
            .await?;
        Ok(user)
    }

    async fn email_exists(&self, email: &str) -> anyhow::Result<bool> {
        let exists =
            sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM users WHERE email = $1)")
                .bind(email)
                .fetch_one(&self.pg)
                .await?;
        Ok(exists)
    }

    async fn insert_user(&self, user: NewUser) -> anyhow::Result<Option<User>> {
        let now = Utc::now();
        let user = sqlx::query_as::<_, User>(
            "INSERT INTO users (email, first_name, last_name, password_hash, admin, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $6) \
             ON CONFLICT (email) DO NOTHING RETURNING *",
        )
        .bind(user.email)
        .bind(user.first_name)
        .bind(user.last_name)
        .bind(user.password_hash)
        .bind(user.admin)
        .bind(now)
        .fetch_optional(&self.pg)
        .await?;
        Ok(user)
    }

    async fn delete_user(&self, id: i64) -> anyhow::Result<bool> {
        let res = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&self.pg)
            .await?;
        Ok(res.rows_affected() >= 1)
    }

    async fn find_teacher(&self, id: i64) -> anyhow::Result<Option<Teacher>> {
        let teacher =
            sqlx::query_as::<_, Teacher>("SELECT * FROM teachers WHERE id = $1 LIMIT 1")
                .bind(id)
                .fetch_optional(&self.pg)
                .await?;
        Ok(teacher)
    }

    async fn list_teachers(&self) -> anyhow::Result<Vec<Teacher>> {
        let teachers = sqlx::query_as::<_, Teacher>("SELECT * FROM teachers ORDER BY id")
            .fetch_all(&self.pg)
            .await?;
        Ok(teachers)
    }

    async fn insert_teacher(&self, teacher: NewTeacher) -> anyhow::Result<Teacher> {
        let now = Utc::now();
        let teacher = sqlx::query_as::<_, Teacher>(
            "INSERT INTO teachers (first_name, last_name, created_at, updated_at) \
             VALUES ($1, $2, $3, $3) RETURNING *",
        )
        .bind(teacher.first_name)
        .bind(teacher.last_name)
        .bind(now)
        .fetch_one(&self.pg)
        .await?;
        Ok(teacher)
    }

    async fn find_session(&self, id: i64) -> anyhow::Result<Option<Session>> {
        let row = sqlx::query_as::<_, SessionRow>("SELECT * FROM sessions WHERE id = $1 LIMIT 1")
            .bind(id)
            .fetch_optional(&self.pg)
            .await?;
        match row {
            Some(row) => {
                let users = self.participants(row.id).await?;
                Ok(Some(row.with_users(users)))
            }
            None => Ok(None),
        }
    }

    async fn list_sessions(&self) -> anyhow::Result<Vec<Session>> {
        let rows = sqlx::query_as::<_, SessionRow>("SELECT * FROM sessions ORDER BY id")
            .fetch_all(&self.pg)
            .await?;
        let pairs = sqlx::query_as::<_, (i64, i64)>(
            "SELECT session_id, user_id FROM participate ORDER BY seq",
        )
        .fetch_all(&self.pg)
        .await?;

        let mut by_session: HashMap<i64, Vec<i64>> = HashMap::new();
        for (session_id, user_id) in pairs {
            by_session.entry(session_id).or_default().push(user_id);
        }
        Ok(rows
            .into_iter()
            .map(|row| {
                let users = by_session.remove(&row.id).unwrap_or_default();
                row.with_users(users)
            })
            .collect())
    }

    async fn insert_session(&self, draft: SessionDraft) -> anyhow::Result<Session> {
        let now = Utc::now();
        let row = sqlx::query_as::<_, SessionRow>(
            "INSERT INTO sessions (name, date, description, teacher_id, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $5) RETURNING *",
        )
        .bind(draft.name)
        .bind(draft.date)
        .bind(draft.description)
        .bind(draft.teacher_id)
        .bind(now)
        .fetch_one(&self.pg)
        .await?;
        Ok(row.with_users(Vec::new()))
    }

    async fn update_session(
        &self,
        id: i64,
        draft: SessionDraft,
    ) -> anyhow::Result<Option<Session>> {
        let row = sqlx::query_as::<_, SessionRow>(
            "UPDATE sessions SET name = $2, date = $3, description = $4, teacher_id = $5, updated_at = $6 \
             WHERE id = $1 RETURNING *",
        )
        .bind(id)
        .bind(draft.name)
        .bind(draft.date)
        .bind(draft.description)
        .bind(draft.teacher_id)
        .bind(Utc::now())
        .fetch_optional(&self.pg)
        .await?;
        match row {
            Some(row) => {
                let users = self.participants(row.id).await?;
                Ok(Some(row.with_users(users)))
            }
            None => Ok(None),
        }
    }

    async fn delete_session(&self, id: i64) -> anyhow::Result<bool> {
        let res = sqlx::query("DELETE FROM sessions WHERE id = $1")
            .bind(id)
            .execute(&self.pg)
            .await?;
        Ok(res.rows_affected() >= 1)
    }

    async fn add_participant(&self, session_id: i64, user_id: i64) -> anyhow::Result<bool> {
        let res = sqlx::query(
            "INSERT INTO participate (session_id, user_id) VALUES ($1, $2) \
             ON CONFLICT (session_id, user_id) DO NOTHING",
        )
        .bind(session_id)
        .bind(user_id)
        .execute(&self.pg)
        .await?;
        Ok(res.rows_affected() >= 1)
    }

    async fn remove_participant(&self, session_id: i64, user_id: i64) -> anyhow::Result<bool> {
        let res = sqlx::query("DELETE FROM participate WHERE session_id = $1 AND user_id = $2")
            .bind(session_id)
            .bind(user_id)
            .execute(&self.pg)
            .await?;
        Ok(res.rows_affected() >= 1)
    }
}
