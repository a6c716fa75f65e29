use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct User {
    pub id: i64,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub password_hash: String,
    pub admin: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A user that has not been stored yet; the store assigns id and timestamps.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub password_hash: String,
    pub admin: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Teacher {
    pub id: i64,
    pub first_name: String,
    pub last_name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewTeacher {
    pub first_name: String,
    pub last_name: String,
}

/// A session with its relationships resolved to ids. `users` keeps join order
/// and never holds the same id twice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub id: i64,
    pub name: String,
    pub date: DateTime<Utc>,
    pub description: String,
    pub teacher_id: Option<i64>,
    pub users: Vec<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Session {
    pub fn has_participant(&self, user_id: i64) -> bool {
        self.users.contains(&user_id)
    }
}

/// Editable fields of a session. Participants only change through
/// [`crate::participation`].
#[derive(Debug, Clone)]
pub struct SessionDraft {
    pub name: String,
    pub date: DateTime<Utc>,
    pub description: String,
    pub teacher_id: Option<i64>,
}
