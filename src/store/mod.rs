mod memory;
mod postgres;

pub use memory::MemoryStore;
pub use postgres::PostgresStore;

use async_trait::async_trait;

use crate::models::{NewTeacher, NewUser, Session, SessionDraft, Teacher, User};

/// Persistence operations the services need. Relationships are never loaded
/// behind the caller's back: a [`Session`] comes with its teacher id and
/// participant ids and nothing more.
#[async_trait]
pub trait Store: Send + Sync {
    async fn find_user(&self, id: i64) -> anyhow::Result<Option<User>>;
    async fn find_user_by_email(&self, email: &str) -> anyhow::Result<Option<User>>;
    async fn email_exists(&self, email: &str) -> anyhow::Result<bool>;
    /// Inserts unless the email is taken, in which case `None` is returned and
    /// nothing is written.
    async fn insert_user(&self, user: NewUser) -> anyhow::Result<Option<User>>;
    /// Returns true if a row was deleted. Participations of the user go with it.
    async fn delete_user(&self, id: i64) -> anyhow::Result<bool>;

    async fn find_teacher(&self, id: i64) -> anyhow::Result<Option<Teacher>>;
    async fn list_teachers(&self) -> anyhow::Result<Vec<Teacher>>;
    async fn insert_teacher(&self, teacher: NewTeacher) -> anyhow::Result<Teacher>;

    async fn find_session(&self, id: i64) -> anyhow::Result<Option<Session>>;
    async fn list_sessions(&self) -> anyhow::Result<Vec<Session>>;
    async fn insert_session(&self, draft: SessionDraft) -> anyhow::Result<Session>;
    /// Overwrites the editable fields, keeping participants. `None` if missing.
    async fn update_session(&self, id: i64, draft: SessionDraft)
        -> anyhow::Result<Option<Session>>;
    async fn delete_session(&self, id: i64) -> anyhow::Result<bool>;

    /// Appends the user to the session's participants in one atomic step.
    /// Returns false, without writing, when the pair already exists.
    async fn add_participant(&self, session_id: i64, user_id: i64) -> anyhow::Result<bool>;
    /// Returns false when the user was not participating.
    async fn remove_participant(&self, session_id: i64, user_id: i64) -> anyhow::Result<bool>;
}
