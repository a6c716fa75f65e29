use axum::extract::Path;
use axum::Extension;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::auth::MessageResponse;
use crate::err::JsonBody;
use crate::guard::Authenticated;
use crate::models::{Session, SessionDraft};
use crate::store::Store;
use crate::{participation, proceeds, AppState, Error, Payload};

const NAME_MAX: usize = 50;
const DESCRIPTION_MAX: usize = 2500;

pub async fn find_all(
    Authenticated(_): Authenticated,
    Extension(state): Extension<AppState>,
) -> Payload<SessionList> {
    let sessions = state.store.list_sessions().await?;
    proceeds(SessionList {
        sessions: sessions.into_iter().map(SessionDto::from).collect(),
    })
}

pub async fn find_by_id(
    Authenticated(_): Authenticated,
    Path(id): Path<String>,
    Extension(state): Extension<AppState>,
) -> Payload<SessionDto> {
    let session = load(state.store.as_ref(), id.parse()?).await?;
    proceeds(SessionDto::from(session))
}

pub async fn create(
    Authenticated(_): Authenticated,
    Extension(state): Extension<AppState>,
    JsonBody(body): JsonBody<SessionDto>,
) -> Payload<SessionDto> {
    let draft = body.into_draft(state.store.as_ref()).await?;
    let session = state.store.insert_session(draft).await?;
    log::info!("Created session {}", session.id);
    proceeds(SessionDto::from(session))
}

pub async fn update(
    Authenticated(_): Authenticated,
    Path(id): Path<String>,
    Extension(state): Extension<AppState>,
    JsonBody(body): JsonBody<SessionDto>,
) -> Payload<SessionDto> {
    let id: i64 = id.parse()?;
    let draft = body.into_draft(state.store.as_ref()).await?;
    let session = state
        .store
        .update_session(id, draft)
        .await?
        .ok_or_else(|| not_found(id))?;
    proceeds(SessionDto::from(session))
}

pub async fn delete(
    Authenticated(_): Authenticated,
    Path(id): Path<String>,
    Extension(state): Extension<AppState>,
) -> Payload<MessageResponse> {
    let id: i64 = id.parse()?;
    if !state.store.delete_session(id).await? {
        return Err(not_found(id));
    }
    log::info!("Deleted session {}", id);
    proceeds(MessageResponse {
        message: format!("Session {} deleted", id),
    })
}

pub async fn participate(
    Authenticated(_): Authenticated,
    Path((id, user_id)): Path<(String, String)>,
    Extension(state): Extension<AppState>,
) -> Payload<SessionDto> {
    let id: i64 = id.parse()?;
    participation::participate(state.store.as_ref(), id, user_id.parse()?).await?;
    proceeds(SessionDto::from(load(state.store.as_ref(), id).await?))
}

pub async fn no_longer_participate(
    Authenticated(_): Authenticated,
    Path((id, user_id)): Path<(String, String)>,
    Extension(state): Extension<AppState>,
) -> Payload<SessionDto> {
    let id: i64 = id.parse()?;
    participation::no_longer_participate(state.store.as_ref(), id, user_id.parse()?).await?;
    proceeds(SessionDto::from(load(state.store.as_ref(), id).await?))
}

async fn load(store: &dyn Store, id: i64) -> Result<Session, Error> {
    store.find_session(id).await?.ok_or_else(|| not_found(id))
}

fn not_found(id: i64) -> Error {
    Error::not_found(format!("Session {} not found", id))
}

/// Wire form of a session. `users` is read-only: it is reported on the way
/// out and ignored on the way in.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionDto {
    #[serde(default)]
    pub id: Option<i64>,
    pub name: String,
    pub date: Option<DateTime<Utc>>,
    #[serde(rename = "teacher_id")]
    pub teacher_id: Option<i64>,
    pub description: String,
    #[serde(default)]
    pub users: Vec<i64>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl SessionDto {
    /// Field checks; yields the two required values.
    fn check(&self) -> Result<(DateTime<Utc>, i64), Error> {
        let name = self.name.trim().chars().count();
        if name == 0 || self.name.chars().count() > NAME_MAX {
            return Err(Error::bad_request(format!(
                "`name` must be 1 to {} characters",
                NAME_MAX
            )));
        }
        let description = self.description.trim().chars().count();
        if description == 0 || self.description.chars().count() > DESCRIPTION_MAX {
            return Err(Error::bad_request(format!(
                "`description` must be 1 to {} characters",
                DESCRIPTION_MAX
            )));
        }
        let date = self
            .date
            .ok_or_else(|| Error::bad_request("`date` is required"))?;
        let teacher_id = self
            .teacher_id
            .ok_or_else(|| Error::bad_request("`teacher_id` is required"))?;
        Ok((date, teacher_id))
    }

    /// Validates the payload and resolves the teacher reference.
    pub async fn into_draft(self, store: &dyn Store) -> Result<SessionDraft, Error> {
        let (date, teacher_id) = self.check()?;
        if store.find_teacher(teacher_id).await?.is_none() {
            return Err(Error::not_found(format!("Teacher {} not found", teacher_id)));
        }
        Ok(SessionDraft {
            name: self.name,
            date,
            description: self.description,
            teacher_id: Some(teacher_id),
        })
    }
}

impl From<Session> for SessionDto {
    fn from(session: Session) -> Self {
        Self {
            id: Some(session.id),
            name: session.name,
            date: Some(session.date),
            teacher_id: session.teacher_id,
            description: session.description,
            users: session.users,
            created_at: Some(session.created_at),
            updated_at: Some(session.updated_at),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SessionList {
    pub sessions: Vec<SessionDto>,
}
