use axum::extract::Path;
use axum::Extension;
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::auth::MessageResponse;
use crate::guard::{authorize_self_or_reject, Authenticated};
use crate::models::User;
use crate::{proceeds, AppState, Error, Payload};

pub async fn find_by_id(
    Authenticated(_): Authenticated,
    Path(id): Path<String>,
    Extension(state): Extension<AppState>,
) -> Payload<UserDto> {
    let id: i64 = id.parse()?;
    let user = state
        .store
        .find_user(id)
        .await?
        .ok_or_else(|| not_found(id))?;
    proceeds(UserDto::from(user))
}

/// Deletes an account. Existence is checked before ownership, so a missing
/// id is a 404 for everyone.
pub async fn delete(
    Authenticated(principal): Authenticated,
    Path(id): Path<String>,
    Extension(state): Extension<AppState>,
) -> Payload<MessageResponse> {
    let id: i64 = id.parse()?;
    let user = state
        .store
        .find_user(id)
        .await?
        .ok_or_else(|| not_found(id))?;
    authorize_self_or_reject(&user, &principal)?;

    if !state.store.delete_user(user.id).await? {
        return Err(not_found(id));
    }
    log::info!("Deleted user {}", user.id);
    proceeds(MessageResponse {
        message: format!("User {} deleted", user.id),
    })
}

fn not_found(id: i64) -> Error {
    Error::not_found(format!("User {} not found", id))
}

/// A user as the API shows it. The password hash never leaves the server.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserDto {
    pub id: i64,
    pub email: String,
    pub last_name: String,
    pub first_name: String,
    pub admin: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<User> for UserDto {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            email: user.email,
            last_name: user.last_name,
            first_name: user.first_name,
            admin: user.admin,
            created_at: user.created_at,
            updated_at: user.updated_at,
        }
    }
}
