use axum::extract::Path;
use axum::Extension;
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::guard::Authenticated;
use crate::models::Teacher;
use crate::{proceeds, AppState, Error, Payload};

pub async fn find_all(
    Authenticated(_): Authenticated,
    Extension(state): Extension<AppState>,
) -> Payload<TeacherList> {
    let teachers = state.store.list_teachers().await?;
    proceeds(TeacherList {
        teachers: teachers.into_iter().map(TeacherDto::from).collect(),
    })
}

pub async fn find_by_id(
    Authenticated(_): Authenticated,
    Path(id): Path<String>,
    Extension(state): Extension<AppState>,
) -> Payload<TeacherDto> {
    let id: i64 = id.parse()?;
    let teacher = state
        .store
        .find_teacher(id)
        .await?
        .ok_or_else(|| Error::not_found(format!("Teacher {} not found", id)))?;
    proceeds(TeacherDto::from(teacher))
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TeacherDto {
    pub id: i64,
    pub last_name: String,
    pub first_name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Teacher> for TeacherDto {
    fn from(teacher: Teacher) -> Self {
        Self {
            id: teacher.id,
            last_name: teacher.last_name,
            first_name: teacher.first_name,
            created_at: teacher.created_at,
            updated_at: teacher.updated_at,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct TeacherList {
    pub teachers: Vec<TeacherDto>,
}
