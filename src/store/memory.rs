use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::Mutex;

use super::Store;
use crate::models::{NewTeacher, NewUser, Session, SessionDraft, Teacher, User};

#[derive(Default)]
struct Tables {
    next_id: i64,
    users: BTreeMap<i64, User>,
    teachers: BTreeMap<i64, Teacher>,
    sessions: BTreeMap<i64, Session>,
}

impl Tables {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }
}

/// Process-local store. Every operation holds the lock for its whole
/// read-check-write, so the conditional writes are atomic.
#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn find_user(&self, id: i64) -> anyhow::Result<Option<User>> {
        Ok(self.tables.lock().users.get(&id).cloned())
    }

    async fn find_user_by_email(&self, email: &str) -> anyhow::Result<Option<User>> {
        let tables = self.tables.lock();
        Ok(tables.users.values().find(|u| u.email == email).cloned())
    }

    async fn email_exists(&self, email: &str) -> anyhow::Result<bool> {
        let tables = self.tables.lock();
        Ok(tables.users.values().any(|u| u.email == email))
    }

    async fn insert_user(&self, user: NewUser) -> anyhow::Result<Option<User>> {
        let mut tables = self.tables.lock();
        if tables.users.values().any(|u| u.email == user.email) {
            return Ok(None);
        }
        let now = Utc::now();
        let user = User {
            id: tables.next_id(),
            email: user.email,
            first_name: user.first_name,
            last_name: user.last_name,
            password_hash: user.password_hash,
            admin: user.admin,
            created_at: now,
            updated_at: now,
        };
        tables.users.insert(user.id, user.clone());
        Ok(Some(user))
    }

    async fn delete_user(&self, id: i64) -> anyhow::Result<bool> {
        let mut tables = self.tables.lock();
        if tables.users.remove(&id).is_none() {
            return Ok(false);
        }
        for session in tables.sessions.values_mut() {
            session.users.retain(|uid| *uid != id);
        }
        Ok(true)
    }

    async fn find_teacher(&self, id: i64) -> anyhow::Result<Option<Teacher>> {
        Ok(self.tables.lock().teachers.get(&id).cloned())
    }

    async fn list_teachers(&self) -> anyhow::Result<Vec<Teacher>> {
        Ok(self.tables.lock().teachers.values().cloned().collect())
    }

    async fn insert_teacher(&self, teacher: NewTeacher) -> anyhow::Result<Teacher> {
        let mut tables = self.tables.lock();
        let now = Utc::now();
        let teacher = Teacher {
            id: tables.next_id(),
            first_name: teacher.first_name,
            last_name: teacher.last_name,
            created_at: now,
            updated_at: now,
        };
        tables.teachers.insert(teacher.id, teacher.clone());
        Ok(teacher)
    }

    async fn find_session(&self, id: i64) -> anyhow::Result<Option<Session>> {
        Ok(self.tables.lock().sessions.get(&id).cloned())
    }

    async fn list_sessions(&self) -> anyhow::Result<Vec<Session>> {
        Ok(self.tables.lock().sessions.values().cloned().collect())
    }

    async fn insert_session(&self, draft: SessionDraft) -> anyhow::Result<Session> {
        let mut tables = self.tables.lock();
        let now = Utc::now();
        let session = Session {
            id: tables.next_id(),
            name: draft.name,
            date: draft.date,
            description: draft.description,
            teacher_id: draft.teacher_id,
            users: Vec::new(),
            created_at: now,
            updated_at: now,
        };
        tables.sessions.insert(session.id, session.clone());
        Ok(session)
    }

    async fn update_session(
        &self,
        id: i64,
        draft: SessionDraft,
    ) -> anyhow::Result<Option<Session>> {
        let mut tables = self.tables.lock();
        Ok(tables.sessions.get_mut(&id).map(|session| {
            session.name = draft.name;
            session.date = draft.date;
            session.description = draft.description;
            session.teacher_id = draft.teacher_id;
            session.updated_at = Utc::now();
            session.clone()
        }))
    }

    async fn delete_session(&self, id: i64) -> anyhow::Result<bool> {
        Ok(self.tables.lock().sessions.remove(&id).is_some())
    }

    async fn add_participant(&self, session_id: i64, user_id: i64) -> anyhow::Result<bool> {
        let mut tables = self.tables.lock();
        match tables.sessions.get_mut(&session_id) {
            Some(session) if !session.has_participant(user_id) => {
                session.users.push(user_id);
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn remove_participant(&self, session_id: i64, user_id: i64) -> anyhow::Result<bool> {
        let mut tables = self.tables.lock();
        match tables.sessions.get_mut(&session_id) {
            Some(session) if session.has_participant(user_id) => {
                session.users.retain(|uid| *uid != user_id);
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}
