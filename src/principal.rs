use std::collections::HashSet;
use std::hash::{Hash, Hasher};

use crate::models::User;

/// The authenticated identity a request acts as.
///
/// Two principals are the same identity when their ids match; the remaining
/// fields are a snapshot of the user record taken when the token was resolved.
#[derive(Debug, Clone)]
pub struct Principal {
    pub id: i64,
    /// The user's email, which is also the token subject.
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub admin: bool,
    pub password_hash: String,
}

impl Principal {
    /// Granted authorities. Roles are carried by [`Principal::admin`] alone,
    /// so this is always empty.
    pub fn authorities(&self) -> HashSet<String> {
        HashSet::new()
    }

    pub fn is(&self, user: &User) -> bool {
        self.id == user.id
    }
}

impl From<User> for Principal {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            username: user.email,
            first_name: user.first_name,
            last_name: user.last_name,
            admin: user.admin,
            password_hash: user.password_hash,
        }
    }
}

impl PartialEq for Principal {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Principal {}

impl Hash for Principal {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}
