use axum::Extension;
use serde::{Deserialize, Serialize};

use crate::models::NewUser;
use crate::password::{hash_password, verify_password};
use crate::principal::Principal;
use crate::err::JsonBody;
use crate::{breaks, proceeds, AppState, Error, Payload};

pub const EMAIL_TAKEN: &str = "Error: Email is already taken!";
pub const REGISTERED: &str = "User registered successfully!";

pub async fn login_user(
    Extension(state): Extension<AppState>,
    JsonBody(login): JsonBody<LoginRequest>,
) -> Payload<JwtResponse> {
    if let Err(err) = login.check() {
        return breaks(err);
    }
    proceeds(authenticate(&state, login).await?)
}

pub async fn register_user(
    Extension(state): Extension<AppState>,
    JsonBody(signup): JsonBody<SignupRequest>,
) -> Payload<MessageResponse> {
    if let Err(err) = signup.check() {
        return breaks(err);
    }
    proceeds(register(&state, signup).await?)
}

/// Checks the credentials and issues a token. Unknown email and wrong
/// password fail identically.
pub async fn authenticate(state: &AppState, login: LoginRequest) -> Result<JwtResponse, Error> {
    let user = state.store.find_user_by_email(&login.email).await?;
    let principal = match user {
        Some(user) if verify_password(&login.password, &user.password_hash) => {
            Principal::from(user)
        }
        _ => {
            log::warn!("Failed login attempt");
            return Err(Error::unauthorized());
        }
    };

    let token = state.tokens.issue(&principal)?;
    log::info!("User {} logged in", principal.id);
    Ok(JwtResponse {
        token,
        kind: "Bearer",
        id: principal.id,
        username: principal.username,
        first_name: principal.first_name,
        last_name: principal.last_name,
        admin: principal.admin,
    })
}

/// Creates a non-admin account. No token is issued; the caller logs in next.
pub async fn register(state: &AppState, signup: SignupRequest) -> Result<MessageResponse, Error> {
    if state.store.email_exists(&signup.email).await? {
        return Err(Error::bad_request(EMAIL_TAKEN));
    }

    let user = NewUser {
        email: signup.email,
        first_name: signup.first_name,
        last_name: signup.last_name,
        password_hash: hash_password(&signup.password)?,
        admin: false,
    };
    // The store refuses a duplicate even if another registration won the race.
    let user = match state.store.insert_user(user).await? {
        Some(user) => user,
        None => return Err(Error::bad_request(EMAIL_TAKEN)),
    };

    log::info!("Registered user {}", user.id);
    Ok(MessageResponse {
        message: REGISTERED.to_string(),
    })
}

fn check_length(field: &str, value: &str, min: usize, max: usize) -> Result<(), Error> {
    let len = value.trim().chars().count();
    if len == 0 {
        return Err(Error::bad_request(format!("`{}` must not be blank", field)));
    }
    if len < min || len > max {
        return Err(Error::bad_request(format!(
            "`{}` must be between {} and {} characters",
            field, min, max
        )));
    }
    Ok(())
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

impl LoginRequest {
    fn check(&self) -> Result<(), Error> {
        if self.email.trim().is_empty() || self.password.is_empty() {
            return Err(Error::bad_request("`email` and `password` are required"));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignupRequest {
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub password: String,
}

impl SignupRequest {
    fn check(&self) -> Result<(), Error> {
        check_length("email", &self.email, 1, 50)?;
        if !self.email.contains('@') {
            return Err(Error::bad_request("`email` is not a valid address"));
        }
        check_length("firstName", &self.first_name, 3, 20)?;
        check_length("lastName", &self.last_name, 3, 20)?;
        check_length("password", &self.password, 1, 40)
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JwtResponse {
    pub token: String,
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub id: i64,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub admin: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct MessageResponse {
    pub message: String,
}
