use async_trait::async_trait;
use axum::body::Body;
use axum::extract::{FromRequest, RequestParts};
use axum::headers::authorization::Bearer;
use axum::headers::{Authorization, HeaderMapExt};
use axum::http::Request;
use axum::middleware::Next;
use axum::response::Response;

use crate::models::User;
use crate::principal::Principal;
use crate::{AppState, Error};

/// Who the current request acts as, if anyone. Inserted by
/// [`resolve_principal`] before any handler runs.
#[derive(Debug, Clone, Default)]
pub struct Identity(pub Option<Principal>);

/// Reads the bearer token, if any, and records the resulting [`Identity`].
/// A missing or invalid token is not an error here; handlers that need a
/// principal ask for [`Authenticated`].
pub async fn resolve_principal(mut req: Request<Body>, next: Next<Body>) -> Result<Response, Error> {
    let state = req
        .extensions()
        .get::<AppState>()
        .cloned()
        .ok_or_else(|| Error::InternalError {
            kind: "Configuration",
            message: "application state is not installed".to_string(),
        })?;

    let principal = match req.headers().typed_get::<Authorization<Bearer>>() {
        Some(Authorization(bearer)) => identify(&state, bearer.token()).await?,
        None => None,
    };
    req.extensions_mut().insert(Identity(principal));
    Ok(next.run(req).await)
}

/// Resolves a token to the principal of the user it names.
pub async fn identify(state: &AppState, token: &str) -> Result<Option<Principal>, Error> {
    let subject = match state.tokens.subject(token) {
        Ok(subject) => subject,
        Err(err) => {
            log::error!("Cannot set user authentication: {}", err);
            return Ok(None);
        }
    };
    let user = state.store.find_user_by_email(&subject).await?;
    if user.is_none() {
        log::warn!("Token subject no longer exists");
    }
    Ok(user.map(Principal::from))
}

/// Extractor for handlers that require a logged-in principal.
#[derive(Debug, Clone)]
pub struct Authenticated(pub Principal);

#[async_trait]
impl<B: Send> FromRequest<B> for Authenticated {
    type Rejection = Error;

    async fn from_request(req: &mut RequestParts<B>) -> Result<Self, Self::Rejection> {
        match req.extensions().get::<Identity>() {
            Some(Identity(Some(principal))) => Ok(Authenticated(principal.clone())),
            _ => {
                log::warn!("Unauthenticated request to {}", req.uri());
                Err(Error::unauthorized())
            }
        }
    }
}

/// Permits the mutation only when `principal` is the owner of `target`.
/// Ownership is decided by id, the same key principal equality uses.
pub fn authorize_self_or_reject(target: &User, principal: &Principal) -> Result<(), Error> {
    if principal.is(target) {
        Ok(())
    } else {
        log::warn!(
            "User {} tried to act on account {} they do not own",
            principal.id,
            target.id
        );
        Err(Error::unauthorized())
    }
}
