pub mod auth;
pub mod config;
pub mod err;
pub mod guard;
pub mod jwt;
pub mod models;
pub mod participation;
pub mod password;
pub mod principal;
pub mod seed;
pub mod session;
pub mod store;
pub mod teacher;
pub mod user;

use std::sync::Arc;

use axum::handler::Handler;
use axum::routing::{get, post};
use axum::{middleware, Extension, Json, Router};
use serde::Serialize;
use tower::ServiceBuilder;

pub use crate::err::Error;
use crate::err::{Fine, Success};
use crate::jwt::TokenService;
use crate::store::Store;

pub type Payload<T> = Result<Json<Success<T>>, Error>;

pub fn proceeds<V>(value: V) -> Payload<V>
where
    V: Serialize,
{
    Ok(Json(Fine(value)))
}

pub fn breaks<V>(err: Error) -> Payload<V>
where
    V: Serialize,
{
    Err(err)
}

/// Shared by every request: the store and the token signer. Nothing else
/// lives across requests.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn Store>,
    pub tokens: Arc<TokenService>,
}

impl AppState {
    pub fn new(store: Arc<dyn Store>, tokens: TokenService) -> Self {
        Self {
            store,
            tokens: Arc::new(tokens),
        }
    }
}

pub fn app(state: AppState) -> Router {
    Router::new()
        .route("/api/auth/login", post(auth::login_user))
        .route("/api/auth/register", post(auth::register_user))
        .route("/api/user/:id", get(user::find_by_id).delete(user::delete))
        .route("/api/teacher", get(teacher::find_all))
        .route("/api/teacher/:id", get(teacher::find_by_id))
        .route("/api/session", get(session::find_all).post(session::create))
        .route(
            "/api/session/:id",
            get(session::find_by_id)
                .put(session::update)
                .delete(session::delete),
        )
        .route(
            "/api/session/:id/participate/:user_id",
            post(session::participate).delete(session::no_longer_participate),
        )
        .fallback(err::handler404.into_service())
        .layer(
            ServiceBuilder::new()
                .layer(Extension(state))
                .layer(middleware::from_fn(guard::resolve_principal)),
        )
}
