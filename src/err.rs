#![allow(non_snake_case)]

use std::num::ParseIntError;

use async_trait::async_trait;
use axum::body::HttpBody;
use axum::extract::{FromRequest, RequestParts};
use axum::http::{StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::{BoxError, Json};

use serde::de::DeserializeOwned;
use serde::Serialize;

pub async fn handler404(path: Uri) -> Error {
    Error::NotFound {
        message: format!("Invalid path: {}", path),
    }
}

pub fn Fine<V>(v: V) -> Success<V>
where
    V: Serialize,
{
    Success::of(v)
}

#[derive(Debug, Clone, Serialize)]
pub struct Success<V> {
    success: bool,
    #[serde(flatten)]
    value: V,
}

impl<V: Serialize> Success<V> {
    pub fn of(value: V) -> Self {
        Self {
            success: true,
            value,
        }
    }
}

/// A JSON request body. Unlike [`Json`], a body that is missing, unparsable or
/// of the wrong shape is rejected as a [`Error::BadRequest`].
#[derive(Debug, Clone)]
pub struct JsonBody<T>(pub T);

#[async_trait]
impl<T, B> FromRequest<B> for JsonBody<T>
where
    T: DeserializeOwned,
    B: HttpBody + Send,
    B::Data: Send,
    B::Error: Into<BoxError>,
{
    type Rejection = Error;

    async fn from_request(req: &mut RequestParts<B>) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req).await {
            Ok(Json(value)) => Ok(JsonBody(value)),
            Err(rejection) => Err(Error::bad_request(rejection.to_string())),
        }
    }
}

/// Everything a handler can fail with. The tag doubles as the `error` field
/// of the response body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "error")]
pub enum Error {
    BadRequest { message: String },
    Unauthorized { message: String },
    NotFound { message: String },
    InternalError { kind: &'static str, message: String },
}

impl Error {
    pub fn bad_request<S: Into<String>>(msg: S) -> Error {
        Error::BadRequest {
            message: msg.into(),
        }
    }

    pub fn not_found<S: Into<String>>(msg: S) -> Error {
        Error::NotFound {
            message: msg.into(),
        }
    }

    /// Credential, token and ownership failures all look the same to the caller.
    pub fn unauthorized() -> Error {
        Error::Unauthorized {
            message: "Unauthorized".to_string(),
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Error::BadRequest { .. } => StatusCode::BAD_REQUEST,
            Error::Unauthorized { .. } => StatusCode::UNAUTHORIZED,
            Error::NotFound { .. } => StatusCode::NOT_FOUND,
            Error::InternalError { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::BadRequest { message }
            | Error::Unauthorized { message }
            | Error::NotFound { message } => f.write_str(message),
            Error::InternalError { kind, message } => write!(f, "{}: {}", kind, message),
        }
    }
}

impl std::error::Error for Error {}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = match self {
            Error::InternalError { kind, message } => {
                log::error!("{}: {}", kind, message);
                Error::InternalError {
                    kind: "Internal",
                    message: "Internal server error".to_string(),
                }
            }
            other => other,
        };
        (status, Json(body)).into_response()
    }
}

impl From<ParseIntError> for Error {
    fn from(err: ParseIntError) -> Self {
        Self::BadRequest {
            message: format!("Invalid id: {}", err),
        }
    }
}

impl From<sqlx::Error> for Error {
    fn from(err: sqlx::Error) -> Self {
        Self::InternalError {
            kind: "DatabaseError",
            message: err.to_string(),
        }
    }
}

impl From<pbkdf2::password_hash::Error> for Error {
    fn from(err: pbkdf2::password_hash::Error) -> Self {
        Self::InternalError {
            kind: "HashingError",
            message: err.to_string(),
        }
    }
}

impl From<jsonwebtoken::errors::Error> for Error {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        Self::InternalError {
            kind: "SigningError",
            message: err.to_string(),
        }
    }
}

impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Self {
        Self::InternalError {
            kind: "Unknown",
            message: format!("{:#}", err),
        }
    }
}
