use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use std::collections::BTreeMap;
use thiserror::Error;

use crate::models::{Notice, NoticeOutcome, PreservedInput};
use crate::policy::Denial;

/// Shown for every collaborator failure. Details go to the log, never to the client.
pub const GENERIC_FAILURE: &str = "Something went wrong while processing your request.";

/// Shown for every failed login, whichever credential was wrong.
pub const INVALID_CREDENTIALS: &str = "Invalid username or password.";

// --- Collaborator Errors ---

/// StoreError
///
/// Failures of the persistence collaborator. These are fatal for the current request.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    /// A uniqueness constraint rejected the write.
    #[error("duplicate value for `{0}`")]
    Conflict(&'static str),
}

/// StorageError
///
/// Failures of the blob-store collaborator.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("blob io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid file name `{0}`")]
    InvalidName(String),
    #[error("object storage error: {0}")]
    Remote(String),
}

/// HashError
#[derive(Debug, Error, PartialEq, Eq)]
pub enum HashError {
    #[error("password cannot be null or empty")]
    InvalidInput,
}

// --- Field Validation ---

/// ValidationErrors
///
/// Field-tagged messages. A field can carry several messages and several fields can
/// fail at once. Ordered by field name so responses are stable.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ValidationErrors(BTreeMap<String, Vec<String>>);

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.0
            .entry(field.to_string())
            .or_default()
            .push(message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn field(&self, field: &str) -> &[String] {
        self.0.get(field).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn has_field(&self, field: &str) -> bool {
        self.0.contains_key(field)
    }

    /// Returns `Ok(())` when nothing was recorded, otherwise hands the set back.
    pub fn into_result(self) -> Result<(), ValidationErrors> {
        if self.is_empty() { Ok(()) } else { Err(self) }
    }
}

#[derive(Serialize)]
struct ErrorBody<'a> {
    message: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    errors: Option<&'a ValidationErrors>,
    #[serde(skip_serializing_if = "Option::is_none")]
    input: Option<&'a PreservedInput>,
}

fn error_response(status: StatusCode, message: &str) -> Response {
    let body = ErrorBody {
        message,
        errors: None,
        input: None,
    };
    (status, Json(body)).into_response()
}

fn validation_response(errors: &ValidationErrors, input: Option<&PreservedInput>) -> Response {
    let body = ErrorBody {
        message: "One or more fields are invalid.",
        errors: Some(errors),
        input,
    };
    (StatusCode::UNPROCESSABLE_ENTITY, Json(body)).into_response()
}

// --- Flow Errors ---

/// RegistrationError
#[derive(Debug, Error)]
pub enum RegistrationError {
    #[error("registration input is invalid")]
    Invalid {
        errors: ValidationErrors,
        input: PreservedInput,
    },
    #[error("username is already taken")]
    UsernameTaken { input: PreservedInput },
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl IntoResponse for RegistrationError {
    fn into_response(self) -> Response {
        match self {
            RegistrationError::Invalid { errors, input } => {
                validation_response(&errors, Some(&input))
            }
            RegistrationError::UsernameTaken { input } => {
                let mut errors = ValidationErrors::new();
                errors.add("username", "Username is already taken.");
                validation_response(&errors, Some(&input))
            }
            RegistrationError::Store(e) => {
                tracing::error!("registration store failure: {:?}", e);
                error_response(StatusCode::INTERNAL_SERVER_ERROR, GENERIC_FAILURE)
            }
        }
    }
}

/// AuthError
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("password is required")]
    MissingPassword,
    #[error("invalid username or password")]
    InvalidCredentials,
    #[error("could not issue identity cookie: {0}")]
    Token(#[from] jsonwebtoken::errors::Error),
    #[error("identity cookie is not a valid header value")]
    CookieHeader(#[from] axum::http::header::InvalidHeaderValue),
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl From<HashError> for AuthError {
    fn from(_: HashError) -> Self {
        AuthError::MissingPassword
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        match self {
            AuthError::MissingPassword => {
                let mut errors = ValidationErrors::new();
                errors.add("password", "Password is required.");
                validation_response(&errors, None)
            }
            AuthError::InvalidCredentials => {
                error_response(StatusCode::UNAUTHORIZED, INVALID_CREDENTIALS)
            }
            AuthError::Token(e) => {
                tracing::error!("token encoding failure: {:?}", e);
                error_response(StatusCode::INTERNAL_SERVER_ERROR, GENERIC_FAILURE)
            }
            AuthError::CookieHeader(e) => {
                tracing::error!("cookie header failure: {:?}", e);
                error_response(StatusCode::INTERNAL_SERVER_ERROR, GENERIC_FAILURE)
            }
            AuthError::Store(e) => {
                tracing::error!("login store failure: {:?}", e);
                error_response(StatusCode::INTERNAL_SERVER_ERROR, GENERIC_FAILURE)
            }
        }
    }
}

/// GalleryError
///
/// Outcomes of the image operations other than success. `Denied` is an expected
/// result rendered as a notice, not as an HTTP failure.
#[derive(Debug, Error)]
pub enum GalleryError {
    #[error("{}", .0.message)]
    Denied(Denial),
    #[error("image not found")]
    NotFound,
    #[error("invalid id format: `{0}`")]
    MalformedId(String),
    #[error("mismatch between id and image id")]
    IdMismatch,
    #[error("submitted form is invalid")]
    Invalid(ValidationErrors),
    #[error("upload exceeds the request size limit")]
    UploadTooLarge,
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl IntoResponse for GalleryError {
    fn into_response(self) -> Response {
        match self {
            GalleryError::Denied(denial) => {
                let notice = Notice {
                    outcome: NoticeOutcome::Denied,
                    message: denial.message.to_string(),
                };
                (StatusCode::OK, Json(notice)).into_response()
            }
            GalleryError::NotFound => error_response(StatusCode::NOT_FOUND, "Image not found."),
            GalleryError::MalformedId(_) => {
                error_response(StatusCode::BAD_REQUEST, "Invalid id format.")
            }
            GalleryError::IdMismatch => {
                error_response(StatusCode::BAD_REQUEST, "Mismatch between id and image id.")
            }
            GalleryError::Invalid(errors) => validation_response(&errors, None),
            GalleryError::UploadTooLarge => {
                error_response(StatusCode::PAYLOAD_TOO_LARGE, "The uploaded file is too large.")
            }
            GalleryError::Store(e) => {
                tracing::error!("image store failure: {:?}", e);
                error_response(StatusCode::INTERNAL_SERVER_ERROR, GENERIC_FAILURE)
            }
            GalleryError::Storage(e) => {
                tracing::error!("blob store failure: {:?}", e);
                error_response(StatusCode::INTERNAL_SERVER_ERROR, GENERIC_FAILURE)
            }
        }
    }
}
