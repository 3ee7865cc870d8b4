use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::fmt;
use std::str::FromStr;
use ts_rs::TS;
use utoipa::ToSchema;
use uuid::Uuid;

// --- Core Records ---

/// Role
///
/// The three access tiers of the gallery. Stored as text in the `users.role` column
/// using exactly the variant names below.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub enum Role {
    #[default]
    Guest,
    NormalUser,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Guest => "Guest",
            Role::NormalUser => "NormalUser",
            Role::Admin => "Admin",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Guest" => Ok(Role::Guest),
            "NormalUser" => Ok(Role::NormalUser),
            "Admin" => Ok(Role::Admin),
            other => Err(format!("unknown role `{}`", other)),
        }
    }
}

/// User
///
/// A stored account. `role` is kept as the raw stored text (possibly absent) so that
/// defaulting happens in exactly one place, the role resolver.
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Default)]
pub struct User {
    pub id: Uuid,
    /// Case-sensitive, unique across all users.
    pub username: String,
    /// Output of `password::hash`. Never the plaintext.
    pub password_digest: String,
    pub role: Option<String>,
}

/// ImageRecord
///
/// A gallery entry. `media_ref` is whatever the blob store returned when the file was
/// saved (a `/images/...` path locally, an object URL on S3).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[ts(export)]
pub struct ImageRecord {
    pub id: Uuid,
    pub title: Option<String>,
    pub description: Option<String>,
    pub media_ref: String,
}

/// UpdatePatch
///
/// The field assignments the differ decided to persist. `None` means "leave the
/// stored value alone". The record id is never part of a patch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct UpdatePatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub media_ref: Option<String>,
}

impl UpdatePatch {
    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.description.is_none() && self.media_ref.is_none()
    }
}

/// NewUser
///
/// Insert payload for the user store. By the time a `NewUser` exists the password has
/// been hashed and the role defaulted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewUser {
    pub username: String,
    pub password_digest: String,
    pub role: Role,
}

/// NewImage
///
/// Insert payload for the image store; the store assigns the id.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct NewImage {
    pub title: Option<String>,
    pub description: Option<String>,
    pub media_ref: String,
}

// --- Request Payloads ---

/// RegisterRequest
///
/// Input for `POST /register`. Both credentials are optional at the wire level so that
/// "missing" surfaces as a field-tagged validation error instead of a 400 from serde.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct RegisterRequest {
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default)]
    pub role: Option<Role>,
}

/// LoginRequest
///
/// Input for `POST /login`.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct LoginRequest {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: Option<String>,
}

// --- Responses ---

/// GalleryListing
///
/// Output of the public listing. Carries the caller's live role so the client can
/// decide which controls to show.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct GalleryListing {
    pub role: Role,
    pub images: Vec<ImageRecord>,
}

/// Notice
///
/// A user-facing message returned instead of performing an action. The client is
/// expected to show `message` and leave the user on the current page.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, PartialEq, Eq)]
#[ts(export)]
pub struct Notice {
    pub outcome: NoticeOutcome,
    pub message: String,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, TS, ToSchema, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
#[ts(export)]
pub enum NoticeOutcome {
    Allowed,
    Denied,
}

/// PreservedInput
///
/// The registration fields echoed back with validation errors. Never carries the
/// password.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default, PartialEq, Eq)]
#[ts(export)]
pub struct PreservedInput {
    pub username: Option<String>,
    pub role: Option<Role>,
}

/// ImageUploadForm
///
/// OpenAPI description of the multipart body accepted by create and edit. Handlers read
/// the parts directly; this type only documents them.
#[derive(Debug, Deserialize, ToSchema)]
pub struct ImageUploadForm {
    /// Edit only: must match the id in the path when present.
    pub id: Option<String>,
    pub title: Option<String>,
    pub description: Option<String>,
    #[serde(rename = "imageFile")]
    #[schema(value_type = Option<String>, format = Binary)]
    pub image_file: Option<Vec<u8>>,
}
