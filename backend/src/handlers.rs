use crate::{
    AppState, accounts,
    auth::{self, AuthUser, Identity},
    error::{AuthError, GalleryError, RegistrationError, ValidationErrors},
    gallery::{self, ImageForm, Upload},
    models::{
        GalleryListing, ImageRecord, ImageUploadForm, LoginRequest, Notice, NoticeOutcome,
        RegisterRequest,
    },
    policy::{self, Decision},
};
use axum::{
    Json,
    extract::{Multipart, Path, State, multipart::MultipartError},
    http::{StatusCode, header},
    response::{AppendHeaders, IntoResponse, Redirect},
};

/// Where every successful gallery mutation sends the client.
pub const GALLERY_HOME: &str = "/";
pub const LOGIN_PAGE: &str = "/login";

// --- Form Binding ---

/// read_image_form
///
/// Collects the multipart fields of a create or edit submission. Field names are matched
/// case-insensitively; unknown fields are skipped.
pub async fn read_image_form(mut multipart: Multipart) -> Result<ImageForm, GalleryError> {
    let mut form = ImageForm::default();

    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(e) => return Err(form_error(e)),
        };

        let name = field.name().unwrap_or_default().to_ascii_lowercase();
        match name.as_str() {
            "imagefile" | "file" => {
                let filename = field.file_name().unwrap_or_default().to_string();
                let bytes = field.bytes().await.map_err(form_error)?;
                form.file = Some(Upload { filename, bytes });
            }
            "id" | "title" | "description" => {
                let text = field.text().await.map_err(form_error)?;
                match name.as_str() {
                    "id" => form.id = Some(text),
                    "title" => form.title = Some(text),
                    _ => form.description = Some(text),
                }
            }
            _ => {}
        }
    }

    Ok(form)
}

fn form_error(e: MultipartError) -> GalleryError {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        return GalleryError::UploadTooLarge;
    }
    let mut errors = ValidationErrors::new();
    errors.add("form", e.body_text());
    GalleryError::Invalid(errors)
}

// --- Handlers ---

/// list_images
///
/// [Public Route] Every image, plus the caller's live role.
#[utoipa::path(
    get,
    path = "/images",
    responses((status = 200, description = "Gallery", body = GalleryListing))
)]
pub async fn list_images(
    identity: Identity,
    State(state): State<AppState>,
) -> Result<Json<GalleryListing>, GalleryError> {
    let role = policy::resolve_role(state.repo.as_ref(), identity.username()).await?;
    let images = gallery::list_images(state.repo.as_ref()).await?;
    Ok(Json(GalleryListing { role, images }))
}

/// register_user
///
/// [Public Route] Creates an account and sends the client to the login page.
#[utoipa::path(
    post,
    path = "/register",
    request_body = RegisterRequest,
    responses(
        (status = 303, description = "Registered, redirect to login"),
        (status = 422, description = "Field errors with preserved input")
    )
)]
pub async fn register_user(
    State(state): State<AppState>,
    Json(payload): Json<RegisterRequest>,
) -> Result<Redirect, RegistrationError> {
    accounts::register(
        state.repo.as_ref(),
        payload.username.as_deref(),
        payload.password.as_deref(),
        payload.role,
    )
    .await?;
    Ok(Redirect::to(LOGIN_PAGE))
}

/// login
///
/// [Public Route] Verifies credentials, opens a session and sets the identity cookie.
#[utoipa::path(
    post,
    path = "/login",
    request_body = LoginRequest,
    responses(
        (status = 303, description = "Logged in, identity cookie set"),
        (status = 401, description = "Invalid username or password"),
        (status = 422, description = "Password missing")
    )
)]
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<impl IntoResponse, AuthError> {
    let session = accounts::login(
        state.repo.as_ref(),
        state.sessions.as_ref(),
        &payload.username,
        payload.password.as_deref(),
    )
    .await?;

    let cookie = match auth::issue_identity_cookie(&state.config, &session) {
        Ok(cookie) => cookie,
        Err(e) => {
            // No cookie means no usable login; do not leave the session behind.
            accounts::logout(state.sessions.as_ref(), Some(session.token)).await;
            return Err(e);
        }
    };

    Ok((
        AppendHeaders([(header::SET_COOKIE, cookie)]),
        Redirect::to(GALLERY_HOME),
    ))
}

/// logout
///
/// [Public Route] Ends the session, if any, and clears the identity cookie. Always
/// succeeds.
#[utoipa::path(
    post,
    path = "/logout",
    responses((status = 303, description = "Logged out, redirect to login"))
)]
pub async fn logout(identity: Identity, State(state): State<AppState>) -> impl IntoResponse {
    accounts::logout(state.sessions.as_ref(), identity.session).await;
    (
        AppendHeaders([(header::SET_COOKIE, auth::clear_identity_cookie())]),
        Redirect::to(LOGIN_PAGE),
    )
}

/// new_image_form
///
/// [Authenticated Route] Tells the client whether the upload form may be shown.
#[utoipa::path(
    get,
    path = "/images/create",
    responses((status = 200, description = "Allowed or denied notice", body = Notice))
)]
pub async fn new_image_form(
    AuthUser { role, .. }: AuthUser,
) -> Result<Json<Notice>, GalleryError> {
    match gallery::create_gate(role) {
        Decision::Allowed => Ok(Json(Notice {
            outcome: NoticeOutcome::Allowed,
            message: "You may add images.".to_string(),
        })),
        Decision::Denied(denial) => Err(GalleryError::Denied(denial)),
    }
}

/// create_image
///
/// [Authenticated Route] Uploads a file and creates its gallery record. Requires a
/// non-Guest role.
#[utoipa::path(
    post,
    path = "/images/create",
    request_body(content = ImageUploadForm, content_type = "multipart/form-data"),
    responses(
        (status = 303, description = "Created, redirect to gallery"),
        (status = 200, description = "Denied notice", body = Notice),
        (status = 413, description = "Upload exceeds MAX_UPLOAD_BYTES"),
        (status = 422, description = "Missing image file")
    )
)]
pub async fn create_image(
    AuthUser { role, .. }: AuthUser,
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Redirect, GalleryError> {
    // Gate before reading the body so a denied caller uploads nothing.
    policy::authorize(role, policy::Action::Create)
        .into_result()
        .map_err(GalleryError::Denied)?;

    let form = read_image_form(multipart).await?;
    gallery::create_image(state.repo.as_ref(), state.storage.as_ref(), role, form).await?;
    Ok(Redirect::to(GALLERY_HOME))
}

/// edit_image_form
///
/// [Authenticated Route] The record to pre-fill the edit form with.
#[utoipa::path(
    get,
    path = "/images/{id}/edit",
    params(("id" = String, Path, description = "Image ID")),
    responses(
        (status = 200, description = "Current record", body = ImageRecord),
        (status = 400, description = "Malformed id"),
        (status = 404, description = "Not Found")
    )
)]
pub async fn edit_image_form(
    AuthUser { role, .. }: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ImageRecord>, GalleryError> {
    let image = gallery::edit_form(state.repo.as_ref(), role, &id).await?;
    Ok(Json(image))
}

/// edit_image
///
/// [Authenticated Route] Applies only the fields that changed. Blank fields keep their
/// stored value; a new file always replaces the media reference.
#[utoipa::path(
    post,
    path = "/images/{id}/edit",
    params(("id" = String, Path, description = "Image ID")),
    request_body(content = ImageUploadForm, content_type = "multipart/form-data"),
    responses(
        (status = 303, description = "Updated, redirect to gallery"),
        (status = 200, description = "Denied notice", body = Notice),
        (status = 400, description = "Malformed or mismatched id"),
        (status = 404, description = "Not Found")
    )
)]
pub async fn edit_image(
    AuthUser { role, .. }: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
    multipart: Multipart,
) -> Result<Redirect, GalleryError> {
    policy::authorize(role, policy::Action::Edit)
        .into_result()
        .map_err(GalleryError::Denied)?;

    let form = read_image_form(multipart).await?;
    gallery::edit_image(state.repo.as_ref(), state.storage.as_ref(), role, &id, form).await?;
    Ok(Redirect::to(GALLERY_HOME))
}

/// delete_image
///
/// [Admin Route] Removes an image record. Requires the Admin role.
#[utoipa::path(
    post,
    path = "/admin/images/{id}/delete",
    params(("id" = String, Path, description = "Image ID")),
    responses(
        (status = 303, description = "Deleted, redirect to gallery"),
        (status = 200, description = "Denied notice", body = Notice),
        (status = 400, description = "Malformed id"),
        (status = 404, description = "Not Found")
    )
)]
pub async fn delete_image(
    AuthUser { role, .. }: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Redirect, GalleryError> {
    gallery::delete_image(state.repo.as_ref(), role, &id).await?;
    Ok(Redirect::to(GALLERY_HOME))
}
