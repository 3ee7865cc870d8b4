use crate::{AppState, handlers};
use axum::{Router, routing::get};

/// Authenticated Router Module
///
/// Upload and edit. Wrapped in the `AuthUser` middleware by `create_router`, so every
/// handler here receives a logged-in caller and a freshly resolved role. A Guest still
/// gets through the middleware and is turned away by the gate with a notice.
pub fn authenticated_routes() -> Router<AppState> {
    Router::<AppState>::new()
        // GET /images/create: may the upload form be shown?
        // POST /images/create: multipart upload, 303 to the gallery.
        .route(
            "/images/create",
            get(handlers::new_image_form).post(handlers::create_image),
        )
        // GET /images/{id}/edit: current record for the edit form.
        // POST /images/{id}/edit: multipart partial update.
        .route(
            "/images/{id}/edit",
            get(handlers::edit_image_form).post(handlers::edit_image),
        )
}
