use crate::{AppState, handlers};
use axum::{Router, routing::post};

/// Admin Router Module
///
/// Nested under `/admin`. Login is enforced by the layer in `create_router`; the Admin
/// role is enforced by the Delete gate, which answers non-admins with a notice.
pub fn admin_routes() -> Router<AppState> {
    Router::new()
        // POST /admin/images/{id}/delete
        .route("/images/{id}/delete", post(handlers::delete_image))
}
