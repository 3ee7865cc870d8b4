use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{get, post},
};

/// Public Router Module
///
/// Browsing and the account gateway. Handlers here resolve the caller's identity
/// themselves and treat a missing one as Guest.
pub fn public_routes() -> Router<AppState> {
    Router::new()
        // GET /health
        // Liveness probe for load balancers.
        .route("/health", get(|| async { "ok" }))
        // GET / and GET /images
        // The gallery listing plus the caller's live role.
        .route("/", get(handlers::list_images))
        .route("/images", get(handlers::list_images))
        // POST /register
        // New account; 303 to the login page on success.
        .route("/register", post(handlers::register_user))
        // POST /login
        // Sets the identity cookie; 303 to the gallery.
        .route("/login", post(handlers::login))
        // POST /logout
        // Always succeeds, even without a session.
        .route("/logout", post(handlers::logout))
}
