/// Router Module Index
///
/// Routes are grouped by the access they require, so the authentication layer is
/// attached per group in `create_router` rather than per handler.

/// Reachable by anyone, logged in or not.
pub mod public;

/// Requires a live login. The gate decides what the resolved role may do.
pub mod authenticated;

/// Requires a live login; every operation here is Admin-gated.
pub mod admin;
