//! Kateglo identity server.
//!
//! This crate provides the HTTP surface for Google login, stateless session
//! tokens, and the editorial role and permission administration API.

pub mod admin;
pub mod auth;
pub mod config;
pub mod db;
pub mod error;

use axum::{Router, middleware, routing::get};
use tower_http::trace::TraceLayer;

use auth::AppState;

/// Builds the application router.
pub fn app(state: AppState) -> Router {
    let me = Router::new()
        .route("/auth/me", get(auth::me))
        .layer(middleware::from_fn_with_state(
            state.tokens.clone(),
            auth::require_auth,
        ));

    Router::new()
        .route("/auth/google", get(auth::google_login))
        .route("/auth/google/callback", get(auth::google_callback))
        .merge(me)
        .nest("/api/admin", admin::router(&state))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
