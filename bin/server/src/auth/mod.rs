//! Authentication module for the Kateglo server.
//!
//! This module provides:
//! - The Google OAuth login flow (`google`, `routes`)
//! - Session token issuance after login (`login`)
//! - Authentication and authorization middleware for Axum routes
//!
//! # Authorization Model
//!
//! Sessions are stateless. The role, editorial flag, and permission codes
//! are resolved once at login and frozen into the signed token. Changes to
//! a user's role take effect on their next login or when the token expires.

pub mod google;
pub mod login;
pub mod middleware;
pub mod routes;

use axum::extract::FromRef;
use kateglo_platform_access::{AdminEmails, OriginAllowList, SessionTokens};
use sqlx::PgPool;

pub use google::GoogleOAuthClient;
pub use login::{LoginError, complete_login};
pub use middleware::{
    AuthRejection, Identity, OptionalAuth, PermissionGate, RequireAuth, optional_auth,
    require_any_of, require_auth, require_permission, require_role,
};
pub use routes::{google_callback, google_login, me};

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool.
    pub db_pool: PgPool,
    /// Google OAuth client.
    pub google: GoogleOAuthClient,
    /// Session token issuer and verifier.
    pub tokens: SessionTokens,
    /// Front-end origins allowed to receive login redirects.
    pub origins: OriginAllowList,
    /// Emails promoted to administrator on login.
    pub admin_emails: AdminEmails,
}

impl AppState {
    /// Creates a new application state.
    pub fn new(
        db_pool: PgPool,
        google: GoogleOAuthClient,
        tokens: SessionTokens,
        origins: OriginAllowList,
        admin_emails: AdminEmails,
    ) -> Self {
        Self {
            db_pool,
            google,
            tokens,
            origins,
            admin_emails,
        }
    }
}

impl FromRef<AppState> for SessionTokens {
    fn from_ref(state: &AppState) -> Self {
        state.tokens.clone()
    }
}
