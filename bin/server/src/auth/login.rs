//! Turns a verified provider profile into a session token.

use kateglo_platform_access::provider::PROVIDER_TAG;
use kateglo_platform_access::{
    AuthenticationError, AuthorizationClaims, ProviderProfile, SessionTokens, UserDirectory,
};
use std::fmt;

/// Failures while completing a login.
#[derive(Debug)]
pub enum LoginError {
    /// The code exchange or profile fetch failed.
    Provider(AuthenticationError),
    /// The user directory failed.
    Directory { details: String },
    /// The session token could not be issued.
    Token(AuthenticationError),
}

impl fmt::Display for LoginError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Provider(e) => write!(f, "provider login failed: {e}"),
            Self::Directory { details } => write!(f, "user directory error: {details}"),
            Self::Token(e) => write!(f, "token issuance failed: {e}"),
        }
    }
}

impl std::error::Error for LoginError {}

/// Records the login and issues a session token.
///
/// The user is upserted, promoted when on the bootstrap list, and their
/// role and permissions are resolved once and frozen into the token.
pub async fn complete_login<D>(
    directory: &D,
    tokens: &SessionTokens,
    profile: &ProviderProfile,
) -> Result<String, LoginError>
where
    D: UserDirectory + ?Sized,
{
    let directory_error = |e: D::Error| LoginError::Directory {
        details: e.to_string(),
    };

    let user = directory
        .upsert_from_provider(profile)
        .await
        .map_err(directory_error)?;
    let user = directory
        .bootstrap_privileged_role(user)
        .await
        .map_err(directory_error)?;

    let grant = directory
        .resolve_role_for_token(user.role_id)
        .await
        .map_err(directory_error)?;
    let permissions = match user.role_id {
        Some(role_id) => directory
            .list_permission_codes(role_id)
            .await
            .map_err(directory_error)?,
        None => Vec::new(),
    };

    tracing::info!(
        user_id = %user.id,
        role = %grant.code,
        permissions = permissions.len(),
        "User logged in"
    );

    let claims = AuthorizationClaims::from_profile(profile, PROVIDER_TAG)
        .with_user_id(user.id)
        .with_role(grant)
        .with_permissions(permissions);

    tokens.issue(claims, None).map_err(LoginError::Token)
}
