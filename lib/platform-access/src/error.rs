//! Error types for the platform-access crate.
//!
//! - `AuthenticationError`: failures establishing identity (provider
//!   exchange, token issuance and verification, missing configuration)
//! - `AuthorizationError`: failures of role and permission gates

use std::fmt;

/// Coarse classification used by transport layers to pick a response status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// A required secret or credential is not configured (service unavailable).
    ConfigurationIncomplete,
    /// The external identity provider rejected the exchange or profile fetch.
    UpstreamAuthenticationFailed,
    /// No, invalid, or expired bearer credential.
    Unauthenticated,
    /// Valid credential with insufficient role or permission.
    Forbidden,
}

/// Errors from authentication operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthenticationError {
    /// A required configuration value is absent.
    NotConfigured { setting: &'static str },
    /// The request carried no bearer credential, or used another scheme.
    MissingCredential,
    /// Token signature or structure is invalid.
    InvalidToken { reason: String },
    /// Token has expired.
    TokenExpired,
    /// The provider answered with a non-success status.
    ProviderRejected { stage: &'static str, details: String },
    /// The provider could not be reached or answered with garbage.
    ProviderUnreachable { stage: &'static str, details: String },
    /// Token could not be signed.
    SigningFailed { reason: String },
}

impl AuthenticationError {
    /// Returns the failure class of this error.
    #[must_use]
    pub fn kind(&self) -> FailureKind {
        match self {
            Self::NotConfigured { .. } | Self::SigningFailed { .. } => {
                FailureKind::ConfigurationIncomplete
            }
            Self::MissingCredential | Self::InvalidToken { .. } | Self::TokenExpired => {
                FailureKind::Unauthenticated
            }
            Self::ProviderRejected { .. } | Self::ProviderUnreachable { .. } => {
                FailureKind::UpstreamAuthenticationFailed
            }
        }
    }
}

impl fmt::Display for AuthenticationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotConfigured { setting } => {
                write!(f, "configuration {setting} is not set")
            }
            Self::MissingCredential => write!(f, "bearer credential is missing"),
            Self::InvalidToken { reason } => write!(f, "invalid token: {reason}"),
            Self::TokenExpired => write!(f, "token has expired"),
            Self::ProviderRejected { stage, details } => {
                write!(f, "identity provider rejected {stage}: {details}")
            }
            Self::ProviderUnreachable { stage, details } => {
                write!(f, "identity provider unreachable during {stage}: {details}")
            }
            Self::SigningFailed { reason } => write!(f, "failed to sign token: {reason}"),
        }
    }
}

impl std::error::Error for AuthenticationError {}

/// Errors from authorization gates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthorizationError {
    /// No identity is attached to the request.
    NotAuthenticated,
    /// The identity holds none of the required permissions.
    PermissionDenied { required: Vec<String> },
    /// The identity's role is not in the allowed set.
    RoleDenied { role: Option<String> },
}

impl AuthorizationError {
    /// Returns the failure class of this error.
    #[must_use]
    pub fn kind(&self) -> FailureKind {
        match self {
            Self::NotAuthenticated => FailureKind::Unauthenticated,
            Self::PermissionDenied { .. } | Self::RoleDenied { .. } => FailureKind::Forbidden,
        }
    }
}

impl fmt::Display for AuthorizationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotAuthenticated => write!(f, "user is not authenticated"),
            Self::PermissionDenied { required } => {
                write!(f, "user lacks any of the permissions [{}]", required.join(", "))
            }
            Self::RoleDenied { role: Some(role) } => {
                write!(f, "role '{role}' may not access this area")
            }
            Self::RoleDenied { role: None } => write!(f, "user has no role"),
        }
    }
}

impl std::error::Error for AuthorizationError {}
