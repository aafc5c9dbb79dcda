//! Identity and authorization claims.
//!
//! - `ProviderProfile`: the verified profile returned by the identity provider
//! - `RoleGrant`: a role as resolved for token issuance
//! - `AuthorizationClaims`: the fixed claim set embedded in a session token

use kateglo_core::UserId;
use serde::{Deserialize, Serialize};

/// Profile returned by the provider's userinfo endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderProfile {
    /// Provider subject identifier.
    pub id: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    /// Avatar URL.
    #[serde(default)]
    pub picture: Option<String>,
}

/// Role data resolved once at token issuance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleGrant {
    /// Role code, e.g. `admin`.
    pub code: String,
    /// Whether the role may enter the editorial area.
    pub editorial_access: bool,
}

impl RoleGrant {
    /// Grant used when a user's role cannot be resolved.
    #[must_use]
    pub fn fallback() -> Self {
        Self {
            code: crate::role::USER.to_string(),
            editorial_access: false,
        }
    }
}

/// Claim set carried by a session token.
///
/// This is a snapshot taken at issuance. Role or permission changes made
/// afterwards are only visible once the user logs in again.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorizationClaims {
    /// Provider subject identifier.
    #[serde(rename = "sub")]
    pub subject: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub picture: Option<String>,
    /// Identity provider tag, e.g. `google`.
    pub provider: String,
    /// Internal user ID, absent when the directory did not resolve one.
    #[serde(rename = "uid", default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<UserId>,
    /// Resolved role code.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default)]
    pub editorial_access: bool,
    /// Permission codes granted through the role.
    #[serde(default)]
    pub permissions: Vec<String>,
}

impl AuthorizationClaims {
    /// Creates identity-only claims from a provider profile.
    #[must_use]
    pub fn from_profile(profile: &ProviderProfile, provider: &str) -> Self {
        Self {
            subject: profile.id.clone(),
            email: profile.email.clone(),
            name: profile.name.clone(),
            picture: profile.picture.clone(),
            provider: provider.to_string(),
            user_id: None,
            role: None,
            editorial_access: false,
            permissions: Vec::new(),
        }
    }

    /// Attaches the internal user ID.
    #[must_use]
    pub fn with_user_id(mut self, user_id: UserId) -> Self {
        self.user_id = Some(user_id);
        self
    }

    /// Attaches the resolved role.
    #[must_use]
    pub fn with_role(mut self, grant: RoleGrant) -> Self {
        self.role = Some(grant.code);
        self.editorial_access = grant.editorial_access;
        self
    }

    /// Attaches the permission codes.
    #[must_use]
    pub fn with_permissions(mut self, permissions: Vec<String>) -> Self {
        self.permissions = permissions;
        self
    }

    /// Returns true if any of `required` is held (OR semantics).
    #[must_use]
    pub fn has_any_permission(&self, required: &[&str]) -> bool {
        required
            .iter()
            .any(|code| self.permissions.iter().any(|held| held == code))
    }

    /// Returns true if the role code is one of `allowed`.
    #[must_use]
    pub fn has_role_in(&self, allowed: &[&str]) -> bool {
        self.role
            .as_deref()
            .is_some_and(|role| allowed.contains(&role))
    }
}
