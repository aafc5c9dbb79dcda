//! Role and permission gates for request authorization.
//!
//! Roles act as coarse, area-wide pre-filters (for example the editorial
//! area). Individual operations inside an area are then gated by permission
//! codes, where holding any one of the listed codes suffices.

use crate::claims::AuthorizationClaims;
use crate::error::AuthorizationError;

/// Administrator role code.
pub const ADMIN: &str = "admin";

/// Editor role code.
pub const EDITOR: &str = "editor";

/// Default role code for ordinary users.
pub const USER: &str = "user";

/// Permission to administer roles and permissions.
pub const MANAGE_ROLES: &str = "manage_roles";

/// Permission to administer users.
pub const MANAGE_USERS: &str = "manage_users";

/// Gate admitting only identities whose role is in a fixed set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoleGate {
    allowed: &'static [&'static str],
}

impl RoleGate {
    /// Creates a gate for the given role codes.
    #[must_use]
    pub const fn new(allowed: &'static [&'static str]) -> Self {
        Self { allowed }
    }

    /// Gate for administrators only.
    #[must_use]
    pub const fn admin_only() -> Self {
        Self::new(&[ADMIN])
    }

    /// Gate for the editorial area.
    #[must_use]
    pub const fn editorial() -> Self {
        Self::new(&[ADMIN, EDITOR])
    }

    /// Returns the allowed role codes.
    #[must_use]
    pub fn allowed(&self) -> &'static [&'static str] {
        self.allowed
    }

    /// Checks an optional identity against the gate.
    ///
    /// A missing identity is treated like a disallowed role.
    pub fn check(&self, claims: Option<&AuthorizationClaims>) -> Result<(), AuthorizationError> {
        match claims {
            Some(claims) if claims.has_role_in(self.allowed) => Ok(()),
            Some(claims) => Err(AuthorizationError::RoleDenied {
                role: claims.role.clone(),
            }),
            None => Err(AuthorizationError::RoleDenied { role: None }),
        }
    }
}

/// Requires the identity to hold at least one of `required`.
pub fn require_any_permission(
    claims: Option<&AuthorizationClaims>,
    required: &[&str],
) -> Result<(), AuthorizationError> {
    let claims = claims.ok_or(AuthorizationError::NotAuthenticated)?;
    if claims.has_any_permission(required) {
        Ok(())
    } else {
        Err(AuthorizationError::PermissionDenied {
            required: required.iter().map(ToString::to_string).collect(),
        })
    }
}
