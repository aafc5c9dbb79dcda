//! User domain type and the user directory boundary.
//!
//! Users are identified by their provider subject and carry an internal
//! [`UserId`] and an optional role. The directory that stores them lives
//! outside this crate; login only needs the four operations of
//! [`UserDirectory`].

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use kateglo_core::{RoleId, UserId};
use serde::{Deserialize, Serialize};

use crate::claims::{ProviderProfile, RoleGrant};

/// A platform user as stored in the directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// Internal platform user ID.
    pub id: UserId,
    /// Provider subject identifier.
    pub provider_subject: String,
    pub email: Option<String>,
    pub name: Option<String>,
    pub avatar_url: Option<String>,
    /// Assigned role, if any.
    pub role_id: Option<RoleId>,
    pub active: bool,
    pub last_login_at: Option<DateTime<Utc>>,
}

/// User store consulted during login.
#[async_trait]
pub trait UserDirectory: Send + Sync {
    /// Storage error type.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Inserts or refreshes the user identified by the profile's subject.
    async fn upsert_from_provider(&self, profile: &ProviderProfile) -> Result<User, Self::Error>;

    /// Promotes the user to the administrator role when their email is on
    /// the bootstrap allow-list. Idempotent.
    async fn bootstrap_privileged_role(&self, user: User) -> Result<User, Self::Error>;

    /// Resolves the role data embedded in tokens.
    async fn resolve_role_for_token(&self, role_id: Option<RoleId>)
    -> Result<RoleGrant, Self::Error>;

    /// Lists the sorted permission codes granted to a role.
    async fn list_permission_codes(&self, role_id: RoleId) -> Result<Vec<String>, Self::Error>;
}

/// Emails promoted to administrator on login.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AdminEmails(Vec<String>);

impl AdminEmails {
    /// Parses a comma-separated list; entries are trimmed and lower-cased.
    #[must_use]
    pub fn from_csv(value: &str) -> Self {
        Self(
            value
                .split(',')
                .map(|email| email.trim().to_lowercase())
                .filter(|email| !email.is_empty())
                .collect(),
        )
    }

    /// Returns true if `email` is on the list, ignoring case.
    #[must_use]
    pub fn contains(&self, email: &str) -> bool {
        let email = email.trim().to_lowercase();
        !email.is_empty() && self.0.contains(&email)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn admin_emails_parse_and_match_case_insensitively() {
        let emails = AdminEmails::from_csv(" Admin@Kateglo.org ,, editor@kateglo.org ");
        assert!(!emails.is_empty());
        assert!(emails.contains("admin@kateglo.org"));
        assert!(emails.contains("EDITOR@KATEGLO.ORG"));
        assert!(!emails.contains("someone@kateglo.org"));
        assert!(!emails.contains(""));
    }

    #[test]
    fn empty_admin_emails() {
        let emails = AdminEmails::from_csv("");
        assert!(emails.is_empty());
        assert!(!emails.contains("admin@kateglo.org"));
    }
}
