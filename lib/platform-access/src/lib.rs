//! Platform access, authentication, and authorization claims for Kateglo.
//!
//! This crate provides:
//! - Front-end origin allow-list and login redirect targets (`origin`)
//! - The opaque OAuth state codec (`state`)
//! - Google provider configuration (`provider`)
//! - Authorization claims and session tokens (`claims`, `token`)
//! - Role and permission gates (`role`)
//! - The user directory boundary used during login (`user`)
//!
//! # Example
//!
//! ```
//! use kateglo_platform_access::{
//!     AuthorizationClaims, ProviderProfile, RoleGrant, SessionTokens,
//! };
//!
//! let profile = ProviderProfile {
//!     id: "1234567890".to_string(),
//!     email: Some("alice@example.com".to_string()),
//!     name: Some("Alice".to_string()),
//!     picture: None,
//! };
//!
//! let claims = AuthorizationClaims::from_profile(&profile, "google")
//!     .with_role(RoleGrant { code: "editor".to_string(), editorial_access: true })
//!     .with_permissions(vec!["manage_roles".to_string()]);
//!
//! let tokens = SessionTokens::with_secret("change-me");
//! let token = tokens.issue(claims, None).unwrap();
//! let verified = tokens.verify(&token).unwrap();
//!
//! assert!(verified.has_any_permission(&["manage_roles", "manage_users"]));
//! ```

pub mod claims;
pub mod error;
pub mod origin;
pub mod provider;
pub mod role;
pub mod state;
pub mod token;
pub mod user;

// Re-export main types at crate root
pub use claims::{AuthorizationClaims, ProviderProfile, RoleGrant};
pub use error::{AuthenticationError, AuthorizationError, FailureKind};
pub use origin::{OriginAllowList, normalize_origin};
pub use provider::GoogleConfig;
pub use role::{RoleGate, require_any_permission};
pub use state::OAuthState;
pub use token::{SessionConfig, SessionTokens, bearer_token};
pub use user::{AdminEmails, User, UserDirectory};
