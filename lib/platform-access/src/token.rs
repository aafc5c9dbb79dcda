//! Stateless session tokens.
//!
//! Tokens are HS256 JWTs carrying [`AuthorizationClaims`] plus `iat` and
//! `exp`. Verification needs only the signing secret, never a session store.

use chrono::{Duration, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::claims::AuthorizationClaims;
use crate::error::AuthenticationError;

/// Session token configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct SessionConfig {
    /// HMAC signing secret. Token operations fail while it is unset.
    #[serde(default)]
    pub jwt_secret: Option<String>,

    /// Token lifetime in minutes.
    #[serde(default = "default_ttl_minutes")]
    pub ttl_minutes: i64,
}

/// Longest configurable token lifetime, in minutes (one year).
pub const MAX_TTL_MINUTES: i64 = 365 * 24 * 60;

fn default_ttl_minutes() -> i64 {
    7 * 24 * 60
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            jwt_secret: None,
            ttl_minutes: default_ttl_minutes(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct SignedClaims {
    #[serde(flatten)]
    claims: AuthorizationClaims,
    iat: i64,
    exp: i64,
}

/// Issues and verifies session tokens.
#[derive(Clone)]
pub struct SessionTokens {
    secret: Option<String>,
    default_ttl: Duration,
}

impl std::fmt::Debug for SessionTokens {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionTokens")
            .field("secret", &self.secret.as_ref().map(|_| "<redacted>"))
            .field("default_ttl", &self.default_ttl)
            .finish()
    }
}

impl SessionTokens {
    /// Creates a token service from configuration.
    #[must_use]
    pub fn new(config: &SessionConfig) -> Self {
        let secret = config
            .jwt_secret
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(ToString::to_string);
        let ttl_minutes = match config.ttl_minutes {
            minutes if minutes <= 0 => default_ttl_minutes(),
            minutes if minutes > MAX_TTL_MINUTES => {
                tracing::warn!(
                    ttl_minutes = minutes,
                    max = MAX_TTL_MINUTES,
                    "Session token lifetime too long, capping"
                );
                MAX_TTL_MINUTES
            }
            minutes => minutes,
        };
        let default_ttl = Duration::try_minutes(ttl_minutes)
            .unwrap_or_else(|| Duration::minutes(default_ttl_minutes()));

        Self {
            secret,
            default_ttl,
        }
    }

    /// Creates a token service signing with `secret` and the default lifetime.
    #[must_use]
    pub fn with_secret(secret: &str) -> Self {
        Self::new(&SessionConfig {
            jwt_secret: Some(secret.to_string()),
            ..SessionConfig::default()
        })
    }

    /// Returns true if a signing secret is configured.
    #[must_use]
    pub fn is_configured(&self) -> bool {
        self.secret.is_some()
    }

    /// Returns the lifetime applied when `issue` gets no explicit TTL.
    #[must_use]
    pub fn default_ttl(&self) -> Duration {
        self.default_ttl
    }

    fn secret(&self) -> Result<&str, AuthenticationError> {
        self.secret
            .as_deref()
            .ok_or(AuthenticationError::NotConfigured {
                setting: "JWT_SECRET",
            })
    }

    /// Signs `claims` into a token valid for `ttl` (or the default lifetime).
    ///
    /// The claims are embedded exactly as given.
    pub fn issue(
        &self,
        claims: AuthorizationClaims,
        ttl: Option<Duration>,
    ) -> Result<String, AuthenticationError> {
        let secret = self.secret()?;
        let now = Utc::now();
        let expires_at = now
            .checked_add_signed(ttl.unwrap_or(self.default_ttl))
            .ok_or_else(|| AuthenticationError::SigningFailed {
                reason: "token lifetime is out of range".to_string(),
            })?;

        let signed = SignedClaims {
            claims,
            iat: now.timestamp(),
            exp: expires_at.timestamp(),
        };

        jsonwebtoken::encode(
            &Header::new(Algorithm::HS256),
            &signed,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
        .map_err(|e| AuthenticationError::SigningFailed {
            reason: e.to_string(),
        })
    }

    /// Verifies a token's signature and expiry and returns its claims.
    pub fn verify(&self, token: &str) -> Result<AuthorizationClaims, AuthenticationError> {
        let secret = self.secret()?;

        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_required_spec_claims(&["exp", "sub"]);

        let data = jsonwebtoken::decode::<SignedClaims>(
            token,
            &DecodingKey::from_secret(secret.as_bytes()),
            &validation,
        )
        .map_err(|e| match e.kind() {
            ErrorKind::ExpiredSignature => AuthenticationError::TokenExpired,
            _ => AuthenticationError::InvalidToken {
                reason: e.to_string(),
            },
        })?;

        Ok(data.claims.claims)
    }
}

/// Extracts the token from an `Authorization` header value.
///
/// Only the exact `Bearer <token>` form is accepted.
#[must_use]
pub fn bearer_token(header: &str) -> Option<&str> {
    let (scheme, token) = header.split_once(' ')?;
    let token = token.trim();
    (scheme == "Bearer" && !token.is_empty() && !token.contains(' ')).then_some(token)
}
