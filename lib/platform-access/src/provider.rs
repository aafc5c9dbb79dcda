//! External identity provider (Google) configuration.
//!
//! Every credential is optional at load time. A missing value only fails the
//! operation that needs it, so a server without Google credentials still
//! serves token-authenticated APIs.

use serde::{Deserialize, Serialize};

use crate::error::AuthenticationError;

/// Google OAuth authorization endpoint.
pub const GOOGLE_AUTH_URL: &str = "https://accounts.google.com/o/oauth2/v2/auth";

/// Google OAuth token endpoint.
pub const GOOGLE_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";

/// Google userinfo endpoint.
pub const GOOGLE_USERINFO_URL: &str = "https://www.googleapis.com/oauth2/v2/userinfo";

/// Scopes requested during login.
pub const LOGIN_SCOPES: &[&str] = &["openid", "email", "profile"];

/// Provider tag embedded in session tokens.
pub const PROVIDER_TAG: &str = "google";

/// Configuration for the Google identity provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GoogleConfig {
    /// The OAuth2 client ID registered with Google.
    #[serde(default)]
    client_id: Option<String>,
    /// The OAuth2 client secret.
    #[serde(default)]
    client_secret: Option<String>,
    /// The backend callback URI registered with Google.
    #[serde(default)]
    redirect_uri: Option<String>,
    #[serde(default = "default_auth_url")]
    auth_url: String,
    #[serde(default = "default_token_url")]
    token_url: String,
    #[serde(default = "default_userinfo_url")]
    userinfo_url: String,
}

fn default_auth_url() -> String {
    GOOGLE_AUTH_URL.to_string()
}

fn default_token_url() -> String {
    GOOGLE_TOKEN_URL.to_string()
}

fn default_userinfo_url() -> String {
    GOOGLE_USERINFO_URL.to_string()
}

impl Default for GoogleConfig {
    fn default() -> Self {
        Self {
            client_id: None,
            client_secret: None,
            redirect_uri: None,
            auth_url: default_auth_url(),
            token_url: default_token_url(),
            userinfo_url: default_userinfo_url(),
        }
    }
}

impl GoogleConfig {
    /// Creates a fully configured provider with Google's public endpoints.
    #[must_use]
    pub fn new(client_id: String, client_secret: String, redirect_uri: String) -> Self {
        Self {
            client_id: Some(client_id),
            client_secret: Some(client_secret),
            redirect_uri: Some(redirect_uri),
            ..Self::default()
        }
    }

    /// Overrides the provider endpoints.
    #[must_use]
    pub fn with_endpoints(mut self, auth_url: &str, token_url: &str, userinfo_url: &str) -> Self {
        self.auth_url = auth_url.to_string();
        self.token_url = token_url.to_string();
        self.userinfo_url = userinfo_url.to_string();
        self
    }

    /// Returns the client ID or a configuration-incomplete error.
    pub fn client_id(&self) -> Result<&str, AuthenticationError> {
        require(self.client_id.as_deref(), "GOOGLE_CLIENT_ID")
    }

    /// Returns the client secret or a configuration-incomplete error.
    pub fn client_secret(&self) -> Result<&str, AuthenticationError> {
        require(self.client_secret.as_deref(), "GOOGLE_CLIENT_SECRET")
    }

    /// Returns the redirect URI or a configuration-incomplete error.
    pub fn redirect_uri(&self) -> Result<&str, AuthenticationError> {
        require(self.redirect_uri.as_deref(), "GOOGLE_REDIRECT_URI")
    }

    #[must_use]
    pub fn auth_url(&self) -> &str {
        &self.auth_url
    }

    #[must_use]
    pub fn token_url(&self) -> &str {
        &self.token_url
    }

    #[must_use]
    pub fn userinfo_url(&self) -> &str {
        &self.userinfo_url
    }
}

fn require<'a>(
    value: Option<&'a str>,
    setting: &'static str,
) -> Result<&'a str, AuthenticationError> {
    match value.map(str::trim) {
        Some(v) if !v.is_empty() => Ok(v),
        _ => Err(AuthenticationError::NotConfigured { setting }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FailureKind;

    #[test]
    fn default_config_uses_google_endpoints() {
        let config = GoogleConfig::default();
        assert_eq!(config.auth_url(), GOOGLE_AUTH_URL);
        assert_eq!(config.token_url(), GOOGLE_TOKEN_URL);
        assert_eq!(config.userinfo_url(), GOOGLE_USERINFO_URL);
    }

    #[test]
    fn missing_credentials_are_configuration_incomplete() {
        let config = GoogleConfig::default();
        let err = config.client_id().expect_err("client id missing");
        assert_eq!(err.kind(), FailureKind::ConfigurationIncomplete);
        assert_eq!(
            err,
            AuthenticationError::NotConfigured {
                setting: "GOOGLE_CLIENT_ID"
            }
        );
        assert!(config.client_secret().is_err());
        assert!(config.redirect_uri().is_err());
    }

    #[test]
    fn blank_values_count_as_missing() {
        let config = GoogleConfig::new(
            "  ".to_string(),
            "secret".to_string(),
            "https://api.example.com/auth/google/callback".to_string(),
        );
        assert!(config.client_id().is_err());
        assert_eq!(config.client_secret().expect("secret set"), "secret");
    }

    #[test]
    fn deserializes_with_defaults() {
        let json = r#"{ "client_id": "my-client" }"#;
        let config: GoogleConfig = serde_json::from_str(json).expect("deserialize");
        assert_eq!(config.client_id().expect("set"), "my-client");
        assert!(config.client_secret().is_err());
        assert_eq!(config.token_url(), GOOGLE_TOKEN_URL);
    }
}
