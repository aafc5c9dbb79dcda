//! Centralized server configuration.
//!
//! Loaded via the `config` crate from environment variables. Nested sections
//! use `__` as the separator (`SESSION__JWT_SECRET`, `GOOGLE__CLIENT_ID`).
//!
//! Only `DATABASE_URL` is mandatory. Missing Google credentials or a missing
//! JWT secret do not stop the server; the operations that need them answer
//! with a configuration-incomplete error instead.

use kateglo_platform_access::origin::DEFAULT_CALLBACK_URL;
use kateglo_platform_access::{AdminEmails, GoogleConfig, OriginAllowList, SessionConfig};
use serde::Deserialize;

/// Server configuration composed from library configs.
#[derive(Debug, Deserialize)]
pub struct ServerConfig {
    /// PostgreSQL database connection URL.
    pub database_url: String,

    /// Connection pool settings.
    #[serde(default)]
    pub database: DatabaseConfig,

    /// Session token configuration.
    #[serde(default)]
    pub session: SessionConfig,

    /// Google identity provider configuration.
    #[serde(default)]
    pub google: GoogleConfig,

    /// Front-end redirect configuration.
    #[serde(default)]
    pub frontend: FrontendConfig,

    /// Comma-separated emails promoted to administrator on login.
    #[serde(default)]
    pub admin_emails: String,

    /// Socket address to listen on.
    #[serde(default = "default_listen_addr")]
    pub listen_addr: String,
}

/// Connection pool settings.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    #[serde(default = "default_acquire_timeout_seconds")]
    pub acquire_timeout_seconds: u64,
}

fn default_max_connections() -> u32 {
    10
}

fn default_acquire_timeout_seconds() -> u64 {
    5
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            max_connections: default_max_connections(),
            acquire_timeout_seconds: default_acquire_timeout_seconds(),
        }
    }
}

/// Where the browser is sent after login.
#[derive(Debug, Clone, Deserialize)]
pub struct FrontendConfig {
    /// Default callback when the login did not name an allowed origin.
    #[serde(default = "default_callback_url")]
    pub callback_url: String,

    /// Comma-separated extra origins allowed to receive login redirects.
    #[serde(default)]
    pub allowed_origins: String,
}

fn default_callback_url() -> String {
    DEFAULT_CALLBACK_URL.to_string()
}

impl Default for FrontendConfig {
    fn default() -> Self {
        Self {
            callback_url: default_callback_url(),
            allowed_origins: String::new(),
        }
    }
}

impl FrontendConfig {
    /// Builds the redirect allow-list.
    #[must_use]
    pub fn allow_list(&self) -> OriginAllowList {
        OriginAllowList::from_csv(&self.allowed_origins, &self.callback_url)
    }
}

fn default_listen_addr() -> String {
    "0.0.0.0:3000".to_string()
}

impl ServerConfig {
    /// Loads configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if required configuration is missing or invalid.
    pub fn from_env() -> Result<Self, config::ConfigError> {
        Self::load(None)
    }

    /// Loads configuration from `vars` instead of the process environment
    /// when given.
    fn load(vars: Option<config::Map<String, String>>) -> Result<Self, config::ConfigError> {
        config::Config::builder()
            .add_source(
                config::Environment::default()
                    .separator("__")
                    .try_parsing(true)
                    .source(vars),
            )
            .build()?
            .try_deserialize()
    }

    /// Parsed bootstrap administrator emails.
    #[must_use]
    pub fn admin_emails(&self) -> AdminEmails {
        AdminEmails::from_csv(&self.admin_emails)
    }
}
