//! Google OAuth client for login.
//!
//! Three steps, each failing on its own when the configuration it needs is
//! absent:
//! - `authorization_url`: where to send the browser
//! - `exchange_code`: server-to-server `authorization_code` grant
//! - `fetch_profile`: bearer-authenticated userinfo lookup
//!
//! Upstream failures are terminal for the login attempt and never retried.

use kateglo_platform_access::provider::LOGIN_SCOPES;
use kateglo_platform_access::{AuthenticationError, GoogleConfig, ProviderProfile};
use oauth2::{
    AuthType, AuthorizationCode, ClientId, ClientSecret, RedirectUrl, RequestTokenError,
    TokenResponse, TokenUrl,
    basic::{BasicClient, BasicErrorResponse},
};
use tracing::instrument;
use url::Url;

const EXCHANGE_STAGE: &str = "code exchange";
const PROFILE_STAGE: &str = "profile fetch";

/// Tokens returned by the code exchange.
#[derive(Debug)]
pub struct ProviderToken {
    pub access_token: String,
}

/// Google OAuth client.
#[derive(Clone)]
pub struct GoogleOAuthClient {
    config: GoogleConfig,
    http: reqwest::Client,
}

impl GoogleOAuthClient {
    /// Creates a client from configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(config: GoogleConfig) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .build()?;
        Ok(Self { config, http })
    }

    /// Builds the provider authorization URL.
    ///
    /// `state` is embedded only when present and non-empty.
    pub fn authorization_url(&self, state: Option<&str>) -> Result<String, AuthenticationError> {
        let client_id = self.config.client_id()?;
        let redirect_uri = self.config.redirect_uri()?;
        let mut url =
            Url::parse(self.config.auth_url()).map_err(|_| AuthenticationError::NotConfigured {
                setting: "GOOGLE_AUTH_URL",
            })?;

        {
            let mut query = url.query_pairs_mut();
            query
                .append_pair("client_id", client_id)
                .append_pair("redirect_uri", redirect_uri)
                .append_pair("response_type", "code")
                .append_pair("scope", &LOGIN_SCOPES.join(" "))
                .append_pair("access_type", "offline")
                .append_pair("prompt", "consent");
            if let Some(state) = state.filter(|s| !s.is_empty()) {
                query.append_pair("state", state);
            }
        }

        Ok(url.to_string())
    }

    /// Exchanges an authorization code for provider tokens.
    ///
    /// Client credentials travel in the request body.
    #[instrument(skip(self, code))]
    pub async fn exchange_code(&self, code: &str) -> Result<ProviderToken, AuthenticationError> {
        let client_id = self.config.client_id()?;
        let client_secret = self.config.client_secret()?;
        let redirect_uri = self.config.redirect_uri()?;

        let token_url = TokenUrl::new(self.config.token_url().to_string()).map_err(|_| {
            AuthenticationError::NotConfigured {
                setting: "GOOGLE_TOKEN_URL",
            }
        })?;
        let redirect_url = RedirectUrl::new(redirect_uri.to_string()).map_err(|_| {
            AuthenticationError::NotConfigured {
                setting: "GOOGLE_REDIRECT_URI",
            }
        })?;

        let client = BasicClient::new(ClientId::new(client_id.to_string()))
            .set_client_secret(ClientSecret::new(client_secret.to_string()))
            .set_auth_type(AuthType::RequestBody)
            .set_token_uri(token_url)
            .set_redirect_uri(redirect_url);

        let token = client
            .exchange_code(AuthorizationCode::new(code.to_string()))
            .request_async(&self.http)
            .await
            .map_err(exchange_error)?;

        Ok(ProviderToken {
            access_token: token.access_token().secret().clone(),
        })
    }

    /// Fetches the user's profile with a provider access token.
    #[instrument(skip(self, access_token))]
    pub async fn fetch_profile(
        &self,
        access_token: &str,
    ) -> Result<ProviderProfile, AuthenticationError> {
        let response = self
            .http
            .get(self.config.userinfo_url())
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(|e| AuthenticationError::ProviderUnreachable {
                stage: PROFILE_STAGE,
                details: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AuthenticationError::ProviderRejected {
                stage: PROFILE_STAGE,
                details: format!("{status}: {body}"),
            });
        }

        response
            .json::<ProviderProfile>()
            .await
            .map_err(|e| AuthenticationError::ProviderUnreachable {
                stage: PROFILE_STAGE,
                details: e.to_string(),
            })
    }
}

fn exchange_error<RE>(error: RequestTokenError<RE, BasicErrorResponse>) -> AuthenticationError
where
    RE: std::error::Error + 'static,
{
    match error {
        RequestTokenError::ServerResponse(response) => AuthenticationError::ProviderRejected {
            stage: EXCHANGE_STAGE,
            details: response.to_string(),
        },
        RequestTokenError::Parse(_, body) => AuthenticationError::ProviderRejected {
            stage: EXCHANGE_STAGE,
            details: String::from_utf8_lossy(&body).into_owned(),
        },
        RequestTokenError::Request(e) => AuthenticationError::ProviderUnreachable {
            stage: EXCHANGE_STAGE,
            details: e.to_string(),
        },
        RequestTokenError::Other(details) => AuthenticationError::ProviderRejected {
            stage: EXCHANGE_STAGE,
            details,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kateglo_platform_access::FailureKind;
    use serde_json::json;
    use wiremock::matchers::{body_string_contains, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const REDIRECT: &str = "https://api.kateglo.org/auth/google/callback";

    fn client_for(server: &MockServer) -> GoogleOAuthClient {
        let config = GoogleConfig::new(
            "client-id".to_string(),
            "client-secret".to_string(),
            REDIRECT.to_string(),
        )
        .with_endpoints(
            &format!("{}/o/oauth2/v2/auth", server.uri()),
            &format!("{}/token", server.uri()),
            &format!("{}/userinfo", server.uri()),
        );
        GoogleOAuthClient::new(config).expect("client")
    }

    #[test]
    fn authorization_url_without_client_id_is_configuration_incomplete() {
        let client = GoogleOAuthClient::new(GoogleConfig::default()).expect("client");
        let err = client.authorization_url(None).expect_err("not configured");
        assert_eq!(err.kind(), FailureKind::ConfigurationIncomplete);
    }

    #[test]
    fn authorization_url_carries_login_parameters() {
        let config = GoogleConfig::new(
            "client-id".to_string(),
            "client-secret".to_string(),
            REDIRECT.to_string(),
        );
        let client = GoogleOAuthClient::new(config).expect("client");

        let url = Url::parse(&client.authorization_url(Some("abc")).expect("url")).expect("parse");
        let pairs: Vec<(String, String)> = url.query_pairs().into_owned().collect();
        let get = |key: &str| {
            pairs
                .iter()
                .find(|(k, _)| k == key)
                .map(|(_, v)| v.as_str())
        };

        assert!(url.as_str().starts_with("https://accounts.google.com/o/oauth2/v2/auth?"));
        assert_eq!(get("client_id"), Some("client-id"));
        assert_eq!(get("redirect_uri"), Some(REDIRECT));
        assert_eq!(get("response_type"), Some("code"));
        assert_eq!(get("scope"), Some("openid email profile"));
        assert_eq!(get("access_type"), Some("offline"));
        assert_eq!(get("prompt"), Some("consent"));
        assert_eq!(get("state"), Some("abc"));
    }

    #[test]
    fn authorization_url_omits_empty_state() {
        let config = GoogleConfig::new(
            "client-id".to_string(),
            "client-secret".to_string(),
            REDIRECT.to_string(),
        );
        let client = GoogleOAuthClient::new(config).expect("client");

        for state in [None, Some("")] {
            let url = client.authorization_url(state).expect("url");
            assert!(!url.contains("state="));
        }
    }

    #[tokio::test]
    async fn exchange_code_sends_credentials_in_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/token"))
            .and(body_string_contains("grant_type=authorization_code"))
            .and(body_string_contains("code=good-code"))
            .and(body_string_contains("client_secret=client-secret"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "access_token": "ya29.token",
                "token_type": "Bearer",
                "expires_in": 3599,
            })))
            .expect(1)
            .mount(&server)
            .await;

        let token = client_for(&server)
            .exchange_code("good-code")
            .await
            .expect("exchange");

        assert_eq!(token.access_token, "ya29.token");
    }

    #[tokio::test]
    async fn rejected_exchange_preserves_upstream_message() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/token"))
            .respond_with(ResponseTemplate::new(400).set_body_json(json!({
                "error": "invalid_grant",
                "error_description": "Bad Request",
            })))
            .expect(1)
            .mount(&server)
            .await;

        let err = client_for(&server)
            .exchange_code("bad-code")
            .await
            .expect_err("rejected");

        assert_eq!(err.kind(), FailureKind::UpstreamAuthenticationFailed);
        match err {
            AuthenticationError::ProviderRejected { stage, details } => {
                assert_eq!(stage, EXCHANGE_STAGE);
                assert!(details.contains("invalid_grant"), "{details}");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn exchange_without_credentials_never_calls_provider() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let config = GoogleConfig::default().with_endpoints(
            &format!("{}/auth", server.uri()),
            &format!("{}/token", server.uri()),
            &format!("{}/userinfo", server.uri()),
        );
        let client = GoogleOAuthClient::new(config).expect("client");

        let err = client.exchange_code("code").await.expect_err("not configured");
        assert_eq!(err.kind(), FailureKind::ConfigurationIncomplete);
    }

    #[tokio::test]
    async fn fetch_profile_uses_bearer_token() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/userinfo"))
            .and(header("authorization", "Bearer ya29.token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": "10769150350006150715113082367",
                "email": "penyunting@kateglo.org",
                "verified_email": true,
                "name": "Penyunting",
                "picture": "https://lh3.googleusercontent.com/a/photo.jpg",
            })))
            .mount(&server)
            .await;

        let profile = client_for(&server)
            .fetch_profile("ya29.token")
            .await
            .expect("profile");

        assert_eq!(profile.id, "10769150350006150715113082367");
        assert_eq!(profile.email.as_deref(), Some("penyunting@kateglo.org"));
        assert_eq!(profile.name.as_deref(), Some("Penyunting"));
    }

    #[tokio::test]
    async fn rejected_profile_fetch_carries_upstream_body() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/userinfo"))
            .respond_with(ResponseTemplate::new(401).set_body_string("Invalid Credentials"))
            .mount(&server)
            .await;

        let err = client_for(&server)
            .fetch_profile("expired")
            .await
            .expect_err("rejected");

        assert_eq!(err.kind(), FailureKind::UpstreamAuthenticationFailed);
        assert!(err.to_string().contains("Invalid Credentials"));
    }
}
