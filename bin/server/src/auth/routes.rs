//! Authentication routes for the Google login flow and the current identity.

use axum::{
    Json,
    extract::{Query, State},
    http::{StatusCode, header::LOCATION},
    response::{IntoResponse, Response},
};
use kateglo_platform_access::OAuthState;
use serde::Deserialize;
use serde_json::{Value, json};

use super::{AppState, AuthRejection, LoginError, RequireAuth, complete_login};
use crate::db::PgUserDirectory;

/// Shown when the user declined consent at the provider.
const LOGIN_CANCELLED: &str = "Google login was cancelled";

/// Shown when the provider redirected back without a code.
const MISSING_CODE: &str = "OAuth code is missing";

/// Shown for any failure after the code arrived.
const LOGIN_FAILED: &str = "Google authentication failed";

/// Query parameters for starting a login.
#[derive(Debug, Default, Deserialize)]
pub struct LoginQuery {
    /// Front-end origin to return to after login.
    #[serde(default)]
    frontend_origin: Option<String>,
}

/// Query parameters for the provider callback.
#[derive(Debug, Default, Deserialize)]
pub struct CallbackQuery {
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    state: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

/// Redirects the browser to Google's consent screen.
pub async fn google_login(
    State(state): State<AppState>,
    Query(query): Query<LoginQuery>,
) -> Result<Response, AuthRejection> {
    let oauth_state = OAuthState::for_origin(query.frontend_origin.as_deref()).encode();
    let url = state.google.authorization_url(Some(&oauth_state))?;
    Ok(found(&url))
}

/// Handles the provider callback and sends the browser back to the front end.
///
/// Every outcome is a redirect: the token travels in the fragment on success,
/// a short message in `?error=` otherwise. Upstream details are only logged.
pub async fn google_callback(
    State(state): State<AppState>,
    Query(query): Query<CallbackQuery>,
) -> Response {
    let frontend_origin = query
        .state
        .as_deref()
        .map(OAuthState::decode)
        .and_then(|decoded| decoded.frontend_origin);
    let origin = frontend_origin.as_deref();

    if let Some(error) = query.error.as_deref() {
        tracing::warn!(%error, "Google login was cancelled at the provider");
        return found(&state.origins.error_redirect(LOGIN_CANCELLED, origin));
    }

    let Some(code) = query.code.as_deref().filter(|code| !code.is_empty()) else {
        return found(&state.origins.error_redirect(MISSING_CODE, origin));
    };

    match finish_login(&state, code).await {
        Ok(token) => found(&state.origins.success_redirect(&token, origin)),
        Err(error) => {
            tracing::warn!(%error, "Google login failed");
            found(&state.origins.error_redirect(LOGIN_FAILED, origin))
        }
    }
}

async fn finish_login(state: &AppState, code: &str) -> Result<String, LoginError> {
    let provider_token = state
        .google
        .exchange_code(code)
        .await
        .map_err(LoginError::Provider)?;
    let profile = state
        .google
        .fetch_profile(&provider_token.access_token)
        .await
        .map_err(LoginError::Provider)?;

    let directory = PgUserDirectory::new(state.db_pool.clone(), state.admin_emails.clone());
    complete_login(&directory, &state.tokens, &profile).await
}

/// Returns the caller's claims.
pub async fn me(RequireAuth(claims): RequireAuth) -> Json<Value> {
    Json(json!({ "success": true, "data": claims }))
}

/// A `302 Found` redirect.
fn found(location: &str) -> Response {
    (StatusCode::FOUND, [(LOCATION, location.to_string())]).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FRONTEND, app_with};
    use axum::body::Body;
    use http_body_util::BodyExt;
    use kateglo_platform_access::GoogleConfig;
    use tower::ServiceExt;
    use url::Url;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn get(app: axum::Router, uri: &str) -> Response {
        app.oneshot(
            axum::http::Request::builder()
                .uri(uri)
                .body(Body::empty())
                .expect("request"),
        )
        .await
        .expect("response")
    }

    fn location(response: &Response) -> Url {
        let value = response
            .headers()
            .get(LOCATION)
            .and_then(|v| v.to_str().ok())
            .expect("location header");
        Url::parse(value).expect("absolute location")
    }

    fn error_param(url: &Url) -> Option<String> {
        url.query_pairs()
            .find(|(key, _)| key == "error")
            .map(|(_, value)| value.into_owned())
    }

    fn configured(server: Option<&MockServer>) -> GoogleConfig {
        let config = GoogleConfig::new(
            "client-id".to_string(),
            "client-secret".to_string(),
            "https://api.kateglo.org/auth/google/callback".to_string(),
        );
        match server {
            Some(server) => config.with_endpoints(
                &format!("{}/auth", server.uri()),
                &format!("{}/token", server.uri()),
                &format!("{}/userinfo", server.uri()),
            ),
            None => config,
        }
    }

    #[tokio::test]
    async fn login_redirects_with_state_carrying_origin() {
        let app = app_with(configured(None), Some("secret"));
        let response = get(app, &format!("/auth/google?frontend_origin={FRONTEND}")).await;

        assert_eq!(response.status(), StatusCode::FOUND);
        let url = location(&response);
        assert_eq!(url.host_str(), Some("accounts.google.com"));
        let state = url
            .query_pairs()
            .find(|(key, _)| key == "state")
            .map(|(_, value)| value.into_owned())
            .expect("state param");
        assert_eq!(
            OAuthState::decode(&state).frontend_origin.as_deref(),
            Some(FRONTEND)
        );
    }

    #[tokio::test]
    async fn login_without_credentials_is_503() {
        let app = app_with(GoogleConfig::default(), Some("secret"));
        let response = get(app, "/auth/google").await;

        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        let body = response
            .into_body()
            .collect()
            .await
            .expect("body")
            .to_bytes();
        let json: Value = serde_json::from_slice(&body).expect("json");
        assert_eq!(json["success"], false);
    }

    #[tokio::test]
    async fn cancelled_login_returns_to_allowed_origin() {
        let app = app_with(configured(None), Some("secret"));
        let state = OAuthState::for_origin(Some(FRONTEND)).encode();
        let response = get(
            app,
            &format!("/auth/google/callback?error=access_denied&state={state}"),
        )
        .await;

        assert_eq!(response.status(), StatusCode::FOUND);
        let url = location(&response);
        assert_eq!(url.origin().ascii_serialization(), FRONTEND);
        assert_eq!(url.path(), "/auth/callback");
        assert_eq!(error_param(&url).as_deref(), Some(LOGIN_CANCELLED));
        assert_eq!(url.fragment(), None);
    }

    #[tokio::test]
    async fn missing_code_with_foreign_state_uses_default_callback() {
        let app = app_with(configured(None), Some("secret"));
        let response = get(app, "/auth/google/callback?state=not-a-state").await;

        assert_eq!(response.status(), StatusCode::FOUND);
        let url = location(&response);
        assert!(url.as_str().starts_with(crate::testing::DEFAULT_CALLBACK));
        assert_eq!(error_param(&url).as_deref(), Some(MISSING_CODE));
    }

    #[tokio::test]
    async fn failed_exchange_redirects_with_generic_message() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/token"))
            .respond_with(ResponseTemplate::new(400).set_body_json(serde_json::json!({
                "error": "invalid_grant",
                "error_description": "Bad Request"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let app = app_with(configured(Some(&server)), Some("secret"));
        let response = get(app, "/auth/google/callback?code=bad-code").await;

        assert_eq!(response.status(), StatusCode::FOUND);
        let url = location(&response);
        assert_eq!(error_param(&url).as_deref(), Some(LOGIN_FAILED));
        assert!(!url.as_str().contains("invalid_grant"));
        assert_eq!(url.fragment(), None);
    }

    #[tokio::test]
    async fn me_returns_claims() {
        let app = app_with(configured(None), Some("secret"));
        let token = crate::testing::token("secret", "editor", &[]);
        let response = app
            .oneshot(
                axum::http::Request::builder()
                    .uri("/auth/me")
                    .header("authorization", format!("Bearer {token}"))
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::OK);
        let body = response
            .into_body()
            .collect()
            .await
            .expect("body")
            .to_bytes();
        let json: Value = serde_json::from_slice(&body).expect("json");
        assert_eq!(json["success"], true);
        assert_eq!(json["data"]["role"], "editor");
    }
}
