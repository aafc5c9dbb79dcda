//! Authentication middleware and extractors for Axum.
//!
//! Layers run in this order on protected routes:
//! 1. `require_auth` or `optional_auth` verifies the bearer token and stores
//!    an [`Identity`] in the request extensions.
//! 2. `require_role` checks the identity against a [`RoleGate`].
//! 3. `require_permission` checks it against a [`PermissionGate`].
//!
//! Handlers read the identity through [`RequireAuth`] or [`OptionalAuth`].

use axum::{
    Json,
    extract::{FromRef, FromRequestParts, Request, State},
    http::{HeaderMap, StatusCode, header::AUTHORIZATION, request::Parts},
    middleware::Next,
    response::{IntoResponse, Response},
};
use kateglo_platform_access::{
    AuthenticationError, AuthorizationClaims, AuthorizationError, FailureKind, RoleGate,
    SessionTokens, bearer_token, require_any_permission,
};
use serde_json::json;

/// Verified identity attached to a request; `None` when optional
/// authentication found no usable token.
#[derive(Debug, Clone, Default)]
pub struct Identity(pub Option<AuthorizationClaims>);

/// Permission codes of which a request must hold at least one.
#[derive(Debug, Clone, Copy)]
pub struct PermissionGate(&'static [&'static str]);

/// Builds a gate passing identities that hold any of `codes`.
#[must_use]
pub const fn require_any_of(codes: &'static [&'static str]) -> PermissionGate {
    PermissionGate(codes)
}

/// Verifies the bearer token in `headers`.
pub fn authenticate(
    tokens: &SessionTokens,
    headers: &HeaderMap,
) -> Result<AuthorizationClaims, AuthenticationError> {
    let token = headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(bearer_token)
        .ok_or(AuthenticationError::MissingCredential)?;
    tokens.verify(token)
}

/// Rejects requests without a valid bearer token.
pub async fn require_auth(
    State(tokens): State<SessionTokens>,
    mut request: Request,
    next: Next,
) -> Result<Response, AuthRejection> {
    let claims = authenticate(&tokens, request.headers())?;
    request.extensions_mut().insert(Identity(Some(claims)));
    Ok(next.run(request).await)
}

/// Attaches the identity when a valid token is present and proceeds either way.
pub async fn optional_auth(
    State(tokens): State<SessionTokens>,
    mut request: Request,
    next: Next,
) -> Response {
    let claims = match authenticate(&tokens, request.headers()) {
        Ok(claims) => Some(claims),
        Err(AuthenticationError::MissingCredential) => None,
        Err(e) => {
            tracing::debug!(error = %e, "Ignoring unusable credential");
            None
        }
    };
    request.extensions_mut().insert(Identity(claims));
    next.run(request).await
}

/// Rejects identities whose role is outside the gate.
pub async fn require_role(
    State(gate): State<RoleGate>,
    request: Request,
    next: Next,
) -> Result<Response, AuthRejection> {
    gate.check(identity(&request))?;
    Ok(next.run(request).await)
}

/// Rejects identities holding none of the gate's permissions.
pub async fn require_permission(
    State(PermissionGate(codes)): State<PermissionGate>,
    request: Request,
    next: Next,
) -> Result<Response, AuthRejection> {
    require_any_permission(identity(&request), codes)?;
    Ok(next.run(request).await)
}

fn identity(request: &Request) -> Option<&AuthorizationClaims> {
    request
        .extensions()
        .get::<Identity>()
        .and_then(|Identity(claims)| claims.as_ref())
}

/// Extractor for requiring an authenticated user.
///
/// Uses the identity stored by the middleware, or verifies the header itself
/// when no middleware ran.
pub struct RequireAuth(pub AuthorizationClaims);

impl<S> FromRequestParts<S> for RequireAuth
where
    SessionTokens: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = AuthRejection;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        if let Some(Identity(claims)) = parts.extensions.get::<Identity>() {
            return claims
                .clone()
                .map(RequireAuth)
                .ok_or(AuthenticationError::MissingCredential.into());
        }

        let tokens = SessionTokens::from_ref(state);
        Ok(RequireAuth(authenticate(&tokens, &parts.headers)?))
    }
}

/// Extractor for optionally getting the authenticated user.
///
/// Returns None if the user is not authenticated.
pub struct OptionalAuth(pub Option<AuthorizationClaims>);

impl<S> FromRequestParts<S> for OptionalAuth
where
    SessionTokens: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        match RequireAuth::from_request_parts(parts, state).await {
            Ok(RequireAuth(claims)) => Ok(OptionalAuth(Some(claims))),
            Err(_) => Ok(OptionalAuth(None)),
        }
    }
}

/// Rejection type for authentication and authorization checks.
#[derive(Debug)]
pub enum AuthRejection {
    Authentication(AuthenticationError),
    Authorization(AuthorizationError),
}

impl From<AuthenticationError> for AuthRejection {
    fn from(error: AuthenticationError) -> Self {
        Self::Authentication(error)
    }
}

impl From<AuthorizationError> for AuthRejection {
    fn from(error: AuthorizationError) -> Self {
        Self::Authorization(error)
    }
}

impl AuthRejection {
    fn kind(&self) -> FailureKind {
        match self {
            Self::Authentication(e) => e.kind(),
            Self::Authorization(e) => e.kind(),
        }
    }
}

impl IntoResponse for AuthRejection {
    fn into_response(self) -> Response {
        let (status, message) = match self.kind() {
            FailureKind::ConfigurationIncomplete => {
                tracing::warn!(error = ?self, "Authentication is not configured");
                (
                    StatusCode::SERVICE_UNAVAILABLE,
                    "Authentication is not configured",
                )
            }
            FailureKind::UpstreamAuthenticationFailed => {
                tracing::warn!(error = ?self, "Identity provider failure");
                (StatusCode::BAD_GATEWAY, "Identity provider failure")
            }
            FailureKind::Unauthenticated => {
                tracing::debug!(error = ?self, "Unauthenticated request");
                (StatusCode::UNAUTHORIZED, "Authentication required")
            }
            FailureKind::Forbidden => {
                tracing::debug!(error = ?self, "Forbidden request");
                (StatusCode::FORBIDDEN, "Access denied")
            }
        };

        (status, Json(json!({ "success": false, "message": message }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{Router, body::Body, middleware, routing::get};
    use http_body_util::BodyExt;
    use kateglo_platform_access::role::{MANAGE_ROLES, MANAGE_USERS};
    use kateglo_platform_access::{ProviderProfile, RoleGrant, SessionConfig};
    use serde_json::Value;
    use tower::ServiceExt;

    const SECRET: &str = "middleware-secret";

    fn token(role: &str, permissions: &[&str]) -> String {
        let profile = ProviderProfile {
            id: "sub-1".to_string(),
            email: Some("u@kateglo.org".to_string()),
            name: None,
            picture: None,
        };
        let claims = AuthorizationClaims::from_profile(&profile, "google")
            .with_role(RoleGrant {
                code: role.to_string(),
                editorial_access: role != "user",
            })
            .with_permissions(permissions.iter().map(ToString::to_string).collect());
        SessionTokens::with_secret(SECRET)
            .issue(claims, None)
            .expect("issue")
    }

    async fn whoami(OptionalAuth(claims): OptionalAuth) -> String {
        claims.map_or_else(|| "anonymous".to_string(), |c| c.subject)
    }

    async fn me(RequireAuth(claims): RequireAuth) -> String {
        claims.subject
    }

    fn required(tokens: SessionTokens) -> Router {
        Router::new()
            .route("/", get(me))
            .layer(middleware::from_fn_with_state(tokens.clone(), require_auth))
            .with_state(tokens)
    }

    fn optional(tokens: SessionTokens) -> Router {
        Router::new()
            .route("/", get(whoami))
            .layer(middleware::from_fn_with_state(tokens.clone(), optional_auth))
            .with_state(tokens)
    }

    fn gated(gate: RoleGate, permissions: PermissionGate) -> Router {
        let tokens = SessionTokens::with_secret(SECRET);
        Router::new()
            .route("/", get(me))
            .layer(middleware::from_fn_with_state(permissions, require_permission))
            .layer(middleware::from_fn_with_state(gate, require_role))
            .layer(middleware::from_fn_with_state(tokens.clone(), optional_auth))
            .with_state(tokens)
    }

    async fn send(app: Router, bearer: Option<&str>) -> (StatusCode, String) {
        let mut request = axum::http::Request::builder().uri("/");
        if let Some(bearer) = bearer {
            request = request.header(AUTHORIZATION, format!("Bearer {bearer}"));
        }
        let response = app
            .oneshot(request.body(Body::empty()).expect("request"))
            .await
            .expect("response");
        let status = response.status();
        let body = response
            .into_body()
            .collect()
            .await
            .expect("body")
            .to_bytes();
        (status, String::from_utf8_lossy(&body).into_owned())
    }

    #[tokio::test]
    async fn required_auth_accepts_valid_token() {
        let (status, body) = send(
            required(SessionTokens::with_secret(SECRET)),
            Some(&token("user", &[])),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "sub-1");
    }

    #[tokio::test]
    async fn required_auth_without_header_is_401_json() {
        let (status, body) = send(required(SessionTokens::with_secret(SECRET)), None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        let json: Value = serde_json::from_str(&body).expect("json");
        assert_eq!(json["success"], false);
        assert!(json["message"].is_string());
    }

    #[tokio::test]
    async fn wrong_secret_is_401_when_required_and_anonymous_when_optional() {
        let foreign = SessionTokens::with_secret("someone-else")
            .issue(
                AuthorizationClaims::from_profile(
                    &ProviderProfile {
                        id: "intruder".to_string(),
                        email: None,
                        name: None,
                        picture: None,
                    },
                    "google",
                ),
                None,
            )
            .expect("issue");

        let (status, _) = send(required(SessionTokens::with_secret(SECRET)), Some(&foreign)).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let (status, body) = send(optional(SessionTokens::with_secret(SECRET)), Some(&foreign)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "anonymous");
    }

    #[tokio::test]
    async fn missing_secret_is_503_when_required_and_anonymous_when_optional() {
        let unconfigured = || SessionTokens::new(&SessionConfig::default());
        let bearer = token("user", &[]);

        let (status, body) = send(required(unconfigured()), Some(&bearer)).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert!(body.contains("\"success\":false"));

        let (status, _) = send(required(unconfigured()), None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let (status, body) = send(optional(unconfigured()), Some(&bearer)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "anonymous");
    }

    #[tokio::test]
    async fn optional_auth_passes_valid_identity() {
        let (status, body) = send(
            optional(SessionTokens::with_secret(SECRET)),
            Some(&token("user", &[])),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "sub-1");
    }

    #[tokio::test]
    async fn permission_gate_is_or() {
        let gate = || {
            gated(
                RoleGate::editorial(),
                require_any_of(&[MANAGE_ROLES, MANAGE_USERS]),
            )
        };

        let (status, _) = send(gate(), Some(&token("editor", &[MANAGE_USERS]))).await;
        assert_eq!(status, StatusCode::OK);

        let (status, _) = send(gate(), Some(&token("editor", &["edit_entries"]))).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn permission_gate_without_identity_is_401() {
        let tokens = SessionTokens::with_secret(SECRET);
        let app = Router::new()
            .route("/", get(|| async { "ok" }))
            .layer(middleware::from_fn_with_state(
                require_any_of(&[MANAGE_ROLES]),
                require_permission,
            ))
            .layer(middleware::from_fn_with_state(tokens, optional_auth));

        let (status, _) = send(app, None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn role_gate_rejects_outsiders_with_403() {
        let gate = || gated(RoleGate::editorial(), require_any_of(&[MANAGE_ROLES]));

        let (status, _) = send(gate(), Some(&token("user", &[MANAGE_ROLES]))).await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let (status, _) = send(gate(), None).await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let (status, body) = send(gate(), Some(&token("admin", &[MANAGE_ROLES]))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "sub-1");
    }

    #[test]
    fn rejection_statuses() {
        let status = |r: AuthRejection| r.into_response().status();
        assert_eq!(
            status(AuthenticationError::MissingCredential.into()),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            status(AuthenticationError::TokenExpired.into()),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            status(
                AuthenticationError::NotConfigured {
                    setting: "JWT_SECRET"
                }
                .into()
            ),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(
            status(AuthorizationError::RoleDenied { role: None }.into()),
            StatusCode::FORBIDDEN
        );
    }
}
