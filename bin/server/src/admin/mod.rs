//! Editorial administration API for roles and permissions.
//!
//! Every route sits behind three layers: a valid session token, an
//! editorial role, and the `manage_roles` permission.

pub mod permissions;
pub mod roles;

use axum::{
    Json, Router,
    extract::{FromRequest, Request, rejection::JsonRejection},
    middleware,
};
use kateglo_platform_access::RoleGate;
use kateglo_platform_access::role::MANAGE_ROLES;
use kateglo_rbac::{ListQuery, RbacStore, normalize_search};
use serde::Deserialize;
use serde::de::DeserializeOwned;

use crate::auth::{AppState, require_any_of, require_auth, require_permission, require_role};
use crate::db::PgRbacBackend;
use crate::error::ApiError;

/// Builds the `/api/admin` router.
pub fn router(state: &AppState) -> Router<AppState> {
    Router::new()
        .nest("/roles", roles::router())
        .nest("/permissions", permissions::router())
        .layer(middleware::from_fn_with_state(
            require_any_of(&[MANAGE_ROLES]),
            require_permission,
        ))
        .layer(middleware::from_fn_with_state(
            RoleGate::editorial(),
            require_role,
        ))
        .layer(middleware::from_fn_with_state(
            state.tokens.clone(),
            require_auth,
        ))
}

fn store(state: &AppState) -> RbacStore<PgRbacBackend> {
    RbacStore::new(PgRbacBackend::new(state.db_pool.clone()))
}

/// Raw list parameters; non-numeric paging values fall back to defaults.
#[derive(Debug, Default, Deserialize)]
pub struct ListParams {
    #[serde(default)]
    q: Option<String>,
    #[serde(default)]
    limit: Option<String>,
    #[serde(default)]
    offset: Option<String>,
}

impl ListParams {
    fn into_query(self) -> ListQuery {
        ListQuery::parse(
            self.q.as_deref(),
            self.limit.as_deref(),
            self.offset.as_deref(),
        )
    }
}

/// Search parameter for option pickers.
#[derive(Debug, Default, Deserialize)]
pub struct OptionsParams {
    #[serde(default)]
    q: Option<String>,
}

impl OptionsParams {
    fn search(&self) -> Option<String> {
        normalize_search(self.q.as_deref())
    }
}

/// JSON body extractor answering malformed input with an [`ApiError`].
pub struct JsonBody<T>(pub T);

impl<S, T> FromRequest<S> for JsonBody<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(|rejection: JsonRejection| ApiError::Validation {
                message: rejection.body_text(),
            })?;
        Ok(Self(value))
    }
}

/// Parses a path id, answering 400 for anything but a positive integer.
fn parse_id<T: std::str::FromStr>(raw: &str, entity: &'static str) -> Result<T, ApiError> {
    raw.parse().map_err(|_| ApiError::Validation {
        message: format!("invalid {entity} id"),
    })
}
