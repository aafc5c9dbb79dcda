//! Role administration routes.

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    routing::get,
};
use kateglo_core::RoleId;
use kateglo_rbac::RoleInput;
use serde_json::{Value, json};

use super::{JsonBody, ListParams, OptionsParams, parse_id, store};
use crate::auth::AppState;
use crate::error::ApiError;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list).post(create))
        .route("/options", get(permission_options))
        .route("/{id}", get(show).put(update))
}

/// Lists roles with user and permission counts.
async fn list(
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
) -> Result<Json<Value>, ApiError> {
    let page = store(&state)
        .list_roles(&params.into_query())
        .await
        .map_err(ApiError::database)?;
    Ok(Json(
        json!({ "success": true, "data": page.rows, "total": page.total }),
    ))
}

/// Permissions to pick from when editing a role.
async fn permission_options(
    State(state): State<AppState>,
    Query(params): Query<OptionsParams>,
) -> Result<Json<Value>, ApiError> {
    let options = store(&state)
        .permission_options(params.search().as_deref())
        .await
        .map_err(ApiError::database)?;
    Ok(Json(json!({ "success": true, "data": options })))
}

async fn show(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let id: RoleId = parse_id(&id, "role")?;
    let role = store(&state)
        .role(id)
        .await
        .map_err(ApiError::database)?
        .ok_or(ApiError::NotFound { entity: "role" })?;
    Ok(Json(json!({ "success": true, "data": role })))
}

async fn create(
    State(state): State<AppState>,
    JsonBody(input): JsonBody<RoleInput>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let draft = input.into_draft(None)?;
    let role = store(&state)
        .upsert_role(draft)
        .await
        .map_err(ApiError::database)?
        .ok_or(ApiError::NotFound { entity: "role" })?;
    Ok((
        StatusCode::CREATED,
        Json(json!({ "success": true, "data": role })),
    ))
}

async fn update(
    State(state): State<AppState>,
    Path(id): Path<String>,
    JsonBody(input): JsonBody<RoleInput>,
) -> Result<Json<Value>, ApiError> {
    let id: RoleId = parse_id(&id, "role")?;
    let draft = input.into_draft(Some(id))?;
    let role = store(&state)
        .upsert_role(draft)
        .await
        .map_err(ApiError::database)?
        .ok_or(ApiError::NotFound { entity: "role" })?;
    Ok(Json(json!({ "success": true, "data": role })))
}
