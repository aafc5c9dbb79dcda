//! Permission administration routes.

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    routing::get,
};
use kateglo_core::PermissionId;
use kateglo_rbac::PermissionInput;
use serde_json::{Value, json};

use super::{JsonBody, ListParams, OptionsParams, parse_id, store};
use crate::auth::AppState;
use crate::error::ApiError;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list).post(create))
        .route("/options", get(role_options))
        .route("/{id}", get(show).put(update))
}

/// Lists permissions with the roles holding them.
async fn list(
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
) -> Result<Json<Value>, ApiError> {
    let page = store(&state)
        .list_permissions(&params.into_query())
        .await
        .map_err(ApiError::database)?;
    Ok(Json(
        json!({ "success": true, "data": page.rows, "total": page.total }),
    ))
}

/// Roles to pick from when editing a permission.
async fn role_options(
    State(state): State<AppState>,
    Query(params): Query<OptionsParams>,
) -> Result<Json<Value>, ApiError> {
    let options = store(&state)
        .role_options(params.search().as_deref())
        .await
        .map_err(ApiError::database)?;
    Ok(Json(json!({ "success": true, "data": options })))
}

async fn show(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let id: PermissionId = parse_id(&id, "permission")?;
    let permission = store(&state)
        .permission(id)
        .await
        .map_err(ApiError::database)?
        .ok_or(ApiError::NotFound {
            entity: "permission",
        })?;
    Ok(Json(json!({ "success": true, "data": permission })))
}

async fn create(
    State(state): State<AppState>,
    JsonBody(input): JsonBody<PermissionInput>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let draft = input.into_draft(None)?;
    let permission = store(&state)
        .upsert_permission(draft)
        .await
        .map_err(ApiError::database)?
        .ok_or(ApiError::NotFound {
            entity: "permission",
        })?;
    Ok((
        StatusCode::CREATED,
        Json(json!({ "success": true, "data": permission })),
    ))
}

async fn update(
    State(state): State<AppState>,
    Path(id): Path<String>,
    JsonBody(input): JsonBody<PermissionInput>,
) -> Result<Json<Value>, ApiError> {
    let id: PermissionId = parse_id(&id, "permission")?;
    let draft = input.into_draft(Some(id))?;
    let permission = store(&state)
        .upsert_permission(draft)
        .await
        .map_err(ApiError::database)?
        .ok_or(ApiError::NotFound {
            entity: "permission",
        })?;
    Ok(Json(json!({ "success": true, "data": permission })))
}
