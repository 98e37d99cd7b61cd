use axum::{
    Json,
    extract::{Path, State},
};
use tracing::info;

use crate::db::models::DbPackage;
use crate::middleware::{ApiJson, UploadForm};
use crate::router::StorefrontState;
use crate::service::submit_package;
use crate::types::api::{IdRequest, SuccessResponse, UploadResponse};
use crate::StorefrontError;

fn app_not_found() -> StorefrontError {
    StorefrontError::NotFound("App not found".to_string())
}

/// POST /upload-app
pub async fn upload_app(
    State(state): State<StorefrontState>,
    form: UploadForm,
) -> Result<Json<UploadResponse>, StorefrontError> {
    let app = submit_package(&state.store, &state.blobs, form).await?;
    Ok(Json(UploadResponse {
        success: true,
        message: "App uploaded, waiting for admin approval".to_string(),
        app,
    }))
}

/// GET /apps
pub async fn list_apps(
    State(state): State<StorefrontState>,
) -> Result<Json<Vec<DbPackage>>, StorefrontError> {
    Ok(Json(state.store.list_approved().await?))
}

/// GET /pending-apps
pub async fn list_pending(
    State(state): State<StorefrontState>,
) -> Result<Json<Vec<DbPackage>>, StorefrontError> {
    Ok(Json(state.store.list_pending().await?))
}

/// POST /approve-app
pub async fn approve_app(
    State(state): State<StorefrontState>,
    ApiJson(req): ApiJson<IdRequest>,
) -> Result<Json<SuccessResponse>, StorefrontError> {
    let id = req.id()?;
    if !state.store.set_approved(id, true).await? {
        return Err(app_not_found());
    }
    info!(id, "app approved");
    Ok(Json(SuccessResponse::ok()))
}

/// POST /reject-app; succeeds whether or not the id existed.
pub async fn reject_app(
    State(state): State<StorefrontState>,
    ApiJson(req): ApiJson<IdRequest>,
) -> Result<Json<SuccessResponse>, StorefrontError> {
    let id = req.id()?;
    let existed = state.store.delete_package(id).await?;
    info!(id, existed, "app rejected");
    Ok(Json(SuccessResponse::ok()))
}

/// DELETE /apps/{id}
pub async fn delete_app(
    State(state): State<StorefrontState>,
    Path(raw_id): Path<String>,
) -> Result<Json<SuccessResponse>, StorefrontError> {
    let id: i64 = raw_id.trim().parse().map_err(|_| app_not_found())?;
    if !state.store.delete_package(id).await? {
        return Err(app_not_found());
    }
    info!(id, "app deleted");
    Ok(Json(SuccessResponse::with_message("App deleted successfully")))
}
