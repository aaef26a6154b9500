use axum::{
    Router,
    extract::{Path, State},
    response::Json as ResponseJson,
    routing::{delete, get, post},
};
use db::models::user_profile::UserProfile;
use services::services::admin::UsageStats;
use uuid::Uuid;
use utils::response::ApiResponse;

use crate::{DeploymentImpl, error::ApiError};

/// GET /api/admin/users
pub async fn list_users(
    State(deployment): State<DeploymentImpl>,
) -> Result<ResponseJson<ApiResponse<Vec<UserProfile>>>, ApiError> {
    let actor = deployment.require_principal().await?;
    let users = deployment.admin().list_principals(&actor).await?;
    Ok(ResponseJson(ApiResponse::success(users)))
}

/// POST /api/admin/users/{id}/promote
pub async fn promote_user(
    State(deployment): State<DeploymentImpl>,
    Path(id): Path<Uuid>,
) -> Result<ResponseJson<ApiResponse<()>>, ApiError> {
    let actor = deployment.require_principal().await?;
    deployment.admin().promote(&actor, id).await?;
    Ok(ResponseJson(ApiResponse::success(())))
}

/// DELETE /api/admin/users/{id}
pub async fn delete_user(
    State(deployment): State<DeploymentImpl>,
    Path(id): Path<Uuid>,
) -> Result<ResponseJson<ApiResponse<()>>, ApiError> {
    let actor = deployment.require_principal().await?;
    deployment.admin().delete_principal(&actor, id).await?;
    Ok(ResponseJson(ApiResponse::success(())))
}

/// GET /api/admin/stats
pub async fn get_stats(
    State(deployment): State<DeploymentImpl>,
) -> Result<ResponseJson<ApiResponse<UsageStats>>, ApiError> {
    let actor = deployment.require_principal().await?;
    let stats = deployment.admin().compute_stats(&actor).await?;
    Ok(ResponseJson(ApiResponse::success(stats)))
}

pub fn router(_deployment: &DeploymentImpl) -> Router<DeploymentImpl> {
    Router::new().nest(
        "/admin",
        Router::new()
            .route("/users", get(list_users))
            .route("/users/{id}", delete(delete_user))
            .route("/users/{id}/promote", post(promote_user))
            .route("/stats", get(get_stats)),
    )
}
