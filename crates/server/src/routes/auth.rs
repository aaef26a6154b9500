use axum::{
    Router,
    extract::State,
    response::Json as ResponseJson,
    routing::{get, post},
};
use db::models::user_profile::UserProfile;
use serde::Deserialize;
use ts_rs::TS;
use utils::response::ApiResponse;

use crate::{DeploymentImpl, error::ApiError};

#[derive(Debug, Deserialize, TS)]
pub struct LoginRequest {
    pub email: String,
}

/// POST /api/auth/login
/// Existing principals come back as they are; new emails become operators.
pub async fn login(
    State(deployment): State<DeploymentImpl>,
    axum::Json(payload): axum::Json<LoginRequest>,
) -> Result<ResponseJson<ApiResponse<UserProfile>>, ApiError> {
    let email = payload.email.trim();
    if email.is_empty() {
        return Err(ApiError::BadRequest("email must not be empty".to_string()));
    }

    let profile = deployment.session().login(email).await?;
    Ok(ResponseJson(ApiResponse::success(profile)))
}

/// GET /api/auth/me
/// A principal deleted from the directory is logged out here.
pub async fn me(
    State(deployment): State<DeploymentImpl>,
) -> Result<ResponseJson<ApiResponse<Option<UserProfile>>>, ApiError> {
    let principal = deployment.session().refresh_current_principal().await?;
    Ok(ResponseJson(ApiResponse::success(principal)))
}

/// POST /api/auth/logout
pub async fn logout(State(deployment): State<DeploymentImpl>) -> ResponseJson<ApiResponse<()>> {
    deployment.session().logout().await;
    ResponseJson(ApiResponse::success(()))
}

pub fn router(_deployment: &DeploymentImpl) -> Router<DeploymentImpl> {
    Router::new().nest(
        "/auth",
        Router::new()
            .route("/login", post(login))
            .route("/me", get(me))
            .route("/logout", post(logout)),
    )
}
