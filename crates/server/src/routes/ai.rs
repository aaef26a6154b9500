use axum::{Router, extract::State, response::Json as ResponseJson, routing::post};
use serde::Deserialize;
use services::services::assistant::AssistantReply;
use ts_rs::TS;
use utils::response::ApiResponse;

use crate::{DeploymentImpl, error::ApiError};

#[derive(Debug, Deserialize, TS)]
pub struct FormulaRequest {
    pub context: String,
}

#[derive(Debug, Deserialize, TS)]
pub struct AuditRequest {
    pub formula: String,
    #[serde(default)]
    pub context: String,
}

#[derive(Debug, Deserialize, TS)]
pub struct IdeasRequest {
    pub objective: String,
}

/// POST /api/ai/formula
/// Gateway failures still answer 200 with `succeeded: false` and the message.
pub async fn generate_formula(
    State(deployment): State<DeploymentImpl>,
    axum::Json(payload): axum::Json<FormulaRequest>,
) -> Result<ResponseJson<ApiResponse<AssistantReply>>, ApiError> {
    let principal = deployment.require_principal().await?;
    let reply = deployment
        .assistant()
        .generate_formula(&principal, &payload.context)
        .await?;
    Ok(ResponseJson(ApiResponse::success(reply)))
}

/// POST /api/ai/audit
pub async fn check_errors(
    State(deployment): State<DeploymentImpl>,
    axum::Json(payload): axum::Json<AuditRequest>,
) -> Result<ResponseJson<ApiResponse<AssistantReply>>, ApiError> {
    let principal = deployment.require_principal().await?;
    let reply = deployment
        .assistant()
        .check_errors(&principal, &payload.formula, &payload.context)
        .await?;
    Ok(ResponseJson(ApiResponse::success(reply)))
}

/// POST /api/ai/ideas
pub async fn generate_ideas(
    State(deployment): State<DeploymentImpl>,
    axum::Json(payload): axum::Json<IdeasRequest>,
) -> Result<ResponseJson<ApiResponse<AssistantReply>>, ApiError> {
    let principal = deployment.require_principal().await?;
    let reply = deployment
        .assistant()
        .generate_ideas(&principal, &payload.objective)
        .await?;
    Ok(ResponseJson(ApiResponse::success(reply)))
}

pub fn router(_deployment: &DeploymentImpl) -> Router<DeploymentImpl> {
    Router::new().nest(
        "/ai",
        Router::new()
            .route("/formula", post(generate_formula))
            .route("/audit", post(check_errors))
            .route("/ideas", post(generate_ideas)),
    )
}
