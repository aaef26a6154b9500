use axum::{
    Router,
    extract::State,
    response::Json as ResponseJson,
    routing::{get, post},
};
use serde::Deserialize;
use services::services::sheets::{AnalysisStage, ProvidedToken, SheetAnalysis};
use ts_rs::TS;
use utils::response::ApiResponse;

use crate::{DeploymentImpl, error::ApiError};

#[derive(Debug, Deserialize, TS)]
pub struct AnalyzeSheetRequest {
    pub url: String,
    /// Read-only OAuth token obtained by the browser
    pub access_token: String,
}

/// POST /api/sheets/analyze
pub async fn analyze_sheet(
    State(deployment): State<DeploymentImpl>,
    axum::Json(payload): axum::Json<AnalyzeSheetRequest>,
) -> Result<ResponseJson<ApiResponse<SheetAnalysis>>, ApiError> {
    let principal = deployment.require_principal().await?;
    let broker = ProvidedToken::new(payload.access_token);

    let analysis = deployment
        .sheets()
        .analyze(&principal, &payload.url, &broker)
        .await?;
    Ok(ResponseJson(ApiResponse::success(analysis)))
}

/// GET /api/sheets/stage
pub async fn get_stage(State(deployment): State<DeploymentImpl>) -> ResponseJson<ApiResponse<AnalysisStage>> {
    ResponseJson(ApiResponse::success(deployment.sheets().stage()))
}

/// POST /api/sheets/reset
pub async fn reset(State(deployment): State<DeploymentImpl>) -> ResponseJson<ApiResponse<AnalysisStage>> {
    deployment.sheets().reset();
    ResponseJson(ApiResponse::success(deployment.sheets().stage()))
}

pub fn router(_deployment: &DeploymentImpl) -> Router<DeploymentImpl> {
    Router::new().nest(
        "/sheets",
        Router::new()
            .route("/analyze", post(analyze_sheet))
            .route("/stage", get(get_stage))
            .route("/reset", post(reset)),
    )
}
