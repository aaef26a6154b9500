use axum::{Router, extract::State, response::Json as ResponseJson, routing::get};
use serde::Serialize;
use services::services::appearance::{AppearancePatch, AppearanceSettings, PresentationVars};
use ts_rs::TS;
use utils::response::ApiResponse;

use crate::{DeploymentImpl, error::ApiError};

#[derive(Debug, Serialize, TS)]
pub struct AppearanceView {
    pub settings: AppearanceSettings,
    pub presentation: PresentationVars,
}

impl From<AppearanceSettings> for AppearanceView {
    fn from(settings: AppearanceSettings) -> Self {
        Self {
            presentation: settings.presentation(),
            settings,
        }
    }
}

/// GET /api/appearance
/// Available without login.
pub async fn get_appearance(
    State(deployment): State<DeploymentImpl>,
) -> ResponseJson<ApiResponse<AppearanceView>> {
    let settings = deployment.appearance().get().await;
    ResponseJson(ApiResponse::success(settings.into()))
}

/// PATCH /api/appearance
pub async fn update_appearance(
    State(deployment): State<DeploymentImpl>,
    axum::Json(patch): axum::Json<AppearancePatch>,
) -> Result<ResponseJson<ApiResponse<AppearanceView>>, ApiError> {
    let settings = deployment.appearance().update(&patch).await?;
    Ok(ResponseJson(ApiResponse::success(settings.into())))
}

pub fn router(_deployment: &DeploymentImpl) -> Router<DeploymentImpl> {
    Router::new().route("/appearance", get(get_appearance).patch(update_appearance))
}
