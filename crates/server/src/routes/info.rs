use axum::{Router, extract::State, response::Json as ResponseJson, routing::get};
use serde::Serialize;
use ts_rs::TS;
use utils::response::ApiResponse;

use crate::DeploymentImpl;

#[derive(Debug, Serialize, TS)]
pub struct ServerInfo {
    pub version: String,
    pub ai_configured: bool,
    pub sheets_configured: bool,
}

/// GET /api/info
pub async fn get_info(State(deployment): State<DeploymentImpl>) -> ResponseJson<ApiResponse<ServerInfo>> {
    ResponseJson(ApiResponse::success(ServerInfo {
        version: env!("CARGO_PKG_VERSION").to_string(),
        ai_configured: deployment.assistant().gateway().is_configured(),
        sheets_configured: deployment.sheets().is_configured(),
    }))
}

pub fn router(_deployment: &DeploymentImpl) -> Router<DeploymentImpl> {
    Router::new().route("/info", get(get_info))
}
