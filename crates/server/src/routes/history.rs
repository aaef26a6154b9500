use axum::{
    Router,
    extract::{Path, Query, State},
    response::Json as ResponseJson,
    routing::{delete, get},
};
use db::models::ai_history::AiHistoryItem;
use serde::Deserialize;
use services::services::history::{HistoryFilter, KindFilter};
use uuid::Uuid;
use utils::response::ApiResponse;

use crate::{DeploymentImpl, error::ApiError};

#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    pub search: Option<String>,
    pub kind: Option<String>,
}

/// GET /api/history?search=&kind=
/// Admins see every entry, operators only their own.
pub async fn list_history(
    State(deployment): State<DeploymentImpl>,
    Query(query): Query<HistoryQuery>,
) -> Result<ResponseJson<ApiResponse<Vec<AiHistoryItem>>>, ApiError> {
    let principal = deployment.require_principal().await?;

    let kind = query
        .kind
        .as_deref()
        .unwrap_or_default()
        .parse::<KindFilter>()
        .map_err(|_| ApiError::BadRequest(format!("unknown history kind: {:?}", query.kind)))?;
    let search = query.search.filter(|s| !s.trim().is_empty());

    let items = deployment.history().list(&principal).await?;
    Ok(ResponseJson(ApiResponse::success(
        HistoryFilter::new(search, kind).apply(items),
    )))
}

/// DELETE /api/history/{id}
pub async fn delete_entry(
    State(deployment): State<DeploymentImpl>,
    Path(id): Path<Uuid>,
) -> Result<ResponseJson<ApiResponse<()>>, ApiError> {
    let principal = deployment.require_principal().await?;
    deployment.history().delete(&principal, id).await?;
    Ok(ResponseJson(ApiResponse::success(())))
}

/// DELETE /api/history
/// Admin only. Returns the number of removed entries.
pub async fn clear_history(
    State(deployment): State<DeploymentImpl>,
) -> Result<ResponseJson<ApiResponse<u64>>, ApiError> {
    let principal = deployment.require_principal().await?;
    let removed = deployment.history().clear(&principal).await?;
    Ok(ResponseJson(ApiResponse::success(removed)))
}

pub fn router(_deployment: &DeploymentImpl) -> Router<DeploymentImpl> {
    Router::new().nest(
        "/history",
        Router::new()
            .route("/", get(list_history).delete(clear_history))
            .route("/{id}", delete(delete_entry)),
    )
}
