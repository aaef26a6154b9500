use axum::Router;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::DeploymentImpl;

pub mod admin;
pub mod ai;
pub mod appearance;
pub mod auth;
pub mod history;
pub mod info;
pub mod sheets;

pub fn router(deployment: DeploymentImpl) -> Router {
    let api = Router::new()
        .merge(info::router(&deployment))
        .merge(auth::router(&deployment))
        .merge(ai::router(&deployment))
        .merge(sheets::router(&deployment))
        .merge(history::router(&deployment))
        .merge(admin::router(&deployment))
        .merge(appearance::router(&deployment));

    Router::new()
        .nest("/api", api)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(deployment)
}
