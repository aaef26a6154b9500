use axum::{
    http::StatusCode,
    response::{IntoResponse, Json as ResponseJson, Response},
};
use services::services::{
    access::AccessError, admin::AdminError, assistant::AssistantError, history::HistoryError,
    session::SessionError, sheets::SheetsError,
};
use thiserror::Error;
use tracing::{debug, error};
use utils::{local_store::LocalStoreError, response::ApiResponse};

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("not logged in")]
    Unauthorized,
    #[error("{0}")]
    BadRequest(String),
    #[error(transparent)]
    Session(#[from] SessionError),
    #[error(transparent)]
    History(#[from] HistoryError),
    #[error(transparent)]
    Assistant(#[from] AssistantError),
    #[error(transparent)]
    Sheets(#[from] SheetsError),
    #[error(transparent)]
    Admin(#[from] AdminError),
    #[error(transparent)]
    LocalStore(#[from] LocalStoreError),
}

fn access_status(err: &AccessError) -> StatusCode {
    match err {
        AccessError::PermissionDenied(_) => StatusCode::FORBIDDEN,
        AccessError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn history_status(err: &HistoryError) -> StatusCode {
    match err {
        HistoryError::Access(e) => access_status(e),
        HistoryError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn assistant_status(err: &AssistantError) -> StatusCode {
    match err {
        AssistantError::EmptyInput(_) => StatusCode::BAD_REQUEST,
        AssistantError::History(e) => history_status(e),
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::History(e) => history_status(e),
            ApiError::Assistant(e) => assistant_status(e),
            ApiError::Sheets(e) => match e {
                SheetsError::InvalidLink | SheetsError::Authorization(_) => StatusCode::BAD_REQUEST,
                SheetsError::NotConfigured | SheetsError::AiNotConfigured => {
                    StatusCode::SERVICE_UNAVAILABLE
                }
                SheetsError::Fetch { .. }
                | SheetsError::Transport(_)
                | SheetsError::Payload(_)
                | SheetsError::Analysis(_) => StatusCode::BAD_GATEWAY,
                SheetsError::Assistant(e) => assistant_status(e),
            },
            ApiError::Admin(e) => match e {
                AdminError::Access(e) => access_status(e),
                AdminError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            ApiError::Session(_) | ApiError::LocalStore(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = self.to_string();
        if status.is_server_error() {
            error!(status = status.as_u16(), "Request failed: {}", message);
        } else {
            debug!(status = status.as_u16(), "Request rejected: {}", message);
        }

        (status, ResponseJson(ApiResponse::<()>::error(&message))).into_response()
    }
}
