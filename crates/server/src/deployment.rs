//! Shared application state handed to every route.

use std::sync::Arc;

use db::{DBService, models::user_profile::UserProfile};
use services::services::{
    admin::AdminDirectory,
    ai_gateway::AiGateway,
    appearance::AppearanceStore,
    assistant::Assistant,
    config::Config,
    gemini_api::GeminiApiClient,
    history::HistoryLog,
    session::SessionStore,
    sheets::{SheetAnalyzer, SheetsClient, SheetsError},
};
use thiserror::Error;
use tracing::warn;
use utils::{
    assets::{database_path, local_store_dir},
    local_store::LocalStore,
};

use crate::error::ApiError;

#[derive(Debug, Error)]
pub enum DeploymentError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error(transparent)]
    Sheets(#[from] SheetsError),
}

struct DeploymentInner {
    config: Config,
    db: DBService,
    session: SessionStore,
    appearance: AppearanceStore,
    history: HistoryLog,
    assistant: Assistant,
    sheets: SheetAnalyzer,
    admin: AdminDirectory,
}

#[derive(Clone)]
pub struct Deployment {
    inner: Arc<DeploymentInner>,
}

impl Deployment {
    /// Open the on-disk database under the configured data dir.
    pub async fn new(config: Config) -> Result<Self, DeploymentError> {
        let db = DBService::new(&database_path(&config.data_dir)).await?;
        Self::with_db(config, db)
    }

    pub fn with_db(config: Config, db: DBService) -> Result<Self, DeploymentError> {
        let local = LocalStore::new(local_store_dir(&config.data_dir));

        let gateway = match &config.gemini_api_key {
            Some(key) => AiGateway::from_client(GeminiApiClient::new(
                key.clone(),
                Some(config.gemini_api_base.clone()),
            )),
            None => {
                warn!("GEMINI_API_KEY not set, AI features will report a missing key");
                AiGateway::not_configured()
            }
        };
        if config.google_client_id.is_none() {
            warn!("GOOGLE_CLIENT_ID not set, sheet analysis is unavailable");
        }

        let history = HistoryLog::new(db.pool.clone());
        let assistant = Assistant::new(gateway, history.clone());
        let sheets = SheetAnalyzer::new(
            SheetsClient::new(Some(config.sheets_api_base.clone()))?,
            assistant.clone(),
            config.google_client_id.clone(),
        );

        Ok(Self {
            inner: Arc::new(DeploymentInner {
                session: SessionStore::new(db.pool.clone(), local.clone()),
                appearance: AppearanceStore::load(local),
                admin: AdminDirectory::new(db.pool.clone()),
                history,
                assistant,
                sheets,
                db,
                config,
            }),
        })
    }

    pub fn config(&self) -> &Config {
        &self.inner.config
    }

    pub fn db(&self) -> &DBService {
        &self.inner.db
    }

    pub fn session(&self) -> &SessionStore {
        &self.inner.session
    }

    pub fn appearance(&self) -> &AppearanceStore {
        &self.inner.appearance
    }

    pub fn history(&self) -> &HistoryLog {
        &self.inner.history
    }

    pub fn assistant(&self) -> &Assistant {
        &self.inner.assistant
    }

    pub fn sheets(&self) -> &SheetAnalyzer {
        &self.inner.sheets
    }

    pub fn admin(&self) -> &AdminDirectory {
        &self.inner.admin
    }

    /// Current principal as the directory has it now, or 401.
    pub async fn require_principal(&self) -> Result<UserProfile, ApiError> {
        self.session()
            .refresh_current_principal()
            .await?
            .ok_or(ApiError::Unauthorized)
    }
}
