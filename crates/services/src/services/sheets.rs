//! Google Sheets structure analysis.
//!
//! Only the document title and tab names are ever requested; cell contents
//! stay out of reach by construction of the `fields` mask.

use std::sync::Mutex;

use async_trait::async_trait;
use db::models::{ai_history::AiHistoryItem, user_profile::UserProfile};
use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};
use ts_rs::TS;

use super::assistant::{Assistant, AssistantError};

pub const SHEETS_API_BASE: &str = "https://sheets.googleapis.com";

const METADATA_FIELDS: &str = "properties.title,sheets.properties.title";

static SPREADSHEET_ID: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"/d/([a-zA-Z0-9_-]+)").expect("spreadsheet id pattern is valid"));

#[derive(Debug, Error)]
pub enum SheetsError {
    #[error("invalid spreadsheet link")]
    InvalidLink,
    #[error("google sheets access is not configured: GOOGLE_CLIENT_ID not set")]
    NotConfigured,
    #[error("AI analysis is not configured: GEMINI_API_KEY not set")]
    AiNotConfigured,
    #[error("authorization failed: {0}")]
    Authorization(String),
    #[error("metadata fetch failed with status {status}")]
    Fetch { status: u16, body: String },
    #[error("network error: {0}")]
    Transport(String),
    #[error("unexpected metadata payload: {0}")]
    Payload(String),
    #[error("{0}")]
    Analysis(String),
    #[error(transparent)]
    Assistant(#[from] AssistantError),
}

/// Pull the document id out of a spreadsheet URL (`.../d/<id>/...`).
pub fn extract_spreadsheet_id(link: &str) -> Result<&str, SheetsError> {
    SPREADSHEET_ID
        .captures(link)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str())
        .ok_or(SheetsError::InvalidLink)
}

/// Source of a read-only bearer token (the OAuth popup lives outside this crate).
#[async_trait]
pub trait TokenBroker: Send + Sync {
    async fn access_token(&self) -> Result<SecretString, SheetsError>;
}

/// Token already obtained by the front end
pub struct ProvidedToken(SecretString);

impl ProvidedToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(SecretString::from(token.into()))
    }
}

#[async_trait]
impl TokenBroker for ProvidedToken {
    async fn access_token(&self) -> Result<SecretString, SheetsError> {
        if self.0.expose_secret().trim().is_empty() {
            return Err(SheetsError::Authorization("no access token supplied".into()));
        }
        Ok(self.0.clone())
    }
}

#[derive(Debug, Deserialize)]
struct SpreadsheetResponse {
    properties: TitleProperties,
    #[serde(default)]
    sheets: Vec<SheetEntry>,
}

#[derive(Debug, Deserialize)]
struct SheetEntry {
    properties: TitleProperties,
}

#[derive(Debug, Deserialize)]
struct TitleProperties {
    title: String,
}

/// Structural metadata of one spreadsheet
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
pub struct SpreadsheetMetadata {
    pub title: String,
    pub tab_names: Vec<String>,
}

impl SpreadsheetMetadata {
    /// Natural-language structure summary handed to the model.
    pub fn describe(&self) -> String {
        format!(
            "Run an architecture audit for document: {}. Tabs: [{}]. Give optimization suggestions.",
            self.title,
            self.tab_names.join(", ")
        )
    }
}

#[derive(Debug, Clone)]
pub struct SheetsClient {
    http: Client,
    api_base: String,
}

impl SheetsClient {
    pub fn new(api_base: Option<String>) -> Result<Self, SheetsError> {
        let http = Client::builder()
            .user_agent(concat!("formula-operator/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| SheetsError::Transport(e.to_string()))?;

        Ok(Self {
            http,
            api_base: api_base
                .unwrap_or_else(|| SHEETS_API_BASE.to_string())
                .trim_end_matches('/')
                .to_string(),
        })
    }

    /// One read-only metadata request: title and tab names.
    pub async fn fetch_metadata(
        &self,
        spreadsheet_id: &str,
        token: &SecretString,
    ) -> Result<SpreadsheetMetadata, SheetsError> {
        let url = format!("{}/v4/spreadsheets/{}", self.api_base, spreadsheet_id);
        let res = self
            .http
            .get(&url)
            .query(&[("fields", METADATA_FIELDS)])
            .bearer_auth(token.expose_secret())
            .send()
            .await
            .map_err(|e| SheetsError::Transport(e.to_string()))?;

        let status = res.status();
        if !status.is_success() {
            let body = res.text().await.unwrap_or_default();
            return Err(SheetsError::Fetch {
                status: status.as_u16(),
                body,
            });
        }

        let payload: SpreadsheetResponse = res
            .json()
            .await
            .map_err(|e| SheetsError::Payload(e.to_string()))?;

        Ok(SpreadsheetMetadata {
            title: payload.properties.title,
            tab_names: payload
                .sheets
                .into_iter()
                .map(|s| s.properties.title)
                .collect(),
        })
    }
}

/// Where the analyzer is in its flow. Failures always fall back to `Idle`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[serde(rename_all = "lowercase")]
pub enum AnalysisStage {
    #[default]
    Idle,
    Authorizing,
    Fetching,
    Analyzed,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct SheetAnalysis {
    pub metadata: SpreadsheetMetadata,
    pub analysis: String,
    pub entry: AiHistoryItem,
}

pub struct SheetAnalyzer {
    client: SheetsClient,
    assistant: Assistant,
    google_client_id: Option<String>,
    stage: Mutex<AnalysisStage>,
}

impl SheetAnalyzer {
    pub fn new(client: SheetsClient, assistant: Assistant, google_client_id: Option<String>) -> Self {
        Self {
            client,
            assistant,
            google_client_id,
            stage: Mutex::new(AnalysisStage::Idle),
        }
    }

    /// Both the Google client id and the AI key are needed for an analysis.
    pub fn is_configured(&self) -> bool {
        self.google_client_id.is_some() && self.assistant.gateway().is_configured()
    }

    pub fn stage(&self) -> AnalysisStage {
        *self.stage.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Back to `Idle` after the user dismisses a result.
    pub fn reset(&self) {
        self.set_stage(AnalysisStage::Idle);
    }

    fn set_stage(&self, stage: AnalysisStage) {
        *self.stage.lock().unwrap_or_else(|e| e.into_inner()) = stage;
    }

    /// Full flow: link → token → metadata → AI analysis → history.
    /// A retry always restarts from the beginning.
    pub async fn analyze(
        &self,
        principal: &UserProfile,
        link: &str,
        broker: &dyn TokenBroker,
    ) -> Result<SheetAnalysis, SheetsError> {
        let result = self.run(principal, link, broker).await;
        match &result {
            Ok(_) => self.set_stage(AnalysisStage::Analyzed),
            Err(e) => {
                warn!(user_id = %principal.id, error = %e, "Sheet analysis failed");
                self.set_stage(AnalysisStage::Idle);
            }
        }
        result
    }

    async fn run(
        &self,
        principal: &UserProfile,
        link: &str,
        broker: &dyn TokenBroker,
    ) -> Result<SheetAnalysis, SheetsError> {
        let spreadsheet_id = extract_spreadsheet_id(link.trim())?;
        if self.google_client_id.is_none() {
            return Err(SheetsError::NotConfigured);
        }
        if !self.assistant.gateway().is_configured() {
            return Err(SheetsError::AiNotConfigured);
        }

        self.set_stage(AnalysisStage::Authorizing);
        let token = broker.access_token().await?;

        self.set_stage(AnalysisStage::Fetching);
        let metadata = self.client.fetch_metadata(spreadsheet_id, &token).await?;
        info!(
            spreadsheet_id,
            tabs = metadata.tab_names.len(),
            "Fetched spreadsheet metadata"
        );

        let reply = self
            .assistant
            .analyze_sheet(principal, &metadata.title, &metadata.describe())
            .await?;

        match reply.entry {
            Some(entry) => Ok(SheetAnalysis {
                metadata,
                analysis: reply.text,
                entry,
            }),
            None => Err(SheetsError::Analysis(reply.text)),
        }
    }
}

#[cfg(test)]
mod tests {
    use db::{
        DBService,
        models::{ai_history::HistoryKind, user_profile::UserRole},
    };
    use httpmock::prelude::*;

    use super::*;
    use crate::services::{
        ai_gateway::{AiGateway, testing::FakeGenerator},
        gemini_api::GeminiApiError,
        history::HistoryLog,
    };

    #[test]
    fn test_extract_id_from_edit_link() {
        assert_eq!(
            extract_spreadsheet_id("https://docs.google.com/spreadsheets/d/ABC123/edit").unwrap(),
            "ABC123"
        );
        assert_eq!(
            extract_spreadsheet_id("https://docs.google.com/spreadsheets/d/1a-B_c9/edit#gid=0")
                .unwrap(),
            "1a-B_c9"
        );
    }

    #[test]
    fn test_extract_id_rejects_other_links() {
        assert!(matches!(
            extract_spreadsheet_id("https://example.com/notasheet"),
            Err(SheetsError::InvalidLink)
        ));
        assert!(extract_spreadsheet_id("").is_err());
    }

    #[test]
    fn test_describe_lists_tabs() {
        let meta = SpreadsheetMetadata {
            title: "Ops".into(),
            tab_names: vec!["Raw".into(), "Pivot".into()],
        };
        assert_eq!(
            meta.describe(),
            "Run an architecture audit for document: Ops. Tabs: [Raw, Pivot]. Give optimization suggestions."
        );
    }

    #[tokio::test]
    async fn test_fetch_metadata_sends_bearer_and_field_mask() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(GET)
                    .path("/v4/spreadsheets/ABC123")
                    .query_param("fields", METADATA_FIELDS)
                    .header("Authorization", "Bearer tok");
                then.status(200).json_body(serde_json::json!({
                    "properties": { "title": "Budget" },
                    "sheets": [
                        { "properties": { "title": "Jan" } },
                        { "properties": { "title": "Feb" } }
                    ]
                }));
            })
            .await;

        let client = SheetsClient::new(Some(server.base_url())).unwrap();
        let meta = client
            .fetch_metadata("ABC123", &SecretString::from("tok"))
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(meta.title, "Budget");
        assert_eq!(meta.tab_names, vec!["Jan", "Feb"]);
    }

    #[tokio::test]
    async fn test_fetch_metadata_non_success_carries_status() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/v4/spreadsheets/nope");
                then.status(404).body("not found");
            })
            .await;

        let client = SheetsClient::new(Some(server.base_url())).unwrap();
        let err = client
            .fetch_metadata("nope", &SecretString::from("tok"))
            .await
            .unwrap_err();
        assert!(matches!(err, SheetsError::Fetch { status: 404, .. }));
    }

    struct Fixture {
        analyzer: SheetAnalyzer,
        history: HistoryLog,
        user: UserProfile,
    }

    async fn fixture(server: &MockServer, gateway: AiGateway) -> Fixture {
        let db = DBService::new_in_memory().await.unwrap();
        let history = HistoryLog::new(db.pool.clone());
        let user = UserProfile::create(&db.pool, "op@operator.ai", UserRole::Operator)
            .await
            .unwrap();
        let analyzer = SheetAnalyzer::new(
            SheetsClient::new(Some(server.base_url())).unwrap(),
            Assistant::new(gateway, history.clone()),
            Some("client-id".into()),
        );
        Fixture {
            analyzer,
            history,
            user,
        }
    }

    async fn mock_budget(server: &MockServer) {
        server
            .mock_async(|when, then| {
                when.method(GET).path("/v4/spreadsheets/ABC123");
                then.status(200).json_body(serde_json::json!({
                    "properties": { "title": "Budget" },
                    "sheets": [{ "properties": { "title": "Jan" } }]
                }));
            })
            .await;
    }

    #[tokio::test]
    async fn test_analyze_records_and_reaches_analyzed() {
        let server = MockServer::start_async().await;
        mock_budget(&server).await;
        let fake = FakeGenerator::replying("Split Jan into a table");
        let fx = fixture(&server, AiGateway::new(fake.clone())).await;

        let result = fx
            .analyzer
            .analyze(
                &fx.user,
                "https://docs.google.com/spreadsheets/d/ABC123/edit",
                &ProvidedToken::new("tok"),
            )
            .await
            .unwrap();

        assert_eq!(fx.analyzer.stage(), AnalysisStage::Analyzed);
        assert_eq!(result.analysis, "Split Jan into a table");
        assert_eq!(result.entry.kind, HistoryKind::SheetAnalysis);
        assert!(fake.calls()[0].1.contains("Tabs: [Jan]"));
        assert_eq!(fx.history.list(&fx.user).await.unwrap().len(), 1);

        fx.analyzer.reset();
        assert_eq!(fx.analyzer.stage(), AnalysisStage::Idle);
    }

    #[tokio::test]
    async fn test_fetch_failure_collapses_to_idle() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/v4/spreadsheets/ABC123");
                then.status(403).body("forbidden");
            })
            .await;
        let fake = FakeGenerator::replying("unused");
        let fx = fixture(&server, AiGateway::new(fake.clone())).await;

        let err = fx
            .analyzer
            .analyze(
                &fx.user,
                "https://docs.google.com/spreadsheets/d/ABC123/edit",
                &ProvidedToken::new("tok"),
            )
            .await
            .unwrap_err();

        assert!(matches!(err, SheetsError::Fetch { status: 403, .. }));
        assert_eq!(fx.analyzer.stage(), AnalysisStage::Idle);
        assert!(fake.calls().is_empty());
        assert!(fx.history.list(&fx.user).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_invalid_link_and_missing_token_fail_early() {
        let server = MockServer::start_async().await;
        let fx = fixture(&server, AiGateway::new(FakeGenerator::replying("x"))).await;

        let err = fx
            .analyzer
            .analyze(&fx.user, "https://example.com/notasheet", &ProvidedToken::new("tok"))
            .await
            .unwrap_err();
        assert!(matches!(err, SheetsError::InvalidLink));

        let err = fx
            .analyzer
            .analyze(
                &fx.user,
                "https://docs.google.com/spreadsheets/d/ABC123/edit",
                &ProvidedToken::new(""),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, SheetsError::Authorization(_)));
        assert_eq!(fx.analyzer.stage(), AnalysisStage::Idle);
    }

    #[tokio::test]
    async fn test_gateway_failure_is_reported_not_recorded() {
        let server = MockServer::start_async().await;
        mock_budget(&server).await;
        let fx = fixture(
            &server,
            AiGateway::new(FakeGenerator::failing(GeminiApiError::Http {
                status: 502,
                body: String::new(),
            })),
        )
        .await;

        let err = fx
            .analyzer
            .analyze(
                &fx.user,
                "https://docs.google.com/spreadsheets/d/ABC123/edit",
                &ProvidedToken::new("tok"),
            )
            .await
            .unwrap_err();

        assert!(matches!(err, SheetsError::Analysis(msg) if msg.contains("HTTP 502")));
        assert_eq!(fx.analyzer.stage(), AnalysisStage::Idle);
        assert!(fx.history.list(&fx.user).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_unconfigured_client_id() {
        let server = MockServer::start_async().await;
        let db = DBService::new_in_memory().await.unwrap();
        let user = UserProfile::create(&db.pool, "op@operator.ai", UserRole::Operator)
            .await
            .unwrap();
        let analyzer = SheetAnalyzer::new(
            SheetsClient::new(Some(server.base_url())).unwrap(),
            Assistant::new(AiGateway::not_configured(), HistoryLog::new(db.pool.clone())),
            None,
        );

        let err = analyzer
            .analyze(
                &user,
                "https://docs.google.com/spreadsheets/d/ABC123/edit",
                &ProvidedToken::new("tok"),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, SheetsError::NotConfigured));
    }

    #[tokio::test]
    async fn test_missing_ai_key_stops_before_fetch() {
        let server = MockServer::start_async().await;
        let fetch = server
            .mock_async(|when, then| {
                when.method(GET).path("/v4/spreadsheets/ABC123");
                then.status(200).json_body(serde_json::json!({
                    "properties": { "title": "Budget" }
                }));
            })
            .await;
        let fx = fixture(&server, AiGateway::not_configured()).await;
        assert!(!fx.analyzer.is_configured());

        let err = fx
            .analyzer
            .analyze(
                &fx.user,
                "https://docs.google.com/spreadsheets/d/ABC123/edit",
                &ProvidedToken::new("tok"),
            )
            .await
            .unwrap_err();

        assert!(matches!(err, SheetsError::AiNotConfigured));
        assert_eq!(fetch.hits_async().await, 0);
        assert_eq!(fx.analyzer.stage(), AnalysisStage::Idle);
    }
}
