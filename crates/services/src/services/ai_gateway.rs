//! The four AI operations offered to the panels.
//!
//! Each operation is a fixed prompt template plus a model and temperature.
//! The string-returning operations never fail: collaborator errors come back
//! as a displayable message. [`AiGateway::dispatch`] exposes the structured
//! result for callers that need to tell success from failure.

use std::sync::Arc;

use db::models::ai_history::HistoryKind;
use tracing::{debug, warn};

use super::gemini_api::{GeminiApiClient, GeminiApiError, TextGenerator};

pub const FAST_MODEL: &str = "gemini-3-flash-preview";
pub const PRO_MODEL: &str = "gemini-3-pro-preview";

/// Returned in place of text when the service answers with nothing.
pub const NO_RESPONSE: &str = "The AI did not return a response.";

#[derive(Debug, Clone, PartialEq)]
pub enum AiRequest {
    GenerateFormula { context: String },
    CheckErrors { formula: String, context: String },
    GenerateIdeas { objective: String },
    AnalyzeSheet { metadata: String },
}

impl AiRequest {
    pub fn kind(&self) -> HistoryKind {
        match self {
            Self::GenerateFormula { .. } => HistoryKind::Generate,
            Self::CheckErrors { .. } => HistoryKind::Audit,
            Self::GenerateIdeas { .. } => HistoryKind::Idea,
            Self::AnalyzeSheet { .. } => HistoryKind::SheetAnalysis,
        }
    }

    pub fn model(&self) -> &'static str {
        match self {
            Self::GenerateFormula { .. } => FAST_MODEL,
            _ => PRO_MODEL,
        }
    }

    /// Low for formulas, lowest for audits, high for brainstorming.
    pub fn temperature(&self) -> f32 {
        match self {
            Self::GenerateFormula { .. } => 0.2,
            Self::CheckErrors { .. } => 0.1,
            Self::GenerateIdeas { .. } => 0.7,
            Self::AnalyzeSheet { .. } => 0.3,
        }
    }

    /// Render the instruction sent to the model. Plain interpolation, no escaping.
    pub fn prompt(&self) -> String {
        match self {
            Self::GenerateFormula { context } => format!(
                "Excel expert: build a formula for {context}. Provide: Formula, Logic, Notes."
            ),
            Self::CheckErrors { formula, context } => format!(
                "Audit: {formula}. Context: {context}. Provide: Status, Findings, Fix."
            ),
            Self::GenerateIdeas { objective } => {
                format!("Data architect: design a sheet structure for {objective}.")
            }
            Self::AnalyzeSheet { metadata } => format!("Metadata analysis: {metadata}."),
        }
    }
}

/// Turn a collaborator failure into the message shown to the user.
pub fn describe_failure(err: &GeminiApiError) -> String {
    match err {
        GeminiApiError::RateLimited => {
            "Rate limit reached: the AI quota is exhausted. Wait a moment and try again."
                .to_string()
        }
        GeminiApiError::InvalidCredential(_) => {
            "AI credential rejected: check the API key and that the service is available in your region."
                .to_string()
        }
        GeminiApiError::Http { status, .. } if (500..=599).contains(status) => format!(
            "AI service fault (HTTP {status}): the upstream server failed. Try again later."
        ),
        GeminiApiError::MissingApiKey => {
            "Error: API key is not configured. Set GEMINI_API_KEY in the environment.".to_string()
        }
        other => format!("AI connection lost: {other}"),
    }
}

#[derive(Clone)]
pub struct AiGateway {
    generator: Option<Arc<dyn TextGenerator>>,
}

impl AiGateway {
    pub fn new(generator: Arc<dyn TextGenerator>) -> Self {
        Self {
            generator: Some(generator),
        }
    }

    /// A gateway whose every call reports the missing credential.
    pub fn not_configured() -> Self {
        Self { generator: None }
    }

    pub fn from_client(client: Result<GeminiApiClient, GeminiApiError>) -> Self {
        match client {
            Ok(client) => Self::new(Arc::new(client)),
            Err(e) => {
                warn!("AI gateway disabled: {}", e);
                Self::not_configured()
            }
        }
    }

    pub fn is_configured(&self) -> bool {
        self.generator.is_some()
    }

    /// Structured call: `Ok(None)` when the model produced no text.
    pub async fn dispatch(&self, request: &AiRequest) -> Result<Option<String>, GeminiApiError> {
        let generator = self
            .generator
            .as_ref()
            .ok_or(GeminiApiError::MissingApiKey)?;

        debug!(
            kind = %request.kind(),
            model = request.model(),
            temperature = request.temperature(),
            "Dispatching AI request"
        );
        generator
            .generate(request.model(), &request.prompt(), request.temperature())
            .await
    }

    /// Never fails; errors and empty answers become display text.
    pub async fn execute(&self, request: &AiRequest) -> String {
        match self.dispatch(request).await {
            Ok(Some(text)) => text,
            Ok(None) => NO_RESPONSE.to_string(),
            Err(e) => {
                warn!(kind = %request.kind(), error = %e, "AI request failed");
                describe_failure(&e)
            }
        }
    }

    pub async fn generate_formula(&self, context: &str) -> String {
        self.execute(&AiRequest::GenerateFormula {
            context: context.to_string(),
        })
        .await
    }

    pub async fn check_errors(&self, formula: &str, context: &str) -> String {
        self.execute(&AiRequest::CheckErrors {
            formula: formula.to_string(),
            context: context.to_string(),
        })
        .await
    }

    pub async fn generate_ideas(&self, objective: &str) -> String {
        self.execute(&AiRequest::GenerateIdeas {
            objective: objective.to_string(),
        })
        .await
    }

    pub async fn analyze_sheet(&self, metadata: &str) -> String {
        self.execute(&AiRequest::AnalyzeSheet {
            metadata: metadata.to_string(),
        })
        .await
    }
}


#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::{testing::FakeGenerator, *};

    #[tokio::test]
    async fn test_generate_formula_uses_fast_model_low_temperature() {
        let fake = FakeGenerator::replying("=SUMIF(A:A,\">0\")");
        let gateway = AiGateway::new(fake.clone());

        let text = gateway.generate_formula("sum of positive values").await;

        assert_eq!(text, "=SUMIF(A:A,\">0\")");
        let calls = fake.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].0, FAST_MODEL);
        assert!(calls[0].1.contains("sum of positive values"));
        assert_eq!(calls[0].2, 0.2);
    }

    #[tokio::test]
    async fn test_operation_temperatures_follow_task() {
        let fake = FakeGenerator::replying("ok");
        let gateway = AiGateway::new(fake.clone());

        gateway.check_errors("=A1/B1", "B1 may be zero").await;
        gateway.generate_ideas("inventory tracker").await;
        gateway.analyze_sheet("Budget tabs").await;

        let calls = fake.calls();
        let temps: Vec<f32> = calls.iter().map(|c| c.2).collect();
        assert_eq!(temps, vec![0.1, 0.7, 0.3]);
        assert!(calls.iter().all(|c| c.0 == PRO_MODEL));
        assert!(calls[0].1.contains("=A1/B1") && calls[0].1.contains("B1 may be zero"));
    }

    #[tokio::test]
    async fn test_rate_limit_becomes_message() {
        let gateway = AiGateway::new(FakeGenerator::failing(GeminiApiError::RateLimited));

        let text = gateway.check_errors("=A1", "").await;

        assert!(text.contains("Rate limit"));
    }

    #[tokio::test]
    async fn test_failure_categories_have_distinct_messages() {
        let cases = [
            GeminiApiError::RateLimited,
            GeminiApiError::InvalidCredential("bad".into()),
            GeminiApiError::Http {
                status: 500,
                body: String::new(),
            },
            GeminiApiError::Transport("connection reset".into()),
        ];
        let messages: Vec<String> = cases.iter().map(describe_failure).collect();

        assert!(messages[1].contains("credential"));
        assert!(messages[2].contains("HTTP 500"));
        assert!(messages[3].contains("connection reset"));
        let distinct: HashSet<&String> = messages.iter().collect();
        assert_eq!(distinct.len(), messages.len());
    }

    #[tokio::test]
    async fn test_empty_answer_yields_sentinel() {
        let gateway = AiGateway::new(FakeGenerator::silent());
        assert_eq!(gateway.generate_ideas("crm").await, NO_RESPONSE);
    }

    #[tokio::test]
    async fn test_unconfigured_gateway_explains_itself() {
        let gateway = AiGateway::not_configured();
        assert!(!gateway.is_configured());

        let text = gateway.generate_formula("anything").await;
        assert!(text.contains("API key is not configured"));
        assert!(matches!(
            gateway
                .dispatch(&AiRequest::GenerateIdeas {
                    objective: "x".into()
                })
                .await,
            Err(GeminiApiError::MissingApiKey)
        ));
    }

    #[test]
    fn test_request_kinds() {
        let req = AiRequest::AnalyzeSheet {
            metadata: "m".into(),
        };
        assert_eq!(req.kind(), HistoryKind::SheetAnalysis);
        assert_eq!(req.prompt(), "Metadata analysis: m.");
    }
}
