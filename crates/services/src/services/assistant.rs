//! Assistant: runs an AI request for a principal and records completed ones.

use db::models::{
    ai_history::{AiHistoryItem, CreateAiHistoryItem},
    user_profile::UserProfile,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};
use ts_rs::TS;

use super::{
    ai_gateway::{AiGateway, AiRequest, NO_RESPONSE, describe_failure},
    history::{HistoryError, HistoryLog},
};

#[derive(Debug, Error)]
pub enum AssistantError {
    #[error("{0} must not be empty")]
    EmptyInput(&'static str),
    #[error(transparent)]
    History(#[from] HistoryError),
}

/// What the panel shows after a request
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct AssistantReply {
    pub text: String,
    pub succeeded: bool,
    /// Present only when the call completed and was recorded
    pub entry: Option<AiHistoryItem>,
}

#[derive(Clone)]
pub struct Assistant {
    gateway: AiGateway,
    history: HistoryLog,
}

impl Assistant {
    pub fn new(gateway: AiGateway, history: HistoryLog) -> Self {
        Self { gateway, history }
    }

    pub fn gateway(&self) -> &AiGateway {
        &self.gateway
    }

    pub async fn generate_formula(
        &self,
        principal: &UserProfile,
        context: &str,
    ) -> Result<AssistantReply, AssistantError> {
        require_text(context, "formula description")?;
        let request = AiRequest::GenerateFormula {
            context: context.to_string(),
        };
        self.run(principal, &request, format!("Build formula: {context}"))
            .await
    }

    pub async fn check_errors(
        &self,
        principal: &UserProfile,
        formula: &str,
        context: &str,
    ) -> Result<AssistantReply, AssistantError> {
        require_text(formula, "formula")?;
        let request = AiRequest::CheckErrors {
            formula: formula.to_string(),
            context: context.to_string(),
        };
        self.run(
            principal,
            &request,
            format!("Check formula: {formula} with context: {context}"),
        )
        .await
    }

    pub async fn generate_ideas(
        &self,
        principal: &UserProfile,
        objective: &str,
    ) -> Result<AssistantReply, AssistantError> {
        require_text(objective, "objective")?;
        let request = AiRequest::GenerateIdeas {
            objective: objective.to_string(),
        };
        self.run(
            principal,
            &request,
            format!("Architecture ideas for: {objective}"),
        )
        .await
    }

    /// `description` is the synthesized structure summary sent to the model;
    /// the history only keeps the document title.
    pub async fn analyze_sheet(
        &self,
        principal: &UserProfile,
        title: &str,
        description: &str,
    ) -> Result<AssistantReply, AssistantError> {
        let request = AiRequest::AnalyzeSheet {
            metadata: description.to_string(),
        };
        self.run(principal, &request, format!("Architecture audit: {title}"))
            .await
    }

    /// Dispatch, then append to the history only if the call completed.
    /// Failed calls return their message with `entry: None`.
    pub async fn run(
        &self,
        principal: &UserProfile,
        request: &AiRequest,
        history_prompt: String,
    ) -> Result<AssistantReply, AssistantError> {
        let text = match self.gateway.dispatch(request).await {
            Ok(text) => text.unwrap_or_else(|| NO_RESPONSE.to_string()),
            Err(e) => {
                warn!(
                    user_id = %principal.id,
                    kind = %request.kind(),
                    error = %e,
                    "AI request failed, not recorded"
                );
                return Ok(AssistantReply {
                    text: describe_failure(&e),
                    succeeded: false,
                    entry: None,
                });
            }
        };

        let entry = self
            .history
            .append(&CreateAiHistoryItem {
                user_id: principal.id,
                prompt: history_prompt,
                response: text.clone(),
                kind: request.kind(),
                user_email: Some(principal.email.clone()),
            })
            .await?;

        info!(
            user_id = %principal.id,
            kind = %request.kind(),
            history_id = %entry.id,
            "AI request completed"
        );

        Ok(AssistantReply {
            text,
            succeeded: true,
            entry: Some(entry),
        })
    }
}

fn require_text(value: &str, field: &'static str) -> Result<(), AssistantError> {
    if value.trim().is_empty() {
        return Err(AssistantError::EmptyInput(field));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use db::{
        DBService,
        models::{ai_history::HistoryKind, user_profile::UserRole},
    };

    use super::*;
    use crate::services::{ai_gateway::testing::FakeGenerator, gemini_api::GeminiApiError};

    async fn setup(gateway: AiGateway) -> (Assistant, HistoryLog, UserProfile) {
        let db = DBService::new_in_memory().await.unwrap();
        let history = HistoryLog::new(db.pool.clone());
        let user = UserProfile::create(&db.pool, "op@operator.ai", UserRole::Operator)
            .await
            .unwrap();
        (Assistant::new(gateway, history.clone()), history, user)
    }

    #[tokio::test]
    async fn test_completed_call_is_recorded() {
        let (assistant, history, user) =
            setup(AiGateway::new(FakeGenerator::replying("=IFERROR(A1/B1,0)"))).await;

        let reply = assistant
            .check_errors(&user, "=A1/B1", "B can be zero")
            .await
            .unwrap();

        assert!(reply.succeeded);
        let entry = reply.entry.unwrap();
        assert_eq!(entry.kind, HistoryKind::Audit);
        assert_eq!(entry.prompt, "Check formula: =A1/B1 with context: B can be zero");
        assert_eq!(entry.response, "=IFERROR(A1/B1,0)");
        assert_eq!(entry.user_email.as_deref(), Some("op@operator.ai"));
        assert_eq!(history.list(&user).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_failed_call_is_not_recorded() {
        let (assistant, history, user) =
            setup(AiGateway::new(FakeGenerator::failing(GeminiApiError::RateLimited))).await;

        let reply = assistant.generate_formula(&user, "running total").await.unwrap();

        assert!(!reply.succeeded);
        assert!(reply.text.contains("Rate limit"));
        assert!(reply.entry.is_none());
        assert!(history.list(&user).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_empty_answer_is_recorded_with_sentinel() {
        let (assistant, _history, user) = setup(AiGateway::new(FakeGenerator::silent())).await;

        let reply = assistant.generate_ideas(&user, "payroll").await.unwrap();

        assert!(reply.succeeded);
        assert_eq!(reply.text, NO_RESPONSE);
        assert_eq!(reply.entry.unwrap().response, NO_RESPONSE);
    }

    #[tokio::test]
    async fn test_blank_input_never_dispatches() {
        let fake = FakeGenerator::replying("x");
        let (assistant, _history, user) = setup(AiGateway::new(fake.clone())).await;

        let err = assistant.generate_formula(&user, "   ").await.unwrap_err();

        assert!(matches!(err, AssistantError::EmptyInput(_)));
        assert!(fake.calls().is_empty());
    }

    #[tokio::test]
    async fn test_sheet_analysis_records_title_only() {
        let fake = FakeGenerator::replying("merge the monthly tabs");
        let (assistant, _history, user) = setup(AiGateway::new(fake.clone())).await;

        let reply = assistant
            .analyze_sheet(&user, "Budget 2025", "Document: Budget 2025. Tabs: [Jan, Feb]")
            .await
            .unwrap();

        let entry = reply.entry.unwrap();
        assert_eq!(entry.prompt, "Architecture audit: Budget 2025");
        assert_eq!(entry.kind, HistoryKind::SheetAnalysis);
        assert!(fake.calls()[0].1.contains("Tabs: [Jan, Feb]"));
    }
}
