use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqlitePool, Type};
use strum_macros::{Display, EnumString};
use ts_rs::TS;
use uuid::Uuid;

/// Category of an AI request
#[derive(
    Debug,
    Clone,
    Copy,
    Type,
    Serialize,
    Deserialize,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    TS,
    EnumString,
    Display,
)]
#[sqlx(type_name = "history_kind", rename_all = "kebab-case")]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum HistoryKind {
    /// Formula generation
    Generate,
    /// Formula audit
    Audit,
    /// Sheet architecture brainstorming
    Idea,
    /// Analysis of a Google Sheet's tab structure
    SheetAnalysis,
}

impl HistoryKind {
    pub const ALL: [HistoryKind; 4] = [
        HistoryKind::Generate,
        HistoryKind::Audit,
        HistoryKind::Idea,
        HistoryKind::SheetAnalysis,
    ];
}

/// One recorded AI request/response pair
#[derive(Debug, Clone, FromRow, Serialize, Deserialize, PartialEq, TS)]
pub struct AiHistoryItem {
    pub id: Uuid,
    pub user_id: Uuid,
    pub prompt: String,
    pub response: String,
    pub kind: HistoryKind,
    pub user_email: Option<String>, // owner's email at creation time
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct CreateAiHistoryItem {
    pub user_id: Uuid,
    pub prompt: String,
    pub response: String,
    pub kind: HistoryKind,
    pub user_email: Option<String>,
}

impl AiHistoryItem {
    pub async fn create(
        pool: &SqlitePool,
        data: &CreateAiHistoryItem,
    ) -> Result<Self, sqlx::Error> {
        let id = Uuid::new_v4();
        sqlx::query_as::<_, AiHistoryItem>(
            r#"INSERT INTO ai_history (id, user_id, prompt, response, kind, user_email)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id, user_id, prompt, response, kind, user_email, created_at"#,
        )
        .bind(id)
        .bind(data.user_id)
        .bind(&data.prompt)
        .bind(&data.response)
        .bind(data.kind)
        .bind(&data.user_email)
        .fetch_one(pool)
        .await
    }

    pub async fn find_by_id(pool: &SqlitePool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, AiHistoryItem>(
            r#"SELECT id, user_id, prompt, response, kind, user_email, created_at
            FROM ai_history
            WHERE id = $1"#,
        )
        .bind(id)
        .fetch_optional(pool)
        .await
    }

    /// Every entry, newest first
    pub async fn find_all(pool: &SqlitePool) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, AiHistoryItem>(
            r#"SELECT id, user_id, prompt, response, kind, user_email, created_at
            FROM ai_history
            ORDER BY created_at DESC, rowid DESC"#,
        )
        .fetch_all(pool)
        .await
    }

    /// Entries owned by one principal, newest first
    pub async fn find_by_user_id(
        pool: &SqlitePool,
        user_id: Uuid,
    ) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, AiHistoryItem>(
            r#"SELECT id, user_id, prompt, response, kind, user_email, created_at
            FROM ai_history
            WHERE user_id = $1
            ORDER BY created_at DESC, rowid DESC"#,
        )
        .bind(user_id)
        .fetch_all(pool)
        .await
    }

    pub async fn delete(pool: &SqlitePool, id: Uuid) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM ai_history WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected())
    }

    pub async fn delete_all(pool: &SqlitePool) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM ai_history").execute(pool).await?;
        Ok(result.rows_affected())
    }

    pub async fn count(pool: &SqlitePool) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM ai_history")
            .fetch_one(pool)
            .await
    }

    /// Per-kind counts. Kinds with no entries are absent.
    pub async fn count_by_kind(pool: &SqlitePool) -> Result<Vec<(HistoryKind, i64)>, sqlx::Error> {
        sqlx::query_as::<_, (HistoryKind, i64)>(
            "SELECT kind, COUNT(*) FROM ai_history GROUP BY kind",
        )
        .fetch_all(pool)
        .await
    }
}
