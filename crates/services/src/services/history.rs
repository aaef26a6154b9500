//! History log: append-only record of completed AI interactions.

use std::str::FromStr;

use db::models::{
    ai_history::{AiHistoryItem, CreateAiHistoryItem, HistoryKind},
    user_profile::UserProfile,
};
use sqlx::SqlitePool;
use thiserror::Error;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::access::{AccessError, require_admin, resolve_principal};

#[derive(Debug, Error)]
pub enum HistoryError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error(transparent)]
    Access(#[from] AccessError),
}

#[derive(Clone)]
pub struct HistoryLog {
    pool: SqlitePool,
}

impl HistoryLog {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Store a new entry. The owner is trusted to be an already resolved principal.
    pub async fn append(&self, entry: &CreateAiHistoryItem) -> Result<AiHistoryItem, HistoryError> {
        let item = AiHistoryItem::create(&self.pool, entry).await?;
        debug!(
            history_id = %item.id,
            user_id = %item.user_id,
            kind = %item.kind,
            "Recorded AI interaction"
        );
        Ok(item)
    }

    /// Admins see every entry, operators only their own. Newest first.
    /// The role is read from the directory, not from the cached profile.
    pub async fn list(&self, requester: &UserProfile) -> Result<Vec<AiHistoryItem>, HistoryError> {
        let requester = resolve_principal(&self.pool, requester).await?;
        let items = if requester.is_admin() {
            AiHistoryItem::find_all(&self.pool).await?
        } else {
            AiHistoryItem::find_by_user_id(&self.pool, requester.id).await?
        };
        Ok(items)
    }

    /// Remove one entry. Unknown ids are a no-op; operators may only remove their own.
    pub async fn delete(&self, requester: &UserProfile, id: Uuid) -> Result<(), HistoryError> {
        let Some(item) = AiHistoryItem::find_by_id(&self.pool, id).await? else {
            debug!(history_id = %id, "Delete of unknown history entry ignored");
            return Ok(());
        };

        if item.user_id != requester.id {
            require_admin(&self.pool, requester, "deleting another user's history").await?;
        }

        AiHistoryItem::delete(&self.pool, id).await?;
        Ok(())
    }

    /// Wipe the whole log. Admin only.
    pub async fn clear(&self, requester: &UserProfile) -> Result<u64, HistoryError> {
        require_admin(&self.pool, requester, "clearing the global history").await?;
        let removed = AiHistoryItem::delete_all(&self.pool).await?;
        warn!(user_id = %requester.id, removed, "Global AI history cleared");
        Ok(removed)
    }

    pub async fn count(&self) -> Result<i64, HistoryError> {
        Ok(AiHistoryItem::count(&self.pool).await?)
    }
}

/// Kind half of the history filter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum KindFilter {
    #[default]
    All,
    Only(HistoryKind),
}

impl FromStr for KindFilter {
    type Err = strum::ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "" | "all" => Ok(KindFilter::All),
            other => other.parse().map(KindFilter::Only),
        }
    }
}

/// Client-side search and kind filter over listed entries.
#[derive(Debug, Clone, Default)]
pub struct HistoryFilter {
    pub search: Option<String>,
    pub kind: KindFilter,
}

impl HistoryFilter {
    pub fn new(search: Option<String>, kind: KindFilter) -> Self {
        Self { search, kind }
    }

    /// Case-insensitive substring over prompt or response, AND an exact kind match.
    pub fn matches(&self, item: &AiHistoryItem) -> bool {
        let kind_ok = match self.kind {
            KindFilter::All => true,
            KindFilter::Only(kind) => item.kind == kind,
        };
        if !kind_ok {
            return false;
        }

        match self.search.as_deref().map(str::to_lowercase) {
            None => true,
            Some(term) => {
                item.prompt.to_lowercase().contains(&term)
                    || item.response.to_lowercase().contains(&term)
            }
        }
    }

    pub fn apply(&self, items: Vec<AiHistoryItem>) -> Vec<AiHistoryItem> {
        let before = items.len();
        let kept: Vec<AiHistoryItem> = items.into_iter().filter(|i| self.matches(i)).collect();
        if kept.len() != before {
            info!(kept = kept.len(), total = before, "History filtered");
        }
        kept
    }
}
