//! Admin directory: principal management and usage statistics.

use std::collections::BTreeMap;

use db::models::{
    ai_history::{AiHistoryItem, HistoryKind},
    user_profile::{UserProfile, UserRole},
};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use thiserror::Error;
use tracing::info;
use ts_rs::TS;
use uuid::Uuid;

use super::access::{AccessError, require_admin};

#[derive(Debug, Error)]
pub enum AdminError {
    #[error(transparent)]
    Access(#[from] AccessError),
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Usage summary over the whole history
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
pub struct UsageStats {
    pub total_requests: i64,
    pub active_users: i64,
    /// Every kind is present, zero when unused
    #[ts(type = "Record<HistoryKind, number>")]
    pub counts_by_kind: BTreeMap<HistoryKind, i64>,
}

#[derive(Clone)]
pub struct AdminDirectory {
    pool: SqlitePool,
}

impl AdminDirectory {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// All principals, newest first.
    pub async fn list_principals(&self, actor: &UserProfile) -> Result<Vec<UserProfile>, AdminError> {
        require_admin(&self.pool, actor, "listing principals").await?;
        Ok(UserProfile::find_all(&self.pool).await?)
    }

    /// Grant admin. Unknown ids and existing admins are left as they are.
    pub async fn promote(&self, actor: &UserProfile, id: Uuid) -> Result<(), AdminError> {
        require_admin(&self.pool, actor, "promoting principals").await?;

        match UserProfile::find_by_id(&self.pool, id).await? {
            Some(target) if !target.is_admin() => {
                UserProfile::set_role(&self.pool, id, UserRole::Admin).await?;
                info!(actor = %actor.id, target = %id, email = %target.email, "Principal promoted");
            }
            Some(_) => {}
            None => info!(target = %id, "Promote skipped, principal not found"),
        }
        Ok(())
    }

    /// Remove a principal. Their history entries stay.
    pub async fn delete_principal(&self, actor: &UserProfile, id: Uuid) -> Result<(), AdminError> {
        require_admin(&self.pool, actor, "deleting principals").await?;

        let removed = UserProfile::delete(&self.pool, id).await?;
        info!(actor = %actor.id, target = %id, removed, "Principal deleted");
        Ok(())
    }

    pub async fn compute_stats(&self, actor: &UserProfile) -> Result<UsageStats, AdminError> {
        require_admin(&self.pool, actor, "viewing usage statistics").await?;

        let mut counts_by_kind: BTreeMap<HistoryKind, i64> =
            HistoryKind::ALL.iter().map(|k| (*k, 0)).collect();
        for (kind, count) in AiHistoryItem::count_by_kind(&self.pool).await? {
            counts_by_kind.insert(kind, count);
        }

        Ok(UsageStats {
            total_requests: AiHistoryItem::count(&self.pool).await?,
            active_users: UserProfile::count(&self.pool).await?,
            counts_by_kind,
        })
    }
}
