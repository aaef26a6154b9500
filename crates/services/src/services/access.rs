//! Privilege checks for admin-only operations.
//!
//! The acting principal's role is re-read from the directory, so a cached
//! profile that was demoted or deleted loses its privileges immediately.

use db::models::user_profile::UserProfile;
use sqlx::SqlitePool;
use thiserror::Error;
use tracing::warn;

#[derive(Debug, Error)]
pub enum AccessError {
    #[error("permission denied: {0}")]
    PermissionDenied(String),
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Fresh directory record of `actor`. A principal removed from the
/// directory has no rights left.
pub async fn resolve_principal(
    pool: &SqlitePool,
    actor: &UserProfile,
) -> Result<UserProfile, AccessError> {
    match UserProfile::find_by_id(pool, actor.id).await? {
        Some(current) => Ok(current),
        None => {
            warn!(user_id = %actor.id, "Rejected request from a deleted principal");
            Err(AccessError::PermissionDenied(
                "principal no longer exists".to_string(),
            ))
        }
    }
}

/// Fresh directory record of `actor`, only if it is an admin.
pub async fn require_admin(
    pool: &SqlitePool,
    actor: &UserProfile,
    action: &str,
) -> Result<UserProfile, AccessError> {
    let current = resolve_principal(pool, actor).await?;
    if current.is_admin() {
        return Ok(current);
    }

    warn!(user_id = %actor.id, action, "Rejected non-admin request");
    Err(AccessError::PermissionDenied(format!(
        "{action} requires an admin account"
    )))
}
