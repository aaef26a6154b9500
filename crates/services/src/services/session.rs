//! Session store: who is logged in on this client.

use db::models::user_profile::UserProfile;
use sqlx::SqlitePool;
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::{info, warn};
use utils::local_store::{LocalStore, LocalStoreError};

/// Local storage key of the current principal
pub const CURRENT_USER_KEY: &str = "op_user";

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("identity directory unavailable: {0}")]
    Directory(#[from] sqlx::Error),
    #[error("failed to persist session: {0}")]
    Storage(#[from] LocalStoreError),
}

/// Owns the "current principal". At most one per client instance.
pub struct SessionStore {
    pool: SqlitePool,
    local: LocalStore,
    current: RwLock<Option<UserProfile>>,
}

impl SessionStore {
    pub fn new(pool: SqlitePool, local: LocalStore) -> Self {
        Self {
            pool,
            local,
            current: RwLock::new(None),
        }
    }

    /// Resolve `email` to a principal, creating an operator on first sight,
    /// and make it current. No credential is checked here.
    pub async fn login(&self, email: &str) -> Result<UserProfile, SessionError> {
        let profile = UserProfile::find_or_create(&self.pool, email).await?;

        let mut current = self.current.write().await;
        self.local.set(CURRENT_USER_KEY, &profile)?;
        *current = Some(profile.clone());

        info!(user_id = %profile.id, role = %profile.role, "Logged in");
        Ok(profile)
    }

    /// Cached principal, else the persisted one. Never touches the directory.
    pub async fn get_current_principal(&self) -> Option<UserProfile> {
        if let Some(profile) = self.current.read().await.as_ref() {
            return Some(profile.clone());
        }

        let mut current = self.current.write().await;
        if current.is_none() {
            match self.local.get::<UserProfile>(CURRENT_USER_KEY) {
                Ok(saved) => *current = saved,
                Err(e) => warn!("Ignoring unreadable saved session: {}", e),
            }
        }
        current.clone()
    }

    /// Re-read the current principal from the directory. A principal that
    /// was deleted is logged out; a changed record replaces the cached one.
    pub async fn refresh_current_principal(&self) -> Result<Option<UserProfile>, SessionError> {
        let Some(cached) = self.get_current_principal().await else {
            return Ok(None);
        };

        let Some(fresh) = UserProfile::find_by_id(&self.pool, cached.id).await? else {
            info!(user_id = %cached.id, "Current principal no longer exists");
            self.logout().await;
            return Ok(None);
        };

        if fresh != cached {
            let mut current = self.current.write().await;
            self.local.set(CURRENT_USER_KEY, &fresh)?;
            *current = Some(fresh.clone());
            info!(user_id = %fresh.id, role = %fresh.role, "Current principal refreshed");
        }
        Ok(Some(fresh))
    }

    /// Forget the current principal. Idempotent and infallible.
    pub async fn logout(&self) {
        let mut current = self.current.write().await;
        if let Some(profile) = current.take() {
            info!(user_id = %profile.id, "Logged out");
        }
        if let Err(e) = self.local.remove(CURRENT_USER_KEY) {
            warn!("Failed to remove saved session: {}", e);
        }
    }
}
