use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqlitePool, Type};
use strum_macros::{Display, EnumString};
use ts_rs::TS;
use uuid::Uuid;

/// Privilege level of a principal. There are exactly two.
#[derive(
    Debug, Clone, Copy, Type, Serialize, Deserialize, PartialEq, Eq, TS, EnumString, Display, Default,
)]
#[sqlx(type_name = "user_role", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum UserRole {
    Admin,
    #[default]
    Operator,
}

/// An authenticated identity (row of `profiles`)
#[derive(Debug, Clone, FromRow, Serialize, Deserialize, PartialEq, TS)]
pub struct UserProfile {
    pub id: Uuid,
    pub email: String,
    pub role: UserRole,
    pub created_at: DateTime<Utc>,
}

impl UserProfile {
    pub fn is_admin(&self) -> bool {
        self.role == UserRole::Admin
    }

    pub async fn find_by_id(pool: &SqlitePool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, UserProfile>(
            r#"SELECT id, email, role, created_at
            FROM profiles
            WHERE id = $1"#,
        )
        .bind(id)
        .fetch_optional(pool)
        .await
    }

    /// Exact, case-sensitive match.
    pub async fn find_by_email(
        pool: &SqlitePool,
        email: &str,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, UserProfile>(
            r#"SELECT id, email, role, created_at
            FROM profiles
            WHERE email = $1"#,
        )
        .bind(email)
        .fetch_optional(pool)
        .await
    }

    pub async fn create(
        pool: &SqlitePool,
        email: &str,
        role: UserRole,
    ) -> Result<Self, sqlx::Error> {
        let id = Uuid::new_v4();
        sqlx::query_as::<_, UserProfile>(
            r#"INSERT INTO profiles (id, email, role)
            VALUES ($1, $2, $3)
            RETURNING id, email, role, created_at"#,
        )
        .bind(id)
        .bind(email)
        .bind(role)
        .fetch_one(pool)
        .await
    }

    /// Insert the email if unseen, then return the stored row either way.
    pub async fn find_or_create(pool: &SqlitePool, email: &str) -> Result<Self, sqlx::Error> {
        sqlx::query(
            r#"INSERT INTO profiles (id, email, role)
            VALUES ($1, $2, $3)
            ON CONFLICT(email) DO NOTHING"#,
        )
        .bind(Uuid::new_v4())
        .bind(email)
        .bind(UserRole::Operator)
        .execute(pool)
        .await?;

        Self::find_by_email(pool, email)
            .await?
            .ok_or(sqlx::Error::RowNotFound)
    }

    /// All principals, newest first
    pub async fn find_all(pool: &SqlitePool) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, UserProfile>(
            r#"SELECT id, email, role, created_at
            FROM profiles
            ORDER BY created_at DESC, rowid DESC"#,
        )
        .fetch_all(pool)
        .await
    }

    pub async fn set_role(
        pool: &SqlitePool,
        id: Uuid,
        role: UserRole,
    ) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("UPDATE profiles SET role = $1 WHERE id = $2")
            .bind(role)
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected())
    }

    pub async fn delete(pool: &SqlitePool, id: Uuid) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM profiles WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected())
    }

    pub async fn count(pool: &SqlitePool) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM profiles")
            .fetch_one(pool)
            .await
    }
}
