//! Startup check that the store carries the expected schema.

use sqlx::SqlitePool;
use thiserror::Error;
use tracing::{info, warn};

/// Tables the services read and write
pub const REQUIRED_TABLES: [&str; 2] = ["profiles", "ai_history"];

#[derive(Debug, Error)]
pub enum DatabaseValidationError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

pub struct DatabaseValidator {
    pool: SqlitePool,
}

impl DatabaseValidator {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn validate(&self) -> Result<ValidationReport, DatabaseValidationError> {
        let migrations_applied = if self.table_exists("_sqlx_migrations").await? {
            sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM _sqlx_migrations WHERE success = 1")
                .fetch_one(&self.pool)
                .await?
        } else {
            0
        };

        let mut missing_tables = Vec::new();
        for table in REQUIRED_TABLES {
            if !self.table_exists(table).await? {
                missing_tables.push(table.to_string());
            }
        }

        let report = ValidationReport {
            migrations_applied,
            missing_tables,
        };
        if report.is_ok() {
            info!(migrations_applied, "Database schema OK");
        } else {
            warn!("{}", report.summary());
        }
        Ok(report)
    }

    async fn table_exists(&self, name: &str) -> Result<bool, sqlx::Error> {
        let count = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = ?",
        )
        .bind(name)
        .fetch_one(&self.pool)
        .await?;
        Ok(count > 0)
    }
}

#[derive(Debug, Clone)]
pub struct ValidationReport {
    pub migrations_applied: i64,
    pub missing_tables: Vec<String>,
}

impl ValidationReport {
    pub fn is_ok(&self) -> bool {
        self.migrations_applied > 0 && self.missing_tables.is_empty()
    }

    pub fn summary(&self) -> String {
        if self.is_ok() {
            format!("{} migrations applied", self.migrations_applied)
        } else {
            format!(
                "schema incomplete: {} migrations applied, missing tables [{}]",
                self.migrations_applied,
                self.missing_tables.join(", ")
            )
        }
    }
}
