use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use workix_application::{
    AuditLogEntry, AuditLogFilters, AuditLogRepository, AuditRecorder, NewAuditLogEntry,
};
use workix_core::{AppError, AppResult, UserId};
use workix_domain::SortOrder;

/// PostgreSQL-backed repository for the append-only audit log.
///
/// Serves both the append port used by mutating services and the read
/// models behind compliance views.
#[derive(Clone)]
pub struct PostgresAuditLogRepository {
    pool: PgPool,
}

impl PostgresAuditLogRepository {
    /// Creates a repository with the provided connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, FromRow)]
struct AuditEntryRow {
    id: Uuid,
    user_id: Option<Uuid>,
    action: String,
    entity_type: String,
    entity_id: Option<String>,
    changes: Option<Value>,
    ip_address: Option<String>,
    user_agent: Option<String>,
    metadata: Option<Value>,
    created_at: DateTime<Utc>,
}

const ENTRY_FILTER: &str = r#"
    WHERE ($1::UUID IS NULL OR user_id = $1)
        AND ($2::TEXT IS NULL OR action = $2)
        AND ($3::TEXT IS NULL OR entity_type = $3)
        AND ($4::TEXT IS NULL OR entity_id = $4)
        AND ($5::TIMESTAMPTZ IS NULL OR created_at >= $5)
        AND ($6::TIMESTAMPTZ IS NULL OR created_at <= $6)
"#;

#[async_trait]
impl AuditRecorder for PostgresAuditLogRepository {
    async fn append(&self, entry: NewAuditLogEntry) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO audit_log_entries
                (id, user_id, action, entity_type, entity_id, changes,
                 ip_address, user_agent, metadata, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, now())
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(entry.user_id.map(|user_id| user_id.as_uuid()))
        .bind(entry.action.as_str())
        .bind(entry.entity_type)
        .bind(entry.entity_id)
        .bind(entry.changes)
        .bind(entry.ip_address)
        .bind(entry.user_agent)
        .bind(entry.metadata)
        .execute(&self.pool)
        .await
        .map_err(|error| {
            AppError::Internal(format!("failed to append audit entry: {error}"))
        })?;

        Ok(())
    }
}

#[async_trait]
impl AuditLogRepository for PostgresAuditLogRepository {
    async fn list_entries(
        &self,
        filters: AuditLogFilters,
    ) -> AppResult<(Vec<AuditLogEntry>, u64)> {
        let order_column = filters.sort_by.as_str();
        let order_direction = match filters.sort_order {
            SortOrder::Asc => "ASC",
            SortOrder::Desc => "DESC",
        };

        let limit = filters.limit as i64;
        let offset = (filters.page.saturating_sub(1) * filters.limit) as i64;

        let list_sql = format!(
            r#"
            SELECT id, user_id, action, entity_type, entity_id, changes,
                   ip_address, user_agent, metadata, created_at
            FROM audit_log_entries
            {ENTRY_FILTER}
            ORDER BY {order_column} {order_direction}, id
            LIMIT $7 OFFSET $8
            "#
        );

        let rows = sqlx::query_as::<_, AuditEntryRow>(&list_sql)
            .bind(filters.user_id.map(|user_id| user_id.as_uuid()))
            .bind(filters.action.clone())
            .bind(filters.entity_type.clone())
            .bind(filters.entity_id.clone())
            .bind(filters.start_date)
            .bind(filters.end_date)
            .bind(limit)
            .bind(offset)
            .fetch_all(&self.pool)
            .await
            .map_err(|error| {
                AppError::Internal(format!("failed to list audit entries: {error}"))
            })?;

        let count_sql = format!("SELECT COUNT(*) FROM audit_log_entries {ENTRY_FILTER}");
        let total = sqlx::query_scalar::<_, i64>(&count_sql)
            .bind(filters.user_id.map(|user_id| user_id.as_uuid()))
            .bind(filters.action)
            .bind(filters.entity_type)
            .bind(filters.entity_id)
            .bind(filters.start_date)
            .bind(filters.end_date)
            .fetch_one(&self.pool)
            .await
            .map_err(|error| {
                AppError::Internal(format!("failed to count audit entries: {error}"))
            })?;

        let entries = rows
            .into_iter()
            .map(|row| AuditLogEntry {
                id: row.id.to_string(),
                user_id: row.user_id.map(UserId::from_uuid),
                action: row.action,
                entity_type: row.entity_type,
                entity_id: row.entity_id,
                changes: row.changes,
                ip_address: row.ip_address,
                user_agent: row.user_agent,
                metadata: row.metadata,
                created_at: row.created_at,
            })
            .collect();

        Ok((entries, total.max(0) as u64))
    }

    async fn distinct_action_types(&self) -> AppResult<Vec<String>> {
        sqlx::query_scalar::<_, String>(
            "SELECT DISTINCT action FROM audit_log_entries ORDER BY action",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|error| {
            AppError::Internal(format!("failed to list audit action types: {error}"))
        })
    }

    async fn distinct_entity_types(&self) -> AppResult<Vec<String>> {
        sqlx::query_scalar::<_, String>(
            "SELECT DISTINCT entity_type FROM audit_log_entries ORDER BY entity_type",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|error| {
            AppError::Internal(format!("failed to list audit entity types: {error}"))
        })
    }
}
