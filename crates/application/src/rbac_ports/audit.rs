use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use workix_core::{AppResult, UserId};
use workix_domain::{AuditAction, AuditSortKey, SortOrder};

/// Request-scoped actor metadata captured for the audit trail.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ActorContext {
    /// Acting user, when the request carries an identity.
    pub actor: Option<UserId>,
    /// Client IP address as reported by the edge.
    pub ip_address: Option<String>,
    /// Client user agent string.
    pub user_agent: Option<String>,
}

impl ActorContext {
    /// Creates a context for a known acting user.
    #[must_use]
    pub fn for_actor(actor: UserId) -> Self {
        Self {
            actor: Some(actor),
            ip_address: None,
            user_agent: None,
        }
    }
}

/// Payload for one append-only audit record.
#[derive(Debug, Clone, PartialEq)]
pub struct NewAuditLogEntry {
    /// Acting user, when known.
    pub user_id: Option<UserId>,
    /// Stable action identifier.
    pub action: AuditAction,
    /// Entity kind targeted by the action.
    pub entity_type: String,
    /// Stable identifier of the targeted entity.
    pub entity_id: Option<String>,
    /// Structured summary of the applied change.
    pub changes: Option<Value>,
    /// Client IP address captured from the request.
    pub ip_address: Option<String>,
    /// Client user agent captured from the request.
    pub user_agent: Option<String>,
    /// Additional structured context.
    pub metadata: Option<Value>,
}

/// Port for persisting append-only audit records.
#[async_trait]
pub trait AuditRecorder: Send + Sync {
    /// Appends a single audit record.
    async fn append(&self, entry: NewAuditLogEntry) -> AppResult<()>;
}

/// Audit log entry projection for compliance views.
#[derive(Debug, Clone, PartialEq)]
pub struct AuditLogEntry {
    /// Stable entry identifier.
    pub id: String,
    /// Acting user, when recorded.
    pub user_id: Option<UserId>,
    /// Stable action identifier.
    pub action: String,
    /// Entity kind targeted by the action.
    pub entity_type: String,
    /// Stable identifier of the targeted entity.
    pub entity_id: Option<String>,
    /// Structured summary of the applied change.
    pub changes: Option<Value>,
    /// Client IP address captured from the request.
    pub ip_address: Option<String>,
    /// Client user agent captured from the request.
    pub user_agent: Option<String>,
    /// Additional structured context.
    pub metadata: Option<Value>,
    /// Entry timestamp.
    pub created_at: DateTime<Utc>,
}

/// Query parameters for audit log listings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuditLogFilters {
    /// Optional acting-user filter.
    pub user_id: Option<UserId>,
    /// Optional action filter.
    pub action: Option<String>,
    /// Optional entity kind filter.
    pub entity_type: Option<String>,
    /// Optional entity identifier filter.
    pub entity_id: Option<String>,
    /// Inclusive lower bound on the entry timestamp.
    pub start_date: Option<DateTime<Utc>>,
    /// Inclusive upper bound on the entry timestamp.
    pub end_date: Option<DateTime<Utc>>,
    /// Sort column.
    pub sort_by: AuditSortKey,
    /// Sort direction.
    pub sort_order: SortOrder,
    /// 1-based page number.
    pub page: usize,
    /// Maximum rows per page.
    pub limit: usize,
}

impl Default for AuditLogFilters {
    fn default() -> Self {
        Self {
            user_id: None,
            action: None,
            entity_type: None,
            entity_id: None,
            start_date: None,
            end_date: None,
            sort_by: AuditSortKey::CreatedAt,
            sort_order: SortOrder::Desc,
            page: 1,
            limit: 50,
        }
    }
}

/// One page of audit log entries plus filter metadata for admin views.
#[derive(Debug, Clone, PartialEq)]
pub struct AuditLogPage {
    /// Entries matching the filters, in requested order.
    pub entries: Vec<AuditLogEntry>,
    /// Total matching entries across all pages.
    pub total: u64,
    /// 1-based page number served.
    pub page: usize,
    /// Maximum rows per page.
    pub limit: usize,
    /// Total number of pages.
    pub total_pages: u64,
    /// Distinct action identifiers across all history.
    pub action_types: Vec<String>,
    /// Distinct entity kinds across all history.
    pub entity_types: Vec<String>,
}
