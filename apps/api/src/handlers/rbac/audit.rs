use super::*;

use std::str::FromStr;

use workix_application::AuditLogFilters;
use workix_domain::{AuditSortKey, SortOrder};

#[derive(Debug, serde::Deserialize)]
pub struct AuditLogQueryParams {
    pub user_id: Option<String>,
    pub action: Option<String>,
    pub entity_type: Option<String>,
    pub entity_id: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub sort_by: Option<String>,
    pub sort_order: Option<String>,
    pub page: Option<usize>,
    pub limit: Option<usize>,
}

pub async fn list_audit_logs_handler(
    State(state): State<AppState>,
    Query(query): Query<AuditLogQueryParams>,
) -> ApiResult<Json<AuditLogPageResponse>> {
    let defaults = AuditLogFilters::default();

    let filters = AuditLogFilters {
        user_id: query
            .user_id
            .as_deref()
            .map(parse_user_id)
            .transpose()?,
        action: query.action,
        entity_type: query.entity_type,
        entity_id: query.entity_id,
        start_date: query
            .start_date
            .as_deref()
            .map(parse_timestamp)
            .transpose()?,
        end_date: query
            .end_date
            .as_deref()
            .map(parse_timestamp)
            .transpose()?,
        sort_by: query
            .sort_by
            .as_deref()
            .map(AuditSortKey::from_str)
            .transpose()?
            .unwrap_or(defaults.sort_by),
        sort_order: query
            .sort_order
            .as_deref()
            .map(SortOrder::from_str)
            .transpose()?
            .unwrap_or(defaults.sort_order),
        page: query.page.unwrap_or(defaults.page),
        limit: query.limit.unwrap_or(defaults.limit),
    };

    let page = state.audit_log_service.list(filters).await?;

    Ok(Json(AuditLogPageResponse::from(page)))
}
