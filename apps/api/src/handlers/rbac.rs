use axum::Json;
use axum::extract::{Extension, Path, Query, State};
use axum::http::StatusCode;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use workix_application::ActorContext;
use workix_core::{AppError, AuthenticatedUser, UserId};

use crate::dto::{
    AssignRoleRequest, AuditLogPageResponse, CreateRoleRequest, PermissionResponse,
    RegisterPermissionRequest, RoleAssignmentResponse, RoleResponse, UpdatePermissionRequest,
    UpdateRoleRequest, UserMaxLevelResponse,
};
use crate::error::ApiResult;
use crate::state::AppState;

mod assignments;
mod audit;
mod permissions;
mod roles;

pub use assignments::{
    assign_role_handler, list_user_roles_handler, my_permissions_handler, my_roles_handler,
    remove_role_handler, user_max_level_handler, user_permissions_handler,
};
pub use audit::list_audit_logs_handler;
pub use permissions::{
    delete_permission_handler, grant_permission_handler, list_permissions_handler,
    register_permission_handler, resource_permissions_handler, revoke_permission_handler,
    update_permission_handler,
};
pub use roles::{
    create_role_handler, delete_role_handler, get_role_handler, list_roles_handler,
    update_role_handler,
};

#[derive(Debug, serde::Deserialize)]
pub struct ListQuery {
    pub include_inactive: Option<bool>,
}

fn parse_timestamp(value: &str) -> Result<DateTime<Utc>, AppError> {
    DateTime::parse_from_rfc3339(value)
        .map(|parsed| parsed.with_timezone(&Utc))
        .map_err(|error| {
            AppError::Validation(format!("invalid RFC3339 timestamp '{value}': {error}"))
        })
}

fn parse_user_id(value: &str) -> Result<UserId, AppError> {
    Uuid::parse_str(value)
        .map(UserId::from_uuid)
        .map_err(|error| AppError::Validation(format!("invalid user id '{value}': {error}")))
}
