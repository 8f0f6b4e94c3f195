use std::collections::HashSet;
use std::sync::Arc;

use chrono::Utc;
use serde_json::{Map, Value};
use workix_core::{AppError, AppResult, UserId};
use workix_domain::{AuditAction, Permission, PermissionId, PermissionName, RoleId};

use crate::rbac_ports::{
    ActorContext, AuditRecorder, NewAuditLogEntry, NewPermissionInput, PermissionRepository,
    PermissionUpdate,
};
use crate::role_service::RoleService;

#[cfg(test)]
mod tests;

/// Application service managing permissions and role-permission grants.
///
/// User-facing checks resolve the user's active roles through the role
/// service and linear-scan the attached permission sets.
#[derive(Clone)]
pub struct PermissionService {
    repository: Arc<dyn PermissionRepository>,
    role_service: RoleService,
    audit: Arc<dyn AuditRecorder>,
}

impl PermissionService {
    /// Creates a new service from required dependencies.
    #[must_use]
    pub fn new(
        repository: Arc<dyn PermissionRepository>,
        role_service: RoleService,
        audit: Arc<dyn AuditRecorder>,
    ) -> Self {
        Self {
            repository,
            role_service,
            audit,
        }
    }

    /// Registers a permission; `Conflict` when the name is already taken.
    pub async fn register(
        &self,
        context: &ActorContext,
        input: NewPermissionInput,
    ) -> AppResult<Permission> {
        let name = PermissionName::new(input.name)?;
        let permission = Permission::new(
            PermissionId::new(),
            name,
            input.description,
            true,
            Utc::now(),
        );

        self.repository
            .insert_permission(permission.clone())
            .await?;

        let mut changes = Map::new();
        changes.insert(
            "name".to_owned(),
            Value::from(permission.name().as_str()),
        );

        self.audit
            .append(NewAuditLogEntry {
                user_id: context.actor,
                action: AuditAction::PermissionRegistered,
                entity_type: "permission".to_owned(),
                entity_id: Some(permission.id().to_string()),
                changes: Some(Value::Object(changes)),
                ip_address: context.ip_address.clone(),
                user_agent: context.user_agent.clone(),
                metadata: None,
            })
            .await?;

        Ok(permission)
    }

    /// Lists permissions, skipping inactive ones unless requested.
    pub async fn find_all(&self, include_inactive: bool) -> AppResult<Vec<Permission>> {
        self.repository.list_permissions(include_inactive).await
    }

    /// Finds a permission by unique name.
    pub async fn find_by_name(&self, name: &str) -> AppResult<Option<Permission>> {
        self.repository.find_permission_by_name(name).await
    }

    /// Finds a permission by identifier; `NotFound` when absent.
    pub async fn find_by_id(&self, id: PermissionId) -> AppResult<Permission> {
        self.repository
            .find_permission_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("permission '{id}' was not found")))
    }

    /// Lists active permissions declared for one resource.
    pub async fn resource_permissions(&self, resource: &str) -> AppResult<Vec<Permission>> {
        self.repository.list_resource_permissions(resource).await
    }

    /// Attaches a permission to a role.
    ///
    /// `NotFound` when either side is absent; idempotent when the grant
    /// already exists.
    pub async fn grant_to_role(
        &self,
        context: &ActorContext,
        role_id: RoleId,
        permission_id: PermissionId,
    ) -> AppResult<()> {
        let role = self.role_service.find_by_id(role_id).await?;
        let permission = self.find_by_id(permission_id).await?;

        self.repository.grant_to_role(role_id, permission_id).await?;

        let mut changes = Map::new();
        changes.insert("role_name".to_owned(), Value::from(role.name()));
        changes.insert(
            "permission_name".to_owned(),
            Value::from(permission.name().as_str()),
        );

        self.audit
            .append(NewAuditLogEntry {
                user_id: context.actor,
                action: AuditAction::PermissionGranted,
                entity_type: "role".to_owned(),
                entity_id: Some(role_id.to_string()),
                changes: Some(Value::Object(changes)),
                ip_address: context.ip_address.clone(),
                user_agent: context.user_agent.clone(),
                metadata: None,
            })
            .await
    }

    /// Detaches a permission from a role; `NotFound` when the role is absent.
    pub async fn revoke_from_role(
        &self,
        context: &ActorContext,
        role_id: RoleId,
        permission_id: PermissionId,
    ) -> AppResult<()> {
        let role = self.role_service.find_by_id(role_id).await?;

        self.repository
            .revoke_from_role(role_id, permission_id)
            .await?;

        let mut changes = Map::new();
        changes.insert("role_name".to_owned(), Value::from(role.name()));
        changes.insert(
            "permission_id".to_owned(),
            Value::from(permission_id.to_string()),
        );

        self.audit
            .append(NewAuditLogEntry {
                user_id: context.actor,
                action: AuditAction::PermissionRevoked,
                entity_type: "role".to_owned(),
                entity_id: Some(role_id.to_string()),
                changes: Some(Value::Object(changes)),
                ip_address: context.ip_address.clone(),
                user_agent: context.user_agent.clone(),
                metadata: None,
            })
            .await
    }

    /// Returns whether the user holds a permission with the given name
    /// through any active role.
    pub async fn has_permission(&self, user_id: UserId, name: &str) -> AppResult<bool> {
        let roles = self.role_service.user_roles(user_id).await?;

        Ok(roles.iter().any(|role| role.has_permission_named(name)))
    }

    /// Returns whether the user holds a permission for the resource/action
    /// pair through any active role.
    pub async fn has_resource_action(
        &self,
        user_id: UserId,
        resource: &str,
        action: &str,
    ) -> AppResult<bool> {
        let roles = self.role_service.user_roles(user_id).await?;

        Ok(roles
            .iter()
            .any(|role| role.has_resource_action(resource, action)))
    }

    /// Returns the union of permissions across the user's active roles.
    ///
    /// Deduplicated by permission id, so structurally-equal rows loaded by
    /// separate queries cannot produce duplicates.
    pub async fn user_permissions(&self, user_id: UserId) -> AppResult<Vec<Permission>> {
        let roles = self.role_service.user_roles(user_id).await?;

        let mut seen: HashSet<PermissionId> = HashSet::new();
        let mut permissions = Vec::new();

        for role in roles {
            for permission in role.permissions() {
                if seen.insert(permission.id()) {
                    permissions.push(permission.clone());
                }
            }
        }

        Ok(permissions)
    }

    /// Applies a partial update to a permission; `NotFound` when absent.
    pub async fn update(
        &self,
        context: &ActorContext,
        id: PermissionId,
        update: PermissionUpdate,
    ) -> AppResult<Permission> {
        self.find_by_id(id).await?;

        let changes = permission_update_changes(&update);
        let updated = self.repository.update_permission(id, update).await?;

        self.audit
            .append(NewAuditLogEntry {
                user_id: context.actor,
                action: AuditAction::PermissionUpdated,
                entity_type: "permission".to_owned(),
                entity_id: Some(id.to_string()),
                changes,
                ip_address: context.ip_address.clone(),
                user_agent: context.user_agent.clone(),
                metadata: None,
            })
            .await?;

        Ok(updated)
    }

    /// Deletes a permission and its grants; `NotFound` when absent.
    pub async fn delete(&self, context: &ActorContext, id: PermissionId) -> AppResult<()> {
        let permission = self.find_by_id(id).await?;

        self.repository.delete_permission(id).await?;

        let mut changes = Map::new();
        changes.insert(
            "name".to_owned(),
            Value::from(permission.name().as_str()),
        );

        self.audit
            .append(NewAuditLogEntry {
                user_id: context.actor,
                action: AuditAction::PermissionDeleted,
                entity_type: "permission".to_owned(),
                entity_id: Some(id.to_string()),
                changes: Some(Value::Object(changes)),
                ip_address: context.ip_address.clone(),
                user_agent: context.user_agent.clone(),
                metadata: None,
            })
            .await
    }
}

fn permission_update_changes(update: &PermissionUpdate) -> Option<Value> {
    let mut changes = Map::new();

    if let Some(name) = &update.name {
        changes.insert("name".to_owned(), Value::from(name.as_str()));
    }
    if let Some(description) = &update.description {
        changes.insert("description".to_owned(), Value::from(description.as_str()));
    }
    if let Some(is_active) = update.is_active {
        changes.insert("is_active".to_owned(), Value::from(is_active));
    }

    if changes.is_empty() {
        None
    } else {
        Some(Value::Object(changes))
    }
}
