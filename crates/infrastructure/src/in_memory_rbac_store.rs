use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

use workix_application::{
    AuditLogEntry, AuditLogFilters, AuditLogRepository, AuditRecorder, NewAuditLogEntry,
    PermissionRepository, PermissionUpdate, RoleRepository, RoleUpdate, UserRoleBinding,
};
use workix_core::{AppError, AppResult, UserId};
use workix_domain::{
    AuditSortKey, Permission, PermissionId, Role, RoleAssignment, RoleId, SortOrder,
};

#[cfg(test)]
mod tests;

/// In-memory implementation of every RBAC port.
///
/// A rebuildable cache for tests and local development; the relational
/// store stays the source of truth in deployments.
#[derive(Debug, Default)]
pub struct InMemoryRbacStore {
    roles: RwLock<HashMap<RoleId, Role>>,
    permissions: RwLock<HashMap<PermissionId, Permission>>,
    grants: RwLock<HashMap<RoleId, HashSet<PermissionId>>>,
    assignments: RwLock<Vec<RoleAssignment>>,
    audit_entries: RwLock<Vec<AuditLogEntry>>,
}

impl InMemoryRbacStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    async fn attach_permissions(&self, role: Role) -> Role {
        let grants = self.grants.read().await;
        let permissions = self.permissions.read().await;

        let mut attached: Vec<Permission> = grants
            .get(&role.id())
            .map(|granted| {
                granted
                    .iter()
                    .filter_map(|permission_id| permissions.get(permission_id).cloned())
                    .collect()
            })
            .unwrap_or_default();
        attached.sort_by(|left, right| left.name().as_str().cmp(right.name().as_str()));

        role.with_permissions(attached)
    }
}

#[async_trait]
impl RoleRepository for InMemoryRbacStore {
    async fn insert_role(&self, role: Role) -> AppResult<()> {
        let mut roles = self.roles.write().await;

        if roles.values().any(|stored| stored.name() == role.name()) {
            return Err(AppError::Conflict(format!(
                "role '{}' already exists",
                role.name()
            )));
        }

        roles.insert(role.id(), role);
        Ok(())
    }

    async fn list_roles(&self, include_inactive: bool) -> AppResult<Vec<Role>> {
        let stored: Vec<Role> = {
            let roles = self.roles.read().await;
            roles
                .values()
                .filter(|role| include_inactive || role.is_active())
                .cloned()
                .collect()
        };

        let mut resolved = Vec::with_capacity(stored.len());
        for role in stored {
            resolved.push(self.attach_permissions(role).await);
        }
        resolved.sort_by(|left, right| {
            right
                .level()
                .cmp(&left.level())
                .then_with(|| left.name().cmp(right.name()))
        });

        Ok(resolved)
    }

    async fn find_role_by_name(&self, name: &str) -> AppResult<Option<Role>> {
        let stored = {
            let roles = self.roles.read().await;
            roles.values().find(|role| role.name() == name).cloned()
        };

        match stored {
            Some(role) => Ok(Some(self.attach_permissions(role).await)),
            None => Ok(None),
        }
    }

    async fn find_role_by_id(&self, role_id: RoleId) -> AppResult<Option<Role>> {
        let stored = {
            let roles = self.roles.read().await;
            roles.get(&role_id).cloned()
        };

        match stored {
            Some(role) => Ok(Some(self.attach_permissions(role).await)),
            None => Ok(None),
        }
    }

    async fn update_role(&self, role_id: RoleId, update: RoleUpdate) -> AppResult<Role> {
        let updated = {
            let mut roles = self.roles.write().await;

            if let Some(new_name) = &update.name
                && roles
                    .values()
                    .any(|stored| stored.id() != role_id && stored.name() == new_name.as_str())
            {
                return Err(AppError::Conflict(format!(
                    "role '{new_name}' already exists"
                )));
            }

            let Some(current) = roles.get(&role_id).cloned() else {
                return Err(AppError::NotFound(format!(
                    "role '{role_id}' was not found"
                )));
            };

            let updated = Role::new(
                current.id(),
                update.name.unwrap_or_else(|| current.name().to_owned()),
                update
                    .description
                    .or_else(|| current.description().map(str::to_owned)),
                update.level.unwrap_or_else(|| current.level()),
                update.is_active.unwrap_or_else(|| current.is_active()),
                current.is_system(),
                Vec::new(),
                current.created_at(),
            )?;

            roles.insert(role_id, updated.clone());
            updated
        };

        Ok(self.attach_permissions(updated).await)
    }

    async fn delete_role(&self, role_id: RoleId) -> AppResult<()> {
        let removed = self.roles.write().await.remove(&role_id);
        if removed.is_none() {
            return Err(AppError::NotFound(format!(
                "role '{role_id}' was not found"
            )));
        }

        self.grants.write().await.remove(&role_id);
        self.assignments
            .write()
            .await
            .retain(|assignment| assignment.role_id() != role_id);
        Ok(())
    }

    async fn insert_assignment(&self, assignment: RoleAssignment) -> AppResult<()> {
        let mut assignments = self.assignments.write().await;

        let open_ended_exists = assignments.iter().any(|stored| {
            stored.user_id() == assignment.user_id()
                && stored.role_id() == assignment.role_id()
                && stored.is_open_ended()
        });

        if open_ended_exists {
            return Err(AppError::Conflict(format!(
                "user '{}' already holds an open-ended assignment for role '{}'",
                assignment.user_id(),
                assignment.role_id()
            )));
        }

        assignments.push(assignment);
        Ok(())
    }

    async fn list_assignments_for_user(
        &self,
        user_id: UserId,
    ) -> AppResult<Vec<UserRoleBinding>> {
        let pairs: Vec<(RoleAssignment, Role)> = {
            let assignments = self.assignments.read().await;
            let roles = self.roles.read().await;

            assignments
                .iter()
                .filter(|assignment| assignment.user_id() == user_id)
                .filter_map(|assignment| {
                    roles
                        .get(&assignment.role_id())
                        .map(|role| (assignment.clone(), role.clone()))
                })
                .collect()
        };

        let mut bindings = Vec::with_capacity(pairs.len());
        for (assignment, role) in pairs {
            bindings.push(UserRoleBinding {
                assignment,
                role: self.attach_permissions(role).await,
            });
        }

        Ok(bindings)
    }

    async fn delete_assignments(&self, user_id: UserId, role_id: RoleId) -> AppResult<u64> {
        let mut assignments = self.assignments.write().await;
        let before = assignments.len();
        assignments.retain(|assignment| {
            !(assignment.user_id() == user_id && assignment.role_id() == role_id)
        });

        Ok((before - assignments.len()) as u64)
    }
}

#[async_trait]
impl PermissionRepository for InMemoryRbacStore {
    async fn insert_permission(&self, permission: Permission) -> AppResult<()> {
        let mut permissions = self.permissions.write().await;

        if permissions
            .values()
            .any(|stored| stored.name() == permission.name())
        {
            return Err(AppError::Conflict(format!(
                "permission '{}' already exists",
                permission.name()
            )));
        }

        permissions.insert(permission.id(), permission);
        Ok(())
    }

    async fn list_permissions(&self, include_inactive: bool) -> AppResult<Vec<Permission>> {
        let permissions = self.permissions.read().await;

        let mut values: Vec<Permission> = permissions
            .values()
            .filter(|permission| include_inactive || permission.is_active())
            .cloned()
            .collect();
        values.sort_by(|left, right| {
            left.resource()
                .cmp(right.resource())
                .then_with(|| left.name().as_str().cmp(right.name().as_str()))
        });

        Ok(values)
    }

    async fn find_permission_by_name(&self, name: &str) -> AppResult<Option<Permission>> {
        Ok(self
            .permissions
            .read()
            .await
            .values()
            .find(|permission| permission.name().as_str() == name)
            .cloned())
    }

    async fn find_permission_by_id(&self, id: PermissionId) -> AppResult<Option<Permission>> {
        Ok(self.permissions.read().await.get(&id).cloned())
    }

    async fn list_resource_permissions(&self, resource: &str) -> AppResult<Vec<Permission>> {
        let permissions = self.permissions.read().await;

        let mut values: Vec<Permission> = permissions
            .values()
            .filter(|permission| permission.is_active() && permission.resource() == resource)
            .cloned()
            .collect();
        values.sort_by(|left, right| left.name().as_str().cmp(right.name().as_str()));

        Ok(values)
    }

    async fn grant_to_role(&self, role_id: RoleId, permission_id: PermissionId) -> AppResult<()> {
        self.grants
            .write()
            .await
            .entry(role_id)
            .or_default()
            .insert(permission_id);
        Ok(())
    }

    async fn revoke_from_role(
        &self,
        role_id: RoleId,
        permission_id: PermissionId,
    ) -> AppResult<()> {
        if let Some(granted) = self.grants.write().await.get_mut(&role_id) {
            granted.remove(&permission_id);
        }
        Ok(())
    }

    async fn update_permission(
        &self,
        id: PermissionId,
        update: PermissionUpdate,
    ) -> AppResult<Permission> {
        let mut permissions = self.permissions.write().await;

        if let Some(new_name) = &update.name
            && permissions
                .values()
                .any(|stored| stored.id() != id && stored.name() == new_name)
        {
            return Err(AppError::Conflict(format!(
                "permission '{new_name}' already exists"
            )));
        }

        let Some(current) = permissions.get(&id).cloned() else {
            return Err(AppError::NotFound(format!(
                "permission '{id}' was not found"
            )));
        };

        let updated = Permission::new(
            current.id(),
            update.name.unwrap_or_else(|| current.name().clone()),
            update
                .description
                .or_else(|| current.description().map(str::to_owned)),
            update.is_active.unwrap_or_else(|| current.is_active()),
            current.created_at(),
        );

        permissions.insert(id, updated.clone());
        Ok(updated)
    }

    async fn delete_permission(&self, id: PermissionId) -> AppResult<()> {
        let removed = self.permissions.write().await.remove(&id);
        if removed.is_none() {
            return Err(AppError::NotFound(format!(
                "permission '{id}' was not found"
            )));
        }

        for granted in self.grants.write().await.values_mut() {
            granted.remove(&id);
        }
        Ok(())
    }
}

#[async_trait]
impl AuditRecorder for InMemoryRbacStore {
    async fn append(&self, entry: NewAuditLogEntry) -> AppResult<()> {
        self.audit_entries.write().await.push(AuditLogEntry {
            id: Uuid::new_v4().to_string(),
            user_id: entry.user_id,
            action: entry.action.as_str().to_owned(),
            entity_type: entry.entity_type,
            entity_id: entry.entity_id,
            changes: entry.changes,
            ip_address: entry.ip_address,
            user_agent: entry.user_agent,
            metadata: entry.metadata,
            created_at: Utc::now(),
        });
        Ok(())
    }
}

#[async_trait]
impl AuditLogRepository for InMemoryRbacStore {
    async fn list_entries(
        &self,
        filters: AuditLogFilters,
    ) -> AppResult<(Vec<AuditLogEntry>, u64)> {
        let entries = self.audit_entries.read().await;

        let mut matching: Vec<AuditLogEntry> = entries
            .iter()
            .filter(|entry| {
                filters
                    .user_id
                    .is_none_or(|user_id| entry.user_id == Some(user_id))
                    && filters
                        .action
                        .as_deref()
                        .is_none_or(|action| entry.action == action)
                    && filters
                        .entity_type
                        .as_deref()
                        .is_none_or(|entity_type| entry.entity_type == entity_type)
                    && filters
                        .entity_id
                        .as_deref()
                        .is_none_or(|entity_id| entry.entity_id.as_deref() == Some(entity_id))
                    && filters
                        .start_date
                        .is_none_or(|start_date| entry.created_at >= start_date)
                    && filters
                        .end_date
                        .is_none_or(|end_date| entry.created_at <= end_date)
            })
            .cloned()
            .collect();

        matching.sort_by(|left, right| {
            let ordering = match filters.sort_by {
                AuditSortKey::CreatedAt => left.created_at.cmp(&right.created_at),
                AuditSortKey::UserId => left
                    .user_id
                    .map(|user_id| user_id.to_string())
                    .cmp(&right.user_id.map(|user_id| user_id.to_string())),
                AuditSortKey::Action => left.action.cmp(&right.action),
            };

            match filters.sort_order {
                SortOrder::Asc => ordering,
                SortOrder::Desc => ordering.reverse(),
            }
        });

        let total = matching.len() as u64;
        let offset = filters.page.saturating_sub(1) * filters.limit;
        let page = matching
            .into_iter()
            .skip(offset)
            .take(filters.limit)
            .collect();

        Ok((page, total))
    }

    async fn distinct_action_types(&self) -> AppResult<Vec<String>> {
        let entries = self.audit_entries.read().await;

        let mut actions: Vec<String> =
            entries.iter().map(|entry| entry.action.clone()).collect();
        actions.sort();
        actions.dedup();
        Ok(actions)
    }

    async fn distinct_entity_types(&self) -> AppResult<Vec<String>> {
        let entries = self.audit_entries.read().await;

        let mut types: Vec<String> = entries
            .iter()
            .map(|entry| entry.entity_type.clone())
            .collect();
        types.sort();
        types.dedup();
        Ok(types)
    }
}
