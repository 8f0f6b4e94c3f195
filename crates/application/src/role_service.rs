use std::sync::Arc;

use chrono::Utc;
use serde_json::{Map, Value};
use workix_core::{AppError, AppResult};
use workix_domain::{AuditAction, Role, RoleId, validate_role_level};

use crate::rbac_ports::{
    ActorContext, AuditRecorder, NewAuditLogEntry, NewRoleInput, RoleRepository, RoleUpdate,
};

mod assignments;


/// Application service managing roles and user-role assignments.
#[derive(Clone)]
pub struct RoleService {
    repository: Arc<dyn RoleRepository>,
    audit: Arc<dyn AuditRecorder>,
}

impl RoleService {
    /// Creates a new service from required dependencies.
    #[must_use]
    pub fn new(repository: Arc<dyn RoleRepository>, audit: Arc<dyn AuditRecorder>) -> Self {
        Self { repository, audit }
    }

    /// Creates a role; `Conflict` when the name is already taken.
    ///
    /// Roles created through this path are never system roles.
    pub async fn create(&self, context: &ActorContext, input: NewRoleInput) -> AppResult<Role> {
        let role = Role::new(
            RoleId::new(),
            input.name,
            input.description,
            input.level.unwrap_or(0),
            true,
            false,
            Vec::new(),
            Utc::now(),
        )?;

        self.repository.insert_role(role.clone()).await?;

        let mut changes = Map::new();
        changes.insert("name".to_owned(), Value::from(role.name()));
        changes.insert("level".to_owned(), Value::from(role.level()));

        self.audit
            .append(NewAuditLogEntry {
                user_id: context.actor,
                action: AuditAction::RoleCreated,
                entity_type: "role".to_owned(),
                entity_id: Some(role.id().to_string()),
                changes: Some(Value::Object(changes)),
                ip_address: context.ip_address.clone(),
                user_agent: context.user_agent.clone(),
                metadata: None,
            })
            .await?;

        Ok(role)
    }

    /// Lists roles, skipping inactive ones unless requested.
    pub async fn find_all(&self, include_inactive: bool) -> AppResult<Vec<Role>> {
        self.repository.list_roles(include_inactive).await
    }

    /// Finds a role by unique name.
    pub async fn find_by_name(&self, name: &str) -> AppResult<Option<Role>> {
        self.repository.find_role_by_name(name).await
    }

    /// Finds a role by identifier; `NotFound` when absent.
    pub async fn find_by_id(&self, role_id: RoleId) -> AppResult<Role> {
        self.repository
            .find_role_by_id(role_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("role '{role_id}' was not found")))
    }

    /// Applies a partial update to a role.
    ///
    /// `Conflict` when changing the level of a system role or when a name
    /// change collides with an existing role.
    pub async fn update(
        &self,
        context: &ActorContext,
        role_id: RoleId,
        update: RoleUpdate,
    ) -> AppResult<Role> {
        let role = self.find_by_id(role_id).await?;

        if role.is_system() && update.level.is_some() {
            return Err(AppError::Conflict(format!(
                "cannot change the level of system role '{}'",
                role.name()
            )));
        }

        if let Some(level) = update.level {
            validate_role_level(level)?;
        }

        let changes = role_update_changes(&update);
        let updated = self.repository.update_role(role_id, update).await?;

        self.audit
            .append(NewAuditLogEntry {
                user_id: context.actor,
                action: AuditAction::RoleUpdated,
                entity_type: "role".to_owned(),
                entity_id: Some(role_id.to_string()),
                changes,
                ip_address: context.ip_address.clone(),
                user_agent: context.user_agent.clone(),
                metadata: None,
            })
            .await?;

        Ok(updated)
    }

    /// Deletes a role; `Conflict` for system roles, `NotFound` when absent.
    pub async fn delete(&self, context: &ActorContext, role_id: RoleId) -> AppResult<()> {
        let role = self.find_by_id(role_id).await?;

        if role.is_system() {
            return Err(AppError::Conflict(format!(
                "cannot delete system role '{}'",
                role.name()
            )));
        }

        self.repository.delete_role(role_id).await?;

        self.audit
            .append(NewAuditLogEntry {
                user_id: context.actor,
                action: AuditAction::RoleDeleted,
                entity_type: "role".to_owned(),
                entity_id: Some(role_id.to_string()),
                changes: None,
                ip_address: context.ip_address.clone(),
                user_agent: context.user_agent.clone(),
                metadata: None,
            })
            .await
    }
}

fn role_update_changes(update: &RoleUpdate) -> Option<Value> {
    let mut changes = Map::new();

    if let Some(name) = &update.name {
        changes.insert("name".to_owned(), Value::from(name.as_str()));
    }
    if let Some(description) = &update.description {
        changes.insert("description".to_owned(), Value::from(description.as_str()));
    }
    if let Some(level) = update.level {
        changes.insert("level".to_owned(), Value::from(level));
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
