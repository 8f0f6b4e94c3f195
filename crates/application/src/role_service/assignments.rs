use chrono::Utc;
use serde_json::{Map, Value};
use workix_core::{AppResult, UserId};
use workix_domain::{AssignmentId, AuditAction, Role, RoleAssignment, RoleId};

use crate::rbac_ports::{ActorContext, AssignRoleInput, NewAuditLogEntry};

use super::RoleService;

impl RoleService {
    /// Returns the user's currently-active roles with permissions loaded.
    ///
    /// Assignments whose expiry has passed are filtered out; the rows stay
    /// persisted and may become relevant again only through a new grant.
    pub async fn user_roles(&self, user_id: UserId) -> AppResult<Vec<Role>> {
        let now = Utc::now();

        Ok(self
            .repository
            .list_assignments_for_user(user_id)
            .await?
            .into_iter()
            .filter(|binding| binding.assignment.is_active_at(now))
            .map(|binding| binding.role)
            .collect())
    }

    /// Returns the highest level among the user's active assignments, 0 when
    /// none are active.
    pub async fn user_max_level(&self, user_id: UserId) -> AppResult<u16> {
        let now = Utc::now();

        Ok(self
            .repository
            .list_assignments_for_user(user_id)
            .await?
            .into_iter()
            .filter(|binding| binding.assignment.is_active_at(now))
            .map(|binding| binding.role.level())
            .max()
            .unwrap_or(0))
    }

    /// Grants a role to a user.
    ///
    /// `NotFound` when the role is absent. `Conflict` when the user already
    /// holds an open-ended assignment for the role; renewing with a fresh
    /// expiry alongside an expired or expiring grant is permitted.
    pub async fn assign_to_user(
        &self,
        context: &ActorContext,
        user_id: UserId,
        input: AssignRoleInput,
    ) -> AppResult<RoleAssignment> {
        let role = self.find_by_id(input.role_id).await?;

        let assignment = RoleAssignment::new(
            AssignmentId::new(),
            user_id,
            input.role_id,
            input.assigned_by,
            input.expires_at,
            Utc::now(),
        );

        self.repository.insert_assignment(assignment.clone()).await?;

        let mut changes = Map::new();
        changes.insert("role_name".to_owned(), Value::from(role.name()));
        changes.insert("user_id".to_owned(), Value::from(user_id.to_string()));
        if let Some(expires_at) = assignment.expires_at() {
            changes.insert("expires_at".to_owned(), Value::from(expires_at.to_rfc3339()));
        }

        self.audit
            .append(NewAuditLogEntry {
                user_id: context.actor,
                action: AuditAction::RoleAssigned,
                entity_type: "role_assignment".to_owned(),
                entity_id: Some(assignment.id().to_string()),
                changes: Some(Value::Object(changes)),
                ip_address: context.ip_address.clone(),
                user_agent: context.user_agent.clone(),
                metadata: None,
            })
            .await?;

        Ok(assignment)
    }

    /// Removes every assignment binding the user to the role.
    ///
    /// A no-op when no assignment exists, matching the grant-removal
    /// semantics of the admin console.
    pub async fn remove_from_user(
        &self,
        context: &ActorContext,
        user_id: UserId,
        role_id: RoleId,
    ) -> AppResult<()> {
        let removed = self.repository.delete_assignments(user_id, role_id).await?;

        if removed == 0 {
            return Ok(());
        }

        let mut changes = Map::new();
        changes.insert("user_id".to_owned(), Value::from(user_id.to_string()));
        changes.insert("role_id".to_owned(), Value::from(role_id.to_string()));
        changes.insert("removed".to_owned(), Value::from(removed));

        self.audit
            .append(NewAuditLogEntry {
                user_id: context.actor,
                action: AuditAction::RoleUnassigned,
                entity_type: "role_assignment".to_owned(),
                entity_id: None,
                changes: Some(Value::Object(changes)),
                ip_address: context.ip_address.clone(),
                user_agent: context.user_agent.clone(),
                metadata: None,
            })
            .await
    }

    /// Returns whether the user holds the named role through an active
    /// assignment.
    pub async fn has_role(&self, user_id: UserId, role_name: &str) -> AppResult<bool> {
        let now = Utc::now();

        Ok(self
            .repository
            .list_assignments_for_user(user_id)
            .await?
            .iter()
            .any(|binding| {
                binding.assignment.is_active_at(now) && binding.role.name() == role_name
            }))
    }

    /// Returns whether the user holds any of the named roles through an
    /// active assignment.
    pub async fn has_any_role(&self, user_id: UserId, role_names: &[String]) -> AppResult<bool> {
        let now = Utc::now();

        Ok(self
            .repository
            .list_assignments_for_user(user_id)
            .await?
            .iter()
            .any(|binding| {
                binding.assignment.is_active_at(now)
                    && role_names
                        .iter()
                        .any(|name| name.as_str() == binding.role.name())
            }))
    }
}
