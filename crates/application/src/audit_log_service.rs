use std::sync::Arc;

use workix_core::AppResult;

use crate::rbac_ports::{AuditLogFilters, AuditLogPage, AuditLogRepository};

/// Application service for reading the append-only audit log.
#[derive(Clone)]
pub struct AuditLogService {
    repository: Arc<dyn AuditLogRepository>,
}

impl AuditLogService {
    /// Creates a new service from a repository implementation.
    #[must_use]
    pub fn new(repository: Arc<dyn AuditLogRepository>) -> Self {
        Self { repository }
    }

    /// Lists audit entries matching the filters.
    ///
    /// Every page also carries the distinct action and entity types across
    /// all history, used by admin views to populate filter dropdowns.
    pub async fn list(&self, filters: AuditLogFilters) -> AppResult<AuditLogPage> {
        let page = filters.page.max(1);
        let limit = filters.limit.clamp(1, 200);
        let filters = AuditLogFilters {
            page,
            limit,
            ..filters
        };

        let (entries, total) = self.repository.list_entries(filters).await?;
        let action_types = self.repository.distinct_action_types().await?;
        let entity_types = self.repository.distinct_entity_types().await?;

        Ok(AuditLogPage {
            entries,
            total,
            page,
            limit,
            total_pages: total.div_ceil(limit as u64),
            action_types,
            entity_types,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use async_trait::async_trait;
    use chrono::Utc;
    use workix_core::AppResult;

    use crate::rbac_ports::{AuditLogEntry, AuditLogFilters, AuditLogRepository};

    use super::AuditLogService;

    struct FakeAuditLogRepository {
        entries: Vec<AuditLogEntry>,
    }

    #[async_trait]
    impl AuditLogRepository for FakeAuditLogRepository {
        async fn list_entries(
            &self,
            filters: AuditLogFilters,
        ) -> AppResult<(Vec<AuditLogEntry>, u64)> {
            let total = self.entries.len() as u64;
            let offset = (filters.page - 1) * filters.limit;
            let page = self
                .entries
                .iter()
                .skip(offset)
                .take(filters.limit)
                .cloned()
                .collect();
            Ok((page, total))
        }

        async fn distinct_action_types(&self) -> AppResult<Vec<String>> {
            let mut actions: Vec<String> = self
                .entries
                .iter()
                .map(|entry| entry.action.clone())
                .collect();
            actions.sort();
            actions.dedup();
            Ok(actions)
        }

        async fn distinct_entity_types(&self) -> AppResult<Vec<String>> {
            let mut types: Vec<String> = self
                .entries
                .iter()
                .map(|entry| entry.entity_type.clone())
                .collect();
            types.sort();
            types.dedup();
            Ok(types)
        }
    }

    fn entry(action: &str, entity_type: &str) -> AuditLogEntry {
        AuditLogEntry {
            id: uuid_like(action, entity_type),
            user_id: None,
            action: action.to_owned(),
            entity_type: entity_type.to_owned(),
            entity_id: None,
            changes: None,
            ip_address: None,
            user_agent: None,
            metadata: None,
            created_at: Utc::now(),
        }
    }

    fn uuid_like(action: &str, entity_type: &str) -> String {
        format!("{action}/{entity_type}")
    }

    #[tokio::test]
    async fn page_carries_distinct_types_across_history() {
        let repository = FakeAuditLogRepository {
            entries: vec![
                entry("rbac.role.created", "role"),
                entry("rbac.role.created", "role"),
                entry("rbac.role.assigned", "role_assignment"),
            ],
        };
        let service = AuditLogService::new(Arc::new(repository));

        let page = service.list(AuditLogFilters::default()).await;
        assert!(page.is_ok());

        if let Ok(page) = page {
            assert_eq!(page.total, 3);
            assert_eq!(page.total_pages, 1);
            assert_eq!(
                page.action_types,
                vec![
                    "rbac.role.assigned".to_owned(),
                    "rbac.role.created".to_owned()
                ]
            );
            assert_eq!(
                page.entity_types,
                vec!["role".to_owned(), "role_assignment".to_owned()]
            );
        }
    }

    #[tokio::test]
    async fn page_and_limit_are_normalized() {
        let repository = FakeAuditLogRepository {
            entries: vec![entry("rbac.role.created", "role")],
        };
        let service = AuditLogService::new(Arc::new(repository));

        let page = service
            .list(AuditLogFilters {
                page: 0,
                limit: 10_000,
                ..AuditLogFilters::default()
            })
            .await;
        assert!(page.is_ok());

        if let Ok(page) = page {
            assert_eq!(page.page, 1);
            assert_eq!(page.limit, 200);
        }
    }

    #[tokio::test]
    async fn total_pages_rounds_up() {
        let entries = (0..5)
            .map(|index| entry(&format!("action.{index}"), "role"))
            .collect();
        let service = AuditLogService::new(Arc::new(FakeAuditLogRepository { entries }));

        let page = service
            .list(AuditLogFilters {
                limit: 2,
                ..AuditLogFilters::default()
            })
            .await;
        assert!(page.is_ok());

        if let Ok(page) = page {
            assert_eq!(page.total, 5);
            assert_eq!(page.total_pages, 3);
        }
    }
}
