//! In-memory implementation of the entity store.
//!
//! The store keeps records in insertion order and applies filters, sorting and
//! paging against their serialized form, the same way the hosted backend
//! evaluates queries. It does not require a network connection and is used for
//! tests and local runs.

use super::{
    compare_field_values, Entity, EntityGateway, EntityStore, GatewayError, ListQuery,
    RecordFilter,
};
use crate::models::{AuditLogRecord, Execution, Routine, Team, User};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

/// Store operations that can be made to fail on purpose.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreOperation {
    List,
    Filter,
    Create,
    Update,
}

#[derive(Default)]
struct FailureInjection {
    operations: HashSet<StoreOperation>,
    rejected_update_ids: HashSet<String>,
}

/// In-memory entity store.
pub struct InMemoryStore<T: Entity> {
    records: Arc<RwLock<Vec<T>>>,
    failures: RwLock<FailureInjection>,
}

impl<T: Entity> Default for InMemoryStore<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Entity> InMemoryStore<T> {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self {
            records: Arc::new(RwLock::new(Vec::new())),
            failures: RwLock::new(FailureInjection::default()),
        }
    }

    /// Creates a store pre-populated with records.
    pub fn with_records(records: Vec<T>) -> Self {
        Self {
            records: Arc::new(RwLock::new(records)),
            failures: RwLock::new(FailureInjection::default()),
        }
    }

    /// Gets a snapshot of all records in insertion order.
    pub async fn snapshot(&self) -> Vec<T> {
        self.records.read().await.clone()
    }

    /// Gets a record by id without going through failure injection.
    pub async fn find(&self, id: &str) -> Option<T> {
        self.records
            .read()
            .await
            .iter()
            .find(|r| r.id() == id)
            .cloned()
    }

    /// Removes a record, simulating a deletion made elsewhere.
    pub async fn remove(&self, id: &str) -> bool {
        let mut records = self.records.write().await;
        let before = records.len();
        records.retain(|r| r.id() != id);
        records.len() != before
    }

    /// Makes every subsequent call of `operation` fail with a connection error.
    pub async fn fail_on(&self, operation: StoreOperation) {
        self.failures.write().await.operations.insert(operation);
    }

    /// Makes updates of the given record fail with a rejection.
    pub async fn reject_updates_for(&self, id: &str) {
        self.failures
            .write()
            .await
            .rejected_update_ids
            .insert(id.to_string());
    }

    /// Clears all injected failures.
    pub async fn heal(&self) {
        let mut failures = self.failures.write().await;
        failures.operations.clear();
        failures.rejected_update_ids.clear();
    }

    async fn check_failure(&self, operation: StoreOperation) -> Result<(), GatewayError> {
        if self.failures.read().await.operations.contains(&operation) {
            return Err(GatewayError::Connection(format!(
                "{:?} on {} is unavailable",
                operation,
                T::KIND
            )));
        }
        Ok(())
    }

    fn serialized(records: &[T]) -> Result<Vec<(Value, &T)>, GatewayError> {
        records
            .iter()
            .map(|r| Ok((serde_json::to_value(r)?, r)))
            .collect()
    }
}

#[async_trait]
impl<T: Entity> EntityStore<T> for InMemoryStore<T> {
    async fn list(&self, query: &ListQuery) -> Result<Vec<T>, GatewayError> {
        self.check_failure(StoreOperation::List).await?;
        let records = self.records.read().await;

        let mut rows = Self::serialized(&records)?;
        if let Some(sort) = &query.sort {
            // Stable sort keeps insertion order among equal keys.
            rows.sort_by(|(a, _), (b, _)| {
                let ordering = compare_field_values(a.get(&sort.field), b.get(&sort.field));
                if sort.descending {
                    ordering.reverse()
                } else {
                    ordering
                }
            });
        }

        Ok(rows
            .into_iter()
            .skip(query.skip.unwrap_or(0))
            .take(query.limit.unwrap_or(usize::MAX))
            .map(|(_, r)| r.clone())
            .collect())
    }

    async fn filter(&self, filter: &RecordFilter) -> Result<Vec<T>, GatewayError> {
        self.check_failure(StoreOperation::Filter).await?;
        let records = self.records.read().await;

        Ok(Self::serialized(&records)?
            .into_iter()
            .filter(|(value, _)| filter.matches(value))
            .map(|(_, r)| r.clone())
            .collect())
    }

    async fn create(&self, record: &T) -> Result<T, GatewayError> {
        self.check_failure(StoreOperation::Create).await?;
        let mut records = self.records.write().await;

        let mut created = record.clone();
        if created.id().is_empty() {
            created.set_id(Uuid::new_v4().to_string());
        }

        if records.iter().any(|r| r.id() == created.id()) {
            return Err(GatewayError::Rejected(format!(
                "{} with id '{}' already exists",
                T::KIND,
                created.id()
            )));
        }

        records.push(created.clone());
        Ok(created)
    }

    async fn update(&self, id: &str, patch: &T::Patch) -> Result<T, GatewayError> {
        self.check_failure(StoreOperation::Update).await?;
        if self.failures.read().await.rejected_update_ids.contains(id) {
            return Err(GatewayError::Rejected(format!(
                "update of {} '{}' was refused",
                T::KIND,
                id
            )));
        }

        let mut records = self.records.write().await;
        let record = records
            .iter_mut()
            .find(|r| r.id() == id)
            .ok_or_else(|| GatewayError::NotFound {
                entity: T::KIND.to_string(),
                id: id.to_string(),
            })?;

        record.apply_patch(patch);
        Ok(record.clone())
    }
}

/// In-memory stores for every entity kind, with typed handles kept for
/// inspection and failure injection.
#[derive(Clone, Default)]
pub struct InMemoryGateway {
    pub users: Arc<InMemoryStore<User>>,
    pub teams: Arc<InMemoryStore<Team>>,
    pub routines: Arc<InMemoryStore<Routine>>,
    pub executions: Arc<InMemoryStore<Execution>>,
    pub audit_logs: Arc<InMemoryStore<AuditLogRecord>>,
}

impl InMemoryGateway {
    /// Creates empty stores.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates stores seeded with the given collections and no audit entries.
    pub fn seeded(
        users: Vec<User>,
        teams: Vec<Team>,
        routines: Vec<Routine>,
        executions: Vec<Execution>,
    ) -> Self {
        Self {
            users: Arc::new(InMemoryStore::with_records(users)),
            teams: Arc::new(InMemoryStore::with_records(teams)),
            routines: Arc::new(InMemoryStore::with_records(routines)),
            executions: Arc::new(InMemoryStore::with_records(executions)),
            audit_logs: Arc::new(InMemoryStore::new()),
        }
    }

    /// Returns a gateway sharing these stores.
    pub fn gateway(&self) -> EntityGateway {
        EntityGateway {
            users: self.users.clone(),
            teams: self.teams.clone(),
            routines: self.routines.clone(),
            executions: self.executions.clone(),
            audit_logs: self.audit_logs.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::SortKey;
    use crate::models::{RoutinePatch, UserPatch};
    use chrono::{Duration, TimeZone, Utc};

    fn executions(count: i64) -> Vec<Execution> {
        let base = Utc.with_ymd_and_hms(2024, 1, 1, 8, 0, 0).unwrap();
        (0..count)
            .map(|i| {
                Execution::new(
                    format!("e{}", i),
                    "r1",
                    "a@x.com",
                    base + Duration::hours(i),
                )
            })
            .collect()
    }

    #[tokio::test]
    async fn test_create_and_get() {
        let store = InMemoryStore::<User>::new();
        store.create(&User::new("u1", "a@x.com")).await.unwrap();

        let found = store.get("u1").await.unwrap();
        assert_eq!(found.unwrap().email, "a@x.com");
        assert!(store.get("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_create_assigns_id_when_empty() {
        let store = InMemoryStore::<User>::new();
        let created = store.create(&User::new("", "a@x.com")).await.unwrap();

        assert!(!created.id.is_empty());
        assert!(store.find(&created.id).await.is_some());
    }

    #[tokio::test]
    async fn test_duplicate_id_rejected() {
        let store = InMemoryStore::with_records(vec![User::new("u1", "a@x.com")]);
        let result = store.create(&User::new("u1", "b@x.com")).await;

        assert!(matches!(result, Err(GatewayError::Rejected(_))));
    }

    #[tokio::test]
    async fn test_list_sorted_descending_with_limit() {
        let store = InMemoryStore::with_records(executions(5));
        let query = ListQuery::all()
            .sorted_by(SortKey::desc("execution_date"))
            .limit(2);

        let page = store.list(&query).await.unwrap();
        let ids: Vec<_> = page.iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, vec!["e4", "e3"]);
    }

    #[tokio::test]
    async fn test_list_skip_pages_through_collection() {
        let store = InMemoryStore::with_records(executions(5));
        let query = ListQuery::all()
            .sorted_by(SortKey::desc("execution_date"))
            .skip(4)
            .limit(2);

        let page = store.list(&query).await.unwrap();
        assert_eq!(page.len(), 1);
        assert_eq!(page[0].id, "e0");
    }

    #[tokio::test]
    async fn test_filter_by_field() {
        let store = InMemoryStore::with_records(vec![
            User::new("u1", "a@x.com"),
            User::new("u2", "b@x.com"),
        ]);

        let found = store
            .filter(&RecordFilter::new().eq("email", "b@x.com"))
            .await
            .unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, "u2");
    }

    #[tokio::test]
    async fn test_update_applies_patch() {
        let store = InMemoryStore::with_records(vec![Routine::new("r1", "Line check")
            .assign_users(["a@x.com", "b@x.com"])]);

        let patch = RoutinePatch {
            assigned_to: Some(vec!["a@x.com".to_string()]),
            ..Default::default()
        };
        let updated = store.update("r1", &patch).await.unwrap();

        assert_eq!(updated.assigned_to, Some(vec!["a@x.com".to_string()]));
        assert_eq!(store.find("r1").await.unwrap(), updated);
    }

    #[tokio::test]
    async fn test_update_nonexistent_record() {
        let store = InMemoryStore::<User>::new();
        let result = store.update("u404", &UserPatch::default()).await;

        assert!(matches!(result, Err(GatewayError::NotFound { .. })));
    }

    #[tokio::test]
    async fn test_failure_injection() {
        let store = InMemoryStore::with_records(vec![User::new("u1", "a@x.com")]);
        store.fail_on(StoreOperation::List).await;

        assert!(matches!(
            store.list_all().await,
            Err(GatewayError::Connection(_))
        ));
        // Other operations are unaffected.
        assert!(store.get("u1").await.unwrap().is_some());

        store.heal().await;
        assert_eq!(store.list_all().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_rejected_update_for_single_record() {
        let store = InMemoryStore::with_records(vec![
            User::new("u1", "a@x.com"),
            User::new("u2", "b@x.com"),
        ]);
        store.reject_updates_for("u1").await;

        let patch = UserPatch {
            team_ids: Some(vec![]),
            ..Default::default()
        };
        assert!(matches!(
            store.update("u1", &patch).await,
            Err(GatewayError::Rejected(_))
        ));
        assert!(store.update("u2", &patch).await.is_ok());
    }

    #[tokio::test]
    async fn test_remove_record() {
        let store = InMemoryStore::with_records(vec![User::new("u1", "a@x.com")]);

        assert!(store.remove("u1").await);
        assert!(!store.remove("u1").await);
        assert!(store.snapshot().await.is_empty());
    }
}
