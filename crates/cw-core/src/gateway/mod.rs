//! Entity gateway for Checkwise.
//!
//! The hosted backend exposes the same record-store contract for every entity
//! kind: list (optionally sorted and bounded), filter by field equality, create
//! and partial update. This module models that contract as the generic
//! [`EntityStore`] trait and bundles one store per kind into an
//! [`EntityGateway`].
//!
//! Two implementations are provided:
//! - [`InMemoryStore`]: map-backed, used in tests and local runs.
//! - [`RestEntityStore`]: HTTP client for the hosted backend.

mod error;
pub mod memory;
pub mod rest;

pub use error::GatewayError;
pub use memory::{InMemoryGateway, InMemoryStore, StoreOperation};
pub use rest::{RestEntityStore, RestGatewayConfig};

use crate::models::{AuditLogRecord, Execution, Routine, Team, User};
use async_trait::async_trait;
use chrono::DateTime;
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// Entity kinds known to the hosted store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    User,
    Team,
    Routine,
    Execution,
    AuditLog,
}

impl EntityKind {
    /// Returns the collection name used by the hosted store.
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::User => "User",
            EntityKind::Team => "Team",
            EntityKind::Routine => "Routine",
            EntityKind::Execution => "Execution",
            EntityKind::AuditLog => "AuditLog",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A record type held by the entity store.
pub trait Entity: Clone + Send + Sync + Serialize + DeserializeOwned + 'static {
    /// Partial update accepted by `EntityStore::update`.
    type Patch: Clone + Send + Sync + Serialize + fmt::Debug;

    /// Collection this record lives in.
    const KIND: EntityKind;

    fn id(&self) -> &str;

    /// Assigns the store-generated id on create.
    fn set_id(&mut self, id: String);

    /// Applies a partial update in place.
    fn apply_patch(&mut self, patch: &Self::Patch);
}

/// Sort order for list queries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortKey {
    pub field: String,
    pub descending: bool,
}

impl SortKey {
    pub fn asc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            descending: false,
        }
    }

    pub fn desc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            descending: true,
        }
    }

    /// Encodes the key the way the hosted store expects it: `-field` for
    /// descending, `field` for ascending.
    pub fn to_param(&self) -> String {
        if self.descending {
            format!("-{}", self.field)
        } else {
            self.field.clone()
        }
    }
}

/// Parameters for `EntityStore::list`. The default lists the full collection
/// in store order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListQuery {
    pub sort: Option<SortKey>,
    pub limit: Option<usize>,
    pub skip: Option<usize>,
}

impl ListQuery {
    /// Lists the whole collection.
    pub fn all() -> Self {
        Self::default()
    }

    pub fn sorted_by(mut self, sort: SortKey) -> Self {
        self.sort = Some(sort);
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn skip(mut self, skip: usize) -> Self {
        self.skip = Some(skip);
        self
    }
}

/// Equality predicate for `EntityStore::filter`. A record matches when every
/// listed field equals the given value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecordFilter {
    fields: BTreeMap<String, Value>,
}

impl RecordFilter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Filter matching a single record id.
    pub fn by_id(id: &str) -> Self {
        Self::new().eq("id", id)
    }

    /// Adds an equality condition.
    pub fn eq(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(field.into(), value.into());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn fields(&self) -> &BTreeMap<String, Value> {
        &self.fields
    }

    /// Returns true if the serialized record satisfies every condition.
    pub fn matches(&self, record: &Value) -> bool {
        self.fields
            .iter()
            .all(|(field, expected)| record.get(field) == Some(expected))
    }
}

/// Orders two serialized field values.
///
/// Missing values sort first. RFC 3339 strings are compared as instants so
/// that differing fractional-second precision does not break date ordering.
pub fn compare_field_values(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    match (a, b) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        (Some(Value::Number(x)), Some(Value::Number(y))) => {
            let x = x.as_f64().unwrap_or_default();
            let y = y.as_f64().unwrap_or_default();
            x.partial_cmp(&y).unwrap_or(Ordering::Equal)
        }
        (Some(Value::String(x)), Some(Value::String(y))) => {
            match (DateTime::parse_from_rfc3339(x), DateTime::parse_from_rfc3339(y)) {
                (Ok(x), Ok(y)) => x.cmp(&y),
                _ => x.cmp(y),
            }
        }
        (Some(Value::Bool(x)), Some(Value::Bool(y))) => x.cmp(y),
        (Some(x), Some(y)) => x.to_string().cmp(&y.to_string()),
    }
}

/// Record-store contract shared by every entity kind.
#[async_trait]
pub trait EntityStore<T: Entity>: Send + Sync {
    /// Lists records, optionally sorted and bounded.
    async fn list(&self, query: &ListQuery) -> Result<Vec<T>, GatewayError>;

    /// Lists records matching every equality condition in `filter`.
    async fn filter(&self, filter: &RecordFilter) -> Result<Vec<T>, GatewayError>;

    /// Creates a record and returns it as stored.
    async fn create(&self, record: &T) -> Result<T, GatewayError>;

    /// Applies a partial update and returns the updated record.
    async fn update(&self, id: &str, patch: &T::Patch) -> Result<T, GatewayError>;

    /// Fetches a single record by id, straight from the store.
    async fn get(&self, id: &str) -> Result<Option<T>, GatewayError> {
        Ok(self.filter(&RecordFilter::by_id(id)).await?.into_iter().next())
    }

    /// Lists the full collection in store order.
    async fn list_all(&self) -> Result<Vec<T>, GatewayError> {
        self.list(&ListQuery::all()).await
    }
}

/// One store per entity kind.
#[derive(Clone)]
pub struct EntityGateway {
    pub users: Arc<dyn EntityStore<User>>,
    pub teams: Arc<dyn EntityStore<Team>>,
    pub routines: Arc<dyn EntityStore<Routine>>,
    pub executions: Arc<dyn EntityStore<Execution>>,
    pub audit_logs: Arc<dyn EntityStore<AuditLogRecord>>,
}

impl EntityGateway {
    /// Builds a gateway talking to the hosted backend over HTTP.
    pub fn rest(config: &RestGatewayConfig) -> Result<Self, GatewayError> {
        let client = rest::build_client(config)?;
        Ok(Self {
            users: Arc::new(RestEntityStore::<User>::with_client(client.clone(), config)),
            teams: Arc::new(RestEntityStore::<Team>::with_client(client.clone(), config)),
            routines: Arc::new(RestEntityStore::<Routine>::with_client(client.clone(), config)),
            executions: Arc::new(RestEntityStore::<Execution>::with_client(
                client.clone(),
                config,
            )),
            audit_logs: Arc::new(RestEntityStore::<AuditLogRecord>::with_client(
                client, config,
            )),
        })
    }
}

impl fmt::Debug for EntityGateway {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EntityGateway").finish_non_exhaustive()
    }
}
