//! Entity models for the Checkwise routine dashboard.
//!
//! These mirror the records held by the hosted entity store. Each model has a
//! matching patch type carrying the fields an update may change; `None` in a
//! patch means "leave unchanged".

mod audit_log;
mod execution;
mod routine;
mod team;
mod user;

pub use audit_log::{AuditLogPatch, AuditLogRecord};
pub use execution::{Execution, ExecutionPatch, ExecutionStatus};
pub use routine::{Routine, RoutinePatch};
pub use team::{Team, TeamPatch};
pub use user::{Role, Tier, User, UserPatch, UserStatus};

use serde::{Deserialize, Deserializer};

/// Reads an explicit `null` the same way as a missing field.
pub(crate) fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}
