//! Routine execution model.

use crate::gateway::{Entity, EntityKind};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Outcome recorded when a user works through a routine instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionStatus {
    #[default]
    Completed,
    PartiallyCompleted,
    Skipped,
}

/// A single execution of a routine. Immutable once created in normal operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Execution {
    pub id: String,
    pub routine_id: String,
    /// Email of the user who performed the execution.
    pub executed_by: String,
    #[serde(default)]
    pub status: ExecutionStatus,
    pub execution_date: DateTime<Utc>,
}

impl Execution {
    pub fn new(
        id: impl Into<String>,
        routine_id: impl Into<String>,
        executed_by: impl Into<String>,
        execution_date: DateTime<Utc>,
    ) -> Self {
        Self {
            id: id.into(),
            routine_id: routine_id.into(),
            executed_by: executed_by.into(),
            status: ExecutionStatus::Completed,
            execution_date,
        }
    }
}

/// Partial update for an execution.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExecutionPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<ExecutionStatus>,
}

impl Entity for Execution {
    type Patch = ExecutionPatch;
    const KIND: EntityKind = EntityKind::Execution;

    fn id(&self) -> &str {
        &self.id
    }

    fn set_id(&mut self, id: String) {
        self.id = id;
    }

    fn apply_patch(&mut self, patch: &ExecutionPatch) {
        if let Some(status) = patch.status {
            self.status = status;
        }
    }
}
