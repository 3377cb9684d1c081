//! Audit log record model.

use crate::gateway::{Entity, EntityKind};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A persisted audit trail entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditLogRecord {
    /// Assigned by the store on create; empty before that.
    #[serde(default)]
    pub id: String,
    /// Machine-readable action tag (e.g. `integrity_check_run`).
    pub action: String,
    /// Human-readable description of what happened.
    pub details: String,
    /// Email of the acting user.
    pub user_email: String,
    pub created_at: DateTime<Utc>,
}

/// Partial update for an audit record. Only the details may be amended.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AuditLogPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl Entity for AuditLogRecord {
    type Patch = AuditLogPatch;
    const KIND: EntityKind = EntityKind::AuditLog;

    fn id(&self) -> &str {
        &self.id
    }

    fn set_id(&mut self, id: String) {
        self.id = id;
    }

    fn apply_patch(&mut self, patch: &AuditLogPatch) {
        if let Some(details) = &patch.details {
            self.details = details.clone();
        }
    }
}
