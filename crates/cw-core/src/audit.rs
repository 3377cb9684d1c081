//! Audit trail for integrity runs.
//!
//! Entries are only written for users entitled to audit logging. A failed
//! write is logged and otherwise ignored; it never fails the run that
//! triggered it.

use crate::entitlements::{Entitlements, Feature};
use crate::gateway::EntityStore;
use crate::models::{AuditLogRecord, User};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, warn};

/// Audited action tags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditAction {
    IntegrityCheckRun,
    IntegrityRepairRun,
}

impl AuditAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditAction::IntegrityCheckRun => "integrity_check_run",
            AuditAction::IntegrityRepairRun => "integrity_repair_run",
        }
    }
}

impl fmt::Display for AuditAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// What happened to an audit entry.
#[derive(Debug, Clone, PartialEq)]
pub enum AuditOutcome {
    Recorded(AuditLogRecord),
    /// The actor's tier does not include audit logging.
    NotEntitled,
    /// The store refused or could not be reached.
    WriteFailed(String),
}

/// Writes audit entries through the AuditLog store.
#[derive(Clone)]
pub struct AuditLogger {
    store: Arc<dyn EntityStore<AuditLogRecord>>,
    entitlements: Arc<Entitlements>,
}

impl AuditLogger {
    pub fn new(
        store: Arc<dyn EntityStore<AuditLogRecord>>,
        entitlements: Arc<Entitlements>,
    ) -> Self {
        Self {
            store,
            entitlements,
        }
    }

    pub fn entitlements(&self) -> &Entitlements {
        &self.entitlements
    }

    /// Records `action` on behalf of `actor`, if the actor is entitled.
    pub async fn record(&self, action: AuditAction, details: &str, actor: &User) -> AuditOutcome {
        if !self.entitlements.is_allowed(actor, Feature::AuditLogging) {
            debug!(actor = %actor.email, %action, "Actor not entitled to audit logging");
            return AuditOutcome::NotEntitled;
        }

        let entry = AuditLogRecord {
            id: String::new(),
            action: action.as_str().to_string(),
            details: details.to_string(),
            user_email: actor.email.clone(),
            created_at: Utc::now(),
        };

        match self.store.create(&entry).await {
            Ok(created) => {
                debug!(id = %created.id, %action, "Audit entry recorded");
                AuditOutcome::Recorded(created)
            }
            Err(e) => {
                warn!(%action, error = %e, "Failed to write audit entry");
                AuditOutcome::WriteFailed(e.to_string())
            }
        }
    }
}

impl fmt::Debug for AuditLogger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuditLogger")
            .field("entitlements", &self.entitlements)
            .finish_non_exhaustive()
    }
}
