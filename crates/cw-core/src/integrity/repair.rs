//! Repair executor.
//!
//! Repairs go through a dispatch table keyed by [`IssueKind`]. Each handler
//! re-fetches its target and re-checks every dangling reference right before
//! writing, so a reference that resolved again since the check run is kept.
//! Kinds without a handler are reported as unsupported and left untouched.

use super::issue::{Issue, IssueKind};
use crate::gateway::{Entity, EntityGateway, EntityStore, GatewayError, RecordFilter};
use crate::models::{RoutinePatch, UserPatch};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn, Instrument};
use uuid::Uuid;

/// Errors raised by a repair handler.
#[derive(Error, Debug)]
pub enum RepairError {
    #[error(transparent)]
    Gateway(#[from] GatewayError),

    /// The handler was dispatched an issue it does not understand.
    #[error("Handler {handler} cannot repair {kind} issues")]
    Mismatch {
        handler: &'static str,
        kind: IssueKind,
    },
}

/// Per-issue repair status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RepairStatus {
    /// One write removed these references.
    Repaired { removed: Vec<String> },
    /// Nothing left to remove; no write was made.
    Skipped { reason: String },
    /// No handler exists for the issue kind.
    Unsupported,
    /// The handler failed; the entity may be unchanged.
    Failed { error: String },
}

/// Repair outcome of one issue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepairResult {
    pub issue: Issue,
    /// True only for `repaired`.
    pub success: bool,
    #[serde(flatten)]
    pub status: RepairStatus,
}

impl RepairResult {
    pub fn new(issue: Issue, status: RepairStatus) -> Self {
        Self {
            success: matches!(status, RepairStatus::Repaired { .. }),
            issue,
            status,
        }
    }

    pub fn success(&self) -> bool {
        self.success
    }
}

/// Counters over a repair run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepairSummary {
    pub attempted: usize,
    pub repaired: usize,
    pub skipped: usize,
    pub unsupported: usize,
    pub failed: usize,
}

impl RepairSummary {
    pub fn from_results(results: &[RepairResult]) -> Self {
        results.iter().fold(Self::default(), |mut summary, result| {
            summary.attempted += 1;
            match result.status {
                RepairStatus::Repaired { .. } => summary.repaired += 1,
                RepairStatus::Skipped { .. } => summary.skipped += 1,
                RepairStatus::Unsupported => summary.unsupported += 1,
                RepairStatus::Failed { .. } => summary.failed += 1,
            }
            summary
        })
    }

    pub fn describe(&self) -> String {
        format!("Repaired {} of {} issues", self.repaired, self.attempted)
    }
}

/// Result of one repair run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepairReport {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
    pub results: Vec<RepairResult>,
    pub summary: RepairSummary,
}

/// Repairs one kind of issue.
#[async_trait]
pub trait RepairHandler: Send + Sync {
    fn name(&self) -> &'static str;

    /// Applies at most one write for `issue`.
    async fn repair(
        &self,
        gateway: &EntityGateway,
        issue: &Issue,
    ) -> Result<RepairStatus, RepairError>;
}

/// Dispatch table from issue kind to handler.
#[derive(Clone)]
pub struct RepairRegistry {
    handlers: HashMap<IssueKind, Arc<dyn RepairHandler>>,
}

impl Default for RepairRegistry {
    /// Handlers for user-assignment and both sides of team-assignment.
    fn default() -> Self {
        let mut registry = Self::empty();
        registry.register(
            IssueKind::OrphanedUserAssignment,
            Arc::new(RoutineUserAssignmentRepair),
        );
        registry.register(
            IssueKind::OrphanedTeamAssignmentRoutine,
            Arc::new(RoutineTeamAssignmentRepair),
        );
        registry.register(
            IssueKind::OrphanedTeamAssignmentUser,
            Arc::new(UserTeamAssignmentRepair),
        );
        registry
    }
}

impl RepairRegistry {
    pub fn empty() -> Self {
        Self {
            handlers: HashMap::new(),
        }
    }

    /// Registers `handler` for `kind`, replacing any previous handler.
    pub fn register(&mut self, kind: IssueKind, handler: Arc<dyn RepairHandler>) {
        self.handlers.insert(kind, handler);
    }

    pub fn handler(&self, kind: IssueKind) -> Option<&Arc<dyn RepairHandler>> {
        self.handlers.get(&kind)
    }

    pub fn supports(&self, kind: IssueKind) -> bool {
        self.handlers.contains_key(&kind)
    }

    pub fn supported_kinds(&self) -> Vec<IssueKind> {
        let mut kinds: Vec<_> = self.handlers.keys().copied().collect();
        kinds.sort();
        kinds
    }
}

impl std::fmt::Debug for RepairRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RepairRegistry")
            .field("kinds", &self.supported_kinds())
            .finish()
    }
}

/// Applies repairs sequentially, one write per issue, capturing failures.
#[derive(Debug, Clone)]
pub struct RepairExecutor {
    gateway: EntityGateway,
    registry: RepairRegistry,
}

impl RepairExecutor {
    pub fn new(gateway: EntityGateway) -> Self {
        Self::with_registry(gateway, RepairRegistry::default())
    }

    pub fn with_registry(gateway: EntityGateway, registry: RepairRegistry) -> Self {
        Self { gateway, registry }
    }

    pub fn registry(&self) -> &RepairRegistry {
        &self.registry
    }

    /// Repairs `issues` in list order. Issues touching the same entity are
    /// applied one after another, so the later write sees the earlier one.
    pub async fn repair(&self, issues: &[Issue]) -> RepairReport {
        let run_id = Uuid::new_v4();
        let started_at = Utc::now();
        let span = cw_observability::repair_span!(run_id, issues.len());

        let results = async {
            let mut results = Vec::with_capacity(issues.len());
            for issue in issues {
                let status = self.repair_one(issue).await;
                results.push(RepairResult::new(issue.clone(), status));
            }
            results
        }
        .instrument(span)
        .await;

        let summary = RepairSummary::from_results(&results);
        info!(%run_id, "{}", summary.describe());
        RepairReport {
            run_id,
            started_at,
            completed_at: Utc::now(),
            results,
            summary,
        }
    }

    async fn repair_one(&self, issue: &Issue) -> RepairStatus {
        let kind = issue.kind();
        let Some(handler) = self.registry.handler(kind) else {
            info!(kind = %kind, entity_id = issue.entity_id(), "No repair handler, leaving untouched");
            return RepairStatus::Unsupported;
        };

        match handler.repair(&self.gateway, issue).await {
            Ok(status) => {
                info!(
                    handler = handler.name(),
                    entity_id = issue.entity_id(),
                    ?status,
                    "Repair applied"
                );
                status
            }
            Err(e) => {
                warn!(
                    handler = handler.name(),
                    entity_id = issue.entity_id(),
                    error = %e,
                    "Repair failed"
                );
                RepairStatus::Failed {
                    error: e.to_string(),
                }
            }
        }
    }
}

/// Removes every element of `dangling` from `current`, keeping order.
fn without(current: &[String], dangling: &[String]) -> Vec<String> {
    current
        .iter()
        .filter(|value| !dangling.contains(value))
        .cloned()
        .collect()
}

/// Of the `candidates` still present in `current`, the ids that do not exist
/// in `store`.
async fn unresolved_ids<T: Entity>(
    store: &dyn EntityStore<T>,
    candidates: &[String],
    current: &[String],
) -> Result<Vec<String>, GatewayError> {
    let mut unresolved = Vec::new();
    for id in candidates.iter().filter(|id| current.contains(id)) {
        if store.get(id).await?.is_none() {
            unresolved.push(id.clone());
        }
    }
    Ok(unresolved)
}

fn skipped_resolved() -> RepairStatus {
    RepairStatus::Skipped {
        reason: "All references resolve".to_string(),
    }
}

fn skipped_missing(entity: &str, id: &str) -> RepairStatus {
    RepairStatus::Skipped {
        reason: format!("{} {} no longer exists", entity, id),
    }
}

/// Drops unknown emails from `Routine.assigned_to`.
pub struct RoutineUserAssignmentRepair;

#[async_trait]
impl RepairHandler for RoutineUserAssignmentRepair {
    fn name(&self) -> &'static str {
        "routine_user_assignment"
    }

    async fn repair(
        &self,
        gateway: &EntityGateway,
        issue: &Issue,
    ) -> Result<RepairStatus, RepairError> {
        let Issue::OrphanedUserAssignment {
            routine_id,
            orphaned_emails,
            ..
        } = issue
        else {
            return Err(RepairError::Mismatch {
                handler: self.name(),
                kind: issue.kind(),
            });
        };

        let Some(routine) = gateway.routines.get(routine_id).await? else {
            return Ok(skipped_missing("Routine", routine_id));
        };
        let current = routine.assigned_to.unwrap_or_default();

        let mut dangling = Vec::new();
        for email in orphaned_emails.iter().filter(|e| current.contains(e)) {
            let filter = RecordFilter::new().eq("email", email.as_str());
            if gateway.users.filter(&filter).await?.is_empty() {
                dangling.push(email.clone());
            }
        }
        if dangling.is_empty() {
            return Ok(skipped_resolved());
        }

        let patch = RoutinePatch {
            assigned_to: Some(without(&current, &dangling)),
            ..Default::default()
        };
        gateway.routines.update(routine_id, &patch).await?;
        Ok(RepairStatus::Repaired { removed: dangling })
    }
}

/// Drops unknown team ids from `Routine.assigned_team_ids`.
pub struct RoutineTeamAssignmentRepair;

#[async_trait]
impl RepairHandler for RoutineTeamAssignmentRepair {
    fn name(&self) -> &'static str {
        "routine_team_assignment"
    }

    async fn repair(
        &self,
        gateway: &EntityGateway,
        issue: &Issue,
    ) -> Result<RepairStatus, RepairError> {
        let Issue::OrphanedTeamAssignmentRoutine {
            routine_id,
            orphaned_team_ids,
            ..
        } = issue
        else {
            return Err(RepairError::Mismatch {
                handler: self.name(),
                kind: issue.kind(),
            });
        };

        let Some(routine) = gateway.routines.get(routine_id).await? else {
            return Ok(skipped_missing("Routine", routine_id));
        };
        let current = routine.assigned_team_ids.unwrap_or_default();

        let dangling = unresolved_ids(gateway.teams.as_ref(), orphaned_team_ids, &current).await?;
        if dangling.is_empty() {
            return Ok(skipped_resolved());
        }

        let patch = RoutinePatch {
            assigned_team_ids: Some(without(&current, &dangling)),
            ..Default::default()
        };
        gateway.routines.update(routine_id, &patch).await?;
        Ok(RepairStatus::Repaired { removed: dangling })
    }
}

/// Drops unknown team ids from `User.team_ids`.
pub struct UserTeamAssignmentRepair;

#[async_trait]
impl RepairHandler for UserTeamAssignmentRepair {
    fn name(&self) -> &'static str {
        "user_team_assignment"
    }

    async fn repair(
        &self,
        gateway: &EntityGateway,
        issue: &Issue,
    ) -> Result<RepairStatus, RepairError> {
        let Issue::OrphanedTeamAssignmentUser {
            user_id,
            orphaned_team_ids,
            ..
        } = issue
        else {
            return Err(RepairError::Mismatch {
                handler: self.name(),
                kind: issue.kind(),
            });
        };

        let Some(user) = gateway.users.get(user_id).await? else {
            return Ok(skipped_missing("User", user_id));
        };

        let dangling =
            unresolved_ids(gateway.teams.as_ref(), orphaned_team_ids, &user.team_ids).await?;
        if dangling.is_empty() {
            return Ok(skipped_resolved());
        }

        let patch = UserPatch {
            team_ids: Some(without(&user.team_ids, &dangling)),
            ..Default::default()
        };
        gateway.users.update(user_id, &patch).await?;
        Ok(RepairStatus::Repaired { removed: dangling })
    }
}
