//! Cross-entity consistency checks and repairs.
//!
//! A reconciliation run fetches full collections through the
//! [`EntityGateway`], scans four relationship classes concurrently and
//! produces an [`IntegrityReport`]. A repair run takes a chosen subset of the
//! reported issues and removes the dangling references, one write per issue.
//!
//! ```text
//! run_checks ──► checkers (concurrent, read-only) ──► IntegrityReport
//!                                                          │
//! repair ◄──────────── caller picks issues ◄───────────────┘
//!   │
//!   └──► RepairExecutor ──► gateway updates ──► run_checks (verify)
//! ```
//!
//! Both runs leave an entry in the audit trail when the actor is entitled
//! to audit logging.

mod aggregator;
pub mod checks;
mod config;
mod index;
mod issue;
mod repair;

pub use aggregator::{run_all_checks, CheckOutcome, CheckResult, IntegrityReport, ReportSummary};
pub use config::{ExecutionWindow, IntegrityConfig, DEFAULT_PAGE_SIZE, DEFAULT_RECENT_EXECUTIONS};
pub use index::KeySet;
pub use issue::{Issue, IssueCategory, IssueKind};
pub use repair::{
    RepairError, RepairExecutor, RepairHandler, RepairRegistry, RepairReport, RepairResult,
    RepairStatus, RepairSummary, RoutineTeamAssignmentRepair, RoutineUserAssignmentRepair,
    UserTeamAssignmentRepair,
};

use crate::audit::{AuditAction, AuditLogger};
use crate::entitlements::Entitlements;
use crate::gateway::EntityGateway;
use crate::models::User;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, instrument};

/// Errors raised when setting up the integrity service.
#[derive(Error, Debug)]
pub enum IntegrityError {
    #[error("Invalid integrity configuration: {0}")]
    InvalidConfig(String),
}

/// A repair run bracketed by the check runs before and after it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepairRun {
    pub before: IntegrityReport,
    pub repair: RepairReport,
    pub verification: IntegrityReport,
}

/// Entry point for check and repair runs.
#[derive(Debug, Clone)]
pub struct IntegrityService {
    gateway: EntityGateway,
    config: IntegrityConfig,
    executor: RepairExecutor,
    audit: AuditLogger,
}

impl IntegrityService {
    pub fn new(
        gateway: EntityGateway,
        config: IntegrityConfig,
        entitlements: Arc<Entitlements>,
    ) -> Result<Self, IntegrityError> {
        config.validate().map_err(IntegrityError::InvalidConfig)?;
        let audit = AuditLogger::new(gateway.audit_logs.clone(), entitlements);
        Ok(Self {
            executor: RepairExecutor::new(gateway.clone()),
            gateway,
            config,
            audit,
        })
    }

    /// Replaces the repair dispatch table.
    pub fn with_registry(mut self, registry: RepairRegistry) -> Self {
        self.executor = RepairExecutor::with_registry(self.gateway.clone(), registry);
        self
    }

    pub fn config(&self) -> &IntegrityConfig {
        &self.config
    }

    pub fn gateway(&self) -> &EntityGateway {
        &self.gateway
    }

    pub fn registry(&self) -> &RepairRegistry {
        self.executor.registry()
    }

    /// Runs every checker and audits the run.
    #[instrument(skip(self, actor), fields(actor = %actor.email))]
    pub async fn run_checks(&self, actor: &User) -> IntegrityReport {
        let report = run_all_checks(&self.gateway, &self.config).await;
        self.audit
            .record(
                AuditAction::IntegrityCheckRun,
                &report.summary.describe(),
                actor,
            )
            .await;
        report
    }

    /// Repairs `issues` in order and audits the run.
    #[instrument(skip(self, actor, issues), fields(actor = %actor.email, issues = issues.len()))]
    pub async fn repair(&self, actor: &User, issues: &[Issue]) -> RepairReport {
        let report = self.executor.repair(issues).await;
        self.audit
            .record(
                AuditAction::IntegrityRepairRun,
                &report.summary.describe(),
                actor,
            )
            .await;
        report
    }

    /// Checks, repairs every reported issue of the given kinds, then checks
    /// again so the caller can see what remains.
    #[instrument(skip(self, actor), fields(actor = %actor.email))]
    pub async fn repair_and_verify(&self, actor: &User, kinds: &[IssueKind]) -> RepairRun {
        let before = self.run_checks(actor).await;
        let selected: Vec<Issue> = before
            .issues()
            .filter(|issue| kinds.contains(&issue.kind()))
            .cloned()
            .collect();
        info!(selected = selected.len(), "Selected issues for repair");

        let repair = self.repair(actor, &selected).await;
        let verification = self.run_checks(actor).await;
        RepairRun {
            before,
            repair,
            verification,
        }
    }
}
