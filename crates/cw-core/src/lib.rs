//! # cw-core
//!
//! Data-integrity reconciliation for the Checkwise routine dashboard.
//!
//! This crate provides the entity models, the entity gateway contract with
//! in-memory and REST implementations, tier entitlements, the audit trail, and
//! the integrity checkers and repair executor.

pub mod audit;
pub mod entitlements;
pub mod gateway;
pub mod integrity;
pub mod models;

pub use audit::{AuditAction, AuditLogger, AuditOutcome};
pub use entitlements::{Entitlements, Feature, TierMatrix};
pub use gateway::{
    EntityGateway, EntityKind, EntityStore, GatewayError, ListQuery, RecordFilter, SortKey,
};
pub use integrity::{
    CheckOutcome, ExecutionWindow, IntegrityConfig, IntegrityError, IntegrityReport,
    IntegrityService, Issue, IssueCategory, IssueKind, RepairReport, RepairRun, RepairStatus,
};
pub use models::{Execution, Role, Routine, Team, Tier, User};
