//! Runs every checker and merges their outcomes into one report.

use super::checks::fetch_and_check;
use super::config::IntegrityConfig;
use super::issue::{Issue, IssueCategory, IssueKind};
use crate::gateway::EntityGateway;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn, Instrument};
use uuid::Uuid;

/// What one checker produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum CheckOutcome {
    /// The scan ran; `issues` may be empty.
    Completed { issues: Vec<Issue> },
    /// The collections could not be fetched.
    Unavailable { reason: String },
}

impl CheckOutcome {
    pub fn issues(&self) -> &[Issue] {
        match self {
            CheckOutcome::Completed { issues } => issues,
            CheckOutcome::Unavailable { .. } => &[],
        }
    }

    pub fn is_available(&self) -> bool {
        matches!(self, CheckOutcome::Completed { .. })
    }
}

/// Outcome of one category within a report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckResult {
    pub category: IssueCategory,
    #[serde(flatten)]
    pub outcome: CheckOutcome,
}

/// Counters over a report's check results.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportSummary {
    pub total_issues: usize,
    pub checks_run: usize,
    /// Completed with zero issues.
    pub checks_passed: usize,
    /// Completed with at least one issue.
    pub checks_failed: usize,
    pub checks_unavailable: usize,
}

impl ReportSummary {
    pub fn from_results(results: &[CheckResult]) -> Self {
        results
            .iter()
            .fold(Self::default(), |mut summary, result| {
                summary.checks_run += 1;
                match &result.outcome {
                    CheckOutcome::Completed { issues } if issues.is_empty() => {
                        summary.checks_passed += 1
                    }
                    CheckOutcome::Completed { issues } => {
                        summary.checks_failed += 1;
                        summary.total_issues += issues.len();
                    }
                    CheckOutcome::Unavailable { .. } => summary.checks_unavailable += 1,
                }
                summary
            })
    }

    /// One-line description used in the audit trail.
    pub fn describe(&self) -> String {
        let noun = if self.total_issues == 1 { "issue" } else { "issues" };
        let mut line = format!(
            "Found {} {} across {} checks",
            self.total_issues, noun, self.checks_run
        );
        if self.checks_unavailable > 0 {
            line.push_str(&format!(" ({} unavailable)", self.checks_unavailable));
        }
        line
    }
}

/// Result of one reconciliation run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntegrityReport {
    pub run_id: Uuid,
    pub checked_at: DateTime<Utc>,
    pub checks: Vec<CheckResult>,
    pub summary: ReportSummary,
}

impl IntegrityReport {
    pub fn new(checks: Vec<CheckResult>) -> Self {
        Self::for_run(Uuid::new_v4(), checks)
    }

    pub fn for_run(run_id: Uuid, checks: Vec<CheckResult>) -> Self {
        let summary = ReportSummary::from_results(&checks);
        Self {
            run_id,
            checked_at: Utc::now(),
            checks,
            summary,
        }
    }

    /// All issues in category order.
    pub fn issues(&self) -> impl Iterator<Item = &Issue> {
        self.checks.iter().flat_map(|check| check.outcome.issues())
    }

    pub fn issues_of_kind(&self, kind: IssueKind) -> Vec<Issue> {
        self.issues()
            .filter(|issue| issue.kind() == kind)
            .cloned()
            .collect()
    }

    pub fn outcome(&self, category: IssueCategory) -> Option<&CheckOutcome> {
        self.checks
            .iter()
            .find(|check| check.category == category)
            .map(|check| &check.outcome)
    }

    /// True when every check completed and found nothing.
    pub fn is_clean(&self) -> bool {
        self.summary.checks_passed == self.summary.checks_run
    }
}

async fn run_isolated(
    gateway: &EntityGateway,
    config: &IntegrityConfig,
    category: IssueCategory,
) -> CheckResult {
    let outcome = match fetch_and_check(gateway, category, config.execution_window).await {
        Ok(issues) => {
            info!(category = %category, issues = issues.len(), "Check completed");
            CheckOutcome::Completed { issues }
        }
        Err(e) => {
            warn!(category = %category, error = %e, "Check unavailable");
            CheckOutcome::Unavailable {
                reason: e.to_string(),
            }
        }
    };
    CheckResult { category, outcome }
}

/// Runs the four checkers concurrently. Always yields a report; a checker
/// whose reads fail is marked unavailable.
pub async fn run_all_checks(gateway: &EntityGateway, config: &IntegrityConfig) -> IntegrityReport {
    let run_id = Uuid::new_v4();
    let span = cw_observability::integrity_span!(
        run_id,
        window = %config.execution_window.describe()
    );

    let checks = async {
        let (users, teams, leaders, executions) = tokio::join!(
            run_isolated(gateway, config, IssueCategory::UserAssignments),
            run_isolated(gateway, config, IssueCategory::TeamAssignments),
            run_isolated(gateway, config, IssueCategory::TeamLeaders),
            run_isolated(gateway, config, IssueCategory::Executions),
        );
        vec![users, teams, leaders, executions]
    }
    .instrument(span)
    .await;

    let report = IntegrityReport::for_run(run_id, checks);
    info!(%run_id, "{}", report.summary.describe());
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::memory::{InMemoryGateway, StoreOperation};
    use crate::models::{Routine, Team, User};

    fn completed(category: IssueCategory, issues: Vec<Issue>) -> CheckResult {
        CheckResult {
            category,
            outcome: CheckOutcome::Completed { issues },
        }
    }

    fn leader_issue() -> Issue {
        Issue::OrphanedTeamLeader {
            team_id: "t1".to_string(),
            team_name: "Night shift".to_string(),
            orphaned_leader_ids: vec!["u9".to_string()],
        }
    }

    #[test]
    fn test_summary_counts_passed_failed_unavailable() {
        let results = vec![
            completed(IssueCategory::UserAssignments, vec![]),
            completed(IssueCategory::TeamAssignments, vec![]),
            completed(IssueCategory::TeamLeaders, vec![leader_issue()]),
            CheckResult {
                category: IssueCategory::Executions,
                outcome: CheckOutcome::Unavailable {
                    reason: "timeout".to_string(),
                },
            },
        ];

        let summary = ReportSummary::from_results(&results);

        assert_eq!(summary.total_issues, 1);
        assert_eq!(summary.checks_run, 4);
        assert_eq!(summary.checks_passed, 2);
        assert_eq!(summary.checks_failed, 1);
        assert_eq!(summary.checks_unavailable, 1);
        assert_eq!(
            summary.describe(),
            "Found 1 issue across 4 checks (1 unavailable)"
        );
    }

    #[test]
    fn test_report_serialization_shape() {
        let report = IntegrityReport::new(vec![completed(
            IssueCategory::TeamLeaders,
            vec![leader_issue()],
        )]);
        let value = serde_json::to_value(&report).unwrap();

        assert_eq!(value["checks"][0]["category"], "team_leaders");
        assert_eq!(value["checks"][0]["status"], "completed");
        assert_eq!(value["checks"][0]["issues"][0]["type"], "orphaned_team_leader");
        assert_eq!(value["summary"]["checks_failed"], 1);
    }

    #[tokio::test]
    async fn test_clean_store_passes_every_check() {
        let memory = InMemoryGateway::seeded(
            vec![User::new("u1", "a@x.com").with_teams(["t1"])],
            vec![Team::new("t1", "Day shift").with_leaders(["u1"])],
            vec![Routine::new("r1", "Opening").assign_users(["a@x.com"])],
            vec![],
        );

        let report = run_all_checks(&memory.gateway(), &IntegrityConfig::default()).await;

        assert!(report.is_clean());
        assert_eq!(report.summary.checks_passed, 4);
        assert_eq!(report.issues().count(), 0);
    }

    #[tokio::test]
    async fn test_failed_fetch_is_isolated_to_its_checkers() {
        let memory = InMemoryGateway::seeded(
            vec![User::new("u1", "a@x.com")],
            vec![Team::new("t1", "Night shift").with_leaders(["u9"])],
            vec![],
            vec![],
        );
        memory.routines.fail_on(StoreOperation::List).await;

        let report = run_all_checks(&memory.gateway(), &IntegrityConfig::default()).await;

        // Every category except team leaders reads routines.
        assert_eq!(report.summary.checks_unavailable, 3);
        assert_eq!(report.summary.checks_failed, 1);
        assert_eq!(
            report.issues_of_kind(IssueKind::OrphanedTeamLeader),
            vec![leader_issue()]
        );
        assert!(!report
            .outcome(IssueCategory::UserAssignments)
            .unwrap()
            .is_available());
    }
}
