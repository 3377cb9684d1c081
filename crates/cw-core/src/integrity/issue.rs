//! Issue records produced by the integrity checkers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Relationship class scanned by one checker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueCategory {
    /// Routine → user (by email).
    UserAssignments,
    /// Routine → team and user → team.
    TeamAssignments,
    /// Team → leader user.
    TeamLeaders,
    /// Execution → routine.
    Executions,
}

impl IssueCategory {
    /// Every category, in report order.
    pub fn all() -> [IssueCategory; 4] {
        [
            IssueCategory::UserAssignments,
            IssueCategory::TeamAssignments,
            IssueCategory::TeamLeaders,
            IssueCategory::Executions,
        ]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            IssueCategory::UserAssignments => "user_assignments",
            IssueCategory::TeamAssignments => "team_assignments",
            IssueCategory::TeamLeaders => "team_leaders",
            IssueCategory::Executions => "executions",
        }
    }
}

impl fmt::Display for IssueCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Kind tag of an [`Issue`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueKind {
    OrphanedUserAssignment,
    OrphanedTeamAssignmentRoutine,
    OrphanedTeamAssignmentUser,
    OrphanedOwningTeam,
    OrphanedTeamLeader,
    OrphanedExecution,
}

impl IssueKind {
    pub fn all() -> [IssueKind; 6] {
        [
            IssueKind::OrphanedUserAssignment,
            IssueKind::OrphanedTeamAssignmentRoutine,
            IssueKind::OrphanedTeamAssignmentUser,
            IssueKind::OrphanedOwningTeam,
            IssueKind::OrphanedTeamLeader,
            IssueKind::OrphanedExecution,
        ]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            IssueKind::OrphanedUserAssignment => "orphaned_user_assignment",
            IssueKind::OrphanedTeamAssignmentRoutine => "orphaned_team_assignment_routine",
            IssueKind::OrphanedTeamAssignmentUser => "orphaned_team_assignment_user",
            IssueKind::OrphanedOwningTeam => "orphaned_owning_team",
            IssueKind::OrphanedTeamLeader => "orphaned_team_leader",
            IssueKind::OrphanedExecution => "orphaned_execution",
        }
    }

    /// Checker that produces this kind.
    pub fn category(&self) -> IssueCategory {
        match self {
            IssueKind::OrphanedUserAssignment => IssueCategory::UserAssignments,
            IssueKind::OrphanedTeamAssignmentRoutine
            | IssueKind::OrphanedTeamAssignmentUser
            | IssueKind::OrphanedOwningTeam => IssueCategory::TeamAssignments,
            IssueKind::OrphanedTeamLeader => IssueCategory::TeamLeaders,
            IssueKind::OrphanedExecution => IssueCategory::Executions,
        }
    }
}

impl fmt::Display for IssueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for IssueKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        IssueKind::all()
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| format!("Unknown issue kind: {}", s))
    }
}

/// One orphaned-reference violation, scoped to the entity holding the
/// dangling reference(s).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Issue {
    /// Routine assigned to emails with no matching user.
    #[serde(rename_all = "camelCase")]
    OrphanedUserAssignment {
        routine_id: String,
        routine_title: String,
        orphaned_emails: Vec<String>,
    },
    /// Routine assigned to teams that no longer exist.
    #[serde(rename_all = "camelCase")]
    OrphanedTeamAssignmentRoutine {
        routine_id: String,
        routine_title: String,
        orphaned_team_ids: Vec<String>,
    },
    /// User listing teams that no longer exist.
    #[serde(rename_all = "camelCase")]
    OrphanedTeamAssignmentUser {
        user_id: String,
        user_email: String,
        orphaned_team_ids: Vec<String>,
    },
    /// Routine owned by a team that no longer exists.
    #[serde(rename_all = "camelCase")]
    OrphanedOwningTeam {
        routine_id: String,
        routine_title: String,
        owning_team_id: String,
    },
    /// Team whose leaders include missing users.
    #[serde(rename_all = "camelCase")]
    OrphanedTeamLeader {
        team_id: String,
        team_name: String,
        orphaned_leader_ids: Vec<String>,
    },
    /// Execution of a routine that no longer exists.
    #[serde(rename_all = "camelCase")]
    OrphanedExecution {
        execution_id: String,
        routine_id: String,
        executed_by: String,
        execution_date: DateTime<Utc>,
    },
}

impl Issue {
    pub fn kind(&self) -> IssueKind {
        match self {
            Issue::OrphanedUserAssignment { .. } => IssueKind::OrphanedUserAssignment,
            Issue::OrphanedTeamAssignmentRoutine { .. } => {
                IssueKind::OrphanedTeamAssignmentRoutine
            }
            Issue::OrphanedTeamAssignmentUser { .. } => IssueKind::OrphanedTeamAssignmentUser,
            Issue::OrphanedOwningTeam { .. } => IssueKind::OrphanedOwningTeam,
            Issue::OrphanedTeamLeader { .. } => IssueKind::OrphanedTeamLeader,
            Issue::OrphanedExecution { .. } => IssueKind::OrphanedExecution,
        }
    }

    pub fn category(&self) -> IssueCategory {
        self.kind().category()
    }

    /// Id of the entity holding the dangling reference(s).
    pub fn entity_id(&self) -> &str {
        match self {
            Issue::OrphanedUserAssignment { routine_id, .. }
            | Issue::OrphanedTeamAssignmentRoutine { routine_id, .. }
            | Issue::OrphanedOwningTeam { routine_id, .. } => routine_id,
            Issue::OrphanedTeamAssignmentUser { user_id, .. } => user_id,
            Issue::OrphanedTeamLeader { team_id, .. } => team_id,
            Issue::OrphanedExecution { execution_id, .. } => execution_id,
        }
    }

    /// The references that failed to resolve.
    pub fn dangling_references(&self) -> Vec<&str> {
        match self {
            Issue::OrphanedUserAssignment {
                orphaned_emails, ..
            } => orphaned_emails.iter().map(String::as_str).collect(),
            Issue::OrphanedTeamAssignmentRoutine {
                orphaned_team_ids, ..
            }
            | Issue::OrphanedTeamAssignmentUser {
                orphaned_team_ids, ..
            } => orphaned_team_ids.iter().map(String::as_str).collect(),
            Issue::OrphanedOwningTeam { owning_team_id, .. } => vec![owning_team_id.as_str()],
            Issue::OrphanedTeamLeader {
                orphaned_leader_ids,
                ..
            } => orphaned_leader_ids.iter().map(String::as_str).collect(),
            Issue::OrphanedExecution { routine_id, .. } => vec![routine_id.as_str()],
        }
    }
}

impl fmt::Display for Issue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Issue::OrphanedUserAssignment {
                routine_title,
                orphaned_emails,
                ..
            } => write!(
                f,
                "Routine \"{}\" is assigned to missing users: {}",
                routine_title,
                orphaned_emails.join(", ")
            ),
            Issue::OrphanedTeamAssignmentRoutine {
                routine_title,
                orphaned_team_ids,
                ..
            } => write!(
                f,
                "Routine \"{}\" is assigned to missing teams: {}",
                routine_title,
                orphaned_team_ids.join(", ")
            ),
            Issue::OrphanedTeamAssignmentUser {
                user_email,
                orphaned_team_ids,
                ..
            } => write!(
                f,
                "User {} belongs to missing teams: {}",
                user_email,
                orphaned_team_ids.join(", ")
            ),
            Issue::OrphanedOwningTeam {
                routine_title,
                owning_team_id,
                ..
            } => write!(
                f,
                "Routine \"{}\" is owned by missing team {}",
                routine_title, owning_team_id
            ),
            Issue::OrphanedTeamLeader {
                team_name,
                orphaned_leader_ids,
                ..
            } => write!(
                f,
                "Team \"{}\" has missing leaders: {}",
                team_name,
                orphaned_leader_ids.join(", ")
            ),
            Issue::OrphanedExecution {
                execution_id,
                routine_id,
                ..
            } => write!(
                f,
                "Execution {} references missing routine {}",
                execution_id, routine_id
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_issue_serializes_with_type_tag_and_camel_case_fields() {
        let issue = Issue::OrphanedUserAssignment {
            routine_id: "r1".to_string(),
            routine_title: "Line check".to_string(),
            orphaned_emails: vec!["b@x.com".to_string()],
        };

        assert_eq!(
            serde_json::to_value(&issue).unwrap(),
            json!({
                "type": "orphaned_user_assignment",
                "routineId": "r1",
                "routineTitle": "Line check",
                "orphanedEmails": ["b@x.com"],
            })
        );
    }

    #[test]
    fn test_kind_parsing() {
        for kind in IssueKind::all() {
            assert_eq!(kind.as_str().parse::<IssueKind>().unwrap(), kind);
        }
        assert!("orphaned_anything".parse::<IssueKind>().is_err());
    }

    #[test]
    fn test_kind_categories() {
        assert_eq!(
            IssueKind::OrphanedOwningTeam.category(),
            IssueCategory::TeamAssignments
        );
        assert_eq!(
            IssueKind::OrphanedExecution.category(),
            IssueCategory::Executions
        );
    }

    #[test]
    fn test_entity_id_and_references() {
        let issue = Issue::OrphanedTeamLeader {
            team_id: "t1".to_string(),
            team_name: "Night shift".to_string(),
            orphaned_leader_ids: vec!["u9".to_string()],
        };

        assert_eq!(issue.entity_id(), "t1");
        assert_eq!(issue.dangling_references(), vec!["u9"]);
        assert_eq!(issue.to_string(), "Team \"Night shift\" has missing leaders: u9");
    }
}
