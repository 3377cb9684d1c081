//! Integrity checkers.
//!
//! The scans here are pure: they take already-fetched collections plus the
//! relevant [`KeySet`] and lazily yield one [`Issue`] per offending entity.
//! [`fetch_and_check`] wraps them with the gateway reads each category needs.

use super::config::ExecutionWindow;
use super::index::KeySet;
use super::issue::{Issue, IssueCategory};
use crate::gateway::{EntityGateway, GatewayError, ListQuery, SortKey};
use crate::models::{Execution, Routine, Team, User};
use tracing::{debug, warn};

/// Routines assigned to emails with no matching user.
pub fn orphaned_user_assignments<'a>(
    routines: &'a [Routine],
    user_emails: &'a KeySet,
) -> impl Iterator<Item = Issue> + 'a {
    routines.iter().filter_map(move |routine| {
        let assigned = routine.assigned_to.as_deref()?;
        let orphaned = user_emails.missing(assigned);
        (!orphaned.is_empty()).then(|| Issue::OrphanedUserAssignment {
            routine_id: routine.id.clone(),
            routine_title: routine.title.clone(),
            orphaned_emails: orphaned,
        })
    })
}

/// Routines whose assigned or owning teams no longer exist.
///
/// A routine can produce both an assignment issue and an owning-team issue.
pub fn orphaned_routine_teams<'a>(
    routines: &'a [Routine],
    team_ids: &'a KeySet,
) -> impl Iterator<Item = Issue> + 'a {
    routines.iter().flat_map(move |routine| {
        let assignment = routine.assigned_team_ids.as_deref().and_then(|assigned| {
            let orphaned = team_ids.missing(assigned);
            (!orphaned.is_empty()).then(|| Issue::OrphanedTeamAssignmentRoutine {
                routine_id: routine.id.clone(),
                routine_title: routine.title.clone(),
                orphaned_team_ids: orphaned,
            })
        });

        let owning = routine
            .owning_team_id
            .as_deref()
            .filter(|team_id| !team_ids.contains(team_id))
            .map(|team_id| Issue::OrphanedOwningTeam {
                routine_id: routine.id.clone(),
                routine_title: routine.title.clone(),
                owning_team_id: team_id.to_string(),
            });

        assignment.into_iter().chain(owning)
    })
}

/// Users listing teams that no longer exist.
pub fn orphaned_user_teams<'a>(
    users: &'a [User],
    team_ids: &'a KeySet,
) -> impl Iterator<Item = Issue> + 'a {
    users.iter().filter_map(move |user| {
        let orphaned = team_ids.missing(&user.team_ids);
        (!orphaned.is_empty()).then(|| Issue::OrphanedTeamAssignmentUser {
            user_id: user.id.clone(),
            user_email: user.email.clone(),
            orphaned_team_ids: orphaned,
        })
    })
}

/// Teams whose leaders include users that no longer exist.
pub fn orphaned_team_leaders<'a>(
    teams: &'a [Team],
    user_ids: &'a KeySet,
) -> impl Iterator<Item = Issue> + 'a {
    teams.iter().filter_map(move |team| {
        let orphaned = user_ids.missing(&team.leader_ids);
        (!orphaned.is_empty()).then(|| Issue::OrphanedTeamLeader {
            team_id: team.id.clone(),
            team_name: team.name.clone(),
            orphaned_leader_ids: orphaned,
        })
    })
}

/// Executions of routines that no longer exist.
pub fn orphaned_executions<'a>(
    executions: &'a [Execution],
    routine_ids: &'a KeySet,
) -> impl Iterator<Item = Issue> + 'a {
    executions
        .iter()
        .filter(move |execution| !routine_ids.contains(&execution.routine_id))
        .map(|execution| Issue::OrphanedExecution {
            execution_id: execution.id.clone(),
            routine_id: execution.routine_id.clone(),
            executed_by: execution.executed_by.clone(),
            execution_date: execution.execution_date,
        })
}

/// Loads the executions covered by `window`.
pub async fn fetch_executions(
    gateway: &EntityGateway,
    window: ExecutionWindow,
) -> Result<Vec<Execution>, GatewayError> {
    match window {
        ExecutionWindow::Recent { limit } => {
            let query = ListQuery::all()
                .sorted_by(SortKey::desc("execution_date"))
                .limit(limit);
            gateway.executions.list(&query).await
        }
        ExecutionWindow::Full { page_size } => {
            let mut executions = Vec::new();
            let mut previous_first: Option<String> = None;
            loop {
                let query = ListQuery::all()
                    .sorted_by(SortKey::desc("execution_date"))
                    .limit(page_size)
                    .skip(executions.len());
                let page = gateway.executions.list(&query).await?;
                let Some(first) = page.first().map(|e| e.id.clone()) else {
                    break;
                };
                // A store that ignores `skip` keeps returning the same page.
                if previous_first.as_deref() == Some(first.as_str()) {
                    warn!(
                        fetched = executions.len(),
                        "Execution page repeated, stopping full scan"
                    );
                    break;
                }
                let last_page = page.len() < page_size;
                executions.extend(page);
                debug!(fetched = executions.len(), "Fetched execution page");
                if last_page {
                    break;
                }
                previous_first = Some(first);
            }
            Ok(executions)
        }
    }
}

/// Fetches the collections `category` needs and runs its scan.
pub async fn fetch_and_check(
    gateway: &EntityGateway,
    category: IssueCategory,
    window: ExecutionWindow,
) -> Result<Vec<Issue>, GatewayError> {
    match category {
        IssueCategory::UserAssignments => {
            let (routines, users) =
                tokio::try_join!(gateway.routines.list_all(), gateway.users.list_all())?;
            let emails = KeySet::emails(&users);
            Ok(orphaned_user_assignments(&routines, &emails).collect())
        }
        IssueCategory::TeamAssignments => {
            let (routines, users, teams) = tokio::try_join!(
                gateway.routines.list_all(),
                gateway.users.list_all(),
                gateway.teams.list_all()
            )?;
            let team_ids = KeySet::ids(&teams);
            Ok(orphaned_routine_teams(&routines, &team_ids)
                .chain(orphaned_user_teams(&users, &team_ids))
                .collect())
        }
        IssueCategory::TeamLeaders => {
            let (teams, users) =
                tokio::try_join!(gateway.teams.list_all(), gateway.users.list_all())?;
            let user_ids = KeySet::ids(&users);
            Ok(orphaned_team_leaders(&teams, &user_ids).collect())
        }
        IssueCategory::Executions => {
            let (executions, routines) = tokio::try_join!(
                fetch_executions(gateway, window),
                gateway.routines.list_all()
            )?;
            let routine_ids = KeySet::ids(&routines);
            Ok(orphaned_executions(&executions, &routine_ids).collect())
        }
    }
}
