//! Routine model.

use crate::gateway::{Entity, EntityKind};
use serde::{Deserialize, Serialize};

/// An operational routine (checklist, audit, walkthrough).
///
/// The assignment fields are optional on the wire: a routine created before
/// team assignment existed simply lacks `assigned_team_ids`. An absent field is
/// kept as `None` so it can be told apart from an explicitly empty list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Routine {
    pub id: String,
    pub title: String,
    /// Emails of the users this routine is assigned to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assigned_to: Option<Vec<String>>,
    /// Teams this routine is assigned to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assigned_team_ids: Option<Vec<String>>,
    /// Team that owns the routine.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owning_team_id: Option<String>,
}

impl Routine {
    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            assigned_to: None,
            assigned_team_ids: None,
            owning_team_id: None,
        }
    }

    /// Sets the assigned user emails.
    pub fn assign_users<I, S>(mut self, emails: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.assigned_to = Some(emails.into_iter().map(Into::into).collect());
        self
    }

    /// Sets the assigned team ids.
    pub fn assign_teams<I, S>(mut self, team_ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.assigned_team_ids = Some(team_ids.into_iter().map(Into::into).collect());
        self
    }

    /// Sets the owning team.
    pub fn owned_by(mut self, team_id: impl Into<String>) -> Self {
        self.owning_team_id = Some(team_id.into());
        self
    }
}

/// Partial update for a routine.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RoutinePatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assigned_to: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assigned_team_ids: Option<Vec<String>>,
    /// `Some(None)` clears the owning team.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub owning_team_id: Option<Option<String>>,
}

impl Entity for Routine {
    type Patch = RoutinePatch;
    const KIND: EntityKind = EntityKind::Routine;

    fn id(&self) -> &str {
        &self.id
    }

    fn set_id(&mut self, id: String) {
        self.id = id;
    }

    fn apply_patch(&mut self, patch: &RoutinePatch) {
        if let Some(title) = &patch.title {
            self.title = title.clone();
        }
        if let Some(assigned_to) = &patch.assigned_to {
            self.assigned_to = Some(assigned_to.clone());
        }
        if let Some(assigned_team_ids) = &patch.assigned_team_ids {
            self.assigned_team_ids = Some(assigned_team_ids.clone());
        }
        if let Some(owning_team_id) = &patch.owning_team_id {
            self.owning_team_id = owning_team_id.clone();
        }
    }
}
