//! Team model.

use super::null_as_default;
use crate::gateway::{Entity, EntityKind};
use serde::{Deserialize, Serialize};

/// A team of users.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Team {
    pub id: String,
    pub name: String,
    /// User ids of the team leaders.
    #[serde(default, deserialize_with = "null_as_default")]
    pub leader_ids: Vec<String>,
}

impl Team {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            leader_ids: Vec::new(),
        }
    }

    /// Sets the leader ids.
    pub fn with_leaders<I, S>(mut self, leader_ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.leader_ids = leader_ids.into_iter().map(Into::into).collect();
        self
    }
}

/// Partial update for a team.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TeamPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub leader_ids: Option<Vec<String>>,
}

impl Entity for Team {
    type Patch = TeamPatch;
    const KIND: EntityKind = EntityKind::Team;

    fn id(&self) -> &str {
        &self.id
    }

    fn set_id(&mut self, id: String) {
        self.id = id;
    }

    fn apply_patch(&mut self, patch: &TeamPatch) {
        if let Some(name) = &patch.name {
            self.name = name.clone();
        }
        if let Some(leader_ids) = &patch.leader_ids {
            self.leader_ids = leader_ids.clone();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_null_leader_ids_read_as_empty() {
        let teams: Vec<Team> = serde_json::from_str(
            r#"[{"id": "t1", "name": "Day shift"}, {"id": "t2", "name": "Night shift", "leader_ids": null}]"#,
        )
        .unwrap();
        assert_eq!(teams.len(), 2);
        assert!(teams[1].leader_ids.is_empty());
    }

    #[test]
    fn test_apply_patch_replaces_leaders() {
        let mut team = Team::new("t1", "Day shift").with_leaders(["u1", "u9"]);
        team.apply_patch(&TeamPatch {
            leader_ids: Some(vec!["u1".to_string()]),
            ..Default::default()
        });
        assert_eq!(team.leader_ids, vec!["u1".to_string()]);
        assert_eq!(team.name, "Day shift");
    }
}
