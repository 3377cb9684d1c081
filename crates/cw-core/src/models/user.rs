//! User model.

use super::null_as_default;
use crate::gateway::{Entity, EntityKind};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Role of a user within the organization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Full access, including team management and integrity tooling.
    Admin,
    /// Leads one or more teams.
    Leader,
    /// Regular member executing routines.
    #[default]
    Member,
}

impl Role {
    /// Returns the role name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Leader => "leader",
            Role::Member => "member",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "admin" => Ok(Role::Admin),
            "leader" => Ok(Role::Leader),
            "member" | "user" => Ok(Role::Member),
            _ => Err(format!("Invalid role: {}", s)),
        }
    }
}

/// Subscription tier of a user.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Tier {
    #[default]
    Free,
    Pro,
    ProPlus,
}

impl Tier {
    /// Returns the tier name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Tier::Free => "free",
            Tier::Pro => "pro",
            Tier::ProPlus => "pro_plus",
        }
    }

    /// Returns every tier, lowest first.
    pub fn all() -> [Tier; 3] {
        [Tier::Free, Tier::Pro, Tier::ProPlus]
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Tier {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "free" => Ok(Tier::Free),
            "pro" => Ok(Tier::Pro),
            "pro_plus" | "proplus" => Ok(Tier::ProPlus),
            _ => Err(format!("Invalid tier: {}", s)),
        }
    }
}

/// Account status set by admin actions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserStatus {
    #[default]
    Active,
    Suspended,
}

/// A dashboard user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    /// Unique identifier assigned by the entity store.
    pub id: String,
    /// Email address, unique across users. Routines reference users by email.
    pub email: String,
    /// Display name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub full_name: Option<String>,
    /// Teams this user belongs to.
    #[serde(default, deserialize_with = "null_as_default")]
    pub team_ids: Vec<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub role: Role,
    #[serde(default, deserialize_with = "null_as_default")]
    pub tier: Tier,
    #[serde(default, deserialize_with = "null_as_default")]
    pub status: UserStatus,
}

impl User {
    /// Creates an active member on the free tier.
    pub fn new(id: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            email: email.into(),
            full_name: None,
            team_ids: Vec::new(),
            role: Role::Member,
            tier: Tier::Free,
            status: UserStatus::Active,
        }
    }

    /// Sets the team memberships.
    pub fn with_teams<I, S>(mut self, team_ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.team_ids = team_ids.into_iter().map(Into::into).collect();
        self
    }

    /// Sets the subscription tier.
    pub fn with_tier(mut self, tier: Tier) -> Self {
        self.tier = tier;
        self
    }

    /// Sets the role.
    pub fn with_role(mut self, role: Role) -> Self {
        self.role = role;
        self
    }
}

/// Partial update for a user.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub full_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub team_ids: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<Role>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tier: Option<Tier>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<UserStatus>,
}

impl Entity for User {
    type Patch = UserPatch;
    const KIND: EntityKind = EntityKind::User;

    fn id(&self) -> &str {
        &self.id
    }

    fn set_id(&mut self, id: String) {
        self.id = id;
    }

    fn apply_patch(&mut self, patch: &UserPatch) {
        if let Some(full_name) = &patch.full_name {
            self.full_name = Some(full_name.clone());
        }
        if let Some(team_ids) = &patch.team_ids {
            self.team_ids = team_ids.clone();
        }
        if let Some(role) = patch.role {
            self.role = role;
        }
        if let Some(tier) = patch.tier {
            self.tier = tier;
        }
        if let Some(status) = patch.status {
            self.status = status;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tier_parsing() {
        assert_eq!("pro_plus".parse::<Tier>().unwrap(), Tier::ProPlus);
        assert_eq!("Pro-Plus".parse::<Tier>().unwrap(), Tier::ProPlus);
        assert_eq!("free".parse::<Tier>().unwrap(), Tier::Free);
        assert!("gold".parse::<Tier>().is_err());
    }

    #[test]
    fn test_tier_serialization() {
        let json = serde_json::to_string(&Tier::ProPlus).unwrap();
        assert_eq!(json, "\"pro_plus\"");
    }

    #[test]
    fn test_user_deserializes_without_optional_fields() {
        let user: User = serde_json::from_str(r#"{"id": "u1", "email": "a@x.com"}"#).unwrap();
        assert!(user.team_ids.is_empty());
        assert_eq!(user.role, Role::Member);
        assert_eq!(user.tier, Tier::Free);
        assert_eq!(user.status, UserStatus::Active);
    }

    #[test]
    fn test_user_deserializes_null_fields_as_defaults() {
        let user: User = serde_json::from_str(
            r#"{"id": "u1", "email": "a@x.com", "team_ids": null, "role": null, "tier": null, "status": null}"#,
        )
        .unwrap();
        assert!(user.team_ids.is_empty());
        assert_eq!(user.role, Role::Member);
        assert_eq!(user.tier, Tier::Free);
        assert_eq!(user.status, UserStatus::Active);
    }

    #[test]
    fn test_apply_patch_only_touches_set_fields() {
        let mut user = User::new("u1", "a@x.com").with_teams(["t1", "t2"]);
        user.apply_patch(&UserPatch {
            team_ids: Some(vec!["t1".to_string()]),
            ..Default::default()
        });

        assert_eq!(user.team_ids, vec!["t1".to_string()]);
        assert_eq!(user.email, "a@x.com");
        assert_eq!(user.tier, Tier::Free);
    }
}
