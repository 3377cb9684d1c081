//! Entitlement types.
//!
//! - `Feature`: a gated capability of the dashboard
//! - `TierMatrix`: which features each subscription tier unlocks
//! - `EntitlementError`: error types

use crate::models::Tier;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Errors that can occur while building entitlement policy.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EntitlementError {
    /// Feature name not recognized.
    #[error("Unknown feature: {0}")]
    UnknownFeature(String),

    /// Tier name not recognized.
    #[error("Unknown tier: {0}")]
    UnknownTier(String),
}

/// A capability gated by subscription tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Feature {
    /// Filtering dashboards by team, status and date ranges.
    AdvancedFilters,
    /// Analytics views over executions.
    Analytics,
    /// CSV export of routines and executions.
    CsvExport,
    /// Creating teams and assigning leaders.
    TeamManagement,
    /// Persisted audit trail of administrative actions.
    AuditLogging,
    /// Integrity checks and repairs.
    DataIntegrity,
}

impl Feature {
    /// Returns every feature.
    pub fn all() -> [Feature; 6] {
        [
            Feature::AdvancedFilters,
            Feature::Analytics,
            Feature::CsvExport,
            Feature::TeamManagement,
            Feature::AuditLogging,
            Feature::DataIntegrity,
        ]
    }

    /// Returns the feature name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Feature::AdvancedFilters => "advanced_filters",
            Feature::Analytics => "analytics",
            Feature::CsvExport => "csv_export",
            Feature::TeamManagement => "team_management",
            Feature::AuditLogging => "audit_logging",
            Feature::DataIntegrity => "data_integrity",
        }
    }
}

impl fmt::Display for Feature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Feature {
    type Err = EntitlementError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Feature::all()
            .into_iter()
            .find(|f| f.as_str() == s)
            .ok_or_else(|| EntitlementError::UnknownFeature(s.to_string()))
    }
}

/// Features unlocked per tier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TierMatrix {
    tiers: BTreeMap<Tier, BTreeSet<Feature>>,
}

impl Default for TierMatrix {
    /// Free unlocks nothing, Pro unlocks the reporting features, Pro Plus
    /// unlocks everything.
    fn default() -> Self {
        let pro: BTreeSet<Feature> = [
            Feature::AdvancedFilters,
            Feature::Analytics,
            Feature::CsvExport,
        ]
        .into_iter()
        .collect();

        let mut tiers = BTreeMap::new();
        tiers.insert(Tier::Free, BTreeSet::new());
        tiers.insert(Tier::Pro, pro);
        tiers.insert(Tier::ProPlus, Feature::all().into_iter().collect());
        Self { tiers }
    }
}

impl TierMatrix {
    /// Creates a matrix where no tier unlocks anything.
    pub fn empty() -> Self {
        Self {
            tiers: BTreeMap::new(),
        }
    }

    /// Replaces the features of a tier.
    pub fn with_tier<I>(mut self, tier: Tier, features: I) -> Self
    where
        I: IntoIterator<Item = Feature>,
    {
        self.tiers.insert(tier, features.into_iter().collect());
        self
    }

    /// Builds a matrix from tier and feature names, as found in configuration.
    ///
    /// Tiers missing from `names` unlock nothing.
    pub fn from_names(names: &BTreeMap<String, Vec<String>>) -> Result<Self, EntitlementError> {
        let mut matrix = Self::empty();
        for (tier_name, feature_names) in names {
            let tier: Tier = tier_name
                .parse()
                .map_err(|_| EntitlementError::UnknownTier(tier_name.clone()))?;
            let features = feature_names
                .iter()
                .map(|name| name.parse::<Feature>())
                .collect::<Result<BTreeSet<_>, _>>()?;
            matrix.tiers.insert(tier, features);
        }
        Ok(matrix)
    }

    /// Returns true if `tier` unlocks `feature`.
    pub fn unlocks(&self, tier: Tier, feature: Feature) -> bool {
        self.tiers
            .get(&tier)
            .map(|features| features.contains(&feature))
            .unwrap_or(false)
    }

    /// Features unlocked by `tier`.
    pub fn features(&self, tier: Tier) -> Vec<Feature> {
        self.tiers
            .get(&tier)
            .map(|features| features.iter().copied().collect())
            .unwrap_or_default()
    }
}
