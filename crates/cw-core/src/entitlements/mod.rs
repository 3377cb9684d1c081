//! Entitlement service for Checkwise.
//!
//! Every feature gate in the product asks the same question: may this user use
//! this feature? [`Entitlements`] answers it from one place:
//! - Suspended users are entitled to nothing
//! - Per-user overrides set by an administrator
//! - The tier matrix (free / pro / pro_plus)
//!
//! # Example
//!
//! ```rust,ignore
//! use cw_core::entitlements::{Entitlements, Feature};
//!
//! let entitlements = Entitlements::default();
//! if entitlements.is_allowed(&user, Feature::AuditLogging) {
//!     // write the audit entry
//! }
//! ```

mod types;

pub use types::{EntitlementError, Feature, TierMatrix};

use crate::models::{User, UserStatus};
use std::collections::HashMap;
use std::sync::RwLock;

/// Central (user, feature) → allowed policy.
///
/// `is_allowed` is synchronous and cheap; it is safe to call from hot paths.
#[derive(Debug, Default)]
pub struct Entitlements {
    matrix: TierMatrix,
    /// Per-user overrides, keyed by user id.
    overrides: RwLock<HashMap<String, HashMap<Feature, bool>>>,
}

impl Entitlements {
    /// Creates the service with the given tier matrix.
    pub fn new(matrix: TierMatrix) -> Self {
        Self {
            matrix,
            overrides: RwLock::new(HashMap::new()),
        }
    }

    /// Returns the tier matrix in use.
    pub fn matrix(&self) -> &TierMatrix {
        &self.matrix
    }

    /// Checks whether `user` may use `feature`.
    ///
    /// # Evaluation Order
    ///
    /// 1. Suspended users are denied everything.
    /// 2. A per-user override for the feature wins if present.
    /// 3. Otherwise the user's tier decides.
    pub fn is_allowed(&self, user: &User, feature: Feature) -> bool {
        if user.status == UserStatus::Suspended {
            return false;
        }

        let overridden = match self.overrides.read() {
            Ok(overrides) => overrides
                .get(&user.id)
                .and_then(|features| features.get(&feature))
                .copied(),
            Err(poisoned) => poisoned
                .into_inner()
                .get(&user.id)
                .and_then(|features| features.get(&feature))
                .copied(),
        };

        overridden.unwrap_or_else(|| self.matrix.unlocks(user.tier, feature))
    }

    /// Sets a per-user override.
    pub fn set_override(&self, user_id: &str, feature: Feature, allowed: bool) {
        let mut overrides = match self.overrides.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        overrides
            .entry(user_id.to_string())
            .or_default()
            .insert(feature, allowed);
    }

    /// Removes a per-user override. Returns true if one existed.
    pub fn remove_override(&self, user_id: &str, feature: Feature) -> bool {
        let mut overrides = match self.overrides.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        overrides
            .get_mut(user_id)
            .map(|features| features.remove(&feature).is_some())
            .unwrap_or(false)
    }

    /// Lists the features `user` may use.
    pub fn allowed_features(&self, user: &User) -> Vec<Feature> {
        Feature::all()
            .into_iter()
            .filter(|feature| self.is_allowed(user, *feature))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Tier;

    fn user(tier: Tier) -> User {
        User::new("u1", "a@x.com").with_tier(tier)
    }

    #[test]
    fn test_free_tier_has_no_audit_logging() {
        let entitlements = Entitlements::default();
        assert!(!entitlements.is_allowed(&user(Tier::Free), Feature::AuditLogging));
    }

    #[test]
    fn test_pro_plus_has_audit_logging() {
        let entitlements = Entitlements::default();
        assert!(entitlements.is_allowed(&user(Tier::ProPlus), Feature::AuditLogging));
    }

    #[test]
    fn test_override_takes_precedence_over_tier() {
        let entitlements = Entitlements::default();
        entitlements.set_override("u1", Feature::AuditLogging, true);

        assert!(entitlements.is_allowed(&user(Tier::Free), Feature::AuditLogging));

        // Overrides are per user.
        let other = User::new("u2", "b@x.com");
        assert!(!entitlements.is_allowed(&other, Feature::AuditLogging));
    }

    #[test]
    fn test_override_can_revoke() {
        let entitlements = Entitlements::default();
        entitlements.set_override("u1", Feature::Analytics, false);

        assert!(!entitlements.is_allowed(&user(Tier::ProPlus), Feature::Analytics));
        assert!(entitlements.remove_override("u1", Feature::Analytics));
        assert!(entitlements.is_allowed(&user(Tier::ProPlus), Feature::Analytics));
        assert!(!entitlements.remove_override("u1", Feature::Analytics));
    }

    #[test]
    fn test_suspended_user_denied_everything() {
        let entitlements = Entitlements::default();
        let mut suspended = user(Tier::ProPlus);
        suspended.status = UserStatus::Suspended;
        entitlements.set_override("u1", Feature::AuditLogging, true);

        assert!(entitlements.allowed_features(&suspended).is_empty());
    }

    #[test]
    fn test_custom_matrix() {
        let matrix = TierMatrix::empty().with_tier(Tier::Free, [Feature::AuditLogging]);
        let entitlements = Entitlements::new(matrix);

        assert_eq!(
            entitlements.allowed_features(&user(Tier::Free)),
            vec![Feature::AuditLogging]
        );
        assert!(entitlements.allowed_features(&user(Tier::ProPlus)).is_empty());
    }
}
