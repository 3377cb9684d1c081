//! Reference index builder.
//!
//! Builds key sets over fetched collections so checkers can test membership
//! in O(1).

use crate::gateway::Entity;
use crate::models::User;
use std::collections::HashSet;

/// A set of identifying keys (ids or emails) of one collection.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeySet {
    keys: HashSet<String>,
}

impl KeySet {
    /// Index of record ids.
    pub fn ids<T: Entity>(records: &[T]) -> Self {
        records.iter().map(|r| r.id().to_string()).collect()
    }

    /// Index of user emails.
    pub fn emails(users: &[User]) -> Self {
        users.iter().map(|u| u.email.clone()).collect()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.keys.contains(key)
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// References that do not resolve against this index, in first-seen order
    /// and without duplicates.
    pub fn missing(&self, references: &[String]) -> Vec<String> {
        let mut seen = HashSet::new();
        references
            .iter()
            .filter(|r| !self.contains(r.as_str()))
            .filter(|r| seen.insert(r.as_str()))
            .cloned()
            .collect()
    }
}

impl FromIterator<String> for KeySet {
    fn from_iter<I: IntoIterator<Item = String>>(iter: I) -> Self {
        Self {
            keys: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Team;

    fn strings(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    #[test]
    fn test_ids_and_emails() {
        let users = vec![User::new("u1", "a@x.com"), User::new("u2", "b@x.com")];

        let ids = KeySet::ids(&users);
        assert!(ids.contains("u1"));
        assert!(!ids.contains("a@x.com"));

        let emails = KeySet::emails(&users);
        assert!(emails.contains("b@x.com"));
        assert_eq!(emails.len(), 2);
    }

    #[test]
    fn test_empty_collection_gives_empty_index() {
        let index = KeySet::ids::<Team>(&[]);
        assert!(index.is_empty());
        assert_eq!(index.missing(&strings(&["t1"])), strings(&["t1"]));
    }

    #[test]
    fn test_missing_preserves_order_and_dedupes() {
        let index: KeySet = strings(&["a"]).into_iter().collect();
        let missing = index.missing(&strings(&["c", "a", "b", "c"]));

        assert_eq!(missing, strings(&["c", "b"]));
    }
}
