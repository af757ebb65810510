//! Lifecycle sub-controllers conceptually part of §4.K: cascading deletes
//! of auto-created children when their trigger disappears, and cleanup of
//! auto-created claims that have been Denied for too long.

use chrono::{DateTime, Utc};
use quota_core::{Conditions, ConditionStatus};
use std::time::Duration;

/// The slice of an auto-created child's metadata the lifecycle controller
/// needs: its own identity plus the trigger it was recorded against via
/// [`crate::render::TRIGGER_NAMESPACE_ANNOTATION`] / [`crate::render::TRIGGER_NAME_ANNOTATION`].
#[derive(Debug, Clone, PartialEq)]
pub struct ChildRef {
    pub namespace: String,
    pub name: String,
    pub owner_trigger_namespace: String,
    pub owner_trigger_name: String,
}

/// Ownership cascade (§4.K lifecycle, "Ownership"): when a trigger object
/// `(trigger_namespace, trigger_name)` is deleted, every child recorded
/// against it must be deleted too.
pub fn children_to_delete_on_trigger_removal<'a>(
    trigger_namespace: &str,
    trigger_name: &str,
    children: &'a [ChildRef],
) -> Vec<&'a ChildRef> {
    children
        .iter()
        .filter(|c| c.owner_trigger_namespace == trigger_namespace && c.owner_trigger_name == trigger_name)
        .collect()
}

/// Denied-auto-claim cleanup (§4.K lifecycle, §9 Open Question resolved as
/// `Config::denied_claim_grace`): true once a claim's `Granted` condition
/// has read `False, reason=Denied` continuously for at least `grace`.
/// Callers should only invoke this for claims carrying the
/// `created-by-policy` annotation — hand-authored claims are never swept.
pub fn should_delete_denied_claim(conditions: &Conditions, now: DateTime<Utc>, grace: Duration) -> bool {
    let Some(granted) = conditions.get("Granted") else {
        return false;
    };
    if granted.status != ConditionStatus::False || granted.reason != "Denied" {
        return false;
    }
    let grace = chrono::Duration::from_std(grace).unwrap_or(chrono::Duration::zero());
    now - granted.last_transition_time >= grace
}

#[cfg(test)]
mod tests {
    use super::*;

    fn child(ns: &str, name: &str, trigger_ns: &str, trigger_name: &str) -> ChildRef {
        ChildRef {
            namespace: ns.into(),
            name: name.into(),
            owner_trigger_namespace: trigger_ns.into(),
            owner_trigger_name: trigger_name.into(),
        }
    }

    #[test]
    fn cascade_finds_only_matching_children() {
        let children = vec![
            child("acme", "claim-a", "acme", "p42"),
            child("acme", "claim-b", "acme", "p43"),
        ];
        let matches = children_to_delete_on_trigger_removal("acme", "p42", &children);
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].name, "claim-a");
    }

    #[test]
    fn denied_claim_past_grace_is_deleted() {
        let mut conditions = Conditions::new();
        let t0 = Utc::now() - chrono::Duration::hours(1);
        conditions.set("Granted", ConditionStatus::False, "Denied", "no capacity", 1, t0);
        assert!(should_delete_denied_claim(&conditions, Utc::now(), Duration::from_secs(600)));
    }

    #[test]
    fn recently_denied_claim_is_kept() {
        let mut conditions = Conditions::new();
        conditions.set("Granted", ConditionStatus::False, "Denied", "no capacity", 1, Utc::now());
        assert!(!should_delete_denied_claim(&conditions, Utc::now(), Duration::from_secs(600)));
    }

    #[test]
    fn pending_claim_is_never_swept() {
        let mut conditions = Conditions::new();
        let t0 = Utc::now() - chrono::Duration::hours(1);
        conditions.set("Granted", ConditionStatus::False, "Pending", "0 of 1 requests still pending", 1, t0);
        assert!(!should_delete_denied_claim(&conditions, Utc::now(), Duration::from_secs(600)));
    }

    #[test]
    fn granted_claim_is_never_swept() {
        let mut conditions = Conditions::new();
        let t0 = Utc::now() - chrono::Duration::hours(1);
        conditions.set("Granted", ConditionStatus::True, "Granted", "all requests granted", 1, t0);
        assert!(!should_delete_denied_claim(&conditions, Utc::now(), Duration::from_secs(600)));
    }
}
