//! The `triggerKind -> [policy]` index the auto-creation controller uses to
//! find which Ready policies apply to an observed trigger event, and which
//! the dynamic informer manager uses to know which kinds to watch (§4.J,
//! §4.K).

use crate::render::{CompiledClaimPolicy, CompiledGrantPolicy};
use dashmap::DashMap;
use quota_core::GroupKind;
use std::sync::Arc;

type Key = (String, String);

#[derive(Clone)]
pub enum PolicyEntry {
    Claim {
        namespace: String,
        name: String,
        compiled: Arc<CompiledClaimPolicy>,
    },
    Grant {
        namespace: String,
        name: String,
        compiled: Arc<CompiledGrantPolicy>,
    },
}

impl PolicyEntry {
    fn key(&self) -> Key {
        match self {
            PolicyEntry::Claim { namespace, name, .. } => (namespace.clone(), name.clone()),
            PolicyEntry::Grant { namespace, name, .. } => (namespace.clone(), name.clone()),
        }
    }

    fn trigger_kind(&self) -> GroupKind {
        match self {
            PolicyEntry::Claim { compiled, .. } => compiled.trigger_kind(),
            PolicyEntry::Grant { compiled, .. } => compiled.trigger_kind(),
        }
    }
}

/// A process-wide, concurrent index from trigger kind to the Ready
/// policies that watch it. Cheap to clone.
#[derive(Clone, Default)]
pub struct TriggerPolicyIndex {
    entries: Arc<DashMap<Key, PolicyEntry>>,
    by_kind: Arc<DashMap<GroupKind, Vec<Key>>>,
}

impl TriggerPolicyIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace the entry for `(namespace, name)`. Called whenever
    /// a policy becomes Ready, or is re-validated and remains Ready.
    pub fn upsert(&self, entry: PolicyEntry) {
        let key = entry.key();
        let kind = entry.trigger_kind();
        self.entries.insert(key.clone(), entry);
        self.drop_key_from_all_kinds(&key);
        self.by_kind.entry(kind).or_default().push(key);
    }

    /// Remove the entry for `(namespace, name)`. Called when a policy is
    /// deleted, or stops being Ready.
    pub fn remove(&self, namespace: &str, name: &str) {
        let key = (namespace.to_string(), name.to_string());
        self.entries.remove(&key);
        self.drop_key_from_all_kinds(&key);
    }

    fn drop_key_from_all_kinds(&self, key: &Key) {
        for mut keys in self.by_kind.iter_mut() {
            keys.retain(|k| k != key);
        }
    }

    pub fn policies_for(&self, kind: &GroupKind) -> Vec<PolicyEntry> {
        self.by_kind
            .get(kind)
            .map(|keys| keys.iter().filter_map(|k| self.entries.get(k).map(|e| e.clone())).collect())
            .unwrap_or_default()
    }

    /// Every trigger kind with at least one Ready policy watching it — the
    /// set the dynamic informer manager should keep open (§4.K).
    pub fn trigger_kinds(&self) -> Vec<GroupKind> {
        self.by_kind
            .iter()
            .filter(|e| !e.value().is_empty())
            .map(|e| e.key().clone())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::CompiledClaimPolicy;
    use quota_core::model::{ClaimCreationPolicySpec, ClaimTemplate, ObjectMetaTemplate, ObjectRefTemplate, PolicyTrigger, RequestTemplate};
    use std::collections::BTreeMap;

    fn policy_spec(kind: &str) -> ClaimCreationPolicySpec {
        ClaimCreationPolicySpec {
            trigger: PolicyTrigger {
                api_group: "group.example".into(),
                kind: kind.into(),
                conditions: vec![],
            },
            target: ClaimTemplate {
                metadata: ObjectMetaTemplate {
                    name: Some("{{trigger.metadata.name}}-claim".into()),
                    generate_name: None,
                    namespace: "{{trigger.metadata.namespace}}".into(),
                    labels: BTreeMap::new(),
                    annotations: BTreeMap::new(),
                },
                consumer_ref: ObjectRefTemplate {
                    api_group: "group.example".into(),
                    kind: "Organization".into(),
                    name: "acme".into(),
                },
                resource_ref: ObjectRefTemplate {
                    api_group: "group.example".into(),
                    kind: "Project".into(),
                    name: "{{trigger.metadata.name}}".into(),
                },
                requests: vec![RequestTemplate {
                    resource_type: "group.example/Project".into(),
                    amount: 1,
                    dimensions: BTreeMap::new(),
                }],
            },
        }
    }

    fn entry(namespace: &str, name: &str, kind: &str) -> PolicyEntry {
        PolicyEntry::Claim {
            namespace: namespace.into(),
            name: name.into(),
            compiled: Arc::new(CompiledClaimPolicy::compile(&policy_spec(kind)).unwrap()),
        }
    }

    #[test]
    fn upsert_and_lookup_by_trigger_kind() {
        let index = TriggerPolicyIndex::new();
        index.upsert(entry("acme", "p1", "Project"));
        let kind = GroupKind::new("group.example", "Project");
        assert_eq!(index.policies_for(&kind).len(), 1);
        assert_eq!(index.trigger_kinds(), vec![kind]);
    }

    #[test]
    fn remove_clears_the_kind_when_it_was_the_last_entry() {
        let index = TriggerPolicyIndex::new();
        index.upsert(entry("acme", "p1", "Project"));
        index.remove("acme", "p1");
        assert!(index.trigger_kinds().is_empty());
    }

    #[test]
    fn upsert_replaces_existing_entry_for_same_key() {
        let index = TriggerPolicyIndex::new();
        index.upsert(entry("acme", "p1", "Project"));
        index.upsert(entry("acme", "p1", "Widget"));
        let old_kind = GroupKind::new("group.example", "Project");
        let new_kind = GroupKind::new("group.example", "Widget");
        assert!(index.policies_for(&old_kind).is_empty());
        assert_eq!(index.policies_for(&new_kind).len(), 1);
    }
}
