use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// `{apiGroup, kind}` — identifies a resource kind, not a specific instance.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GroupKind {
    pub api_group: String,
    pub kind: String,
}

impl GroupKind {
    pub fn new(api_group: impl Into<String>, kind: impl Into<String>) -> Self {
        Self {
            api_group: api_group.into(),
            kind: kind.into(),
        }
    }
}

impl std::fmt::Display for GroupKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.api_group, self.kind)
    }
}

/// `{apiGroup, kind, name}` — identifies a specific object instance.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ObjectRef {
    pub api_group: String,
    pub kind: String,
    pub name: String,
}

impl ObjectRef {
    pub fn group_kind(&self) -> GroupKind {
        GroupKind::new(self.api_group.clone(), self.kind.clone())
    }
}

/// A fully-qualified object identity: cluster + namespace + name.
///
/// This is the key reconciliation-loop work items carry (§5): "at most one
/// reconciliation in flight" is scoped per `ObjectKey`, and multi-cluster
/// dispatch routes on its `cluster` field.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ObjectKey {
    pub cluster: String,
    pub namespace: String,
    pub name: String,
}

impl std::fmt::Display for ObjectKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}/{}", self.cluster, self.namespace, self.name)
    }
}

/// A label selector over a dimension map — used by an allowance bucket's
/// `dimensionSelector` to decide which claim requests it matches.
///
/// This is intentionally a small subset of Kubernetes `matchLabels`
/// semantics (exact key/value equality, conjunction over all entries); the
/// spec does not ask for `matchExpressions`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LabelSelector {
    pub match_labels: BTreeMap<String, String>,
}

impl LabelSelector {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.match_labels.is_empty()
    }

    /// Whether this selector selects the given dimension map.
    ///
    /// Resolution of the open question on empty-dimension matching (see
    /// SPEC_FULL.md): an empty selector matches anything, including an
    /// empty dimension map; a non-empty selector never matches an empty
    /// dimension map (there is nothing for its keys to match against), and
    /// otherwise matches iff every `match_labels` entry is present with an
    /// equal value in `dimensions`.
    pub fn selects(&self, dimensions: &BTreeMap<String, String>) -> bool {
        if self.match_labels.is_empty() {
            return true;
        }
        if dimensions.is_empty() {
            return false;
        }
        self.match_labels
            .iter()
            .all(|(k, v)| dimensions.get(k) == Some(v))
    }
}
