use quota_core::GroupKind;
use quota_expr::Value;
use std::collections::BTreeMap;

/// Who or what originated the admission request that produced this trigger
/// object, when known (§4.K `user`, `requestInfo`).
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Requester {
    pub user: Option<String>,
    pub request_info: BTreeMap<String, String>,
}

/// A trigger object observed by a dynamic informer: enough of its identity
/// and shape for policy conditions and templates to reference via
/// `trigger.*` (§4.K).
#[derive(Debug, Clone, PartialEq)]
pub struct TriggerObject {
    pub group_kind: GroupKind,
    pub namespace: String,
    pub name: String,
    pub labels: BTreeMap<String, String>,
    pub annotations: BTreeMap<String, String>,
    /// The object's full body, for fields the evaluation context exposes
    /// beyond metadata (e.g. `trigger.spec.region`).
    pub body: serde_json::Value,
}

impl TriggerObject {
    /// Build the `quota-expr` evaluation value for `trigger.*` member
    /// access: `metadata.{name,namespace,labels,annotations}` plus whatever
    /// the object's own body contributes at the top level.
    pub fn to_expr_value(&self) -> Value {
        let mut metadata = BTreeMap::new();
        metadata.insert("name".to_string(), Value::String(self.name.clone()));
        metadata.insert("namespace".to_string(), Value::String(self.namespace.clone()));
        metadata.insert("labels".to_string(), map_to_value(&self.labels));
        metadata.insert("annotations".to_string(), map_to_value(&self.annotations));

        let mut root = match json_to_value(&self.body) {
            Value::Map(m) => m,
            _ => BTreeMap::new(),
        };
        root.insert("metadata".to_string(), Value::Map(metadata));
        Value::Map(root)
    }
}

fn map_to_value(m: &BTreeMap<String, String>) -> Value {
    Value::Map(m.iter().map(|(k, v)| (k.clone(), Value::String(v.clone()))).collect())
}

/// Converts a JSON value into the expression evaluator's value type. Floats
/// with no exact `i64` representation and `null`-typed keys are lossy by
/// construction (the expression language has no float type); this is the
/// same narrowing a Kubernetes-style dynamic client applies to unstructured
/// content before offering it to a templating layer.
fn json_to_value(json: &serde_json::Value) -> Value {
    match json {
        serde_json::Value::Null => Value::Null,
        serde_json::Value::Bool(b) => Value::Bool(*b),
        serde_json::Value::Number(n) => n.as_i64().map(Value::Int).unwrap_or(Value::Null),
        serde_json::Value::String(s) => Value::String(s.clone()),
        serde_json::Value::Array(items) => Value::List(items.iter().map(json_to_value).collect()),
        serde_json::Value::Object(map) => {
            Value::Map(map.iter().map(|(k, v)| (k.clone(), json_to_value(v))).collect())
        }
    }
}

/// `TriggerEvent` (§4.K): the two kinds of update a dynamic informer
/// forwards for a watched trigger kind.
#[derive(Debug, Clone, PartialEq)]
pub enum TriggerEvent {
    Upsert(TriggerObject),
    Delete { namespace: String, name: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expr_value_exposes_metadata_and_body() {
        let obj = TriggerObject {
            group_kind: GroupKind::new("group.example", "Project"),
            namespace: "acme".into(),
            name: "p42".into(),
            labels: BTreeMap::new(),
            annotations: BTreeMap::new(),
            body: serde_json::json!({"spec": {"region": "eu"}}),
        };
        let value = obj.to_expr_value();
        let ctx = quota_expr::Context::new().with("trigger", value);
        let compiled = quota_expr::compile_string("trigger.metadata.name", &["trigger"]).unwrap();
        assert_eq!(compiled.eval_string(&ctx).unwrap(), "p42");
        let compiled = quota_expr::compile_string("trigger.spec.region", &["trigger"]).unwrap();
        assert_eq!(compiled.eval_string(&ctx).unwrap(), "eu");
    }
}
