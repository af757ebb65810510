//! Glue between `quota-policy`'s compiled templates and a real
//! [`ObjectStore`]: applying a [`Materialization`] as a create call, and
//! deleting the children a lifecycle sub-controller names.
//!
//! `quota-policy` and `quota-reconcile` stop at "here is the decision";
//! this module is the thin, storage-aware layer the design's reconcilers
//! all defer to, the same seam `quota-aggregate`'s callers are expected to
//! close themselves.

use quota_core::QuotaError;
use quota_events::{Requester, TriggerEvent, TriggerObject};
use quota_policy::{ChildRef, Materialization, PolicyEntry};
use quota_store::ObjectStore;

/// Alphabet `kube-apiserver` draws generateName suffixes from: lowercase
/// alphanumerics with the characters that read ambiguously in a terminal
/// removed (`0/o`, `1/l/i` and friends already excluded upstream).
const GENERATE_NAME_ALPHABET: &[u8] = b"bcdfghjklmnpqrstvwxz0123456789";
const GENERATE_NAME_SUFFIX_LEN: usize = 5;
const GENERATE_NAME_MAX_ATTEMPTS: usize = 5;

fn generate_name_suffix() -> String {
    use rand::Rng;
    let mut rng = rand::thread_rng();
    (0..GENERATE_NAME_SUFFIX_LEN)
        .map(|_| GENERATE_NAME_ALPHABET[rng.gen_range(0..GENERATE_NAME_ALPHABET.len())] as char)
        .collect()
}

/// Apply a rendered [`Materialization`] against `store`.
///
/// `CreateIfAbsent` treats a `Conflict` from `create` as success, per
/// `ObjectStore::create`'s documented "AlreadyExists is success" contract.
/// `AlwaysCreate` retries under a fresh generated name on conflict, the
/// same race `kube-apiserver` resolves the same way for `generateName`.
pub async fn apply_materialization<T, S>(store: &S, materialization: Materialization<T>) -> Result<(), QuotaError>
where
    T: Clone + Send + Sync + 'static,
    S: ObjectStore<T> + ?Sized,
{
    match materialization {
        Materialization::CreateIfAbsent { name, namespace, value } => match store.create(&namespace, &name, value).await {
            Ok(_) => Ok(()),
            Err(QuotaError::Conflict(_)) => Ok(()),
            Err(err) => Err(err),
        },
        Materialization::AlwaysCreate {
            generate_name,
            namespace,
            value,
        } => {
            for _ in 0..GENERATE_NAME_MAX_ATTEMPTS {
                let name = format!("{generate_name}{}", generate_name_suffix());
                match store.create(&namespace, &name, value.clone()).await {
                    Ok(_) => return Ok(()),
                    Err(QuotaError::Conflict(_)) => continue,
                    Err(err) => return Err(err),
                }
            }
            Err(QuotaError::Transient(format!(
                "exhausted {GENERATE_NAME_MAX_ATTEMPTS} attempts generating a name from prefix {generate_name}"
            )))
        }
    }
}

fn render_error_to_quota_error(err: quota_policy::RenderError) -> QuotaError {
    // A Ready policy's templates were already compiled and grammar-checked;
    // a failure here means the trigger body didn't shape up the way the
    // policy assumed, which is a data problem the policy's author needs to
    // fix, not a transient condition.
    QuotaError::InvalidSpec(err.to_string())
}

/// Drive the claim side of the auto-creation controller (the rendering
/// half of the design's policy step) for one observed trigger event:
/// evaluate every policy already known to watch this trigger kind, render
/// the ones whose condition matches, and materialize the result.
///
/// `policies` should already be filtered to the trigger's kind via
/// [`quota_policy::TriggerPolicyIndex::policies_for`]; entries for grant
/// policies are silently skipped. Returns the number of claims
/// materialized.
pub async fn handle_claim_trigger_event<S>(
    event: &TriggerEvent,
    requester: &Requester,
    policies: &[PolicyEntry],
    store: &S,
) -> Result<usize, QuotaError>
where
    S: ObjectStore<quota_core::model::ResourceClaimSpec> + ?Sized,
{
    let TriggerEvent::Upsert(trigger) = event else {
        return Ok(0);
    };
    let ctx = quota_policy::claim_context(trigger, requester);
    let mut applied = 0;
    for entry in policies {
        let PolicyEntry::Claim { namespace, name, compiled } = entry else {
            continue;
        };
        if !compiled.matches(&ctx).map_err(render_error_to_quota_error)? {
            continue;
        }
        let materialization = compiled
            .render(&ctx, namespace, name, &trigger.namespace, &trigger.name)
            .map_err(render_error_to_quota_error)?;
        apply_materialization(store, materialization).await?;
        applied += 1;
    }
    Ok(applied)
}

/// The grant-side counterpart of [`handle_claim_trigger_event`]: grants
/// have no admission-time requester, so the evaluation context only ever
/// exposes `trigger` (`GRANT_POLICY_VARS`).
pub async fn handle_grant_trigger_event<S>(
    event: &TriggerEvent,
    policies: &[PolicyEntry],
    store: &S,
) -> Result<usize, QuotaError>
where
    S: ObjectStore<quota_core::model::ResourceGrantSpec> + ?Sized,
{
    let TriggerEvent::Upsert(trigger) = event else {
        return Ok(0);
    };
    let ctx = quota_policy::grant_context(trigger);
    let mut applied = 0;
    for entry in policies {
        let PolicyEntry::Grant { namespace, name, compiled } = entry else {
            continue;
        };
        if !compiled.matches(&ctx).map_err(render_error_to_quota_error)? {
            continue;
        }
        let materialization = compiled
            .render(&ctx, namespace, name, &trigger.namespace, &trigger.name)
            .map_err(render_error_to_quota_error)?;
        apply_materialization(store, materialization).await?;
        applied += 1;
    }
    Ok(applied)
}

/// Apply the output of [`quota_policy::children_to_delete_on_trigger_removal`]
/// or a denied-claim sweep: delete each named child, treating "already
/// gone" as success.
pub async fn delete_children<T, S>(store: &S, children: &[&ChildRef]) -> Result<(), QuotaError>
where
    T: Clone + Send + Sync + 'static,
    S: ObjectStore<T> + ?Sized,
{
    for child in children {
        match store.delete(&child.namespace, &child.name).await {
            Ok(()) => {}
            Err(QuotaError::NotFound(_)) => {}
            Err(err) => return Err(err),
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use quota_core::model::{ClaimCreationPolicySpec, ClaimTemplate, ObjectMetaTemplate, ObjectRefTemplate, PolicyTrigger, RequestTemplate};
    use quota_core::GroupKind;
    use quota_policy::CompiledClaimPolicy;
    use quota_store::InMemoryStore;
    use std::collections::BTreeMap;
    use std::sync::Arc;

    fn claim_policy_spec() -> ClaimCreationPolicySpec {
        ClaimCreationPolicySpec {
            trigger: PolicyTrigger {
                api_group: "group.example".into(),
                kind: "Project".into(),
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

    fn trigger_object(namespace: &str, name: &str) -> TriggerObject {
        TriggerObject {
            group_kind: GroupKind::new("group.example", "Project"),
            namespace: namespace.into(),
            name: name.into(),
            labels: BTreeMap::new(),
            annotations: BTreeMap::new(),
            body: serde_json::json!({}),
        }
    }

    #[tokio::test]
    async fn claim_trigger_event_materializes_exactly_one_claim() {
        let compiled = Arc::new(CompiledClaimPolicy::compile(&claim_policy_spec()).unwrap());
        let policies = vec![PolicyEntry::Claim {
            namespace: "acme".into(),
            name: "policy-1".into(),
            compiled,
        }];
        let store: InMemoryStore<quota_core::model::ResourceClaimSpec> = InMemoryStore::new();
        let event = TriggerEvent::Upsert(trigger_object("acme", "p42"));

        let applied = handle_claim_trigger_event(&event, &Requester::default(), &policies, &store)
            .await
            .unwrap();
        assert_eq!(applied, 1);
        assert!(store.get("acme", "p42-claim").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn replaying_the_same_trigger_event_is_idempotent() {
        let compiled = Arc::new(CompiledClaimPolicy::compile(&claim_policy_spec()).unwrap());
        let policies = vec![PolicyEntry::Claim {
            namespace: "acme".into(),
            name: "policy-1".into(),
            compiled,
        }];
        let store: InMemoryStore<quota_core::model::ResourceClaimSpec> = InMemoryStore::new();
        let event = TriggerEvent::Upsert(trigger_object("acme", "p42"));

        handle_claim_trigger_event(&event, &Requester::default(), &policies, &store)
            .await
            .unwrap();
        let applied_again = handle_claim_trigger_event(&event, &Requester::default(), &policies, &store)
            .await
            .unwrap();
        assert_eq!(applied_again, 1);
        assert_eq!(store.list("acme").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn delete_trigger_event_never_materializes() {
        let compiled = Arc::new(CompiledClaimPolicy::compile(&claim_policy_spec()).unwrap());
        let policies = vec![PolicyEntry::Claim {
            namespace: "acme".into(),
            name: "policy-1".into(),
            compiled,
        }];
        let store: InMemoryStore<quota_core::model::ResourceClaimSpec> = InMemoryStore::new();
        let event = TriggerEvent::Delete {
            namespace: "acme".into(),
            name: "p42".into(),
        };

        let applied = handle_claim_trigger_event(&event, &Requester::default(), &policies, &store)
            .await
            .unwrap();
        assert_eq!(applied, 0);
    }

    #[tokio::test]
    async fn delete_children_tolerates_already_gone() {
        let store: InMemoryStore<i64> = InMemoryStore::new();
        let child = ChildRef {
            namespace: "acme".into(),
            name: "already-gone".into(),
            owner_trigger_namespace: "acme".into(),
            owner_trigger_name: "p42".into(),
        };
        delete_children(&store, &[&child]).await.unwrap();
    }
}
