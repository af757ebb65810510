use chrono::Utc;
use quota_core::model::{
    Allocation, Allowance, BucketAllowance, ResourceClaimSpec, ResourceGrantSpec, ResourceRequest,
};
use quota_core::{Conditions, LabelSelector, ObjectRef};
use quota_reconcile::{
    reconcile_bucket_for_request, reconcile_claim, reconcile_grant, reconcile_summary_for, StoredBucket, StoredClaim,
    StoredGrant, StoredSummary, Verdict,
};
use quota_registry::{RegistrationEntry, RegistrationEvent, ResourceTypeRegistry};
use quota_store::InMemoryStore;
use std::collections::BTreeMap;

fn organization() -> ObjectRef {
    ObjectRef {
        api_group: "group.example".into(),
        kind: "Organization".into(),
        name: "acme".into(),
    }
}

fn project() -> ObjectRef {
    ObjectRef {
        api_group: "group.example".into(),
        kind: "Project".into(),
        name: "web".into(),
    }
}

fn synced_registry() -> ResourceTypeRegistry {
    let registry = ResourceTypeRegistry::new();
    registry.apply_event(RegistrationEvent::Upsert {
        resource_type: "group.example/Project".into(),
        entry: RegistrationEntry {
            registration_name: "project-registration".into(),
            consumer_type: quota_core::GroupKind::new("group.example", "Organization"),
            claiming_resources: vec![quota_core::GroupKind::new("group.example", "Project")],
        },
    });
    registry.apply_event(RegistrationEvent::Synced);
    registry
}

/// Drives a grant from creation through activation, a fitting claim through
/// bucket decision and its own Granted condition, and a summary recompute —
/// the full chain a controller wires across the separate reconcile_* calls.
#[tokio::test]
async fn a_fitting_claim_against_a_freshly_activated_grant_flows_end_to_end() {
    let grants: InMemoryStore<StoredGrant> = InMemoryStore::new();
    let claims: InMemoryStore<StoredClaim> = InMemoryStore::new();
    let buckets: InMemoryStore<StoredBucket> = InMemoryStore::new();
    let summaries: InMemoryStore<StoredSummary> = InMemoryStore::new();
    let registry = synced_registry();

    // --- Phase 1: grant created and activated ---
    let grant_spec = ResourceGrantSpec {
        consumer_ref: organization(),
        allowances: vec![Allowance {
            resource_type: "group.example/Project".into(),
            buckets: vec![BucketAllowance {
                amount: 10,
                dimension_selector: LabelSelector::empty(),
            }],
        }],
    };
    let mut grant_conditions = Conditions::new();
    let outcome = reconcile_grant(&grant_spec, 1, &mut grant_conditions, &registry, Utc::now());
    assert!(outcome.status_changed);
    assert!(grant_conditions.is_true("Active"));
    assert_eq!(outcome.buckets_to_precreate.len(), 1);

    grants
        .create(
            "acme",
            "grant-1",
            StoredGrant {
                spec: grant_spec,
                conditions: grant_conditions,
            },
        )
        .await
        .unwrap();

    // --- Phase 2: claim created and bucket-decided ---
    let claim_spec = ResourceClaimSpec {
        consumer_ref: organization(),
        resource_ref: project(),
        requests: vec![ResourceRequest {
            resource_type: "group.example/Project".into(),
            amount: 4,
            dimensions: BTreeMap::new(),
        }],
    };
    claims
        .create(
            "acme",
            "claim-a",
            StoredClaim {
                spec: claim_spec,
                conditions: Conditions::new(),
                allocations: vec![],
            },
        )
        .await
        .unwrap();

    let verdict = reconcile_bucket_for_request(&grants, &claims, &buckets, "acme", "claim-a", 0)
        .await
        .unwrap();
    assert_eq!(verdict, Verdict::Granted);

    // --- Phase 3: the claim's own Granted condition reflects the allocation ---
    let mut stored_claim = claims.get("acme", "claim-a").await.unwrap().unwrap();
    let mut claim_conditions = stored_claim.value.conditions.clone();
    let changed = reconcile_claim(
        &stored_claim.value.spec,
        &stored_claim.value.allocations,
        1,
        &mut claim_conditions,
        Utc::now(),
    );
    assert!(changed);
    assert!(claim_conditions.is_true("Granted"));
    stored_claim.value.conditions = claim_conditions;
    claims
        .status_update(
            "acme",
            "claim-a",
            &stored_claim.resource_version,
            "test-controller",
            stored_claim.value,
        )
        .await
        .unwrap();

    // --- Phase 4: summary recompute reflects the granted claim ---
    let totals = reconcile_summary_for(&grants, &claims, &summaries, "acme", &organization(), "group.example/Project")
        .await
        .unwrap();
    assert_eq!(totals.total_limit, 10);
    assert_eq!(totals.total_allocated, 4);
    assert_eq!(totals.available, 6);
}

/// Mirrors the racing-claims scenario against real grant activation and
/// claim-condition reconciliation, not just the bucket arithmetic alone.
#[tokio::test]
async fn two_racing_claims_leave_exactly_one_granted_and_one_denied_with_matching_conditions() {
    let grants: InMemoryStore<StoredGrant> = InMemoryStore::new();
    let claims: InMemoryStore<StoredClaim> = InMemoryStore::new();
    let buckets: InMemoryStore<StoredBucket> = InMemoryStore::new();
    let registry = synced_registry();

    let grant_spec = ResourceGrantSpec {
        consumer_ref: organization(),
        allowances: vec![Allowance {
            resource_type: "group.example/Project".into(),
            buckets: vec![BucketAllowance {
                amount: 5,
                dimension_selector: LabelSelector::empty(),
            }],
        }],
    };
    let mut grant_conditions = Conditions::new();
    reconcile_grant(&grant_spec, 1, &mut grant_conditions, &registry, Utc::now());
    grants
        .create(
            "acme",
            "grant-1",
            StoredGrant {
                spec: grant_spec,
                conditions: grant_conditions,
            },
        )
        .await
        .unwrap();

    for (name, amount) in [("claim-a", 3), ("claim-b", 4)] {
        claims
            .create(
                "acme",
                name,
                StoredClaim {
                    spec: ResourceClaimSpec {
                        consumer_ref: organization(),
                        resource_ref: project(),
                        requests: vec![ResourceRequest {
                            resource_type: "group.example/Project".into(),
                            amount,
                            dimensions: BTreeMap::new(),
                        }],
                    },
                    conditions: Conditions::new(),
                    allocations: vec![],
                },
            )
            .await
            .unwrap();
    }

    let verdict_a = reconcile_bucket_for_request(&grants, &claims, &buckets, "acme", "claim-a", 0)
        .await
        .unwrap();
    let verdict_b = reconcile_bucket_for_request(&grants, &claims, &buckets, "acme", "claim-b", 0)
        .await
        .unwrap();
    assert_eq!(verdict_a, Verdict::Granted);
    assert!(matches!(verdict_b, Verdict::Denied { .. }));

    for (name, expect_granted) in [("claim-a", true), ("claim-b", false)] {
        let stored = claims.get("acme", name).await.unwrap().unwrap();
        let mut conditions = stored.value.conditions.clone();
        reconcile_claim(&stored.value.spec, &stored.value.allocations, 1, &mut conditions, Utc::now());
        assert_eq!(conditions.is_true("Granted"), expect_granted);
        let expected_status = if expect_granted {
            quota_core::model::AllocationStatus::Granted
        } else {
            quota_core::model::AllocationStatus::Denied
        };
        assert_eq!(
            stored.value.allocations,
            vec![Allocation {
                resource_type: "group.example/Project".into(),
                status: expected_status,
            }]
        );
    }
}

/// Summary reconciliation correctly reports the non-terminal "no grant yet"
/// race as retryable, and then succeeds once the grant is actually written.
#[tokio::test]
async fn summary_reconciliation_recovers_once_the_dependent_grant_appears() {
    let grants: InMemoryStore<StoredGrant> = InMemoryStore::new();
    let claims: InMemoryStore<StoredClaim> = InMemoryStore::new();
    let summaries: InMemoryStore<StoredSummary> = InMemoryStore::new();
    let registry = synced_registry();

    let err = reconcile_summary_for(&grants, &claims, &summaries, "acme", &organization(), "group.example/Project")
        .await
        .unwrap_err();
    let delay = err.requeue_after().expect("unavailable dependency must carry a requeue delay");
    assert_eq!(delay, std::time::Duration::from_secs(5));

    let grant_spec = ResourceGrantSpec {
        consumer_ref: organization(),
        allowances: vec![Allowance {
            resource_type: "group.example/Project".into(),
            buckets: vec![BucketAllowance {
                amount: 8,
                dimension_selector: LabelSelector::empty(),
            }],
        }],
    };
    let mut grant_conditions = Conditions::new();
    reconcile_grant(&grant_spec, 1, &mut grant_conditions, &registry, Utc::now());
    grants
        .create(
            "acme",
            "grant-1",
            StoredGrant {
                spec: grant_spec,
                conditions: grant_conditions,
            },
        )
        .await
        .unwrap();

    let totals = reconcile_summary_for(&grants, &claims, &summaries, "acme", &organization(), "group.example/Project")
        .await
        .unwrap();
    assert_eq!(totals.total_limit, 8);
    assert_eq!(totals.total_allocated, 0);
}
