use quota_core::QuotaError;
use quota_store::{InMemoryStore, ObjectStore, WatchEvent};

#[derive(Debug, Clone, PartialEq)]
struct Widget {
    count: i64,
}

#[tokio::test]
async fn create_get_update_round_trip_bumps_generation_and_resource_version() {
    let store: InMemoryStore<Widget> = InMemoryStore::new();
    let created = store.create("acme", "w1", Widget { count: 1 }).await.unwrap();
    assert_eq!(created.generation, 1);

    let updated = store
        .update("acme", "w1", &created.resource_version, Widget { count: 2 })
        .await
        .unwrap();
    assert_eq!(updated.generation, 2);
    assert_ne!(updated.resource_version, created.resource_version);

    let got = store.get("acme", "w1").await.unwrap().unwrap();
    assert_eq!(got.value, Widget { count: 2 });
}

#[tokio::test]
async fn a_stale_resource_version_conflicts_on_both_update_and_status_update() {
    let store: InMemoryStore<Widget> = InMemoryStore::new();
    let created = store.create("acme", "w1", Widget { count: 1 }).await.unwrap();
    store
        .update("acme", "w1", &created.resource_version, Widget { count: 2 })
        .await
        .unwrap();

    let err = store
        .update("acme", "w1", &created.resource_version, Widget { count: 3 })
        .await
        .unwrap_err();
    assert!(matches!(err, QuotaError::Conflict(_)));

    let err = store
        .status_update("acme", "w1", &created.resource_version, "test-controller", Widget { count: 4 })
        .await
        .unwrap_err();
    assert!(matches!(err, QuotaError::Conflict(_)));
}

#[tokio::test]
async fn create_on_an_existing_name_conflicts_so_callers_can_treat_it_as_already_exists() {
    let store: InMemoryStore<Widget> = InMemoryStore::new();
    store.create("acme", "w1", Widget { count: 1 }).await.unwrap();
    let err = store.create("acme", "w1", Widget { count: 99 }).await.unwrap_err();
    assert!(matches!(err, QuotaError::Conflict(_)));
}

#[tokio::test]
async fn list_is_scoped_to_namespace() {
    let store: InMemoryStore<Widget> = InMemoryStore::new();
    store.create("acme", "w1", Widget { count: 1 }).await.unwrap();
    store.create("acme", "w2", Widget { count: 2 }).await.unwrap();
    store.create("other", "w1", Widget { count: 3 }).await.unwrap();

    let acme_objects = store.list("acme").await.unwrap();
    assert_eq!(acme_objects.len(), 2);
    let other_objects = store.list("other").await.unwrap();
    assert_eq!(other_objects.len(), 1);
}

#[tokio::test]
async fn watch_sees_creates_updates_and_deletes_in_order() {
    let store: InMemoryStore<Widget> = InMemoryStore::new();
    let mut rx = store.watch().await.unwrap();

    let created = store.create("acme", "w1", Widget { count: 1 }).await.unwrap();
    store
        .update("acme", "w1", &created.resource_version, Widget { count: 2 })
        .await
        .unwrap();
    store.delete("acme", "w1").await.unwrap();

    match rx.recv().await.unwrap() {
        WatchEvent::Upsert(s) => assert_eq!(s.value, Widget { count: 1 }),
        other => panic!("expected create upsert, got {other:?}"),
    }
    match rx.recv().await.unwrap() {
        WatchEvent::Upsert(s) => assert_eq!(s.value, Widget { count: 2 }),
        other => panic!("expected update upsert, got {other:?}"),
    }
    match rx.recv().await.unwrap() {
        WatchEvent::Delete { namespace, name } => {
            assert_eq!(namespace, "acme");
            assert_eq!(name, "w1");
        }
        other => panic!("expected delete, got {other:?}"),
    }
}

#[tokio::test]
async fn update_against_a_missing_object_is_not_found() {
    let store: InMemoryStore<Widget> = InMemoryStore::new();
    let err = store.update("acme", "missing", "0", Widget { count: 1 }).await.unwrap_err();
    assert!(matches!(err, QuotaError::NotFound(_)));
}
