use crate::client::{ObjectStore, Stored, WatchEvent};
use async_trait::async_trait;
use dashmap::DashMap;
use quota_core::QuotaError;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;

/// An in-memory [`ObjectStore`] double for tests (§9 "test tooling").
/// Namespaced by `(namespace, name)`, resource versions are a monotonic
/// counter so optimistic-concurrency conflicts are reproducible.
pub struct InMemoryStore<T> {
    objects: DashMap<(String, String), Stored<T>>,
    version_counter: AtomicI64,
    watchers: Mutex<Vec<mpsc::Sender<WatchEvent<T>>>>,
}

impl<T> InMemoryStore<T> {
    pub fn new() -> Self {
        Self {
            objects: DashMap::new(),
            version_counter: AtomicI64::new(0),
            watchers: Mutex::new(Vec::new()),
        }
    }

    fn next_version(&self) -> String {
        self.version_counter.fetch_add(1, Ordering::SeqCst).to_string()
    }
}

impl<T> Default for InMemoryStore<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Clone + Send + Sync + 'static> InMemoryStore<T> {
    fn broadcast(&self, event: WatchEvent<T>) {
        let mut watchers = self.watchers.lock().unwrap();
        watchers.retain(|tx| tx.try_send(event.clone()).is_ok());
    }
}

#[async_trait]
impl<T: Clone + Send + Sync + 'static> ObjectStore<T> for InMemoryStore<T> {
    async fn get(&self, namespace: &str, name: &str) -> Result<Option<Stored<T>>, QuotaError> {
        Ok(self
            .objects
            .get(&(namespace.to_string(), name.to_string()))
            .map(|e| e.clone()))
    }

    async fn list(&self, namespace: &str) -> Result<Vec<Stored<T>>, QuotaError> {
        Ok(self
            .objects
            .iter()
            .filter(|e| e.key().0 == namespace)
            .map(|e| e.value().clone())
            .collect())
    }

    async fn watch(&self) -> Result<mpsc::Receiver<WatchEvent<T>>, QuotaError> {
        let (tx, rx) = mpsc::channel(256);
        self.watchers.lock().unwrap().push(tx);
        Ok(rx)
    }

    async fn create(&self, namespace: &str, name: &str, value: T) -> Result<Stored<T>, QuotaError> {
        let key = (namespace.to_string(), name.to_string());
        if self.objects.contains_key(&key) {
            return Err(QuotaError::Conflict(format!("{namespace}/{name} already exists")));
        }
        let stored = Stored {
            name: name.to_string(),
            namespace: namespace.to_string(),
            generation: 1,
            resource_version: self.next_version(),
            value,
        };
        self.objects.insert(key, stored.clone());
        self.broadcast(WatchEvent::Upsert(stored.clone()));
        Ok(stored)
    }

    async fn update(
        &self,
        namespace: &str,
        name: &str,
        resource_version: &str,
        value: T,
    ) -> Result<Stored<T>, QuotaError> {
        let key = (namespace.to_string(), name.to_string());
        let mut entry = self
            .objects
            .get_mut(&key)
            .ok_or_else(|| QuotaError::NotFound(format!("{namespace}/{name}")))?;
        if entry.resource_version != resource_version {
            return Err(QuotaError::Conflict(format!(
                "{namespace}/{name} resourceVersion {resource_version} is stale"
            )));
        }
        entry.generation += 1;
        entry.resource_version = self.next_version();
        entry.value = value;
        let stored = entry.clone();
        drop(entry);
        self.broadcast(WatchEvent::Upsert(stored.clone()));
        Ok(stored)
    }

    async fn status_update(
        &self,
        namespace: &str,
        name: &str,
        resource_version: &str,
        _field_manager: &str,
        value: T,
    ) -> Result<Stored<T>, QuotaError> {
        // The in-memory double does not model server-side-apply field
        // ownership; it applies the status value directly and bumps the
        // resource version like any other write.
        self.update(namespace, name, resource_version, value).await
    }

    async fn delete(&self, namespace: &str, name: &str) -> Result<(), QuotaError> {
        let key = (namespace.to_string(), name.to_string());
        self.objects.remove(&key);
        self.broadcast(WatchEvent::Delete {
            namespace: namespace.to_string(),
            name: name.to_string(),
        });
        Ok(())
    }
}
