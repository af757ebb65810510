//! Resource-type registry cache (§4.A).
//!
//! A process-wide, concurrent, read-mostly map keyed by `resourceType`,
//! populated by a long-running watch on the registration collection. The
//! cache never blocks startup: [`ResourceTypeRegistry::spawn`] hands back a
//! handle immediately and drives the initial list+watch on a background
//! task with infinite exponential backoff, capped at
//! [`quota_core::Config::registry_backoff_cap`].

mod entry;
mod source;

pub use entry::RegistrationEntry;
pub use source::{RegistrationEvent, RegistrationSource};

use dashmap::DashMap;
use quota_core::{Config, GroupKind};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

/// Error returned by [`ResourceTypeRegistry::is_claiming_resource_allowed`].
#[derive(Debug, Clone, PartialEq)]
pub enum ClaimAllowedError {
    /// The resource type has no Active registration.
    NotRegistered(String),
    /// `consumerRef`'s kind doesn't match the registration's `consumerType`.
    ConsumerKindMismatch {
        resource_type: String,
        expected: GroupKind,
        actual: GroupKind,
    },
}

impl std::fmt::Display for ClaimAllowedError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ClaimAllowedError::NotRegistered(rt) => {
                write!(f, "resource type {rt} not available for quota management")
            }
            ClaimAllowedError::ConsumerKindMismatch {
                resource_type,
                expected,
                actual,
            } => write!(
                f,
                "resource type {resource_type} is consumed by {expected}, not {actual}"
            ),
        }
    }
}

/// Process-wide handle to the registry cache. Cheap to clone.
#[derive(Clone)]
pub struct ResourceTypeRegistry {
    inner: Arc<DashMap<String, RegistrationEntry>>,
    synced: Arc<AtomicBool>,
}

impl ResourceTypeRegistry {
    /// Create an empty, unsynced registry. Prefer [`Self::spawn`] in
    /// production; this constructor is mainly useful for tests that drive
    /// `apply_event` directly.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(DashMap::new()),
            synced: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Spawn the background initializer against `source` and return a
    /// handle immediately. Does not block the caller.
    pub fn spawn<S>(source: S, config: &Config) -> Self
    where
        S: RegistrationSource + Send + Sync + 'static,
    {
        let registry = Self::new();
        let handle = registry.clone();
        let backoff_cap = config.registry_backoff_cap;
        tokio::spawn(async move {
            handle.run_initializer(source, backoff_cap).await;
        });
        registry
    }

    async fn run_initializer<S>(&self, source: S, backoff_cap: Duration)
    where
        S: RegistrationSource + Send + Sync + 'static,
    {
        let mut backoff = Duration::from_millis(250);
        loop {
            self.synced.store(false, Ordering::SeqCst);
            match source.list_and_watch().await {
                Ok(mut events) => {
                    tracing::info!("registry cache: list+watch established");
                    backoff = Duration::from_millis(250);
                    self.drain(&mut events).await;
                    tracing::warn!("registry cache: watch stream ended, resyncing");
                }
                Err(err) => {
                    tracing::warn!(error = %err, delay = ?backoff, "registry cache: list+watch failed, retrying");
                }
            }
            tokio::time::sleep(backoff).await;
            backoff = (backoff * 2).min(backoff_cap);
        }
    }

    async fn drain(&self, events: &mut mpsc::Receiver<RegistrationEvent>) {
        // The first batch of events is the initial list; once the source
        // signals end-of-list (a `Synced` event) readers may rely on the
        // cache. Subsequent events are ordinary watch updates, applied in
        // the order received.
        while let Some(event) = events.recv().await {
            match event {
                RegistrationEvent::Synced => self.synced.store(true, Ordering::SeqCst),
                other => self.apply_event(other),
            }
        }
    }

    /// Apply a single watch event. Exposed for tests that want to drive the
    /// cache without a real source.
    pub fn apply_event(&self, event: RegistrationEvent) {
        match event {
            RegistrationEvent::Upsert { resource_type, entry } => {
                self.inner.insert(resource_type, entry);
            }
            RegistrationEvent::Remove { resource_type } => {
                self.inner.remove(&resource_type);
            }
            RegistrationEvent::Synced => self.synced.store(true, Ordering::SeqCst),
        }
    }

    pub fn has_synced(&self) -> bool {
        self.synced.load(Ordering::SeqCst)
    }

    pub fn is_registered(&self, resource_type: &str) -> bool {
        self.inner.contains_key(resource_type)
    }

    /// Validate that `resource_type` is registered. Fails safe (denies)
    /// while the cache has not yet synced, per §4.A.
    pub fn validate_resource_type(&self, resource_type: &str) -> Result<(), String> {
        if !self.has_synced() {
            return Err(format!(
                "resource type {resource_type} not available for quota management (registry not yet synced)"
            ));
        }
        if self.is_registered(resource_type) {
            Ok(())
        } else {
            Err(format!("resource type {resource_type} not available for quota management"))
        }
    }

    pub fn get(&self, resource_type: &str) -> Option<RegistrationEntry> {
        self.inner.get(resource_type).map(|e| e.clone())
    }

    /// Whether `claimer` may claim `resource_type` for `consumer`.
    ///
    /// A clean `Ok(false)` with the allowed list populated is a policy
    /// denial used to build a "forbidden, expected one of: ..." message
    /// (§7); the `Err` variants are registration-shape problems.
    pub fn is_claiming_resource_allowed(
        &self,
        resource_type: &str,
        consumer_kind: &GroupKind,
        claimer: &GroupKind,
    ) -> Result<(bool, Vec<GroupKind>), ClaimAllowedError> {
        if !self.has_synced() {
            return Err(ClaimAllowedError::NotRegistered(resource_type.to_string()));
        }
        let entry = self
            .inner
            .get(resource_type)
            .ok_or_else(|| ClaimAllowedError::NotRegistered(resource_type.to_string()))?;
        if &entry.consumer_type != consumer_kind {
            return Err(ClaimAllowedError::ConsumerKindMismatch {
                resource_type: resource_type.to_string(),
                expected: entry.consumer_type.clone(),
                actual: consumer_kind.clone(),
            });
        }
        Ok((entry.allows_claimer(claimer), entry.claiming_resources.clone()))
    }
}

impl Default for ResourceTypeRegistry {
    fn default() -> Self {
        Self::new()
    }
}
