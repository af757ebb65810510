use crate::object::TriggerEvent;
use crate::source::TriggerSource;
use dashmap::DashMap;
use quota_core::GroupKind;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;

const BROADCAST_CAPACITY: usize = 1024;

struct Informer {
    tx: broadcast::Sender<TriggerEvent>,
    cancel: CancellationToken,
}

/// Opens (or closes) one informer per distinct `triggerKind` referenced by
/// any Ready policy, as the policy set changes (§4.K). Each informer is a
/// background task that drives `TriggerSource::watch` with the same
/// infinite-backoff retry shape as the registry cache's initializer
/// (`quota-registry`), fanning events out to every subscriber of that kind.
#[derive(Clone)]
pub struct DynamicInformerManager<S> {
    source: Arc<S>,
    informers: Arc<DashMap<GroupKind, Informer>>,
    backoff_cap: Duration,
}

impl<S> DynamicInformerManager<S>
where
    S: TriggerSource + Send + Sync + 'static,
{
    pub fn new(source: S, backoff_cap: Duration) -> Self {
        Self {
            source: Arc::new(source),
            informers: Arc::new(DashMap::new()),
            backoff_cap,
        }
    }

    /// Ensure an informer is running for `kind`, and return a receiver
    /// subscribed to it. Idempotent: calling this again for an already-open
    /// kind just adds another subscriber.
    pub fn ensure_watching(&self, kind: GroupKind) -> broadcast::Receiver<TriggerEvent> {
        if let Some(informer) = self.informers.get(&kind) {
            return informer.tx.subscribe();
        }
        let (tx, rx) = broadcast::channel(BROADCAST_CAPACITY);
        let cancel = CancellationToken::new();
        let informer = Informer {
            tx: tx.clone(),
            cancel: cancel.clone(),
        };
        self.informers.insert(kind.clone(), informer);

        let source = self.source.clone();
        let backoff_cap = self.backoff_cap;
        tokio::spawn(run_informer(kind, source, tx, cancel, backoff_cap));
        rx
    }

    /// Stop and remove the informer for `kind`, e.g. because no Ready
    /// policy references it any longer.
    pub fn stop_watching(&self, kind: &GroupKind) {
        if let Some((_, informer)) = self.informers.remove(kind) {
            informer.cancel.cancel();
        }
    }

    pub fn is_watching(&self, kind: &GroupKind) -> bool {
        self.informers.contains_key(kind)
    }
}

async fn run_informer<S: TriggerSource + Send + Sync + 'static>(
    kind: GroupKind,
    source: Arc<S>,
    tx: broadcast::Sender<TriggerEvent>,
    cancel: CancellationToken,
    backoff_cap: Duration,
) {
    let mut backoff = Duration::from_millis(250);
    loop {
        if cancel.is_cancelled() {
            return;
        }
        tokio::select! {
            _ = cancel.cancelled() => return,
            result = source.watch(&kind) => match result {
                Ok(mut events) => {
                    tracing::info!(%kind, "trigger informer: watch established");
                    backoff = Duration::from_millis(250);
                    loop {
                        tokio::select! {
                            _ = cancel.cancelled() => return,
                            event = events.recv() => match event {
                                Some(event) => { let _ = tx.send(event); }
                                None => break,
                            }
                        }
                    }
                    tracing::warn!(%kind, "trigger informer: watch stream ended, resyncing");
                }
                Err(err) => {
                    tracing::warn!(%kind, error = %err, delay = ?backoff, "trigger informer: watch failed, retrying");
                }
            },
        }
        tokio::time::sleep(backoff).await;
        backoff = (backoff * 2).min(backoff_cap);
    }
}
