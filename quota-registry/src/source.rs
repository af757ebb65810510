use crate::entry::RegistrationEntry;
use tokio::sync::mpsc;

/// A registration event as delivered by the external watch.
///
/// Tombstone deletions arrive as [`RegistrationEvent::Remove`]; a
/// registration that loses `Active=True` is expected to be translated into
/// a `Remove` by the [`RegistrationSource`] implementation, since the cache
/// only ever stores Active registrations (§4.A).
#[derive(Debug, Clone)]
pub enum RegistrationEvent {
    Upsert {
        resource_type: String,
        entry: RegistrationEntry,
    },
    Remove {
        resource_type: String,
    },
    /// Marks the end of the initial list; readers may now trust the cache.
    Synced,
}

/// Supplies the registry cache with a list+watch stream.
///
/// Implementations talk to the external object store (§6); the cache
/// itself performs no I/O beyond consuming the channel this returns.
#[async_trait::async_trait]
pub trait RegistrationSource {
    async fn list_and_watch(&self) -> Result<mpsc::Receiver<RegistrationEvent>, String>;
}
