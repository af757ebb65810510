use async_trait::async_trait;
use quota_core::QuotaError;
use tokio::sync::mpsc;

/// An object as stored: its spec/status payload plus the two fields every
/// optimistic-concurrency write needs (§5, §6).
#[derive(Debug, Clone, PartialEq)]
pub struct Stored<T> {
    pub name: String,
    pub namespace: String,
    pub generation: i64,
    pub resource_version: String,
    pub value: T,
}

#[derive(Debug, Clone, PartialEq)]
pub enum WatchEvent<T> {
    Upsert(Stored<T>),
    Delete { namespace: String, name: String },
}

/// The external object-store client abstraction (§6): `get`, `list`,
/// `watch`, `create`, `update`, `statusUpdate`, `patch(serverSideApply)`.
///
/// `update` and `status_update` take the caller's last-observed
/// `resource_version` and fail with [`QuotaError::Conflict`] when the
/// stored version has since moved — the only concurrency control this
/// abstraction provides (§5 "all object writes are optimistic").
#[async_trait]
pub trait ObjectStore<T>: Send + Sync
where
    T: Clone + Send + Sync + 'static,
{
    async fn get(&self, namespace: &str, name: &str) -> Result<Option<Stored<T>>, QuotaError>;
    async fn list(&self, namespace: &str) -> Result<Vec<Stored<T>>, QuotaError>;
    async fn watch(&self) -> Result<mpsc::Receiver<WatchEvent<T>>, QuotaError>;

    /// Create-if-absent is the caller's responsibility: this method always
    /// fails with `Conflict` if the name already exists, so reconcilers can
    /// treat that specific failure as success (§5 "AlreadyExists is
    /// success").
    async fn create(&self, namespace: &str, name: &str, value: T) -> Result<Stored<T>, QuotaError>;

    async fn update(&self, namespace: &str, name: &str, resource_version: &str, value: T) -> Result<Stored<T>, QuotaError>;

    /// Server-side-apply of just the status subresource, scoped to
    /// `field_manager` (§4.G, §5).
    async fn status_update(
        &self,
        namespace: &str,
        name: &str,
        resource_version: &str,
        field_manager: &str,
        value: T,
    ) -> Result<Stored<T>, QuotaError>;

    async fn delete(&self, namespace: &str, name: &str) -> Result<(), QuotaError>;
}
