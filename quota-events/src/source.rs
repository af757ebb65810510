use crate::object::TriggerEvent;
use quota_core::GroupKind;
use tokio::sync::mpsc;

/// Opens a list+watch stream for one trigger kind. Implemented by whatever
/// collaborator embeds this core against a real object store; tests
/// implement it directly against fixed event sequences.
#[async_trait::async_trait]
pub trait TriggerSource: Send + Sync {
    async fn watch(&self, kind: &GroupKind) -> Result<mpsc::Receiver<TriggerEvent>, String>;
}
