//! Dynamic per-trigger-kind informer manager (§4.K): opens or closes one
//! informer per distinct `triggerKind` referenced by any Ready policy, and
//! fans events out to every subscriber of that kind.

mod manager;
mod object;
mod source;

pub use manager::DynamicInformerManager;
pub use object::{Requester, TriggerEvent, TriggerObject};
pub use source::TriggerSource;
