//! Policy readiness reconcilers, the trigger-kind index, template
//! rendering, and lifecycle sub-controllers for the auto-creation
//! controller (§4.J, §4.K).

mod context;
mod index;
mod lifecycle;
mod readiness;
mod render;

pub use context::{claim_context, grant_context};
pub use index::{PolicyEntry, TriggerPolicyIndex};
pub use lifecycle::{children_to_delete_on_trigger_removal, should_delete_denied_claim, ChildRef};
pub use readiness::{reconcile_claim_policy, reconcile_grant_policy};
pub use render::{
    CompiledClaimPolicy, CompiledGrantPolicy, Materialization, PolicyCompileError, RenderError, RenderedMeta,
    CREATED_BY_POLICY_ANNOTATION, TRIGGER_NAMESPACE_ANNOTATION, TRIGGER_NAME_ANNOTATION,
};
