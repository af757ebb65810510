//! Builds the `{trigger, user, requestInfo}` evaluation context (§4.K step
//! 1) that both trigger conditions and templates evaluate against.

use quota_events::{Requester, TriggerObject};
use quota_expr::{Context, Value};

/// Evaluation context for a `ClaimCreationPolicy` (`trigger`, `user`,
/// `requestInfo` are all in scope, per `CLAIM_POLICY_VARS`).
pub fn claim_context(trigger: &TriggerObject, requester: &Requester) -> Context {
    let request_info = Value::Map(
        requester
            .request_info
            .iter()
            .map(|(k, v)| (k.clone(), Value::String(v.clone())))
            .collect(),
    );
    let user = requester.user.clone().map(Value::String).unwrap_or(Value::Null);
    Context::new()
        .with("trigger", trigger.to_expr_value())
        .with("user", user)
        .with("requestInfo", request_info)
}

/// Evaluation context for a `GrantCreationPolicy` (only `trigger` is in
/// scope, per `GRANT_POLICY_VARS`: grants have no admission-time
/// requester).
pub fn grant_context(trigger: &TriggerObject) -> Context {
    Context::new().with("trigger", trigger.to_expr_value())
}
