use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Three-valued condition status, mirroring the Kubernetes convention.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConditionStatus {
    True,
    False,
    Unknown,
}

/// A single status condition: `type=Active` / `reason=ValidationFailed` / ...
///
/// Conditions are kept in an ordered set keyed by `type_` (§9 design note
/// "Status condition arrays"); [`Conditions::set`] is idempotent and only
/// bumps `last_transition_time` when `status` actually changes, which is
/// what lets reconcilers skip a write when nothing semantically changed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Condition {
    #[serde(rename = "type")]
    pub type_: String,
    pub status: ConditionStatus,
    pub reason: String,
    pub message: String,
    pub observed_generation: i64,
    pub last_transition_time: DateTime<Utc>,
}

/// An ordered set of [`Condition`]s, one per `type_`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Conditions(Vec<Condition>);

impl Conditions {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    pub fn get(&self, type_: &str) -> Option<&Condition> {
        self.0.iter().find(|c| c.type_ == type_)
    }

    pub fn as_slice(&self) -> &[Condition] {
        &self.0
    }

    /// Insert or update a condition. Returns `true` if anything about the
    /// stored condition changed (status, reason, message, or generation) —
    /// the caller uses this to decide whether a status write is needed.
    pub fn set(
        &mut self,
        type_: impl Into<String>,
        status: ConditionStatus,
        reason: impl Into<String>,
        message: impl Into<String>,
        observed_generation: i64,
        now: DateTime<Utc>,
    ) -> bool {
        let type_ = type_.into();
        let reason = reason.into();
        let message = message.into();

        if let Some(existing) = self.0.iter_mut().find(|c| c.type_ == type_) {
            let status_changed = existing.status != status;
            let semantic_changed = status_changed
                || existing.reason != reason
                || existing.message != message
                || existing.observed_generation != observed_generation;
            if !semantic_changed {
                return false;
            }
            existing.status = status;
            existing.reason = reason;
            existing.message = message;
            existing.observed_generation = observed_generation;
            if status_changed {
                existing.last_transition_time = now;
            }
            true
        } else {
            self.0.push(Condition {
                type_,
                status,
                reason,
                message,
                observed_generation,
                last_transition_time: now,
            });
            true
        }
    }

    pub fn is_true(&self, type_: &str) -> bool {
        matches!(self.get(type_), Some(c) if c.status == ConditionStatus::True)
    }
}
