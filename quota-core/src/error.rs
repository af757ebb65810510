use std::time::Duration;

/// The error taxonomy of the quota core (see §7 of the design).
///
/// Status conditions never carry a [`QuotaError::Conflict`] or
/// [`QuotaError::Transient`] — those are retry signals, not terminal
/// classifications. Only [`QuotaError::InvalidSpec`] and
/// [`QuotaError::UnavailableDependency`] are ever surfaced to a user-visible
/// condition message.
#[derive(Debug, thiserror::Error)]
pub enum QuotaError {
    /// Referenced object does not exist. Reconcile returns success; the
    /// object will reappear via a later watch event or stay gone.
    #[error("not found: {0}")]
    NotFound(String),

    /// Optimistic concurrency failure on a write (resourceVersion mismatch).
    /// Never logged as an error; retried with jittered backoff.
    #[error("conflict writing {0}")]
    Conflict(String),

    /// Static validation failed. Surfaced via the object's condition;
    /// not retried until the spec changes.
    #[error("invalid spec: {0}")]
    InvalidSpec(String),

    /// A dependency this reconcile needs is not ready yet (registry cache
    /// unsynced, referenced grant not Active). Requeue with a short delay.
    #[error("dependency unavailable: {0}")]
    UnavailableDependency(String),

    /// Storage RPC error un-related to conflict or not-found.
    #[error("transient storage error: {0}")]
    Transient(String),

    /// Programmer error: invariant breach, cast failure. Logged and
    /// returned; the caller's retry policy applies.
    #[error("internal error: {0}")]
    Internal(String),
}

impl QuotaError {
    /// Whether this error should be retried by the reconciliation runtime,
    /// as opposed to being surfaced as a terminal classification.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            QuotaError::Conflict(_) | QuotaError::UnavailableDependency(_) | QuotaError::Transient(_)
        )
    }

    /// The requeue delay the runtime should use for a retryable error.
    ///
    /// `Conflict` gets a small jittered backoff (100-600ms, §5/§7).
    /// `UnavailableDependency` gets the longer ~5s requeue (§4.I).
    /// `Transient` falls back to the runtime's own rate-limited retry, so
    /// this returns `None` and lets the caller apply its own policy.
    pub fn requeue_after(&self) -> Option<Duration> {
        match self {
            QuotaError::Conflict(_) => Some(jittered_backoff()),
            QuotaError::UnavailableDependency(_) => Some(Duration::from_secs(5)),
            QuotaError::Transient(_) => None,
            _ => None,
        }
    }
}

/// A jittered 100-600ms backoff, used for optimistic-concurrency retries
/// on bucket and claim writes (§4.H, §4.I).
pub fn jittered_backoff() -> Duration {
    use rand::Rng;
    let millis = rand::thread_rng().gen_range(100..=600);
    Duration::from_millis(millis)
}

pub type Result<T> = std::result::Result<T, QuotaError>;
