use std::time::Duration;

/// Tunables the spec calls out as implementer-exposed (§4.A, §4.I, §9).
///
/// Loading these from a file or environment is explicitly out of scope
/// (non-goal: "CLI, configuration file loading"); callers construct a
/// `Config` directly, typically via [`Config::default`].
#[derive(Debug, Clone)]
pub struct Config {
    /// Cap on the registry cache's list+watch retry backoff (§4.A).
    pub registry_backoff_cap: Duration,
    /// Requeue delay when the summary aggregator finds zero contributing
    /// grants, treated as an ordering window rather than a failure (§4.I).
    pub summary_no_grant_requeue: Duration,
    /// Grace period before a Denied auto-created claim is deleted (§4.K,
    /// Open Question in §9 — resolved in SPEC_FULL.md as configurable).
    pub denied_claim_grace: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            registry_backoff_cap: Duration::from_secs(30),
            summary_no_grant_requeue: Duration::from_secs(5),
            denied_claim_grace: Duration::from_secs(600),
        }
    }
}
