use chrono::Utc;
use quota_core::{Condition, ConditionStatus, Conditions, QuotaError};
use std::time::Duration;

#[test]
fn conditions_track_multiple_types_independently() {
    let mut conditions = Conditions::new();
    let now = Utc::now();
    conditions.set("Active", ConditionStatus::True, "Active", "validated", 1, now);
    conditions.set("Granted", ConditionStatus::False, "Pending", "1 of 1 requests still pending", 1, now);

    assert!(conditions.is_true("Active"));
    assert!(!conditions.is_true("Granted"));
    assert_eq!(conditions.as_slice().len(), 2);
}

#[test]
fn reapplying_the_same_condition_is_a_no_op_for_callers_deciding_whether_to_write() {
    let mut conditions = Conditions::new();
    let now = Utc::now();
    let first = conditions.set("Ready", ConditionStatus::True, "Ready", "ok", 3, now);
    let second = conditions.set("Ready", ConditionStatus::True, "Ready", "ok", 3, now);
    assert!(first);
    assert!(!second);
}

#[test]
fn condition_equality_respects_every_field() {
    let now = Utc::now();
    let a = Condition {
        type_: "Ready".into(),
        status: ConditionStatus::True,
        reason: "Ready".into(),
        message: "ok".into(),
        observed_generation: 1,
        last_transition_time: now,
    };
    let mut b = a.clone();
    assert_eq!(a, b);
    b.message = "different".into();
    assert_ne!(a, b);
}

#[test]
fn conflict_and_unavailable_dependency_are_retryable_with_distinct_delays() {
    let conflict = QuotaError::Conflict("acme/bucket-1".into());
    let unavailable = QuotaError::UnavailableDependency("no active grant yet".into());
    let invalid = QuotaError::InvalidSpec("negative amount".into());

    assert!(conflict.is_retryable());
    assert!(unavailable.is_retryable());
    assert!(!invalid.is_retryable());

    let conflict_delay = conflict.requeue_after().unwrap();
    assert!(conflict_delay >= Duration::from_millis(100) && conflict_delay <= Duration::from_millis(600));
    assert_eq!(unavailable.requeue_after(), Some(Duration::from_secs(5)));
    assert_eq!(invalid.requeue_after(), None);
}

#[test]
fn transient_errors_are_retryable_but_leave_the_delay_to_the_caller() {
    let err = QuotaError::Transient("storage RPC timed out".into());
    assert!(err.is_retryable());
    assert_eq!(err.requeue_after(), None);
}
