//! Integration tests for error classification and reports.

use tubegate_core::{CallError, ErrorKind, ErrorReport, classify_error};

#[test]
fn test_upstream_messages_classify_as_quota() {
    let messages = [
        "The request cannot be completed because you have exceeded your quota. (quotaExceeded)",
        "dailyLimitExceeded",
        "RESOURCE_EXHAUSTED: generate_content_free_tier_requests",
        "User quota exhausted for this project",
        "Rate Limit Exceeded",
    ];
    for message in messages {
        assert_eq!(
            classify_error(&CallError::new(message)),
            ErrorKind::QuotaExceeded,
            "{message}"
        );
    }
}

#[test]
fn test_other_failures_are_transient() {
    assert_eq!(
        classify_error(&CallError::with_status(500, "Internal error")),
        ErrorKind::TransientCallFailure
    );
    assert_eq!(
        classify_error(&CallError::timeout()),
        ErrorKind::TransientCallFailure
    );
}

#[test]
fn test_report_serializes_type_field() {
    let report = ErrorReport::from(&CallError::with_status(429, "slow down"));
    let json = serde_json::to_value(&report).unwrap();
    assert_eq!(json["type"], "quota_exceeded");
    assert!(json["suggestion"].as_str().unwrap().contains("quota"));
}
