use super::*;

#[test]
fn status_mapping() {
    assert!(matches!(ClientError::from_status(401, None), ClientError::AuthRejected { .. }));
    assert!(matches!(ClientError::from_status(404, None), ClientError::NotFound { .. }));
    assert!(matches!(ClientError::from_status(409, None), ClientError::DuplicateAccount { .. }));
    assert!(matches!(ClientError::from_status(400, None), ClientError::Validation { .. }));
    assert!(matches!(ClientError::from_status(422, None), ClientError::Validation { .. }));
    assert!(matches!(ClientError::from_status(503, None), ClientError::Api { status: 503, .. }));
}

#[test]
fn detail_becomes_message() {
    let err = ClientError::from_status(404, Some("Analysis not found".into()));
    assert_eq!(err.code_str(), "not_found");
    assert_eq!(err.message(), "Analysis not found");
    assert_eq!(err.to_string(), "not_found: Analysis not found");

    let err = ClientError::from_status(500, None);
    assert_eq!(err.message(), "request failed with HTTP 500");
}

#[test]
fn classification() {
    assert!(ClientError::invalid_credentials("x").is_user_correctable());
    assert!(ClientError::duplicate_account("x").is_user_correctable());
    assert!(ClientError::validation("x").is_user_correctable());
    assert!(!ClientError::auth_rejected("x").is_user_correctable());

    assert!(ClientError::network("x").is_transient());
    assert!(ClientError::api(502, "x").is_transient());
    assert!(!ClientError::api(418, "x").is_transient());
    assert!(!ClientError::poll_limit(3).is_transient());
}

#[test]
fn result_fetch_is_distinct_from_cause() {
    let cause = ClientError::network("connection reset");
    let err = ClientError::result_fetch("42", &cause);
    assert_eq!(err.code_str(), "result_fetch_error");
    assert!(err.message().contains("connection reset"));
    assert!(!err.is_transient());
}

#[test]
fn serializes_with_type_tag() {
    let v = serde_json::to_value(ClientError::poll_limit(7)).unwrap();
    assert_eq!(v["type"], "poll_limit_exceeded");
    assert_eq!(v["attempts"], 7);
    assert_eq!(v["code"], "poll_limit_exceeded");
}
