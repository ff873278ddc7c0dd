//! Tests for the domain error payload.

use super::*;
use rstest::rstest;
use serde_json::json;

#[rstest]
#[case(ErrorCode::InvalidRequest, "invalid_request")]
#[case(ErrorCode::DecryptionFailed, "decryption_failed")]
#[case(ErrorCode::DeviceNotFound, "device_not_found")]
#[case(ErrorCode::EncodingFailure, "encoding_failure")]
#[case(ErrorCode::ServiceUnavailable, "service_unavailable")]
fn error_codes_serialise_as_snake_case(#[case] code: ErrorCode, #[case] expected: &str) {
    let value = serde_json::to_value(code).expect("serialise code");
    assert_eq!(value, json!(expected));
}

#[rstest]
fn message_is_rendered_under_error_key() {
    let err = Error::device_not_found("Device Not Found").with_trace_id("abc");
    let value = serde_json::to_value(&err).expect("serialise error");

    assert_eq!(value["error"], json!("Device Not Found"));
    assert_eq!(value["code"], json!("device_not_found"));
    assert_eq!(value["traceId"], json!("abc"));
    assert!(value.get("details").is_none());
}

#[rstest]
fn absent_trace_id_is_omitted() {
    let err = Error::invalid_request("bad");
    let value = serde_json::to_value(&err).expect("serialise error");
    assert!(value.get("traceId").is_none());
}

#[rstest]
fn payload_deserialises_back_into_error() {
    let raw = json!({
        "error": "Invalid device request",
        "code": "invalid_request",
        "details": { "field": "iv" }
    });
    let err: Error = serde_json::from_value(raw).expect("deserialise error");

    assert_eq!(err.code(), ErrorCode::InvalidRequest);
    assert_eq!(err.message(), "Invalid device request");
    assert_eq!(err.details(), Some(&json!({ "field": "iv" })));
}

#[tokio::test]
async fn constructor_captures_scoped_trace_id() {
    let trace_id: TraceId = "00000000-0000-0000-0000-000000000001"
        .parse()
        .expect("valid uuid");
    let err = TraceId::scope(trace_id, async { Error::internal("boom") }).await;
    assert_eq!(err.trace_id(), Some("00000000-0000-0000-0000-000000000001"));
}
