//! Unit Tests for the Protocol Codec
//!
//! Wire shapes of the interpreter message socket.

use mosaicrepl::error::Error;
use mosaicrepl::protocol::{
    decode_inbound, encode_request, ExecutionRequest, ExecutionResponse, ExecutionResult, Inbound,
    RejectReason,
};

#[test]
fn test_request_wire_shape() {
    let line = encode_request(&ExecutionRequest::new("print(\"hi\")\n")).unwrap();
    let value: serde_json::Value = serde_json::from_str(line.trim_end()).unwrap();

    assert_eq!(value["type"], "exec");
    assert_eq!(value["source"], "print(\"hi\")\n");
    assert_eq!(value.as_object().unwrap().len(), 2);
}

#[test]
fn test_request_survives_control_characters() {
    let source = "a = '\t'\r\nb = 2\n\u{0}";
    let line = encode_request(&ExecutionRequest::new(source)).unwrap();

    assert_eq!(line.matches('\n').count(), 1);
    let value: serde_json::Value = serde_json::from_str(&line).unwrap();
    assert_eq!(value["source"], source);
}

#[test]
fn test_decode_syntax_error() {
    let line = r#"{"type":"response","status":"rejected","reason":{"kind":"syntax_error","message":"invalid syntax","line":2,"column":7}}"#;

    assert_eq!(
        decode_inbound(line).unwrap(),
        Inbound::Response(ExecutionResponse::Rejected(RejectReason::SyntaxError {
            message: "invalid syntax".to_string(),
            line: 2,
            column: 7,
        }))
    );
}

#[test]
fn test_decode_incomplete() {
    let line = r#"{"type":"response","status":"rejected","reason":{"kind":"incomplete"}}"#;
    assert_eq!(
        decode_inbound(line).unwrap(),
        Inbound::Response(ExecutionResponse::Rejected(RejectReason::Incomplete))
    );
}

#[test]
fn test_decode_failed_result() {
    let line = "{\"type\":\"result\",\"ok\":false,\"exception_text\":\"ValueError: x\\n\"}\r\n";
    assert_eq!(
        decode_inbound(line).unwrap(),
        Inbound::Result(ExecutionResult::failure("ValueError: x\n"))
    );
}

#[test]
fn test_decode_failed_result_without_text() {
    let line = r#"{"type":"result","ok":false}"#;
    assert_eq!(
        decode_inbound(line).unwrap(),
        Inbound::Result(ExecutionResult {
            ok: false,
            exception_text: None,
        })
    );
}

#[test]
fn test_decode_ignores_unknown_fields() {
    let line = r#"{"type":"response","status":"accepted","elapsed_ms":3}"#;
    assert_eq!(
        decode_inbound(line).unwrap(),
        Inbound::Response(ExecutionResponse::Accepted)
    );
}

#[test]
fn test_malformed_messages() {
    for line in [
        "",
        "not json",
        r#"{"type":"bogus"}"#,
        r#"{"type":"response","status":"maybe"}"#,
        r#"{"type":"response","status":"rejected","reason":{"kind":"syntax_error"}}"#,
        r#"{"type":"result"}"#,
    ] {
        let err = decode_inbound(line).unwrap_err();
        assert!(
            matches!(err, Error::MalformedMessage { .. }),
            "{:?} should be malformed, got {:?}",
            line,
            err
        );
    }
}

#[test]
fn test_malformed_message_display_names_line() {
    let err = decode_inbound("garbage").unwrap_err();
    assert!(err.to_string().contains("garbage"));
}
