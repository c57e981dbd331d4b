//! Wire codec for the interpreter message socket
//!
//! Messages are JSON objects, one per line, discriminated by a `type` field.

use serde::{Deserialize, Serialize};

use super::{ExecutionRequest, ExecutionResponse, ExecutionResult, RejectReason};
use crate::error::{Error, Result};

/// Messages written by the front end
#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum OutboundMessage<'a> {
    Exec { source: &'a str },
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "snake_case")]
enum ResponseStatus {
    Accepted,
    Rejected,
}

/// Messages written by the interpreter, as they appear on the wire
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum InboundMessage {
    Response {
        status: ResponseStatus,
        #[serde(default)]
        reason: Option<RejectReason>,
    },
    Result {
        ok: bool,
        #[serde(default)]
        exception_text: Option<String>,
    },
}

/// Just the discriminator of an inbound line
#[derive(Debug, Deserialize)]
struct MessageKind {
    #[serde(rename = "type")]
    kind: String,
}

/// A decoded message from the interpreter
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Inbound {
    /// Answer to the outstanding execution request
    Response(ExecutionResponse),
    /// Completion of the running command
    Result(ExecutionResult),
}

/// Encode an execution request as a single newline-terminated line
pub fn encode_request(request: &ExecutionRequest) -> Result<String> {
    let mut line = serde_json::to_string(&OutboundMessage::Exec {
        source: &request.source,
    })?;
    line.push('\n');
    Ok(line)
}

/// Decode one line received from the interpreter
pub fn decode_inbound(line: &str) -> Result<Inbound> {
    let trimmed = line.trim_end_matches(['\r', '\n']);
    let message: InboundMessage =
        serde_json::from_str(trimmed).map_err(|e| Error::MalformedMessage {
            line: trimmed.to_string(),
            reason: e.to_string(),
        })?;

    match message {
        InboundMessage::Response {
            status: ResponseStatus::Accepted,
            ..
        } => Ok(Inbound::Response(ExecutionResponse::Accepted)),
        InboundMessage::Response {
            status: ResponseStatus::Rejected,
            reason: Some(reason),
        } => Ok(Inbound::Response(ExecutionResponse::Rejected(reason))),
        InboundMessage::Response {
            status: ResponseStatus::Rejected,
            reason: None,
        } => Err(Error::MalformedMessage {
            line: trimmed.to_string(),
            reason: "rejected response without a reason".to_string(),
        }),
        InboundMessage::Result { ok, exception_text } => {
            // Exception text only means something for failed commands
            let exception_text = if ok { None } else { exception_text };
            Ok(Inbound::Result(ExecutionResult { ok, exception_text }))
        }
    }
}

/// Check whether an undecodable line was meant as a command result
///
/// Anything else, including lines that are not JSON at all, is taken as an
/// attempt to answer the outstanding request.
pub fn is_result_line(line: &str) -> bool {
    serde_json::from_str::<MessageKind>(line.trim_end_matches(['\r', '\n']))
        .map(|message| message.kind == "result")
        .unwrap_or(false)
}
