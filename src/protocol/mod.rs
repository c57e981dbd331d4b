//! Interpreter Protocol Messages
//!
//! Message shapes exchanged with the interpreter process. The execution
//! request and its response form the single synchronous exchange; results
//! and stream chunks arrive asynchronously afterwards.

pub mod codec;

use serde::{Deserialize, Serialize};

pub use codec::{decode_inbound, encode_request, is_result_line, Inbound};

/// Request to validate and, if complete, execute a piece of source
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionRequest {
    /// Full source of the pending command
    pub source: String,
}

impl ExecutionRequest {
    /// Create a request for the given source
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
        }
    }
}

/// Synchronous reply to an [`ExecutionRequest`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecutionResponse {
    /// Source is complete and valid; execution has started
    Accepted,
    /// Source was not executed
    Rejected(RejectReason),
}

impl ExecutionResponse {
    /// Check if the source was accepted for execution
    pub fn is_accepted(&self) -> bool {
        matches!(self, ExecutionResponse::Accepted)
    }
}

/// Why the interpreter refused to execute a request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RejectReason {
    /// The source does not parse. `line` and `column` are zero-based.
    SyntaxError {
        message: String,
        line: usize,
        column: usize,
    },
    /// The source is a valid prefix of a longer command
    Incomplete,
}

/// Terminating notification for an accepted request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionResult {
    /// Whether the command finished without raising
    pub ok: bool,
    /// Formatted exception, present only when `ok` is false
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exception_text: Option<String>,
}

impl ExecutionResult {
    /// A command that completed normally
    pub fn success() -> Self {
        Self {
            ok: true,
            exception_text: None,
        }
    }

    /// A command that raised
    pub fn failure(exception_text: impl Into<String>) -> Self {
        Self {
            ok: false,
            exception_text: Some(exception_text.into()),
        }
    }
}

/// Output stream a chunk was read from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StreamKind {
    Stdout,
    Stderr,
}

impl StreamKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            StreamKind::Stdout => "stdout",
            StreamKind::Stderr => "stderr",
        }
    }
}
