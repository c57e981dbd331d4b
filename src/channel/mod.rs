//! Interpreter Channel
//!
//! The transport between the front end and the interpreter process. The
//! controller drives it through [`InterpreterChannel`]; unsolicited
//! notifications (output chunks, execution results, restarts) are pushed
//! onto an [`EventSender`] from background I/O threads and drained by the
//! controller's owner on its own context.

pub mod events;
pub mod process;
pub mod signals;

use crate::error::Result;
use crate::protocol::{ExecutionRequest, ExecutionResponse, ExecutionResult, StreamKind};

pub use events::{event_queue, EventReceiver, EventSender};
pub use process::{InstanceInfo, ProcessChannel};

/// Sequence number of an interpreter process instance
///
/// Starts at 1 for the first launch and increases with every restart.
pub type Generation = u64;

/// Asynchronous notification from the interpreter side
#[derive(Debug, Clone, PartialEq)]
pub enum ChannelEvent {
    /// A chunk of stdout or stderr text
    Output {
        generation: Generation,
        stream: StreamKind,
        text: String,
    },
    /// The running command finished
    ExecutionFinished {
        generation: Generation,
        result: ExecutionResult,
    },
    /// A fresh interpreter instance replaced the previous one
    Restarted {
        /// Generation of the new instance
        generation: Generation,
    },
}

impl ChannelEvent {
    /// Generation of the instance the event belongs to
    pub fn generation(&self) -> Generation {
        match self {
            ChannelEvent::Output { generation, .. }
            | ChannelEvent::ExecutionFinished { generation, .. }
            | ChannelEvent::Restarted { generation } => *generation,
        }
    }
}

/// Operations the execution controller needs from the transport
///
/// All methods are called from the controller's single context.
/// `request` is the only blocking call: at most one request is ever
/// outstanding, so no request identifiers are exchanged.
pub trait InterpreterChannel {
    /// Send a request and wait for the interpreter's verdict
    fn request(&mut self, request: &ExecutionRequest) -> Result<ExecutionResponse>;

    /// One-way raw write to the interpreter's stdin
    fn write(&mut self, data: &[u8]) -> Result<()>;

    /// Best-effort interrupt of the running command
    fn interrupt(&mut self) -> Result<()>;

    /// Terminate the interpreter; a restart is announced through the
    /// event queue
    fn kill(&mut self) -> Result<()>;

    /// Generation of the instance currently serving requests
    fn generation(&self) -> Generation;
}
