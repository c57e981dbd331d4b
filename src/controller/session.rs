//! Session State
//!
//! Execution phase of the current interpreter instance. Only the
//! controller mutates it; every transition checks its precondition and
//! panics on violation since a broken session cannot be recovered.

/// Execution phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Phase {
    /// Waiting for a command
    #[default]
    Idle,
    /// A command was accepted and has not finished yet
    Executing,
}

/// Session state owned by the execution controller
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Session {
    phase: Phase,
    stdin_forwarded: bool,
}

impl Session {
    /// Create an idle session
    pub fn new() -> Self {
        Self::default()
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn is_idle(&self) -> bool {
        self.phase == Phase::Idle
    }

    pub fn is_executing(&self) -> bool {
        self.phase == Phase::Executing
    }

    /// Whether the user has already sent input to the running command
    pub fn stdin_forwarded(&self) -> bool {
        self.stdin_forwarded
    }

    /// Idle -> Executing after the interpreter accepted a command
    pub fn begin_execution(&mut self) {
        assert!(
            self.is_idle(),
            "begin_execution called while a command is already executing"
        );
        self.phase = Phase::Executing;
        self.stdin_forwarded = false;
    }

    /// Record that input was written to the running command
    pub fn mark_stdin_forwarded(&mut self) {
        assert!(
            self.is_executing(),
            "stdin can only be forwarded while a command is executing"
        );
        self.stdin_forwarded = true;
    }

    /// Executing -> Idle when the execution result arrives
    pub fn finish_execution(&mut self) {
        assert!(
            self.is_executing(),
            "execution result received while no command is executing"
        );
        self.reset();
    }

    /// Force Idle from any phase (interpreter restart)
    pub fn reset(&mut self) {
        self.phase = Phase::Idle;
        self.stdin_forwarded = false;
    }
}
