//! Execution Controller
//!
//! The session state machine between the editing surfaces and the
//! interpreter channel. It decides when buffered source is handed to the
//! interpreter, interprets the interpreter's verdict, routes asynchronous
//! output and results into the transcript, and handles interrupt and
//! restart requests.
//!
//! The controller is a plain single-threaded object: its owner feeds it
//! user actions and the [`ChannelEvent`]s drained from the event queue,
//! one at a time.

pub mod keys;
pub mod session;

pub use keys::{Key, KeyAction, KeyChord, KeyMap, Modifiers};
pub use session::{Phase, Session};

use crate::channel::{ChannelEvent, Generation, InterpreterChannel};
use crate::error::Error;
use crate::protocol::{ExecutionRequest, ExecutionResponse, ExecutionResult, RejectReason};
use crate::surface::{CursorPosition, OutputSink, OutputTag, SourceBuffer, StatusSurface};

/// Prompt written after every command and restart
pub const DEFAULT_PROMPT: &str = ">>> ";

/// Prompt written before continuation lines of an echoed command
pub const CONTINUATION_PROMPT: &str = "... ";

/// Separator written when a fresh interpreter instance takes over
pub const SESSION_BANNER: &str = "\n==================== New Session ====================\n";

pub const STATUS_INCOMPLETE: &str = "Command is incomplete";
pub const STATUS_NOT_EXECUTING: &str = "A command isn't being executed currently";
pub const STATUS_ABANDONED: &str = "Interpreter restarted before the command was checked";

/// Status text for a syntax error at a zero-based position
pub fn syntax_error_status(message: &str, line: usize, column: usize) -> String {
    format!(
        "Syntax error: {} (at line {} col {})",
        message,
        line + 1,
        column + 1
    )
}

/// What happened to an execute attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecuteOutcome {
    /// The interpreter accepted the command and is running it
    Accepted,
    /// The buffer was empty, nothing was sent
    Empty,
    /// The source is a valid prefix of a longer command
    Incomplete,
    /// The source does not parse
    SyntaxError {
        message: String,
        line: usize,
        column: usize,
    },
    /// The request could not be completed
    Failed,
}

impl ExecuteOutcome {
    pub fn is_accepted(&self) -> bool {
        matches!(self, ExecuteOutcome::Accepted)
    }
}

/// Session state machine driving one interpreter channel
pub struct ExecutionController<C, O, B, S> {
    channel: C,
    output: O,
    buffer: B,
    status: S,
    session: Session,
    /// Instance whose events are currently accepted
    generation: Generation,
    prompt: String,
    keymap: KeyMap,
}

impl<C, O, B, S> ExecutionController<C, O, B, S>
where
    C: InterpreterChannel,
    O: OutputSink,
    B: SourceBuffer,
    S: StatusSurface,
{
    /// Create an idle controller bound to the channel's current instance
    pub fn new(channel: C, output: O, buffer: B, status: S) -> Self {
        let generation = channel.generation();
        Self {
            channel,
            output,
            buffer,
            status,
            session: Session::new(),
            generation,
            prompt: DEFAULT_PROMPT.to_string(),
            keymap: KeyMap::default(),
        }
    }

    /// Use `prompt` instead of [`DEFAULT_PROMPT`]
    pub fn with_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.prompt = prompt.into();
        self
    }

    /// Use a key map built from configuration
    pub fn with_keymap(mut self, keymap: KeyMap) -> Self {
        self.keymap = keymap;
        self
    }

    /// Write a start-up banner followed by the first prompt
    pub fn show_welcome(&mut self, banner: &str) {
        self.output.write(banner, &[OutputTag::Message]);
        self.write_prompt();
    }

    /// Hand the buffered source to the interpreter
    ///
    /// With `warn` set, rejections are reported on the status line and the
    /// cursor is moved to the problem; otherwise they are silent so the
    /// caller can fall back to ordinary editing.
    ///
    /// # Panics
    ///
    /// Panics if a command is already executing.
    pub fn execute(&mut self, warn: bool) -> ExecuteOutcome {
        assert!(
            self.session.is_idle(),
            "execute called while a command is executing"
        );

        let source = self.buffer.text();
        if source.is_empty() {
            self.status.alert();
            return ExecuteOutcome::Empty;
        }

        self.catch_up_with_channel();
        let response = match self.channel.request(&ExecutionRequest::new(source.as_str())) {
            Ok(response) => response,
            Err(e) => return self.request_failed(e),
        };

        match response {
            ExecutionResponse::Accepted => {
                self.echo_command(source.trim());
                self.buffer.clear();
                self.session.begin_execution();
                debug!("Command accepted, executing");
                ExecuteOutcome::Accepted
            }
            ExecutionResponse::Rejected(RejectReason::SyntaxError {
                message,
                line,
                column,
            }) => {
                debug!("Command rejected: syntax error at {}:{}", line, column);
                if warn {
                    self.status
                        .set_status(&syntax_error_status(&message, line, column));
                    self.buffer.place_cursor(CursorPosition::new(line, column));
                    self.status.alert();
                }
                ExecuteOutcome::SyntaxError {
                    message,
                    line,
                    column,
                }
            }
            ExecutionResponse::Rejected(RejectReason::Incomplete) => {
                debug!("Command rejected: incomplete");
                if warn {
                    self.status.set_status(STATUS_INCOMPLETE);
                    self.buffer.place_cursor_at_end();
                    self.status.alert();
                }
                ExecuteOutcome::Incomplete
            }
        }
    }

    fn request_failed(&mut self, error: Error) -> ExecuteOutcome {
        match error {
            Error::RequestAbandoned => {
                info!("Execution request abandoned by a restarting interpreter");
                self.status.set_status(STATUS_ABANDONED);
            }
            other => {
                warn!("Execution request failed: {}", other);
                self.status
                    .set_status(&format!("Could not execute command: {}", other));
            }
        }
        self.status.alert();
        ExecuteOutcome::Failed
    }

    /// Send the buffer to the running command's stdin
    ///
    /// Returns `false` if the channel refused the write; the buffer is
    /// kept in that case.
    ///
    /// # Panics
    ///
    /// Panics if no command is executing.
    pub fn forward_stdin(&mut self) -> bool {
        assert!(
            self.session.is_executing(),
            "forward_stdin called while no command is executing"
        );

        let mut text = self.buffer.text();
        if !text.ends_with('\n') {
            text.push('\n');
        }

        if let Err(e) = self.channel.write(text.as_bytes()) {
            warn!("Forwarding input failed: {}", e);
            self.status
                .set_status(&format!("Could not send input: {}", e));
            self.status.alert();
            return false;
        }

        self.output
            .write(&text[..text.len() - 1], &[OutputTag::Command, OutputTag::Stdin]);
        self.output.write("\n", &[]);
        self.buffer.clear();
        self.session.mark_stdin_forwarded();
        true
    }

    /// Interrupt the running command
    pub fn interrupt(&mut self) -> bool {
        if !self.session.is_executing() {
            self.status.set_status(STATUS_NOT_EXECUTING);
            self.status.alert();
            return false;
        }

        match self.channel.interrupt() {
            Ok(()) => true,
            Err(e) => {
                warn!("Interrupt failed: {}", e);
                self.status.set_status(&format!("Could not interrupt: {}", e));
                self.status.alert();
                false
            }
        }
    }

    /// Kill the interpreter; the new session is announced by a
    /// [`ChannelEvent::Restarted`]
    pub fn restart(&mut self) -> bool {
        match self.channel.kill() {
            Ok(()) => true,
            Err(e) => {
                error!("Interpreter restart failed: {}", e);
                self.status
                    .set_status(&format!("Could not restart interpreter: {}", e));
                self.status.alert();
                false
            }
        }
    }

    /// The explicit execute command
    ///
    /// Forwards input while a command runs, otherwise executes with
    /// warnings enabled.
    pub fn execute_command(&mut self) -> bool {
        if self.session.is_executing() {
            self.forward_stdin()
        } else if self.buffer.is_empty() {
            self.status.alert();
            false
        } else {
            self.execute(true).is_accepted()
        }
    }

    /// Line-submit key; returns `true` when the key was consumed
    ///
    /// Only a non-empty single-line buffer with the cursor at its end and
    /// no trailing space qualifies. Anything else is left to ordinary
    /// editing (newline insertion).
    pub fn submit_line(&mut self) -> bool {
        let cursor = self.buffer.cursor();
        let eligible = self.buffer.cursor_at_end()
            && cursor.line == 0
            && cursor.column != 0
            && !self.buffer.text().ends_with(' ');
        if !eligible {
            return false;
        }

        if self.session.is_idle() {
            self.execute(false).is_accepted()
        } else if self.session.stdin_forwarded() {
            self.forward_stdin()
        } else {
            false
        }
    }

    /// Perform a bound action; returns `true` when the key was consumed
    pub fn dispatch(&mut self, action: KeyAction) -> bool {
        debug!("Dispatching key action {:?}", action);
        match action {
            KeyAction::SubmitLine => self.submit_line(),
            KeyAction::Execute => {
                self.execute_command();
                true
            }
            KeyAction::Interrupt => {
                self.interrupt();
                true
            }
            KeyAction::Restart => {
                self.restart();
                true
            }
        }
    }

    /// Look up `chord` in the key map and perform its action
    pub fn handle_key(&mut self, chord: &KeyChord) -> bool {
        match self.keymap.lookup(chord) {
            Some(action) => self.dispatch(action),
            None => false,
        }
    }

    /// Apply an event drained from the channel's queue
    ///
    /// Events stamped with an instance other than the current one are
    /// dropped; a restart moves the controller to the new instance.
    pub fn handle_event(&mut self, event: ChannelEvent) {
        match event {
            ChannelEvent::Restarted { generation } => {
                if generation <= self.generation {
                    debug!(
                        "Ignoring restart of generation {} (current {})",
                        generation, self.generation
                    );
                    return;
                }
                self.generation = generation;
                self.on_restart();
            }
            event if event.generation() != self.generation => {
                debug!(
                    "Dropping event from generation {} (current {})",
                    event.generation(),
                    self.generation
                );
            }
            ChannelEvent::Output { stream, text, .. } => {
                self.on_output_chunk(stream.into(), &text);
            }
            ChannelEvent::ExecutionFinished { result, .. } => {
                self.on_execution_result(result);
            }
        }
    }

    /// Forward a stdout/stderr chunk verbatim
    pub fn on_output_chunk(&mut self, tag: OutputTag, text: &str) {
        if self.session.is_idle() {
            debug!("{} output arrived while idle", tag.as_str());
        }
        self.output.write(text, &[tag]);
    }

    /// Finish the running command
    ///
    /// # Panics
    ///
    /// Panics if no command is executing: the channel and the session
    /// disagree about what is running.
    pub fn on_execution_result(&mut self, result: ExecutionResult) {
        self.session.finish_execution();
        if !result.ok {
            if let Some(text) = &result.exception_text {
                self.output.write(text, &[OutputTag::Exception]);
            }
        }
        self.write_prompt();
        debug!("Command finished (ok: {})", result.ok);
    }

    /// Start a fresh session after the interpreter was replaced
    pub fn on_restart(&mut self) {
        if self.session.is_executing() {
            info!("Interpreter restarted while a command was executing");
        }
        self.output.write(SESSION_BANNER, &[OutputTag::Message]);
        self.write_prompt();
        self.session.reset();
    }

    /// Adopt an instance the channel switched to before its restart event
    /// was handled; the queued event is then dropped as a duplicate
    fn catch_up_with_channel(&mut self) {
        let current = self.channel.generation();
        if current > self.generation {
            debug!(
                "Channel moved to generation {} ahead of its event (current {})",
                current, self.generation
            );
            self.generation = current;
            self.on_restart();
        }
    }

    fn write_prompt(&mut self) {
        self.output
            .write(&self.prompt, &[OutputTag::Command, OutputTag::Prompt]);
    }

    /// Echo an accepted command, prefixing continuation lines
    fn echo_command(&mut self, source: &str) {
        for (index, line) in source.split('\n').enumerate() {
            if index > 0 {
                self.output.write("\n", &[OutputTag::Command]);
                self.output.write(
                    CONTINUATION_PROMPT,
                    &[OutputTag::Command, OutputTag::Prompt],
                );
            }
            self.output.write(line, &[OutputTag::Command]);
        }
        self.output.write("\n", &[OutputTag::Command]);
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn phase(&self) -> Phase {
        self.session.phase()
    }

    /// Generation whose events are currently accepted
    pub fn generation(&self) -> Generation {
        self.generation
    }

    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    pub fn keymap(&self) -> &KeyMap {
        &self.keymap
    }

    pub fn channel(&self) -> &C {
        &self.channel
    }

    pub fn channel_mut(&mut self) -> &mut C {
        &mut self.channel
    }

    pub fn output(&self) -> &O {
        &self.output
    }

    pub fn output_mut(&mut self) -> &mut O {
        &mut self.output
    }

    pub fn buffer(&self) -> &B {
        &self.buffer
    }

    pub fn buffer_mut(&mut self) -> &mut B {
        &mut self.buffer
    }

    pub fn status(&self) -> &S {
        &self.status
    }

    pub fn status_mut(&mut self) -> &mut S {
        &mut self.status
    }
}
