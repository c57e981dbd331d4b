//! Terminal Surfaces
//!
//! ANSI-colored transcript on stdout and a status line on stderr.

use std::io::{self, Write};

use mosaicrepl::config::OutputStyle;
use mosaicrepl::controller::CONTINUATION_PROMPT;
use mosaicrepl::surface::{OutputSink, OutputTag, StatusSurface};

/// Transcript written straight to the terminal
pub struct TerminalSink {
    style: OutputStyle,
    /// The terminal already echoes typed lines, so command and input
    /// echoes are not repeated
    local_echo: bool,
    /// The previous write was a suppressed echo
    dropped_echo: bool,
}

impl TerminalSink {
    pub fn new(style: OutputStyle, local_echo: bool) -> Self {
        Self {
            style,
            local_echo,
            dropped_echo: false,
        }
    }

    /// Prompt for the next line of a multi-line command
    pub fn continuation_prompt(&mut self) {
        self.emit(CONTINUATION_PROMPT, &[OutputTag::Command, OutputTag::Prompt]);
    }

    fn is_echo(text: &str, tags: &[OutputTag]) -> bool {
        tags.contains(&OutputTag::Command)
            && (!tags.contains(&OutputTag::Prompt) || text == CONTINUATION_PROMPT)
    }

    fn emit(&mut self, text: &str, tags: &[OutputTag]) {
        let mut stdout = io::stdout().lock();
        let written = match self.style.rgb_for(tags) {
            Some((r, g, b)) => write!(stdout, "\x1b[38;2;{};{};{}m{}\x1b[0m", r, g, b, text),
            None => write!(stdout, "{}", text),
        };
        if let Err(e) = written.and_then(|_| stdout.flush()) {
            tracing::warn!("Failed to write to terminal: {}", e);
        }
    }
}

impl OutputSink for TerminalSink {
    fn write(&mut self, text: &str, tags: &[OutputTag]) {
        if self.local_echo {
            if Self::is_echo(text, tags) {
                self.dropped_echo = true;
                return;
            }
            // Line break closing a suppressed input echo
            if self.dropped_echo && tags.is_empty() && text == "\n" {
                self.dropped_echo = false;
                return;
            }
        }
        self.dropped_echo = false;
        self.emit(text, tags);
    }
}

/// Status messages and alerts on stderr
#[derive(Default)]
pub struct StatusLine {
    use_color: bool,
}

impl StatusLine {
    pub fn new(use_color: bool) -> Self {
        Self { use_color }
    }
}

impl StatusSurface for StatusLine {
    fn set_status(&mut self, message: &str) {
        if self.use_color {
            eprintln!("\x1b[2m[{}]\x1b[0m", message);
        } else {
            eprintln!("[{}]", message);
        }
    }

    fn alert(&mut self) {
        let mut stderr = io::stderr().lock();
        let _ = stderr.write_all(b"\x07").and_then(|_| stderr.flush());
    }
}
