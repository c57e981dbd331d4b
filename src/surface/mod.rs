//! Presentation Surfaces
//!
//! The execution controller never owns widgets. It talks to the
//! presentation layer through three narrow traits: a tag-aware output
//! transcript, the editable source buffer, and a status line with an
//! audible alert. In-memory implementations are provided for front ends
//! and tests.

pub mod buffer;
pub mod status;
pub mod transcript;

use serde::{Deserialize, Serialize};

pub use buffer::{CursorPosition, LineBuffer};
pub use status::StatusHistory;
pub use transcript::{Segment, Transcript};

/// Category of a piece of transcript text
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputTag {
    /// Text the user sent to the running command's stdin
    Stdin,
    /// Interpreter standard output
    Stdout,
    /// Interpreter standard error
    Stderr,
    /// Formatted exception of a failed command
    Exception,
    /// The input prompt
    Prompt,
    /// Echoed command text
    Command,
    /// System messages (welcome banner, session separator)
    Message,
}

impl OutputTag {
    /// Tags in increasing style priority; a later tag's color wins
    pub const PRIORITY: [OutputTag; 7] = [
        OutputTag::Stdout,
        OutputTag::Stderr,
        OutputTag::Exception,
        OutputTag::Command,
        OutputTag::Prompt,
        OutputTag::Stdin,
        OutputTag::Message,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            OutputTag::Stdin => "stdin",
            OutputTag::Stdout => "stdout",
            OutputTag::Stderr => "stderr",
            OutputTag::Exception => "exception",
            OutputTag::Prompt => "prompt",
            OutputTag::Command => "command",
            OutputTag::Message => "message",
        }
    }

    fn priority(&self) -> usize {
        Self::PRIORITY
            .iter()
            .position(|tag| tag == self)
            .unwrap_or_default()
    }

    /// The tag whose style applies to text carrying all of `tags`
    pub fn dominant(tags: &[OutputTag]) -> Option<OutputTag> {
        tags.iter().copied().max_by_key(OutputTag::priority)
    }
}

impl From<crate::protocol::StreamKind> for OutputTag {
    fn from(stream: crate::protocol::StreamKind) -> Self {
        match stream {
            crate::protocol::StreamKind::Stdout => OutputTag::Stdout,
            crate::protocol::StreamKind::Stderr => OutputTag::Stderr,
        }
    }
}

/// Append-only, tag-aware text surface
pub trait OutputSink {
    /// Append `text` at the end of the transcript, tagged with `tags`
    fn write(&mut self, text: &str, tags: &[OutputTag]);
}

/// Editable text holding the pending command
pub trait SourceBuffer {
    /// Full buffer contents
    fn text(&self) -> String;

    /// Remove all text
    fn clear(&mut self);

    /// Current cursor position
    fn cursor(&self) -> CursorPosition;

    /// Move the cursor to a zero-based line and column, clamped to the text
    fn place_cursor(&mut self, position: CursorPosition);

    /// Move the cursor after the last character
    fn place_cursor_at_end(&mut self);

    /// Whether the cursor sits after the last character
    fn cursor_at_end(&self) -> bool;

    /// Whether the buffer holds no characters
    fn is_empty(&self) -> bool {
        self.text().is_empty()
    }
}

/// Status line plus audible alert
pub trait StatusSurface {
    /// Show a transient status message
    fn set_status(&mut self, message: &str);

    /// Emit an audible or visual alert
    fn alert(&mut self);
}
