//! Plain-text source buffer

use serde::{Deserialize, Serialize};

use super::SourceBuffer;

/// Zero-based line and column (in characters) inside a buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CursorPosition {
    pub line: usize,
    pub column: usize,
}

impl CursorPosition {
    pub fn new(line: usize, column: usize) -> Self {
        Self { line, column }
    }
}

/// Minimal editable buffer with a single cursor
///
/// Front ends without a rich text widget use this as their
/// [`SourceBuffer`]. The cursor is stored as a character offset.
#[derive(Debug, Clone, Default)]
pub struct LineBuffer {
    text: String,
    cursor: usize,
}

impl LineBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a buffer holding `text` with the cursor at its end
    pub fn with_text(text: impl Into<String>) -> Self {
        let text = text.into();
        let cursor = text.chars().count();
        Self { text, cursor }
    }

    /// Replace the contents, leaving the cursor at the end
    pub fn set_text(&mut self, text: impl Into<String>) {
        *self = Self::with_text(text);
    }

    /// Insert `text` at the cursor and advance past it
    pub fn insert(&mut self, text: &str) {
        let byte_index = self.byte_index(self.cursor);
        self.text.insert_str(byte_index, text);
        self.cursor += text.chars().count();
    }

    /// Cursor as a character offset
    pub fn cursor_offset(&self) -> usize {
        self.cursor
    }

    /// Number of characters in the buffer
    pub fn char_count(&self) -> usize {
        self.text.chars().count()
    }

    fn byte_index(&self, char_offset: usize) -> usize {
        self.text
            .char_indices()
            .nth(char_offset)
            .map(|(index, _)| index)
            .unwrap_or(self.text.len())
    }
}

impl SourceBuffer for LineBuffer {
    fn text(&self) -> String {
        self.text.clone()
    }

    fn clear(&mut self) {
        self.text.clear();
        self.cursor = 0;
    }

    fn cursor(&self) -> CursorPosition {
        let mut position = CursorPosition::default();
        for ch in self.text.chars().take(self.cursor) {
            if ch == '\n' {
                position.line += 1;
                position.column = 0;
            } else {
                position.column += 1;
            }
        }
        position
    }

    fn place_cursor(&mut self, position: CursorPosition) {
        let mut offset = 0;
        for (index, line) in self.text.split('\n').enumerate() {
            let width = line.chars().count();
            if index == position.line {
                self.cursor = offset + position.column.min(width);
                return;
            }
            // +1 for the newline separating this line from the next
            offset += width + 1;
        }
        self.place_cursor_at_end();
    }

    fn place_cursor_at_end(&mut self) {
        self.cursor = self.char_count();
    }

    fn cursor_at_end(&self) -> bool {
        self.cursor == self.char_count()
    }

    fn is_empty(&self) -> bool {
        self.text.is_empty()
    }
}
