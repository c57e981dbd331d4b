//! Recorded status line

use super::StatusSurface;

/// Status surface that remembers every message and alert
#[derive(Debug, Clone, Default)]
pub struct StatusHistory {
    messages: Vec<String>,
    alerts: usize,
}

impl StatusHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// The message currently shown, if any
    pub fn current(&self) -> Option<&str> {
        self.messages.last().map(String::as_str)
    }

    /// Every message in the order it was shown
    pub fn messages(&self) -> &[String] {
        &self.messages
    }

    /// Number of alerts emitted
    pub fn alert_count(&self) -> usize {
        self.alerts
    }
}

impl StatusSurface for StatusHistory {
    fn set_status(&mut self, message: &str) {
        self.messages.push(message.to_string());
    }

    fn alert(&mut self) {
        self.alerts += 1;
    }
}
