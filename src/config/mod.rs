//! Configuration management for MosaicRepl
//!
//! Interpreter launch parameters, transcript styling, session texts and
//! key bindings, plus loading/saving through [`loader::ConfigLoader`].

pub mod loader;

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::surface::OutputTag;

/// Main configuration structure for MosaicRepl
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Interpreter process configuration
    pub interpreter: InterpreterConfig,

    /// Transcript styling handed to the output sink
    pub output: OutputStyle,

    /// Session texts
    pub session: SessionConfig,

    /// Key binding configuration
    pub key_bindings: KeyBindings,
}

/// How to launch and supervise the interpreter process
///
/// The executable must speak the message-socket protocol; everything here
/// is passed through to the process without interpretation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InterpreterConfig {
    /// Interpreter executable path
    pub executable: PathBuf,

    /// Interpreter arguments
    pub args: Vec<String>,

    /// Whether to inherit parent environment
    pub inherit_env: bool,

    /// Working directory for the interpreter
    pub working_directory: Option<PathBuf>,

    /// How long the interpreter may take to connect its message socket
    pub handshake_timeout_ms: u64,

    /// How long to wait for an answer to an execution request (0 = forever)
    pub request_timeout_ms: u64,

    /// Relaunch the interpreter when it exits on its own
    pub restart_on_exit: bool,

    /// Environment variables to set
    pub environment: HashMap<String, String>,
}

impl Default for InterpreterConfig {
    fn default() -> Self {
        Self {
            executable: PathBuf::from("python3"),
            args: Vec::new(),
            inherit_env: true,
            working_directory: None,
            handshake_timeout_ms: 10_000,
            request_timeout_ms: 0,
            restart_on_exit: true,
            environment: HashMap::new(),
        }
    }
}

impl InterpreterConfig {
    /// Create a configuration for `executable` with default settings
    pub fn new(executable: impl Into<PathBuf>) -> Self {
        Self {
            executable: executable.into(),
            ..Self::default()
        }
    }

    /// Handshake timeout as a duration
    pub fn handshake_timeout(&self) -> Duration {
        Duration::from_millis(self.handshake_timeout_ms)
    }

    /// Request timeout, `None` when requests may block indefinitely
    pub fn request_timeout(&self) -> Option<Duration> {
        (self.request_timeout_ms > 0).then(|| Duration::from_millis(self.request_timeout_ms))
    }
}

/// Per-tag transcript colors
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputStyle {
    /// Emit colors at all
    pub use_color: bool,
    pub stdin: String,
    pub stdout: String,
    pub stderr: String,
    pub exception: String,
    pub prompt: String,
    pub command: String,
    pub message: String,
}

impl Default for OutputStyle {
    fn default() -> Self {
        Self {
            use_color: true,
            stdin: "#ffffff".to_string(),
            stdout: "#bcffff".to_string(),
            stderr: "#ff8080".to_string(),
            exception: "#ff8080".to_string(),
            prompt: "#e400b6".to_string(),
            command: "#ffffff".to_string(),
            message: "#ffff00".to_string(),
        }
    }
}

impl OutputStyle {
    /// Configured color string for a single tag
    pub fn color(&self, tag: OutputTag) -> &str {
        match tag {
            OutputTag::Stdin => &self.stdin,
            OutputTag::Stdout => &self.stdout,
            OutputTag::Stderr => &self.stderr,
            OutputTag::Exception => &self.exception,
            OutputTag::Prompt => &self.prompt,
            OutputTag::Command => &self.command,
            OutputTag::Message => &self.message,
        }
    }

    /// RGB color for text carrying `tags`, `None` when uncolored
    pub fn rgb_for(&self, tags: &[OutputTag]) -> Option<(u8, u8, u8)> {
        if !self.use_color {
            return None;
        }
        OutputTag::dominant(tags).and_then(|tag| parse_hex_color(self.color(tag)))
    }
}

/// Parse a `#rrggbb` color
pub fn parse_hex_color(value: &str) -> Option<(u8, u8, u8)> {
    let hex = value.strip_prefix('#')?;
    if hex.len() != 6 || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        return None;
    }
    let channel = |range: std::ops::Range<usize>| u8::from_str_radix(&hex[range], 16).ok();
    Some((channel(0..2)?, channel(2..4)?, channel(4..6)?))
}

/// Texts written by the session itself
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Prompt written after every command and restart
    pub prompt: String,

    /// Write the welcome banner at start-up
    pub show_welcome: bool,

    /// Replacement for the built-in welcome banner
    pub welcome_banner: Option<String>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            prompt: crate::controller::DEFAULT_PROMPT.to_string(),
            show_welcome: true,
            welcome_banner: None,
        }
    }
}

impl SessionConfig {
    /// Banner shown when the front end starts
    pub fn welcome_text(&self) -> String {
        match &self.welcome_banner {
            Some(banner) => banner.clone(),
            None => format!(
                "{} {}\nType a command and press Enter. Empty line executes a multi-line block.\n",
                crate::NAME,
                crate::VERSION
            ),
        }
    }
}

/// Key binding configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeyBindings {
    /// Key bindings for actions
    pub bindings: HashMap<String, KeyBinding>,
}

impl Default for KeyBindings {
    fn default() -> Self {
        let mut bindings = HashMap::new();

        bindings.insert("submit_line".to_string(), KeyBinding::new("Return"));
        bindings.insert("execute".to_string(), KeyBinding::new("Ctrl+Return"));
        bindings.insert("interrupt".to_string(), KeyBinding::new("Ctrl+C"));
        bindings.insert("restart".to_string(), KeyBinding::new("Ctrl+F6"));

        Self { bindings }
    }
}

/// Individual key binding
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeyBinding {
    /// Key combination string (e.g., "Ctrl+C", "Ctrl+Return")
    pub key: String,
    /// Whether this binding is enabled
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

fn default_enabled() -> bool {
    true
}

impl KeyBinding {
    pub fn new(key: &str) -> Self {
        Self {
            key: key.to_string(),
            enabled: true,
        }
    }
}

/// Configuration utilities
pub mod utils {
    use super::*;
    use crate::error::{Error, Result};

    /// Get configuration file format from path
    pub fn get_config_format(path: &Path) -> Option<loader::ConfigFormat> {
        match path.extension()?.to_str()? {
            "toml" => Some(loader::ConfigFormat::Toml),
            "json" => Some(loader::ConfigFormat::Json),
            _ => None,
        }
    }

    /// Create a default configuration file content
    pub fn create_default_config_content(format: loader::ConfigFormat) -> Result<String> {
        let config = Config::default();

        match format {
            loader::ConfigFormat::Toml => {
                toml::to_string_pretty(&config).map_err(|e| Error::ConfigSerializationFailed {
                    format: "TOML".to_string(),
                    reason: e.to_string(),
                })
            }
            loader::ConfigFormat::Json => serde_json::to_string_pretty(&config).map_err(|e| {
                Error::ConfigSerializationFailed {
                    format: "JSON".to_string(),
                    reason: e.to_string(),
                }
            }),
        }
    }
}
