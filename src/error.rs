//! Error types and Result aliases for MosaicRepl

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

/// Result type alias for MosaicRepl operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for MosaicRepl
#[derive(Debug)]
pub enum Error {
    // === Interpreter process errors ===
    /// Failed to launch the interpreter executable
    InterpreterSpawnFailed {
        executable: String,
        reason: String,
    },

    /// The interpreter never connected its message socket
    HandshakeTimeout {
        timeout: Duration,
    },

    /// The interpreter exited or misbehaved during the handshake
    HandshakeFailed {
        reason: String,
    },

    /// No interpreter instance is currently running
    NoInterpreterRunning,

    /// Failed to take one of the child's standard streams
    StreamTakeFailed {
        stream: String,
    },

    // === Protocol errors ===
    /// Failed to send an execution request
    RequestSendFailed {
        reason: String,
    },

    /// The interpreter instance went away before answering
    RequestAbandoned,

    /// The interpreter did not answer within the configured timeout
    RequestTimeout {
        timeout: Duration,
    },

    /// A message from the interpreter could not be decoded
    MalformedMessage {
        line: String,
        reason: String,
    },

    /// Failed to write raw input to the interpreter
    StdinWriteFailed {
        reason: String,
    },

    // === Signal errors ===
    /// Failed to send signal to process
    SignalSendFailed {
        signal: String,
        reason: String,
    },

    /// Signal handling not supported on platform
    SignalNotSupported {
        signal: String,
        platform: String,
    },

    // === Key binding errors ===
    /// Key chord string could not be parsed
    InvalidKeyChord {
        chord: String,
        reason: String,
    },

    // === Configuration errors ===
    /// Failed to load configuration file
    ConfigLoadFailed {
        path: PathBuf,
        reason: String,
    },

    /// Failed to save configuration file
    ConfigSaveFailed {
        path: PathBuf,
        reason: String,
    },

    /// Configuration file not found
    ConfigNotFound,

    /// Configuration validation failed
    ConfigValidationFailed {
        field: String,
        reason: String,
    },

    /// Failed to serialize configuration
    ConfigSerializationFailed {
        format: String,
        reason: String,
    },

    /// Failed to parse configuration
    ConfigParseFailed {
        format: String,
        reason: String,
    },

    // === I/O and serialization errors ===
    /// I/O errors
    Io(std::io::Error),

    /// Serialization errors
    Serde(serde_json::Error),

    /// TOML parsing errors
    Toml(toml::de::Error),

    // === Generic fallback (use sparingly) ===
    /// Generic errors (for cases not yet categorized)
    Other(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            // Interpreter process errors
            Error::InterpreterSpawnFailed { executable, reason } => {
                write!(f, "Failed to start interpreter '{}': {}", executable, reason)
            }
            Error::HandshakeTimeout { timeout } => {
                write!(f, "Interpreter did not connect within {:?}", timeout)
            }
            Error::HandshakeFailed { reason } => {
                write!(f, "Interpreter handshake failed: {}", reason)
            }
            Error::NoInterpreterRunning => {
                write!(f, "No interpreter is running")
            }
            Error::StreamTakeFailed { stream } => {
                write!(f, "Failed to take interpreter {} stream", stream)
            }

            // Protocol errors
            Error::RequestSendFailed { reason } => {
                write!(f, "Failed to send execution request: {}", reason)
            }
            Error::RequestAbandoned => {
                write!(f, "Interpreter restarted before answering the request")
            }
            Error::RequestTimeout { timeout } => {
                write!(f, "Interpreter did not answer within {:?}", timeout)
            }
            Error::MalformedMessage { line, reason } => {
                write!(f, "Malformed interpreter message '{}': {}", line, reason)
            }
            Error::StdinWriteFailed { reason } => {
                write!(f, "Failed to send input to interpreter: {}", reason)
            }

            // Signal errors
            Error::SignalSendFailed { signal, reason } => {
                write!(f, "Failed to send signal '{}': {}", signal, reason)
            }
            Error::SignalNotSupported { signal, platform } => {
                write!(f, "Signal '{}' not supported on {}", signal, platform)
            }

            // Key binding errors
            Error::InvalidKeyChord { chord, reason } => {
                write!(f, "Invalid key chord '{}': {}", chord, reason)
            }

            // Configuration errors
            Error::ConfigLoadFailed { path, reason } => {
                write!(f, "Failed to load config from '{}': {}", path.display(), reason)
            }
            Error::ConfigSaveFailed { path, reason } => {
                write!(f, "Failed to save config to '{}': {}", path.display(), reason)
            }
            Error::ConfigNotFound => {
                write!(f, "Configuration file not found")
            }
            Error::ConfigValidationFailed { field, reason } => {
                write!(f, "Configuration validation failed for '{}': {}", field, reason)
            }
            Error::ConfigSerializationFailed { format, reason } => {
                write!(f, "Failed to serialize config as {}: {}", format, reason)
            }
            Error::ConfigParseFailed { format, reason } => {
                write!(f, "Failed to parse {} config: {}", format, reason)
            }

            // I/O and serialization errors
            Error::Io(err) => write!(f, "I/O error: {}", err),
            Error::Serde(err) => write!(f, "Serialization error: {}", err),
            Error::Toml(err) => write!(f, "TOML parsing error: {}", err),

            // Generic fallback
            Error::Other(msg) => write!(f, "Error: {}", msg),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Io(err) => Some(err),
            Error::Serde(err) => Some(err),
            Error::Toml(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Io(err)
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Serde(err)
    }
}

impl From<toml::de::Error> for Error {
    fn from(err: toml::de::Error) -> Self {
        Error::Toml(err)
    }
}

impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Self {
        Error::Other(err.to_string())
    }
}

impl From<String> for Error {
    fn from(err: String) -> Self {
        Error::Other(err)
    }
}

impl From<&str> for Error {
    fn from(err: &str) -> Self {
        Error::Other(err.to_string())
    }
}
