//! MosaicRepl - A front end for out-of-process interpreters
//!
//! This library provides the execution session core of MosaicRepl: the
//! logic that decides when buffered source is a complete command, hands it
//! to a long-lived interpreter process, and routes the interpreter's
//! output, results and restarts back to the user.
//!
//! ## Module Organization
//!
//! ### Core Functionality
//!
//! - [`controller`] - Session state machine, key map, execute/interrupt/restart
//! - [`channel`] - Interpreter process transport, event queue, signals
//! - [`protocol`] - Request/response/result message shapes and the wire codec
//!
//! ### Presentation Seams
//!
//! - [`surface`] - Output, source buffer and status traits plus in-memory implementations
//!
//! ### Utilities
//!
//! - [`config`] - Configuration loading, interpreter launch settings, styles
//! - [`mod@error`] - Error types and Result aliases
//!
//! ## Quick Start
//!
//! ```no_run
//! use mosaicrepl::channel::{event_queue, ProcessChannel};
//! use mosaicrepl::surface::{LineBuffer, StatusHistory, Transcript};
//! use mosaicrepl::ExecutionController;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = mosaicrepl::init()?;
//! let (events, mut receiver) = event_queue();
//! let channel = ProcessChannel::spawn(config.interpreter.clone(), events)?;
//!
//! let mut controller = ExecutionController::new(
//!     channel,
//!     Transcript::new(),
//!     LineBuffer::with_text("print(1)"),
//!     StatusHistory::new(),
//! );
//! controller.execute(true);
//! while let Some(event) = receiver.blocking_recv() {
//!     controller.handle_event(event);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! - **Controller:** single-threaded; owned by the front end's event loop
//! - **Reader Threads:** pump interpreter stdout, stderr and the message socket
//! - **Writer Thread:** owns the interpreter's stdin
//!
//! Reader threads publish into an unbounded `tokio::mpsc` queue that the
//! event loop drains into [`ExecutionController::handle_event`].

#[macro_use]
extern crate tracing;

pub mod channel;
pub mod config;
pub mod controller;
pub mod error;
pub mod protocol;
pub mod surface;

// Re-exports for core functionality
pub use channel::{ChannelEvent, InterpreterChannel, ProcessChannel};
pub use config::Config;
pub use controller::{ExecuteOutcome, ExecutionController};
pub use error::{Error, Result};

// Convenience re-exports for common types
pub use config::loader::ConfigLoader;
pub use surface::{OutputSink, OutputTag, SourceBuffer, StatusSurface};

// Version information
/// The current version of MosaicRepl from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// The application name from Cargo.toml
pub const NAME: &str = env!("CARGO_PKG_NAME");

/// The application description from Cargo.toml
pub const DESCRIPTION: &str = env!("CARGO_PKG_DESCRIPTION");

/// Initialize MosaicRepl with default settings
///
/// Loads configuration from the default locations, falling back to
/// defaults when no file exists or loading fails.
///
/// # Examples
///
/// ```no_run
/// use mosaicrepl::init;
///
/// match init() {
///     Ok(config) => println!("Interpreter: {}", config.interpreter.executable.display()),
///     Err(e) => eprintln!("Initialization failed: {}", e),
/// }
/// ```
pub fn init() -> Result<Config> {
    info!("Initializing {} v{}", NAME, VERSION);

    let config = match ConfigLoader::load() {
        Ok(config) => config,
        Err(e) => {
            warn!("Failed to load configuration: {}. Using defaults", e);
            Config::default()
        }
    };

    debug!(
        "Interpreter: {} {:?}",
        config.interpreter.executable.display(),
        config.interpreter.args
    );
    Ok(config)
}

/// Initialize MosaicRepl from a specific configuration file
pub fn init_with_config(config_path: &std::path::Path) -> Result<Config> {
    info!(
        "Initializing {} v{} with config: {}",
        NAME,
        VERSION,
        config_path.display()
    );

    let config = ConfigLoader::load_from_path(config_path).map_err(|e| {
        error!(
            "Failed to load configuration from {}: {}",
            config_path.display(),
            e
        );
        e
    })?;

    info!("Configuration loaded from: {}", config_path.display());
    Ok(config)
}
