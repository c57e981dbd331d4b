//! MosaicRepl - A line-oriented front end for out-of-process interpreters
//!
//! Lines typed at the terminal are collected into a source buffer and
//! handed to the interpreter once they form a complete command. While a
//! command runs, typed lines become its input.

mod terminal;

use std::env;
use std::io::IsTerminal;
use std::path::PathBuf;
use std::process;

use anyhow::Context;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{debug, error, info, warn};

use mosaicrepl::channel::{event_queue, EventReceiver, ProcessChannel};
use mosaicrepl::config::Config;
use mosaicrepl::controller::{Key, KeyAction, KeyChord, KeyMap};
use mosaicrepl::surface::{LineBuffer, SourceBuffer};
use mosaicrepl::{ConfigLoader, ExecutionController};

use terminal::{StatusLine, TerminalSink};

type Repl = ExecutionController<ProcessChannel, TerminalSink, LineBuffer, StatusLine>;

/// Application configuration
#[derive(Debug, Default)]
struct AppArgs {
    /// Configuration file path
    config_path: Option<PathBuf>,
    /// Enable debug mode
    debug: bool,
    /// Disable colored output
    no_color: bool,
    /// Interpreter executable overriding the configuration
    interpreter: Option<PathBuf>,
}

impl AppArgs {
    /// Parse command line arguments
    fn parse() -> anyhow::Result<Self> {
        Self::parse_from(env::args().skip(1))
    }

    fn parse_from(args: impl IntoIterator<Item = String>) -> anyhow::Result<Self> {
        let mut app_args = AppArgs::default();
        let mut args = args.into_iter();

        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--config" | "-c" => {
                    let path = args.next().context("Missing config file path")?;
                    app_args.config_path = Some(PathBuf::from(path));
                }
                "--debug" | "-d" => {
                    app_args.debug = true;
                }
                "--no-color" => {
                    app_args.no_color = true;
                }
                "--help" | "-?" => {
                    print_help();
                    process::exit(0);
                }
                "--version" | "-v" => {
                    println!("{} v{}", mosaicrepl::NAME, mosaicrepl::VERSION);
                    process::exit(0);
                }
                flag if flag.starts_with('-') => {
                    anyhow::bail!("Unknown option: {}", flag);
                }
                _ => {
                    if app_args.interpreter.is_some() {
                        anyhow::bail!("Unexpected argument: {}", arg);
                    }
                    app_args.interpreter = Some(PathBuf::from(arg));
                }
            }
        }

        Ok(app_args)
    }
}

/// Print help information
fn print_help() {
    println!("MosaicRepl - A front end for out-of-process interpreters");
    println!();
    println!("USAGE:");
    println!("    mosaicrepl [OPTIONS] [INTERPRETER]");
    println!();
    println!("OPTIONS:");
    println!("    -c, --config <PATH>    Path to configuration file");
    println!("    -d, --debug            Enable debug mode");
    println!("        --no-color         Disable colored output");
    println!("    -?, --help             Print this help message");
    println!("    -v, --version          Print version information");
    println!();
    println!("COMMANDS:");
    println!("    <empty line>           Execute the buffered multi-line command");
    println!("    :exec                  Execute the buffer, or send it as input");
    println!("    :interrupt             Interrupt the running command (also Ctrl+C)");
    println!("    :restart               Restart the interpreter");
    println!("    :clear                 Discard the buffered command");
    println!();
    println!("CONFIGURATION:");
    println!("    MosaicRepl looks for configuration files in the following order:");
    println!("    1. Path specified with --config or MOSAICREPL_CONFIG");
    println!("    2. $XDG_CONFIG_HOME/mosaicrepl/config.toml");
    println!("    3. ~/.config/mosaicrepl/config.toml");
    println!("    4. ~/.mosaicrepl/config.toml");
    println!("    5. ./.mosaicrepl/config.toml");
    println!("    6. Built-in defaults");
    println!();
    println!("ENVIRONMENT:");
    println!("    MOSAICREPL_CONFIG      Path to configuration file");
    println!("    MOSAICREPL_DEBUG       Enable debug mode (1 or true)");
    println!("    RUST_LOG               Set logging level (error, warn, info, debug, trace)");
}

fn init_logging(debug: bool) {
    let debug = debug
        || env::var("MOSAICREPL_DEBUG")
            .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
            .unwrap_or(false);
    let log_level = if debug { "debug" } else { "info" };

    let env_filter = env::var("RUST_LOG").unwrap_or_else(|_| log_level.to_string());
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::new(env_filter))
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .init();
}

/// Load configuration from file or use defaults
fn load_configuration(args: &AppArgs) -> anyhow::Result<Config> {
    let mut config = match &args.config_path {
        Some(path) => {
            debug!("Loading config from: {}", path.display());
            ConfigLoader::load_from_path(path)
                .with_context(|| format!("Failed to load config from {}", path.display()))?
        }
        None => mosaicrepl::init()?,
    };

    if let Some(interpreter) = &args.interpreter {
        debug!("Interpreter override: {}", interpreter.display());
        config.interpreter.executable = interpreter.clone();
    }
    if args.no_color {
        config.output.use_color = false;
    }

    Ok(config)
}

#[tokio::main]
async fn main() {
    let args = AppArgs::parse().unwrap_or_else(|e| {
        eprintln!("Failed to parse arguments: {}", e);
        print_help();
        process::exit(1);
    });

    init_logging(args.debug);

    if let Err(e) = run(args).await {
        error!("{:#}", e);
        process::exit(1);
    }
}

async fn run(args: AppArgs) -> anyhow::Result<()> {
    info!("Starting {} v{}", mosaicrepl::NAME, mosaicrepl::VERSION);

    let config = load_configuration(&args)?;
    let keymap = KeyMap::from_bindings(&config.key_bindings)?;

    let (events, mut receiver) = event_queue();
    let channel = ProcessChannel::spawn(config.interpreter.clone(), events).with_context(|| {
        format!(
            "Failed to start interpreter {}",
            config.interpreter.executable.display()
        )
    })?;

    let local_echo = std::io::stdin().is_terminal();
    let mut repl: Repl = ExecutionController::new(
        channel,
        TerminalSink::new(config.output.clone(), local_echo),
        LineBuffer::new(),
        StatusLine::new(config.output.use_color),
    )
    .with_prompt(config.session.prompt.clone())
    .with_keymap(keymap);

    if config.session.show_welcome {
        repl.show_welcome(&config.session.welcome_text());
    }

    event_loop(&mut repl, &mut receiver).await;

    repl.channel_mut().shutdown();
    info!("{} shutdown complete", mosaicrepl::NAME);
    Ok(())
}

/// Multiplex typed lines, Ctrl+C and interpreter events
async fn event_loop(repl: &mut Repl, receiver: &mut EventReceiver) {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        tokio::select! {
            line = lines.next_line() => match line {
                Ok(Some(line)) => {
                    // Validation requests block until the interpreter answers
                    tokio::task::block_in_place(|| handle_line(repl, &line));
                }
                Ok(None) => {
                    debug!("End of input");
                    break;
                }
                Err(e) => {
                    error!("Failed to read input: {}", e);
                    break;
                }
            },
            event = receiver.recv() => match event {
                Some(event) => repl.handle_event(event),
                None => break,
            },
            signal = tokio::signal::ctrl_c() => {
                if let Err(e) = signal {
                    warn!("Ctrl+C handler failed: {}", e);
                    break;
                }
                repl.handle_key(&KeyChord::ctrl(Key::Char('c')));
            }
        }
    }
}

/// Apply one typed line
fn handle_line(repl: &mut Repl, line: &str) {
    match line.trim() {
        ":exec" => {
            repl.dispatch(KeyAction::Execute);
            return;
        }
        ":interrupt" => {
            repl.dispatch(KeyAction::Interrupt);
            return;
        }
        ":restart" => {
            repl.dispatch(KeyAction::Restart);
            return;
        }
        ":clear" => {
            repl.buffer_mut().clear();
            return;
        }
        _ => {}
    }

    if repl.session().is_executing() {
        // Input for the running command
        repl.buffer_mut().set_text(line);
        repl.dispatch(KeyAction::Execute);
        return;
    }

    if line.is_empty() {
        if !repl.buffer().is_empty() {
            repl.dispatch(KeyAction::Execute);
        }
        return;
    }

    let buffer = repl.buffer_mut();
    buffer.place_cursor_at_end();
    buffer.insert(line);
    if !repl.handle_key(&KeyChord::plain(Key::Return)) {
        repl.buffer_mut().insert("\n");
        repl.output_mut().continuation_prompt();
    }
}
