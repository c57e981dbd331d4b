//! Process-backed Interpreter Channel
//!
//! Launches the interpreter with separate stdin/stdout/stderr pipes and a
//! loopback message socket. The child learns the socket port from the
//! `MOSAICREPL_PORT` environment variable and must connect back within the
//! handshake timeout. Blocking pipe and socket reads run on dedicated
//! threads that publish into the controller's event queue.

use std::io::{BufRead, BufReader, Read, Write};
use std::net::{Shutdown, TcpListener, TcpStream};
use std::process::{Child, ChildStderr, ChildStdin, ChildStdout, Command, Stdio};
use std::sync::mpsc::{channel, Receiver, RecvTimeoutError, Sender};
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};

use super::events::EventSender;
use super::signals::{send_signal, Signal};
use super::{ChannelEvent, Generation, InterpreterChannel};
use crate::config::InterpreterConfig;
use crate::error::{Error, Result};
use crate::protocol::{
    decode_inbound, encode_request, is_result_line, ExecutionRequest, ExecutionResponse, Inbound,
    StreamKind,
};

/// Environment variable carrying the message socket port
pub const PORT_ENV: &str = "MOSAICREPL_PORT";

/// Decoded answer to a request, or the reason it could not be decoded
type Answer = Result<ExecutionResponse>;

/// Descriptive information about the running interpreter instance
#[derive(Debug, Clone, PartialEq)]
pub struct InstanceInfo {
    /// Instance sequence number
    pub generation: Generation,
    /// OS process identifier
    pub pid: u32,
    /// Executable that was launched
    pub executable: String,
    /// When the instance finished its handshake
    pub started_at: DateTime<Utc>,
}

/// A running interpreter process
struct Instance {
    info: InstanceInfo,
    child: Child,
    /// Write half of the message socket
    requests: TcpStream,
    /// Responses routed from the message reader thread
    responses: Arc<Mutex<Receiver<Answer>>>,
    /// Raw input for the stdin writer thread
    stdin_tx: Sender<Vec<u8>>,
}

/// I/O endpoints handed to the pump threads once an instance is announced
struct Pumps {
    stdin: ChildStdin,
    stdin_rx: Receiver<Vec<u8>>,
    stdout: ChildStdout,
    stderr: ChildStderr,
    messages: TcpStream,
    response_tx: Sender<Answer>,
}

struct State {
    generation: Generation,
    instance: Option<Instance>,
    shutting_down: bool,
}

struct Shared {
    config: InterpreterConfig,
    events: EventSender,
    state: Mutex<State>,
}

impl Shared {
    fn lock_state(&self) -> MutexGuard<'_, State> {
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// [`InterpreterChannel`] backed by a child process
pub struct ProcessChannel {
    shared: Arc<Shared>,
}

impl ProcessChannel {
    /// Launch the first interpreter instance (generation 1)
    pub fn spawn(config: InterpreterConfig, events: EventSender) -> Result<Self> {
        let shared = Arc::new(Shared {
            config,
            events,
            state: Mutex::new(State {
                generation: 0,
                instance: None,
                shutting_down: false,
            }),
        });

        {
            let mut state = shared.lock_state();
            let generation = 1;
            let (instance, pumps) = launch(&shared.config, generation)?;
            info!(
                "Interpreter '{}' started (pid {})",
                instance.info.executable, instance.info.pid
            );
            state.generation = generation;
            state.instance = Some(instance);
            start_pumps(&shared, generation, pumps);
        }

        Ok(Self { shared })
    }

    /// Information about the current instance, if one is running
    pub fn instance_info(&self) -> Option<InstanceInfo> {
        self.shared
            .lock_state()
            .instance
            .as_ref()
            .map(|instance| instance.info.clone())
    }

    /// Check whether an interpreter instance is running
    pub fn is_running(&self) -> bool {
        self.shared.lock_state().instance.is_some()
    }

    /// Terminate the interpreter without relaunching it
    pub fn shutdown(&mut self) {
        let mut state = self.shared.lock_state();
        state.shutting_down = true;
        if let Some(instance) = state.instance.take() {
            debug!("Shutting down interpreter (pid {})", instance.info.pid);
            terminate(instance);
        }
    }

    /// Restart if `generation` is still the current instance
    fn restart_if_current(&self, generation: Generation) -> Result<()> {
        let mut state = self.shared.lock_state();
        if state.generation != generation {
            return Ok(());
        }
        relaunch(&self.shared, &mut state)
    }
}

impl InterpreterChannel for ProcessChannel {
    fn request(&mut self, request: &ExecutionRequest) -> Result<ExecutionResponse> {
        let (mut writer, responses, generation) = {
            let state = self.shared.lock_state();
            let instance = state.instance.as_ref().ok_or(Error::NoInterpreterRunning)?;
            let writer = instance
                .requests
                .try_clone()
                .map_err(|e| Error::RequestSendFailed {
                    reason: e.to_string(),
                })?;
            (writer, instance.responses.clone(), state.generation)
        };

        let receiver = responses
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        // Anything queued now answers nobody
        while let Ok(stale) = receiver.try_recv() {
            warn!("Discarding unsolicited interpreter response: {:?}", stale);
        }

        let line = encode_request(request)?;
        writer
            .write_all(line.as_bytes())
            .and_then(|_| writer.flush())
            .map_err(|e| Error::RequestSendFailed {
                reason: e.to_string(),
            })?;
        debug!("Sent execution request ({} bytes)", request.source.len());

        match self.shared.config.request_timeout() {
            None => receiver.recv().map_err(|_| Error::RequestAbandoned)?,
            Some(timeout) => match receiver.recv_timeout(timeout) {
                Ok(answer) => answer,
                Err(RecvTimeoutError::Disconnected) => Err(Error::RequestAbandoned),
                Err(RecvTimeoutError::Timeout) => {
                    drop(receiver);
                    warn!(
                        "Interpreter did not answer within {:?}, restarting it",
                        timeout
                    );
                    self.restart_if_current(generation)?;
                    Err(Error::RequestTimeout { timeout })
                }
            },
        }
    }

    fn write(&mut self, data: &[u8]) -> Result<()> {
        let state = self.shared.lock_state();
        let instance = state.instance.as_ref().ok_or(Error::NoInterpreterRunning)?;
        instance
            .stdin_tx
            .send(data.to_vec())
            .map_err(|e| Error::StdinWriteFailed {
                reason: e.to_string(),
            })
    }

    fn interrupt(&mut self) -> Result<()> {
        let pid = {
            let state = self.shared.lock_state();
            state
                .instance
                .as_ref()
                .map(|instance| instance.info.pid)
                .ok_or(Error::NoInterpreterRunning)?
        };
        debug!("Interrupting interpreter (pid {})", pid);
        send_signal(pid, Signal::Interrupt)
    }

    fn kill(&mut self) -> Result<()> {
        let mut state = self.shared.lock_state();
        info!("Restarting interpreter on request");
        relaunch(&self.shared, &mut state)
    }

    fn generation(&self) -> Generation {
        self.shared.lock_state().generation
    }
}

impl Drop for ProcessChannel {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Replace the current instance with a fresh one and announce it
fn relaunch(shared: &Arc<Shared>, state: &mut State) -> Result<()> {
    if let Some(old) = state.instance.take() {
        terminate(old);
    }
    if state.shutting_down {
        return Ok(());
    }

    let generation = state.generation + 1;
    state.generation = generation;

    let (instance, pumps) = launch(&shared.config, generation).map_err(|e| {
        error!("Failed to relaunch interpreter: {}", e);
        e
    })?;
    info!(
        "Interpreter restarted (generation {}, pid {})",
        generation, instance.info.pid
    );
    state.instance = Some(instance);

    // Announce before any output of the new instance can be published
    shared.events.publish(ChannelEvent::Restarted { generation });
    start_pumps(shared, generation, pumps);
    Ok(())
}

/// Kill and reap an instance, closing its message socket
fn terminate(mut instance: Instance) {
    let _ = instance.requests.shutdown(Shutdown::Both);
    if let Err(e) = instance.child.kill() {
        debug!("Interpreter already exited: {}", e);
    }
    match instance.child.wait() {
        Ok(status) => debug!("Interpreter (pid {}) reaped: {}", instance.info.pid, status),
        Err(e) => warn!("Failed to reap interpreter (pid {}): {}", instance.info.pid, e),
    }
}

/// Spawn the interpreter and complete the socket handshake
fn launch(config: &InterpreterConfig, generation: Generation) -> Result<(Instance, Pumps)> {
    let listener = TcpListener::bind(("127.0.0.1", 0))?;
    let port = listener.local_addr()?.port();

    let mut command = Command::new(&config.executable);
    command
        .args(&config.args)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());
    if !config.inherit_env {
        command.env_clear();
    }
    command
        .envs(&config.environment)
        .env(PORT_ENV, port.to_string());
    if let Some(dir) = &config.working_directory {
        command.current_dir(dir);
    }
    #[cfg(unix)]
    {
        use std::os::unix::process::CommandExt;
        // Terminal Ctrl+C must reach only the front end, which forwards it
        command.process_group(0);
    }

    let mut child = command.spawn().map_err(|e| Error::InterpreterSpawnFailed {
        executable: config.executable.display().to_string(),
        reason: e.to_string(),
    })?;

    let pipes = (child.stdin.take(), child.stdout.take(), child.stderr.take());
    let (stdin, stdout, stderr) = match pipes {
        (Some(stdin), Some(stdout), Some(stderr)) => (stdin, stdout, stderr),
        (stdin, stdout, _) => {
            abort(&mut child);
            let stream = if stdin.is_none() {
                "stdin"
            } else if stdout.is_none() {
                "stdout"
            } else {
                "stderr"
            };
            return Err(Error::StreamTakeFailed {
                stream: stream.to_string(),
            });
        }
    };

    let messages = match accept_handshake(&listener, &mut child, config.handshake_timeout()) {
        Ok(stream) => stream,
        Err(e) => {
            abort(&mut child);
            return Err(e);
        }
    };
    let requests = match messages.try_clone() {
        Ok(stream) => stream,
        Err(e) => {
            abort(&mut child);
            return Err(e.into());
        }
    };

    let (response_tx, response_rx) = channel::<Answer>();
    let (stdin_tx, stdin_rx) = channel::<Vec<u8>>();

    let instance = Instance {
        info: InstanceInfo {
            generation,
            pid: child.id(),
            executable: config.executable.display().to_string(),
            started_at: Utc::now(),
        },
        child,
        requests,
        responses: Arc::new(Mutex::new(response_rx)),
        stdin_tx,
    };
    let pumps = Pumps {
        stdin,
        stdin_rx,
        stdout,
        stderr,
        messages,
        response_tx,
    };
    Ok((instance, pumps))
}

fn abort(child: &mut Child) {
    let _ = child.kill();
    let _ = child.wait();
}

/// Wait for the interpreter to connect its message socket
fn accept_handshake(
    listener: &TcpListener,
    child: &mut Child,
    timeout: Duration,
) -> Result<TcpStream> {
    listener.set_nonblocking(true)?;
    let deadline = Instant::now() + timeout;

    loop {
        match listener.accept() {
            Ok((stream, addr)) => {
                debug!("Interpreter connected from {}", addr);
                stream.set_nonblocking(false)?;
                stream.set_nodelay(true)?;
                return Ok(stream);
            }
            Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => {
                if let Some(status) = child.try_wait()? {
                    return Err(Error::HandshakeFailed {
                        reason: format!("interpreter exited before connecting ({})", status),
                    });
                }
                if Instant::now() >= deadline {
                    return Err(Error::HandshakeTimeout { timeout });
                }
                thread::sleep(Duration::from_millis(10));
            }
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(e) => {
                return Err(Error::HandshakeFailed {
                    reason: e.to_string(),
                })
            }
        }
    }
}

fn start_pumps(shared: &Arc<Shared>, generation: Generation, pumps: Pumps) {
    spawn_stdin_writer(pumps.stdin, pumps.stdin_rx);
    spawn_stream_reader(
        pumps.stdout,
        StreamKind::Stdout,
        generation,
        shared.events.clone(),
    );
    spawn_stream_reader(
        pumps.stderr,
        StreamKind::Stderr,
        generation,
        shared.events.clone(),
    );
    spawn_message_reader(
        shared.clone(),
        generation,
        pumps.messages,
        pumps.response_tx,
    );
}

/// Reader thread: forward a stdout/stderr pipe as output events
fn spawn_stream_reader<R>(
    mut reader: R,
    stream: StreamKind,
    generation: Generation,
    events: EventSender,
) where
    R: Read + Send + 'static,
{
    thread::spawn(move || {
        let mut buf = [0u8; 4096];
        let mut decoder = Utf8Decoder::default();
        let mut consecutive_errors = 0;
        const MAX_CONSECUTIVE_ERRORS: u32 = 5;

        loop {
            match reader.read(&mut buf) {
                Ok(0) => {
                    debug!("Interpreter {} closed (generation {})", stream.as_str(), generation);
                    break;
                }
                Ok(n) => {
                    consecutive_errors = 0;
                    let text = decoder.decode(&buf[..n]);
                    if text.is_empty() {
                        continue;
                    }
                    events.publish(ChannelEvent::Output {
                        generation,
                        stream,
                        text,
                    });
                }
                Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
                Err(e) => {
                    consecutive_errors += 1;
                    warn!(
                        "Interpreter {} read error: {} (attempt {}/{})",
                        stream.as_str(),
                        e,
                        consecutive_errors,
                        MAX_CONSECUTIVE_ERRORS
                    );
                    if consecutive_errors >= MAX_CONSECUTIVE_ERRORS {
                        error!(
                            "Too many consecutive {} read errors, stopping reader",
                            stream.as_str()
                        );
                        break;
                    }
                    thread::sleep(Duration::from_millis(50));
                }
            }
        }

        let tail = decoder.finish();
        if !tail.is_empty() {
            events.publish(ChannelEvent::Output {
                generation,
                stream,
                text: tail,
            });
        }
    });
}

/// Writer thread: receive raw input and write it to the child's stdin
fn spawn_stdin_writer(mut stdin: ChildStdin, rx: Receiver<Vec<u8>>) {
    thread::spawn(move || {
        while let Ok(data) = rx.recv() {
            let written = stdin.write_all(&data).and_then(|_| stdin.flush());
            if let Err(e) = written {
                // A closed pipe means the instance is gone; its restart is
                // announced by the message reader
                warn!("Interpreter stdin write failed: {}", e);
                break;
            }
        }
        debug!("Interpreter stdin writer exiting");
    });
}

/// Reader thread: decode socket messages and route them
fn spawn_message_reader(
    shared: Arc<Shared>,
    generation: Generation,
    messages: TcpStream,
    response_tx: Sender<Answer>,
) {
    thread::spawn(move || {
        let mut reader = BufReader::new(messages);
        let mut line = String::new();

        loop {
            line.clear();
            match reader.read_line(&mut line) {
                Ok(0) => break,
                Ok(_) if line.trim().is_empty() => continue,
                Ok(_) => match decode_inbound(&line) {
                    Ok(Inbound::Response(response)) => {
                        if response_tx.send(Ok(response)).is_err() {
                            debug!("No request is waiting for the response");
                        }
                    }
                    Ok(Inbound::Result(result)) => {
                        shared
                            .events
                            .publish(ChannelEvent::ExecutionFinished { generation, result });
                    }
                    Err(e) if is_result_line(&line) => warn!("{}", e),
                    Err(e) => {
                        // The interpreter did answer; fail the request
                        warn!("{}", e);
                        if response_tx.send(Err(e)).is_err() {
                            debug!("No request is waiting for the response");
                        }
                    }
                },
                Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
                Err(e) => {
                    debug!("Message socket read failed: {}", e);
                    break;
                }
            }
        }

        // Unblock a request still waiting on this instance
        drop(response_tx);
        debug!("Message socket closed (generation {})", generation);
        on_instance_exit(&shared, generation);
    });
}

/// Handle the message socket of `generation` closing
fn on_instance_exit(shared: &Arc<Shared>, generation: Generation) {
    let mut state = shared.lock_state();
    if state.shutting_down || state.generation != generation || state.instance.is_none() {
        // Deliberate kill or shutdown; already handled
        return;
    }

    if !shared.config.restart_on_exit {
        warn!("Interpreter exited (generation {}), not restarting", generation);
        if let Some(instance) = state.instance.take() {
            terminate(instance);
        }
        return;
    }

    warn!("Interpreter exited unexpectedly (generation {}), restarting", generation);
    if let Err(e) = relaunch(shared, &mut state) {
        error!("Interpreter could not be restarted: {}", e);
    }
}

/// Incremental UTF-8 decoder that keeps split multi-byte sequences
/// until the rest of the bytes arrive
#[derive(Debug, Default)]
struct Utf8Decoder {
    pending: Vec<u8>,
}

impl Utf8Decoder {
    fn decode(&mut self, bytes: &[u8]) -> String {
        self.pending.extend_from_slice(bytes);
        let mut out = String::new();

        loop {
            match std::str::from_utf8(&self.pending) {
                Ok(text) => {
                    out.push_str(text);
                    self.pending.clear();
                    break;
                }
                Err(e) => {
                    let valid = e.valid_up_to();
                    out.push_str(&String::from_utf8_lossy(&self.pending[..valid]));
                    match e.error_len() {
                        // Incomplete sequence at the end: wait for more bytes
                        None => {
                            self.pending.drain(..valid);
                            break;
                        }
                        Some(len) => {
                            out.push(char::REPLACEMENT_CHARACTER);
                            self.pending.drain(..valid + len);
                        }
                    }
                }
            }
        }

        out
    }

    fn finish(&mut self) -> String {
        let tail = String::from_utf8_lossy(&self.pending).into_owned();
        self.pending.clear();
        tail
    }
}
