//! Interpreter Signal Delivery
//!
//! Out-of-band signals sent to the interpreter process. Interrupt is the
//! only signal the session protocol needs; termination goes through the
//! child handle so it works on every platform.

use crate::error::{Error, Result};

/// Signals the front end can deliver to an interpreter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Signal {
    /// Keyboard interrupt (Ctrl+C)
    Interrupt,
}

impl Signal {
    pub fn name(&self) -> &'static str {
        match self {
            Signal::Interrupt => "SIGINT",
        }
    }
}

/// Send `signal` to the process `pid`
pub fn send_signal(pid: u32, signal: Signal) -> Result<()> {
    #[cfg(unix)]
    {
        send_unix_signal(pid, signal)
    }

    #[cfg(not(unix))]
    {
        let _ = pid;
        Err(Error::SignalNotSupported {
            signal: signal.name().to_string(),
            platform: std::env::consts::OS.to_string(),
        })
    }
}

#[cfg(unix)]
fn send_unix_signal(pid: u32, signal: Signal) -> Result<()> {
    use nix::sys::signal::{kill, Signal as NixSignal};
    use nix::unistd::Pid;

    let raw_pid = i32::try_from(pid).map_err(|_| Error::SignalSendFailed {
        signal: signal.name().to_string(),
        reason: format!("pid {} out of range", pid),
    })?;

    let nix_signal = match signal {
        Signal::Interrupt => NixSignal::SIGINT,
    };

    kill(Pid::from_raw(raw_pid), nix_signal).map_err(|e| Error::SignalSendFailed {
        signal: signal.name().to_string(),
        reason: e.to_string(),
    })
}
