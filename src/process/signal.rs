//! Termination signals
//!
//! A small portable vocabulary of signals. Unix maps onto real signals via
//! `nix`; other platforms fall back to what `sysinfo` can deliver.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Signal used to terminate a process tree
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TermSignal {
    /// Non-catchable kill (SIGKILL)
    Kill,
    /// Polite termination request (SIGTERM)
    Terminate,
    /// Interrupt (SIGINT)
    Interrupt,
    /// Hangup (SIGHUP)
    Hangup,
}

impl TermSignal {
    /// Strongest signal the platform offers: `Kill` on unix, `Terminate` elsewhere.
    pub const fn platform_default() -> Self {
        if cfg!(unix) {
            TermSignal::Kill
        } else {
            TermSignal::Terminate
        }
    }

    #[cfg(unix)]
    pub(crate) fn as_nix(self) -> nix::sys::signal::Signal {
        use nix::sys::signal::Signal;

        match self {
            TermSignal::Kill => Signal::SIGKILL,
            TermSignal::Terminate => Signal::SIGTERM,
            TermSignal::Interrupt => Signal::SIGINT,
            TermSignal::Hangup => Signal::SIGHUP,
        }
    }

    #[cfg(not(unix))]
    pub(crate) fn as_sysinfo(self) -> sysinfo::Signal {
        match self {
            TermSignal::Kill => sysinfo::Signal::Kill,
            TermSignal::Terminate => sysinfo::Signal::Term,
            TermSignal::Interrupt => sysinfo::Signal::Interrupt,
            TermSignal::Hangup => sysinfo::Signal::Hangup,
        }
    }
}

impl Default for TermSignal {
    fn default() -> Self {
        Self::platform_default()
    }
}

impl fmt::Display for TermSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TermSignal::Kill => "kill",
            TermSignal::Terminate => "terminate",
            TermSignal::Interrupt => "interrupt",
            TermSignal::Hangup => "hangup",
        };
        f.write_str(name)
    }
}

impl FromStr for TermSignal {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().trim_start_matches("sig") {
            "kill" => Ok(TermSignal::Kill),
            "term" | "terminate" => Ok(TermSignal::Terminate),
            "int" | "interrupt" => Ok(TermSignal::Interrupt),
            "hup" | "hangup" => Ok(TermSignal::Hangup),
            other => Err(format!("unknown signal '{}'", other)),
        }
    }
}
