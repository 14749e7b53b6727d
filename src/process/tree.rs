//! Process tree inspection and signalling.
//!
//! Descendants are discovered by walking parent links in a `sysinfo`
//! process snapshot. Signals go through `nix` on unix; a process that is
//! already gone counts as successfully signalled.

use std::collections::{HashMap, HashSet, VecDeque};
use std::io;

use sysinfo::{Pid, ProcessRefreshKind, ProcessStatus, System};
use tracing::debug;

use super::signal::TermSignal;

/// All transitive descendants of `pid`, closest first.
///
/// The snapshot is taken once; processes created afterwards are not seen.
pub fn descendants(pid: u32) -> Vec<u32> {
    let mut system = System::new();
    system.refresh_processes_specifics(ProcessRefreshKind::new());

    let mut children: HashMap<u32, Vec<u32>> = HashMap::new();
    for (child_pid, process) in system.processes() {
        if let Some(parent) = process.parent() {
            children
                .entry(parent.as_u32())
                .or_default()
                .push(child_pid.as_u32());
        }
    }

    let mut seen = HashSet::from([pid]);
    let mut queue = VecDeque::from([pid]);
    let mut found = Vec::new();

    while let Some(current) = queue.pop_front() {
        for &child in children.get(&current).into_iter().flatten() {
            if seen.insert(child) {
                found.push(child);
                queue.push_back(child);
            }
        }
    }

    found
}

/// Whether `pid` currently resolves to a live (non-zombie) process.
pub fn is_alive(pid: u32) -> bool {
    let mut system = System::new();
    let sys_pid = Pid::from_u32(pid);
    if !system.refresh_process_specifics(sys_pid, ProcessRefreshKind::new()) {
        return false;
    }
    system
        .process(sys_pid)
        .map(|p| !matches!(p.status(), ProcessStatus::Zombie | ProcessStatus::Dead))
        .unwrap_or(false)
}

/// Send `signal` to a single process.
pub fn signal_process(pid: u32, signal: TermSignal) -> io::Result<()> {
    #[cfg(unix)]
    {
        use nix::errno::Errno;
        use nix::sys::signal::kill;
        use nix::unistd::Pid as NixPid;

        match kill(NixPid::from_raw(pid as i32), signal.as_nix()) {
            Ok(()) => {
                debug!(pid, %signal, "Signalled process");
                Ok(())
            }
            Err(Errno::ESRCH) => Ok(()),
            Err(e) => Err(io::Error::from(e)),
        }
    }

    #[cfg(not(unix))]
    {
        let mut system = System::new();
        let sys_pid = Pid::from_u32(pid);
        if !system.refresh_process_specifics(sys_pid, ProcessRefreshKind::new()) {
            return Ok(());
        }
        if let Some(process) = system.process(sys_pid) {
            let delivered = process
                .kill_with(signal.as_sysinfo())
                .unwrap_or_else(|| process.kill());
            if !delivered && is_alive(pid) {
                return Err(io::Error::other(format!("failed to signal pid {}", pid)));
            }
            debug!(pid, %signal, "Signalled process");
        }
        Ok(())
    }
}

/// Send `signal` to every member of the process group led by `pgid`.
#[cfg(unix)]
pub fn signal_group(pgid: u32, signal: TermSignal) -> io::Result<()> {
    use nix::errno::Errno;
    use nix::sys::signal::killpg;
    use nix::unistd::Pid as NixPid;

    match killpg(NixPid::from_raw(pgid as i32), signal.as_nix()) {
        Ok(()) => {
            debug!(pgid, %signal, "Signalled process group");
            Ok(())
        }
        Err(Errno::ESRCH) => Ok(()),
        Err(e) => Err(io::Error::from(e)),
    }
}
