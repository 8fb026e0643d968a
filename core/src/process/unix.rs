//! Unix clean spawning: default signal dispositions, own session, no leaked fds
//!
//! A clean spawn forks a child, prepares it between `fork` and `exec`, runs
//! the target program and blocks until it terminates. Preparation happens in
//! a `pre_exec` hook and is limited to async-signal-safe calls:
//!
//! 1. every catchable signal, real-time signals included, is reset to
//!    `SIG_DFL` and the signal mask is cleared. Caught handlers are reset by
//!    `exec` anyway, but `SIG_IGN` survives it and would otherwise leak into
//!    the child;
//! 2. `setsid()` makes the child a session and process group leader, so
//!    signals aimed at the parent's process group (a terminal ^C, a
//!    `killpg` from a job controller) do not reach it;
//! 3. every descriptor above stderr is marked close-on-exec, so descriptors
//!    the parent opened without `O_CLOEXEC` are not inherited.
//!
//! The environment and working directory are inherited unchanged. SIGCHLD is
//! held at its default disposition in the parent for the duration of the
//! wait, so a host that ignores SIGCHLD still gets the child's status.

// pre_exec and sigaction are unsafe; the hook below only makes async-signal-safe calls
#![allow(unsafe_code)]

use super::interrupts::{self, SavedActions};
use crate::config::SpawnOptions;
use crate::error::SpawnFailure;
use nix::sys::resource::{getrlimit, Resource};
use nix::sys::signal::{pthread_sigmask, sigaction, SigSet, SigmaskHow, Signal};
use nix::unistd::setsid;
use std::ffi::OsStr;
use std::fmt;
use std::io;
use std::os::fd::RawFd;
use std::os::unix::process::{CommandExt, ExitStatusExt};
use std::process::{Child, Command, ExitStatus};
use tracing::{debug, warn};

/// Upper bound for the close-on-exec sweep when `close_range` is unavailable
const FD_SWEEP_CAP: u64 = 65_536;

#[cfg(target_os = "linux")]
const CLOSE_RANGE_CLOEXEC: libc::c_uint = 1 << 2;

/// How a cleanly spawned child terminated
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitOutcome {
    /// The child exited normally with this status code
    Exited(i32),
    /// The child was terminated by this signal number
    Signaled(i32),
    /// `wait` reported a status that is neither an exit nor a signal death
    Unknown(i32),
}

impl ExitOutcome {
    /// True only for a normal exit with status zero
    pub fn success(&self) -> bool {
        matches!(self, ExitOutcome::Exited(0))
    }

    /// Exit code for normal exits
    pub fn code(&self) -> Option<i32> {
        match self {
            ExitOutcome::Exited(code) => Some(*code),
            _ => None,
        }
    }

    /// Terminating signal, if the child was killed by a known signal
    pub fn signal(&self) -> Option<Signal> {
        match self {
            ExitOutcome::Signaled(sig) => Signal::try_from(*sig).ok(),
            _ => None,
        }
    }
}

impl From<ExitStatus> for ExitOutcome {
    fn from(status: ExitStatus) -> Self {
        if let Some(code) = status.code() {
            ExitOutcome::Exited(code)
        } else if let Some(sig) = status.signal() {
            ExitOutcome::Signaled(sig)
        } else {
            ExitOutcome::Unknown(status.into_raw())
        }
    }
}

impl fmt::Display for ExitOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExitOutcome::Exited(code) => write!(f, "exit status {}", code),
            ExitOutcome::Signaled(sig) => match Signal::try_from(*sig) {
                Ok(signal) => write!(f, "killed by {}", signal),
                Err(_) => write!(f, "killed by signal {}", sig),
            },
            ExitOutcome::Unknown(raw) => write!(f, "unrecognised wait status {:#x}", raw),
        }
    }
}

/// Spawn `program` cleanly and wait for it, returning the structured outcome
pub fn spawn_and_wait<I, S>(
    options: SpawnOptions,
    program: &OsStr,
    args: I,
) -> Result<ExitOutcome, SpawnFailure>
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
{
    let name = program.to_string_lossy().into_owned();
    if program.is_empty() {
        return Err(SpawnFailure::Spawn {
            program: name,
            source: io::Error::new(io::ErrorKind::InvalidInput, "executable cannot be empty"),
        });
    }

    let mut command = Command::new(program);
    command.args(args);

    let signal_failure = |source| SpawnFailure::Signal {
        program: name.clone(),
        source,
    };
    let sigchld = interrupts::hold_sigchld().map_err(signal_failure)?;
    let deferral = options
        .defer_interrupts
        .then(interrupts::defer)
        .transpose()
        .map_err(signal_failure)?;

    let setup = ChildSetup {
        options,
        highest_signal: highest_signal(),
        fd_limit: options.cloexec_inherited_fds.then(descriptor_limit),
    };

    debug!("Spawning {} {:?}", name, command.get_args().collect::<Vec<_>>());
    let spawned = if options.reset_signals {
        spawn_prepared(&mut command, setup, [None; 3])
    } else {
        // Freeze the parent's temporary dispositions until the child has exec'd
        interrupts::with_saved_actions(|saved| spawn_prepared(&mut command, setup, saved))
    };
    let mut child = spawned.map_err(|source| SpawnFailure::Spawn {
        program: name.clone(),
        source,
    })?;

    let pid = child.id();
    let status = child.wait().map_err(|source| SpawnFailure::Wait {
        program: name.clone(),
        pid,
        source,
    })?;
    drop(deferral);
    drop(sigchld);

    let outcome = ExitOutcome::from(status);
    debug!("Process {} ({}) finished: {}", pid, name, outcome);
    Ok(outcome)
}

/// Spawn `program` cleanly, wait for it, and report whether it exited with zero
///
/// Every failure mode, including a missing executable, collapses to `false`.
pub fn spawn_success<I, S>(options: SpawnOptions, program: &OsStr, args: I) -> bool
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
{
    match spawn_and_wait(options, program, args) {
        Ok(ExitOutcome::Exited(0)) => true,
        Ok(ExitOutcome::Exited(code)) => {
            debug!("{} exited with status {}", program.to_string_lossy(), code);
            false
        }
        Ok(outcome @ ExitOutcome::Signaled(_)) => {
            warn!("{} may be signaled: {}", program.to_string_lossy(), outcome);
            false
        }
        Ok(outcome @ ExitOutcome::Unknown(_)) => {
            warn!("{}: {}", program.to_string_lossy(), outcome);
            false
        }
        Err(e) => {
            warn!("{}", e);
            false
        }
    }
}

/// Everything the child needs, computed before fork
#[derive(Debug, Clone, Copy)]
struct ChildSetup {
    options: SpawnOptions,
    highest_signal: libc::c_int,
    fd_limit: Option<RawFd>,
}

fn spawn_prepared(
    command: &mut Command,
    setup: ChildSetup,
    saved: SavedActions,
) -> io::Result<Child> {
    // Safety: prepare_child only calls sigaction, pthread_sigmask, setsid,
    // fcntl and close_range, all async-signal-safe, and allocates nothing.
    unsafe {
        command.pre_exec(move || prepare_child(setup, saved));
    }
    command.spawn()
}

/// Runs in the child between fork and exec
fn prepare_child(setup: ChildSetup, saved: SavedActions) -> io::Result<()> {
    if setup.options.reset_signals {
        reset_signal_dispositions(setup.highest_signal)?;
        pthread_sigmask(SigmaskHow::SIG_SETMASK, Some(&SigSet::empty()), None)?;
    } else {
        // Undo the parent's temporary SIGCHLD/SIGINT/SIGQUIT changes rather than leaking them
        for (signal, action) in saved.iter().flatten() {
            unsafe { sigaction(*signal, action) }?;
        }
    }

    if setup.options.new_session {
        setsid()?;
    }

    if let Some(limit) = setup.fd_limit {
        mark_inherited_fds_cloexec(limit);
    }
    Ok(())
}

/// Reset signals `1..=highest` to `SIG_DFL`, real-time signals included
fn reset_signal_dispositions(highest: libc::c_int) -> io::Result<()> {
    let mut action: libc::sigaction = unsafe { std::mem::zeroed() };
    action.sa_sigaction = libc::SIG_DFL;
    unsafe { libc::sigemptyset(&mut action.sa_mask) };

    for sig in 1..=highest {
        if sig == libc::SIGKILL || sig == libc::SIGSTOP {
            continue;
        }
        if unsafe { libc::sigaction(sig, &action, std::ptr::null_mut()) } != 0 {
            let err = io::Error::last_os_error();
            // libc keeps a few real-time signals for itself and refuses them
            if err.raw_os_error() == Some(libc::EINVAL) {
                continue;
            }
            return Err(err);
        }
    }
    Ok(())
}

#[cfg(target_os = "linux")]
fn highest_signal() -> libc::c_int {
    libc::SIGRTMAX()
}

#[cfg(not(target_os = "linux"))]
fn highest_signal() -> libc::c_int {
    Signal::iterator()
        .map(|s| s as libc::c_int)
        .max()
        .unwrap_or(libc::SIGTERM)
}

fn mark_inherited_fds_cloexec(limit: RawFd) {
    #[cfg(target_os = "linux")]
    {
        let rc = unsafe {
            libc::syscall(
                libc::SYS_close_range,
                3 as libc::c_uint,
                libc::c_uint::MAX,
                CLOSE_RANGE_CLOEXEC,
            )
        };
        if rc == 0 {
            return;
        }
    }

    for fd in 3..limit {
        let flags = unsafe { libc::fcntl(fd, libc::F_GETFD) };
        if flags >= 0 && flags & libc::FD_CLOEXEC == 0 {
            unsafe { libc::fcntl(fd, libc::F_SETFD, flags | libc::FD_CLOEXEC) };
        }
    }
}

/// Highest descriptor number worth sweeping, computed before fork
fn descriptor_limit() -> RawFd {
    let soft = match getrlimit(Resource::RLIMIT_NOFILE) {
        Ok((soft, _hard)) => soft as u64,
        Err(e) => {
            debug!("getrlimit(RLIMIT_NOFILE) failed, assuming 1024: {}", e);
            1024
        }
    };
    soft.min(FD_SWEEP_CAP) as RawFd
}
