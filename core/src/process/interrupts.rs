//! Parent-side signal dispositions while waiting for a child
//!
//! Two process-wide installations are managed here, both reference-counted
//! under one mutex so overlapping waiters on several threads share them:
//!
//! - SIGCHLD is held at `SIG_DFL` for every wait ([`hold_sigchld`]). A host
//!   that ignores SIGCHLD would otherwise have its children reaped by the
//!   kernel, and `wait` would fail with `ECHILD`.
//! - SIGINT and SIGQUIT are ignored while deferral is requested ([`defer`]),
//!   the way `system(3)` does. A ^C typed at the terminal then reaches the
//!   foreground job without killing the waiting parent first.
//!
//! The first guard of a kind saves the previous actions and installs the new
//! ones; the last guard of that kind to drop restores what was saved.

// sigaction(2) is unsafe in nix because installing handlers is
#![allow(unsafe_code)]

use nix::errno::Errno;
use nix::sys::signal::{sigaction, SaFlags, SigAction, SigHandler, SigSet, Signal};
use std::sync::{Mutex, MutexGuard, PoisonError};
use tracing::{debug, warn};

/// Signals ignored in the parent while deferral is active
pub const DEFERRED_SIGNALS: [Signal; 2] = [Signal::SIGINT, Signal::SIGQUIT];

/// Dispositions that were in place before the active installations, in the
/// order SIGCHLD, SIGINT, SIGQUIT; `None` where nothing is installed
pub type SavedActions = [Option<(Signal, SigAction)>; 3];

struct Installation<const N: usize> {
    waiters: usize,
    saved: Option<[(Signal, SigAction); N]>,
}

impl<const N: usize> Installation<N> {
    const fn new() -> Self {
        Self {
            waiters: 0,
            saved: None,
        }
    }

    fn acquire(&mut self, signals: [Signal; N], handler: SigHandler) -> Result<(), Errno> {
        if self.saved.is_some() {
            self.waiters += 1;
            return Ok(());
        }

        let action = SigAction::new(handler, SaFlags::empty(), SigSet::empty());
        let mut saved = signals.map(|signal| (signal, action));
        for (i, signal) in signals.into_iter().enumerate() {
            match unsafe { sigaction(signal, &action) } {
                Ok(old) => saved[i] = (signal, old),
                Err(e) => {
                    restore(&saved[..i]);
                    return Err(e);
                }
            }
        }

        self.saved = Some(saved);
        self.waiters = 1;
        Ok(())
    }

    fn slots(&self) -> [Option<(Signal, SigAction)>; N] {
        self.saved.map_or([None; N], |saved| saved.map(Some))
    }

    /// Returns true when this was the last waiter and the dispositions were restored
    fn release(&mut self) -> bool {
        self.waiters = self.waiters.saturating_sub(1);
        if self.waiters > 0 {
            return false;
        }
        match self.saved.take() {
            Some(saved) => {
                restore(&saved);
                true
            }
            None => false,
        }
    }
}

struct WaitState {
    sigchld: Installation<1>,
    deferral: Installation<2>,
}

static STATE: Mutex<WaitState> = Mutex::new(WaitState {
    sigchld: Installation::new(),
    deferral: Installation::new(),
});

fn state() -> MutexGuard<'static, WaitState> {
    STATE.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Keeps SIGCHLD at its default disposition until dropped
#[derive(Debug)]
pub struct ChildWaitGuard {
    _private: (),
}

/// Hold SIGCHLD at `SIG_DFL` for the lifetime of the returned guard
pub fn hold_sigchld() -> Result<ChildWaitGuard, Errno> {
    let mut state = state();
    let first = state.sigchld.saved.is_none();
    state.sigchld.acquire([Signal::SIGCHLD], SigHandler::SigDfl)?;
    if first {
        debug!("SIGCHLD held at default while waiting for children");
    }
    Ok(ChildWaitGuard { _private: () })
}

impl Drop for ChildWaitGuard {
    fn drop(&mut self) {
        if state().sigchld.release() {
            debug!("Restored SIGCHLD disposition");
        }
    }
}

/// Keeps SIGINT/SIGQUIT ignored in the parent until dropped
#[derive(Debug)]
pub struct InterruptGuard {
    _private: (),
}

/// Start deferring interrupts for the lifetime of the returned guard
pub fn defer() -> Result<InterruptGuard, Errno> {
    let mut state = state();
    let first = state.deferral.saved.is_none();
    state.deferral.acquire(DEFERRED_SIGNALS, SigHandler::SigIgn)?;
    if first {
        debug!("Deferring SIGINT/SIGQUIT while waiting for children");
    }
    Ok(InterruptGuard { _private: () })
}

impl Drop for InterruptGuard {
    fn drop(&mut self) {
        if state().deferral.release() {
            debug!("Restored SIGINT/SIGQUIT dispositions");
        }
    }
}

/// Run `f` with the dispositions saved by the active installations
///
/// No installation starts or ends while `f` runs, so a child forked inside
/// `f` can put back exactly the dispositions the parent had before any
/// temporary change.
pub fn with_saved_actions<R>(f: impl FnOnce(SavedActions) -> R) -> R {
    let state = state();
    let [chld] = state.sigchld.slots();
    let [int, quit] = state.deferral.slots();
    f([chld, int, quit])
}

fn restore(actions: &[(Signal, SigAction)]) {
    for (signal, action) in actions.iter().rev() {
        if let Err(e) = unsafe { sigaction(*signal, action) } {
            warn!("Failed to restore disposition of {}: {}", signal, e);
        }
    }
}

/// Number of interrupt deferral guards currently alive
pub fn active_waiters() -> usize {
    state().deferral.waiters
}

/// Number of waits currently holding SIGCHLD at its default
pub fn active_child_waits() -> usize {
    state().sigchld.waiters
}
