//! Optional signal-handling extension
//!
//! Initialised by [`crate::Spawner`] when `signal_extension` is enabled. It
//! lets a caller install counting handlers or `SIG_IGN` in the parent and send
//! signals to the parent or its whole process group while a clean child runs,
//! which is how signal isolation is demonstrated: none of it reaches or alters
//! the child.

// sigaction(2) is unsafe in nix because installing handlers is
#![allow(unsafe_code)]

use crate::Result;
use nix::sys::signal::{kill, killpg, sigaction, SaFlags, SigAction, SigHandler, SigSet, Signal};
use nix::unistd::{getpgrp, Pid};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};
use tracing::{debug, warn};

const MAX_SIGNAL: usize = 64;

static COUNTS: [AtomicUsize; MAX_SIGNAL] = [const { AtomicUsize::new(0) }; MAX_SIGNAL];

extern "C" fn count_signal(sig: libc::c_int) {
    if let Some(counter) = usize::try_from(sig).ok().and_then(|i| COUNTS.get(i)) {
        counter.fetch_add(1, Ordering::SeqCst);
    }
}

/// Parent-side signal traps, restored when dropped
#[derive(Debug, Default)]
pub struct SignalExtension {
    previous: Mutex<HashMap<Signal, SigAction>>,
}

impl SignalExtension {
    /// Create an extension with no traps installed
    pub fn init() -> Self {
        debug!("Signal extension initialised");
        Self::default()
    }

    /// Install a handler that counts deliveries of `signal`
    pub fn trap(&self, signal: Signal) -> Result<()> {
        self.install(signal, SigHandler::Handler(count_signal))
    }

    /// Ignore `signal` in the parent
    pub fn ignore(&self, signal: Signal) -> Result<()> {
        self.install(signal, SigHandler::SigIgn)
    }

    fn install(&self, signal: Signal, handler: SigHandler) -> Result<()> {
        let action = SigAction::new(handler, SaFlags::SA_RESTART, SigSet::empty());
        let mut previous = self.previous.lock().unwrap_or_else(PoisonError::into_inner);
        let old = unsafe { sigaction(signal, &action) }?;
        // Keep the disposition from before the first trap, not an earlier trap of ours
        previous.entry(signal).or_insert(old);
        debug!("Installed {:?} for {}", handler, signal);
        Ok(())
    }

    /// Deliveries of `signal` counted by the trap handler so far
    pub fn count(&self, signal: Signal) -> usize {
        COUNTS
            .get(signal as usize)
            .map_or(0, |c| c.load(Ordering::SeqCst))
    }

    /// Restore the disposition `signal` had before it was trapped or ignored
    ///
    /// Returns `false` when `signal` was not trapped by this extension.
    pub fn untrap(&self, signal: Signal) -> Result<bool> {
        let mut previous = self.previous.lock().unwrap_or_else(PoisonError::into_inner);
        match previous.remove(&signal) {
            Some(action) => {
                unsafe { sigaction(signal, &action) }?;
                debug!("Restored disposition of {}", signal);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Signals currently trapped or ignored by this extension
    pub fn trapped(&self) -> Vec<Signal> {
        let previous = self.previous.lock().unwrap_or_else(PoisonError::into_inner);
        let mut signals: Vec<Signal> = previous.keys().copied().collect();
        signals.sort_by_key(|s| *s as i32);
        signals
    }

    /// Send `signal` to the current process
    pub fn signal_self(&self, signal: Signal) -> Result<()> {
        kill(Pid::this(), signal)?;
        Ok(())
    }

    /// Send `signal` to every process in the current process group
    ///
    /// Children spawned into their own session are outside the group and do
    /// not receive it; the calling process does, so trap or ignore `signal`
    /// first.
    pub fn raise_group(&self, signal: Signal) -> Result<()> {
        let group = getpgrp();
        debug!("Sending {} to process group {}", signal, group);
        killpg(group, signal)?;
        Ok(())
    }
}

impl Drop for SignalExtension {
    fn drop(&mut self) {
        let previous = self.previous.get_mut().unwrap_or_else(PoisonError::into_inner);
        for (signal, action) in previous.drain() {
            if let Err(e) = unsafe { sigaction(signal, &action) } {
                warn!("Failed to restore disposition of {}: {}", signal, e);
            }
        }
    }
}
