//! Clean process spawning for the cleanspawn core library
//!
//! ## Platform Support
//!
//! - **Unix**: full support; the child gets default signal dispositions, its
//!   own session, and no descriptors leaked without `O_CLOEXEC`
//!
//! The parent holds SIGCHLD at its default disposition while it waits;
//! interrupt deferral ([`interrupts`]) is opt-in. Both only affect the parent
//! for the duration of the wait.

pub mod interrupts;
pub mod unix;

pub use interrupts::{ChildWaitGuard, InterruptGuard};
pub use unix::*;
