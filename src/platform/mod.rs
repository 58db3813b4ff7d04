//! OS-facing layers: the tty, signals, and the supervised child process.

pub mod child;
pub mod signals;
pub mod tty;
