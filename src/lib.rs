//! Terminal monitor for long-running package installs.
//!
//! Invariant: single output gate — only [`render::screen::Screen`] writes to
//! the terminal, and every writer owns disjoint rows.
//!
//! # Overview
//! - Feed the session a resolved [`InstallRequest`]; it spawns the installer,
//!   tails the combined output into a scrollable log box, and animates one
//!   progress bar per package.
//! - Keyboard navigation (arrows, follow toggle, quit) is decoded from raw
//!   bytes by an explicit state machine.
//! - The terminal's saved mode is restored exactly once on every exit path:
//!   completion, quit, signal, or unwind.

pub mod config;
pub mod error;
pub mod logging;

pub mod core;
pub mod platform;
pub mod render;
pub mod runtime;

/// Scrollback and log entry types.
pub use crate::core::entry::{LogEntry, LogLevel};
pub use crate::core::scrollback::{ScrollbackBuffer, ViewChange};

/// Decoders for the two inbound byte streams.
pub use crate::core::key::{KeyDecoder, KeyEvent};
pub use crate::core::stream::{OutputEvent, StreamDecoder};

/// Terminal interfaces and the process-backed implementation.
pub use crate::core::terminal::Terminal;
pub use crate::platform::tty::TtyTerminal;
pub use crate::render::screen::{RawModeGuard, Screen};

/// Signal wiring for the composition root.
pub use crate::platform::signals::{install_interrupt_flag, InterruptWatcher};

/// Session types; the entry point is [`runtime::session::run`].
pub use crate::config::EnvConfig;
pub use crate::error::SessionError;
pub use crate::runtime::session::{
    InstallRequest, SessionOptions, SessionOutcome, SessionState, INTERRUPTED_EXIT_CODE,
};
