//! Raw keyboard byte decoding.
//!
//! A small finite-state machine that disambiguates lone ESC presses from
//! `ESC [ A` / `ESC [ B` arrow sequences under a timing window. The machine is
//! fed one byte at a time together with an arrival instant, so it can be
//! driven entirely by tests without a terminal.

use std::time::{Duration, Instant};

/// Time allowed between ESC and the remainder of an arrow sequence.
pub const ESCAPE_TIMEOUT: Duration = Duration::from_millis(50);

const ESC: u8 = 0x1b;
const CTRL_C: u8 = 0x03;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyEvent {
    Char(char),
    ArrowUp,
    ArrowDown,
    ToggleFollow,
    Quit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DecodeState {
    Start,
    /// ESC seen, waiting for `[`.
    AwaitBracket { deadline: Instant },
    /// `ESC [` seen, waiting for the arrow final byte.
    AwaitFinal { deadline: Instant },
}

pub struct KeyDecoder {
    state: DecodeState,
    timeout: Duration,
}

impl Default for KeyDecoder {
    fn default() -> Self {
        Self::new()
    }
}

impl KeyDecoder {
    pub fn new() -> Self {
        Self::with_timeout(ESCAPE_TIMEOUT)
    }

    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            state: DecodeState::Start,
            timeout,
        }
    }

    /// Discards an expired partial sequence. Lone ESC emits nothing.
    pub fn tick(&mut self, now: Instant) {
        match self.state {
            DecodeState::AwaitBracket { deadline } | DecodeState::AwaitFinal { deadline }
                if now >= deadline =>
            {
                self.state = DecodeState::Start;
            }
            _ => {}
        }
    }

    /// Feeds one raw byte, returning at most one decoded event.
    pub fn feed(&mut self, byte: u8, now: Instant) -> Option<KeyEvent> {
        self.tick(now);
        match self.state {
            DecodeState::Start => self.feed_start(byte, now),
            DecodeState::AwaitBracket { .. } => {
                if byte == b'[' {
                    self.state = DecodeState::AwaitFinal {
                        deadline: now + self.timeout,
                    };
                } else {
                    // Unexpected byte aborts the sequence and is consumed.
                    self.state = DecodeState::Start;
                }
                None
            }
            DecodeState::AwaitFinal { .. } => {
                self.state = DecodeState::Start;
                match byte {
                    b'A' => Some(KeyEvent::ArrowUp),
                    b'B' => Some(KeyEvent::ArrowDown),
                    _ => None,
                }
            }
        }
    }

    fn feed_start(&mut self, byte: u8, now: Instant) -> Option<KeyEvent> {
        match byte {
            ESC => {
                self.state = DecodeState::AwaitBracket {
                    deadline: now + self.timeout,
                };
                None
            }
            b'f' | b'F' => Some(KeyEvent::ToggleFollow),
            b'q' | b'Q' | CTRL_C => Some(KeyEvent::Quit),
            0x20..=0x7e => Some(KeyEvent::Char(byte as char)),
            _ => None,
        }
    }
}
