//! Shared cursor-addressed screen writer.
//!
//! Invariant: single output gate — every terminal write flows through
//! [`Screen`], and every regional redraw brackets itself in save/restore
//! cursor so concurrent writers never disturb each other's rows.
//!
//! Row geometry, top to bottom: box top border, `height` content rows, the
//! controls/status row, the box bottom border, then one row per progress bar
//! in allocation order. The hardware cursor parks on the last allocated bar
//! row (or the blank anchor row right below the box before any bar exists),
//! and all addressing is relative to that park position.

use std::io;
use std::sync::{Arc, Mutex, MutexGuard};

use crate::core::terminal::Terminal;

const SAVE_CURSOR: &str = "\x1b[s";
const RESTORE_CURSOR: &str = "\x1b[u";
const CLEAR_LINE: &str = "\x1b[2K";

struct ScreenState {
    terminal: Box<dyn Terminal>,
    columns: usize,
    height: usize,
    bar_rows: usize,
}

impl ScreenState {
    /// Rows between the park position and the first bar row.
    fn park_base(&self) -> usize {
        self.bar_rows.max(1) - 1
    }
}

pub struct Screen {
    state: Mutex<ScreenState>,
}

impl Screen {
    pub fn new(terminal: Box<dyn Terminal>) -> Self {
        let columns = terminal.columns() as usize;
        Self {
            state: Mutex::new(ScreenState {
                terminal,
                columns,
                height: 0,
                bar_rows: 0,
            }),
        }
    }

    fn lock_state(&self) -> MutexGuard<'_, ScreenState> {
        match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// Runs `f` with exclusive terminal access (mode changes, input wiring).
    pub fn with_terminal<R>(&self, f: impl FnOnce(&mut dyn Terminal) -> R) -> R {
        let mut state = self.lock_state();
        f(state.terminal.as_mut())
    }

    /// Column count snapshotted when the frame was drawn.
    pub fn columns(&self) -> usize {
        self.lock_state().columns
    }

    /// Prints the full frame and parks the cursor on the anchor row below it.
    pub fn draw_frame(&self, rows: &[String], content_height: usize) {
        let mut state = self.lock_state();
        state.columns = state.terminal.columns() as usize;
        state.height = content_height;
        state.bar_rows = 0;

        let mut out = String::new();
        for row in rows {
            out.push_str(row);
            out.push_str("\r\n");
        }
        state.terminal.write(&out);
    }

    /// Rewrites the box interior: `content` rows (exactly `height` of them)
    /// and/or the controls/status row. `None` leaves a region untouched.
    pub fn redraw_box(&self, content: Option<&[String]>, status: Option<&str>) {
        let mut state = self.lock_state();
        let base = state.park_base();
        let height = state.height;
        let mut out = String::from(SAVE_CURSOR);

        if let Some(rows) = content {
            // Up to the first content row, then down one line per row.
            out.push_str(&format!("\x1b[{}A\r", base + height + 2));
            for (i, row) in rows.iter().take(height).enumerate() {
                if i > 0 {
                    out.push_str("\x1b[1B\r");
                }
                out.push_str(row);
            }
            if let Some(status_row) = status {
                out.push_str("\x1b[1B\r");
                out.push_str(status_row);
            }
        } else if let Some(status_row) = status {
            out.push_str(&format!("\x1b[{}A\r", base + 2));
            out.push_str(status_row);
        }

        out.push_str(RESTORE_CURSOR);
        state.terminal.write(&out);
    }

    /// Allocates the next progress bar row below the box and returns its index.
    pub fn push_bar_row(&self) -> usize {
        let mut state = self.lock_state();
        if state.bar_rows > 0 {
            // Open a fresh line under the park position; the first bar reuses
            // the anchor row the frame left behind.
            state.terminal.write("\r\n");
        }
        state.bar_rows += 1;
        state.bar_rows - 1
    }

    /// Rewrites one progress bar row in place.
    pub fn rewrite_bar_row(&self, row: usize, text: &str) {
        let mut state = self.lock_state();
        let base = state.park_base();
        if row > base {
            return;
        }
        let up = base - row;
        let mut out = String::from(SAVE_CURSOR);
        if up > 0 {
            out.push_str(&format!("\x1b[{up}A"));
        }
        out.push('\r');
        out.push_str(CLEAR_LINE);
        out.push_str(text);
        out.push_str(RESTORE_CURSOR);
        state.terminal.write(&out);
    }

    /// Writes a plain line below everything, moving the park position down.
    pub fn println_below(&self, text: &str) {
        let mut state = self.lock_state();
        state.terminal.write(&format!("\r\n{text}\r\n"));
        // The park row moved; bar rows above are finished by now.
    }
}

/// RAII wrapper around the saved terminal mode.
///
/// `release` runs at most once across explicit calls and drop, so the mode is
/// restored exactly once whether the session completes, the user quits, a
/// signal drains it, or an unwind tears it down.
pub struct RawModeGuard {
    screen: Arc<Screen>,
    released: bool,
}

impl RawModeGuard {
    /// Switches the terminal to raw mode and arms the guard.
    pub fn acquire(screen: Arc<Screen>) -> io::Result<Self> {
        screen.with_terminal(|terminal| terminal.acquire_raw_mode())?;
        Ok(Self {
            screen,
            released: false,
        })
    }

    /// Restores the saved mode. Failures degrade to a warning: by this point
    /// the session is exiting and there is nothing better to do.
    pub fn release(&mut self) {
        if self.released {
            return;
        }
        self.released = true;
        if let Err(err) = self.screen.with_terminal(|terminal| terminal.restore_mode()) {
            log::warn!("failed to restore terminal mode: {err}");
        }
    }
}

impl Drop for RawModeGuard {
    fn drop(&mut self) {
        self.release();
    }
}
