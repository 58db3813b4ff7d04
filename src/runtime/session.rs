//! Session controller.
//!
//! Owns the whole lifecycle: INIT (raw mode, frame, input decoder) →
//! RUNNING (spawn the installer, route output and key events) → DRAINING
//! (settle animators, stop input, reap the child) → TERMINATED (mode
//! restored, final verdict entry, exit code). The terminal mode is released
//! exactly once on every path out, including signals and unwinds.

use std::io::{BufRead, BufReader};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use crate::core::entry::{LogEntry, LogLevel};
use crate::core::key::{KeyDecoder, KeyEvent};
use crate::core::scrollback::{ScrollbackBuffer, DEFAULT_CAPACITY};
use crate::core::stream::{OutputEvent, StreamDecoder};
use crate::core::terminal::Terminal;
use crate::error::SessionError;
use crate::platform::child;
use crate::render::screen::{RawModeGuard, Screen};
use crate::render::viewport::{self, DEFAULT_HEIGHT};
use crate::runtime::animator::ProgressAnimator;

/// How often the router wakes to check the interrupt flag.
const EVENT_POLL: Duration = Duration::from_millis(50);

/// Exit code reported when a signal tears the session down.
pub const INTERRUPTED_EXIT_CODE: i32 = 130;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Init,
    Running,
    Draining,
    Terminated,
}

/// A resolved install invocation. Argument parsing happens upstream; the
/// session only ever sees the final program, argv, and unit names.
#[derive(Debug, Clone)]
pub struct InstallRequest {
    pub program: String,
    pub args: Vec<String>,
    pub units: Vec<String>,
}

impl InstallRequest {
    /// Builds the default `sudo pacman -S --noconfirm <packages>` invocation,
    /// or splices the packages onto a whitespace-split override command.
    pub fn for_packages(packages: &[String], command_override: Option<&str>) -> Self {
        match command_override {
            Some(command) => {
                let mut parts = command.split_whitespace().map(str::to_string);
                let program = parts.next().unwrap_or_else(|| "sh".to_string());
                let mut args: Vec<String> = parts.collect();
                args.extend(packages.iter().cloned());
                Self {
                    program,
                    args,
                    units: packages.to_vec(),
                }
            }
            None => {
                let mut args = vec![
                    "pacman".to_string(),
                    "-S".to_string(),
                    "--noconfirm".to_string(),
                ];
                args.extend(packages.iter().cloned());
                Self {
                    program: "sudo".to_string(),
                    args,
                    units: packages.to_vec(),
                }
            }
        }
    }

    fn command_line(&self) -> String {
        let mut line = self.program.clone();
        for arg in &self.args {
            line.push(' ');
            line.push_str(arg);
        }
        line
    }
}

pub struct SessionOptions {
    pub title: String,
    pub view_height: usize,
    pub log_capacity: usize,
    /// Raised by the signal watcher (or a test) to force draining.
    pub interrupt: Arc<AtomicBool>,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            title: "Arch Linux Package Manager".to_string(),
            view_height: DEFAULT_HEIGHT,
            log_capacity: DEFAULT_CAPACITY,
            interrupt: Arc::new(AtomicBool::new(false)),
        }
    }
}

pub struct SessionOutcome {
    pub exit_code: i32,
    pub state: SessionState,
    /// Snapshot of the scrollback at termination, newest last.
    pub entries: Vec<LogEntry>,
}

enum SessionEvent {
    Output(OutputEvent),
    Key(KeyEvent),
}

fn transition(from: SessionState, to: SessionState) -> SessionState {
    log::debug!("session state {from:?} -> {to:?}");
    to
}

fn append_entry(
    screen: &Screen,
    buffer: &mut ScrollbackBuffer,
    level: LogLevel,
    message: impl Into<String>,
) {
    let change = buffer.append(LogEntry::new(level, message));
    viewport::render(screen, buffer, change);
}

/// Runs one supervised install session to completion.
pub fn run(
    terminal: Box<dyn Terminal>,
    request: InstallRequest,
    options: SessionOptions,
) -> Result<SessionOutcome, SessionError> {
    let screen = Arc::new(Screen::new(terminal));
    let mut state = SessionState::Init;

    // Raw mode must hold before anything is drawn or spawned; failure here
    // is fatal and leaves the terminal untouched.
    let mut guard =
        RawModeGuard::acquire(Arc::clone(&screen)).map_err(SessionError::Terminal)?;

    let mut buffer = ScrollbackBuffer::new(options.log_capacity, options.view_height);
    let columns = screen.with_terminal(|terminal| terminal.columns()) as usize;
    screen.draw_frame(
        &viewport::frame_rows(&options.title, columns, options.view_height),
        options.view_height,
    );

    let (event_tx, event_rx) = mpsc::channel();

    // Raw bytes → key FSM → session events, on the terminal's polling thread.
    let key_tx = event_tx.clone();
    let mut key_decoder = KeyDecoder::new();
    screen.with_terminal(|terminal| {
        terminal.start_input(Box::new(move |byte| {
            if let Some(event) = key_decoder.feed(byte, Instant::now()) {
                let _ = key_tx.send(SessionEvent::Key(event));
            }
        }));
    });

    append_entry(
        &screen,
        &mut buffer,
        LogLevel::System,
        format!(
            "Starting installation of {} package(s)",
            request.units.len()
        ),
    );
    if !request.units.is_empty() {
        append_entry(
            &screen,
            &mut buffer,
            LogLevel::System,
            format!("Packages: {}", request.units.join(", ")),
        );
    }
    append_entry(
        &screen,
        &mut buffer,
        LogLevel::System,
        "Press 'q' to exit, arrow keys to scroll, 'f' to toggle log following",
    );

    state = transition(state, SessionState::Running);
    log::debug!("spawning `{}`", request.command_line());
    let (mut process, reader) = match child::spawn_combined(&request.program, &request.args) {
        Ok(spawned) => spawned,
        Err(source) => {
            screen.with_terminal(|terminal| terminal.stop_input());
            guard.release();
            return Err(SessionError::Spawn {
                command: request.command_line(),
                source,
            });
        }
    };

    // Combined output → line decoder → session events. The blocking per-line
    // read is this thread's only suspension point.
    let stream_tx = event_tx.clone();
    let stream_thread = thread::spawn(move || {
        let mut decoder = StreamDecoder::new();
        for line in BufReader::new(reader).lines() {
            let line = match line {
                Ok(line) => line,
                Err(err) => {
                    log::warn!("output stream read failed: {err}");
                    break;
                }
            };
            for event in decoder.decode_line(&line) {
                if stream_tx.send(SessionEvent::Output(event)).is_err() {
                    return;
                }
            }
        }
        let _ = stream_tx.send(SessionEvent::Output(OutputEvent::StreamClosed));
    });

    let mut animator = ProgressAnimator::new(Arc::clone(&screen));
    let interrupt = options.interrupt;
    let mut interrupted = false;

    loop {
        if interrupt.load(Ordering::SeqCst) {
            interrupted = true;
            break;
        }
        match event_rx.recv_timeout(EVENT_POLL) {
            Ok(SessionEvent::Output(OutputEvent::Log(line))) => {
                append_entry(&screen, &mut buffer, LogLevel::Info, line);
            }
            Ok(SessionEvent::Output(OutputEvent::UnitStarted(unit))) => {
                log::debug!("unit started: {unit}");
                animator.start_unit(&unit, 0);
            }
            Ok(SessionEvent::Output(OutputEvent::ProgressUpdate { unit, percent })) => {
                animator.update(&unit, percent);
            }
            Ok(SessionEvent::Output(OutputEvent::StreamClosed)) => break,
            Ok(SessionEvent::Key(KeyEvent::ArrowUp)) => {
                let change = buffer.scroll_up();
                viewport::render(&screen, &buffer, change);
            }
            Ok(SessionEvent::Key(KeyEvent::ArrowDown)) => {
                let change = buffer.scroll_down();
                viewport::render(&screen, &buffer, change);
            }
            Ok(SessionEvent::Key(KeyEvent::ToggleFollow)) => {
                let change = buffer.toggle_follow();
                viewport::render(&screen, &buffer, change);
            }
            Ok(SessionEvent::Key(KeyEvent::Quit)) => break,
            Ok(SessionEvent::Key(KeyEvent::Char(_))) => {}
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => break,
        }
    }

    state = transition(state, SessionState::Draining);
    animator.cancel_all();
    screen.with_terminal(|terminal| terminal.stop_input());
    let status = child::await_exit(&mut process, &interrupt);
    let _ = stream_thread.join();
    // A signal that lands while we reap still counts as an interrupt.
    interrupted = interrupted || interrupt.load(Ordering::SeqCst);
    guard.release();

    state = transition(state, SessionState::Terminated);
    let exit_code = if interrupted {
        INTERRUPTED_EXIT_CODE
    } else {
        match status {
            Ok(status) => child::exit_code(status),
            Err(err) => {
                log::warn!("failed to reap installer: {err}");
                1
            }
        }
    };

    let (level, message) = if interrupted {
        (LogLevel::Error, "Installation interrupted".to_string())
    } else if exit_code == 0 {
        (
            LogLevel::Success,
            "Installation completed successfully!".to_string(),
        )
    } else {
        (
            LogLevel::Error,
            format!("Installation failed (exit code: {exit_code})"),
        )
    };
    append_entry(&screen, &mut buffer, level, message);
    screen.println_below("");

    Ok(SessionOutcome {
        exit_code,
        state,
        entries: buffer.entries().cloned().collect(),
    })
}

#[cfg(test)]
mod tests {
    use super::InstallRequest;

    fn packages(names: &[&str]) -> Vec<String> {
        names.iter().map(|name| name.to_string()).collect()
    }

    #[test]
    fn default_invocation_wraps_pacman() {
        let request = InstallRequest::for_packages(&packages(&["vim", "tmux"]), None);
        assert_eq!(request.program, "sudo");
        assert_eq!(
            request.args,
            packages(&["pacman", "-S", "--noconfirm", "vim", "tmux"])
        );
        assert_eq!(request.units, packages(&["vim", "tmux"]));
    }

    #[test]
    fn override_command_keeps_units_and_appends_packages() {
        let request =
            InstallRequest::for_packages(&packages(&["vim"]), Some("fakeinstall --fast"));
        assert_eq!(request.program, "fakeinstall");
        assert_eq!(request.args, packages(&["--fast", "vim"]));
        assert_eq!(request.units, packages(&["vim"]));
        assert_eq!(request.command_line(), "fakeinstall --fast vim");
    }
}
