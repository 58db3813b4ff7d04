//! End-to-end session tests over a scripted installer process.
//!
//! The terminal is a double with scripted input bytes, captured output, and a
//! restore counter; the installer is `sh -c` so the combined-stream plumbing
//! and exit-code paths are exercised for real.

use std::io;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use pacmon::runtime::session;
use pacmon::{
    InstallRequest, LogLevel, SessionOptions, SessionState, Terminal, INTERRUPTED_EXIT_CODE,
};

type InputScript = Vec<(Duration, Vec<u8>)>;

struct ScriptedTerminal {
    restores: Arc<AtomicUsize>,
    writes: Arc<Mutex<String>>,
    input: Option<InputScript>,
    stop: Arc<AtomicBool>,
    input_thread: Option<JoinHandle<()>>,
}

impl ScriptedTerminal {
    fn new(input: InputScript) -> (Self, Arc<AtomicUsize>, Arc<Mutex<String>>) {
        let restores = Arc::new(AtomicUsize::new(0));
        let writes = Arc::new(Mutex::new(String::new()));
        let terminal = Self {
            restores: Arc::clone(&restores),
            writes: Arc::clone(&writes),
            input: Some(input),
            stop: Arc::new(AtomicBool::new(false)),
            input_thread: None,
        };
        (terminal, restores, writes)
    }
}

impl Terminal for ScriptedTerminal {
    fn acquire_raw_mode(&mut self) -> io::Result<()> {
        Ok(())
    }

    fn restore_mode(&mut self) -> io::Result<()> {
        self.restores.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn start_input(&mut self, mut on_byte: Box<dyn FnMut(u8) + Send>) {
        let script = self.input.take().unwrap_or_default();
        let stop = Arc::clone(&self.stop);
        self.input_thread = Some(thread::spawn(move || {
            for (delay, bytes) in script {
                thread::sleep(delay);
                if stop.load(Ordering::SeqCst) {
                    return;
                }
                for byte in bytes {
                    on_byte(byte);
                }
            }
            while !stop.load(Ordering::SeqCst) {
                thread::sleep(Duration::from_millis(10));
            }
        }));
    }

    fn stop_input(&mut self) {
        self.stop.store(true, Ordering::SeqCst);
        if let Some(handle) = self.input_thread.take() {
            let _ = handle.join();
        }
    }

    fn write(&mut self, data: &str) {
        self.writes
            .lock()
            .expect("writes lock poisoned")
            .push_str(data);
    }

    fn columns(&self) -> u16 {
        80
    }

    fn rows(&self) -> u16 {
        24
    }
}

impl Drop for ScriptedTerminal {
    fn drop(&mut self) {
        self.stop_input();
    }
}

fn scripted_request(script: &str, units: &[&str]) -> InstallRequest {
    InstallRequest {
        program: "sh".to_string(),
        args: vec!["-c".to_string(), script.to_string()],
        units: units.iter().map(|unit| unit.to_string()).collect(),
    }
}

fn options_with(interrupt: Arc<AtomicBool>) -> SessionOptions {
    SessionOptions {
        view_height: 5,
        interrupt,
        ..SessionOptions::default()
    }
}

fn run_scripted(
    script: &str,
    units: &[&str],
    input: InputScript,
    interrupt: Arc<AtomicBool>,
) -> (pacmon::SessionOutcome, usize, String) {
    let (terminal, restores, writes) = ScriptedTerminal::new(input);
    let outcome = session::run(
        Box::new(terminal),
        scripted_request(script, units),
        options_with(interrupt),
    )
    .expect("session run failed");
    let restore_count = restores.load(Ordering::SeqCst);
    let output = writes.lock().expect("writes lock poisoned").clone();
    (outcome, restore_count, output)
}

#[test]
fn clean_install_terminates_with_success_and_code_zero() {
    let script = "echo 'installing foo...'; echo '[####      ] 40%'; \
                  echo 'installing bar...'; echo '[##########] 100%'; exit 0";
    let (outcome, restores, output) =
        run_scripted(script, &["foo", "bar"], Vec::new(), Arc::default());

    assert_eq!(outcome.exit_code, 0);
    assert_eq!(outcome.state, SessionState::Terminated);
    let last = outcome.entries.last().expect("no entries");
    assert_eq!(last.level, LogLevel::Success);
    assert!(last.message.contains("completed successfully"), "{}", last.message);

    // Raw lines were appended in order.
    let messages: Vec<&str> = outcome
        .entries
        .iter()
        .map(|entry| entry.message.as_str())
        .collect();
    let foo_at = messages
        .iter()
        .position(|m| *m == "installing foo...")
        .expect("foo line missing");
    let bar_at = messages
        .iter()
        .position(|m| *m == "installing bar...")
        .expect("bar line missing");
    assert!(foo_at < bar_at);

    // Both bars were drawn and settled before teardown.
    assert!(output.contains("foo"), "no bar for foo");
    assert!(output.contains("bar"), "no bar for bar");
    assert!(output.contains("100%"), "bars never settled");

    assert_eq!(restores, 1, "terminal mode must be restored exactly once");
}

#[test]
fn failing_install_reports_error_and_exit_code() {
    let script = "echo 'installing foo...'; exit 2";
    let (outcome, restores, _output) =
        run_scripted(script, &["foo"], Vec::new(), Arc::default());

    assert_eq!(outcome.exit_code, 2);
    assert_eq!(outcome.state, SessionState::Terminated);
    let last = outcome.entries.last().expect("no entries");
    assert_eq!(last.level, LogLevel::Error);
    assert!(last.message.contains("exit code: 2"), "{}", last.message);
    assert_eq!(restores, 1);
}

#[test]
fn quit_key_drains_and_mirrors_the_child_exit() {
    let script = "echo 'installing foo...'; sleep 1; exit 0";
    let input = vec![(Duration::from_millis(150), b"q".to_vec())];
    let (outcome, restores, _output) = run_scripted(script, &["foo"], input, Arc::default());

    assert_eq!(outcome.exit_code, 0);
    assert_eq!(outcome.state, SessionState::Terminated);
    assert_eq!(restores, 1);
}

#[test]
fn interrupt_forces_draining_and_fixed_exit_code() {
    let script = "echo 'installing foo...'; sleep 30";
    let interrupt = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&interrupt);
    let raiser = thread::spawn(move || {
        thread::sleep(Duration::from_millis(200));
        flag.store(true, Ordering::SeqCst);
    });

    let (outcome, restores, _output) = run_scripted(script, &["foo"], Vec::new(), interrupt);
    raiser.join().expect("raiser panicked");

    assert_eq!(outcome.exit_code, INTERRUPTED_EXIT_CODE);
    assert_eq!(outcome.state, SessionState::Terminated);
    let last = outcome.entries.last().expect("no entries");
    assert_eq!(last.level, LogLevel::Error);
    assert!(last.message.contains("interrupted"), "{}", last.message);
    assert_eq!(restores, 1);
}

#[test]
fn arrow_keys_leave_follow_mode_and_toggle_back() {
    // Enough lines to make the box scrollable, then a pause so the keys land
    // while the session is still running.
    let script = "for i in $(seq 1 20); do echo line $i; done; sleep 1";
    let input = vec![
        (Duration::from_millis(300), b"\x1b[A".to_vec()),
        (Duration::from_millis(50), b"f".to_vec()),
    ];
    let (outcome, restores, output) = run_scripted(script, &[], input, Arc::default());

    assert_eq!(outcome.exit_code, 0);
    assert!(
        output.contains("Follow (OFF)"),
        "scroll up never left follow mode"
    );
    // The toggle re-snapped to the tail afterwards.
    let off_at = output.rfind("Follow (OFF)").expect("no OFF status");
    let on_at = output.rfind("Follow (ON )").expect("no ON status");
    assert!(on_at > off_at, "follow was not re-enabled after the toggle");
    assert_eq!(restores, 1);
}

#[test]
fn lone_escape_does_not_disturb_the_session() {
    let script = "echo 'installing foo...'; sleep 1; exit 0";
    // ESC with no follow-up, then a real quit much later than the timeout.
    let input = vec![
        (Duration::from_millis(100), vec![0x1b]),
        (Duration::from_millis(200), b"q".to_vec()),
    ];
    let (outcome, restores, _output) = run_scripted(script, &["foo"], input, Arc::default());

    assert_eq!(outcome.exit_code, 0);
    assert_eq!(restores, 1);
}
