//! Per-unit progress animation workers.
//!
//! One thread per in-flight unit owns that unit's percent; the decoder feeds
//! updates over a channel rather than mutating shared state. Cancellation is
//! cooperative and bounded: a worker checks its flag every tick and always
//! paints the settled frame before exiting, so no bar is ever left frozen
//! mid-fill.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crate::render::progress;
use crate::render::screen::Screen;

/// Animation cadence; also bounds how long a cancel can take to settle.
pub const TICK: Duration = Duration::from_millis(100);

struct ProgressTask {
    percent_tx: Sender<u8>,
    cancel: Arc<AtomicBool>,
    thread: Option<JoinHandle<()>>,
}

impl ProgressTask {
    fn start(screen: Arc<Screen>, unit: String, row: usize, initial: u8) -> Self {
        let (percent_tx, percent_rx) = mpsc::channel();
        let cancel = Arc::new(AtomicBool::new(false));
        let cancel_for_worker = Arc::clone(&cancel);
        let thread = thread::spawn(move || {
            run_worker(screen, unit, row, initial, percent_rx, cancel_for_worker);
        });
        Self {
            percent_tx,
            cancel,
            thread: Some(thread),
        }
    }

    fn set_percent(&self, percent: u8) {
        // A send to a naturally finished worker just goes nowhere.
        let _ = self.percent_tx.send(percent);
    }

    fn cancel(&mut self) {
        self.cancel.store(true, Ordering::SeqCst);
        if let Some(handle) = self.thread.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for ProgressTask {
    fn drop(&mut self) {
        self.cancel();
    }
}

fn run_worker(
    screen: Arc<Screen>,
    unit: String,
    row: usize,
    initial: u8,
    percent_rx: Receiver<u8>,
    cancel: Arc<AtomicBool>,
) {
    let columns = screen.columns();
    let mut percent = initial.min(100);
    loop {
        if cancel.load(Ordering::SeqCst) {
            screen.rewrite_bar_row(row, &progress::final_frame(&unit, columns, false));
            return;
        }
        if percent >= 100 {
            screen.rewrite_bar_row(row, &progress::final_frame(&unit, columns, true));
            return;
        }

        screen.rewrite_bar_row(row, &progress::running_frame(&unit, percent, columns));

        match percent_rx.recv_timeout(TICK) {
            Ok(update) => {
                // Percent only moves forward within one cycle.
                percent = percent.max(update.min(100));
                while let Ok(update) = percent_rx.try_recv() {
                    percent = percent.max(update.min(100));
                }
            }
            Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => {
                // Keep chewing toward the end even when updates stop coming.
                percent = (percent + 1).min(100);
            }
        }
    }
}

/// Registry of live animation workers, keyed by unit name.
pub struct ProgressAnimator {
    screen: Arc<Screen>,
    tasks: HashMap<String, ProgressTask>,
}

impl ProgressAnimator {
    pub fn new(screen: Arc<Screen>) -> Self {
        Self {
            screen,
            tasks: HashMap::new(),
        }
    }

    /// Begins a fresh cycle for `unit`, superseding any stale worker for the
    /// same name (which settles its old bar first).
    pub fn start_unit(&mut self, unit: &str, initial: u8) {
        if let Some(mut stale) = self.tasks.remove(unit) {
            stale.cancel();
        }
        let row = self.screen.push_bar_row();
        let task = ProgressTask::start(Arc::clone(&self.screen), unit.to_string(), row, initial);
        self.tasks.insert(unit.to_string(), task);
    }

    /// Routes a decoded percent to the unit's worker, starting one if the
    /// first marker arrived before its announcement was tracked.
    pub fn update(&mut self, unit: &str, percent: u8) {
        match self.tasks.get(unit) {
            Some(task) => task.set_percent(percent),
            None => self.start_unit(unit, percent),
        }
    }

    pub fn active_units(&self) -> usize {
        self.tasks.len()
    }

    /// Cancels every outstanding worker; each settles its bar before exiting.
    pub fn cancel_all(&mut self) {
        for (_, mut task) in self.tasks.drain() {
            task.cancel();
        }
    }
}

impl Drop for ProgressAnimator {
    fn drop(&mut self) {
        self.cancel_all();
    }
}

#[cfg(test)]
mod tests {
    use std::io;
    use std::sync::{Arc, Mutex};
    use std::thread;
    use std::time::Duration;

    use super::ProgressAnimator;
    use crate::core::terminal::Terminal;
    use crate::render::screen::Screen;

    struct CapturingTerminal {
        writes: Arc<Mutex<Vec<String>>>,
    }

    impl Terminal for CapturingTerminal {
        fn acquire_raw_mode(&mut self) -> io::Result<()> {
            Ok(())
        }
        fn restore_mode(&mut self) -> io::Result<()> {
            Ok(())
        }
        fn start_input(&mut self, _on_byte: Box<dyn FnMut(u8) + Send>) {}
        fn stop_input(&mut self) {}
        fn write(&mut self, data: &str) {
            self.writes
                .lock()
                .expect("capture lock poisoned")
                .push(data.to_string());
        }
        fn columns(&self) -> u16 {
            60
        }
        fn rows(&self) -> u16 {
            24
        }
    }

    fn capturing_animator() -> (ProgressAnimator, Arc<Mutex<Vec<String>>>) {
        let writes = Arc::new(Mutex::new(Vec::new()));
        let terminal = CapturingTerminal {
            writes: Arc::clone(&writes),
        };
        let screen = Arc::new(Screen::new(Box::new(terminal)));
        screen.draw_frame(&[], 3);
        (ProgressAnimator::new(screen), writes)
    }

    fn joined(writes: &Arc<Mutex<Vec<String>>>) -> String {
        writes.lock().expect("capture lock poisoned").concat()
    }

    #[test]
    fn cancelled_worker_settles_the_bar() {
        let (mut animator, writes) = capturing_animator();
        animator.start_unit("vim", 57);
        thread::sleep(Duration::from_millis(30));
        animator.cancel_all();

        let output = joined(&writes);
        assert!(output.contains(" 57%"), "never rendered 57%: {output:?}");
        assert!(output.contains("100%"), "never settled: {output:?}");
        // The settled frame is the last thing the worker painted.
        let last = writes
            .lock()
            .expect("capture lock poisoned")
            .last()
            .cloned()
            .expect("no writes");
        assert!(last.contains("100%"), "{last:?}");
    }

    #[test]
    fn natural_completion_ends_the_worker() {
        let (mut animator, writes) = capturing_animator();
        animator.start_unit("vim", 99);
        // One tick to 100, one frame to settle.
        thread::sleep(Duration::from_millis(400));
        let output = joined(&writes);
        assert!(output.contains("100%"), "{output:?}");
        // cancel_all has nothing left to interrupt; settled frame stays last.
        animator.cancel_all();
        let last = writes
            .lock()
            .expect("capture lock poisoned")
            .last()
            .cloned()
            .expect("no writes");
        assert!(last.contains("100%"), "{last:?}");
    }

    #[test]
    fn decoder_updates_advance_percent_monotonically() {
        let (mut animator, writes) = capturing_animator();
        animator.start_unit("pkg", 10);
        animator.update("pkg", 80);
        animator.update("pkg", 40);
        thread::sleep(Duration::from_millis(250));
        animator.cancel_all();

        let output = joined(&writes);
        assert!(output.contains(" 80%"), "never reached 80: {output}");
        let pos_10 = output.find(" 10%").expect("initial frame missing");
        let pos_80 = output.find(" 80%").expect("updated frame missing");
        assert!(pos_10 < pos_80, "percent went backwards");
    }

    #[test]
    fn restarted_unit_gets_a_fresh_row() {
        let (mut animator, _writes) = capturing_animator();
        animator.start_unit("pkg", 10);
        assert_eq!(animator.active_units(), 1);
        animator.start_unit("pkg", 0);
        assert_eq!(animator.active_units(), 1);
        animator.cancel_all();
        assert_eq!(animator.active_units(), 0);
    }

    #[test]
    fn update_for_unknown_unit_starts_a_worker() {
        let (mut animator, writes) = capturing_animator();
        animator.update("surprise", 35);
        thread::sleep(Duration::from_millis(30));
        animator.cancel_all();
        assert!(joined(&writes).contains("surprise"));
    }
}
