//! Interrupt watcher.
//!
//! SIGINT/SIGTERM must force the session into its draining path no matter
//! what it is doing, so the watcher only flips a shared flag; the session
//! polls it between events and owns the actual teardown.

use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use signal_hook::iterator::Signals;

pub struct InterruptWatcher {
    handle: signal_hook::iterator::Handle,
    thread: Option<JoinHandle<()>>,
}

impl Drop for InterruptWatcher {
    fn drop(&mut self) {
        self.handle.close();
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}

/// Installs a watcher that sets `flag` when SIGINT or SIGTERM arrives.
pub fn install_interrupt_flag(flag: Arc<AtomicBool>) -> io::Result<InterruptWatcher> {
    let mut signals = Signals::new([libc::SIGINT, libc::SIGTERM])?;
    let handle = signals.handle();
    let thread = thread::spawn(move || {
        for _ in signals.forever() {
            flag.store(true, Ordering::SeqCst);
        }
    });
    Ok(InterruptWatcher {
        handle,
        thread: Some(thread),
    })
}
