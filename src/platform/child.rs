//! The supervised external process.

use std::fs::File;
use std::io;
use std::os::unix::io::FromRawFd;
use std::os::unix::process::ExitStatusExt;
use std::process::{Child, Command, ExitStatus, Stdio};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use wait_timeout::ChildExt;

/// Spawns `program args..` with stdout and stderr funneled into one pipe.
///
/// A single pipe (stderr dup'ed onto it) preserves the exact interleaving the
/// process emits; reading two pipes would reorder lines. Returns the child and
/// the read end of the combined stream.
pub fn spawn_combined(program: &str, args: &[String]) -> io::Result<(Child, File)> {
    let mut fds = [0 as libc::c_int; 2];
    if unsafe { libc::pipe(fds.as_mut_ptr()) } != 0 {
        return Err(io::Error::last_os_error());
    }
    // The read end stays in this process only.
    unsafe {
        libc::fcntl(fds[0], libc::F_SETFD, libc::FD_CLOEXEC);
    }
    let read_end = unsafe { File::from_raw_fd(fds[0]) };

    let stderr_fd = unsafe { libc::dup(fds[1]) };
    if stderr_fd < 0 {
        let err = io::Error::last_os_error();
        unsafe {
            libc::close(fds[1]);
        }
        return Err(err);
    }
    let stdout = unsafe { Stdio::from_raw_fd(fds[1]) };
    let stderr = unsafe { Stdio::from_raw_fd(stderr_fd) };

    let child = Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stdout(stdout)
        .stderr(stderr)
        .spawn()?;

    Ok((child, read_end))
}

/// Waits for the child, killing it if the interrupt flag goes up mid-wait.
///
/// Polls in short windows so an interrupt arriving while we sit in the drain
/// phase still escalates promptly instead of hanging on a stuck installer.
pub fn await_exit(child: &mut Child, interrupt: &AtomicBool) -> io::Result<ExitStatus> {
    let mut killed = false;
    loop {
        if let Some(status) = child.wait_timeout(Duration::from_millis(200))? {
            return Ok(status);
        }
        if interrupt.load(Ordering::SeqCst) && !killed {
            let _ = child.kill();
            killed = true;
        }
    }
}

/// Maps an exit status to a process exit code; a signal death becomes the
/// conventional `128 + signal`.
pub fn exit_code(status: ExitStatus) -> i32 {
    status
        .code()
        .or_else(|| status.signal().map(|signal| 128 + signal))
        .unwrap_or(1)
}
