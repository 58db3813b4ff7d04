//! Process-terminal implementation over raw file descriptors.

use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use libc::c_int;

use crate::core::terminal::Terminal;

/// Poll window for the input thread; short so `stop_input` never stalls.
const INPUT_POLL_MS: i32 = 100;

fn get_termios(fd: c_int) -> io::Result<libc::termios> {
    let mut termios = unsafe { std::mem::zeroed::<libc::termios>() };
    let result = unsafe { libc::tcgetattr(fd, &mut termios) };
    if result != 0 {
        return Err(io::Error::last_os_error());
    }
    Ok(termios)
}

fn set_termios(fd: c_int, termios: &libc::termios) -> io::Result<()> {
    let result = unsafe { libc::tcsetattr(fd, libc::TCSANOW, termios) };
    if result != 0 {
        return Err(io::Error::last_os_error());
    }
    Ok(())
}

pub(crate) fn poll_readable(fd: c_int, timeout_ms: i32) -> bool {
    let mut fds = libc::pollfd {
        fd,
        events: libc::POLLIN,
        revents: 0,
    };
    let result = unsafe { libc::poll(&mut fds, 1, timeout_ms) };
    result > 0 && (fds.revents & libc::POLLIN) != 0
}

fn wait_writable(fd: c_int) -> io::Result<()> {
    let mut fds = libc::pollfd {
        fd,
        events: libc::POLLOUT,
        revents: 0,
    };
    loop {
        let result = unsafe { libc::poll(&mut fds, 1, -1) };
        if result < 0 {
            let err = io::Error::last_os_error();
            if err.kind() == io::ErrorKind::Interrupted {
                continue;
            }
            return Err(err);
        }
        if result > 0 && (fds.revents & libc::POLLOUT) != 0 {
            return Ok(());
        }
    }
}

/// Writes all bytes, retrying on EINTR and waiting out EAGAIN. Other errors
/// drop the remainder: losing UI output beats wedging shutdown.
fn write_fd(fd: c_int, data: &str) {
    let bytes = data.as_bytes();
    let mut written = 0;
    while written < bytes.len() {
        let remaining = &bytes[written..];
        let result = unsafe {
            libc::write(
                fd,
                remaining.as_ptr() as *const libc::c_void,
                remaining.len(),
            )
        };
        if result > 0 {
            written += result as usize;
            continue;
        }
        if result == 0 {
            break;
        }
        let err = io::Error::last_os_error();
        match err.kind() {
            io::ErrorKind::Interrupted => continue,
            io::ErrorKind::WouldBlock => {
                if wait_writable(fd).is_err() {
                    break;
                }
            }
            _ => {
                log::warn!("terminal write failed: {err}");
                break;
            }
        }
    }
}

fn read_winsize(fd: c_int) -> Option<(u16, u16)> {
    let mut size = libc::winsize {
        ws_row: 0,
        ws_col: 0,
        ws_xpixel: 0,
        ws_ypixel: 0,
    };
    let result = unsafe { libc::ioctl(fd, libc::TIOCGWINSZ, &mut size) };
    if result == 0 && size.ws_col > 0 && size.ws_row > 0 {
        Some((size.ws_col, size.ws_row))
    } else {
        None
    }
}

/// Terminal backed by the process's stdin/stdout descriptors.
pub struct TtyTerminal {
    stdin_fd: c_int,
    stdout_fd: c_int,
    original_termios: Option<libc::termios>,
    input_thread: Option<JoinHandle<()>>,
    stop_flag: Arc<AtomicBool>,
}

impl TtyTerminal {
    pub fn new() -> Self {
        Self {
            stdin_fd: libc::STDIN_FILENO,
            stdout_fd: libc::STDOUT_FILENO,
            original_termios: None,
            input_thread: None,
            stop_flag: Arc::new(AtomicBool::new(false)),
        }
    }
}

impl Default for TtyTerminal {
    fn default() -> Self {
        Self::new()
    }
}

impl Terminal for TtyTerminal {
    fn acquire_raw_mode(&mut self) -> io::Result<()> {
        if self.original_termios.is_none() {
            self.original_termios = Some(get_termios(self.stdin_fd)?);
        }
        let mut raw = self
            .original_termios
            .as_ref()
            .copied()
            .expect("original termios missing");
        unsafe {
            libc::cfmakeraw(&mut raw);
        }
        set_termios(self.stdin_fd, &raw)
    }

    fn restore_mode(&mut self) -> io::Result<()> {
        // Flush pending input first so buffered bytes never leak to the shell.
        let _ = unsafe { libc::tcflush(self.stdin_fd, libc::TCIFLUSH) };
        if let Some(original) = self.original_termios.take() {
            set_termios(self.stdin_fd, &original)?;
        }
        Ok(())
    }

    fn start_input(&mut self, mut on_byte: Box<dyn FnMut(u8) + Send>) {
        if self.input_thread.is_some() {
            return;
        }
        self.stop_flag.store(false, Ordering::SeqCst);

        let stdin_fd = self.stdin_fd;
        let stop_flag = Arc::clone(&self.stop_flag);
        self.input_thread = Some(thread::spawn(move || {
            let mut buffer = [0u8; 64];
            while !stop_flag.load(Ordering::SeqCst) {
                if !poll_readable(stdin_fd, INPUT_POLL_MS) {
                    continue;
                }
                let read_len =
                    unsafe { libc::read(stdin_fd, buffer.as_mut_ptr() as *mut _, buffer.len()) };
                if read_len <= 0 {
                    continue;
                }
                for byte in &buffer[..read_len as usize] {
                    on_byte(*byte);
                }
            }
        }));
    }

    fn stop_input(&mut self) {
        self.stop_flag.store(true, Ordering::SeqCst);
        if let Some(handle) = self.input_thread.take() {
            let _ = handle.join();
        }
    }

    fn write(&mut self, data: &str) {
        if !data.is_empty() {
            write_fd(self.stdout_fd, data);
        }
    }

    fn columns(&self) -> u16 {
        read_winsize(self.stdout_fd)
            .map(|(cols, _)| cols)
            .unwrap_or(80)
    }

    fn rows(&self) -> u16 {
        read_winsize(self.stdout_fd)
            .map(|(_, rows)| rows)
            .unwrap_or(24)
    }
}

impl Drop for TtyTerminal {
    fn drop(&mut self) {
        self.stop_input();
        if let Err(err) = self.restore_mode() {
            log::warn!("failed to restore terminal mode on drop: {err}");
        }
    }
}
