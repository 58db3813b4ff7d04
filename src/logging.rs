//! File-backed diagnostics.
//!
//! The UI owns the terminal for the whole session, so internal diagnostics go
//! to a file selected via `PACMON_DEBUG_LOG`. Without it, `log` macros are
//! no-ops.

use std::fs::File;

use simplelog::{ConfigBuilder, LevelFilter, WriteLogger};

/// Initializes the global file logger. Best-effort: an unwritable path or a
/// second initialization leaves logging disabled rather than failing startup.
pub fn init_file_logger(path: &str) {
    let config = ConfigBuilder::new().set_time_format_rfc3339().build();
    if let Ok(file) = File::create(path) {
        let _ = WriteLogger::init(LevelFilter::Debug, config, file);
    }
}
