//! Log entry model and level colors.

use time::macros::format_description;
use time::OffsetDateTime;

pub const COLOR_RESET: &str = "\x1b[0m";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Info,
    Warn,
    Error,
    Success,
    System,
}

impl LogLevel {
    pub fn label(self) -> &'static str {
        match self {
            Self::Info => "INFO",
            Self::Warn => "WARN",
            Self::Error => "ERROR",
            Self::Success => "SUCCESS",
            Self::System => "SYSTEM",
        }
    }

    /// ANSI color prefix for the level label. INFO stays uncolored.
    pub fn color(self) -> &'static str {
        match self {
            Self::Info => "",
            Self::Warn => "\x1b[33m",
            Self::Error => "\x1b[31m",
            Self::Success => "\x1b[32m",
            Self::System => "\x1b[34m",
        }
    }
}

/// One immutable scrollback entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEntry {
    pub timestamp: OffsetDateTime,
    pub level: LogLevel,
    pub message: String,
}

impl LogEntry {
    pub fn new(level: LogLevel, message: impl Into<String>) -> Self {
        Self {
            timestamp: OffsetDateTime::now_utc(),
            level,
            message: message.into(),
        }
    }

    /// The line shown in the log box: `[HH:MM:SS] LEVEL: message`.
    pub fn display_line(&self) -> String {
        let clock_format = format_description!("[hour]:[minute]:[second]");
        let clock = self
            .timestamp
            .format(&clock_format)
            .unwrap_or_else(|_| "--:--:--".to_string());
        format!(
            "[{clock}] {}{}{}: {}",
            self.level.color(),
            self.level.label(),
            COLOR_RESET,
            self.message
        )
    }
}

#[cfg(test)]
mod tests {
    use super::{LogEntry, LogLevel};

    #[test]
    fn display_line_carries_level_and_message() {
        let entry = LogEntry::new(LogLevel::Error, "something broke");
        let line = entry.display_line();
        assert!(line.contains("\x1b[31mERROR\x1b[0m: something broke"), "{line}");
    }

    #[test]
    fn display_line_starts_with_clock() {
        let entry = LogEntry::new(LogLevel::Info, "hello");
        let line = entry.display_line();
        assert!(line.starts_with('['), "{line}");
        // `[HH:MM:SS] ` prefix is 11 visible characters.
        assert_eq!(&line[9..11], "] ");
    }

    #[test]
    fn info_has_no_color_prefix() {
        assert_eq!(LogLevel::Info.color(), "");
        assert_eq!(LogLevel::System.color(), "\x1b[34m");
    }
}
