//! Environment configuration.

use std::env;

#[derive(Debug, Clone, Default)]
pub struct EnvConfig {
    /// Path for the diagnostic file log (`PACMON_DEBUG_LOG`). The terminal
    /// belongs to the UI, so diagnostics never go to stdout/stderr.
    pub debug_log: Option<String>,
    /// Log box content height override (`PACMON_VIEW_HEIGHT`).
    pub view_height: Option<usize>,
    /// Scrollback capacity override (`PACMON_LOG_CAPACITY`).
    pub log_capacity: Option<usize>,
    /// Install command override (`PACMON_COMMAND`), split on whitespace.
    pub command_override: Option<String>,
}

impl EnvConfig {
    pub fn from_env() -> Self {
        Self {
            debug_log: env_string_opt("PACMON_DEBUG_LOG"),
            view_height: env_usize_opt("PACMON_VIEW_HEIGHT"),
            log_capacity: env_usize_opt("PACMON_LOG_CAPACITY"),
            command_override: env_string_opt("PACMON_COMMAND"),
        }
    }
}

fn env_string_opt(key: &str) -> Option<String> {
    env::var(key).ok().and_then(|value| {
        if value.trim().is_empty() {
            None
        } else {
            Some(value)
        }
    })
}

fn env_usize_opt(key: &str) -> Option<usize> {
    env_string_opt(key).and_then(|value| value.trim().parse().ok())
}
