//! Fatal session errors.
//!
//! Only startup failures abort the session; everything after the external
//! process is running degrades to colored log entries.

use std::io;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("failed to configure terminal: {0}")]
    Terminal(#[source] io::Error),

    #[error("failed to spawn `{command}`: {source}")]
    Spawn {
        command: String,
        #[source]
        source: io::Error,
    },
}
