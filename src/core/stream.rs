//! External process output decoding.
//!
//! Two independent matchers feed one event type: a bracketed progress marker
//! and a case-insensitive `installing <name>...` announcement. Every line also
//! produces a generic log event, in stream order.

use once_cell::sync::Lazy;
use regex::Regex;

static PROGRESS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\[#+(?: +)?\] (\d+)%").expect("progress pattern"));
static UNIT_STARTED: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)installing (.+?)\.\.\.").expect("unit pattern"));

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputEvent {
    /// Raw line, always emitted first for its line.
    Log(String),
    UnitStarted(String),
    ProgressUpdate { unit: String, percent: u8 },
    StreamClosed,
}

/// Line decoder tracking the most recently started unit.
///
/// Progress markers carry no unit name, so they are credited to the current
/// unit. The progress matcher runs before the unit matcher: a line carrying
/// both credits the unit that was current when the line began.
#[derive(Debug, Default)]
pub struct StreamDecoder {
    current_unit: Option<String>,
}

impl StreamDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current_unit(&self) -> Option<&str> {
        self.current_unit.as_deref()
    }

    /// Decodes one line into events, order preserved.
    pub fn decode_line(&mut self, line: &str) -> Vec<OutputEvent> {
        let mut events = vec![OutputEvent::Log(line.to_string())];

        if let Some(captures) = PROGRESS.captures(line) {
            if let Some(unit) = self.current_unit.as_ref() {
                if let Ok(percent) = captures[1].parse::<u32>() {
                    events.push(OutputEvent::ProgressUpdate {
                        unit: unit.clone(),
                        percent: percent.min(100) as u8,
                    });
                }
            }
        }

        if let Some(captures) = UNIT_STARTED.captures(line) {
            let unit = captures[1].trim().to_string();
            self.current_unit = Some(unit.clone());
            events.push(OutputEvent::UnitStarted(unit));
        }

        events
    }
}
