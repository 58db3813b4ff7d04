//! Progress bar frames.
//!
//! One line per tracked unit: a fixed-width name column, a dot-filled bar
//! with a muncher glyph chewing at the fill boundary, and the percent. The
//! completed frame swaps in a ghost; a cancelled bar settles on a full dot
//! run instead.

use crate::core::text::truncate_to_width;

const MUNCHER_OPEN: &str = "󰮯";
const MUNCHER_CLOSED: &str = "󰑊";
const GHOST: &str = "󰓀";
const DOT: &str = "•";

pub const NAME_WIDTH: usize = 20;
/// `" ["` + `"] "` + `"100%"` around the bar body.
const CHROME_WIDTH: usize = 8;

fn name_column(unit: &str) -> String {
    truncate_to_width(unit, NAME_WIDTH, "...", true)
}

fn bar_width(columns: usize) -> usize {
    columns.saturating_sub(NAME_WIDTH + CHROME_WIDTH).max(1)
}

/// A mid-animation frame. The muncher alternates open/closed with percent
/// parity so the bar visibly chews while it advances.
pub fn running_frame(unit: &str, percent: u8, columns: usize) -> String {
    let width = bar_width(columns);
    let filled = width * usize::from(percent.min(100)) / 100;
    let muncher_at = filled.min(width - 1);
    let muncher = if percent % 2 == 0 {
        MUNCHER_OPEN
    } else {
        MUNCHER_CLOSED
    };
    format!(
        "{} [{}{muncher}{}] {percent:3}%",
        name_column(unit),
        DOT.repeat(muncher_at),
        " ".repeat(width - muncher_at - 1),
    )
}

/// The settled frame every bar must reach before its worker exits.
///
/// Natural completion ends on the ghost; a cancelled or superseded bar fills
/// solid so it still reads as done rather than frozen mid-fill.
pub fn final_frame(unit: &str, columns: usize, natural: bool) -> String {
    let width = bar_width(columns);
    let bar = if natural {
        format!("{}{GHOST}", DOT.repeat(width - 1))
    } else {
        DOT.repeat(width)
    };
    format!("{} [{bar}] 100%", name_column(unit))
}
