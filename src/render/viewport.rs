//! Log box rendering.
//!
//! Pure row formatting for the bordered scrollback box: every row is exactly
//! `columns` cells wide so the side borders always line up, with over-wide
//! log lines cut on an ellipsis.

use crate::core::scrollback::{ScrollbackBuffer, ViewChange};
use crate::core::text::{truncate_to_width, visible_width};
use crate::render::screen::Screen;

pub const DEFAULT_HEIGHT: usize = 15;

const ELLIPSIS: &str = "...";
const CONTROLS_HINT: &str = "↑/↓: Scroll | F: Toggle Follow | Q: Quit";

/// Top border with the title centered: `┌── title ──┐`.
pub fn top_border(title: &str, columns: usize) -> String {
    let title_display = format!(" {title} ");
    let title_width = visible_width(&title_display);
    let dashes = columns.saturating_sub(title_width + 2);
    let left = dashes / 2;
    let right = dashes - left;
    format!("┌{}{title_display}{}┐", "─".repeat(left), "─".repeat(right))
}

pub fn bottom_border(columns: usize) -> String {
    format!("└{}┘", "─".repeat(columns.saturating_sub(2)))
}

/// One bordered interior row: `│ text… │`, padded to the full box width.
pub fn interior_row(text: &str, columns: usize) -> String {
    let inner = columns.saturating_sub(4);
    format!("│ {} │", truncate_to_width(text, inner, ELLIPSIS, true))
}

/// The controls/status row content.
pub fn status_row(buffer: &ScrollbackBuffer, columns: usize) -> String {
    let (start, end) = buffer.visible_range();
    let follow = if buffer.is_following() { "ON " } else { "OFF" };
    let status = format!(
        "↑/↓: Scroll | F: Follow ({follow}) | {}-{}/{}",
        start + 1,
        end,
        buffer.len()
    );
    interior_row(&status, columns)
}

/// The initial frame: borders, blank content rows, and the controls hint.
pub fn frame_rows(title: &str, columns: usize, height: usize) -> Vec<String> {
    let mut rows = Vec::with_capacity(height + 3);
    rows.push(top_border(title, columns));
    for _ in 0..height {
        rows.push(interior_row("", columns));
    }
    rows.push(interior_row(CONTROLS_HINT, columns));
    rows.push(bottom_border(columns));
    rows
}

/// Visible window as bordered rows, padded with blanks to the box height.
pub fn content_rows(buffer: &ScrollbackBuffer, columns: usize) -> Vec<String> {
    let mut rows: Vec<String> = buffer
        .visible_entries()
        .iter()
        .map(|entry| interior_row(&entry.display_line(), columns))
        .collect();
    while rows.len() < buffer.height() {
        rows.push(interior_row("", columns));
    }
    rows
}

/// Pushes the regions named by `change` through the screen gate.
pub fn render(screen: &Screen, buffer: &ScrollbackBuffer, change: ViewChange) {
    if !change.any() {
        return;
    }
    let columns = screen.columns();
    let content = change.content.then(|| content_rows(buffer, columns));
    let status = change.status.then(|| status_row(buffer, columns));
    screen.redraw_box(content.as_deref(), status.as_deref());
}
