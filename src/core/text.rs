//! ANSI-aware width and truncation helpers.

use unicode_segmentation::UnicodeSegmentation;
use unicode_width::UnicodeWidthStr;

const ANSI_RESET: &str = "\x1b[0m";

/// Byte length of the CSI sequence starting at `idx`, if any.
fn ansi_code_len(text: &str, idx: usize) -> Option<usize> {
    let bytes = text.as_bytes();
    if bytes.get(idx) != Some(&0x1b) || bytes.get(idx + 1) != Some(&b'[') {
        return None;
    }
    let mut end = idx + 2;
    while let Some(byte) = bytes.get(end) {
        if (0x40..=0x7e).contains(byte) {
            return Some(end + 1 - idx);
        }
        end += 1;
    }
    // Unterminated sequence: swallow the rest so it never counts as width.
    Some(text.len() - idx)
}

/// Visible terminal width of `text`, ignoring ANSI control sequences.
pub fn visible_width(text: &str) -> usize {
    let mut width = 0;
    let mut idx = 0;
    while idx < text.len() {
        if let Some(len) = ansi_code_len(text, idx) {
            idx += len;
            continue;
        }
        let end = next_ansi_or_end(text, idx);
        width += UnicodeWidthStr::width(&text[idx..end]);
        idx = end;
    }
    width
}

fn next_ansi_or_end(text: &str, mut idx: usize) -> usize {
    while idx < text.len() {
        if ansi_code_len(text, idx).is_some() {
            break;
        }
        let ch = text[idx..].chars().next().expect("char boundary");
        idx += ch.len_utf8();
    }
    idx
}

/// Truncates `text` to at most `max_width` visible cells, appending `ellipsis`
/// when it had to cut. ANSI codes are preserved and closed with a reset so a
/// color never bleeds past the cut. Pads with spaces to exactly `max_width`
/// when `pad` is set.
pub fn truncate_to_width(text: &str, max_width: usize, ellipsis: &str, pad: bool) -> String {
    if max_width == 0 {
        return String::new();
    }

    let text_width = visible_width(text);
    if text_width <= max_width {
        if pad {
            return format!("{text}{}", " ".repeat(max_width - text_width));
        }
        return text.to_string();
    }

    let target = max_width.saturating_sub(visible_width(ellipsis));
    let mut out = String::new();
    let mut used = 0;
    let mut idx = 0;
    'outer: while idx < text.len() {
        if let Some(len) = ansi_code_len(text, idx) {
            out.push_str(&text[idx..idx + len]);
            idx += len;
            continue;
        }
        let end = next_ansi_or_end(text, idx);
        for grapheme in UnicodeSegmentation::graphemes(&text[idx..end], true) {
            let grapheme_width = UnicodeWidthStr::width(grapheme);
            if used + grapheme_width > target {
                break 'outer;
            }
            out.push_str(grapheme);
            used += grapheme_width;
        }
        idx = end;
    }

    out.push_str(ANSI_RESET);
    out.push_str(ellipsis);
    if pad {
        let out_width = visible_width(&out);
        if out_width < max_width {
            out.push_str(&" ".repeat(max_width - out_width));
        }
    }
    out
}
