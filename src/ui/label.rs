//! Tab labels and status text, measured in display columns

use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

use crate::content::{raw_byte, Content};
use crate::session::Pane;

/// Appended to labels that were cut short
pub const ELLIPSIS: char = '…';

/// Shorten `label` to at most `max_width` columns, ending in `…` when cut
pub fn truncate_label(label: &str, max_width: usize) -> String {
    if label.width() <= max_width {
        return label.to_string();
    }
    if max_width == 0 {
        return String::new();
    }

    let budget = max_width - 1;
    let mut out = String::new();
    let mut used = 0;
    for ch in label.chars() {
        let w = ch.width().unwrap_or(0);
        if used + w > budget {
            break;
        }
        out.push(ch);
        used += w;
    }
    out.push(ELLIPSIS);
    out
}

/// Cut or pad `text` to exactly `width` columns
pub fn fit_width(text: &str, width: usize) -> String {
    let mut out = String::new();
    let mut used = 0;
    for ch in text.chars() {
        // Control characters would move the terminal cursor
        let ch = if ch.is_control() {
            ' '
        } else if raw_byte(ch).is_some() {
            char::REPLACEMENT_CHARACTER
        } else {
            ch
        };
        let w = ch.width().unwrap_or(0);
        if used + w > width {
            break;
        }
        out.push(ch);
        used += w;
    }
    out.extend(std::iter::repeat(' ').take(width - used));
    out
}

/// Display column of the `col`-th character of `line`
pub fn display_column(line: &str, col: usize) -> usize {
    line.chars()
        .take(col)
        .map(|ch| ch.width().unwrap_or(0))
        .sum()
}

/// One-line description of a pane for the status bar
pub fn pane_summary(pane: &Pane<Content>, dirty_marker: &str) -> String {
    let label = pane.label(dirty_marker);
    match pane.content() {
        Content::Document(doc) => {
            let (line, col) = doc.line_col();
            format!("{} — Ln {}, Col {}", label, line, col)
        }
        Content::Directory(listing) => {
            format!("{} — {} entries", listing.path().display(), listing.len())
        }
        Content::Shell(shell) => match shell.exit_code() {
            Some(code) => format!("{} — {} (exited {})", label, shell.program(), code),
            None => format!("{} — {}", label, shell.program()),
        },
    }
}
