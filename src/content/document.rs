//! Text document buffer and its file backend

use std::fs;
use std::path::Path;

use tracing::{debug, warn};

use super::{ContentBackend, ContentError, Result};
use crate::session::PaneKind;

/// Editable text split into lines, with a character-indexed cursor
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextDocument {
    lines: Vec<String>,
    /// Cursor line (0-based)
    row: usize,
    /// Cursor column in characters (0-based)
    col: usize,
    /// Loaded from a file that is not valid UTF-8
    raw_bytes: bool,
}

/// Invalid input bytes 0x80-0xFF are held as U+10FF80-U+10FFFF (private use)
const RAW_BYTE_BASE: u32 = 0x10FF00;

fn raw_byte_char(byte: u8) -> char {
    char::from_u32(RAW_BYTE_BASE + byte as u32).unwrap_or(char::REPLACEMENT_CHARACTER)
}

/// The original byte behind a character produced by `decode_lossless`
pub fn raw_byte(ch: char) -> Option<u8> {
    let value = ch as u32;
    if (RAW_BYTE_BASE + 0x80..=RAW_BYTE_BASE + 0xFF).contains(&value) {
        Some((value - RAW_BYTE_BASE) as u8)
    } else {
        None
    }
}

/// Decode UTF-8, keeping each invalid byte as a private-use character;
/// the flag says whether any were found
fn decode_lossless(bytes: &[u8]) -> (String, bool) {
    let mut text = String::with_capacity(bytes.len());
    let mut escaped = false;
    let mut rest = bytes;
    loop {
        match std::str::from_utf8(rest) {
            Ok(valid) => {
                text.push_str(valid);
                return (text, escaped);
            }
            Err(e) => {
                let (valid, after) = rest.split_at(e.valid_up_to());
                text.push_str(std::str::from_utf8(valid).unwrap_or_default());
                let bad = e.error_len().unwrap_or(after.len());
                text.extend(after[..bad].iter().map(|&b| raw_byte_char(b)));
                escaped = true;
                rest = &after[bad..];
            }
        }
    }
}

fn encode_lossless(text: &str) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(text.len());
    let mut buf = [0u8; 4];
    for ch in text.chars() {
        match raw_byte(ch) {
            Some(byte) => bytes.push(byte),
            None => bytes.extend_from_slice(ch.encode_utf8(&mut buf).as_bytes()),
        }
    }
    bytes
}

impl Default for TextDocument {
    fn default() -> Self {
        Self::new()
    }
}

impl TextDocument {
    /// Empty document
    pub fn new() -> Self {
        Self {
            lines: vec![String::new()],
            row: 0,
            col: 0,
            raw_bytes: false,
        }
    }

    /// Document holding `text`, cursor at the start
    pub fn from_text(text: &str) -> Self {
        Self {
            lines: text.split('\n').map(str::to_string).collect(),
            row: 0,
            col: 0,
            raw_bytes: false,
        }
    }

    /// Document holding file contents; bytes that are not UTF-8 survive a save
    pub fn from_bytes(bytes: &[u8]) -> Self {
        let (text, raw_bytes) = decode_lossless(bytes);
        Self {
            raw_bytes,
            ..Self::from_text(&text)
        }
    }

    /// File contents as they will be written
    pub fn to_bytes(&self) -> Vec<u8> {
        if self.raw_bytes {
            encode_lossless(&self.text())
        } else {
            self.text().into_bytes()
        }
    }

    /// Whether the source file had bytes that are not UTF-8
    pub fn has_raw_bytes(&self) -> bool {
        self.raw_bytes
    }

    /// Full buffer contents
    pub fn text(&self) -> String {
        self.lines.join("\n")
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    pub fn line_count(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.len() == 1 && self.lines[0].is_empty()
    }

    /// Cursor as (row, column), both 0-based
    pub fn cursor(&self) -> (usize, usize) {
        (self.row, self.col)
    }

    /// Status bar position: 1-based line, 0-based column offset
    pub fn line_col(&self) -> (usize, usize) {
        (self.row + 1, self.col)
    }

    pub fn insert_char(&mut self, ch: char) {
        if ch == '\n' {
            self.insert_newline();
            return;
        }
        let line = &mut self.lines[self.row];
        let at = byte_offset(line, self.col);
        line.insert(at, ch);
        self.col += 1;
    }

    pub fn insert_str(&mut self, text: &str) {
        for ch in text.chars() {
            self.insert_char(ch);
        }
    }

    /// Split the current line at the cursor
    pub fn insert_newline(&mut self) {
        let line = &mut self.lines[self.row];
        let at = byte_offset(line, self.col);
        let rest = line.split_off(at);
        self.row += 1;
        self.col = 0;
        self.lines.insert(self.row, rest);
    }

    /// Delete the character before the cursor; returns whether text changed
    pub fn backspace(&mut self) -> bool {
        if self.col > 0 {
            let line = &mut self.lines[self.row];
            let at = byte_offset(line, self.col - 1);
            line.remove(at);
            self.col -= 1;
            true
        } else if self.row > 0 {
            let line = self.lines.remove(self.row);
            self.row -= 1;
            self.col = char_len(&self.lines[self.row]);
            self.lines[self.row].push_str(&line);
            true
        } else {
            false
        }
    }

    pub fn move_left(&mut self) {
        if self.col > 0 {
            self.col -= 1;
        } else if self.row > 0 {
            self.row -= 1;
            self.col = char_len(&self.lines[self.row]);
        }
    }

    pub fn move_right(&mut self) {
        if self.col < char_len(&self.lines[self.row]) {
            self.col += 1;
        } else if self.row + 1 < self.lines.len() {
            self.row += 1;
            self.col = 0;
        }
    }

    pub fn move_up(&mut self) {
        if self.row > 0 {
            self.row -= 1;
            self.clamp_col();
        }
    }

    pub fn move_down(&mut self) {
        if self.row + 1 < self.lines.len() {
            self.row += 1;
            self.clamp_col();
        }
    }

    pub fn move_line_start(&mut self) {
        self.col = 0;
    }

    pub fn move_line_end(&mut self) {
        self.col = char_len(&self.lines[self.row]);
    }

    fn clamp_col(&mut self) {
        self.col = self.col.min(char_len(&self.lines[self.row]));
    }
}

fn char_len(line: &str) -> usize {
    line.chars().count()
}

fn byte_offset(line: &str, col: usize) -> usize {
    line.char_indices()
        .nth(col)
        .map(|(i, _)| i)
        .unwrap_or(line.len())
}

/// Whole-file load/save for text documents
#[derive(Debug, Clone, Copy, Default)]
pub struct DocumentBackend;

impl ContentBackend for DocumentBackend {
    type Content = TextDocument;

    fn kind(&self) -> PaneKind {
        PaneKind::Document
    }

    fn load(&self, path: &Path) -> Result<TextDocument> {
        let bytes = fs::read(path).map_err(|e| ContentError::io(path, e))?;
        debug!("Loaded {} bytes from {}", bytes.len(), path.display());
        let doc = TextDocument::from_bytes(&bytes);
        if doc.has_raw_bytes() {
            warn!("{} is not valid UTF-8; invalid bytes are kept as-is", path.display());
        }
        Ok(doc)
    }

    fn save(&self, content: &TextDocument, path: &Path) -> Result<()> {
        let bytes = content.to_bytes();
        fs::write(path, &bytes).map_err(|e| ContentError::io(path, e))?;
        debug!("Saved {} bytes to {}", bytes.len(), path.display());
        Ok(())
    }
}
