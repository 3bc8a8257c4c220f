//! Workbench renderer.
//!
//! Draws three regions with crossterm:
//! - Tab bar (row 0) with one cell per pane and a PREFIX indicator
//! - Body showing the active pane's content
//! - Status bar (last row) with the prompt, status message or pane summary
//!
//! # Rendering Architecture
//!
//! ```text
//! begin_frame()  → Hide cursor, disable autowrap, start sync
//!     ↓
//! render content → Tab bar, body, status bar
//!     ↓
//! end_frame()    → Show cursor, enable autowrap, end sync, flush
//! ```

use std::io::{self, Write};

use crossterm::{
    cursor::{Hide, MoveTo, Show},
    execute,
    style::{Attribute, Color, ResetColor, SetAttribute, SetBackgroundColor, SetForegroundColor},
    terminal::{self, Clear, ClearType},
};
use unicode_width::UnicodeWidthStr;

use super::label::{display_column, fit_width, pane_summary, truncate_label};
use crate::app::Workbench;
use crate::content::{Content, DirectoryListing, ShellSession, TextDocument};

/// Begin a render frame (synchronized update, hide cursor, disable autowrap)
fn begin_frame<W: Write>(out: &mut W) -> io::Result<()> {
    write!(out, "\x1b[?2026h")?; // Begin synchronized update
    write!(out, "\x1b[?7l")?; // Disable autowrap
    execute!(out, Hide)?;
    Ok(())
}

/// End a render frame (show cursor if requested, enable autowrap, end sync, flush)
fn end_frame<W: Write>(out: &mut W, cursor: Option<(u16, u16)>) -> io::Result<()> {
    if let Some((x, y)) = cursor {
        execute!(out, MoveTo(x, y), Show)?;
    }
    write!(out, "\x1b[?7h")?; // Enable autowrap
    write!(out, "\x1b[?2026l")?; // End synchronized update
    out.flush()?;
    Ok(())
}

/// Colors used by the renderer
#[derive(Debug, Clone)]
pub struct Palette {
    pub tab_bar_bg: Color,
    pub tab_bar_fg: Color,
    pub tab_active_bg: Color,
    pub tab_active_fg: Color,
    pub tab_inactive_bg: Color,
    pub tab_inactive_fg: Color,
    pub prefix_bg: Color,
    pub prefix_fg: Color,
    pub status_bar_bg: Color,
    pub status_bar_fg: Color,
    pub selection_bg: Color,
    pub selection_fg: Color,
    pub directory_fg: Color,
}

impl Default for Palette {
    fn default() -> Self {
        Self {
            tab_bar_bg: Color::DarkGrey,
            tab_bar_fg: Color::White,
            tab_active_bg: Color::Green,
            tab_active_fg: Color::Black,
            tab_inactive_bg: Color::DarkGrey,
            tab_inactive_fg: Color::Grey,
            prefix_bg: Color::Yellow,
            prefix_fg: Color::Black,
            status_bar_bg: Color::Green,
            status_bar_fg: Color::Black,
            selection_bg: Color::Blue,
            selection_fg: Color::White,
            directory_fg: Color::Cyan,
        }
    }
}

/// Screen regions for one frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Layout {
    width: u16,
    height: u16,
    tab_bar: bool,
    status_bar: bool,
}

impl Layout {
    fn body_top(&self) -> u16 {
        if self.tab_bar {
            1
        } else {
            0
        }
    }

    fn body_height(&self) -> u16 {
        let reserved = self.body_top() + u16::from(self.status_bar);
        self.height.saturating_sub(reserved)
    }
}

/// Full-screen renderer
pub struct Renderer {
    initialized: bool,
    pub palette: Palette,
}

impl Default for Renderer {
    fn default() -> Self {
        Self::new()
    }
}

impl Renderer {
    pub fn new() -> Self {
        Self {
            initialized: false,
            palette: Palette::default(),
        }
    }

    /// Initialize the terminal
    pub fn init(&mut self) -> io::Result<()> {
        terminal::enable_raw_mode()?;

        let mut stdout = io::stdout();
        execute!(
            stdout,
            crossterm::terminal::EnterAlternateScreen,
            Clear(ClearType::All)
        )?;
        stdout.flush()?;

        self.initialized = true;
        Ok(())
    }

    /// Cleanup
    pub fn cleanup(&mut self) -> io::Result<()> {
        if !self.initialized {
            return Ok(());
        }

        let mut stdout = io::stdout();

        // Restore terminal state (in case of abnormal exit)
        write!(stdout, "\x1b[?7h")?;
        write!(stdout, "\x1b[?2026l")?;
        stdout.flush()?;

        execute!(stdout, Show, crossterm::terminal::LeaveAlternateScreen)?;
        terminal::disable_raw_mode()?;
        self.initialized = false;
        Ok(())
    }

    /// Get terminal size
    pub fn size() -> io::Result<(u16, u16)> {
        terminal::size()
    }

    /// Columns and rows left for pane content
    pub fn body_size(wb: &Workbench) -> io::Result<(u16, u16)> {
        let (width, height) = Self::size()?;
        let layout = Layout {
            width,
            height,
            tab_bar: wb.config().tab_bar.visible,
            status_bar: wb.config().status_bar.visible,
        };
        Ok((layout.width, layout.body_height()))
    }

    /// Draw the whole screen
    pub fn render(&mut self, wb: &Workbench, prefix_pending: bool) -> io::Result<()> {
        let (width, height) = Self::size()?;
        let config = wb.config();
        let layout = Layout {
            width,
            height,
            tab_bar: config.tab_bar.visible,
            status_bar: config.status_bar.visible,
        };

        let mut stdout = io::stdout();
        begin_frame(&mut stdout)?;
        let result = self.render_frame(&mut stdout, wb, layout, prefix_pending);
        // Always end frame, even on error
        let cursor = result.as_ref().ok().copied().flatten();
        let _ = end_frame(&mut stdout, cursor);
        result.map(|_| ())
    }

    /// Returns where the terminal cursor belongs, if anywhere
    fn render_frame<W: Write>(
        &self,
        out: &mut W,
        wb: &Workbench,
        layout: Layout,
        prefix_pending: bool,
    ) -> io::Result<Option<(u16, u16)>> {
        if layout.tab_bar {
            self.render_tab_bar(out, wb, layout, prefix_pending)?;
        }
        let mut cursor = self.render_body(out, wb, layout)?;
        if layout.status_bar {
            if let Some(prompt_cursor) = self.render_status_bar(out, wb, layout, prefix_pending)? {
                cursor = Some(prompt_cursor);
            }
        }
        Ok(cursor)
    }

    /// Render the tab bar
    fn render_tab_bar<W: Write>(
        &self,
        out: &mut W,
        wb: &Workbench,
        layout: Layout,
        prefix_pending: bool,
    ) -> io::Result<()> {
        let p = &self.palette;
        let config = wb.config();

        execute!(
            out,
            MoveTo(0, 0),
            SetBackgroundColor(p.tab_bar_bg),
            SetForegroundColor(p.tab_bar_fg)
        )?;
        write!(out, "{:width$}", "", width = layout.width as usize)?;
        execute!(out, MoveTo(0, 0))?;

        let tabs = wb.session().tab_info(&config.labels.dirty_marker);
        let mut used = 0usize;
        for (i, tab) in tabs.iter().enumerate() {
            let label = truncate_label(&tab.label, config.tab_bar.max_label_width);
            let cell = format!(" {}:{} ", i + 1, label);
            let cell_width = cell.width() + 1;
            if used + cell_width > layout.width as usize {
                break;
            }

            if tab.active {
                execute!(
                    out,
                    SetBackgroundColor(p.tab_active_bg),
                    SetForegroundColor(p.tab_active_fg)
                )?;
            } else {
                execute!(
                    out,
                    SetBackgroundColor(p.tab_inactive_bg),
                    SetForegroundColor(p.tab_inactive_fg)
                )?;
            }
            write!(out, "{}", cell)?;

            execute!(
                out,
                SetBackgroundColor(p.tab_bar_bg),
                SetForegroundColor(p.tab_bar_fg)
            )?;
            write!(out, "│")?;
            used += cell_width;
        }

        // Show prefix mode indicator
        if prefix_pending && layout.width >= 8 {
            execute!(
                out,
                MoveTo(layout.width - 8, 0),
                SetBackgroundColor(p.prefix_bg),
                SetForegroundColor(p.prefix_fg)
            )?;
            write!(out, " PREFIX ")?;
        }

        execute!(out, ResetColor)?;
        Ok(())
    }

    /// Render the active pane; returns its cursor position
    fn render_body<W: Write>(
        &self,
        out: &mut W,
        wb: &Workbench,
        layout: Layout,
    ) -> io::Result<Option<(u16, u16)>> {
        let top = layout.body_top();
        let height = layout.body_height();
        let width = layout.width as usize;

        execute!(out, ResetColor)?;
        for row in top..top + height {
            execute!(out, MoveTo(0, row), Clear(ClearType::CurrentLine))?;
        }
        if height == 0 {
            return Ok(None);
        }

        let pane = match wb.session().current_pane() {
            Some(pane) => pane,
            None => {
                let hint = "No panes open. Ctrl+N: new document, Ctrl+B c: new shell";
                let x = (width.saturating_sub(hint.width()) / 2) as u16;
                execute!(out, MoveTo(x, top + height / 2))?;
                write!(out, "{}", fit_width(hint, width.min(hint.width())))?;
                return Ok(None);
            }
        };

        match pane.content() {
            Content::Document(doc) => self.render_document(out, doc, top, height, width),
            Content::Directory(listing) => {
                self.render_directory(out, listing, top, height, width)?;
                Ok(None)
            }
            Content::Shell(shell) => self.render_shell(out, shell, top, height, width),
        }
    }

    fn render_document<W: Write>(
        &self,
        out: &mut W,
        doc: &TextDocument,
        top: u16,
        height: u16,
        width: usize,
    ) -> io::Result<Option<(u16, u16)>> {
        let (row, col) = doc.cursor();
        let first = row.saturating_sub(height as usize - 1);

        for (i, line) in doc.lines().iter().skip(first).take(height as usize).enumerate() {
            execute!(out, MoveTo(0, top + i as u16))?;
            write!(out, "{}", fit_width(line, width))?;
        }

        let x = display_column(&doc.lines()[row], col).min(width.saturating_sub(1));
        Ok(Some((x as u16, top + (row - first) as u16)))
    }

    fn render_directory<W: Write>(
        &self,
        out: &mut W,
        listing: &DirectoryListing,
        top: u16,
        height: u16,
        width: usize,
    ) -> io::Result<()> {
        let p = &self.palette;
        let selected = listing.selected();
        let first = selected.saturating_sub(height as usize - 1);
        let size_width = 10;
        let name_width = width.saturating_sub(size_width + 1);

        for (i, entry) in listing
            .entries()
            .iter()
            .enumerate()
            .skip(first)
            .take(height as usize)
        {
            execute!(out, MoveTo(0, top + (i - first) as u16))?;
            if i == selected {
                execute!(
                    out,
                    SetBackgroundColor(p.selection_bg),
                    SetForegroundColor(p.selection_fg)
                )?;
            } else if entry.is_dir {
                execute!(out, SetForegroundColor(p.directory_fg))?;
            }

            let name = if entry.is_dir {
                format!("{}/", entry.name)
            } else {
                entry.name.clone()
            };
            write!(
                out,
                "{} {:>size_width$}",
                fit_width(&name, name_width),
                entry.size_label,
                size_width = size_width
            )?;
            execute!(out, ResetColor)?;
        }

        if listing.is_empty() {
            execute!(out, MoveTo(0, top), SetAttribute(Attribute::Dim))?;
            write!(out, "{}", fit_width("(empty)", width))?;
            execute!(out, SetAttribute(Attribute::Reset))?;
        }
        Ok(())
    }

    fn render_shell<W: Write>(
        &self,
        out: &mut W,
        shell: &ShellSession,
        top: u16,
        height: u16,
        width: usize,
    ) -> io::Result<Option<(u16, u16)>> {
        // Transcript tail above the line the shell is writing
        let transcript = shell.transcript();
        let visible = (height as usize).saturating_sub(1);
        let start = transcript.len().saturating_sub(visible);

        for (i, line) in transcript[start..].iter().enumerate() {
            execute!(out, MoveTo(0, top + i as u16))?;
            write!(out, "{}", fit_width(line, width))?;
        }

        let input_row = top + (transcript.len() - start) as u16;
        let current = shell.current_line();
        execute!(out, MoveTo(0, input_row))?;
        write!(out, "{}", fit_width(&current, width))?;

        if !shell.is_alive() {
            return Ok(None);
        }
        let x = display_column(&current, shell.cursor_column()).min(width.saturating_sub(1));
        Ok(Some((x as u16, input_row)))
    }

    /// Render the status bar; returns the cursor position while a prompt is open
    fn render_status_bar<W: Write>(
        &self,
        out: &mut W,
        wb: &Workbench,
        layout: Layout,
        prefix_pending: bool,
    ) -> io::Result<Option<(u16, u16)>> {
        let p = &self.palette;
        let width = layout.width as usize;
        let status_y = layout.height.saturating_sub(1);

        execute!(
            out,
            MoveTo(0, status_y),
            SetBackgroundColor(p.status_bar_bg),
            SetForegroundColor(p.status_bar_fg)
        )?;

        if let Some(prompt) = wb.prompt() {
            let text = format!(" {} {}", prompt.message, prompt.input);
            write!(out, "{}", fit_width(&text, width))?;
            execute!(out, ResetColor)?;
            let x = text.width().min(width.saturating_sub(1));
            return Ok(Some((x as u16, status_y)));
        }

        let left = match (wb.status(), wb.session().current_pane()) {
            (Some(status), _) => status.to_string(),
            (None, Some(pane)) => pane_summary(pane, &wb.config().labels.dirty_marker),
            (None, None) => String::new(),
        };
        let shortcuts = if prefix_pending {
            "c:shell e:doc f:files d:dir r:script x:close n/p:tab ,:rename"
        } else {
            "Ctrl+B: prefix | Ctrl+S: save | Ctrl+Q: quit"
        };

        let left = truncate_label(&left, width.saturating_sub(2));
        let padding = width.saturating_sub(left.width() + shortcuts.width() + 2);
        let line = format!(" {}{:padding$}{} ", left, "", shortcuts, padding = padding);
        write!(out, "{}", fit_width(&line, width))?;

        execute!(out, ResetColor)?;
        Ok(None)
    }
}

impl Drop for Renderer {
    fn drop(&mut self) {
        let _ = self.cleanup();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;

    fn render_to_buffer(wb: &Workbench, layout: Layout) -> (String, Option<(u16, u16)>) {
        let renderer = Renderer::new();
        let mut buf = Vec::new();
        let cursor = renderer.render_frame(&mut buf, wb, layout, false).unwrap();
        (String::from_utf8_lossy(&buf).into_owned(), cursor)
    }

    fn layout() -> Layout {
        Layout {
            width: 60,
            height: 10,
            tab_bar: true,
            status_bar: true,
        }
    }

    #[test]
    fn test_layout_regions() {
        let l = layout();
        assert_eq!(l.body_top(), 1);
        assert_eq!(l.body_height(), 8);

        let bare = Layout {
            tab_bar: false,
            status_bar: false,
            ..l
        };
        assert_eq!(bare.body_top(), 0);
        assert_eq!(bare.body_height(), 10);
    }

    #[test]
    fn test_frame_shows_tabs_and_summary() {
        let mut wb = Workbench::new(Config::default());
        wb.new_document();
        wb.new_document();

        let (screen, cursor) = render_to_buffer(&wb, layout());
        assert!(screen.contains(" 1:Untitled "));
        assert!(screen.contains(" 2:Untitled "));
        assert!(screen.contains("Untitled — Ln 1, Col 0"));
        assert_eq!(cursor, Some((0, 1)));
    }

    #[test]
    fn test_prompt_owns_the_cursor() {
        let mut wb = Workbench::new(Config::default());
        wb.new_document();
        wb.execute(crate::app::Command::OpenFile);

        let (screen, cursor) = render_to_buffer(&wb, layout());
        assert!(screen.contains(" Open file: "));
        assert_eq!(cursor, Some((" Open file: ".len() as u16, 9)));
    }

    #[test]
    fn test_empty_session_has_placeholder() {
        let wb = Workbench::new(Config::default());
        let (screen, cursor) = render_to_buffer(&wb, layout());
        assert!(screen.contains("No panes open."));
        assert_eq!(cursor, None);
    }
}
