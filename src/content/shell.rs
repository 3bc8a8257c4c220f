//! Shell sessions
//!
//! One interactive shell per pane, running on its own PTY. Output is parsed
//! with `vte` into a line transcript; keystrokes go straight to the shell,
//! which does its own echo and line editing.

use std::env;
use std::fmt;
use std::fs;
use std::path::Path;
use std::sync::mpsc::{Receiver, TryRecvError};

use tracing::{debug, info};
use vte::{Params, Parser, Perform};

use super::pty::PtyHandle;
use super::{ContentBackend, ContentError, Result};
use crate::session::PaneKind;

/// Shell used when neither the config nor $SHELL names one
pub const DEFAULT_SHELL: &str = "bash";

/// Maximum number of transcript lines kept per session
const TRANSCRIPT_LIMIT: usize = 1000;

/// Initial PTY size until the front end reports the real one
pub const DEFAULT_SIZE: (u16, u16) = (80, 24);

/// Pick the shell command: configured, then $SHELL, then `bash`
pub fn resolve_shell(configured: Option<&str>) -> String {
    configured
        .filter(|s| !s.trim().is_empty())
        .map(str::to_string)
        .or_else(|| env::var("SHELL").ok().filter(|s| !s.is_empty()))
        .unwrap_or_else(|| DEFAULT_SHELL.to_string())
}

/// Shell output folded into lines
#[derive(Debug, Default)]
struct Transcript {
    /// Finished lines, oldest first
    lines: Vec<String>,
    /// Line the shell is still writing (prompt, echoed input)
    current: Vec<char>,
    col: usize,
}

impl Transcript {
    fn put(&mut self, ch: char) {
        if self.col < self.current.len() {
            self.current[self.col] = ch;
        } else {
            self.current.resize(self.col, ' ');
            self.current.push(ch);
        }
        self.col += 1;
    }

    fn newline(&mut self) {
        let line: String = self.current.drain(..).collect();
        self.push_line(line);
        self.col = 0;
    }

    fn push_line(&mut self, line: String) {
        self.lines.push(line);
        if self.lines.len() > TRANSCRIPT_LIMIT {
            let excess = self.lines.len() - TRANSCRIPT_LIMIT;
            self.lines.drain(..excess);
        }
    }

    fn clear(&mut self) {
        self.lines.clear();
        self.current.clear();
        self.col = 0;
    }
}

/// First CSI parameter; 0 means "use the default"
fn csi_param(params: &Params, default: usize) -> usize {
    params
        .iter()
        .next()
        .and_then(|p| p.first())
        .map(|&v| v as usize)
        .filter(|&v| v != 0)
        .unwrap_or(default)
}

impl Perform for Transcript {
    fn print(&mut self, c: char) {
        self.put(c);
    }

    fn execute(&mut self, byte: u8) {
        match byte {
            b'\n' => self.newline(),
            b'\r' => self.col = 0,
            0x08 => self.col = self.col.saturating_sub(1),
            b'\t' => {
                let next = (self.col / 8 + 1) * 8;
                while self.col < next {
                    self.put(' ');
                }
            }
            _ => {}
        }
    }

    fn csi_dispatch(&mut self, params: &Params, _intermediates: &[u8], _ignore: bool, action: char) {
        match action {
            // Erase in line
            'K' => match csi_param(params, 0) {
                0 => self.current.truncate(self.col),
                1 => {
                    let end = (self.col + 1).min(self.current.len());
                    self.current[..end].iter_mut().for_each(|c| *c = ' ');
                }
                _ => self.current.clear(),
            },
            'C' => self.col += csi_param(params, 1),
            'D' => self.col = self.col.saturating_sub(csi_param(params, 1)),
            'G' => self.col = csi_param(params, 1) - 1,
            // Delete characters
            'P' => {
                if self.col < self.current.len() {
                    let end = (self.col + csi_param(params, 1)).min(self.current.len());
                    self.current.drain(self.col..end);
                }
            }
            // Insert blanks
            '@' => {
                if self.col < self.current.len() {
                    let count = csi_param(params, 1);
                    let at = self.col;
                    self.current
                        .splice(at..at, std::iter::repeat(' ').take(count));
                }
            }
            // Erase display: the shell's `clear`
            'J' if csi_param(params, 0) >= 2 => self.clear(),
            _ => {}
        }
    }
}

/// A shell pane's state
pub struct ShellSession {
    /// Shell program
    program: String,
    /// Running shell; `None` until started
    pty: Option<PtyHandle>,
    /// Channel to receive PTY output
    output_rx: Option<Receiver<Vec<u8>>>,
    parser: Parser,
    transcript: Transcript,
    /// Exit code once the shell has terminated
    exit_code: Option<u32>,
}

impl ShellSession {
    /// Session for `program`; nothing runs until `start`
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            pty: None,
            output_rx: None,
            parser: Parser::new(),
            transcript: Transcript::default(),
            exit_code: None,
        }
    }

    /// Spawn the shell on a `cols` x `rows` PTY
    pub fn start(&mut self, cols: u16, rows: u16) -> Result<()> {
        if self.pty.is_some() {
            return Ok(());
        }
        let (pty, rx) = PtyHandle::spawn(&self.program, cols, rows)?;
        info!("Started shell {}", self.program);
        self.pty = Some(pty);
        self.output_rx = Some(rx);
        self.exit_code = None;
        Ok(())
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    /// Completed output lines, oldest first
    pub fn transcript(&self) -> &[String] {
        &self.transcript.lines
    }

    /// The unfinished last line, usually the prompt and what is being typed
    pub fn current_line(&self) -> String {
        self.transcript.current.iter().collect()
    }

    /// Cursor position in `current_line`, in characters
    pub fn cursor_column(&self) -> usize {
        self.transcript.col
    }

    pub fn exit_code(&self) -> Option<u32> {
        self.exit_code
    }

    /// Whether the shell was started and has not exited
    pub fn is_alive(&self) -> bool {
        self.pty.is_some() && self.exit_code.is_none()
    }

    /// Send keystrokes to the shell
    pub fn write(&mut self, data: &[u8]) -> Result<()> {
        match self.pty.as_mut() {
            Some(pty) if self.exit_code.is_none() => pty.write(data),
            _ => Err(ContentError::NotRunning(self.program.clone())),
        }
    }

    /// Type every non-empty line of a script into the shell; returns how many were sent
    pub fn feed_script(&mut self, script: &str) -> Result<usize> {
        let mut count = 0;
        for line in script.lines().filter(|l| !l.trim().is_empty()) {
            self.write(line.as_bytes())?;
            self.write(b"\n")?;
            count += 1;
        }
        Ok(count)
    }

    pub fn resize(&self, cols: u16, rows: u16) {
        if let Some(pty) = &self.pty {
            pty.resize(cols, rows);
        }
    }

    /// Drain pending shell output into the transcript; returns whether anything changed
    pub fn process_output(&mut self) -> bool {
        let mut chunks = Vec::new();
        let mut disconnected = false;
        if let Some(rx) = &self.output_rx {
            loop {
                match rx.try_recv() {
                    Ok(data) => chunks.push(data),
                    Err(TryRecvError::Empty) => break,
                    Err(TryRecvError::Disconnected) => {
                        disconnected = true;
                        break;
                    }
                }
            }
        }
        if disconnected {
            self.output_rx = None;
        }

        let mut changed = !chunks.is_empty();
        for data in &chunks {
            self.feed(data);
        }

        if self.exit_code.is_none() {
            if let Some(code) = self.pty.as_mut().and_then(PtyHandle::try_wait) {
                debug!("Shell {} exited with {}", self.program, code);
                self.exit_code = Some(code);
                if !self.transcript.current.is_empty() {
                    self.transcript.newline();
                }
                self.transcript
                    .push_line(format!("[Process exited with code {}]", code));
                changed = true;
            }
        }
        changed
    }

    fn feed(&mut self, data: &[u8]) {
        self.parser.advance(&mut self.transcript, data);
    }
}

impl fmt::Debug for ShellSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ShellSession")
            .field("program", &self.program)
            .field("started", &self.pty.is_some())
            .field("exit_code", &self.exit_code)
            .field("lines", &self.transcript.lines.len())
            .finish()
    }
}

/// Creates shell sessions; `load` runs a script file in a fresh session
#[derive(Debug, Clone)]
pub struct ShellBackend {
    pub program: String,
    cols: u16,
    rows: u16,
}

impl ShellBackend {
    pub fn new(program: impl Into<String>) -> Self {
        let (cols, rows) = DEFAULT_SIZE;
        Self {
            program: program.into(),
            cols,
            rows,
        }
    }

    /// PTY size for new sessions
    pub fn size(&self) -> (u16, u16) {
        (self.cols, self.rows)
    }

    pub fn set_size(&mut self, cols: u16, rows: u16) {
        self.cols = cols.max(1);
        self.rows = rows.max(1);
    }

    /// Session that has not been started yet
    pub fn session(&self) -> ShellSession {
        ShellSession::new(self.program.clone())
    }

    /// Fresh running session with no history
    pub fn spawn(&self) -> Result<ShellSession> {
        let mut session = self.session();
        session.start(self.cols, self.rows)?;
        Ok(session)
    }
}

impl ContentBackend for ShellBackend {
    type Content = ShellSession;

    fn kind(&self) -> PaneKind {
        PaneKind::Shell
    }

    fn load(&self, path: &Path) -> Result<ShellSession> {
        let script = fs::read_to_string(path).map_err(|e| ContentError::io(path, e))?;
        let mut session = self.spawn()?;
        let count = session.feed_script(&script)?;
        info!("Sent {} script lines from {}", count, path.display());
        Ok(session)
    }

    fn save(&self, _content: &ShellSession, _path: &Path) -> Result<()> {
        Err(ContentError::Unsupported(PaneKind::Shell))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;
    use std::time::{Duration, Instant};

    /// Poll until a transcript line contains `needle`
    #[cfg(unix)]
    fn wait_for(shell: &mut ShellSession, needle: &str) -> bool {
        let deadline = Instant::now() + Duration::from_secs(5);
        while Instant::now() < deadline {
            shell.process_output();
            if shell.transcript().iter().any(|l| l.contains(needle)) {
                return true;
            }
            thread::sleep(Duration::from_millis(20));
        }
        false
    }

    #[test]
    fn test_resolve_shell_prefers_config() {
        assert_eq!(resolve_shell(Some("zsh")), "zsh");
        let fallback = resolve_shell(Some("  "));
        assert!(!fallback.is_empty());
        assert_eq!(resolve_shell(None), fallback);
    }

    #[test]
    fn test_output_is_split_into_lines() {
        let mut shell = ShellSession::new("sh");
        shell.feed(b"$ echo hi\r\nhi\r\n$ ");
        assert_eq!(shell.transcript(), ["$ echo hi", "hi"]);
        assert_eq!(shell.current_line(), "$ ");
        assert_eq!(shell.cursor_column(), 2);
    }

    #[test]
    fn test_line_editing_sequences() {
        let mut shell = ShellSession::new("sh");
        // Typed "lx", erased the x, typed "s"
        shell.feed(b"$ lx\x08 \x08s");
        assert_eq!(shell.current_line(), "$ ls");

        // Readline-style erase to end of line
        shell.feed(b"\r$ \x1b[K");
        assert_eq!(shell.current_line(), "$ ");

        // Colors are dropped, text kept
        shell.feed(b"\x1b[1;32mok\x1b[0m\r\n");
        assert_eq!(shell.transcript(), ["$ ok"]);
    }

    #[test]
    fn test_clear_screen_empties_transcript() {
        let mut shell = ShellSession::new("sh");
        shell.feed(b"old output\r\n\x1b[H\x1b[2J$ ");
        assert!(shell.transcript().is_empty());
        assert_eq!(shell.current_line(), "$ ");
    }

    #[test]
    fn test_transcript_is_bounded() {
        let mut shell = ShellSession::new("sh");
        for i in 0..(TRANSCRIPT_LIMIT + 10) {
            shell.feed(format!("{}\r\n", i).as_bytes());
        }
        assert_eq!(shell.transcript().len(), TRANSCRIPT_LIMIT);
        assert_eq!(shell.transcript()[0], "10");
    }

    #[test]
    fn test_unstarted_session_rejects_input() {
        let mut shell = ShellSession::new("sh");
        assert!(!shell.is_alive());
        let err = shell.write(b"ls\r").unwrap_err();
        assert!(matches!(err, ContentError::NotRunning(_)));
        assert!(!shell.process_output());
    }

    #[test]
    fn test_missing_program_is_spawn_error() {
        let err = ShellBackend::new("/nonexistent/shell-binary")
            .spawn()
            .unwrap_err();
        assert!(matches!(err, ContentError::Spawn { .. }));
    }

    #[cfg(unix)]
    #[test]
    fn test_shell_state_persists_between_lines() {
        let dir = tempfile::tempdir().unwrap();
        let mut shell = ShellBackend::new("sh").spawn().unwrap();
        assert!(shell.is_alive());

        shell
            .write(format!("cd '{}'\r", dir.path().display()).as_bytes())
            .unwrap();
        shell.write(b"echo \"dir:$(pwd)\"\r").unwrap();

        let expected = format!("dir:{}", dir.path().display());
        assert!(wait_for(&mut shell, &expected), "{:?}", shell.transcript());
    }

    #[cfg(unix)]
    #[test]
    fn test_long_command_does_not_block() {
        let mut shell = ShellBackend::new("sh").spawn().unwrap();
        let started = Instant::now();
        shell.write(b"sleep 2\r").unwrap();
        shell.process_output();
        assert!(started.elapsed() < Duration::from_secs(1));
        assert!(shell.is_alive());
    }

    #[cfg(unix)]
    #[test]
    fn test_exit_is_reported() {
        let mut shell = ShellBackend::new("sh").spawn().unwrap();
        shell.write(b"exit 3\r").unwrap();
        assert!(wait_for(&mut shell, "[Process exited with code 3]"));
        assert_eq!(shell.exit_code(), Some(3));
        assert!(!shell.is_alive());
        assert!(shell.write(b"ls\r").is_err());
    }

    #[cfg(unix)]
    #[test]
    fn test_load_runs_script() {
        let dir = tempfile::tempdir().unwrap();
        let script = dir.path().join("setup.sh");
        fs::write(&script, "echo one=$((0+1))\n\necho two=$((1+1))\n").unwrap();

        let mut session = ShellBackend::new("sh").load(&script).unwrap();
        assert!(wait_for(&mut session, "one=1"));
        assert!(wait_for(&mut session, "two=2"));
    }
}
