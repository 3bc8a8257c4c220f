//! Workbench - the host application around the session.
//!
//! The workbench is the only caller of the session's mutating operations.
//! It creates panes first and loads their content second, so a failed load
//! leaves a valid (empty) pane and a status message instead of corrupting
//! the session's bookkeeping.

use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::config::Config;
use crate::content::{
    home_dir, parent_dir, resolve_path, resolve_shell, Content, ContentBackend, ContentError,
    DirectoryBackend, DirectoryListing, DocumentBackend, EntryAction, ShellBackend, TextDocument,
};
use crate::session::{
    derive_title, ClosedPane, PaneId, PaneKind, SessionError, SessionEvent, SessionManager,
};

/// Status text shown once the last pane is closed
pub const NO_FILE: &str = "No file";

/// User-level actions, produced by the key mapper
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    NewDocument,
    NewShell,
    NewDirectory,
    OpenFile,
    OpenDirectory,
    OpenScript,
    Save,
    SaveAs,
    Rename,
    Close,
    NextPane,
    PrevPane,
    LastPane,
    GotoPane(usize),
    MoveLeft,
    MoveRight,
    Quit,
}

/// Keys forwarded to the active pane or prompt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaneInput {
    Char(char),
    Enter,
    Backspace,
    Up,
    Down,
    Left,
    Right,
    Home,
    End,
    /// Ctrl+<letter> not bound to a command
    Ctrl(char),
}

/// What the status-line prompt is asking for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptKind {
    OpenFile,
    OpenDirectory,
    OpenScript,
    SaveAs(PaneId),
    /// Path for the pane that was closed with unsaved changes
    SaveClosed,
    Rename(PaneId),
    /// y/n: save the pane that was closed with unsaved changes
    ConfirmSaveOnClose,
    /// y/n: quit with unsaved changes
    ConfirmQuit,
}

impl PromptKind {
    /// Answered with a single y/n key instead of typed text
    pub fn is_confirmation(self) -> bool {
        matches!(self, PromptKind::ConfirmSaveOnClose | PromptKind::ConfirmQuit)
    }
}

/// Active status-line prompt
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prompt {
    pub kind: PromptKind,
    pub message: String,
    pub input: String,
}

/// Host state: the session plus everything around it
pub struct Workbench {
    session: SessionManager<Content>,
    config: Config,
    documents: DocumentBackend,
    directories: DirectoryBackend,
    shells: ShellBackend,
    prompt: Option<Prompt>,
    status: Option<String>,
    /// Pane closed with unsaved changes, waiting for the save prompt
    pending_close: Option<ClosedPane<Content>>,
    running: bool,
}

impl Workbench {
    pub fn new(config: Config) -> Self {
        let directories = DirectoryBackend {
            show_hidden: config.directory.show_hidden,
            show_parent_entry: config.directory.show_parent_entry,
        };
        let shells = ShellBackend::new(resolve_shell(config.shell.as_deref()));
        info!("Shell panes use {}", shells.program);

        Self {
            session: SessionManager::new(),
            config,
            documents: DocumentBackend,
            directories,
            shells,
            prompt: None,
            status: None,
            pending_close: None,
            running: true,
        }
    }

    pub fn session(&self) -> &SessionManager<Content> {
        &self.session
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn prompt(&self) -> Option<&Prompt> {
        self.prompt.as_ref()
    }

    pub fn status(&self) -> Option<&str> {
        self.status.as_deref()
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Open the panes requested on the command line, or the configured
    /// startup panes when no paths were given
    pub fn open_startup(&mut self, paths: &[PathBuf]) {
        if paths.is_empty() {
            for kind in self.config.startup.clone() {
                match kind {
                    PaneKind::Document => {
                        self.new_document();
                    }
                    PaneKind::Shell => {
                        self.new_shell();
                    }
                    PaneKind::Directory => {
                        self.open_directory(&start_dir());
                    }
                }
            }
            return;
        }

        for path in paths {
            let path = resolve_path(&path.to_string_lossy());
            if path.is_dir() {
                self.open_directory(&path);
            } else if path.exists() {
                self.open_file(&path);
            } else {
                self.open_new_file(path);
            }
        }
    }

    /// Empty untitled document
    pub fn new_document(&mut self) -> PaneId {
        self.session.open(
            PaneKind::Document,
            None,
            Content::Document(TextDocument::new()),
        )
    }

    /// Empty document that will be saved to `path`
    pub fn open_new_file(&mut self, path: PathBuf) -> PaneId {
        info!("New file {}", path.display());
        self.session.open(
            PaneKind::Document,
            Some(path),
            Content::Document(TextDocument::new()),
        )
    }

    /// Open a file in a new document pane
    pub fn open_file(&mut self, path: &Path) -> PaneId {
        let handle = self.new_document();
        self.load_into(handle, path);
        handle
    }

    /// Fresh shell pane; a shell that fails to start leaves the pane open
    pub fn new_shell(&mut self) -> PaneId {
        let handle =
            self.session
                .open(PaneKind::Shell, None, Content::Shell(self.shells.session()));
        let (cols, rows) = self.shells.size();
        let started = match self.session.content_mut(handle).and_then(Content::as_shell_mut) {
            Some(shell) => shell.start(cols, rows),
            None => return handle,
        };
        if let Err(e) = started {
            warn!("Failed to start shell: {}", e);
            self.status = Some(e.to_string());
        }
        handle
    }

    /// Shell pane that runs a script file
    pub fn open_script(&mut self, path: &Path) -> PaneId {
        let handle =
            self.session
                .open(PaneKind::Shell, None, Content::Shell(self.shells.session()));
        self.load_into(handle, path);
        handle
    }

    /// Terminal body size for shell panes, current and future
    pub fn set_shell_size(&mut self, cols: u16, rows: u16) {
        self.shells.set_size(cols, rows);
        let (cols, rows) = self.shells.size();
        for pane in self.session.iter() {
            if let Some(shell) = pane.content().as_shell() {
                shell.resize(cols, rows);
            }
        }
    }

    /// Directory view pane
    pub fn open_directory(&mut self, path: &Path) -> PaneId {
        let handle = self.session.open(
            PaneKind::Directory,
            None,
            Content::Directory(DirectoryListing::empty(path.to_path_buf())),
        );
        self.load_into(handle, path);
        handle
    }

    /// Point a directory pane at another directory
    pub fn navigate_directory(&mut self, handle: PaneId, path: &Path) -> bool {
        self.load_into(handle, path)
    }

    /// Go to the parent of a directory pane's current path
    pub fn directory_up(&mut self, handle: PaneId) -> bool {
        let current = match self.directory_path(handle) {
            Some(path) => path,
            None => return false,
        };
        let parent = parent_dir(&current);
        if parent == current {
            return false;
        }
        self.navigate_directory(handle, &parent)
    }

    /// Go to the home directory
    pub fn directory_home(&mut self, handle: PaneId) -> bool {
        match home_dir() {
            Some(home) => self.navigate_directory(handle, &home),
            None => false,
        }
    }

    /// Save a document to its backing path, or ask for one
    pub fn save(&mut self, handle: PaneId) -> bool {
        let (kind, path) = match self.session.get(handle) {
            Some(pane) => (pane.kind(), pane.backing_path().map(Path::to_path_buf)),
            None => return false,
        };
        if kind != PaneKind::Document {
            self.status = Some(ContentError::Unsupported(kind).to_string());
            return false;
        }

        match path {
            Some(path) => self.save_as(handle, &path),
            None => {
                self.start_prompt(PromptKind::SaveAs(handle), String::new());
                false
            }
        }
    }

    /// Save a document to `path` and make it the pane's backing path
    pub fn save_as(&mut self, handle: PaneId, path: &Path) -> bool {
        let result = match self.session.get(handle).map(|p| p.content()) {
            Some(Content::Document(doc)) => self.documents.save(doc, path),
            Some(other) => Err(ContentError::Unsupported(other.kind())),
            None => return false,
        };

        match result {
            Ok(()) => {
                let result = self.session.set_backing_path(handle, path.to_path_buf());
                self.commit(result);
                let result = self.session.set_dirty(handle, false);
                self.commit(result);
                info!("Saved pane {} to {}", handle, path.display());
                self.status = Some(format!("Saved {}", path.display()));
                true
            }
            Err(e) => {
                warn!("Failed to save {}: {}", path.display(), e);
                self.status = Some(format!("Failed to save {}: {}", path.display(), e));
                false
            }
        }
    }

    /// Close a pane; unsaved documents trigger a save prompt afterwards.
    /// Refused while an earlier closed pane is still waiting for its answer.
    pub fn close(&mut self, handle: PaneId) -> Result<(), SessionError> {
        if self.pending_close.is_some() {
            debug!("Close of pane {} refused: save prompt pending", handle);
            self.status = Some("Answer the pending save prompt first".to_string());
            return Ok(());
        }
        let closed = self.session.close(handle)?;
        info!("Closed pane {} ({})", handle, closed.info.title);

        if closed.info.dirty {
            let title = closed.info.title.clone();
            self.pending_close = Some(closed);
            self.prompt = Some(Prompt {
                kind: PromptKind::ConfirmSaveOnClose,
                message: format!("Save changes to {}? (y/n, Esc to cancel)", title),
                input: String::new(),
            });
        }
        Ok(())
    }

    /// Close the focused pane
    pub fn close_active(&mut self) {
        if let Some(handle) = self.session.current() {
            let result = self.close(handle);
            self.commit(result);
        }
    }

    /// Run a user command
    pub fn execute(&mut self, command: Command) {
        debug!("Command {:?}", command);
        let current = self.session.current();

        match command {
            Command::NewDocument => {
                self.new_document();
            }
            Command::NewShell => {
                self.new_shell();
            }
            Command::NewDirectory => {
                self.open_directory(&start_dir());
            }
            Command::OpenFile => self.start_prompt(PromptKind::OpenFile, String::new()),
            Command::OpenDirectory => {
                self.start_prompt(PromptKind::OpenDirectory, String::new())
            }
            Command::OpenScript => self.start_prompt(PromptKind::OpenScript, String::new()),
            Command::Save => {
                if let Some(handle) = current {
                    self.save(handle);
                }
            }
            Command::SaveAs => {
                if let Some(pane) = self.session.current_pane() {
                    let handle = pane.id();
                    let initial = pane
                        .backing_path()
                        .map(|p| p.display().to_string())
                        .unwrap_or_default();
                    self.start_prompt(PromptKind::SaveAs(handle), initial);
                }
            }
            Command::Rename => {
                if let Some(pane) = self.session.current_pane() {
                    let handle = pane.id();
                    let initial = pane.title().to_string();
                    self.start_prompt(PromptKind::Rename(handle), initial);
                }
            }
            Command::Close => self.close_active(),
            Command::NextPane => {
                self.session.next();
            }
            Command::PrevPane => {
                self.session.prev();
            }
            Command::LastPane => {
                self.session.last();
            }
            Command::GotoPane(number) => {
                if let Err(e) = self.session.goto(number) {
                    debug!("Ignoring goto {}: {}", number, e);
                }
            }
            Command::MoveLeft => self.move_active(-1),
            Command::MoveRight => self.move_active(1),
            Command::Quit => {
                if self.session.has_dirty() {
                    self.prompt = Some(Prompt {
                        kind: PromptKind::ConfirmQuit,
                        message: "Unsaved changes. Quit anyway? (y/n)".to_string(),
                        input: String::new(),
                    });
                } else {
                    self.running = false;
                }
            }
        }
    }

    /// Forward a key to the prompt if one is open, otherwise to the active pane
    pub fn handle_input(&mut self, input: PaneInput) {
        if self.prompt.is_some() {
            self.prompt_input(input);
            return;
        }

        let handle = match self.session.current() {
            Some(handle) => handle,
            None => return,
        };

        match self.session.get(handle).map(|p| p.kind()) {
            Some(PaneKind::Document) => self.document_input(handle, input),
            Some(PaneKind::Directory) => self.directory_input(handle, input),
            Some(PaneKind::Shell) => self.shell_input(handle, input),
            None => {}
        }
    }

    /// Submit the prompt's typed text
    pub fn submit_prompt(&mut self) {
        let prompt = match self.prompt.take() {
            Some(prompt) => prompt,
            None => return,
        };

        if prompt.kind.is_confirmation() {
            let input = prompt.input.trim().to_ascii_lowercase();
            self.prompt = Some(prompt);
            match input.as_str() {
                "y" => self.answer(true),
                "n" => self.answer(false),
                // Anything else leaves the question open
                _ => {}
            }
            return;
        }

        let input = prompt.input.trim().to_string();
        if input.is_empty() {
            self.prompt = Some(prompt);
            self.cancel_prompt();
            return;
        }

        match prompt.kind {
            PromptKind::OpenFile => {
                self.open_file(&resolve_path(&input));
            }
            PromptKind::OpenDirectory => {
                self.open_directory(&resolve_path(&input));
            }
            PromptKind::OpenScript => {
                self.open_script(&resolve_path(&input));
            }
            PromptKind::SaveAs(handle) => {
                self.save_as(handle, &resolve_path(&input));
            }
            PromptKind::SaveClosed => {
                if let Some(closed) = self.pending_close.take() {
                    self.save_closed(closed, &resolve_path(&input));
                }
            }
            PromptKind::Rename(handle) => {
                let result = self.session.rename(handle, input);
                self.commit(result);
            }
            PromptKind::ConfirmSaveOnClose | PromptKind::ConfirmQuit => {}
        }
    }

    /// Answer the open y/n prompt
    pub fn answer(&mut self, yes: bool) {
        let kind = match self.prompt.take() {
            Some(prompt) => prompt.kind,
            None => return,
        };

        match kind {
            PromptKind::ConfirmSaveOnClose => {
                let closed = match self.pending_close.take() {
                    Some(closed) => closed,
                    None => return,
                };
                if !yes {
                    info!("Discarded unsaved changes in {}", closed.info.title);
                    return;
                }
                match closed.info.backing_path.clone() {
                    Some(path) => {
                        self.save_closed(closed, &path);
                    }
                    None => {
                        self.pending_close = Some(closed);
                        self.start_prompt(PromptKind::SaveClosed, String::new());
                    }
                }
            }
            PromptKind::ConfirmQuit => {
                if yes {
                    self.running = false;
                }
            }
            _ => {}
        }
    }

    /// Dismiss the prompt; a pending closed pane is put back into the session
    pub fn cancel_prompt(&mut self) {
        let prompt = match self.prompt.take() {
            Some(prompt) => prompt,
            None => return,
        };

        if matches!(
            prompt.kind,
            PromptKind::ConfirmSaveOnClose | PromptKind::SaveClosed
        ) {
            if let Some(closed) = self.pending_close.take() {
                self.restore_closed(closed);
            }
        }
    }

    /// Drain session notifications and shell output; returns whether anything changed
    pub fn pump_events(&mut self) -> bool {
        let output = self.poll_shells();
        let events = self.session.drain_events();
        for event in &events {
            match event.handle() {
                Some(handle) => debug!("Session event for pane {}: {:?}", handle, event),
                None => debug!("Session event: {:?}", event),
            }
            match event {
                SessionEvent::Empty => {
                    self.status = Some(NO_FILE.to_string());
                }
                SessionEvent::Opened { .. } => {
                    if self.status.as_deref() == Some(NO_FILE) {
                        self.status = None;
                    }
                }
                _ => {}
            }
        }
        output || !events.is_empty()
    }

    /// Feed pending PTY output into every shell pane's transcript
    fn poll_shells(&mut self) -> bool {
        let shells: Vec<PaneId> = self
            .session
            .iter()
            .filter(|pane| pane.kind() == PaneKind::Shell)
            .map(|pane| pane.id())
            .collect();

        let mut changed = false;
        for handle in shells {
            if let Some(shell) = self.session.content_mut(handle).and_then(Content::as_shell_mut) {
                changed |= shell.process_output();
            }
        }
        changed
    }

    /// Clear the status message
    pub fn clear_status(&mut self) {
        self.status = None;
    }

    fn start_prompt(&mut self, kind: PromptKind, initial: String) {
        let message = match kind {
            PromptKind::OpenFile => "Open file:",
            PromptKind::OpenDirectory => "Open directory:",
            PromptKind::OpenScript => "Open script:",
            PromptKind::SaveAs(_) | PromptKind::SaveClosed => "Save as:",
            PromptKind::Rename(_) => "Rename tab:",
            PromptKind::ConfirmSaveOnClose => "Save changes? (y/n)",
            PromptKind::ConfirmQuit => "Quit? (y/n)",
        };
        self.prompt = Some(Prompt {
            kind,
            message: message.to_string(),
            input: initial,
        });
    }

    fn prompt_input(&mut self, input: PaneInput) {
        let confirmation = match self.prompt.as_ref() {
            Some(prompt) => prompt.kind.is_confirmation(),
            None => return,
        };

        if confirmation {
            match input {
                PaneInput::Char('y') | PaneInput::Char('Y') => self.answer(true),
                PaneInput::Char('n') | PaneInput::Char('N') => self.answer(false),
                _ => {}
            }
            return;
        }

        match input {
            PaneInput::Enter => self.submit_prompt(),
            PaneInput::Char(ch) => {
                if let Some(prompt) = self.prompt.as_mut() {
                    prompt.input.push(ch);
                }
            }
            PaneInput::Backspace => {
                if let Some(prompt) = self.prompt.as_mut() {
                    prompt.input.pop();
                }
            }
            _ => {}
        }
    }

    fn document_input(&mut self, handle: PaneId, input: PaneInput) {
        let doc = match self.session.content_mut(handle).and_then(Content::as_document_mut) {
            Some(doc) => doc,
            None => return,
        };

        let edited = match input {
            PaneInput::Char(ch) => {
                doc.insert_char(ch);
                true
            }
            PaneInput::Enter => {
                doc.insert_newline();
                true
            }
            PaneInput::Backspace => doc.backspace(),
            PaneInput::Up => {
                doc.move_up();
                false
            }
            PaneInput::Down => {
                doc.move_down();
                false
            }
            PaneInput::Left => {
                doc.move_left();
                false
            }
            PaneInput::Right => {
                doc.move_right();
                false
            }
            PaneInput::Home => {
                doc.move_line_start();
                false
            }
            PaneInput::End => {
                doc.move_line_end();
                false
            }
            PaneInput::Ctrl(_) => false,
        };

        if edited {
            let result = self.session.set_dirty(handle, true);
            self.commit(result);
        }
    }

    fn directory_input(&mut self, handle: PaneId, input: PaneInput) {
        let listing = match self.session.content_mut(handle).and_then(Content::as_directory_mut) {
            Some(listing) => listing,
            None => return,
        };

        match input {
            PaneInput::Up => listing.select_prev(),
            PaneInput::Down => listing.select_next(),
            PaneInput::Home => listing.select_first(),
            PaneInput::End => listing.select_last(),
            PaneInput::Enter => match listing.activate_selected() {
                Some(EntryAction::Enter(path)) => {
                    self.navigate_directory(handle, &path);
                }
                Some(EntryAction::Open(path)) => {
                    self.open_file(&path);
                }
                None => {}
            },
            PaneInput::Backspace | PaneInput::Left => {
                self.directory_up(handle);
            }
            PaneInput::Char('~') => {
                self.directory_home(handle);
            }
            _ => {}
        }
    }

    fn shell_input(&mut self, handle: PaneId, input: PaneInput) {
        let shell = match self.session.content_mut(handle).and_then(Content::as_shell_mut) {
            Some(shell) => shell,
            None => return,
        };

        if let Err(e) = shell.write(&shell_bytes(input)) {
            warn!("Shell input failed: {}", e);
            self.status = Some(e.to_string());
        }
    }

    /// Load `path` into an existing pane with that pane's backend
    fn load_into(&mut self, handle: PaneId, path: &Path) -> bool {
        let kind = match self.session.get(handle) {
            Some(pane) => pane.kind(),
            None => return false,
        };

        let loaded = match kind {
            PaneKind::Document => self.documents.load(path).map(Content::Document),
            PaneKind::Directory => self.directories.load(path).map(Content::Directory),
            PaneKind::Shell => self.shells.load(path).map(Content::Shell),
        };

        match loaded {
            Ok(content) => {
                if let Some(slot) = self.session.content_mut(handle) {
                    *slot = content;
                }
                let result = self.session.set_backing_path(handle, path.to_path_buf());
                self.commit(result);
                let result = self.session.set_dirty(handle, false);
                self.commit(result);
                info!("Loaded {} into pane {}", path.display(), handle);
                true
            }
            Err(e) => {
                warn!("Failed to open {}: {}", path.display(), e);
                self.status = Some(format!("Failed to open {}: {}", path.display(), e));
                false
            }
        }
    }

    fn save_closed(&mut self, closed: ClosedPane<Content>, path: &Path) -> bool {
        let result = match &closed.content {
            Content::Document(doc) => self.documents.save(doc, path),
            other => Err(ContentError::Unsupported(other.kind())),
        };

        match result {
            Ok(()) => {
                info!("Saved closed pane {} to {}", closed.info.handle, path.display());
                self.status = Some(format!("Saved {}", path.display()));
                true
            }
            Err(e) => {
                warn!("Failed to save {}: {}", path.display(), e);
                self.status = Some(format!("Failed to save {}: {}", path.display(), e));
                // Keep the changes reachable
                self.restore_closed(closed);
                false
            }
        }
    }

    /// Reopen a closed pane with its content; it gets a new handle
    fn restore_closed(&mut self, closed: ClosedPane<Content>) -> PaneId {
        let ClosedPane { info, content } = closed;
        let handle = self
            .session
            .open(info.kind, info.backing_path.clone(), content);
        if info.title != derive_title(info.kind, info.backing_path.as_deref()) {
            let result = self.session.rename(handle, info.title);
            self.commit(result);
        }
        let result = self.session.set_dirty(handle, info.dirty);
        self.commit(result);
        debug!("Restored closed pane {} as {}", info.handle, handle);
        handle
    }

    fn move_active(&mut self, delta: isize) {
        let (handle, index) = match (self.session.current(), self.session.active_index()) {
            (Some(handle), Some(index)) => (handle, index),
            _ => return,
        };
        let target = index as isize + delta;
        if target < 0 || target as usize >= self.session.len() {
            return;
        }
        let result = self.session.reorder(handle, target as usize);
        self.commit(result);
    }

    fn directory_path(&self, handle: PaneId) -> Option<PathBuf> {
        self.session
            .get(handle)
            .and_then(|pane| pane.content().as_directory())
            .map(|listing| listing.path().to_path_buf())
    }

    /// Session errors here mean a stale handle; report and carry on
    fn commit<T>(&mut self, result: Result<T, SessionError>) {
        if let Err(e) = result {
            warn!("Session operation failed: {}", e);
            self.status = Some(e.to_string());
        }
    }
}

/// Bytes a terminal sends for a key
fn shell_bytes(input: PaneInput) -> Vec<u8> {
    match input {
        PaneInput::Char(ch) => {
            let mut buf = [0u8; 4];
            ch.encode_utf8(&mut buf).as_bytes().to_vec()
        }
        PaneInput::Ctrl(ch) => vec![(ch.to_ascii_lowercase() as u8) & 0x1f],
        PaneInput::Enter => b"\r".to_vec(),
        PaneInput::Backspace => vec![0x7f],
        PaneInput::Up => b"\x1b[A".to_vec(),
        PaneInput::Down => b"\x1b[B".to_vec(),
        PaneInput::Right => b"\x1b[C".to_vec(),
        PaneInput::Left => b"\x1b[D".to_vec(),
        PaneInput::Home => b"\x1b[H".to_vec(),
        PaneInput::End => b"\x1b[F".to_vec(),
    }
}

fn start_dir() -> PathBuf {
    home_dir()
        .or_else(|| std::env::current_dir().ok())
        .unwrap_or_else(|| PathBuf::from("/"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::thread;
    use std::time::{Duration, Instant};

    fn workbench() -> Workbench {
        let config = Config {
            shell: Some("sh".to_string()),
            ..Config::default()
        };
        Workbench::new(config)
    }

    fn type_text(wb: &mut Workbench, text: &str) {
        for ch in text.chars() {
            wb.handle_input(PaneInput::Char(ch));
        }
    }

    fn title(wb: &Workbench, handle: PaneId) -> String {
        wb.session().get(handle).unwrap().title().to_string()
    }

    fn text(wb: &Workbench, handle: PaneId) -> String {
        wb.session()
            .get(handle)
            .unwrap()
            .content()
            .as_document()
            .unwrap()
            .text()
    }

    #[test]
    fn test_failed_open_leaves_valid_empty_pane() {
        let dir = tempfile::tempdir().unwrap();
        let mut wb = workbench();

        let h = wb.open_file(&dir.path().join("missing.txt"));
        assert_eq!(wb.session().current(), Some(h));
        assert_eq!(title(&wb, h), "Untitled");
        assert_eq!(wb.session().get(h).unwrap().backing_path(), None);
        assert!(wb.status().unwrap().starts_with("Failed to open"));
        assert!(wb.session().invariants_hold());
    }

    #[test]
    fn test_open_edit_save() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notes.txt");
        fs::write(&path, "hello").unwrap();

        let mut wb = workbench();
        let h = wb.open_file(&path);
        assert_eq!(title(&wb, h), "notes.txt");
        assert!(!wb.session().get(h).unwrap().is_dirty());
        wb.pump_events();

        wb.handle_input(PaneInput::End);
        type_text(&mut wb, " world");
        assert!(wb.session().get(h).unwrap().is_dirty());

        // Only the first edit relabels the tab
        let relabels = wb
            .session()
            .pending_events()
            .iter()
            .filter(|e| matches!(e, SessionEvent::Relabel { .. }))
            .count();
        assert_eq!(relabels, 1);

        wb.execute(Command::Save);
        assert_eq!(fs::read_to_string(&path).unwrap(), "hello world");
        assert!(!wb.session().get(h).unwrap().is_dirty());
    }

    #[test]
    fn test_save_untitled_prompts_for_path() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("draft.md");

        let mut wb = workbench();
        let h = wb.new_document();
        type_text(&mut wb, "# draft");

        wb.execute(Command::Save);
        assert_eq!(wb.prompt().unwrap().kind, PromptKind::SaveAs(h));

        type_text(&mut wb, &target.display().to_string());
        wb.handle_input(PaneInput::Enter);

        assert!(wb.prompt().is_none());
        assert_eq!(fs::read_to_string(&target).unwrap(), "# draft");
        assert_eq!(title(&wb, h), "draft.md");
        assert!(!wb.session().get(h).unwrap().is_dirty());
    }

    #[test]
    fn test_close_dirty_saves_to_backing_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.txt");
        fs::write(&path, "").unwrap();

        let mut wb = workbench();
        let h = wb.open_file(&path);
        type_text(&mut wb, "changed");

        wb.execute(Command::Close);
        assert!(wb.session().is_empty());
        assert_eq!(wb.prompt().unwrap().kind, PromptKind::ConfirmSaveOnClose);

        wb.handle_input(PaneInput::Char('y'));
        assert!(wb.prompt().is_none());
        assert_eq!(fs::read_to_string(&path).unwrap(), "changed");
        assert!(wb.status().unwrap().starts_with("Saved"));

        wb.pump_events();
        assert!(!wb.session().contains(h));
        assert_eq!(wb.status(), Some(NO_FILE));
    }

    #[test]
    fn test_close_dirty_untitled_asks_for_path() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("kept.txt");

        let mut wb = workbench();
        wb.new_document();
        type_text(&mut wb, "keep me");
        wb.close_active();

        wb.answer(true);
        assert_eq!(wb.prompt().unwrap().kind, PromptKind::SaveClosed);
        type_text(&mut wb, &target.display().to_string());
        wb.submit_prompt();

        assert_eq!(fs::read_to_string(&target).unwrap(), "keep me");
        assert!(wb.session().is_empty());
    }

    #[test]
    fn test_close_dirty_discard() {
        let mut wb = workbench();
        wb.new_document();
        type_text(&mut wb, "scratch");
        wb.close_active();

        wb.handle_input(PaneInput::Char('n'));
        assert!(wb.prompt().is_none());
        assert!(wb.session().is_empty());
        wb.pump_events();
        assert_eq!(wb.status(), Some(NO_FILE));
    }

    #[test]
    fn test_cancel_close_restores_pane() {
        let mut wb = workbench();
        let h = wb.new_document();
        type_text(&mut wb, "unsaved");
        wb.execute(Command::Rename);
        for _ in 0.."Untitled".len() {
            wb.handle_input(PaneInput::Backspace);
        }
        type_text(&mut wb, "ideas");
        wb.handle_input(PaneInput::Enter);
        assert_eq!(title(&wb, h), "ideas");

        wb.close_active();
        wb.cancel_prompt();

        let restored = wb.session().current().unwrap();
        assert_ne!(restored, h);
        assert_eq!(title(&wb, restored), "ideas");
        assert!(wb.session().get(restored).unwrap().is_dirty());
        assert_eq!(text(&wb, restored), "unsaved");
    }

    #[test]
    fn test_clean_close_needs_no_prompt() {
        let mut wb = workbench();
        wb.new_document();
        let b = wb.new_document();
        wb.execute(Command::PrevPane);
        wb.execute(Command::Close);

        assert!(wb.prompt().is_none());
        assert_eq!(wb.session().current(), Some(b));
    }

    #[test]
    fn test_directory_navigation() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("sub")).unwrap();
        fs::write(dir.path().join("sub").join("file.txt"), "inside").unwrap();

        let mut wb = workbench();
        let h = wb.open_directory(dir.path());
        let dir_name = dir.path().file_name().unwrap().to_string_lossy().into_owned();
        assert_eq!(title(&wb, h), dir_name);

        // Row 0 is "..", row 1 is "sub"
        wb.handle_input(PaneInput::Down);
        wb.handle_input(PaneInput::Enter);
        assert_eq!(title(&wb, h), "sub");

        // "..", then file.txt opens as a document
        wb.handle_input(PaneInput::Down);
        wb.handle_input(PaneInput::Enter);
        let doc = wb.session().current().unwrap();
        assert_ne!(doc, h);
        assert_eq!(title(&wb, doc), "file.txt");
        assert_eq!(text(&wb, doc), "inside");

        wb.session.activate(h).unwrap();
        wb.handle_input(PaneInput::Backspace);
        assert_eq!(title(&wb, h), dir_name);
    }

    #[test]
    fn test_failed_navigation_keeps_listing() {
        let dir = tempfile::tempdir().unwrap();
        let mut wb = workbench();
        let h = wb.open_directory(dir.path());

        assert!(!wb.navigate_directory(h, &dir.path().join("gone")));
        let pane = wb.session().get(h).unwrap();
        assert_eq!(pane.backing_path(), Some(dir.path()));
        assert!(wb.status().unwrap().starts_with("Failed to open"));
    }

    #[test]
    fn test_directories_are_not_saved() {
        let dir = tempfile::tempdir().unwrap();
        let mut wb = workbench();
        let h = wb.open_directory(dir.path());
        assert!(!wb.save(h));
        assert!(wb.prompt().is_none());
        assert_eq!(wb.status(), Some("directory panes cannot be saved"));
    }

    #[test]
    fn test_move_tabs_keeps_focus() {
        let mut wb = workbench();
        let a = wb.new_document();
        let b = wb.new_shell();
        let c = wb.new_document();

        wb.execute(Command::MoveLeft);
        wb.execute(Command::MoveLeft);
        wb.execute(Command::MoveLeft);
        let order: Vec<PaneId> = wb.session().iter().map(|p| p.id()).collect();
        assert_eq!(order, vec![c, a, b]);
        assert_eq!(wb.session().current(), Some(c));

        wb.execute(Command::MoveRight);
        let order: Vec<PaneId> = wb.session().iter().map(|p| p.id()).collect();
        assert_eq!(order, vec![a, c, b]);

        wb.execute(Command::GotoPane(3));
        assert_eq!(wb.session().current(), Some(b));
        wb.execute(Command::GotoPane(9));
        assert_eq!(wb.session().current(), Some(b));
        wb.execute(Command::LastPane);
        assert_eq!(wb.session().current(), Some(c));
    }

    #[test]
    fn test_quit_confirms_unsaved_changes() {
        let mut wb = workbench();
        wb.new_document();
        wb.execute(Command::Quit);
        assert!(!wb.is_running());

        let mut wb = workbench();
        wb.new_document();
        type_text(&mut wb, "x");
        wb.execute(Command::Quit);
        assert!(wb.is_running());
        assert_eq!(wb.prompt().unwrap().kind, PromptKind::ConfirmQuit);

        wb.handle_input(PaneInput::Char('n'));
        assert!(wb.is_running());

        wb.execute(Command::Quit);
        wb.handle_input(PaneInput::Char('y'));
        assert!(!wb.is_running());
    }

    #[test]
    fn test_startup_panes() {
        let dir = tempfile::tempdir().unwrap();
        let existing = dir.path().join("exists.txt");
        fs::write(&existing, "data").unwrap();
        let fresh = dir.path().join("fresh.txt");

        let mut wb = workbench();
        wb.open_startup(&[existing.clone(), fresh.clone(), dir.path().to_path_buf()]);

        let kinds: Vec<PaneKind> = wb.session().iter().map(|p| p.kind()).collect();
        assert_eq!(
            kinds,
            vec![PaneKind::Document, PaneKind::Document, PaneKind::Directory]
        );
        let titles: Vec<&str> = wb.session().iter().map(|p| p.title()).collect();
        assert_eq!(titles[0], "exists.txt");
        assert_eq!(titles[1], "fresh.txt");

        let mut wb = workbench();
        wb.open_startup(&[]);
        assert_eq!(wb.session().len(), 1);
        assert_eq!(
            wb.session().current_pane().unwrap().kind(),
            PaneKind::Document
        );
    }

    #[test]
    fn test_confirmation_needs_an_answer() {
        let mut wb = workbench();
        wb.new_document();
        type_text(&mut wb, "draft");
        wb.close_active();

        // Submitting without y/n keeps the question and the closed pane
        wb.submit_prompt();
        assert_eq!(wb.prompt().unwrap().kind, PromptKind::ConfirmSaveOnClose);
        assert!(wb.pending_close.is_some());

        wb.cancel_prompt();
        let restored = wb.session().current().unwrap();
        assert_eq!(text(&wb, restored), "draft");
    }

    #[test]
    fn test_second_dirty_close_waits_for_prompt() {
        let mut wb = workbench();
        let a = wb.new_document();
        type_text(&mut wb, "first");
        let b = wb.new_document();
        type_text(&mut wb, "second");

        wb.session.activate(a).unwrap();
        wb.close_active();
        assert_eq!(wb.prompt().unwrap().kind, PromptKind::ConfirmSaveOnClose);

        // Closing b now would replace a's pending content
        wb.close(b).unwrap();
        assert!(wb.session().contains(b));
        assert_eq!(wb.status(), Some("Answer the pending save prompt first"));

        wb.cancel_prompt();
        let restored = wb.session().current().unwrap();
        assert_eq!(text(&wb, restored), "first");
        assert_eq!(text(&wb, b), "second");
    }

    #[test]
    fn test_non_utf8_file_survives_edit() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("latin1.txt");
        fs::write(&path, b"ok\xff\xfeend").unwrap();

        let mut wb = workbench();
        wb.open_file(&path);
        wb.handle_input(PaneInput::End);
        type_text(&mut wb, "!");
        wb.execute(Command::Save);

        assert_eq!(fs::read(&path).unwrap(), b"ok\xff\xfeend!");
    }

    #[test]
    fn test_shell_keys() {
        assert_eq!(shell_bytes(PaneInput::Char('é')), "é".as_bytes());
        assert_eq!(shell_bytes(PaneInput::Ctrl('c')), [0x03]);
        assert_eq!(shell_bytes(PaneInput::Enter), b"\r");
        assert_eq!(shell_bytes(PaneInput::Backspace), [0x7f]);
        assert_eq!(shell_bytes(PaneInput::Up), b"\x1b[A");
    }

    /// Pump until a line of the shell pane's transcript contains `needle`
    #[cfg(unix)]
    fn wait_for_output(wb: &mut Workbench, handle: PaneId, needle: &str) -> bool {
        let deadline = Instant::now() + Duration::from_secs(5);
        while Instant::now() < deadline {
            wb.pump_events();
            let shell = wb.session().get(handle).unwrap().content().as_shell().unwrap();
            if shell.transcript().iter().any(|line| line.contains(needle)) {
                return true;
            }
            thread::sleep(Duration::from_millis(20));
        }
        false
    }

    #[cfg(unix)]
    #[test]
    fn test_script_pane_is_titled_by_script() {
        let dir = tempfile::tempdir().unwrap();
        let script = dir.path().join("build.sh");
        fs::write(&script, "echo built=$((40+2))\n").unwrap();

        let mut wb = workbench();
        let h = wb.open_script(&script);
        assert_eq!(title(&wb, h), "build.sh");
        assert!(wait_for_output(&mut wb, h, "built=42"));
        assert!(!wb.session().get(h).unwrap().is_dirty());
    }

    #[cfg(unix)]
    #[test]
    fn test_shell_keeps_state_between_lines() {
        let dir = tempfile::tempdir().unwrap();
        let mut wb = workbench();
        let h = wb.new_shell();
        assert_eq!(title(&wb, h), "Terminal");

        type_text(&mut wb, &format!("cd '{}'", dir.path().display()));
        wb.handle_input(PaneInput::Enter);
        type_text(&mut wb, "echo \"cwd:$(pwd)\"");
        wb.handle_input(PaneInput::Enter);

        let expected = format!("cwd:{}", dir.path().display());
        assert!(wait_for_output(&mut wb, h, &expected));
        assert!(!wb.session().get(h).unwrap().is_dirty());
    }

    #[cfg(unix)]
    #[test]
    fn test_slow_command_does_not_block_input() {
        let mut wb = workbench();
        let h = wb.new_shell();

        type_text(&mut wb, "sleep 2");
        let started = Instant::now();
        wb.handle_input(PaneInput::Enter);
        assert!(started.elapsed() < Duration::from_secs(1));

        // The shell is busy, the rest of the workbench is not
        wb.new_document();
        type_text(&mut wb, "still typing");
        assert!(started.elapsed() < Duration::from_secs(1));
        assert!(wb.session().get(h).unwrap().content().as_shell().unwrap().is_alive());
    }
}
