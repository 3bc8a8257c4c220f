//! Content backends for the three pane kinds.
//!
//! The session treats pane content as opaque; these backends are the
//! collaborators that load and save it:
//!
//! - **document**: text buffer with cursor, loaded/saved as a whole file
//! - **directory**: one-pass directory listing with size labels
//! - **shell**: interactive shell on a PTY, output kept as a transcript
//!
//! Failures here are reported as `ContentError` and never touch the
//! session's own bookkeeping.

pub mod directory;
pub mod document;
mod pty;
pub mod shell;

use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::session::PaneKind;

pub use directory::{format_file_size, parent_dir, DirEntry, DirectoryBackend, DirectoryListing, EntryAction};
pub use document::{raw_byte, DocumentBackend, TextDocument};
pub use shell::{resolve_shell, ShellBackend, ShellSession};

#[derive(Error, Debug)]
pub enum ContentError {
    #[error("{}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Not a directory: {}", .0.display())]
    NotADirectory(PathBuf),

    #[error("Failed to run {program}: {message}")]
    Spawn { program: String, message: String },

    #[error("Shell input failed: {0}")]
    Input(#[source] io::Error),

    #[error("{0} is not running")]
    NotRunning(String),

    #[error("{0} panes cannot be saved")]
    Unsupported(PaneKind),
}

impl ContentError {
    pub(crate) fn io(path: &Path, source: io::Error) -> Self {
        ContentError::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, ContentError>;

/// Loads and saves one kind of pane content
pub trait ContentBackend {
    type Content;

    /// Pane kind this backend serves
    fn kind(&self) -> PaneKind;

    /// Read content from `path`
    fn load(&self, path: &Path) -> Result<Self::Content>;

    /// Write content to `path`
    fn save(&self, content: &Self::Content, path: &Path) -> Result<()>;
}

/// Content of any pane kind
#[derive(Debug)]
pub enum Content {
    Document(TextDocument),
    Directory(DirectoryListing),
    Shell(ShellSession),
}

impl Content {
    pub fn kind(&self) -> PaneKind {
        match self {
            Content::Document(_) => PaneKind::Document,
            Content::Directory(_) => PaneKind::Directory,
            Content::Shell(_) => PaneKind::Shell,
        }
    }

    pub fn as_document(&self) -> Option<&TextDocument> {
        match self {
            Content::Document(doc) => Some(doc),
            _ => None,
        }
    }

    pub fn as_document_mut(&mut self) -> Option<&mut TextDocument> {
        match self {
            Content::Document(doc) => Some(doc),
            _ => None,
        }
    }

    pub fn as_directory(&self) -> Option<&DirectoryListing> {
        match self {
            Content::Directory(listing) => Some(listing),
            _ => None,
        }
    }

    pub fn as_directory_mut(&mut self) -> Option<&mut DirectoryListing> {
        match self {
            Content::Directory(listing) => Some(listing),
            _ => None,
        }
    }

    pub fn as_shell(&self) -> Option<&ShellSession> {
        match self {
            Content::Shell(shell) => Some(shell),
            _ => None,
        }
    }

    pub fn as_shell_mut(&mut self) -> Option<&mut ShellSession> {
        match self {
            Content::Shell(shell) => Some(shell),
            _ => None,
        }
    }
}

/// Get home directory
pub fn home_dir() -> Option<PathBuf> {
    std::env::var_os("USERPROFILE")
        .or_else(|| std::env::var_os("HOME"))
        .filter(|home| !home.is_empty())
        .map(PathBuf::from)
}

/// Expand a leading `~` or `~/` to the home directory
pub fn expand_path(input: &str) -> PathBuf {
    let input = input.trim();
    if input == "~" {
        if let Some(home) = home_dir() {
            return home;
        }
    } else if let Some(rest) = input.strip_prefix("~/") {
        if let Some(home) = home_dir() {
            return home.join(rest);
        }
    }
    PathBuf::from(input)
}

/// Make a path absolute against the current directory (no filesystem access)
pub fn absolutize(path: &Path) -> PathBuf {
    if path.is_absolute() {
        return path.to_path_buf();
    }
    match std::env::current_dir() {
        Ok(cwd) => cwd.join(path),
        Err(_) => path.to_path_buf(),
    }
}

/// `expand_path` followed by `absolutize`
pub fn resolve_path(input: &str) -> PathBuf {
    absolutize(&expand_path(input))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expand_plain_path_unchanged() {
        assert_eq!(expand_path("/etc/hosts"), PathBuf::from("/etc/hosts"));
        assert_eq!(expand_path("  notes.txt "), PathBuf::from("notes.txt"));
    }

    #[test]
    fn test_expand_home() {
        if let Some(home) = home_dir() {
            assert_eq!(expand_path("~"), home);
            assert_eq!(expand_path("~/docs/a.txt"), home.join("docs/a.txt"));
        }
    }

    #[test]
    fn test_absolutize() {
        let abs = absolutize(Path::new("relative/file.txt"));
        assert!(abs.is_absolute());
        assert!(abs.ends_with("relative/file.txt"));

        let already = PathBuf::from("/var/log");
        assert_eq!(absolutize(&already), already);
    }

    #[test]
    fn test_content_kind() {
        assert_eq!(Content::Document(TextDocument::new()).kind(), PaneKind::Document);
        assert_eq!(Content::Shell(ShellSession::new("sh")).kind(), PaneKind::Shell);

        let mut content = Content::Document(TextDocument::new());
        assert!(content.as_document_mut().is_some());
        assert!(content.as_directory().is_none());
        assert!(content.as_shell().is_none());
    }

    #[test]
    fn test_error_messages() {
        let err = ContentError::Unsupported(PaneKind::Directory);
        assert_eq!(err.to_string(), "directory panes cannot be saved");

        let err = ContentError::NotADirectory(PathBuf::from("/etc/hosts"));
        assert_eq!(err.to_string(), "Not a directory: /etc/hosts");

        let err = ContentError::NotRunning("zsh".to_string());
        assert_eq!(err.to_string(), "zsh is not running");
    }
}
