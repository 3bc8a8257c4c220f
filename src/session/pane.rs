//! Pane - A single content surface tracked by the session

use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Title used for documents and directory views without a path
pub const UNTITLED: &str = "Untitled";

/// Title used for shell panes without a path
pub const TERMINAL: &str = "Terminal";

/// Unique identifier for a pane
///
/// Minted by the session from a monotonically increasing counter and never
/// reused, even after the pane is closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PaneId(u64);

impl PaneId {
    pub(crate) fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// Raw numeric value
    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for PaneId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// What a pane shows
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaneKind {
    /// Interactive shell session
    Shell,
    /// Directory listing
    Directory,
    /// Editable text document
    Document,
}

impl PaneKind {
    /// Title shown when the pane has no backing path
    pub fn default_title(self) -> &'static str {
        match self {
            PaneKind::Shell => TERMINAL,
            PaneKind::Directory | PaneKind::Document => UNTITLED,
        }
    }

    /// Only documents carry unsaved state
    pub fn can_be_dirty(self) -> bool {
        matches!(self, PaneKind::Document)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            PaneKind::Shell => "shell",
            PaneKind::Directory => "directory",
            PaneKind::Document => "document",
        }
    }
}

impl fmt::Display for PaneKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for PaneKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "shell" | "terminal" => Ok(PaneKind::Shell),
            "directory" | "dir" => Ok(PaneKind::Directory),
            "document" | "doc" => Ok(PaneKind::Document),
            _ => Err(format!("Unknown pane kind: {}", s)),
        }
    }
}

/// Derive a pane title from its backing path
pub fn derive_title(kind: PaneKind, path: Option<&Path>) -> String {
    match path {
        Some(path) => match path.file_name() {
            Some(name) => name.to_string_lossy().into_owned(),
            // "/" and similar roots have no final component
            None => path.display().to_string(),
        },
        None => kind.default_title().to_string(),
    }
}

/// A single pane: bookkeeping owned by the session plus opaque content
pub struct Pane<C> {
    pub(super) id: PaneId,
    pub(super) kind: PaneKind,
    pub(super) title: String,
    pub(super) dirty: bool,
    pub(super) backing_path: Option<PathBuf>,
    pub(super) content: C,
}

impl<C> Pane<C> {
    pub(super) fn new(id: PaneId, kind: PaneKind, backing_path: Option<PathBuf>, content: C) -> Self {
        let title = derive_title(kind, backing_path.as_deref());
        Self {
            id,
            kind,
            title,
            dirty: false,
            backing_path,
            content,
        }
    }

    pub fn id(&self) -> PaneId {
        self.id
    }

    pub fn kind(&self) -> PaneKind {
        self.kind
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn backing_path(&self) -> Option<&Path> {
        self.backing_path.as_deref()
    }

    pub fn content(&self) -> &C {
        &self.content
    }

    /// Tab label: dirty marker followed by the title
    pub fn label(&self, dirty_marker: &str) -> String {
        if self.dirty {
            format!("{}{}", dirty_marker, self.title)
        } else {
            self.title.clone()
        }
    }
}

impl<C> fmt::Debug for Pane<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pane")
            .field("id", &self.id)
            .field("kind", &self.kind)
            .field("title", &self.title)
            .field("dirty", &self.dirty)
            .field("backing_path", &self.backing_path)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_title_from_path() {
        let path = PathBuf::from("/home/user/notes.txt");
        assert_eq!(derive_title(PaneKind::Document, Some(&path)), "notes.txt");

        let dir = PathBuf::from("/usr/local");
        assert_eq!(derive_title(PaneKind::Directory, Some(&dir)), "local");
    }

    #[test]
    fn test_title_fallbacks() {
        assert_eq!(derive_title(PaneKind::Document, None), "Untitled");
        assert_eq!(derive_title(PaneKind::Directory, None), "Untitled");
        assert_eq!(derive_title(PaneKind::Shell, None), "Terminal");
    }

    #[test]
    fn test_root_path_title() {
        let root = PathBuf::from("/");
        assert_eq!(derive_title(PaneKind::Directory, Some(&root)), "/");
    }

    #[test]
    fn test_label_marks_dirty() {
        let mut pane = Pane::new(PaneId::new(1), PaneKind::Document, None, ());
        assert_eq!(pane.label("*"), "Untitled");

        pane.dirty = true;
        assert_eq!(pane.label("*"), "*Untitled");
        assert_eq!(pane.label("● "), "● Untitled");
    }

    #[test]
    fn test_kind_parsing() {
        assert_eq!("Shell".parse::<PaneKind>(), Ok(PaneKind::Shell));
        assert_eq!("dir".parse::<PaneKind>(), Ok(PaneKind::Directory));
        assert_eq!("document".parse::<PaneKind>(), Ok(PaneKind::Document));
        assert!("window".parse::<PaneKind>().is_err());
    }

    #[test]
    fn test_only_documents_get_dirty() {
        assert!(PaneKind::Document.can_be_dirty());
        assert!(!PaneKind::Shell.can_be_dirty());
        assert!(!PaneKind::Directory.can_be_dirty());
    }
}
