//! Directory listing backend

use std::cmp::Ordering;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use super::{ContentBackend, ContentError, Result};
use crate::session::PaneKind;

/// Name of the synthetic parent-directory row
pub const PARENT_ENTRY: &str = "..";

/// One row of a directory listing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirEntry {
    pub name: String,
    /// Full path of the entry
    pub path: PathBuf,
    pub is_dir: bool,
    /// "Folder", a formatted size, or "--" when stat failed
    pub size_label: String,
}

/// What activating a row asks the host to do
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntryAction {
    /// Navigate this pane into a directory
    Enter(PathBuf),
    /// Open a file in a new pane
    Open(PathBuf),
}

/// A directory's entries plus a selection cursor
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DirectoryListing {
    path: PathBuf,
    entries: Vec<DirEntry>,
    selected: usize,
}

impl DirectoryListing {
    /// Listing with no entries (used before the first load succeeds)
    pub fn empty(path: PathBuf) -> Self {
        Self {
            path,
            entries: Vec::new(),
            selected: 0,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn entries(&self) -> &[DirEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn selected(&self) -> usize {
        self.selected
    }

    pub fn selected_entry(&self) -> Option<&DirEntry> {
        self.entries.get(self.selected)
    }

    pub fn select_next(&mut self) {
        if self.selected + 1 < self.entries.len() {
            self.selected += 1;
        }
    }

    pub fn select_prev(&mut self) {
        self.selected = self.selected.saturating_sub(1);
    }

    pub fn select_first(&mut self) {
        self.selected = 0;
    }

    pub fn select_last(&mut self) {
        self.selected = self.entries.len().saturating_sub(1);
    }

    /// Action for the selected row
    pub fn activate_selected(&self) -> Option<EntryAction> {
        self.selected_entry().map(|entry| {
            if entry.is_dir {
                EntryAction::Enter(entry.path.clone())
            } else {
                EntryAction::Open(entry.path.clone())
            }
        })
    }
}

/// Human readable size, 1024-based
pub fn format_file_size(size: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if size < KB {
        format!("{} B", size)
    } else if size < MB {
        format!("{:.1} KB", size as f64 / KB as f64)
    } else if size < GB {
        format!("{:.1} MB", size as f64 / MB as f64)
    } else {
        format!("{:.1} GB", size as f64 / GB as f64)
    }
}

/// Parent of `path`; the root is its own parent
pub fn parent_dir(path: &Path) -> PathBuf {
    path.parent()
        .filter(|parent| !parent.as_os_str().is_empty())
        .map(Path::to_path_buf)
        .unwrap_or_else(|| path.to_path_buf())
}

/// Reads directories with one `read_dir` pass
#[derive(Debug, Clone, Copy)]
pub struct DirectoryBackend {
    /// List entries whose names start with '.'
    pub show_hidden: bool,
    /// Prepend a ".." row when the directory has a parent
    pub show_parent_entry: bool,
}

impl Default for DirectoryBackend {
    fn default() -> Self {
        Self {
            show_hidden: false,
            show_parent_entry: true,
        }
    }
}

impl DirectoryBackend {
    /// List a directory
    pub fn list(&self, path: &Path) -> Result<DirectoryListing> {
        let meta = fs::metadata(path).map_err(|e| ContentError::io(path, e))?;
        if !meta.is_dir() {
            return Err(ContentError::NotADirectory(path.to_path_buf()));
        }

        let mut entries = Vec::new();
        for entry in fs::read_dir(path).map_err(|e| ContentError::io(path, e))? {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    warn!("Skipping unreadable entry in {}: {}", path.display(), e);
                    continue;
                }
            };

            let name = entry.file_name().to_string_lossy().into_owned();
            if !self.show_hidden && name.starts_with('.') {
                continue;
            }

            let full_path = entry.path();
            // Follow symlinks like stat(2); fall back to the entry type
            let (is_dir, size_label) = match fs::metadata(&full_path) {
                Ok(meta) if meta.is_dir() => (true, "Folder".to_string()),
                Ok(meta) => (false, format_file_size(meta.len())),
                Err(_) => match entry.file_type() {
                    Ok(ft) if ft.is_dir() => (true, "Folder".to_string()),
                    _ => (false, "--".to_string()),
                },
            };

            entries.push(DirEntry {
                name,
                path: full_path,
                is_dir,
                size_label,
            });
        }

        entries.sort_by(|a, b| match (a.is_dir, b.is_dir) {
            (true, false) => Ordering::Less,
            (false, true) => Ordering::Greater,
            _ => a.name.cmp(&b.name),
        });

        if self.show_parent_entry {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                entries.insert(
                    0,
                    DirEntry {
                        name: PARENT_ENTRY.to_string(),
                        path: parent.to_path_buf(),
                        is_dir: true,
                        size_label: "Folder".to_string(),
                    },
                );
            }
        }

        debug!("Listed {} entries in {}", entries.len(), path.display());

        Ok(DirectoryListing {
            path: path.to_path_buf(),
            entries,
            selected: 0,
        })
    }
}

impl ContentBackend for DirectoryBackend {
    type Content = DirectoryListing;

    fn kind(&self) -> PaneKind {
        PaneKind::Directory
    }

    fn load(&self, path: &Path) -> Result<DirectoryListing> {
        self.list(path)
    }

    fn save(&self, _content: &DirectoryListing, _path: &Path) -> Result<()> {
        Err(ContentError::Unsupported(PaneKind::Directory))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_dir() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("b.txt"), vec![0u8; 2048]).unwrap();
        fs::write(dir.path().join("a.txt"), b"hi").unwrap();
        fs::write(dir.path().join(".hidden"), b"x").unwrap();
        fs::create_dir(dir.path().join("zeta")).unwrap();
        dir
    }

    fn names(listing: &DirectoryListing) -> Vec<&str> {
        listing.entries().iter().map(|e| e.name.as_str()).collect()
    }

    #[test]
    fn test_format_file_size() {
        assert_eq!(format_file_size(0), "0 B");
        assert_eq!(format_file_size(1023), "1023 B");
        assert_eq!(format_file_size(1024), "1.0 KB");
        assert_eq!(format_file_size(1536), "1.5 KB");
        assert_eq!(format_file_size(5 * 1024 * 1024), "5.0 MB");
        assert_eq!(format_file_size(3 * 1024 * 1024 * 1024), "3.0 GB");
    }

    #[test]
    fn test_parent_dir() {
        assert_eq!(parent_dir(Path::new("/usr/local")), PathBuf::from("/usr"));
        assert_eq!(parent_dir(Path::new("/usr")), PathBuf::from("/"));
        assert_eq!(parent_dir(Path::new("/")), PathBuf::from("/"));
    }

    #[test]
    fn test_listing_order_and_parent_row() {
        let dir = sample_dir();
        let listing = DirectoryBackend::default().list(dir.path()).unwrap();

        assert_eq!(names(&listing), vec!["..", "zeta", "a.txt", "b.txt"]);
        assert_eq!(listing.entries()[0].path, dir.path().parent().unwrap());
        assert_eq!(listing.entries()[1].size_label, "Folder");
        assert_eq!(listing.entries()[2].size_label, "2 B");
        assert_eq!(listing.entries()[3].size_label, "2.0 KB");
    }

    #[test]
    fn test_listing_options() {
        let dir = sample_dir();
        let backend = DirectoryBackend {
            show_hidden: true,
            show_parent_entry: false,
        };
        let listing = backend.list(dir.path()).unwrap();
        assert_eq!(names(&listing), vec!["zeta", ".hidden", "a.txt", "b.txt"]);
    }

    #[test]
    fn test_root_has_no_parent_row() {
        let listing = DirectoryBackend::default().list(Path::new("/")).unwrap();
        assert!(listing.entries().iter().all(|e| e.name != PARENT_ENTRY));
    }

    #[test]
    fn test_not_a_directory() {
        let dir = sample_dir();
        let file = dir.path().join("a.txt");
        let err = DirectoryBackend::default().list(&file).unwrap_err();
        assert!(matches!(err, ContentError::NotADirectory(p) if p == file));

        let missing = dir.path().join("nope");
        assert!(matches!(
            DirectoryBackend::default().list(&missing),
            Err(ContentError::Io { .. })
        ));
    }

    #[test]
    fn test_selection_and_activation() {
        let dir = sample_dir();
        let mut listing = DirectoryBackend::default().list(dir.path()).unwrap();

        listing.select_prev();
        assert_eq!(listing.selected(), 0);
        assert_eq!(
            listing.activate_selected(),
            Some(EntryAction::Enter(dir.path().parent().unwrap().to_path_buf()))
        );

        listing.select_next();
        assert_eq!(
            listing.activate_selected(),
            Some(EntryAction::Enter(dir.path().join("zeta")))
        );

        listing.select_last();
        listing.select_next();
        assert_eq!(listing.selected(), 3);
        assert_eq!(
            listing.activate_selected(),
            Some(EntryAction::Open(dir.path().join("b.txt")))
        );
    }

    #[test]
    fn test_directories_cannot_be_saved() {
        let listing = DirectoryListing::empty(PathBuf::from("/tmp"));
        let err = DirectoryBackend::default()
            .save(&listing, Path::new("/tmp/x"))
            .unwrap_err();
        assert!(matches!(err, ContentError::Unsupported(PaneKind::Directory)));
    }
}
