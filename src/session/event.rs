//! Session notifications
//!
//! Every state change the UI adapter has to reflect is queued as a
//! `SessionEvent` and drained with `SessionManager::drain_events`.

use std::path::PathBuf;

use super::pane::{PaneId, PaneKind};

/// Last known state of a pane that has left the session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClosedPaneInfo {
    pub handle: PaneId,
    pub kind: PaneKind,
    pub title: String,
    pub dirty: bool,
    pub backing_path: Option<PathBuf>,
}

/// A closed pane handed back to the caller, content included
#[derive(Debug)]
pub struct ClosedPane<C> {
    pub info: ClosedPaneInfo,
    pub content: C,
}

/// Session events
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// A pane was appended to the session
    Opened { handle: PaneId, kind: PaneKind },
    /// Focus moved; `previous` is `None` when nothing was focused before
    Activated {
        previous: Option<PaneId>,
        current: PaneId,
    },
    /// Title or dirty state changed
    Relabel {
        handle: PaneId,
        title: String,
        dirty: bool,
    },
    /// A pane changed position in tab order
    Moved { handle: PaneId, from: usize, to: usize },
    /// A pane was removed
    Closed { handle: PaneId, info: ClosedPaneInfo },
    /// The last pane was closed
    Empty,
}

impl SessionEvent {
    /// Pane the event is about, if any
    pub fn handle(&self) -> Option<PaneId> {
        match self {
            SessionEvent::Opened { handle, .. }
            | SessionEvent::Relabel { handle, .. }
            | SessionEvent::Moved { handle, .. }
            | SessionEvent::Closed { handle, .. } => Some(*handle),
            SessionEvent::Activated { current, .. } => Some(*current),
            SessionEvent::Empty => None,
        }
    }
}
