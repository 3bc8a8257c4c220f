//! Session Manager - Owns the ordered panes and the active-pane cursor

use std::collections::HashSet;
use std::path::PathBuf;

use super::error::{Result, SessionError};
use super::event::{ClosedPane, ClosedPaneInfo, SessionEvent};
use super::pane::{derive_title, Pane, PaneId, PaneKind};

/// Tab bar entry for one pane
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TabInfo {
    pub handle: PaneId,
    pub kind: PaneKind,
    pub label: String,
    pub active: bool,
}

/// Session Manager - tracks which panes exist, which one is active, and
/// how title/dirty/closed state changes propagate to the UI adapter.
///
/// Every operation validates first and commits afterwards, so a failed call
/// leaves the session untouched.
pub struct SessionManager<C> {
    /// Panes in tab order
    panes: Vec<Pane<C>>,
    /// Index of the focused pane; `None` iff `panes` is empty
    active: Option<usize>,
    /// Previously focused pane (for toggle)
    last_active: Option<PaneId>,
    /// Next pane ID
    next_id: u64,
    /// Notifications not yet drained by the UI adapter
    events: Vec<SessionEvent>,
}

impl<C> Default for SessionManager<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C> SessionManager<C> {
    /// Create an empty session
    pub fn new() -> Self {
        Self {
            panes: Vec::new(),
            active: None,
            last_active: None,
            next_id: 1,
            events: Vec::new(),
        }
    }

    /// Append a new pane and focus it
    pub fn open(&mut self, kind: PaneKind, backing_path: Option<PathBuf>, content: C) -> PaneId {
        let id = PaneId::new(self.next_id);
        self.next_id += 1;

        let previous = self.current();
        self.panes.push(Pane::new(id, kind, backing_path, content));
        self.active = Some(self.panes.len() - 1);
        if previous.is_some() {
            self.last_active = previous;
        }

        self.events.push(SessionEvent::Opened { handle: id, kind });
        self.events.push(SessionEvent::Activated {
            previous,
            current: id,
        });

        self.debug_check();
        id
    }

    /// Focus a pane
    pub fn activate(&mut self, handle: PaneId) -> Result<()> {
        let index = self.index_of(handle)?;
        self.focus_index(index);
        Ok(())
    }

    /// Replace a pane's title
    pub fn rename(&mut self, handle: PaneId, title: impl Into<String>) -> Result<()> {
        let index = self.index_of(handle)?;
        let pane = &mut self.panes[index];
        pane.title = title.into();

        let event = relabel(pane);
        self.events.push(event);
        Ok(())
    }

    /// Update the unsaved-changes flag
    ///
    /// Unchanged values and non-document panes produce no notification.
    pub fn set_dirty(&mut self, handle: PaneId, dirty: bool) -> Result<()> {
        let index = self.index_of(handle)?;
        let pane = &mut self.panes[index];
        if !pane.kind.can_be_dirty() || pane.dirty == dirty {
            return Ok(());
        }
        pane.dirty = dirty;

        let event = relabel(pane);
        self.events.push(event);
        self.debug_check();
        Ok(())
    }

    /// Point a pane at a new path; the title follows the path's basename
    pub fn set_backing_path(&mut self, handle: PaneId, path: PathBuf) -> Result<()> {
        let index = self.index_of(handle)?;
        let pane = &mut self.panes[index];
        pane.title = derive_title(pane.kind, Some(&path));
        pane.backing_path = Some(path);

        let event = relabel(pane);
        self.events.push(event);
        Ok(())
    }

    /// Remove a pane from the session and hand its content back
    ///
    /// If the closed pane was focused, focus moves to the pane now at the
    /// same index, or to the previous one when the closed pane was last.
    pub fn close(&mut self, handle: PaneId) -> Result<ClosedPane<C>> {
        let index = self.index_of(handle)?;
        let was_active = self.active == Some(index);

        let Pane {
            id,
            kind,
            title,
            dirty,
            backing_path,
            content,
        } = self.panes.remove(index);

        if self.last_active == Some(id) {
            self.last_active = None;
        }

        let info = ClosedPaneInfo {
            handle: id,
            kind,
            title,
            dirty,
            backing_path,
        };
        self.events.push(SessionEvent::Closed {
            handle: id,
            info: info.clone(),
        });

        if self.panes.is_empty() {
            self.active = None;
            self.last_active = None;
            self.events.push(SessionEvent::Empty);
        } else if was_active {
            let new_index = index.min(self.panes.len() - 1);
            let current = self.panes[new_index].id;
            self.active = Some(new_index);
            if self.last_active == Some(current) {
                self.last_active = None;
            }
            self.events.push(SessionEvent::Activated {
                previous: Some(id),
                current,
            });
        } else if let Some(active) = self.active {
            if active > index {
                self.active = Some(active - 1);
            }
        }

        self.debug_check();
        Ok(ClosedPane { info, content })
    }

    /// Move a pane to `new_position` in tab order
    ///
    /// The focused pane stays focused wherever it ends up.
    pub fn reorder(&mut self, handle: PaneId, new_position: usize) -> Result<()> {
        let from = self.index_of(handle)?;
        let len = self.panes.len();
        if new_position >= len {
            return Err(SessionError::OutOfRange {
                position: new_position,
                len,
            });
        }
        if from == new_position {
            return Ok(());
        }

        let focused = self.current();
        let pane = self.panes.remove(from);
        self.panes.insert(new_position, pane);
        self.active = focused.and_then(|id| self.position(id));

        self.events.push(SessionEvent::Moved {
            handle,
            from,
            to: new_position,
        });

        self.debug_check();
        Ok(())
    }

    /// Focused pane handle
    pub fn current(&self) -> Option<PaneId> {
        self.active
            .and_then(|index| self.panes.get(index))
            .map(|pane| pane.id)
    }

    /// Focused pane index in tab order
    pub fn active_index(&self) -> Option<usize> {
        self.active
    }

    /// Switch to next pane (wraps)
    pub fn next(&mut self) -> Option<PaneId> {
        let index = self.active?;
        let next = (index + 1) % self.panes.len();
        self.focus_index(next);
        self.current()
    }

    /// Switch to previous pane (wraps)
    pub fn prev(&mut self) -> Option<PaneId> {
        let index = self.active?;
        let prev = if index == 0 { self.panes.len() - 1 } else { index - 1 };
        self.focus_index(prev);
        self.current()
    }

    /// Switch to pane by number (1-indexed)
    pub fn goto(&mut self, number: usize) -> Result<PaneId> {
        if number == 0 || number > self.panes.len() {
            return Err(SessionError::OutOfRange {
                position: number,
                len: self.panes.len(),
            });
        }
        self.focus_index(number - 1);
        Ok(self.panes[number - 1].id)
    }

    /// Switch back to the previously focused pane
    pub fn last(&mut self) -> Option<PaneId> {
        let last = self.last_active?;
        let index = self.position(last)?;
        self.focus_index(index);
        Some(last)
    }

    pub fn len(&self) -> usize {
        self.panes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.panes.is_empty()
    }

    /// Index of a pane in tab order
    pub fn position(&self, handle: PaneId) -> Option<usize> {
        self.panes.iter().position(|pane| pane.id == handle)
    }

    pub fn contains(&self, handle: PaneId) -> bool {
        self.position(handle).is_some()
    }

    pub fn get(&self, handle: PaneId) -> Option<&Pane<C>> {
        self.panes.iter().find(|pane| pane.id == handle)
    }

    /// Mutable access to a pane's content; bookkeeping stays read-only
    pub fn content_mut(&mut self, handle: PaneId) -> Option<&mut C> {
        self.panes
            .iter_mut()
            .find(|pane| pane.id == handle)
            .map(|pane| &mut pane.content)
    }

    /// The focused pane
    pub fn current_pane(&self) -> Option<&Pane<C>> {
        self.active.and_then(|index| self.panes.get(index))
    }

    /// Panes in tab order
    pub fn iter(&self) -> impl Iterator<Item = &Pane<C>> {
        self.panes.iter()
    }

    /// Whether any pane holds unsaved changes
    pub fn has_dirty(&self) -> bool {
        self.panes.iter().any(|pane| pane.dirty)
    }

    /// Get tab info for rendering tab bar
    pub fn tab_info(&self, dirty_marker: &str) -> Vec<TabInfo> {
        self.panes
            .iter()
            .enumerate()
            .map(|(index, pane)| TabInfo {
                handle: pane.id,
                kind: pane.kind,
                label: pane.label(dirty_marker),
                active: self.active == Some(index),
            })
            .collect()
    }

    /// Notifications queued since the last drain, oldest first
    pub fn pending_events(&self) -> &[SessionEvent] {
        &self.events
    }

    /// Take all queued notifications
    pub fn drain_events(&mut self) -> Vec<SessionEvent> {
        std::mem::take(&mut self.events)
    }

    /// Check the structural invariants of the session
    pub fn invariants_hold(&self) -> bool {
        if self.active.is_none() != self.panes.is_empty() {
            return false;
        }
        if let Some(index) = self.active {
            if index >= self.panes.len() {
                return false;
            }
        }

        let mut seen = HashSet::with_capacity(self.panes.len());
        self.panes.iter().all(|pane| {
            seen.insert(pane.id)
                && pane.id.get() < self.next_id
                && (pane.kind.can_be_dirty() || !pane.dirty)
        })
    }

    fn index_of(&self, handle: PaneId) -> Result<usize> {
        self.position(handle).ok_or(SessionError::NotFound(handle))
    }

    fn focus_index(&mut self, index: usize) {
        if self.active == Some(index) {
            return;
        }
        let previous = self.current();
        self.active = Some(index);
        self.last_active = previous;

        self.events.push(SessionEvent::Activated {
            previous,
            current: self.panes[index].id,
        });
        self.debug_check();
    }

    fn debug_check(&self) {
        debug_assert!(self.invariants_hold(), "session invariants violated");
    }
}

fn relabel<C>(pane: &Pane<C>) -> SessionEvent {
    SessionEvent::Relabel {
        handle: pane.id,
        title: pane.title.clone(),
        dirty: pane.dirty,
    }
}
