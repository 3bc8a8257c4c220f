//! Session Manager - tab/pane lifecycle bookkeeping.
//!
//! This module tracks which panes exist, which one is focused, and how
//! title, dirty and closed state propagate to the UI adapter:
//!
//! - **manager**: `SessionManager` owning the ordered panes and active cursor
//! - **pane**: `Pane`, `PaneId`, `PaneKind` and title derivation
//! - **event**: notifications drained by the UI adapter
//! - **error**: `NotFound` / `OutOfRange`
//!
//! # Module Hierarchy
//!
//! ```text
//! session/
//! ├── mod.rs      - Module exports
//! ├── manager.rs  - SessionManager (ordered panes + active index)
//! ├── pane.rs     - Pane (bookkeeping + opaque content)
//! ├── event.rs    - SessionEvent, ClosedPaneInfo
//! └── error.rs    - SessionError
//! ```
//!
//! The manager never touches storage or rendering; pane content is an
//! opaque type parameter owned by the pane.

pub mod error;
pub mod event;
pub mod manager;
pub mod pane;

pub use error::{Result, SessionError};
pub use event::{ClosedPane, ClosedPaneInfo, SessionEvent};
pub use manager::{SessionManager, TabInfo};
pub use pane::{derive_title, Pane, PaneId, PaneKind};
