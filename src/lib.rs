//! panedeck - tabbed workbench for shells, directory views and text documents
//!
//! The [`session`] module keeps the ordered set of open panes, focus and
//! labels; [`content`] loads and saves what the panes show; [`app`] wires
//! both together for the terminal front end in [`ui`].

pub mod app;
pub mod config;
pub mod content;
pub mod session;
pub mod ui;

pub use app::{Command, PaneInput, Workbench};
pub use config::Config;
pub use session::{PaneId, PaneKind, SessionError, SessionEvent, SessionManager};
