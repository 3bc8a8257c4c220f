//! Session error types

use thiserror::Error;

use super::pane::PaneId;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    /// The handle does not name a currently open pane (including double-close)
    #[error("Pane not found: {0}")]
    NotFound(PaneId),

    #[error("Position {position} is out of range for {len} panes")]
    OutOfRange { position: usize, len: usize },
}

pub type Result<T> = std::result::Result<T, SessionError>;
