//! User interface rendering and input handling.
//!
//! - **renderer**: Tab bar, active pane body and status bar
//! - **keymapper**: Keyboard input to workbench commands
//! - **label**: Width-aware tab labels and status text

pub mod keymapper;
pub mod label;
pub mod renderer;

pub use keymapper::{KeyAction, KeyMapper, Modifiers};
pub use label::{pane_summary, truncate_label};
pub use renderer::{Palette, Renderer};
