//! Key mapping for terminal input
//!
//! Converts key events to workbench commands and pane input. Ctrl+<letter>
//! accelerators act directly; the prefix key (Ctrl+B by default) arms a
//! second keystroke for tab management.

use bitflags::bitflags;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

use crate::app::{Command, PaneInput};

bitflags! {
    /// Modifier keys
    #[derive(Clone, Copy, Debug, Default, PartialEq)]
    pub struct Modifiers: u8 {
        const SHIFT = 0b0001;
        const CTRL  = 0b0010;
        const ALT   = 0b0100;
    }
}

impl From<KeyModifiers> for Modifiers {
    fn from(mods: KeyModifiers) -> Self {
        let mut result = Modifiers::empty();
        if mods.contains(KeyModifiers::SHIFT) {
            result |= Modifiers::SHIFT;
        }
        if mods.contains(KeyModifiers::CONTROL) {
            result |= Modifiers::CTRL;
        }
        if mods.contains(KeyModifiers::ALT) {
            result |= Modifiers::ALT;
        }
        result
    }
}

/// Result of mapping one key event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyAction {
    Command(Command),
    Input(PaneInput),
    /// Esc: dismiss the prompt
    Cancel,
    /// Prefix key pressed; waiting for the second key
    Prefix,
    None,
}

/// Key mapper with prefix state
#[derive(Debug, Clone)]
pub struct KeyMapper {
    prefix: char,
    prefix_pending: bool,
}

impl KeyMapper {
    /// `prefix` is the letter used with Ctrl (e.g. 'b' for Ctrl+B)
    pub fn new(prefix: char) -> Self {
        Self {
            prefix: prefix.to_ascii_lowercase(),
            prefix_pending: false,
        }
    }

    /// Whether the prefix key was pressed and the next key is a tab command
    pub fn prefix_pending(&self) -> bool {
        self.prefix_pending
    }

    /// Map a crossterm KeyEvent
    pub fn map(&mut self, event: &KeyEvent) -> KeyAction {
        let mods = Modifiers::from(event.modifiers);

        if self.prefix_pending {
            self.prefix_pending = false;
            return Self::map_prefixed(event.code);
        }

        if mods.contains(Modifiers::CTRL) {
            if let KeyCode::Char(ch) = event.code {
                let ch = ch.to_ascii_lowercase();
                if ch == self.prefix {
                    self.prefix_pending = true;
                    return KeyAction::Prefix;
                }
                return match ch {
                    'n' => KeyAction::Command(Command::NewDocument),
                    'o' => KeyAction::Command(Command::OpenFile),
                    's' => KeyAction::Command(Command::Save),
                    'w' => KeyAction::Command(Command::Close),
                    'q' => KeyAction::Command(Command::Quit),
                    // Ctrl+C, Ctrl+D etc. belong to the pane
                    ch if ch.is_ascii_lowercase() => KeyAction::Input(PaneInput::Ctrl(ch)),
                    _ => KeyAction::None,
                };
            }
        }

        match event.code {
            KeyCode::Char(ch) if !mods.intersects(Modifiers::CTRL | Modifiers::ALT) => {
                KeyAction::Input(PaneInput::Char(ch))
            }
            KeyCode::Enter => KeyAction::Input(PaneInput::Enter),
            KeyCode::Tab => KeyAction::Input(PaneInput::Char('\t')),
            KeyCode::Backspace => KeyAction::Input(PaneInput::Backspace),
            KeyCode::Up => KeyAction::Input(PaneInput::Up),
            KeyCode::Down => KeyAction::Input(PaneInput::Down),
            KeyCode::Left => KeyAction::Input(PaneInput::Left),
            KeyCode::Right => KeyAction::Input(PaneInput::Right),
            KeyCode::Home => KeyAction::Input(PaneInput::Home),
            KeyCode::End => KeyAction::Input(PaneInput::End),
            KeyCode::Esc => KeyAction::Cancel,
            _ => KeyAction::None,
        }
    }

    /// Second key after the prefix
    fn map_prefixed(code: KeyCode) -> KeyAction {
        let command = match code {
            KeyCode::Char('c') => Command::NewShell,
            KeyCode::Char('e') => Command::NewDocument,
            KeyCode::Char('d') => Command::OpenDirectory,
            KeyCode::Char('f') => Command::NewDirectory,
            KeyCode::Char('r') => Command::OpenScript,
            KeyCode::Char('a') => Command::SaveAs,
            KeyCode::Char('x') => Command::Close,
            KeyCode::Char('n') => Command::NextPane,
            KeyCode::Char('p') => Command::PrevPane,
            KeyCode::Char('l') => Command::LastPane,
            KeyCode::Char('<') => Command::MoveLeft,
            KeyCode::Char('>') => Command::MoveRight,
            KeyCode::Char(',') => Command::Rename,
            KeyCode::Char(ch @ '1'..='9') => Command::GotoPane(ch as usize - '0' as usize),
            // Esc and unknown keys just leave prefix mode
            _ => return KeyAction::None,
        };
        KeyAction::Command(command)
    }
}
