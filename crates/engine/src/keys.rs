//! Keyboard input as the sheet sees it.
//!
//! Hosts translate their toolkit's key events into `KeyInput`. Ctrl and
//! Cmd are the same primary modifier here. Names parse from the browser
//! style spelling (`ArrowDown`, `Shift+Tab`, `Ctrl+Z`) so scripts and
//! tests can write keys as text.

use std::fmt;
use std::str::FromStr;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Key {
    Up,
    Down,
    Left,
    Right,
    PageUp,
    PageDown,
    Home,
    End,
    Tab,
    Enter,
    Escape,
    Backspace,
    Delete,
    Char(char),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct KeyInput {
    pub key: Key,
    /// Ctrl on Windows/Linux, Cmd on macOS.
    pub primary: bool,
    pub shift: bool,
}

impl KeyInput {
    pub fn plain(key: Key) -> Self {
        Self { key, primary: false, shift: false }
    }

    pub fn shift(key: Key) -> Self {
        Self { key, primary: false, shift: true }
    }

    pub fn primary(key: Key) -> Self {
        Self { key, primary: true, shift: false }
    }

    pub fn char(c: char) -> Self {
        Self::plain(Key::Char(c))
    }

    /// Ctrl/Cmd+Z.
    pub fn is_undo(&self) -> bool {
        self.primary && !self.shift && matches!(self.key, Key::Char('z') | Key::Char('Z'))
    }

    /// Ctrl/Cmd+Shift+Z.
    pub fn is_redo(&self) -> bool {
        self.primary && self.shift && matches!(self.key, Key::Char('z') | Key::Char('Z'))
    }
}

impl From<Key> for KeyInput {
    fn from(key: Key) -> Self {
        KeyInput::plain(key)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyParseError(pub String);

impl fmt::Display for KeyParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown key '{}'", self.0)
    }
}

impl std::error::Error for KeyParseError {}

impl FromStr for Key {
    type Err = KeyParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key = match s {
            "ArrowUp" | "Up" => Key::Up,
            "ArrowDown" | "Down" => Key::Down,
            "ArrowLeft" | "Left" => Key::Left,
            "ArrowRight" | "Right" => Key::Right,
            "PageUp" => Key::PageUp,
            "PageDown" => Key::PageDown,
            "Home" => Key::Home,
            "End" => Key::End,
            "Tab" => Key::Tab,
            "Enter" => Key::Enter,
            "Escape" | "Esc" => Key::Escape,
            "Backspace" => Key::Backspace,
            "Delete" | "Del" => Key::Delete,
            "Space" => Key::Char(' '),
            _ => {
                let mut chars = s.chars();
                match (chars.next(), chars.next()) {
                    (Some(c), None) => Key::Char(c),
                    _ => return Err(KeyParseError(s.to_string())),
                }
            }
        };
        Ok(key)
    }
}

impl FromStr for KeyInput {
    type Err = KeyParseError;

    /// `Shift+Tab`, `Ctrl+Z`, `Cmd+Shift+Z`, `5`, `Enter`...
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut input = KeyInput::plain(Key::Enter);
        let mut rest = s.trim();
        loop {
            if let Some(r) = rest.strip_prefix("Ctrl+").or_else(|| rest.strip_prefix("Cmd+")) {
                input.primary = true;
                rest = r;
            } else if let Some(r) = rest.strip_prefix("Shift+") {
                input.shift = true;
                rest = r;
            } else {
                break;
            }
        }
        if rest.is_empty() {
            return Err(KeyParseError(s.to_string()));
        }
        input.key = rest.parse().map_err(|_| KeyParseError(s.to_string()))?;
        Ok(input)
    }
}
