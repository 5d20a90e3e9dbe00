//! Keyboard input as seen by the mention engine.
//!
//! Hosts translate their key events into [`Key`]; browser hosts can pass
//! `KeyboardEvent.key` straight to [`Key::parse`].

use smol_str::SmolStr;

/// A key the engine distinguishes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Key {
    Enter,
    Escape,
    Tab,
    Backspace,
    Delete,
    ArrowUp,
    ArrowDown,
    ArrowLeft,
    ArrowRight,
    Home,
    End,
    /// A key that produces a character.
    Character(char),
    /// Anything else (modifiers, function keys, IME keys).
    Other(SmolStr),
}

impl Key {
    /// Parse a DOM `KeyboardEvent.key` value.
    pub fn parse(s: &str) -> Self {
        match s {
            "Enter" => Self::Enter,
            "Escape" | "Esc" => Self::Escape,
            "Tab" => Self::Tab,
            "Backspace" => Self::Backspace,
            "Delete" | "Del" => Self::Delete,
            "ArrowUp" | "Up" => Self::ArrowUp,
            "ArrowDown" | "Down" => Self::ArrowDown,
            "ArrowLeft" | "Left" => Self::ArrowLeft,
            "ArrowRight" | "Right" => Self::ArrowRight,
            "Home" => Self::Home,
            "End" => Self::End,
            "Spacebar" => Self::Character(' '),
            other => {
                let mut chars = other.chars();
                match (chars.next(), chars.next()) {
                    (Some(c), None) => Self::Character(c),
                    _ => Self::Other(SmolStr::new(other)),
                }
            }
        }
    }

    /// Left/right arrows move through text without editing it.
    pub fn is_horizontal_arrow(&self) -> bool {
        matches!(self, Self::ArrowLeft | Self::ArrowRight)
    }

    /// Keys the open popup takes over from the editor.
    pub fn is_popup_navigation(&self) -> bool {
        matches!(self, Self::Enter | Self::ArrowUp | Self::ArrowDown)
    }
}

impl From<char> for Key {
    fn from(c: char) -> Self {
        Self::Character(c)
    }
}

/// What the host should do with a key-down event after the engine saw it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyDisposition {
    /// Let the editor apply its default behaviour.
    PassThrough,
    /// The engine handled the key; suppress the default (newline, caret move).
    PreventDefault,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_named_keys() {
        assert_eq!(Key::parse("Enter"), Key::Enter);
        assert_eq!(Key::parse("ArrowLeft"), Key::ArrowLeft);
        assert_eq!(Key::parse("Esc"), Key::Escape);
    }

    #[test]
    fn parse_characters() {
        assert_eq!(Key::parse("a"), Key::Character('a'));
        assert_eq!(Key::parse("@"), Key::Character('@'));
        assert_eq!(Key::parse("ü"), Key::Character('ü'));
        assert_eq!(Key::parse(" "), Key::Character(' '));
    }

    #[test]
    fn parse_unknown() {
        match Key::parse("Shift") {
            Key::Other(s) => assert_eq!(s.as_str(), "Shift"),
            other => panic!("expected Other, got {other:?}"),
        }
    }

    #[test]
    fn classification() {
        assert!(Key::ArrowRight.is_horizontal_arrow());
        assert!(!Key::ArrowUp.is_horizontal_arrow());
        assert!(Key::Enter.is_popup_navigation());
        assert!(!Key::Escape.is_popup_navigation());
    }
}
