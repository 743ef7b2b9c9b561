//! Input types shared by the viewport and the shortcut dispatcher.

use std::fmt;
use std::str::FromStr;

/// A 2D point in container pixels.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub const ORIGIN: Point = Point { x: 0.0, y: 0.0 };

    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// Container size in pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Size {
    pub width: f32,
    pub height: f32,
}

impl Size {
    pub fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }

    pub fn center(&self) -> Point {
        Point::new(self.width / 2.0, self.height / 2.0)
    }

    pub fn min_side(&self) -> f32 {
        self.width.min(self.height)
    }
}

/// Keyboard keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Key {
    Char(char),
    Enter,
    Escape,
    Backspace,
    Delete,
    Tab,
    Space,
    ArrowUp,
    ArrowDown,
    ArrowLeft,
    ArrowRight,
    Home,
    End,
    PageUp,
    PageDown,
}

impl Key {
    /// Key name as shown in help labels.
    pub fn name(&self) -> String {
        match self {
            Key::Char(c) => c.to_uppercase().collect(),
            Key::Enter => "Enter".to_string(),
            Key::Escape => "Escape".to_string(),
            Key::Backspace => "Backspace".to_string(),
            Key::Delete => "Delete".to_string(),
            Key::Tab => "Tab".to_string(),
            Key::Space => "Space".to_string(),
            Key::ArrowUp => "ArrowUp".to_string(),
            Key::ArrowDown => "ArrowDown".to_string(),
            Key::ArrowLeft => "ArrowLeft".to_string(),
            Key::ArrowRight => "ArrowRight".to_string(),
            Key::Home => "Home".to_string(),
            Key::End => "End".to_string(),
            Key::PageUp => "PageUp".to_string(),
            Key::PageDown => "PageDown".to_string(),
        }
    }

    /// Case-insensitive comparison for character keys, exact otherwise.
    pub fn matches(&self, other: &Key) -> bool {
        match (self, other) {
            (Key::Char(a), Key::Char(b)) => a.to_lowercase().eq(b.to_lowercase()),
            _ => self == other,
        }
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name())
    }
}

/// Error for key names that don't map to a [`Key`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown key: {0:?}")]
pub struct UnknownKey(pub String);

impl FromStr for Key {
    type Err = UnknownKey;

    /// Parses DOM-style key names (`"ArrowLeft"`, `"Home"`, `" "`, `"a"`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key = match s {
            " " | "Space" => Key::Space,
            "Enter" => Key::Enter,
            "Escape" | "Esc" => Key::Escape,
            "Backspace" => Key::Backspace,
            "Delete" => Key::Delete,
            "Tab" => Key::Tab,
            "ArrowUp" | "Up" => Key::ArrowUp,
            "ArrowDown" | "Down" => Key::ArrowDown,
            "ArrowLeft" | "Left" => Key::ArrowLeft,
            "ArrowRight" | "Right" => Key::ArrowRight,
            "Home" => Key::Home,
            "End" => Key::End,
            "PageUp" => Key::PageUp,
            "PageDown" => Key::PageDown,
            _ => {
                let mut chars = s.chars();
                match (chars.next(), chars.next()) {
                    (Some(c), None) => Key::Char(c),
                    _ => return Err(UnknownKey(s.to_string())),
                }
            }
        };
        Ok(key)
    }
}

/// Keyboard modifiers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Modifiers {
    pub shift: bool,
    pub ctrl: bool,
    pub alt: bool,
    pub meta: bool,
}

impl Modifiers {
    pub const NONE: Modifiers = Modifiers {
        shift: false,
        ctrl: false,
        alt: false,
        meta: false,
    };

    pub const SHIFT: Modifiers = Modifiers {
        shift: true,
        ..Modifiers::NONE
    };

    pub const CTRL: Modifiers = Modifiers {
        ctrl: true,
        ..Modifiers::NONE
    };
}

/// A key-down event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyEvent {
    pub key: Key,
    pub modifiers: Modifiers,
}

impl KeyEvent {
    pub fn new(key: Key, modifiers: Modifiers) -> Self {
        Self { key, modifiers }
    }

    /// Key press without modifiers.
    pub fn plain(key: Key) -> Self {
        Self::new(key, Modifiers::NONE)
    }
}

/// What currently holds keyboard focus.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FocusTarget {
    /// Nothing in particular (the viewer itself)
    #[default]
    Document,
    /// Single-line text input
    TextInput,
    /// Multi-line text input
    TextArea,
    /// Drop-down select
    Select,
    /// Any other focusable control (buttons, sliders)
    Other,
}

impl FocusTarget {
    /// Whether key presses belong to a text-entry control.
    pub fn is_text_entry(&self) -> bool {
        matches!(
            self,
            FocusTarget::TextInput | FocusTarget::TextArea | FocusTarget::Select
        )
    }
}
