//! Keyboard shortcuts for the viewer.
//!
//! Shortcuts are checked in order and the first match wins. A shortcut
//! matches when its key (case-insensitive) and all of Ctrl, Shift and Alt
//! match the event exactly.

use crate::constants::PAGE_STEP;
use crate::input::{FocusTarget, Key, KeyEvent};
use crate::message::ViewerAction;
use crate::navigation::Plane;

/// A single key binding.
#[derive(Debug, Clone, PartialEq)]
pub struct Shortcut<A> {
    pub key: Key,
    pub ctrl: bool,
    pub shift: bool,
    pub alt: bool,
    pub action: A,
    pub description: String,
    /// Whether the host should suppress the key's default behavior
    pub prevent_default: bool,
}

impl<A> Shortcut<A> {
    pub fn new(key: Key, action: A, description: impl Into<String>) -> Self {
        Self {
            key,
            ctrl: false,
            shift: false,
            alt: false,
            action,
            description: description.into(),
            prevent_default: true,
        }
    }

    pub fn ctrl(mut self) -> Self {
        self.ctrl = true;
        self
    }

    pub fn shift(mut self) -> Self {
        self.shift = true;
        self
    }

    pub fn alt(mut self) -> Self {
        self.alt = true;
        self
    }

    /// Let the key's default behavior happen as well.
    pub fn allow_default(mut self) -> Self {
        self.prevent_default = false;
        self
    }

    pub fn matches(&self, event: &KeyEvent) -> bool {
        self.key.matches(&event.key)
            && self.ctrl == event.modifiers.ctrl
            && self.shift == event.modifiers.shift
            && self.alt == event.modifiers.alt
    }

    /// Help label such as `Ctrl+Shift+K`.
    pub fn label(&self) -> String {
        let mut parts: Vec<String> = Vec::new();
        if self.ctrl {
            parts.push("Ctrl".to_string());
        }
        if self.alt {
            parts.push("Alt".to_string());
        }
        if self.shift {
            parts.push("Shift".to_string());
        }
        parts.push(self.key.name());
        parts.join("+")
    }
}

/// Result of a successful dispatch.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Dispatched<'a, A> {
    pub action: &'a A,
    pub prevent_default: bool,
}

/// One line of the shortcut help.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HelpEntry {
    pub keys: String,
    pub description: String,
}

/// Ordered shortcut table.
#[derive(Debug, Clone)]
pub struct ShortcutDispatcher<A> {
    shortcuts: Vec<Shortcut<A>>,
    enabled: bool,
}

impl<A> Default for ShortcutDispatcher<A> {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

impl<A> ShortcutDispatcher<A> {
    pub fn new(shortcuts: Vec<Shortcut<A>>) -> Self {
        Self {
            shortcuts,
            enabled: true,
        }
    }

    pub fn push(&mut self, shortcut: Shortcut<A>) {
        self.shortcuts.push(shortcut);
    }

    pub fn shortcuts(&self) -> &[Shortcut<A>] {
        &self.shortcuts
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    /// Find the action for a key-down event.
    ///
    /// Returns `None` when disabled, when a text-entry control has focus, or
    /// when no shortcut matches.
    pub fn dispatch(&self, event: &KeyEvent, focus: FocusTarget) -> Option<Dispatched<'_, A>> {
        if !self.enabled || focus.is_text_entry() {
            return None;
        }

        self.shortcuts
            .iter()
            .find(|shortcut| shortcut.matches(event))
            .map(|shortcut| {
                log::trace!("Shortcut {} -> {}", shortcut.label(), shortcut.description);
                Dispatched {
                    action: &shortcut.action,
                    prevent_default: shortcut.prevent_default,
                }
            })
    }

    pub fn help_entries(&self) -> Vec<HelpEntry> {
        self.shortcuts
            .iter()
            .map(|shortcut| HelpEntry {
                keys: shortcut.label(),
                description: shortcut.description.clone(),
            })
            .collect()
    }
}

/// The viewer's default keymap.
pub fn default_viewer_shortcuts() -> ShortcutDispatcher<ViewerAction> {
    ShortcutDispatcher::new(vec![
        Shortcut::new(Key::ArrowLeft, ViewerAction::StepSlice(-1), "Previous slice"),
        Shortcut::new(Key::ArrowRight, ViewerAction::StepSlice(1), "Next slice"),
        Shortcut::new(Key::Home, ViewerAction::FirstSlice, "First slice"),
        Shortcut::new(Key::End, ViewerAction::LastSlice, "Last slice"),
        Shortcut::new(
            Key::PageUp,
            ViewerAction::StepSlice(-PAGE_STEP),
            "Back 10 slices",
        ),
        Shortcut::new(
            Key::PageDown,
            ViewerAction::StepSlice(PAGE_STEP),
            "Forward 10 slices",
        ),
        Shortcut::new(
            Key::Char('1'),
            ViewerAction::SelectPlane(Plane::Axial),
            "Axial view",
        ),
        Shortcut::new(
            Key::Char('2'),
            ViewerAction::SelectPlane(Plane::Coronal),
            "Coronal view",
        ),
        Shortcut::new(
            Key::Char('3'),
            ViewerAction::SelectPlane(Plane::Sagittal),
            "Sagittal view",
        ),
        Shortcut::new(Key::Char('r'), ViewerAction::ResetWindow, "Reset view settings"),
        // '?' is typed with Shift on most layouts.
        Shortcut::new(Key::Char('?'), ViewerAction::ToggleHelp, "Show keyboard shortcuts").shift(),
        Shortcut::new(Key::Space, ViewerAction::TogglePlayback, "Play / pause"),
        Shortcut::new(Key::Char('+'), ViewerAction::ZoomIn, "Zoom in"),
        Shortcut::new(Key::Char('-'), ViewerAction::ZoomOut, "Zoom out"),
        Shortcut::new(Key::Char('0'), ViewerAction::ResetZoom, "Reset zoom"),
    ])
}
