//! Keyboard shortcut registry and documentation.

use crate::input::KeyEvent;
use crate::tools::ToolKind;

/// Editor commands reachable from the keyboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Command {
    Undo,
    Redo,
    Save,
    Export,
    Open,
    New,
    DeleteSelected,
    Deselect,
    SelectTool(ToolKind),
    ToggleGrid,
    ZoomIn,
    ZoomOut,
    FitToWindow,
}

/// A keyboard shortcut definition.
#[derive(Debug, Clone)]
pub struct Shortcut {
    pub key: &'static str,
    pub ctrl: bool,
    pub shift: bool,
    pub description: &'static str,
    pub command: Command,
}

impl Shortcut {
    pub const fn new(key: &'static str, ctrl: bool, description: &'static str, command: Command) -> Self {
        Self {
            key,
            ctrl,
            shift: false,
            description,
            command,
        }
    }

    /// Format the shortcut for display (e.g., "Ctrl+S").
    pub fn format(&self) -> String {
        let mut parts = Vec::new();
        if self.ctrl {
            parts.push("Ctrl");
        }
        if self.shift {
            parts.push("Shift");
        }
        parts.push(self.key);
        parts.join("+")
    }

    /// Whether a key press triggers this shortcut. Cmd counts as Ctrl.
    pub fn matches(&self, event: &KeyEvent) -> bool {
        if self.ctrl != event.modifiers.command() || (self.shift && !event.modifiers.shift) {
            return false;
        }
        let key = event.key.as_str();
        match self.key {
            "Del" => matches!(key, "Delete" | "Backspace"),
            "Esc" => key == "Escape",
            "+" => matches!(key, "+" | "="),
            name => key.eq_ignore_ascii_case(name),
        }
    }
}

/// Registry of all keyboard shortcuts.
pub struct ShortcutRegistry;

impl ShortcutRegistry {
    /// Get all registered shortcuts.
    pub fn all() -> Vec<Shortcut> {
        vec![
            Shortcut::new("Z", true, "Undo", Command::Undo),
            Shortcut::new("Y", true, "Redo", Command::Redo),
            Shortcut::new("S", true, "Save", Command::Save),
            Shortcut::new("E", true, "Export", Command::Export),
            Shortcut::new("O", true, "Open", Command::Open),
            Shortcut::new("N", true, "New", Command::New),
            Shortcut::new("Del", false, "Delete Selected", Command::DeleteSelected),
            Shortcut::new("Esc", false, "Deselect", Command::Deselect),
            Shortcut::new("1", false, "Pen Tool", Command::SelectTool(ToolKind::Pen)),
            Shortcut::new("2", false, "Rectangle Tool", Command::SelectTool(ToolKind::Square)),
            Shortcut::new("3", false, "Circle Tool", Command::SelectTool(ToolKind::Circle)),
            Shortcut::new("4", false, "Text Tool", Command::SelectTool(ToolKind::Text)),
            Shortcut::new("V", false, "Move Tool", Command::SelectTool(ToolKind::Move)),
            Shortcut::new("G", false, "Toggle Grid", Command::ToggleGrid),
            Shortcut::new("+", false, "Zoom In", Command::ZoomIn),
            Shortcut::new("-", false, "Zoom Out", Command::ZoomOut),
            Shortcut::new("0", false, "Fit to Window", Command::FitToWindow),
        ]
    }

    /// Command bound to a key press, if any.
    pub fn find(event: &KeyEvent) -> Option<Command> {
        Self::all().into_iter().find(|s| s.matches(event)).map(|s| s.command)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::Modifiers;

    #[test]
    fn test_format() {
        let all = ShortcutRegistry::all();
        assert_eq!(all.len(), 17);
        assert_eq!(all[0].format(), "Ctrl+Z");
        assert_eq!(all[6].format(), "Del");
    }

    #[test]
    fn test_find() {
        assert_eq!(
            ShortcutRegistry::find(&KeyEvent::new("z", Modifiers::ctrl())),
            Some(Command::Undo)
        );
        let cmd = KeyEvent::new(
            "y",
            Modifiers {
                meta: true,
                ..Default::default()
            },
        );
        assert_eq!(ShortcutRegistry::find(&cmd), Some(Command::Redo));
        assert_eq!(
            ShortcutRegistry::find(&KeyEvent::plain("Backspace")),
            Some(Command::DeleteSelected)
        );
        assert_eq!(
            ShortcutRegistry::find(&KeyEvent::plain("2")),
            Some(Command::SelectTool(ToolKind::Square))
        );
        assert_eq!(ShortcutRegistry::find(&KeyEvent::plain("=")), Some(Command::ZoomIn));
        // Plain "z" is not undo.
        assert_eq!(ShortcutRegistry::find(&KeyEvent::plain("z")), None);
    }
}
