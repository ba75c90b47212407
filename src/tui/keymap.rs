use crossterm::event::{KeyCode, KeyModifiers};

// ── Actions ──────────────────────────────────────────────────────────

/// Every discrete action a key press can trigger.
///
/// Actions carry no context; `App` decides what they mean for the current
/// screen and selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    // Global
    Quit,
    ShowHelp,
    Refresh,
    SignOut,

    // Navigation
    MoveUp,
    MoveDown,
    NextFilter,

    // Tasks
    NewTask,
    EditTask,
    ToggleDone,
    DeleteTask,
    OpenChecklist,
    OpenFocus,

    // Reorder
    PickUp,
    ReorderUp,
    ReorderDown,

    // Focus screen
    ToggleTimer,
    ResetTimer,
    FocusMode,
    ShortBreakMode,
    LongBreakMode,
    BackToDashboard,
}

// ── Help categories ──────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HelpCategory {
    Navigation,
    Tasks,
    Reorder,
    FocusTimer,
}

impl HelpCategory {
    fn label(self) -> &'static str {
        match self {
            Self::Navigation => "Navigation",
            Self::Tasks => "Tasks",
            Self::Reorder => "Reorder",
            Self::FocusTimer => "Focus Timer",
        }
    }

    const ORDERED: &[Self] = &[
        Self::Navigation,
        Self::Tasks,
        Self::Reorder,
        Self::FocusTimer,
    ];
}

// ── Keybinding ───────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct KeyBinding {
    pub code: KeyCode,
    pub modifiers: KeyModifiers,
    pub action: Action,
    /// Key label in the help overlay. Empty hides the binding from help.
    pub label: &'static str,
    pub description: &'static str,
    pub category: HelpCategory,
}

#[derive(Debug, Clone)]
pub struct HelpEntry {
    pub label: &'static str,
    pub description: &'static str,
}

// ── KeyMap ────────────────────────────────────────────────────────────

/// Declarative registry of the TUI's key bindings: one table for the
/// dashboard, one for the focus screen.
pub struct KeyMap {
    pub dashboard: Vec<KeyBinding>,
    pub focus: Vec<KeyBinding>,
}

impl KeyMap {
    pub fn default_keymap() -> Self {
        Self {
            dashboard: default_dashboard_bindings(),
            focus: default_focus_bindings(),
        }
    }

    pub fn lookup_dashboard(&self, code: KeyCode, modifiers: KeyModifiers) -> Option<Action> {
        lookup(&self.dashboard, code, modifiers)
    }

    pub fn lookup_focus(&self, code: KeyCode, modifiers: KeyModifiers) -> Option<Action> {
        lookup(&self.focus, code, modifiers)
    }

    /// Grouped help entries in display order.
    pub fn help_entries(&self) -> Vec<(&'static str, Vec<HelpEntry>)> {
        let mut out = Vec::new();

        for &cat in HelpCategory::ORDERED {
            let mut entries: Vec<HelpEntry> = Vec::new();

            for kb in self.dashboard.iter().chain(&self.focus) {
                if kb.category == cat
                    && !kb.label.is_empty()
                    && !entries.iter().any(|e| e.label == kb.label)
                {
                    entries.push(HelpEntry {
                        label: kb.label,
                        description: kb.description,
                    });
                }
            }

            // Keys while a task is picked up are handled by the move mode itself.
            if cat == HelpCategory::Reorder {
                entries.extend([
                    HelpEntry {
                        label: "  j/k",
                        description: "Move picked-up task",
                    },
                    HelpEntry {
                        label: "  Enter",
                        description: "Drop here",
                    },
                    HelpEntry {
                        label: "  Esc",
                        description: "Cancel move",
                    },
                ]);
            }

            if !entries.is_empty() {
                out.push((cat.label(), entries));
            }
        }

        out
    }
}

fn lookup(bindings: &[KeyBinding], code: KeyCode, modifiers: KeyModifiers) -> Option<Action> {
    bindings
        .iter()
        .find(|kb| kb.code == code && kb.modifiers == modifiers)
        .map(|kb| kb.action)
}

fn bind(
    code: KeyCode,
    action: Action,
    label: &'static str,
    description: &'static str,
    category: HelpCategory,
) -> KeyBinding {
    KeyBinding {
        code,
        modifiers: KeyModifiers::NONE,
        action,
        label,
        description,
        category,
    }
}

fn alias(code: KeyCode, modifiers: KeyModifiers, action: Action) -> KeyBinding {
    KeyBinding {
        code,
        modifiers,
        action,
        label: "",
        description: "",
        category: HelpCategory::Navigation,
    }
}

// ── Default bindings ─────────────────────────────────────────────────

#[allow(clippy::enum_glob_use)]
fn default_dashboard_bindings() -> Vec<KeyBinding> {
    use Action::*;
    use HelpCategory::*;
    use KeyCode::Char;

    vec![
        // Navigation
        bind(Char('j'), MoveDown, "  j/k", "Navigate up/down", Navigation),
        bind(Char('k'), MoveUp, "", "", Navigation),
        alias(KeyCode::Down, KeyModifiers::NONE, MoveDown),
        alias(KeyCode::Up, KeyModifiers::NONE, MoveUp),
        bind(KeyCode::Tab, NextFilter, "  Tab", "Cycle filter (all/active/completed)", Navigation),
        bind(Char('r'), Refresh, "  r", "Refetch tasks", Navigation),
        bind(Char('L'), SignOut, "  L", "Sign out", Navigation),
        bind(Char('?'), ShowHelp, "  ?", "This help screen", Navigation),
        bind(Char('q'), Quit, "  q", "Quit", Navigation),
        alias(Char('c'), KeyModifiers::CONTROL, Quit),
        // Tasks
        bind(Char('n'), NewTask, "  n", "New task", Tasks),
        bind(Char('e'), EditTask, "  e", "Edit task", Tasks),
        bind(Char(' '), ToggleDone, "  Space", "Toggle completed", Tasks),
        bind(Char('d'), DeleteTask, "  d", "Delete task", Tasks),
        bind(Char('c'), OpenChecklist, "  c", "Checklist panel", Tasks),
        bind(KeyCode::Enter, OpenFocus, "  Enter", "Focus on task", Tasks),
        bind(Char('f'), OpenFocus, "", "", Tasks),
        // Reorder
        bind(Char('g'), PickUp, "  g", "Pick up task", Reorder),
        bind(Char('J'), ReorderDown, "  J/K", "Move task down/up", Reorder),
        bind(Char('K'), ReorderUp, "", "", Reorder),
        alias(Char('J'), KeyModifiers::SHIFT, ReorderDown),
        alias(Char('K'), KeyModifiers::SHIFT, ReorderUp),
    ]
}

#[allow(clippy::enum_glob_use)]
fn default_focus_bindings() -> Vec<KeyBinding> {
    use Action::*;
    use HelpCategory::*;
    use KeyCode::Char;

    vec![
        bind(Char(' '), ToggleTimer, "  Space", "Start / pause timer", FocusTimer),
        bind(Char('r'), ResetTimer, "  r", "Reset timer", FocusTimer),
        bind(Char('1'), FocusMode, "  1/2/3", "Focus / short break / long break", FocusTimer),
        bind(Char('2'), ShortBreakMode, "", "", FocusTimer),
        bind(Char('3'), LongBreakMode, "", "", FocusTimer),
        bind(KeyCode::Esc, BackToDashboard, "  Esc", "Back to dashboard", FocusTimer),
        alias(Char('q'), KeyModifiers::NONE, BackToDashboard),
        alias(Char('c'), KeyModifiers::CONTROL, Quit),
    ]
}
