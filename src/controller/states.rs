//! UI modes and key routing
//!
//! Exactly one [`Mode`] is active. Keys resolve against the active mode's
//! table first, then against the shared defaults for the modes that use them.
//! Mode switches return a [`Transition`] so the app can run the deactivate
//! hook of the old mode and the activate hook of the new one.

use std::collections::HashMap;

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

use super::commands::Action;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Mode {
    Queue,
    Browser,
    Command,
    Filter,
}

impl Mode {
    pub fn name(self) -> &'static str {
        match self {
            Mode::Queue => "queue",
            Mode::Browser => "browser",
            Mode::Command => "command",
            Mode::Filter => "filter",
        }
    }

    /// Whether unbound printable characters are typed into a buffer
    pub fn accepts_text(self) -> bool {
        matches!(self, Mode::Command | Mode::Filter)
    }

    fn uses_defaults(self) -> bool {
        matches!(self, Mode::Queue | Mode::Browser)
    }
}

/// What the filter prompt is attached to
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FilterTarget {
    Queue,
    Browser,
}

/// Arguments handed to a mode's activate hook
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum ModeArgs {
    #[default]
    None,
    /// Pre-fill the command line and optionally complete right away
    Command { prefix: String, complete: bool },
    Filter { target: FilterTarget },
}

impl ModeArgs {
    pub fn command(prefix: &str, complete: bool) -> Self {
        ModeArgs::Command {
            prefix: prefix.to_string(),
            complete,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Key {
    Char(char),
    Code(KeyCode),
}

impl Key {
    pub fn from_event(event: &KeyEvent) -> Self {
        match event.code {
            KeyCode::Char(c) if !event.modifiers.contains(KeyModifiers::CONTROL) => Key::Char(c),
            code => Key::Code(code),
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct Keybindings {
    bindings: HashMap<Key, Action>,
}

impl Keybindings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn bind(&mut self, key: Key, action: Action) -> &mut Self {
        self.bindings.insert(key, action);
        self
    }

    pub fn bind_char(&mut self, c: char, action: Action) -> &mut Self {
        self.bind(Key::Char(c), action)
    }

    pub fn bind_code(&mut self, code: KeyCode, action: Action) -> &mut Self {
        self.bind(Key::Code(code), action)
    }

    pub fn get(&self, key: &Key) -> Option<&Action> {
        self.bindings.get(key)
    }
}

/// Outcome of routing one key
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Resolution {
    Action(Action),
    /// Printable character for the active text buffer
    Insert(char),
    Ignored,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Transition {
    pub from: Mode,
    pub to: Mode,
    pub args: ModeArgs,
}

pub struct StateMachine {
    tables: HashMap<Mode, Keybindings>,
    defaults: Keybindings,
    active: Mode,
    previous: Option<Mode>,
}

impl StateMachine {
    pub fn new(initial: Mode) -> Self {
        Self {
            tables: HashMap::new(),
            defaults: Keybindings::new(),
            active: initial,
            previous: None,
        }
    }

    /// State machine with the stock bindings, starting in the queue
    pub fn with_default_bindings() -> Self {
        let mut machine = Self::new(Mode::Queue);
        machine.defaults = default_bindings();
        machine.tables.insert(Mode::Queue, queue_bindings());
        machine.tables.insert(Mode::Browser, browser_bindings());
        machine.tables.insert(Mode::Command, command_bindings());
        machine.tables.insert(Mode::Filter, filter_bindings());
        machine
    }

    pub fn active(&self) -> Mode {
        self.active
    }

    #[cfg(test)]
    pub fn previous(&self) -> Option<Mode> {
        self.previous
    }

    #[cfg(test)]
    pub fn defaults_mut(&mut self) -> &mut Keybindings {
        &mut self.defaults
    }

    pub fn resolve(&self, key: Key) -> Resolution {
        let own = self.tables.get(&self.active).and_then(|t| t.get(&key));
        let shared = || {
            self.active
                .uses_defaults()
                .then(|| self.defaults.get(&key))
                .flatten()
        };
        if let Some(action) = own.or_else(shared) {
            return Resolution::Action(action.clone());
        }
        match key {
            Key::Char(c) if self.active.accepts_text() && !c.is_control() => Resolution::Insert(c),
            _ => Resolution::Ignored,
        }
    }

    /// Make `mode` active, remembering the mode it replaces
    pub fn switch_to(&mut self, mode: Mode, args: ModeArgs) -> Transition {
        let from = self.active;
        if mode != from {
            self.previous = Some(from);
            self.active = mode;
        }
        tracing::debug!(from = from.name(), to = mode.name(), "Switching mode");
        Transition { from, to: mode, args }
    }

    /// Leave the active mode, for `next` or else the remembered previous mode.
    /// Returns `None` when there is nowhere to go.
    pub fn deactivate(&mut self, next: Option<Mode>, args: ModeArgs) -> Option<Transition> {
        let to = next.or(self.previous)?;
        Some(self.switch_to(to, args))
    }
}

// ============================================================================
// Stock bindings
// ============================================================================

fn movement(bindings: &mut Keybindings) {
    let down = Action::Select {
        index: 1,
        relative: true,
    };
    let up = Action::Select {
        index: -1,
        relative: true,
    };
    bindings
        .bind_char('j', down.clone())
        .bind_code(KeyCode::Down, down)
        .bind_char('k', up.clone())
        .bind_code(KeyCode::Up, up)
        .bind_code(
            KeyCode::PageDown,
            Action::Select {
                index: 10,
                relative: true,
            },
        )
        .bind_code(
            KeyCode::PageUp,
            Action::Select {
                index: -10,
                relative: true,
            },
        )
        .bind_char(
            'g',
            Action::Select {
                index: 0,
                relative: false,
            },
        )
        .bind_char(
            'G',
            Action::Select {
                index: isize::MAX,
                relative: false,
            },
        );
}

fn default_bindings() -> Keybindings {
    let mut bindings = Keybindings::new();
    bindings
        .bind_char('q', Action::Quit)
        .bind_char('P', Action::Toggle)
        .bind_char('s', Action::Stop)
        .bind_char('n', Action::Next)
        .bind_char('p', Action::Previous)
        .bind_char('1', Action::SwitchMode(Mode::Queue, ModeArgs::None))
        .bind_char('2', Action::SwitchMode(Mode::Browser, ModeArgs::None))
        .bind_char(':', Action::SwitchMode(Mode::Command, ModeArgs::command("", false)))
        .bind_char(
            'c',
            Action::SwitchMode(Mode::Command, ModeArgs::command("consume ", true)),
        )
        .bind_char(
            'x',
            Action::SwitchMode(Mode::Command, ModeArgs::command("crossfade ", false)),
        );
    bindings
}

fn queue_bindings() -> Keybindings {
    let mut bindings = Keybindings::new();
    movement(&mut bindings);
    bindings
        .bind_char('C', Action::Clear)
        .bind_char('d', Action::Delete(Vec::new()))
        .bind_code(KeyCode::Delete, Action::Delete(Vec::new()))
        .bind_char(
            '/',
            Action::SwitchMode(
                Mode::Filter,
                ModeArgs::Filter {
                    target: FilterTarget::Queue,
                },
            ),
        )
        .bind_code(KeyCode::Enter, Action::PlaySelected)
        .bind_code(KeyCode::Esc, Action::EndSearch)
        .bind_code(KeyCode::Tab, Action::SwitchMode(Mode::Browser, ModeArgs::None));
    bindings
}

fn browser_bindings() -> Keybindings {
    let mut bindings = Keybindings::new();
    movement(&mut bindings);
    bindings
        .bind_char('u', Action::BrowserUp)
        .bind_code(KeyCode::Backspace, Action::BrowserUp)
        .bind_char('U', Action::Update(None))
        .bind_char(
            '/',
            Action::SwitchMode(
                Mode::Filter,
                ModeArgs::Filter {
                    target: FilterTarget::Browser,
                },
            ),
        )
        .bind_code(KeyCode::Enter, Action::BrowserEnter)
        .bind_char(' ', Action::BrowserAdd)
        .bind_code(KeyCode::Esc, Action::EndSearch)
        .bind_code(KeyCode::Tab, Action::SwitchMode(Mode::Queue, ModeArgs::None));
    bindings
}

fn command_bindings() -> Keybindings {
    let mut bindings = Keybindings::new();
    bindings
        .bind_code(KeyCode::Up, Action::CycleMatch { forward: false })
        .bind_code(KeyCode::Down, Action::CycleMatch { forward: true })
        .bind_code(KeyCode::Tab, Action::Complete { forward: true })
        .bind_code(KeyCode::BackTab, Action::Complete { forward: false })
        .bind_code(KeyCode::Enter, Action::Execute)
        .bind_code(KeyCode::Backspace, Action::DeleteChar)
        .bind_code(KeyCode::Esc, Action::Leave);
    bindings
}

fn filter_bindings() -> Keybindings {
    let mut bindings = Keybindings::new();
    bindings
        .bind_code(KeyCode::Backspace, Action::DeleteChar)
        .bind_code(KeyCode::Enter, Action::AcceptFilter)
        .bind_code(KeyCode::Esc, Action::CancelFilter);
    bindings
}
