//! Key event handling

use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};

use crate::model::MusicService;
use super::states::{Key, Mode, Resolution};
use super::App;

impl<S: MusicService> App<S> {
    pub async fn handle_key_event(&mut self, key: KeyEvent) {
        if key.kind != KeyEventKind::Press {
            return;
        }

        // Ctrl-C quits from every mode
        if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
            self.should_quit = true;
            return;
        }

        match self.states.resolve(Key::from_event(&key)) {
            Resolution::Action(action) => {
                tracing::trace!(mode = self.states.active().name(), action = ?action, "Key bound");
                if let Err(e) = self.perform(action).await {
                    self.report(&e);
                }
            }
            Resolution::Insert(c) => self.insert_char(c),
            Resolution::Ignored => {}
        }
    }

    fn insert_char(&mut self, c: char) {
        match self.states.active() {
            Mode::Command => self.command_line.push(c),
            Mode::Filter => {
                self.prompt.push(c);
                self.apply_filter();
            }
            Mode::Queue | Mode::Browser => {}
        }
    }
}
