//! Text buffer behind the filter box

use std::cell::{Cell, RefCell};

use super::pubsub::PubSub;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PromptEvent {
    Changed,
    /// The filter produced (or stopped producing) results
    FoundChanged,
}

pub struct Prompt {
    text: RefCell<String>,
    found: Cell<bool>,
    pub events: PubSub<PromptEvent>,
}

impl Prompt {
    pub fn new() -> Self {
        Self {
            text: RefCell::new(String::new()),
            found: Cell::new(true),
            events: PubSub::new(),
        }
    }

    pub fn text(&self) -> String {
        self.text.borrow().clone()
    }

    pub fn is_empty(&self) -> bool {
        self.text.borrow().is_empty()
    }

    pub fn push(&self, c: char) {
        self.text.borrow_mut().push(c);
        self.events.notify(&PromptEvent::Changed);
    }

    pub fn pop(&self) {
        if self.text.borrow_mut().pop().is_some() {
            self.events.notify(&PromptEvent::Changed);
        }
    }

    pub fn set(&self, text: &str) {
        *self.text.borrow_mut() = text.to_string();
        self.events.notify(&PromptEvent::Changed);
    }

    pub fn clear(&self) {
        self.set("");
    }

    pub fn found(&self) -> bool {
        self.found.get()
    }

    pub fn set_found(&self, found: bool) {
        if self.found.replace(found) != found {
            self.events.notify(&PromptEvent::FoundChanged);
        }
    }
}

impl Default for Prompt {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::Recorder;

    #[test]
    fn edits_notify() {
        let prompt = Prompt::new();
        let events = Recorder::new();
        prompt.events.subscribe(&events);

        prompt.push('a');
        prompt.push('b');
        prompt.pop();
        assert_eq!(prompt.text(), "a");
        prompt.clear();
        prompt.pop();

        assert!(prompt.is_empty());
        assert_eq!(events.take().len(), 4);
    }

    #[test]
    fn found_fires_only_on_change() {
        let prompt = Prompt::new();
        let events = Recorder::new();
        prompt.events.subscribe(&events);

        prompt.set_found(true);
        prompt.set_found(false);
        prompt.set_found(false);

        assert_eq!(events.take(), vec![PromptEvent::FoundChanged]);
    }
}
