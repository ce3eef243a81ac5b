//! Selectable, filterable list backing the queue view
//!
//! The list keeps a backing sequence, an optional filter and the view derived
//! from both. The cursor always satisfies `-1 <= cursor < view.len()` with
//! `-1` exactly when the view is empty.

use std::cell::RefCell;

use super::pubsub::PubSub;
use super::types::{QueuedTrack, Track};

/// Something that can be matched against a [`Query`]
pub trait Searchable {
    fn matches(&self, query: &Query) -> bool;
}

impl Searchable for Track {
    fn matches(&self, query: &Query) -> bool {
        query.matches_fields(&self.search_fields())
    }
}

impl Searchable for QueuedTrack {
    fn matches(&self, query: &Query) -> bool {
        self.track.matches(query)
    }
}

/// Case-insensitive AND of whitespace-separated words. Every word has to occur
/// in at least one of the candidate's fields; different words may match
/// different fields.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Query {
    text: String,
    words: Vec<String>,
}

impl Query {
    /// `None` when `text` holds no words
    pub fn parse(text: &str) -> Option<Self> {
        let words: Vec<String> = text.split_whitespace().map(str::to_lowercase).collect();
        if words.is_empty() {
            None
        } else {
            Some(Self {
                text: text.to_string(),
                words,
            })
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn matches_fields(&self, fields: &[&str]) -> bool {
        let fields: Vec<String> = fields.iter().map(|f| f.to_lowercase()).collect();
        self.words
            .iter()
            .all(|word| fields.iter().any(|field| field.contains(word.as_str())))
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ListEvent {
    Changed,
    SelectionChanged,
    FilterStarted,
    FilterStopped,
}

struct ListState<T> {
    backing: Vec<T>,
    filter: Option<Query>,
    /// Indices into `backing` making up the visible view
    view: Vec<usize>,
    cursor: isize,
}

impl<T: Searchable> ListState<T> {
    fn derive_view(&mut self) {
        self.view = match &self.filter {
            Some(query) => self
                .backing
                .iter()
                .enumerate()
                .filter(|(_, item)| item.matches(query))
                .map(|(i, _)| i)
                .collect(),
            None => (0..self.backing.len()).collect(),
        };
    }

    fn clamp(&mut self) {
        self.cursor = clamp_cursor(self.cursor, self.view.len());
    }

    fn reset_cursor(&mut self) {
        self.cursor = if self.view.is_empty() { -1 } else { 0 };
    }
}

/// Clamp `cursor` into `[0, len-1]`, or `-1` for an empty view
pub fn clamp_cursor(cursor: isize, len: usize) -> isize {
    if len == 0 {
        -1
    } else {
        cursor.clamp(0, len as isize - 1)
    }
}

pub struct ReactiveList<T> {
    state: RefCell<ListState<T>>,
    pub events: PubSub<ListEvent>,
}

impl<T: Clone + Searchable + 'static> ReactiveList<T> {
    pub fn new() -> Self {
        Self {
            state: RefCell::new(ListState {
                backing: Vec::new(),
                filter: None,
                view: Vec::new(),
                cursor: -1,
            }),
            events: PubSub::new(),
        }
    }

    pub fn set_backing(&self, items: Vec<T>) {
        {
            let mut state = self.state.borrow_mut();
            state.backing = items;
            state.derive_view();
            state.clamp();
        }
        self.events.notify(&ListEvent::Changed);
    }

    /// Move the cursor to `index`, or by `index` when `relative`. Returns the clamped cursor.
    pub fn select(&self, index: isize, relative: bool) -> isize {
        let cursor = {
            let mut state = self.state.borrow_mut();
            state.cursor = if relative {
                state.cursor.saturating_add(index)
            } else {
                index
            };
            state.clamp();
            state.cursor
        };
        self.events.notify(&ListEvent::SelectionChanged);
        cursor
    }

    /// Filter the view down to items matching every word of `text`.
    /// Blank text ends filtering.
    pub fn begin_filter(&self, text: &str) {
        let Some(query) = Query::parse(text) else {
            self.end_filter();
            return;
        };

        let started = {
            let mut state = self.state.borrow_mut();
            let started = state.filter.is_none();
            state.filter = Some(query);
            state.derive_view();
            state.reset_cursor();
            started
        };
        if started {
            self.events.notify(&ListEvent::FilterStarted);
        }
        self.events.notify(&ListEvent::Changed);
    }

    pub fn end_filter(&self) {
        {
            let mut state = self.state.borrow_mut();
            if state.filter.is_none() {
                return;
            }
            state.filter = None;
            state.derive_view();
            state.reset_cursor();
        }
        self.events.notify(&ListEvent::FilterStopped);
        self.events.notify(&ListEvent::Changed);
    }

    pub fn is_filtering(&self) -> bool {
        self.state.borrow().filter.is_some()
    }

    pub fn filter_text(&self) -> Option<String> {
        self.state
            .borrow()
            .filter
            .as_ref()
            .map(|q| q.text().to_string())
    }

    /// Length of the visible view
    pub fn len(&self) -> usize {
        self.state.borrow().view.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn backing_len(&self) -> usize {
        self.state.borrow().backing.len()
    }

    pub fn cursor(&self) -> isize {
        self.state.borrow().cursor
    }

    pub fn selected_index(&self) -> Option<usize> {
        usize::try_from(self.cursor()).ok()
    }

    /// Item at `index` of the visible view
    pub fn get(&self, index: usize) -> Option<T> {
        let state = self.state.borrow();
        state
            .view
            .get(index)
            .and_then(|&i| state.backing.get(i))
            .cloned()
    }

    pub fn selected(&self) -> Option<T> {
        self.selected_index().and_then(|i| self.get(i))
    }

    /// Clone of the visible items in `range`
    pub fn slice(&self, start: usize, count: usize) -> Vec<T> {
        let state = self.state.borrow();
        state
            .view
            .iter()
            .skip(start)
            .take(count)
            .filter_map(|&i| state.backing.get(i).cloned())
            .collect()
    }
}

impl<T: Clone + Searchable + 'static> Default for ReactiveList<T> {
    fn default() -> Self {
        Self::new()
    }
}
