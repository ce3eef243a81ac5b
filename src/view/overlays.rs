//! Bottom overlays: the message bar, the command line with its match window, and the filter prompt

use std::cell::Cell;
use std::rc::Rc;

use ratatui::{
    style::{Color, Modifier, Style},
    text::{Line, Span},
};

use crate::controller::{CommandLine, CommandLineEvent};
use crate::model::{MessageCenter, MessageEvent, Prompt, Severity, Subscriber};
use super::layout::{Component, Placement};
use super::utils::{accent, normal, scroll_offset};

/// Rows of completion candidates shown above the command line
const MATCH_WINDOW_HEIGHT: usize = 5;

/// The tail of `text` that fits in `width` cells, leaving one cell for the cursor
fn visible_tail(text: &str, width: usize) -> String {
    let len = text.chars().count();
    let room = width.saturating_sub(1);
    text.chars().skip(len.saturating_sub(room)).collect()
}

// ============================================================================
// Messages
// ============================================================================

pub struct MessageBar {
    placement: Placement,
    messages: Rc<MessageCenter>,
}

impl MessageBar {
    pub fn new(messages: Rc<MessageCenter>) -> Rc<Self> {
        let bar = Rc::new(Self {
            placement: Placement::with_height(1),
            messages: messages.clone(),
        });
        bar.placement.set_visible(messages.current().is_some());
        messages.events.subscribe(&bar);
        bar
    }
}

impl Component for MessageBar {
    fn placement(&self) -> &Placement {
        &self.placement
    }

    fn render(&self, _width: u16, _height: u16) -> Vec<Line<'static>> {
        let Some(message) = self.messages.current() else {
            return Vec::new();
        };
        let (prefix, color) = match message.severity {
            Severity::Info => ("Info", Color::White),
            Severity::Warning => ("Warning", Color::Yellow),
            Severity::Error => ("Error", Color::Red),
        };
        vec![Line::styled(
            format!(" {}: {}", prefix, message.text),
            Style::default().fg(color).bg(Color::Black),
        )]
    }
}

impl Subscriber<MessageEvent> for MessageBar {
    fn on_event(&self, event: &MessageEvent) {
        match event {
            MessageEvent::Posted => self.placement.show(),
            MessageEvent::Cleared => self.placement.hide(),
        }
    }
}

// ============================================================================
// Command line
// ============================================================================

/// `:` plus the buffer, with up to five completion candidates above it
pub struct CommandLineView {
    placement: Placement,
    line: Rc<CommandLine>,
    window_start: Cell<usize>,
}

impl CommandLineView {
    pub fn new(line: Rc<CommandLine>) -> Rc<Self> {
        let view = Rc::new(Self {
            placement: Placement::with_height(1),
            line: line.clone(),
            window_start: Cell::new(0),
        });
        view.placement.hide();
        line.events.subscribe(&view);
        view
    }

    fn window_height(&self) -> usize {
        self.line
            .matches()
            .map_or(0, |m| m.entries().len().min(MATCH_WINDOW_HEIGHT))
    }

    fn match_rows(&self, rows: usize) -> Vec<Line<'static>> {
        let Some(matches) = self.line.matches() else {
            return Vec::new();
        };
        let entries = matches.entries();
        let position = matches.position();
        let start = scroll_offset(
            self.window_start.get(),
            position as isize,
            rows,
            entries.len(),
        );
        self.window_start.set(start);

        entries
            .iter()
            .enumerate()
            .skip(start)
            .take(rows)
            .map(|(index, candidate)| {
                let mut text = normal();
                if index == position {
                    text = text.add_modifier(Modifier::BOLD);
                }
                let mut spans = vec![
                    Span::styled(format!("{:3} ", index + 1), accent()),
                    Span::styled(format!("{} ", candidate.name), text),
                ];
                if !candidate.description.is_empty() {
                    spans.push(Span::styled(format!("({})", candidate.description), text));
                }
                Line::from(spans)
            })
            .collect()
    }
}

impl Component for CommandLineView {
    fn placement(&self) -> &Placement {
        &self.placement
    }

    fn render(&self, width: u16, height: u16) -> Vec<Line<'static>> {
        let rows = (height as usize).saturating_sub(1).min(self.window_height());
        let mut lines = self.match_rows(rows);
        let text = format!(":{}", self.line.text());
        lines.push(Line::styled(visible_tail(&text, width as usize), normal()));
        lines
    }

    fn cursor(&self) -> Option<(u16, u16)> {
        let geometry = self.placement.geometry();
        let text = format!(":{}", self.line.text());
        let x = visible_tail(&text, geometry.width as usize).chars().count();
        Some((x as u16, geometry.height.saturating_sub(1)))
    }
}

impl Subscriber<CommandLineEvent> for CommandLineView {
    fn on_event(&self, event: &CommandLineEvent) {
        if let CommandLineEvent::MatchesChanged = event {
            self.window_start.set(0);
            let height = self.window_height() as u16 + 1;
            self.placement.set_preferred_size(None, Some(height));
        }
    }
}

// ============================================================================
// Filter prompt
// ============================================================================

/// `/` plus the filter text; red while nothing matches
pub struct FilterBar {
    placement: Placement,
    prompt: Rc<Prompt>,
}

impl FilterBar {
    pub fn new(prompt: Rc<Prompt>) -> Rc<Self> {
        let bar = Rc::new(Self {
            placement: Placement::with_height(1),
            prompt,
        });
        bar.placement.hide();
        bar
    }
}

impl Component for FilterBar {
    fn placement(&self) -> &Placement {
        &self.placement
    }

    fn render(&self, width: u16, _height: u16) -> Vec<Line<'static>> {
        let color = if self.prompt.found() {
            Color::White
        } else {
            Color::Red
        };
        let text = format!("/{}", self.prompt.text());
        vec![Line::styled(
            visible_tail(&text, width as usize),
            Style::default().fg(color).bg(Color::Black),
        )]
    }

    fn cursor(&self) -> Option<(u16, u16)> {
        let text = format!("/{}", self.prompt.text());
        let width = self.placement.geometry().width as usize;
        Some((visible_tail(&text, width).chars().count() as u16, 0))
    }
}
