//! View module - UI rendering
//!
//! Components are retained: each one owns a placement, subscribes to the
//! models it shows and is laid out by the column it sits in. Drawing pulls
//! the current model values every frame.
//!
//! - `utils`: Shared utility functions (formatting, scrolling, row building)
//! - `layout`: Placements, the column container and the cell painter
//! - `content`: Queue, browser and header bar
//! - `progress`: Now-playing line and progress bar
//! - `overlays`: Message bar, command line, filter prompt

mod utils;
mod layout;
mod content;
mod progress;
mod overlays;

use std::rc::Rc;

use ratatui::Frame;

use crate::controller::CommandLine;
use crate::model::{Browser, MessageCenter, Prompt, Status};

pub use content::{BrowserView, HeaderBar, MainContent, QueueView};
pub use layout::{Column, Component};
pub use overlays::{CommandLineView, FilterBar, MessageBar};
pub use progress::{NowPlayingBar, ProgressBar};

pub struct AppView {
    column: Rc<Column>,
    pub header: Rc<HeaderBar>,
    pub queue: Rc<QueueView>,
    pub browser: Rc<BrowserView>,
    pub command_line: Rc<CommandLineView>,
    pub filter: Rc<FilterBar>,
    showing: MainContent,
}

impl AppView {
    pub fn new(
        status: Rc<Status>,
        browser: Rc<Browser>,
        messages: Rc<MessageCenter>,
        command_line: Rc<CommandLine>,
        prompt: Rc<Prompt>,
    ) -> Self {
        let queue = QueueView::new(status.clone());
        let browser_view = BrowserView::new(browser.clone());
        let header = HeaderBar::new(status.clone(), queue.clone(), browser);
        let command_line = CommandLineView::new(command_line);
        let filter = FilterBar::new(prompt);

        // Bottom stack, lowest first
        let bottom: Vec<Rc<dyn Component>> = vec![
            command_line.clone(),
            filter.clone(),
            MessageBar::new(messages),
            NowPlayingBar::new(status.clone()),
            ProgressBar::new(status),
        ];
        let top: Vec<Rc<dyn Component>> = vec![header.clone()];
        let column = Column::new(top, queue.clone(), bottom);

        Self {
            column,
            header,
            queue,
            browser: browser_view,
            command_line,
            filter,
            showing: MainContent::Queue,
        }
    }

    pub fn showing(&self) -> MainContent {
        self.showing
    }

    /// Put the queue or the browser in the main slot
    pub fn show_main(&mut self, content: MainContent) {
        if self.showing == content {
            return;
        }
        self.showing = content;
        self.header.show(content);
        let main: Rc<dyn Component> = match content {
            MainContent::Queue => self.queue.clone(),
            MainContent::Browser => self.browser.clone(),
        };
        self.column.set_main(main);
    }

    pub fn render(&self, frame: &mut Frame) {
        self.column.resize(frame.area());
        self.column.draw(frame.buffer_mut());
        if let Some(position) = self.column.cursor() {
            frame.set_cursor_position(position);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ratatui::{Terminal, backend::TestBackend};

    use crate::test_utils::{FakeService, connected_engine, tracks};

    #[tokio::test]
    async fn renders_the_whole_screen() {
        let engine = connected_engine(FakeService::with_queue(tracks(1, 3), 1)).await;
        let line = Rc::new(CommandLine::new());
        let mut view = AppView::new(
            engine.status(),
            Rc::new(Browser::new()),
            Rc::new(MessageCenter::new()),
            line.clone(),
            Rc::new(Prompt::new()),
        );
        view.command_line.placement().show();
        line.push_str("next");

        let mut terminal = Terminal::new(TestBackend::new(30, 6)).unwrap();
        terminal.draw(|frame| view.render(frame)).unwrap();

        let buffer = terminal.backend().buffer().clone();
        let row = |y: u16| -> String {
            (0..30).map(|x| buffer[(x, y)].symbol().to_string()).collect()
        };
        assert!(row(0).starts_with(" Queue  3 songs"));
        assert!(row(1).starts_with(" 1 Artist - Song 1"));
        assert_eq!(row(5).trim_end(), ":next");
        terminal.backend_mut().assert_cursor_position((5, 5));

        view.show_main(MainContent::Browser);
        assert_eq!(view.showing(), MainContent::Browser);
        terminal.draw(|frame| view.render(frame)).unwrap();
        let buffer = terminal.backend().buffer().clone();
        let header: String = (0..30).map(|x| buffer[(x, 0)].symbol().to_string()).collect();
        assert!(header.starts_with(" Browse  /"));
    }
}
