//! Main content area: the queue, the library browser and the header above them

use std::cell::Cell;
use std::rc::Rc;

use ratatui::{
    style::{Color, Modifier, Style},
    text::{Line, Span},
};

use crate::model::{
    Browser, BrowserEvent, ListEvent, QueuedTrack, ReactiveList, Status, StatusEvent, Subscriber,
};
use super::layout::{Component, Placement};
use super::utils::{
    accent, calculate_num_width, format_duration, length_str, normal, scroll_offset, selected,
    split_row, truncate_string,
};

/// Which view fills the main slot
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MainContent {
    Queue,
    Browser,
}

// ============================================================================
// Queue
// ============================================================================

/// The play queue as a selectable, filterable list
pub struct QueueView {
    placement: Placement,
    list: ReactiveList<QueuedTrack>,
    status: Rc<Status>,
    start: Cell<usize>,
}

impl QueueView {
    pub fn new(status: Rc<Status>) -> Rc<Self> {
        let view = Rc::new(Self {
            placement: Placement::new(),
            list: ReactiveList::new(),
            status: status.clone(),
            start: Cell::new(0),
        });
        view.list.set_backing(status.queue().tracks.clone());
        status.events.subscribe(&view);
        view.list.events.subscribe(&view);
        view
    }

    pub fn list(&self) -> &ReactiveList<QueuedTrack> {
        &self.list
    }

    fn row(&self, item: &QueuedTrack, is_selected: bool, is_current: bool, num_width: usize, width: usize) -> Line<'static> {
        let (mut base, mut number) = if is_selected {
            (selected(), selected())
        } else {
            (normal(), accent())
        };
        if is_current {
            base = base.add_modifier(Modifier::BOLD);
            number = number.add_modifier(Modifier::BOLD);
        }

        let track = &item.track;
        let position = if is_current {
            Span::styled(
                format!(">{:>w$}", item.pos + 1, w = num_width - 1),
                accent().add_modifier(Modifier::BOLD),
            )
        } else {
            Span::styled(format!("{:>w$}", item.pos + 1, w = num_width), number)
        };
        let left = vec![
            position,
            Span::styled(
                format!(
                    " {} - {} ({})",
                    track.artist,
                    track.display_title(),
                    track.album
                ),
                base,
            ),
        ];
        let right = vec![Span::styled(format!(" [{}]", length_str(track.duration)), number)];
        split_row(left, right, width, base)
    }
}

impl Component for QueueView {
    fn placement(&self) -> &Placement {
        &self.placement
    }

    fn render(&self, width: u16, height: u16) -> Vec<Line<'static>> {
        let height = height as usize;
        let start = scroll_offset(self.start.get(), self.list.cursor(), height, self.list.len());
        self.start.set(start);

        let cursor = self.list.selected_index();
        let current = self.status.current();
        let num_width = calculate_num_width(self.list.backing_len());

        self.list
            .slice(start, height)
            .iter()
            .enumerate()
            .map(|(row, item)| {
                let is_current = current.as_ref().is_some_and(|c| c.same_track(item));
                self.row(item, cursor == Some(start + row), is_current, num_width, width as usize)
            })
            .collect()
    }
}

impl Subscriber<StatusEvent> for QueueView {
    fn on_event(&self, event: &StatusEvent) {
        if let StatusEvent::PlaylistChanged(snapshot) = event {
            self.list.set_backing(snapshot.tracks.clone());
        }
    }
}

impl Subscriber<ListEvent> for QueueView {
    fn on_event(&self, event: &ListEvent) {
        if matches!(event, ListEvent::FilterStarted | ListEvent::FilterStopped) {
            self.start.set(0);
        }
    }
}

// ============================================================================
// Browser
// ============================================================================

pub struct BrowserView {
    placement: Placement,
    browser: Rc<Browser>,
    start: Cell<usize>,
}

impl BrowserView {
    pub fn new(browser: Rc<Browser>) -> Rc<Self> {
        let view = Rc::new(Self {
            placement: Placement::new(),
            browser: browser.clone(),
            start: Cell::new(0),
        });
        browser.events.subscribe(&view);
        view
    }
}

impl Component for BrowserView {
    fn placement(&self) -> &Placement {
        &self.placement
    }

    fn render(&self, width: u16, height: u16) -> Vec<Line<'static>> {
        let entries = self.browser.entries();
        let height = height as usize;
        let cursor = self.browser.cursor();
        let start = scroll_offset(self.start.get(), cursor, height, entries.len());
        self.start.set(start);
        let num_width = calculate_num_width(entries.len());

        entries
            .iter()
            .enumerate()
            .skip(start)
            .take(height)
            .map(|(index, node)| {
                let is_selected = usize::try_from(cursor).ok() == Some(index);
                let (base, number) = if is_selected {
                    (selected(), selected())
                } else {
                    (normal(), accent())
                };
                let left = vec![
                    Span::styled(format!("{:>w$} ", index + 1, w = num_width), number),
                    Span::styled(node.label(), base),
                ];
                split_row(left, Vec::new(), width as usize, base)
            })
            .collect()
    }
}

impl Subscriber<BrowserEvent> for BrowserView {
    fn on_event(&self, event: &BrowserEvent) {
        if matches!(event, BrowserEvent::NodeChanged) {
            self.start.set(0);
        }
    }
}

// ============================================================================
// Header
// ============================================================================

/// One row naming what the main slot shows, with the option flags on the right
pub struct HeaderBar {
    placement: Placement,
    status: Rc<Status>,
    queue: Rc<QueueView>,
    browser: Rc<Browser>,
    showing: Cell<MainContent>,
}

impl HeaderBar {
    pub fn new(status: Rc<Status>, queue: Rc<QueueView>, browser: Rc<Browser>) -> Rc<Self> {
        Rc::new(Self {
            placement: Placement::with_height(1),
            status,
            queue,
            browser,
            showing: Cell::new(MainContent::Queue),
        })
    }

    pub fn show(&self, content: MainContent) {
        self.showing.set(content);
    }

    pub(crate) fn title(&self) -> String {
        match self.showing.get() {
            MainContent::Queue => {
                let queue = self.status.queue();
                let list = self.queue.list();
                match list.filter_text() {
                    Some(text) => format!(
                        " Queue  /{}  ({} of {})",
                        text,
                        list.len(),
                        list.backing_len()
                    ),
                    None => format!(
                        " Queue  {} songs, {}",
                        queue.len(),
                        format_total(queue.total_duration())
                    ),
                }
            }
            MainContent::Browser => format!(" Browse  {}", self.browser.title()),
        }
    }

    fn flags(&self) -> String {
        if !self.status.is_connected() {
            return " disconnected ".to_string();
        }
        let options = self.status.options();
        let mut flags: Vec<String> = [
            (options.repeat, "repeat"),
            (options.random, "random"),
            (options.single, "single"),
            (options.consume, "consume"),
        ]
        .iter()
        .filter(|(on, _)| *on)
        .map(|(_, name)| name.to_string())
        .collect();
        if options.crossfade > 0 {
            flags.push(format!("xfade {}s", options.crossfade));
        }
        if flags.is_empty() {
            String::new()
        } else {
            format!(" {} ", flags.join(" "))
        }
    }
}

fn format_total(seconds: u64) -> String {
    if seconds >= 3600 {
        format!("{}h {:02}m", seconds / 3600, (seconds % 3600) / 60)
    } else {
        format_duration((seconds * 1000) as u32)
    }
}

impl Component for HeaderBar {
    fn placement(&self) -> &Placement {
        &self.placement
    }

    fn render(&self, width: u16, _height: u16) -> Vec<Line<'static>> {
        let style = Style::default().fg(Color::Black).bg(Color::Cyan);
        let flags = self.flags();
        let room = (width as usize).saturating_sub(flags.chars().count());
        let title = truncate_string(&self.title(), room);
        vec![split_row(
            vec![Span::styled(title, style)],
            vec![Span::styled(flags, style.add_modifier(Modifier::BOLD))],
            width as usize,
            style,
        )]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::types::{QueueChange, QueuePlace};
    use crate::model::{PlayerState, Subsystem, SyncEngine};
    use crate::test_utils::{FakeService, connected_engine, tracks};

    fn text(line: &Line<'_>) -> String {
        line.spans.iter().map(|s| s.content.as_ref()).collect()
    }

    #[tokio::test]
    async fn queue_rows_follow_the_snapshot() {
        let mut service = FakeService::with_queue(tracks(1, 3), 1);
        service.status.song = Some(QueuePlace { pos: 1, id: 2 });
        service.status.state = PlayerState::Play;
        let engine = connected_engine(service).await;
        let view = QueueView::new(engine.status());

        let rows = view.render(40, 5);
        assert_eq!(rows.len(), 3);
        assert_eq!(text(&rows[0]), " 1 Artist - Song 1 (Album)       [03:00]");
        assert!(text(&rows[1]).starts_with(">2 Artist - Song 2"));
        assert_eq!(rows[0].spans[1].style, selected());
    }

    #[tokio::test]
    async fn queue_follows_playlist_changes() {
        let mut engine: SyncEngine<FakeService> =
            connected_engine(FakeService::with_queue(tracks(1, 2), 1)).await;
        let view = QueueView::new(engine.status());
        assert_eq!(view.list().len(), 2);

        let service = engine.service_mut();
        service.queue = tracks(1, 4);
        service.status.queue_version = 2;
        service.status.queue_length = 4;
        service.diff = vec![
            QueueChange { pos: 2, id: 3 },
            QueueChange { pos: 3, id: 4 },
        ];
        service.pending_idle = vec![Subsystem::Playlist];
        engine.begin_wait().await.unwrap();
        engine.sync().await.unwrap();

        assert_eq!(view.list().len(), 4);
    }

    #[tokio::test]
    async fn queue_scrolls_to_the_cursor() {
        let engine = connected_engine(FakeService::with_queue(tracks(1, 20), 1)).await;
        let view = QueueView::new(engine.status());
        view.list().select(12, false);

        let rows = view.render(30, 5);
        assert!(text(&rows[4]).starts_with(" 13 Artist - Song 13"));
    }

    #[tokio::test]
    async fn header_describes_the_main_view() {
        let mut service = FakeService::with_queue(tracks(1, 2), 1);
        service.status.options.random = true;
        service.status.options.crossfade = 3;
        let engine = connected_engine(service).await;
        let status = engine.status();
        let queue = QueueView::new(status.clone());
        let browser = Rc::new(Browser::new());
        let header = HeaderBar::new(status, queue.clone(), browser);

        let row = text(&header.render(60, 1)[0]);
        assert!(row.starts_with(" Queue  2 songs, 6:00"));
        assert!(row.ends_with(" random xfade 3s "));

        queue.list().begin_filter("song 2");
        assert!(text(&header.render(60, 1)[0]).starts_with(" Queue  /song 2  (1 of 2)"));

        header.show(MainContent::Browser);
        assert!(text(&header.render(60, 1)[0]).starts_with(" Browse  /"));
    }

    #[test]
    fn totals_switch_to_hours() {
        assert_eq!(format_total(59), "0:59");
        assert_eq!(format_total(3 * 3600 + 5 * 60), "3h 05m");
    }
}
