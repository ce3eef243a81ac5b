//! Now-playing line and progress bar, both shown only while something is playing or paused

use std::rc::Rc;
use std::time::Instant;

use ratatui::{
    style::{Color, Modifier, Style},
    text::{Line, Span},
};

use crate::model::{PlayerState, Status, StatusEvent, Subscriber};
use super::layout::{Component, Placement};
use super::utils::{format_duration, normal, split_row};

const MARKER_HEAD: char = '╼';
const MARKER_ELAPSED: char = '─';
const MARKER_REMAINING: char = '·';

fn is_active(state: PlayerState) -> bool {
    matches!(state, PlayerState::Play | PlayerState::Pause)
}

/// Fraction of the current song already played, when it is known
fn progress(status: &Status, now: Instant) -> Option<f64> {
    let duration = status.duration_ms();
    if duration == 0 || !is_active(status.state()) {
        return None;
    }
    let fraction = status.elapsed_ms(now) as f64 / duration as f64;
    (0.0..=1.0).contains(&fraction).then_some(fraction)
}

/// The elapsed and the remaining part of a bar `width` cells wide
fn markers(fraction: Option<f64>, width: usize) -> (String, String) {
    let elapsed = fraction.map_or(0, |f| ((f * width as f64) as usize).min(width));
    let mut done: String = std::iter::repeat_n(MARKER_ELAPSED, elapsed.saturating_sub(1)).collect();
    if elapsed > 0 {
        done.push(MARKER_HEAD);
    }
    let rest = std::iter::repeat_n(MARKER_REMAINING, width - elapsed).collect();
    (done, rest)
}

/// Show a bar while the player is active and the connection is up
fn follow_player(placement: &Placement, status: &Status, event: &StatusEvent) {
    match event {
        StatusEvent::StateChanged(state) => placement.set_visible(is_active(*state)),
        // The state mirror survives a disconnect; a reconnect may not change it
        StatusEvent::ConnectionChanged(true) => placement.set_visible(is_active(status.state())),
        StatusEvent::ConnectionChanged(false) => placement.hide(),
        _ => {}
    }
}

// ============================================================================
// Now playing
// ============================================================================

pub struct NowPlayingBar {
    placement: Placement,
    status: Rc<Status>,
}

impl NowPlayingBar {
    pub fn new(status: Rc<Status>) -> Rc<Self> {
        let bar = Rc::new(Self {
            placement: Placement::with_height(1),
            status: status.clone(),
        });
        bar.placement.set_visible(is_active(status.state()));
        status.events.subscribe(&bar);
        bar
    }
}

impl Component for NowPlayingBar {
    fn placement(&self) -> &Placement {
        &self.placement
    }

    fn render(&self, width: u16, _height: u16) -> Vec<Line<'static>> {
        let mut left = format!(" {}", self.status.state().symbol());
        if let Some(current) = self.status.current() {
            let track = &current.track;
            left.push_str(&format!(
                " {} - {} - {}",
                track.artist,
                track.display_title(),
                track.album
            ));
        }
        let time = format!(
            " {} / {} ",
            format_duration(self.status.elapsed_ms(Instant::now())),
            format_duration(self.status.duration_ms())
        );
        vec![split_row(
            vec![Span::styled(left, normal())],
            vec![Span::styled(time, normal().add_modifier(Modifier::BOLD))],
            width as usize,
            normal(),
        )]
    }
}

impl Subscriber<StatusEvent> for NowPlayingBar {
    fn on_event(&self, event: &StatusEvent) {
        follow_player(&self.placement, &self.status, event);
    }
}

// ============================================================================
// Progress
// ============================================================================

pub struct ProgressBar {
    placement: Placement,
    status: Rc<Status>,
}

impl ProgressBar {
    pub fn new(status: Rc<Status>) -> Rc<Self> {
        let bar = Rc::new(Self {
            placement: Placement::with_height(1),
            status: status.clone(),
        });
        bar.placement.set_visible(is_active(status.state()));
        status.events.subscribe(&bar);
        bar
    }
}

impl Component for ProgressBar {
    fn placement(&self) -> &Placement {
        &self.placement
    }

    fn render(&self, width: u16, _height: u16) -> Vec<Line<'static>> {
        let (done, rest) = markers(progress(&self.status, Instant::now()), width as usize);
        let bold = Style::default().bg(Color::Black).add_modifier(Modifier::BOLD);
        vec![Line::from(vec![
            Span::styled(done, bold.fg(Color::White)),
            Span::styled(rest, bold.fg(Color::DarkGray)),
        ])]
    }
}

impl Subscriber<StatusEvent> for ProgressBar {
    fn on_event(&self, event: &StatusEvent) {
        follow_player(&self.placement, &self.status, event);
    }
}
