//! Elapsed-time extrapolation for the progress display
//!
//! The server reports elapsed time only when asked; between status fetches
//! the position is advanced locally from the last report.

use std::time::Instant;

use super::types::{PlayerState, ServerStatus};

#[derive(Clone, Copy, Debug)]
pub struct PlaybackTiming {
    pub position_ms: u32,
    pub last_update: Instant,
    pub is_playing: bool,
    pub duration_ms: u32,
}

impl Default for PlaybackTiming {
    fn default() -> Self {
        Self {
            position_ms: 0,
            last_update: Instant::now(),
            is_playing: false,
            duration_ms: 0,
        }
    }
}

impl PlaybackTiming {
    pub fn current_position_ms(&self, now: Instant) -> u32 {
        if self.is_playing && self.duration_ms > 0 {
            let elapsed = now.saturating_duration_since(self.last_update).as_millis() as u32;
            self.position_ms.saturating_add(elapsed).min(self.duration_ms)
        } else {
            self.position_ms.min(self.duration_ms.max(1) - 1)
        }
    }

    pub fn update_position(&mut self, now: Instant, new_position_ms: u32, is_playing: bool) {
        let current_calculated = self.current_position_ms(now);
        let diff = new_position_ms as i64 - current_calculated as i64;

        let state_changed = self.is_playing != is_playing;
        let significant_jump = diff.abs() > 2000;
        let was_paused = !self.is_playing;
        let acceptable_sync = diff >= -100;

        if state_changed || significant_jump || was_paused || acceptable_sync {
            self.position_ms = new_position_ms;
            self.last_update = now;
        }
        self.is_playing = is_playing;
    }

    /// Take elapsed time, duration and play state from a fresh status
    pub fn apply_status(&mut self, now: Instant, status: &ServerStatus) {
        self.duration_ms = seconds_to_ms(status.duration.unwrap_or(0.0));
        let position = seconds_to_ms(status.elapsed.unwrap_or(0.0));
        self.update_position(now, position, status.state == PlayerState::Play);
    }
}

fn seconds_to_ms(seconds: f64) -> u32 {
    (seconds.max(0.0) * 1000.0).round() as u32
}
