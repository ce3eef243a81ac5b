//! Utility functions for rendering UI components

use ratatui::{
    style::{Color, Style},
    text::{Line, Span},
};

pub fn format_duration(ms: u32) -> String {
    let total_seconds = ms / 1000;
    let minutes = total_seconds / 60;
    let seconds = total_seconds % 60;
    format!("{}:{:02}", minutes, seconds)
}

/// Song length for list rows: `mm:ss`, `NNNm` past 99 minutes, `--:--` when unknown
pub fn length_str(seconds: u32) -> String {
    let minutes = seconds / 60;
    if seconds == 0 {
        "--:--".to_string()
    } else if minutes > 99 {
        format!("{}m", minutes)
    } else {
        format!("{:02}:{:02}", minutes, seconds % 60)
    }
}

/// Calculate width needed for index column (log10(n) + padding)
pub fn calculate_num_width(item_count: usize) -> usize {
    if item_count == 0 {
        2
    } else {
        let digits = (item_count as f64).log10().floor() as usize + 1;
        digits + 1
    }
}

pub fn truncate_string(s: &str, max_width: usize) -> String {
    if s.chars().count() > max_width {
        let truncated: String = s.chars().take(max_width.saturating_sub(3)).collect();
        format!("{:<width$}", format!("{}...", truncated), width = max_width)
    } else {
        format!("{:<width$}", s, width = max_width)
    }
}

/// First visible row of a list so that `cursor` stays on screen
pub fn scroll_offset(start: usize, cursor: isize, height: usize, len: usize) -> usize {
    if len == 0 || height == 0 {
        return 0;
    }
    let mut start = start;
    if let Ok(cursor) = usize::try_from(cursor) {
        if cursor >= start + height {
            start = cursor + 1 - height;
        }
        if cursor < start {
            start = cursor;
        }
    }
    start.min(len - 1)
}

pub fn normal() -> Style {
    Style::default().fg(Color::White).bg(Color::Black)
}

pub fn selected() -> Style {
    Style::default().fg(Color::Black).bg(Color::White)
}

pub fn accent() -> Style {
    Style::default().fg(Color::Blue).bg(Color::Black)
}

/// `left` clipped to leave room for `right`, which is flushed to the right edge
pub fn split_row(
    left: Vec<Span<'static>>,
    right: Vec<Span<'static>>,
    width: usize,
    fill: Style,
) -> Line<'static> {
    let right_width: usize = right.iter().map(|s| s.content.chars().count()).sum();
    let room = width.saturating_sub(right_width);

    let mut spans = Vec::with_capacity(left.len() + right.len() + 1);
    let mut used = 0;
    for span in left {
        if used >= room {
            break;
        }
        let text: String = span.content.chars().take(room - used).collect();
        used += text.chars().count();
        spans.push(Span::styled(text, span.style));
    }
    if used < room {
        spans.push(Span::styled(" ".repeat(room - used), fill));
    }
    if right_width <= width {
        spans.extend(right);
    }
    Line::from(spans)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lengths() {
        assert_eq!(length_str(0), "--:--");
        assert_eq!(length_str(59), "00:59");
        assert_eq!(length_str(245), "04:05");
        assert_eq!(length_str(100 * 60), "100m");
        assert_eq!(format_duration(65_500), "1:05");
    }

    #[test]
    fn number_column_width() {
        assert_eq!(calculate_num_width(0), 2);
        assert_eq!(calculate_num_width(9), 2);
        assert_eq!(calculate_num_width(10), 3);
        assert_eq!(calculate_num_width(120), 4);
    }

    #[test]
    fn scrolling_follows_the_cursor() {
        assert_eq!(scroll_offset(0, 3, 5, 20), 0);
        assert_eq!(scroll_offset(0, 7, 5, 20), 3);
        assert_eq!(scroll_offset(6, 2, 5, 20), 2);
        assert_eq!(scroll_offset(15, -1, 5, 3), 2);
        assert_eq!(scroll_offset(4, 0, 5, 0), 0);
    }

    #[test]
    fn rows_keep_the_right_part() {
        let row = split_row(
            vec![Span::raw("abcdefgh")],
            vec![Span::raw("[1]")],
            8,
            Style::default(),
        );
        let text: String = row.spans.iter().map(|s| s.content.as_ref()).collect();
        assert_eq!(text, "abcde[1]");

        let row = split_row(vec![Span::raw("ab")], vec![Span::raw("[1]")], 8, Style::default());
        let text: String = row.spans.iter().map(|s| s.content.as_ref()).collect();
        assert_eq!(text, "ab   [1]");
    }

    #[test]
    fn truncation() {
        assert_eq!(truncate_string("hello world", 8), "hello...");
        assert_eq!(truncate_string("hi", 4), "hi  ");
    }
}
