//! # StatusBar Component
//!
//! Bottom line showing which slice of the feed is rendered and what is
//! still held back.
//!
//! Stateless: every field is a prop, filled in by the parent each frame.
//!
//! ```text
//!  [160, 560) of 1000 | collapse on | 3 live (n) | 200 older (h) | Delivered 1
//! ```

use ratatui::Frame;
use ratatui::layout::Rect;
use ratatui::style::{Modifier, Style};
use ratatui::text::Span;

use crate::tui::component::Component;

pub struct StatusBar {
    pub window: (usize, usize),
    pub feed_len: usize,
    pub collapse: bool,
    pub live_pending: usize,
    pub older_pending: usize,
    pub status_message: String,
}

impl StatusBar {
    pub fn text(&self) -> String {
        let mut parts = vec![
            format!("[{}, {}) of {}", self.window.0, self.window.1, self.feed_len),
            format!("collapse {}", if self.collapse { "on" } else { "off" }),
        ];
        if self.live_pending > 0 {
            parts.push(format!("{} live (n)", self.live_pending));
        }
        if self.older_pending > 0 {
            parts.push(format!("{} older (h)", self.older_pending));
        }
        if !self.status_message.is_empty() {
            parts.push(self.status_message.clone());
        }
        parts.join(" | ")
    }
}

impl Component for StatusBar {
    fn render(&mut self, frame: &mut Frame, area: Rect) {
        let span = Span::styled(self.text(), Style::default().add_modifier(Modifier::REVERSED));
        frame.render_widget(span, area);
    }
}
