//! # FeedView Component
//!
//! Scrollable view of the rendered window.
//!
//! `FeedView` is a transient component (created each frame) that wraps
//! `&'a mut TerminalSurface`. The surface owns the scroll position, since
//! the engine moves it through the `Viewport` seam; this component syncs
//! the surface to the frame size, then copies the visible lines into a
//! `ScrollView` so the scrollbar reflects the whole window.

use ratatui::Frame;
use ratatui::layout::{Position, Rect, Size};
use ratatui::style::{Color, Style};
use ratatui::text::Line;
use ratatui::widgets::Paragraph;
use tui_scrollview::{ScrollView, ScrollViewState, ScrollbarVisibility};

use crate::tui::component::Component;
use crate::tui::surface::TerminalSurface;

pub struct FeedView<'a> {
    pub surface: &'a mut TerminalSurface,
}

impl<'a> FeedView<'a> {
    pub fn new(surface: &'a mut TerminalSurface) -> Self {
        Self { surface }
    }
}

impl Component for FeedView<'_> {
    fn render(&mut self, frame: &mut Frame, area: Rect) {
        let content_width = area.width.saturating_sub(1); // -1 for scrollbar
        self.surface.resize(content_width, area.height);

        let total = u16::try_from(self.surface.total_height()).unwrap_or(u16::MAX);
        let top = self.surface.scroll_top();
        let lines: Vec<Line<'static>> = self
            .surface
            .window_lines(top, i32::from(area.height))
            .into_iter()
            .map(|(line, selected)| {
                if selected {
                    line.patch_style(Style::default().bg(Color::DarkGray))
                } else {
                    line
                }
            })
            .collect();

        let top = u16::try_from(top).unwrap_or(u16::MAX);
        let height = lines.len() as u16;
        let mut scroll_view = ScrollView::new(Size::new(content_width, total))
            .vertical_scrollbar_visibility(ScrollbarVisibility::Always)
            .horizontal_scrollbar_visibility(ScrollbarVisibility::Never);
        scroll_view.render_widget(
            Paragraph::new(lines),
            Rect::new(0, top, content_width, height),
        );

        let mut state = ScrollViewState::default();
        state.set_offset(Position { x: 0, y: top });
        frame.render_stateful_widget(scroll_view, area, &mut state);
    }
}
