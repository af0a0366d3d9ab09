use ratatui::Frame;
use ratatui::layout::{Constraint, Layout};

use crate::core::collaborators::FeedSource;
use crate::tui::FeedApp;
use crate::tui::component::Component;
use crate::tui::components::{FeedView, StatusBar};

pub fn draw_ui(frame: &mut Frame, app: &mut FeedApp) {
    use Constraint::{Length, Min};
    let layout = Layout::vertical([Min(0), Length(1)]);
    let [feed_area, status_area] = layout.areas(frame.area());

    FeedView::new(&mut app.surface).render(frame, feed_area);

    let window = app.view.window();
    let mut status_bar = StatusBar {
        window: (window.start(), window.end()),
        feed_len: app.feed.len(),
        collapse: app.view.settings().collapse_messages,
        live_pending: app.live_pending(),
        older_pending: app.older_pending(),
        status_message: app.status_message.clone(),
    };
    status_bar.render(frame, status_area);
}
