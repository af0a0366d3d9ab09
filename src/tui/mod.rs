//! # TUI Adapter
//!
//! The ratatui-specific layer. Owns the feed, the engine and a
//! [`TerminalSurface`], and translates keyboard events into engine calls.
//!
//! This is the only module that knows about ratatui and crossterm.
//!
//! ## Simulated live traffic
//!
//! A feed file is split three ways at startup:
//!
//! ```text
//!   [ older (held back) | initial (rendered) | live (held back) ]
//!          h: prepend          rebuild             n: append
//! ```
//!
//! `n` delivers one live message as if it had just arrived; `h` loads the
//! next chunk of older history as if the reader scrolled past the top.
//!
//! ## Redraw Strategy
//!
//! Nothing animates, so the loop blocks on input (up to 500ms) and only
//! redraws after an event or a resize.

mod component;
pub mod components;
mod event;
pub mod surface;
mod ui;

use log::{debug, info, warn};
use std::collections::VecDeque;
use std::io::stdout;
use std::time::Duration;

use crossterm::cursor::{Hide, Show};
use crossterm::event::{DisableMouseCapture, EnableMouseCapture};
use crossterm::execute;

use crate::core::collaborators::{FeedSource, Viewport};
use crate::core::feed::Feed;
use crate::core::message::Message;
use crate::core::view::{MessageListView, RenderOptions, RenderReport};
use crate::tui::component::EventHandler;
use crate::tui::event::{poll_event_immediate, poll_event_timeout};

pub use crate::tui::event::TuiEvent;
pub use crate::tui::surface::TerminalSurface;

/// Older messages loaded per `h` press.
pub const OLDER_CHUNK: usize = 100;

/// Emitted by [`FeedApp`] when the event loop should stop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEvent {
    Quit,
}

pub struct FeedApp {
    pub feed: Feed,
    pub view: MessageListView,
    pub surface: TerminalSurface,
    /// Held-back newer messages, oldest first.
    live: VecDeque<Message>,
    /// Held-back older messages, oldest first.
    older: Vec<Message>,
    pub status_message: String,
    pub failures: usize,
}

impl FeedApp {
    /// Split `messages` (sorted by id) into held-back history, the initial
    /// feed and held-back live traffic.
    pub fn new(mut messages: Vec<Message>, view: MessageListView, backlog: usize, live: usize) -> Self {
        let live_from = messages.len().saturating_sub(live);
        let live: VecDeque<Message> = messages.split_off(live_from).into();
        let initial = messages.split_off(backlog.min(messages.len()));
        info!(
            "feed split: {} older, {} initial, {} live",
            messages.len(),
            initial.len(),
            live.len()
        );
        Self {
            feed: Feed::from_messages(initial),
            view,
            surface: TerminalSurface::new(80, 24),
            live,
            older: messages,
            status_message: String::new(),
            failures: 0,
        }
    }

    pub fn live_pending(&self) -> usize {
        self.live.len()
    }

    pub fn older_pending(&self) -> usize {
        self.older.len()
    }

    /// First render: select the newest message and build the window around it.
    pub fn start(&mut self) {
        if let Some(last) = self.feed.last() {
            self.surface.select(last.id);
        }
        let report = self.view.rebuild(&self.feed, &mut self.surface);
        self.absorb("Loaded", report);
    }

    fn move_selection(&mut self, delta: i32) {
        if self.surface.move_selection(delta).is_none() {
            return;
        }
        if self.view.maybe_rerender(&self.feed, &mut self.surface, true) {
            debug!("window moved to [{}, {})", self.view.window().start(), self.view.window().end());
        }
    }

    fn select_latest(&mut self) {
        let Some(latest) = self.feed.last().map(|m| m.id) else {
            return;
        };
        self.surface.select(latest);
        if self.view.row(latest).is_some() {
            self.surface.scroll_to_selected();
            self.view.maybe_rerender(&self.feed, &mut self.surface, true);
        } else {
            let report = self.view.rebuild(&self.feed, &mut self.surface);
            self.absorb("Jumped to latest", report);
        }
    }

    fn toggle_collapse(&mut self) {
        let collapse = !self.view.settings().collapse_messages;
        let report = self
            .view
            .set_collapse_messages(collapse, &self.feed, &mut self.surface);
        let label = if collapse { "Collapsing on" } else { "Collapsing off" };
        self.absorb(label, report);
    }

    fn deliver_next(&mut self) {
        let Some(message) = self.live.pop_front() else {
            self.status_message = String::from("No live messages left");
            return;
        };
        let batch = self.feed.push_back(vec![message]);
        let report = self
            .view
            .append(&self.feed, &mut self.surface, &batch, RenderOptions::live());
        self.absorb("Delivered", report);
    }

    fn load_older(&mut self) {
        if self.older.is_empty() {
            self.status_message = String::from("No older messages");
            return;
        }
        let chunk = self.older.split_off(self.older.len().saturating_sub(OLDER_CHUNK));
        let batch = self.feed.push_front(chunk);
        let report = self
            .view
            .prepend(&self.feed, &mut self.surface, &batch, RenderOptions::foreground());
        self.absorb("Loaded older", report);
    }

    fn absorb(&mut self, what: &str, report: RenderReport) {
        self.failures += report.failures.len();
        self.status_message = if report.failures.is_empty() {
            format!("{what} ({} rendered)", report.rendered.len())
        } else {
            format!(
                "{what} ({} rendered, {} failed)",
                report.rendered.len(),
                report.failures.len()
            )
        };
        if let Some(decision) = report.autoscroll {
            debug!("autoscroll: {:?}", decision);
        }
    }
}

impl EventHandler for FeedApp {
    type Event = AppEvent;

    fn handle_event(&mut self, event: &TuiEvent) -> Option<AppEvent> {
        match event {
            TuiEvent::Quit => return Some(AppEvent::Quit),
            TuiEvent::SelectUp => self.move_selection(-1),
            TuiEvent::SelectDown => self.move_selection(1),
            TuiEvent::PageUp => self.move_selection(-self.surface.page_rows()),
            TuiEvent::PageDown => self.move_selection(self.surface.page_rows()),
            TuiEvent::SelectLatest => self.select_latest(),
            TuiEvent::ToggleCollapse => self.toggle_collapse(),
            TuiEvent::DeliverNext => self.deliver_next(),
            TuiEvent::LoadOlder => self.load_older(),
            // The next draw re-wraps for the new size.
            TuiEvent::Resize(..) => {}
        }
        None
    }
}

struct TerminalModeGuard;

impl TerminalModeGuard {
    fn new() -> std::io::Result<Self> {
        execute!(stdout(), EnableMouseCapture, Hide)?;
        info!("Terminal modes enabled (mouse, hidden cursor)");
        Ok(Self)
    }
}

impl Drop for TerminalModeGuard {
    fn drop(&mut self) {
        let _ = execute!(stdout(), DisableMouseCapture, Show);
    }
}

pub fn run(mut app: FeedApp) -> std::io::Result<()> {
    let mut terminal = ratatui::init();
    let guard = TerminalModeGuard::new();
    if let Err(e) = &guard {
        warn!("Could not enable terminal modes: {}", e);
    }

    let size = terminal.size()?;
    // Feed area is the frame minus the status line and the scrollbar column.
    app.surface
        .resize(size.width.saturating_sub(1), size.height.saturating_sub(1));
    app.start();

    let result = event_loop(&mut terminal, &mut app);

    drop(guard);
    ratatui::restore();
    info!(
        "exiting with {} of {} messages rendered, {} row failures",
        app.view.rendered_count(),
        app.feed.len(),
        app.failures
    );
    result
}

fn event_loop(terminal: &mut ratatui::DefaultTerminal, app: &mut FeedApp) -> std::io::Result<()> {
    let mut needs_redraw = true;
    loop {
        if needs_redraw {
            terminal.draw(|f| ui::draw_ui(f, app))?;
            needs_redraw = false;
        }

        let Some(first) = poll_event_timeout(Duration::from_millis(500))? else {
            continue;
        };
        needs_redraw = true;

        // Process first event + drain all pending events before next draw
        let mut next = Some(first);
        while let Some(event) = next {
            if app.handle_event(&event) == Some(AppEvent::Quit) {
                return Ok(());
            }
            next = poll_event_immediate()?;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::message::MessageId;
    use crate::core::view::ViewSettings;
    use crate::test_support::{test_view, topic_runs};

    fn app(n: u64, backlog: usize, live: usize) -> FeedApp {
        let mut app = FeedApp::new(topic_runs(n, 3), test_view(ViewSettings::default()), backlog, live);
        app.start();
        app
    }

    #[test]
    fn test_split_and_start_selects_latest() {
        let app = app(20, 5, 3);
        assert_eq!(app.older_pending(), 5);
        assert_eq!(app.live_pending(), 3);
        assert_eq!(app.feed.len(), 12);
        assert_eq!(app.surface.selected_id(), Some(MessageId(17)));
        assert_eq!(app.view.rendered_count(), 12);
    }

    #[test]
    fn test_deliver_next_appends() {
        let mut app = app(10, 0, 2);
        assert_eq!(app.handle_event(&TuiEvent::DeliverNext), None);
        assert_eq!(app.feed.len(), 9);
        assert!(app.view.row(MessageId(9)).is_some());
        assert_eq!(app.live_pending(), 1);

        app.handle_event(&TuiEvent::DeliverNext);
        app.handle_event(&TuiEvent::DeliverNext);
        assert_eq!(app.status_message, "No live messages left");
    }

    #[test]
    fn test_load_older_prepends_chunk() {
        let mut app = app(30, 10, 0);
        app.handle_event(&TuiEvent::LoadOlder);
        assert_eq!(app.older_pending(), 0);
        assert_eq!(app.feed.len(), 30);
        assert!(app.view.row(MessageId(1)).is_some());
        assert_eq!(app.surface.selected_id(), Some(MessageId(30)));
    }

    #[test]
    fn test_load_older_keeps_window_contiguous() {
        let mut app = app(600, 100, 0);
        assert_eq!(app.view.window().range(), 299..500);

        app.handle_event(&TuiEvent::LoadOlder);
        assert_eq!(app.older_pending(), 0);
        assert_eq!(app.view.window().range(), 399..600);
        assert_eq!(app.status_message, "Loaded older (0 rendered)");
        let expected: Vec<MessageId> = app.feed.messages()[399..600].iter().map(|m| m.id).collect();
        assert_eq!(app.surface.message_ids(), expected);
    }

    #[test]
    fn test_selection_moves_and_end_returns() {
        let mut app = app(10, 0, 0);
        app.handle_event(&TuiEvent::SelectUp);
        app.handle_event(&TuiEvent::SelectUp);
        assert_eq!(app.surface.selected_id(), Some(MessageId(8)));
        app.handle_event(&TuiEvent::SelectLatest);
        assert_eq!(app.surface.selected_id(), Some(MessageId(10)));
    }

    #[test]
    fn test_toggle_collapse_regroups() {
        let mut app = app(6, 0, 0);
        assert_eq!(app.surface.group_ids().len(), 2);
        app.handle_event(&TuiEvent::ToggleCollapse);
        assert!(!app.view.settings().collapse_messages);
        assert_eq!(app.surface.group_ids().len(), 6);
        assert_eq!(app.status_message, "Collapsing off (6 rendered)");
    }

    #[test]
    fn test_quit() {
        let mut app = app(3, 0, 0);
        assert_eq!(app.handle_event(&TuiEvent::Quit), Some(AppEvent::Quit));
    }
}
