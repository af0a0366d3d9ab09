//! # Message List View
//!
//! The engine. Owns the grouping state for one rendered list and drives a
//! [`Surface`] through each batch:
//!
//! ```text
//! batch ─▶ Grouper ─▶ GroupMerger ─▶ MessageActions ─▶ Presenter
//!                         ▲                               │
//!                   self.groups                     RowOutcome*
//!                                                         ▼
//!                    RenderWindow ◀── RowIndex ◀── register / collect failures
//!                                                         │
//!                          autoscroll::decide ◀── inserted heights (new only)
//! ```
//!
//! One view is driven by one thread. Collaborators are borrowed per call, so
//! they cannot call back into the view while it is working.

use std::sync::Arc;

use log::{debug, info, warn};

use crate::core::annotate::{Annotator, TimeStrings};
use crate::core::autoscroll::{self, AutoscrollDecision, AutoscrollInput};
use crate::core::collaborators::{
    FeedSource, InsertedElement, Metadata, RenderError, RowOutcome, Surface,
};
use crate::core::grouper::{recipient_header, GroupIds, Grouper};
use crate::core::merge::{GroupMerger, MessageActions};
use crate::core::message::{
    AnnotatedMessage, Bookend, BookendKind, Message, MessageGroup, MessageId, Side,
};
use crate::core::rows::{RowHandle, RowIndex};
use crate::core::time::DayClock;
use crate::core::window::{
    RenderWindow, WindowError, DEFAULT_THRESHOLD, DEFAULT_WINDOW_SIZE,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewSettings {
    pub collapse_messages: bool,
    /// The combined feed: no subscription bookends.
    pub home_view: bool,
    pub autoscroll_forever: bool,
    pub window_size: usize,
    pub threshold: usize,
}

impl Default for ViewSettings {
    fn default() -> Self {
        Self {
            collapse_messages: true,
            home_view: false,
            autoscroll_forever: false,
            window_size: DEFAULT_WINDOW_SIZE,
            threshold: DEFAULT_THRESHOLD,
        }
    }
}

/// Per-call context the caller knows and the engine does not.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RenderOptions {
    /// The batch just arrived live (not backfill).
    pub messages_are_new: bool,
    /// This view is the one on screen.
    pub foreground: bool,
}

impl RenderOptions {
    pub fn foreground() -> Self {
        Self {
            messages_are_new: false,
            foreground: true,
        }
    }

    pub fn live() -> Self {
        Self {
            messages_are_new: true,
            foreground: true,
        }
    }
}

#[derive(Debug, Default)]
pub struct RenderReport {
    /// Rows registered by this call, in the order the presenter reported them.
    pub rendered: Vec<MessageId>,
    pub failures: Vec<RenderError>,
    pub autoscroll: Option<AutoscrollDecision>,
    /// The window was recentered and everything redrawn.
    pub rerendered: bool,
}

pub struct MessageListView {
    settings: ViewSettings,
    clock: Box<dyn DayClock>,
    metadata: Box<dyn Metadata>,
    groups: Vec<MessageGroup>,
    rows: RowIndex,
    window: RenderWindow,
    group_ids: GroupIds,
    times: TimeStrings,
    last_message_historical: bool,
}

impl MessageListView {
    pub fn new(
        settings: ViewSettings,
        clock: Box<dyn DayClock>,
        metadata: Box<dyn Metadata>,
    ) -> Result<Self, WindowError> {
        let window = RenderWindow::new(settings.window_size, settings.threshold)?;
        Ok(Self {
            settings,
            clock,
            metadata,
            groups: Vec::new(),
            rows: RowIndex::new(),
            window,
            group_ids: GroupIds::new(),
            times: TimeStrings::new(),
            last_message_historical: false,
        })
    }

    pub fn settings(&self) -> &ViewSettings {
        &self.settings
    }

    pub fn groups(&self) -> &[MessageGroup] {
        &self.groups
    }

    pub fn window(&self) -> &RenderWindow {
        &self.window
    }

    pub fn row(&self, id: MessageId) -> Option<RowHandle> {
        self.rows.lookup(id)
    }

    pub fn rendered_count(&self) -> usize {
        self.rows.len()
    }

    pub fn selected_row(&self, surface: &dyn Surface) -> Option<RowHandle> {
        surface.selected_id().and_then(|id| self.rows.lookup(id))
    }

    pub fn last_message_historical(&self) -> bool {
        self.last_message_historical
    }

    /// Render `messages` on `side` of what is already shown.
    ///
    /// The caller is responsible for window bookkeeping; see [`append`] and
    /// [`prepend`] for the windowed entry points.
    ///
    /// [`append`]: MessageListView::append
    /// [`prepend`]: MessageListView::prepend
    pub fn render(
        &mut self,
        feed: &dyn FeedSource,
        surface: &mut dyn Surface,
        messages: &[Arc<Message>],
        side: Side,
        opts: RenderOptions,
    ) -> RenderReport {
        let mut report = RenderReport::default();
        if messages.is_empty() {
            return report;
        }

        let last_message_was_selected = match (surface.last_visible(), surface.selected_id()) {
            (Some((last, _)), Some(selected)) => last == selected,
            _ => false,
        };

        let actions = {
            let annotator = Annotator::new(
                self.clock.as_ref(),
                self.metadata.as_ref(),
                self.settings.collapse_messages,
            );
            let new_groups = Grouper::new(annotator, self.settings.home_view).build(
                &mut self.times,
                &mut self.group_ids,
                messages,
            );
            GroupMerger::new(annotator, self.settings.home_view).merge(
                &mut self.groups,
                new_groups,
                side,
            )
        };

        debug!(
            "render {:?}: {} msgs -> +{} top, +{} bottom, {} regroup, {} append rows, {} rerender rows",
            side,
            messages.len(),
            actions.prepend_groups.len(),
            actions.append_groups.len(),
            actions.rerender_groups.len(),
            actions.append_messages.len(),
            actions.rerender_messages.len(),
        );

        let inserted = self.apply(surface, &actions, opts, &mut report);

        if let Some(last) = self.groups.last().and_then(MessageGroup::last) {
            self.last_message_historical = last.message.historical;
        }
        self.update_trailing_bookend(surface);

        if opts.messages_are_new && opts.foreground {
            let input = AutoscrollInput {
                inserted: &inserted,
                last_message_was_selected,
                autoscroll_forever: self.settings.autoscroll_forever,
                selected: surface.selected_id().and_then(|id| surface.row_geometry(id)),
                last_visible: surface.last_visible().map(|(_, geometry)| geometry),
                visible: surface.visible_area(),
            };
            let metadata = self.metadata.as_ref();
            let decision = autoscroll::decide(&input, |id| {
                feed.get(id)
                    .or_else(|| messages.iter().find(|m| m.id == id))
                    .is_some_and(|m| metadata.is_own(m))
            });
            apply_autoscroll(decision, feed, surface);
            report.autoscroll = Some(decision);
        }

        report
    }

    /// Execute merged actions in presenter order, returning what was
    /// inserted for the autoscroll decision.
    fn apply(
        &mut self,
        surface: &mut dyn Surface,
        actions: &MessageActions,
        opts: RenderOptions,
        report: &mut RenderReport,
    ) -> Vec<InsertedElement> {
        let mut inserted = Vec::new();
        let mut saved_offset = None;

        if !actions.rerender_groups.is_empty() {
            save_offset(&mut saved_offset, surface);
            for group in &actions.rerender_groups {
                let out = surface.replace_group(group);
                absorb(&mut self.rows, report, out.rows);
            }
        }

        if !actions.prepend_groups.is_empty() {
            save_offset(&mut saved_offset, surface);
            let out = surface.prepend_groups(&actions.prepend_groups);
            inserted.extend(out.inserted);
            absorb(&mut self.rows, report, out.rows);
        }

        for message in &actions.rerender_messages {
            let Some(handle) = self.rows.lookup(message.id()) else {
                debug!("skip rerender of {}: not rendered", message.id());
                continue;
            };
            let outcome = surface.replace_message(handle, message);
            absorb(&mut self.rows, report, vec![outcome]);
        }

        if !actions.append_messages.is_empty() {
            let out = surface.append_messages(&actions.append_messages);
            inserted.extend(out.inserted);
            absorb(&mut self.rows, report, out.rows);
        }

        if !actions.append_groups.is_empty() {
            surface.clear_trailing_bookend();
            let out = surface.append_groups(&actions.append_groups);
            inserted.extend(out.inserted);
            absorb(&mut self.rows, report, out.rows);
        }

        if let Some(offset) = saved_offset {
            if opts.foreground {
                surface.set_message_offset(offset);
            }
        }

        inserted
    }

    /// Outside the combined feed, a trailing marker says the viewer is not
    /// subscribed to what the list ends with.
    fn update_trailing_bookend(&self, surface: &mut dyn Surface) {
        surface.clear_trailing_bookend();
        if self.settings.home_view || !self.last_message_historical {
            return;
        }
        let stream = self
            .groups
            .last()
            .and_then(MessageGroup::last)
            .and_then(|m| m.message.recipient.as_ref())
            .and_then(|r| r.stream())
            .map(str::to_string);
        let bookend = Bookend {
            kind: BookendKind::Unsubscribed,
            content: self.metadata.bookend_content(stream.as_deref(), false),
            stream,
        };
        surface.render_trailing_bookend(&bookend);
    }

    /// Newer messages arrived at the end of `feed`; `batch` is that tail.
    pub fn append(
        &mut self,
        feed: &dyn FeedSource,
        surface: &mut dyn Surface,
        batch: &[Arc<Message>],
        opts: RenderOptions,
    ) -> RenderReport {
        let take = self.window.append(batch.len());
        let mut report = if take > 0 {
            self.render(feed, surface, &batch[..take], Side::Bottom, opts)
        } else {
            RenderReport::default()
        };

        // A full window with the pointer high up must still show the new
        // message once the reader gets near it.
        if self.maybe_rerender(feed, surface, opts.foreground) {
            report.rerendered = true;
        }
        report
    }

    /// Older messages arrived at the front of `feed`; `batch` is that head.
    pub fn prepend(
        &mut self,
        feed: &dyn FeedSource,
        surface: &mut dyn Surface,
        batch: &[Arc<Message>],
        opts: RenderOptions,
    ) -> RenderReport {
        let take = self.window.prepend(batch.len());
        if take == 0 {
            return RenderReport::default();
        }
        let opts = RenderOptions {
            messages_are_new: false,
            ..opts
        };
        self.render(feed, surface, &batch[batch.len() - take..], Side::Top, opts)
    }

    /// Recenter the window if the selection got too close to an edge.
    pub fn maybe_rerender(
        &mut self,
        feed: &dyn FeedSource,
        surface: &mut dyn Surface,
        foreground: bool,
    ) -> bool {
        let Some(selected_idx) = surface.selected_id().and_then(|id| feed.index_of(id)) else {
            return false;
        };
        if !self.window.should_rerender(selected_idx, feed.len()) {
            return false;
        }
        if !self.window.update(selected_idx, feed.len(), true) {
            return false;
        }
        info!(
            "recentering render window on index {} -> [{}, {})",
            selected_idx,
            self.window.start(),
            self.window.end()
        );
        self.rerender_preserving_scrolltop(feed, surface, foreground);
        true
    }

    /// Redraw the current window, keeping the selected row where it was on
    /// screen.
    pub fn rerender_preserving_scrolltop(
        &mut self,
        feed: &dyn FeedSource,
        surface: &mut dyn Surface,
        foreground: bool,
    ) -> RenderReport {
        let selected = surface.selected_id();
        let offset = selected
            .and_then(|id| surface.row_geometry(id))
            .map(|geometry| geometry.top - surface.visible_area().top);

        self.clear_groups_and_rows(surface);
        let messages = window_slice(feed, &self.window);
        let mut report = self.render(
            feed,
            surface,
            messages,
            Side::Bottom,
            RenderOptions {
                messages_are_new: false,
                foreground,
            },
        );
        report.rerendered = true;

        if let (Some(offset), Some(id)) = (offset, selected) {
            if !self.rows.contains(id) {
                self.select_closest(feed, surface, id);
            }
            surface.set_message_offset(offset);
        }
        report
    }

    /// Throw everything away and render the window around the selection.
    pub fn rebuild(&mut self, feed: &dyn FeedSource, surface: &mut dyn Surface) -> RenderReport {
        self.clear_rendering_state(true, surface);
        let selected_idx = surface
            .selected_id()
            .and_then(|id| feed.index_of(id))
            .unwrap_or(0);
        self.window.update(selected_idx, feed.len(), false);
        info!(
            "rebuilding {} of {} messages",
            self.window.occupancy(),
            feed.len()
        );

        let messages = window_slice(feed, &self.window);
        let mut report = self.render(feed, surface, messages, Side::Bottom, RenderOptions::foreground());
        report.rerendered = true;
        if surface.selected_id().is_some() {
            surface.scroll_to_selected();
        }
        report
    }

    pub fn clear_rendering_state(&mut self, clear_table: bool, surface: &mut dyn Surface) {
        self.groups.clear();
        if clear_table {
            surface.clear();
            self.rows.clear();
        }
        self.last_message_historical = false;
        self.window.reset();
    }

    fn clear_groups_and_rows(&mut self, surface: &mut dyn Surface) {
        self.groups.clear();
        surface.clear();
        self.rows.clear();
        self.last_message_historical = false;
    }

    fn select_closest(&self, feed: &dyn FeedSource, surface: &mut dyn Surface, id: MessageId) {
        let Some(target) = feed.index_of(id) else {
            return;
        };
        let closest = self
            .window
            .range()
            .filter_map(|idx| feed.messages().get(idx).map(|m| (idx, m.id)))
            .filter(|(_, candidate)| self.rows.contains(*candidate))
            .min_by_key(|(idx, _)| idx.abs_diff(target));
        if let Some((_, candidate)) = closest {
            debug!("selection {} not rendered, moving to {}", id, candidate);
            surface.select(candidate);
        }
    }

    /// Redraw rendered messages that changed in `feed` (edits, flag changes).
    /// Recipient headers are redrawn once per run of same-recipient messages.
    pub fn rerender_messages(
        &mut self,
        feed: &dyn FeedSource,
        surface: &mut dyn Surface,
        ids: &[MessageId],
    ) -> RenderReport {
        let mut report = RenderReport::default();
        let annotator = Annotator::new(
            self.clock.as_ref(),
            self.metadata.as_ref(),
            self.settings.collapse_messages,
        );
        let metadata = self.metadata.as_ref();
        let mut runs: Vec<Vec<Arc<Message>>> = Vec::new();

        for &id in ids {
            let Some(message) = feed.get(id) else {
                debug!("skip rerender of {id}: not in this list");
                continue;
            };
            let Some(handle) = self.rows.lookup(id) else {
                debug!("skip rerender of {id}: not rendered");
                continue;
            };
            let Some(record) = find_record_mut(&mut self.groups, id) else {
                debug!("skip rerender of {id}: no group record");
                continue;
            };

            annotator.refresh(&mut self.times, record, Arc::clone(message));
            let outcome = surface.replace_message(handle, record);
            absorb(&mut self.rows, &mut report, vec![outcome]);

            match runs.last_mut() {
                Some(run)
                    if run
                        .last()
                        .is_some_and(|prev| metadata.same_recipient(prev, message)) =>
                {
                    run.push(Arc::clone(message));
                }
                _ => runs.push(vec![Arc::clone(message)]),
            }
        }

        for run in &runs {
            let Some(first) = run.first() else {
                continue;
            };
            let Some(handle) = self.rows.lookup(first.id) else {
                continue;
            };
            let header = recipient_header(metadata, first);
            if let Some(group) = self
                .groups
                .iter_mut()
                .find(|g| g.messages.iter().any(|m| m.id() == first.id))
            {
                group.header = header.clone();
            }
            if let Err(err) = surface.replace_header(handle, &header) {
                warn!("{err}");
                report.failures.push(err);
            }
        }

        report
    }

    /// A locally echoed message received its durable id.
    pub fn change_message_id(
        &mut self,
        old: MessageId,
        new: MessageId,
        surface: &mut dyn Surface,
    ) -> bool {
        if old != new && self.rows.contains(new) {
            debug!("rekey {old} -> {new}: {new} is already rendered");
            return false;
        }
        self.times.rekey(old, new);
        for record in self.groups.iter_mut().flat_map(|g| g.messages.iter_mut()) {
            if record.id() == old {
                let message = Arc::make_mut(&mut record.message);
                message.id = new;
                message.local = false;
            }
        }

        if !self.rows.rekey(old, new) {
            debug!("rekey {old} -> {new}: not rendered");
            return false;
        }
        if let Some(handle) = self.rows.lookup(new) {
            surface.rekey_row(handle, new);
        }
        true
    }

    /// Changing the collapsing policy regroups everything.
    pub fn set_collapse_messages(
        &mut self,
        collapse: bool,
        feed: &dyn FeedSource,
        surface: &mut dyn Surface,
    ) -> RenderReport {
        if self.settings.collapse_messages == collapse {
            return RenderReport::default();
        }
        self.settings.collapse_messages = collapse;
        self.rebuild(feed, surface)
    }
}

fn window_slice<'f>(feed: &'f dyn FeedSource, window: &RenderWindow) -> &'f [Arc<Message>] {
    let messages = feed.messages();
    let end = window.end().min(messages.len());
    let start = window.start().min(end);
    &messages[start..end]
}

fn save_offset(saved: &mut Option<i32>, surface: &dyn Surface) {
    if saved.is_some() {
        return;
    }
    *saved = surface
        .selected_id()
        .and_then(|id| surface.row_geometry(id))
        .map(|geometry| geometry.top - surface.visible_area().top);
}

fn absorb(rows: &mut RowIndex, report: &mut RenderReport, outcomes: Vec<RowOutcome>) {
    for outcome in outcomes {
        match outcome {
            Ok(row) => {
                rows.register(row.id, row.handle);
                report.rendered.push(row.id);
            }
            Err(err) => {
                warn!("{err}");
                if let RenderError::Row { id, .. } | RenderError::StaleRow { id } = &err {
                    rows.remove(*id);
                }
                report.failures.push(err);
            }
        }
    }
}

fn apply_autoscroll(decision: AutoscrollDecision, feed: &dyn FeedSource, surface: &mut dyn Surface) {
    match decision {
        AutoscrollDecision::Stay => {}
        AutoscrollDecision::SelectLatest => {
            if let Some(last) = feed.last() {
                surface.select(last.id);
                surface.scroll_to_selected();
            }
        }
        AutoscrollDecision::SelectOwn(id) => {
            surface.select(id);
            surface.scroll_to_selected();
        }
        AutoscrollDecision::ScrollBy(amount) => surface.scroll_by(amount),
    }
}

fn find_record_mut(groups: &mut [MessageGroup], id: MessageId) -> Option<&mut AnnotatedMessage> {
    groups
        .iter_mut()
        .flat_map(|g| g.messages.iter_mut())
        .find(|m| m.id() == id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::feed::Feed;
    use crate::core::message::{Recipient, RecipientHeader};
    use crate::test_support::{
        stream_msg, test_view, topic_runs, Call, RecordingSurface,
    };

    fn partition(view: &MessageListView) -> Vec<Vec<u64>> {
        view.groups()
            .iter()
            .map(|g| g.messages.iter().map(|m| m.id().0).collect())
            .collect()
    }

    fn assert_rows_consistent(view: &MessageListView) {
        let total: usize = view.groups().iter().map(|g| g.messages.len()).sum();
        assert_eq!(view.rendered_count(), total);
        for group in view.groups() {
            for m in &group.messages {
                assert!(view.row(m.id()).is_some(), "{} has no row", m.id());
            }
        }
    }

    fn three_message_feed() -> Feed {
        Feed::from_messages(vec![
            stream_msg(1, "dev", "ci", "a@x.com", 100),
            stream_msg(2, "dev", "ci", "b@x.com", 110),
            stream_msg(3, "dev", "release", "a@x.com", 120),
        ])
    }

    #[test]
    fn test_initial_render_groups_by_topic() {
        let feed = three_message_feed();
        let mut view = test_view(ViewSettings::default());
        let mut surface = RecordingSurface::new(20);

        let report = view.append(&feed, &mut surface, feed.messages(), RenderOptions::foreground());

        assert_eq!(partition(&view), vec![vec![1, 2], vec![3]]);
        assert_eq!(surface.rendered(), vec![vec![1, 2], vec![3]]);
        assert_eq!(report.rendered.len(), 3);
        assert!(report.failures.is_empty());
        assert_eq!(view.window().range(), 0..3);
        assert_rows_consistent(&view);
    }

    #[test]
    fn test_append_same_topic_extends_last_group() {
        let mut feed = three_message_feed();
        let mut view = test_view(ViewSettings::default());
        let mut surface = RecordingSurface::new(20);
        view.append(&feed, &mut surface, feed.messages(), RenderOptions::foreground());
        surface.calls.clear();

        let batch = feed.push_back(vec![stream_msg(4, "dev", "release", "a@x.com", 130)]);
        view.append(&feed, &mut surface, &batch, RenderOptions::foreground());

        assert_eq!(partition(&view), vec![vec![1, 2], vec![3, 4]]);
        assert_eq!(
            surface.calls,
            vec![
                Call::ReplaceMessage(MessageId(3)),
                Call::AppendMessages(vec![MessageId(4)]),
            ]
        );
        assert_eq!(surface.rendered(), vec![vec![1, 2], vec![3, 4]]);
        assert_rows_consistent(&view);
    }

    #[test]
    fn test_recenter_and_prepend_at_capacity() {
        let mut feed = Feed::from_messages(topic_runs(1000, 10));
        let mut view = test_view(ViewSettings::default());
        let mut surface = RecordingSurface::new(40);

        view.rebuild(&feed, &mut surface);
        assert_eq!(view.window().range(), 0..400);
        assert_eq!(view.rendered_count(), 400);

        surface.selected = Some(MessageId(361));
        assert!(view.maybe_rerender(&feed, &mut surface, true));
        assert_eq!(view.window().range(), 160..560);
        assert_eq!(view.groups()[0].messages[0].id(), MessageId(161));
        assert_eq!(view.rendered_count(), 400);
        assert_rows_consistent(&view);

        // Same selection again: inside the window, nothing to do.
        assert!(!view.maybe_rerender(&feed, &mut surface, true));

        surface.calls.clear();
        let older: Vec<_> = (2001..=2010)
            .map(|id| stream_msg(id, "dev", "old", "a@x.com", 10))
            .collect();
        let older = feed.push_front(older);
        let report = view.prepend(&feed, &mut surface, &older, RenderOptions::foreground());

        assert_eq!(view.window().range(), 170..570);
        assert!(report.rendered.is_empty());
        assert!(surface.calls.is_empty());
    }

    #[test]
    fn test_prepend_below_window_start_renders_nothing() {
        let mut feed = Feed::from_messages(topic_runs(500, 10));
        let mut view = test_view(ViewSettings::default());
        let mut surface = RecordingSurface::new(40);
        surface.selected = Some(MessageId(500));
        view.rebuild(&feed, &mut surface);
        assert_eq!(view.window().range(), 299..500);

        surface.calls.clear();
        let older: Vec<_> = (10_001..=10_100)
            .map(|id| stream_msg(id, "dev", "old", "a@x.com", 10))
            .collect();
        let older = feed.push_front(older);
        let report = view.prepend(&feed, &mut surface, &older, RenderOptions::foreground());

        assert_eq!(view.window().range(), 399..600);
        assert!(report.rendered.is_empty());
        assert!(surface.calls.is_empty());
        let rendered: Vec<u64> = partition(&view).into_iter().flatten().collect();
        let expected: Vec<u64> = feed.messages()[view.window().range()]
            .iter()
            .map(|m| m.id.0)
            .collect();
        assert_eq!(rendered, expected);
        assert_rows_consistent(&view);
    }

    #[test]
    fn test_rebuild_without_selection_starts_at_top() {
        let feed = Feed::from_messages(topic_runs(1000, 10));
        let mut view = test_view(ViewSettings::default());
        let mut surface = RecordingSurface::new(40);
        surface.selected = Some(MessageId(99_999));

        view.rebuild(&feed, &mut surface);
        assert_eq!(view.window().range(), 0..400);
    }

    #[test]
    fn test_row_failure_is_isolated() {
        let feed = three_message_feed();
        let mut view = test_view(ViewSettings::default());
        let mut surface = RecordingSurface::new(20);
        surface.failing.insert(MessageId(2));

        let report = view.append(&feed, &mut surface, feed.messages(), RenderOptions::foreground());

        assert_eq!(report.failures.len(), 1);
        assert!(matches!(report.failures[0], RenderError::Row { id: MessageId(2), .. }));
        assert_eq!(view.row(MessageId(2)), None);
        assert!(view.row(MessageId(1)).is_some());
        assert!(view.row(MessageId(3)).is_some());
        assert_eq!(surface.rendered(), vec![vec![1], vec![3]]);
    }

    #[test]
    fn test_live_message_scrolls_up() {
        let mut feed = three_message_feed();
        let mut view = test_view(ViewSettings::default());
        let mut surface = RecordingSurface::new(10);
        view.append(&feed, &mut surface, feed.messages(), RenderOptions::foreground());
        surface.selected = Some(MessageId(2));

        let batch = feed.push_back(vec![stream_msg(4, "dev", "release", "b@x.com", 130)]);
        let report = view.append(&feed, &mut surface, &batch, RenderOptions::live());

        assert_eq!(report.autoscroll, Some(AutoscrollDecision::ScrollBy(1)));
        assert_eq!(surface.scroll_top, 1);
    }

    #[test]
    fn test_background_view_never_autoscrolls() {
        let mut feed = three_message_feed();
        let mut view = test_view(ViewSettings::default());
        let mut surface = RecordingSurface::new(10);
        view.append(&feed, &mut surface, feed.messages(), RenderOptions::foreground());
        surface.selected = Some(MessageId(2));

        let batch = feed.push_back(vec![stream_msg(4, "dev", "release", "b@x.com", 130)]);
        let opts = RenderOptions {
            messages_are_new: true,
            foreground: false,
        };
        let report = view.append(&feed, &mut surface, &batch, opts);

        assert_eq!(report.autoscroll, None);
        assert_eq!(surface.scroll_top, 0);
    }

    #[test]
    fn test_autoscroll_forever_follows_latest() {
        let mut feed = three_message_feed();
        let mut view = test_view(ViewSettings {
            autoscroll_forever: true,
            ..ViewSettings::default()
        });
        let mut surface = RecordingSurface::new(10);
        view.append(&feed, &mut surface, feed.messages(), RenderOptions::foreground());
        surface.selected = Some(MessageId(3));

        let batch = feed.push_back(vec![stream_msg(4, "ops", "x", "b@x.com", 130)]);
        let report = view.append(&feed, &mut surface, &batch, RenderOptions::live());

        assert_eq!(report.autoscroll, Some(AutoscrollDecision::SelectLatest));
        assert_eq!(surface.selected, Some(MessageId(4)));
    }

    #[test]
    fn test_autoscroll_forever_selects_own_message() {
        let mut feed = three_message_feed();
        let mut view = test_view(ViewSettings {
            autoscroll_forever: true,
            ..ViewSettings::default()
        });
        let mut surface = RecordingSurface::new(10);
        view.append(&feed, &mut surface, feed.messages(), RenderOptions::foreground());
        surface.selected = Some(MessageId(1));

        let batch = feed.push_back(vec![
            stream_msg(4, "ops", "x", "me@x.com", 130),
            stream_msg(5, "ops", "x", "b@x.com", 131),
        ]);
        let report = view.append(&feed, &mut surface, &batch, RenderOptions::live());

        assert_eq!(report.autoscroll, Some(AutoscrollDecision::SelectOwn(MessageId(4))));
        assert_eq!(surface.selected, Some(MessageId(4)));
    }

    #[test]
    fn test_prepend_restores_selected_offset() {
        let mut feed = Feed::from_messages(vec![
            stream_msg(5, "dev", "ci", "a@x.com", 500),
            stream_msg(6, "dev", "ci", "a@x.com", 510),
        ]);
        let mut view = test_view(ViewSettings::default());
        let mut surface = RecordingSurface::new(10);
        view.append(&feed, &mut surface, feed.messages(), RenderOptions::foreground());
        surface.selected = Some(MessageId(5));
        surface.calls.clear();

        let older = feed.push_front(vec![
            stream_msg(1, "ops", "x", "b@x.com", 100),
            stream_msg(2, "ops", "x", "b@x.com", 110),
        ]);
        view.prepend(&feed, &mut surface, &older, RenderOptions::foreground());

        assert_eq!(partition(&view), vec![vec![1, 2], vec![5, 6]]);
        // The old first group lost its date separator and was redrawn.
        assert_eq!(view.groups()[1].show_date, None);
        assert!(surface.calls.contains(&Call::ReplaceGroup(view.groups()[1].id)));
        assert!(surface.calls.contains(&Call::SetMessageOffset(2)));
        assert_eq!(surface.scroll_top, 3);
        assert_rows_consistent(&view);
    }

    #[test]
    fn test_rerender_messages_refreshes_rows_and_headers() {
        let mut feed = three_message_feed();
        let mut view = test_view(ViewSettings::default());
        let mut surface = RecordingSurface::new(20);
        view.append(&feed, &mut surface, feed.messages(), RenderOptions::foreground());
        surface.calls.clear();

        let mut edited = stream_msg(2, "dev", "ci", "b@x.com", 110);
        edited.content = "edited".into();
        edited.last_edit_timestamp = Some(200);
        feed.update(edited);
        let mut moved = stream_msg(3, "dev", "renamed", "a@x.com", 120);
        moved.content = "moved".into();
        feed.update(moved);

        let ids = [MessageId(1), MessageId(2), MessageId(3), MessageId(99)];
        let report = view.rerender_messages(&feed, &mut surface, &ids);

        assert!(report.failures.is_empty());
        assert_eq!(
            surface.calls,
            vec![
                Call::ReplaceMessage(MessageId(1)),
                Call::ReplaceMessage(MessageId(2)),
                Call::ReplaceMessage(MessageId(3)),
                Call::ReplaceHeader(MessageId(1)),
                Call::ReplaceHeader(MessageId(3)),
            ]
        );
        let record = &view.groups()[0].messages[1];
        assert_eq!(record.message.content, "edited");
        assert_eq!(record.annotation.last_edit_timestr.as_deref(), Some("Jan 1, 1970 at 00:03"));
        assert!(matches!(
            surface.header_of(1),
            Some(RecipientHeader::Stream { topic, .. }) if topic == "renamed"
        ));
    }

    #[test]
    fn test_change_message_id_rekeys_everything() {
        let mut local = stream_msg(100, "dev", "ci", "me@x.com", 130);
        local.local = true;
        let feed = Feed::from_messages(vec![stream_msg(1, "dev", "ci", "a@x.com", 100), local]);
        let mut view = test_view(ViewSettings::default());
        let mut surface = RecordingSurface::new(20);
        view.append(&feed, &mut surface, feed.messages(), RenderOptions::foreground());
        surface.selected = Some(MessageId(100));

        assert!(view.change_message_id(MessageId(100), MessageId(2), &mut surface));
        assert_eq!(view.row(MessageId(100)), None);
        assert!(view.row(MessageId(2)).is_some());
        let record = &view.groups()[0].messages[1];
        assert_eq!(record.id(), MessageId(2));
        assert!(!record.message.local);
        assert_eq!(surface.rendered(), vec![vec![1, 2]]);
        assert_eq!(surface.selected, Some(MessageId(2)));

        assert!(!view.change_message_id(MessageId(100), MessageId(3), &mut surface));
        assert_rows_consistent(&view);

        // Both ids rendered: the rekey is refused.
        let first = view.row(MessageId(1));
        assert!(!view.change_message_id(MessageId(2), MessageId(1), &mut surface));
        assert_eq!(view.row(MessageId(1)), first);
        assert!(view.row(MessageId(2)).is_some());
        assert_eq!(view.groups()[0].messages[1].id(), MessageId(2));
        assert_rows_consistent(&view);
    }

    #[test]
    fn test_toggle_collapse_rebuilds() {
        let feed = Feed::from_messages(vec![
            stream_msg(1, "dev", "ci", "a@x.com", 100),
            stream_msg(2, "dev", "ci", "a@x.com", 110),
            stream_msg(3, "dev", "ci", "a@x.com", 120),
        ]);
        let mut view = test_view(ViewSettings::default());
        let mut surface = RecordingSurface::new(20);
        view.append(&feed, &mut surface, feed.messages(), RenderOptions::foreground());
        assert_eq!(partition(&view), vec![vec![1, 2, 3]]);

        let report = view.set_collapse_messages(false, &feed, &mut surface);
        assert!(report.rerendered);
        assert_eq!(partition(&view), vec![vec![1], vec![2], vec![3]]);
        assert_eq!(surface.rendered(), vec![vec![1], vec![2], vec![3]]);
        assert!(surface.calls.contains(&Call::Clear));

        let report = view.set_collapse_messages(false, &feed, &mut surface);
        assert!(!report.rerendered);
    }

    #[test]
    fn test_trailing_bookend_after_historical_tail() {
        let mut old = stream_msg(2, "dev", "ci", "a@x.com", 110);
        old.historical = true;
        let feed = Feed::from_messages(vec![stream_msg(1, "dev", "ci", "a@x.com", 100), old]);

        let mut view = test_view(ViewSettings::default());
        let mut surface = RecordingSurface::new(20);
        view.append(&feed, &mut surface, feed.messages(), RenderOptions::foreground());
        assert!(view.last_message_historical());
        assert_eq!(
            surface.trailing.as_ref().map(|b| b.kind),
            Some(BookendKind::Unsubscribed)
        );

        let mut home = test_view(ViewSettings {
            home_view: true,
            ..ViewSettings::default()
        });
        let mut surface = RecordingSurface::new(20);
        home.append(&feed, &mut surface, feed.messages(), RenderOptions::foreground());
        assert!(surface.trailing.is_none());
    }

    #[test]
    fn test_empty_batch_is_noop() {
        let feed = Feed::new();
        let mut view = test_view(ViewSettings::default());
        let mut surface = RecordingSurface::new(20);
        let report = view.render(&feed, &mut surface, &[], Side::Bottom, RenderOptions::live());
        assert!(report.rendered.is_empty());
        assert!(surface.calls.is_empty());
    }

    #[test]
    fn test_invalid_window_settings_rejected() {
        let view = MessageListView::new(
            ViewSettings {
                window_size: 10,
                threshold: 5,
                ..ViewSettings::default()
            },
            Box::new(crate::core::time::LocalClock::utc()),
            Box::new(crate::core::collaborators::StaticMetadata::default()),
        );
        assert!(view.is_err());
    }

    #[test]
    fn test_private_messages_group_regardless_of_order() {
        let a = Recipient::Private {
            participants: vec!["a@x.com".into(), "me@x.com".into()],
        };
        let b = Recipient::Private {
            participants: vec!["me@x.com".into(), "A@x.com".into()],
        };
        let mut m1 = stream_msg(1, "", "", "a@x.com", 100);
        m1.recipient = Some(a);
        let mut m2 = stream_msg(2, "", "", "me@x.com", 110);
        m2.recipient = Some(b);
        let feed = Feed::from_messages(vec![m1, m2]);
        let mut view = test_view(ViewSettings::default());
        let mut surface = RecordingSurface::new(20);
        view.append(&feed, &mut surface, feed.messages(), RenderOptions::foreground());
        assert_eq!(partition(&view), vec![vec![1, 2]]);
    }
}
