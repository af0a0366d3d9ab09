//! # Group Merger
//!
//! Reconciles freshly built groups with the groups already rendered and
//! decides what the presenter has to do. Only the touching boundary is
//! ever inspected.
//!
//! ```text
//! bottom:  existing [.. G_last] + new [G_0 ..]
//!            join  → extend G_last in place, rerender its old tail row,
//!                    append G_0's rows, append G_1.. as groups
//!            split → append G_0.. as groups (G_last rerendered if it
//!                    gained a bookend)
//!
//! top:     new [.. G_k] + existing [G_first ..]
//!            join  → G_k absorbs G_first under G_first's id, rerendered;
//!                    G_0..G_k-1 prepended
//!            split → prepend G_0..G_k (G_first rerendered if its date
//!                    separator changed)
//! ```

use std::mem;

use crate::core::annotate::Annotator;
use crate::core::grouper::subscription_bookend;
use crate::core::message::{AnnotatedMessage, MessageGroup, Side};

/// Everything the presenter has to do for one batch.
#[derive(Debug, Default)]
pub struct MessageActions {
    pub prepend_groups: Vec<MessageGroup>,
    pub append_groups: Vec<MessageGroup>,
    /// Rendered groups to replace in place, matched by id.
    pub rerender_groups: Vec<MessageGroup>,
    /// Rows to add to the end of the last rendered group.
    pub append_messages: Vec<AnnotatedMessage>,
    pub rerender_messages: Vec<AnnotatedMessage>,
}

impl MessageActions {
    pub fn is_empty(&self) -> bool {
        self.prepend_groups.is_empty()
            && self.append_groups.is_empty()
            && self.rerender_groups.is_empty()
            && self.append_messages.is_empty()
            && self.rerender_messages.is_empty()
    }
}

pub struct GroupMerger<'a> {
    annotator: Annotator<'a>,
    home_view: bool,
}

impl<'a> GroupMerger<'a> {
    pub fn new(annotator: Annotator<'a>, home_view: bool) -> Self {
        Self {
            annotator,
            home_view,
        }
    }

    /// Fold `new_groups` into `existing` on `side` and return the actions
    /// that bring a presenter showing the old `existing` up to date.
    pub fn merge(
        &self,
        existing: &mut Vec<MessageGroup>,
        new_groups: Vec<MessageGroup>,
        side: Side,
    ) -> MessageActions {
        match side {
            Side::Bottom => self.merge_bottom(existing, new_groups),
            Side::Top => self.merge_top(existing, new_groups),
        }
    }

    fn merge_bottom(
        &self,
        existing: &mut Vec<MessageGroup>,
        mut new_groups: Vec<MessageGroup>,
    ) -> MessageActions {
        let mut actions = MessageActions::default();

        if let (Some(earlier), Some(later)) = (existing.last_mut(), new_groups.first_mut()) {
            if self.joins(earlier, later) {
                let mut joined = new_groups.remove(0);
                self.join(earlier, &mut joined);
                if let Some(old_tail) = earlier.messages.last() {
                    actions.rerender_messages.push(old_tail.clone());
                }
                actions.append_messages = joined.messages.clone();
                earlier.messages.append(&mut joined.messages);
            } else {
                let outcome = self.split(earlier, later);
                if outcome.earlier_group_changed {
                    actions.rerender_groups.push(earlier.clone());
                } else if outcome.earlier_tail_changed {
                    if let Some(tail) = earlier.messages.last() {
                        actions.rerender_messages.push(tail.clone());
                    }
                }
            }
        }

        actions.append_groups = new_groups.clone();
        existing.extend(new_groups);
        actions
    }

    fn merge_top(
        &self,
        existing: &mut Vec<MessageGroup>,
        mut new_groups: Vec<MessageGroup>,
    ) -> MessageActions {
        let mut actions = MessageActions::default();

        if let (Some(earlier), Some(later)) = (new_groups.last_mut(), existing.first_mut()) {
            if self.joins(earlier, later) {
                let mut fused = new_groups.pop().unwrap_or_else(|| MessageGroup::new(later.id));
                self.join(&mut fused, later);
                fused.id = later.id;
                fused.bookend_bottom = later.bookend_bottom.take();
                fused.messages.append(&mut later.messages);
                *later = fused;
                actions.rerender_groups.push(later.clone());
            } else {
                let outcome = self.split(earlier, later);
                if outcome.later_group_changed {
                    actions.rerender_groups.push(later.clone());
                }
            }
        }

        actions.prepend_groups = new_groups.clone();
        let rest = mem::take(existing);
        *existing = new_groups;
        existing.extend(rest);
        actions
    }

    fn joins(&self, earlier: &MessageGroup, later: &MessageGroup) -> bool {
        match (earlier.last(), later.first()) {
            (Some(last), Some(first)) => self
                .annotator
                .continues_group(Some(&last.message), &first.message),
            _ => false,
        }
    }

    /// Apply the boundary flags for a join; the caller moves the messages.
    fn join(&self, earlier: &mut MessageGroup, later: &mut MessageGroup) {
        let metadata = self.annotator.metadata;
        let (Some(last), Some(first)) = (earlier.messages.last_mut(), later.messages.first_mut())
        else {
            return;
        };

        if metadata.same_sender(&last.message, &first.message) {
            if !last.is_status() && !first.is_status() {
                first.annotation.include_sender = false;
            }
            last.annotation.next_is_same_sender = true;
        }
        first.annotation.include_recipient = false;
        first.annotation.date_marker = None;
        last.annotation.include_footer = false;
    }

    /// Fix up two groups that stay separate across the boundary.
    fn split(&self, earlier: &mut MessageGroup, later: &mut MessageGroup) -> SplitOutcome {
        let mut outcome = SplitOutcome::default();
        let metadata = self.annotator.metadata;
        let (Some(last), Some(first)) = (earlier.messages.last_mut(), later.messages.first_mut())
        else {
            return outcome;
        };

        if !self.home_view {
            if let Some(bookend) = subscription_bookend(metadata, &last.message, &first.message) {
                if earlier.bookend_bottom.as_ref() != Some(&bookend) {
                    earlier.bookend_bottom = Some(bookend);
                    outcome.earlier_group_changed = true;
                }
            }
        }

        if metadata.same_sender(&last.message, &first.message) && !last.annotation.next_is_same_sender {
            last.annotation.next_is_same_sender = true;
            outcome.earlier_tail_changed = true;
        }

        let marker = self.annotator.date_marker(&first.message, Some(&last.message));
        if first.annotation.date_marker != marker || later.show_date != marker {
            first.annotation.date_marker = marker.clone();
            later.show_date = marker;
            outcome.later_group_changed = true;
        }

        outcome
    }
}

#[derive(Debug, Default)]
struct SplitOutcome {
    earlier_group_changed: bool,
    earlier_tail_changed: bool,
    later_group_changed: bool,
}
