//! # Annotation Step
//!
//! Derives the per-message display fields for one view. Pure apart from the
//! timestring memo, which is keyed by message id and only recomputed when
//! the message's timestamp changes.

use std::collections::HashMap;
use std::sync::Arc;

use crate::core::collaborators::Metadata;
use crate::core::message::{AnnotatedMessage, Message, MessageAnnotation, MessageId};
use crate::core::time::DayClock;

const ME_PREFIX: &str = "/me ";

/// Memoized display times, one per message id.
#[derive(Debug, Default)]
pub struct TimeStrings {
    memo: HashMap<MessageId, (i64, String)>,
}

impl TimeStrings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_or_format(&mut self, clock: &dyn DayClock, id: MessageId, timestamp: i64) -> String {
        match self.memo.get(&id) {
            Some((ts, timestr)) if *ts == timestamp => timestr.clone(),
            _ => {
                let timestr = clock.format_time(timestamp);
                self.memo.insert(id, (timestamp, timestr.clone()));
                timestr
            }
        }
    }

    pub fn rekey(&mut self, old: MessageId, new: MessageId) {
        if let Some(entry) = self.memo.remove(&old) {
            self.memo.insert(new, entry);
        }
    }

    pub fn clear(&mut self) {
        self.memo.clear();
    }

    pub fn len(&self) -> usize {
        self.memo.len()
    }

    pub fn is_empty(&self) -> bool {
        self.memo.is_empty()
    }
}

/// Borrowed view of the collaborators and policy annotation depends on.
#[derive(Clone, Copy)]
pub struct Annotator<'a> {
    pub clock: &'a dyn DayClock,
    pub metadata: &'a dyn Metadata,
    pub collapse_messages: bool,
}

impl<'a> Annotator<'a> {
    pub fn new(clock: &'a dyn DayClock, metadata: &'a dyn Metadata, collapse_messages: bool) -> Self {
        Self {
            clock,
            metadata,
            collapse_messages,
        }
    }

    /// Whether `message` may share a group with `prev`, the message before
    /// it. Used for grouping a batch and for joining at batch boundaries.
    pub fn continues_group(&self, prev: Option<&Message>, message: &Message) -> bool {
        let Some(prev) = prev else {
            return false;
        };
        self.collapse_messages
            && self.metadata.same_recipient(prev, message)
            && prev.historical == message.historical
            && self.clock.same_day(prev.timestamp, message.timestamp)
    }

    /// Date separator for a message starting a new day, or the first one.
    pub fn date_marker(&self, message: &Message, prev: Option<&Message>) -> Option<String> {
        match prev {
            None => Some(self.clock.render_date(message.timestamp, None)),
            Some(p) if !self.clock.same_day(p.timestamp, message.timestamp) => {
                Some(self.clock.render_date(message.timestamp, Some(p.timestamp)))
            }
            Some(_) => None,
        }
    }

    /// Compute the annotation for `message` following `prev`.
    ///
    /// `include_recipient` is decided by the caller (it is the grouping
    /// decision). `include_footer` and `next_is_same_sender` describe the
    /// message's successors and are left false here.
    pub fn annotate(
        &self,
        times: &mut TimeStrings,
        message: &Arc<Message>,
        prev: Option<&AnnotatedMessage>,
        include_recipient: bool,
    ) -> MessageAnnotation {
        let status_message = message
            .is_me_message
            .then(|| strip_me_prefix(&message.content).to_string());

        let include_sender = status_message.is_some()
            || match prev {
                Some(p) => {
                    include_recipient
                        || p.is_status()
                        || !self.metadata.same_sender(&p.message, message)
                }
                None => true,
            };

        let stream = message.recipient.as_ref().and_then(|r| r.stream());

        MessageAnnotation {
            include_recipient,
            include_sender,
            include_footer: false,
            next_is_same_sender: false,
            timestr: times.get_or_format(self.clock, message.id, message.timestamp),
            date_marker: self.date_marker(message, prev.map(|p| p.message.as_ref())),
            last_edit_timestr: self.last_edit_timestr(message),
            status_message,
            contains_mention: self.metadata.mentions_me(message),
            unread: self.metadata.is_unread(message),
            background_color: stream.and_then(|s| self.metadata.stream_color(s)),
            small_avatar_url: self.metadata.avatar_url(message),
        }
    }

    /// Refresh the fields that depend only on the message itself, keeping
    /// the grouping-derived flags. Used when a rendered message is edited.
    pub fn refresh(&self, times: &mut TimeStrings, record: &mut AnnotatedMessage, message: Arc<Message>) {
        let a = &mut record.annotation;
        a.timestr = times.get_or_format(self.clock, message.id, message.timestamp);
        a.last_edit_timestr = self.last_edit_timestr(&message);
        a.status_message = message
            .is_me_message
            .then(|| strip_me_prefix(&message.content).to_string());
        if a.status_message.is_some() {
            a.include_sender = true;
        }
        a.contains_mention = self.metadata.mentions_me(&message);
        a.unread = self.metadata.is_unread(&message);
        a.background_color = message
            .recipient
            .as_ref()
            .and_then(|r| r.stream())
            .and_then(|s| self.metadata.stream_color(s));
        a.small_avatar_url = self.metadata.avatar_url(&message);
        record.message = message;
    }

    fn last_edit_timestr(&self, message: &Message) -> Option<String> {
        message.last_edit_timestamp.map(|ts| {
            format!(
                "{} at {}",
                self.clock.render_date(ts, None),
                self.clock.format_time(ts)
            )
        })
    }
}

fn strip_me_prefix(content: &str) -> &str {
    content.strip_prefix(ME_PREFIX).unwrap_or(content)
}
