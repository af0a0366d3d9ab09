//! # Grouper
//!
//! Partitions an ordered batch into [`MessageGroup`]s. Only ever looks at
//! the batch itself; reconciling with what is already rendered is the
//! merger's job.
//!
//! ```text
//! batch:  m1 m2 m3 │ m4 │ m5 m6
//!         └─ g1 ──┘ └g2┘ └ g3 ┘   (break = recipient, day, historicity,
//!                                   or collapsing disabled)
//! ```

use std::sync::Arc;

use crate::core::annotate::{Annotator, TimeStrings};
use crate::core::collaborators::Metadata;
use crate::core::message::{
    AnnotatedMessage, Bookend, BookendKind, GroupId, Message, MessageGroup, Recipient,
    RecipientHeader,
};

/// Hands out view-unique group ids.
#[derive(Debug, Default)]
pub struct GroupIds {
    next: u64,
}

impl GroupIds {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn allocate(&mut self) -> GroupId {
        self.next += 1;
        GroupId(self.next)
    }
}

/// Recipient bar contents for a group starting with `message`.
pub fn recipient_header(metadata: &dyn Metadata, message: &Message) -> RecipientHeader {
    match &message.recipient {
        Some(Recipient::Stream { stream, topic }) => RecipientHeader::Stream {
            stream: stream.clone(),
            topic: topic.clone(),
            color: metadata.stream_color(stream),
            invite_only: metadata.invite_only(stream),
        },
        Some(Recipient::Private { participants }) => RecipientHeader::Private {
            participants: participants.clone(),
        },
        None => RecipientHeader::Unknown,
    }
}

/// Marker for a subscription transition between `last` and `first`, if any.
pub fn subscription_bookend(metadata: &dyn Metadata, last: &Message, first: &Message) -> Option<Bookend> {
    if last.historical == first.historical {
        return None;
    }
    let stream = first.recipient.as_ref().and_then(|r| r.stream());
    let (kind, subscribed) = if first.historical {
        (BookendKind::Unsubscribed, false)
    } else {
        (BookendKind::Subscribed, true)
    };
    Some(Bookend {
        kind,
        stream: stream.map(str::to_string),
        content: metadata.bookend_content(stream, subscribed),
    })
}

pub struct Grouper<'a> {
    annotator: Annotator<'a>,
    home_view: bool,
}

impl<'a> Grouper<'a> {
    pub fn new(annotator: Annotator<'a>, home_view: bool) -> Self {
        Self {
            annotator,
            home_view,
        }
    }

    pub fn build(
        &self,
        times: &mut TimeStrings,
        ids: &mut GroupIds,
        messages: &[Arc<Message>],
    ) -> Vec<MessageGroup> {
        let metadata = self.annotator.metadata;
        let mut done: Vec<MessageGroup> = Vec::new();
        let mut current: Option<MessageGroup> = None;

        for message in messages {
            let prev = last_record(&done, current.as_ref()).map(|r| Arc::clone(&r.message));
            let continues = self.annotator.continues_group(prev.as_deref(), message);

            if !continues {
                if let Some(group) = current.take() {
                    finish_group(&mut done, group);
                }
                let mut group = MessageGroup::new(ids.allocate());
                group.header = recipient_header(metadata, message);
                if !self.home_view {
                    group.bookend_top = prev
                        .as_deref()
                        .and_then(|p| subscription_bookend(metadata, p, message));
                }
                current = Some(group);
            }

            let annotation = {
                let prev_record = last_record(&done, current.as_ref());
                self.annotator.annotate(times, message, prev_record, !continues)
            };

            if prev
                .as_deref()
                .is_some_and(|p| metadata.same_sender(p, message))
            {
                if let Some(record) = last_record_mut(&mut done, current.as_mut()) {
                    record.annotation.next_is_same_sender = true;
                }
            }

            if let Some(group) = current.as_mut() {
                if let Some(marker) = &annotation.date_marker {
                    group.show_date = Some(marker.clone());
                }
                group.messages.push(AnnotatedMessage {
                    message: Arc::clone(message),
                    annotation,
                });
            }
        }

        if let Some(group) = current {
            finish_group(&mut done, group);
        }
        done
    }
}

fn finish_group(done: &mut Vec<MessageGroup>, mut group: MessageGroup) {
    let Some(last) = group.messages.last_mut() else {
        return;
    };
    last.annotation.include_footer = true;
    done.push(group);
}

fn last_record<'g>(
    done: &'g [MessageGroup],
    current: Option<&'g MessageGroup>,
) -> Option<&'g AnnotatedMessage> {
    current
        .and_then(MessageGroup::last)
        .or_else(|| done.last().and_then(MessageGroup::last))
}

fn last_record_mut<'g>(
    done: &'g mut [MessageGroup],
    current: Option<&'g mut MessageGroup>,
) -> Option<&'g mut AnnotatedMessage> {
    match current {
        Some(group) if !group.messages.is_empty() => group.messages.last_mut(),
        _ => done.last_mut().and_then(|g| g.messages.last_mut()),
    }
}
