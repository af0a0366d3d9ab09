//! # Messages and Groups
//!
//! The data the engine works on.
//!
//! ```text
//! Feed (caller)             MessageListView (per view)
//! ├── Arc<Message> ──────┐  └── MessageGroup
//! ├── Arc<Message> ──────┼──────├── AnnotatedMessage { message, annotation }
//! └── ...                └──────└── AnnotatedMessage { message, annotation }
//! ```
//!
//! Messages are shared and never mutated by the engine. Everything the
//! engine derives for display lives in a [`MessageAnnotation`] owned by the
//! view that computed it, so two views over the same feed cannot step on
//! each other.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

/// Unique, orderable message identity.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(transparent)]
pub struct MessageId(pub u64);

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Where a message was sent.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Recipient {
    Stream { stream: String, topic: String },
    Private { participants: Vec<String> },
}

impl Recipient {
    /// Recipient equality as users perceive it: stream and topic names are
    /// case-insensitive, private participant sets are unordered.
    pub fn matches(&self, other: &Recipient) -> bool {
        match (self, other) {
            (
                Recipient::Stream { stream: a, topic: ta },
                Recipient::Stream { stream: b, topic: tb },
            ) => a.to_lowercase() == b.to_lowercase() && ta.to_lowercase() == tb.to_lowercase(),
            (
                Recipient::Private { participants: a },
                Recipient::Private { participants: b },
            ) => normalized_participants(a) == normalized_participants(b),
            _ => false,
        }
    }

    pub fn stream(&self) -> Option<&str> {
        match self {
            Recipient::Stream { stream, .. } => Some(stream),
            Recipient::Private { .. } => None,
        }
    }
}

fn normalized_participants(participants: &[String]) -> Vec<String> {
    let mut out: Vec<String> = participants.iter().map(|p| p.to_lowercase()).collect();
    out.sort();
    out.dedup();
    out
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Sender {
    pub email: String,
    #[serde(default)]
    pub full_name: String,
}

impl Sender {
    pub fn matches(&self, other: &Sender) -> bool {
        self.email.eq_ignore_ascii_case(&other.email)
    }

    /// Name to show in a sender line; falls back to the email.
    pub fn display_name(&self) -> &str {
        if self.full_name.is_empty() {
            &self.email
        } else {
            &self.full_name
        }
    }
}

/// A chat message as delivered by the caller's data source.
///
/// Every field but `id` may be missing in serialized form; the engine
/// renders such messages with safe defaults instead of rejecting them.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Message {
    pub id: MessageId,
    /// Epoch seconds.
    #[serde(default)]
    pub timestamp: i64,
    #[serde(default)]
    pub recipient: Option<Recipient>,
    #[serde(default)]
    pub sender: Option<Sender>,
    /// Predates the viewer's subscription to the recipient.
    #[serde(default)]
    pub historical: bool,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub is_me_message: bool,
    #[serde(default)]
    pub last_edit_timestamp: Option<i64>,
    #[serde(default)]
    pub flags: Vec<String>,
    /// Locally echoed; the durable id has not arrived yet.
    #[serde(default)]
    pub local: bool,
}

impl Message {
    pub fn has_flag(&self, flag: &str) -> bool {
        self.flags.iter().any(|f| f == flag)
    }
}

/// Display state derived for one message in one view.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MessageAnnotation {
    pub include_recipient: bool,
    pub include_sender: bool,
    pub include_footer: bool,
    /// The following row has the same sender, so this row can drop
    /// its trailing sender chrome.
    pub next_is_same_sender: bool,
    pub timestr: String,
    /// Rendered date token when this message starts a new calendar day.
    pub date_marker: Option<String>,
    pub last_edit_timestr: Option<String>,
    /// Body of a `/me` message, shown in place of the sender line.
    pub status_message: Option<String>,
    pub contains_mention: bool,
    pub unread: bool,
    pub background_color: Option<String>,
    pub small_avatar_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AnnotatedMessage {
    pub message: Arc<Message>,
    pub annotation: MessageAnnotation,
}

impl AnnotatedMessage {
    pub fn id(&self) -> MessageId {
        self.message.id
    }

    pub fn is_status(&self) -> bool {
        self.annotation.status_message.is_some()
    }
}

/// Stable identity of a rendered group, used for in-place replacement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GroupId(pub u64);

impl fmt::Display for GroupId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "message_group_{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BookendKind {
    Subscribed,
    Unsubscribed,
}

/// Marker between groups where the viewer's subscription state flips.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bookend {
    pub kind: BookendKind,
    pub stream: Option<String>,
    pub content: String,
}

/// Recipient bar shown above a group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecipientHeader {
    Stream {
        stream: String,
        topic: String,
        color: Option<String>,
        invite_only: bool,
    },
    Private {
        participants: Vec<String>,
    },
    /// The first message carried no recipient.
    Unknown,
}

impl RecipientHeader {
    pub fn label(&self) -> String {
        match self {
            RecipientHeader::Stream { stream, topic, .. } => format!("{stream} > {topic}"),
            RecipientHeader::Private { participants } => {
                format!("You and {}", participants.join(", "))
            }
            RecipientHeader::Unknown => String::from("(unknown recipient)"),
        }
    }
}

/// A contiguous run of messages rendered under one recipient header.
#[derive(Debug, Clone, PartialEq)]
pub struct MessageGroup {
    pub id: GroupId,
    pub header: RecipientHeader,
    pub show_date: Option<String>,
    pub bookend_top: Option<Bookend>,
    pub bookend_bottom: Option<Bookend>,
    pub messages: Vec<AnnotatedMessage>,
}

impl MessageGroup {
    pub fn new(id: GroupId) -> Self {
        Self {
            id,
            header: RecipientHeader::Unknown,
            show_date: None,
            bookend_top: None,
            bookend_bottom: None,
            messages: Vec::new(),
        }
    }

    pub fn first(&self) -> Option<&AnnotatedMessage> {
        self.messages.first()
    }

    pub fn last(&self) -> Option<&AnnotatedMessage> {
        self.messages.last()
    }

    pub fn message_ids(&self) -> Vec<MessageId> {
        self.messages.iter().map(AnnotatedMessage::id).collect()
    }
}

/// Which end of the rendered list a batch lands on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Top,
    Bottom,
}
