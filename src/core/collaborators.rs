//! # Collaborator Contracts
//!
//! The engine's whole boundary. Nothing here knows how a row is drawn or
//! where messages come from.
//!
//! ```text
//!              ┌──────────────────────┐
//! FeedSource ─▶│   MessageListView    │─▶ Presenter  (materialize actions)
//! Metadata   ─▶│  (core::view)        │◀▶ Viewport   (selection, geometry)
//! DayClock   ─▶│                      │
//!              └──────────────────────┘
//! ```

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;

use crate::core::message::{
    AnnotatedMessage, Bookend, GroupId, Message, MessageGroup, MessageId, RecipientHeader,
};
use crate::core::rows::RowHandle;

// ============================================================================
// Logical list
// ============================================================================

/// The full ordered message list a view renders a window of.
pub trait FeedSource {
    fn messages(&self) -> &[Arc<Message>];

    fn index_of(&self, id: MessageId) -> Option<usize>;

    fn get(&self, id: MessageId) -> Option<&Arc<Message>> {
        self.index_of(id).and_then(|idx| self.messages().get(idx))
    }

    fn len(&self) -> usize {
        self.messages().len()
    }

    fn is_empty(&self) -> bool {
        self.messages().is_empty()
    }

    fn last(&self) -> Option<&Arc<Message>> {
        self.messages().last()
    }
}

// ============================================================================
// Identity / metadata
// ============================================================================

/// Read-only lookups used while annotating. Every method is a pure function
/// of the message and the collaborator's own data.
pub trait Metadata {
    /// Absent recipients never match, so malformed messages get a header.
    fn same_recipient(&self, a: &Message, b: &Message) -> bool {
        match (&a.recipient, &b.recipient) {
            (Some(ra), Some(rb)) => ra.matches(rb),
            _ => false,
        }
    }

    fn same_sender(&self, a: &Message, b: &Message) -> bool {
        match (&a.sender, &b.sender) {
            (Some(sa), Some(sb)) => sa.matches(sb),
            _ => false,
        }
    }

    /// Authored by the local viewer.
    fn is_own(&self, message: &Message) -> bool;

    fn stream_color(&self, _stream: &str) -> Option<String> {
        None
    }

    fn invite_only(&self, _stream: &str) -> bool {
        false
    }

    fn mentions_me(&self, message: &Message) -> bool {
        message.has_flag("mentioned") || message.has_flag("wildcard_mentioned")
    }

    fn is_unread(&self, message: &Message) -> bool {
        !message.has_flag("read")
    }

    fn avatar_url(&self, _message: &Message) -> Option<String> {
        None
    }

    fn bookend_content(&self, stream: Option<&str>, subscribed: bool) -> String {
        match (stream, subscribed) {
            (Some(s), true) => format!("--- Subscribed to {s} ---"),
            (Some(s), false) => format!("--- Unsubscribed from {s} ---"),
            (None, true) => String::from("--- Subscribed ---"),
            (None, false) => String::from("--- Not subscribed ---"),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct StreamInfo {
    pub color: Option<String>,
    pub invite_only: bool,
}

/// Metadata backed by fixed tables, typically built from configuration.
#[derive(Debug, Clone, Default)]
pub struct StaticMetadata {
    pub my_email: Option<String>,
    /// Keyed by lowercased stream name.
    pub streams: HashMap<String, StreamInfo>,
    /// Avatar URL by lowercased sender email.
    pub avatars: HashMap<String, String>,
    /// Overrides the message's own `read` flag.
    pub read: HashSet<MessageId>,
}

impl StaticMetadata {
    pub fn for_user(email: impl Into<String>) -> Self {
        Self {
            my_email: Some(email.into()),
            ..Default::default()
        }
    }

    pub fn with_stream(mut self, name: &str, info: StreamInfo) -> Self {
        self.streams.insert(name.to_lowercase(), info);
        self
    }
}

impl Metadata for StaticMetadata {
    fn is_own(&self, message: &Message) -> bool {
        match (&self.my_email, &message.sender) {
            (Some(me), Some(sender)) => sender.email.eq_ignore_ascii_case(me),
            _ => false,
        }
    }

    fn stream_color(&self, stream: &str) -> Option<String> {
        self.streams
            .get(&stream.to_lowercase())
            .and_then(|info| info.color.clone())
    }

    fn invite_only(&self, stream: &str) -> bool {
        self.streams
            .get(&stream.to_lowercase())
            .is_some_and(|info| info.invite_only)
    }

    fn is_unread(&self, message: &Message) -> bool {
        !message.has_flag("read") && !self.read.contains(&message.id)
    }

    fn avatar_url(&self, message: &Message) -> Option<String> {
        let sender = message.sender.as_ref()?;
        self.avatars.get(&sender.email.to_lowercase()).cloned()
    }
}

// ============================================================================
// Presentation
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenderError {
    /// The presenter could not materialize a message row.
    Row { id: MessageId, reason: String },
    /// The presenter has no rendered group with this id.
    Group { id: GroupId, reason: String },
    /// A row handle the core still held no longer resolves.
    StaleRow { id: MessageId },
}

impl fmt::Display for RenderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RenderError::Row { id, reason } => write!(f, "failed to render message {id}: {reason}"),
            RenderError::Group { id, reason } => write!(f, "failed to render {id}: {reason}"),
            RenderError::StaleRow { id } => write!(f, "stale row for message {id}"),
        }
    }
}

impl std::error::Error for RenderError {}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderedRow {
    pub id: MessageId,
    pub handle: RowHandle,
}

/// Per-row result of a presenter call.
pub type RowOutcome = Result<RenderedRow, RenderError>;

/// Something the presenter inserted, in document order, with its height.
/// `message_id` is `None` for date rows, headers and bookends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InsertedElement {
    pub message_id: Option<MessageId>,
    pub height: i32,
}

#[derive(Debug, Default)]
pub struct Materialized {
    pub rows: Vec<RowOutcome>,
    pub inserted: Vec<InsertedElement>,
}

/// Executes render actions. Groups are replaced by [`GroupId`], rows by
/// [`RowHandle`]; bulk inserts keep the order they are given.
pub trait Presenter {
    /// Drop everything rendered.
    fn clear(&mut self);

    fn prepend_groups(&mut self, groups: &[MessageGroup]) -> Materialized;

    fn append_groups(&mut self, groups: &[MessageGroup]) -> Materialized;

    /// Replace the rendered group carrying `group.id` in place.
    fn replace_group(&mut self, group: &MessageGroup) -> Materialized;

    /// Append rows to the last rendered group.
    fn append_messages(&mut self, messages: &[AnnotatedMessage]) -> Materialized;

    fn replace_message(&mut self, handle: RowHandle, message: &AnnotatedMessage) -> RowOutcome;

    /// Redraw the recipient bar of the group whose first row is `first_row`.
    fn replace_header(
        &mut self,
        first_row: RowHandle,
        header: &RecipientHeader,
    ) -> Result<(), RenderError>;

    fn rekey_row(&mut self, handle: RowHandle, new_id: MessageId);

    /// Remove the trailing bookend; it is redrawn after appending.
    fn clear_trailing_bookend(&mut self) {}

    /// Marker after the last group, e.g. "not subscribed".
    fn render_trailing_bookend(&mut self, _bookend: &Bookend) {}
}

// ============================================================================
// Selection / viewport
// ============================================================================

/// Vertical extent in document coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RowGeometry {
    pub top: i32,
    pub height: i32,
}

impl RowGeometry {
    pub fn bottom(&self) -> i32 {
        self.top + self.height
    }
}

/// Visible part of the document: `top` is the scroll offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VisibleArea {
    pub top: i32,
    pub height: i32,
}

impl VisibleArea {
    pub fn bottom(&self) -> i32 {
        self.top + self.height
    }
}

pub trait Viewport {
    fn selected_id(&self) -> Option<MessageId>;

    fn select(&mut self, id: MessageId);

    /// Geometry of a rendered row, `None` when not rendered.
    fn row_geometry(&self, id: MessageId) -> Option<RowGeometry>;

    /// The last message row at least partly inside the visible area.
    fn last_visible(&self) -> Option<(MessageId, RowGeometry)>;

    fn visible_area(&self) -> VisibleArea;

    fn scroll_to_selected(&mut self);

    /// System-initiated scroll, positive moves content up.
    fn scroll_by(&mut self, amount: i32);

    /// Scroll so the selected row sits `offset` below the visible top.
    fn set_message_offset(&mut self, offset: i32);
}

/// Everything a view draws on.
pub trait Surface: Presenter + Viewport {}

impl<T: Presenter + Viewport + ?Sized> Surface for T {}
