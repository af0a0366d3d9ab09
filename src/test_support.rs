//! Test utilities shared across the crate.
//!
//! This module is only compiled during tests (`#[cfg(test)]`).

use std::collections::HashSet;
use std::sync::Arc;

use crate::core::collaborators::{
    InsertedElement, Materialized, Presenter, RenderError, RenderedRow, RowGeometry, RowOutcome,
    StaticMetadata, Viewport, VisibleArea,
};
use crate::core::message::{
    AnnotatedMessage, Bookend, GroupId, Message, MessageGroup, MessageId, Recipient,
    RecipientHeader, Sender,
};
use crate::core::rows::RowHandle;
use crate::core::time::LocalClock;
use crate::core::view::{MessageListView, ViewSettings};

// ============================================================================
// Message fixtures
// ============================================================================

/// A message with nothing but an id.
pub fn msg(id: u64) -> Message {
    Message {
        id: MessageId(id),
        timestamp: 0,
        recipient: None,
        sender: None,
        historical: false,
        content: String::new(),
        is_me_message: false,
        last_edit_timestamp: None,
        flags: Vec::new(),
        local: false,
    }
}

pub fn stream_msg(id: u64, stream: &str, topic: &str, sender: &str, timestamp: i64) -> Message {
    Message {
        timestamp,
        recipient: Some(Recipient::Stream {
            stream: stream.into(),
            topic: topic.into(),
        }),
        sender: Some(Sender {
            email: sender.into(),
            full_name: String::new(),
        }),
        content: format!("message {id}"),
        ..msg(id)
    }
}

pub fn private_msg(id: u64, participants: &[&str], sender: &str, timestamp: i64) -> Message {
    Message {
        recipient: Some(Recipient::Private {
            participants: participants.iter().map(|p| p.to_string()).collect(),
        }),
        ..stream_msg(id, "", "", sender, timestamp)
    }
}

pub fn arcs(messages: Vec<Message>) -> Vec<Arc<Message>> {
    messages.into_iter().map(Arc::new).collect()
}

/// `n` messages, `run` at a time to the same topic, ids starting at 1.
pub fn topic_runs(n: u64, run: u64) -> Vec<Message> {
    (1..=n)
        .map(|id| {
            let topic = format!("t{}", (id - 1) / run.max(1));
            stream_msg(id, "dev", &topic, "a@x.com", 1_000 + id as i64)
        })
        .collect()
}

pub fn test_view(settings: ViewSettings) -> MessageListView {
    let view = MessageListView::new(
        settings,
        Box::new(LocalClock::utc()),
        Box::new(StaticMetadata::for_user("me@x.com")),
    );
    match view {
        Ok(view) => view,
        Err(e) => panic!("bad test settings: {e}"),
    }
}

// ============================================================================
// Recording surface
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Clear,
    PrependGroups(Vec<GroupId>),
    AppendGroups(Vec<GroupId>),
    ReplaceGroup(GroupId),
    AppendMessages(Vec<MessageId>),
    ReplaceMessage(MessageId),
    ReplaceHeader(MessageId),
    RekeyRow(MessageId),
    RenderTrailingBookend,
    Select(MessageId),
    ScrollBy(i32),
    SetMessageOffset(i32),
}

#[derive(Debug, Clone)]
struct Row {
    id: MessageId,
    handle: RowHandle,
}

#[derive(Debug, Clone)]
struct Block {
    id: GroupId,
    dated: bool,
    header: RecipientHeader,
    rows: Vec<Row>,
}

/// Presenter and viewport in one, with every element one line tall.
#[derive(Debug)]
pub struct RecordingSurface {
    pub calls: Vec<Call>,
    pub selected: Option<MessageId>,
    pub scroll_top: i32,
    pub height: i32,
    /// Rows for these ids fail to materialize.
    pub failing: HashSet<MessageId>,
    pub trailing: Option<Bookend>,
    blocks: Vec<Block>,
    next_handle: u64,
}

impl RecordingSurface {
    pub fn new(height: i32) -> Self {
        Self {
            calls: Vec::new(),
            selected: None,
            scroll_top: 0,
            height,
            failing: HashSet::new(),
            trailing: None,
            blocks: Vec::new(),
            next_handle: 0,
        }
    }

    /// Message ids per rendered group, in document order.
    pub fn rendered(&self) -> Vec<Vec<u64>> {
        self.blocks
            .iter()
            .map(|b| b.rows.iter().map(|r| r.id.0).collect())
            .collect()
    }

    pub fn header_of(&self, group: usize) -> Option<&RecipientHeader> {
        self.blocks.get(group).map(|b| &b.header)
    }

    fn materialize(&mut self, messages: &[AnnotatedMessage], out: &mut Materialized) -> Vec<Row> {
        let mut rows = Vec::new();
        for message in messages {
            let outcome = self.materialize_one(message);
            if let Ok(row) = &outcome {
                rows.push(Row {
                    id: row.id,
                    handle: row.handle,
                });
                out.inserted.push(InsertedElement {
                    message_id: Some(row.id),
                    height: 1,
                });
            }
            out.rows.push(outcome);
        }
        rows
    }

    fn materialize_one(&mut self, message: &AnnotatedMessage) -> RowOutcome {
        if self.failing.contains(&message.id()) {
            return Err(RenderError::Row {
                id: message.id(),
                reason: "refused".into(),
            });
        }
        self.next_handle += 1;
        Ok(RenderedRow {
            id: message.id(),
            handle: RowHandle(self.next_handle),
        })
    }

    fn build_blocks(&mut self, groups: &[MessageGroup]) -> (Vec<Block>, Materialized) {
        let mut out = Materialized::default();
        let mut blocks = Vec::new();
        for group in groups {
            let dated = group.show_date.is_some();
            if dated {
                out.inserted.push(InsertedElement {
                    message_id: None,
                    height: 1,
                });
            }
            out.inserted.push(InsertedElement {
                message_id: None,
                height: 1,
            });
            let rows = self.materialize(&group.messages, &mut out);
            blocks.push(Block {
                id: group.id,
                dated,
                header: group.header.clone(),
                rows,
            });
        }
        (blocks, out)
    }

    fn layout(&self) -> Vec<(MessageId, RowGeometry)> {
        let mut top = 0;
        let mut out = Vec::new();
        for block in &self.blocks {
            top += if block.dated { 2 } else { 1 };
            for row in &block.rows {
                out.push((row.id, RowGeometry { top, height: 1 }));
                top += 1;
            }
        }
        out
    }

    fn find_row_mut(&mut self, handle: RowHandle) -> Option<&mut Row> {
        self.blocks
            .iter_mut()
            .flat_map(|b| b.rows.iter_mut())
            .find(|r| r.handle == handle)
    }
}

impl Presenter for RecordingSurface {
    fn clear(&mut self) {
        self.calls.push(Call::Clear);
        self.blocks.clear();
        self.trailing = None;
    }

    fn prepend_groups(&mut self, groups: &[MessageGroup]) -> Materialized {
        self.calls
            .push(Call::PrependGroups(groups.iter().map(|g| g.id).collect()));
        let (mut blocks, out) = self.build_blocks(groups);
        blocks.append(&mut self.blocks);
        self.blocks = blocks;
        out
    }

    fn append_groups(&mut self, groups: &[MessageGroup]) -> Materialized {
        self.calls
            .push(Call::AppendGroups(groups.iter().map(|g| g.id).collect()));
        let (blocks, out) = self.build_blocks(groups);
        self.blocks.extend(blocks);
        out
    }

    fn replace_group(&mut self, group: &MessageGroup) -> Materialized {
        self.calls.push(Call::ReplaceGroup(group.id));
        let Some(pos) = self.blocks.iter().position(|b| b.id == group.id) else {
            return Materialized {
                rows: vec![Err(RenderError::Group {
                    id: group.id,
                    reason: "not rendered".into(),
                })],
                inserted: Vec::new(),
            };
        };
        let (mut blocks, out) = self.build_blocks(std::slice::from_ref(group));
        if let Some(block) = blocks.pop() {
            self.blocks[pos] = block;
        }
        out
    }

    fn append_messages(&mut self, messages: &[AnnotatedMessage]) -> Materialized {
        self.calls
            .push(Call::AppendMessages(messages.iter().map(|m| m.id()).collect()));
        let mut out = Materialized::default();
        let rows = self.materialize(messages, &mut out);
        if let Some(block) = self.blocks.last_mut() {
            block.rows.extend(rows);
        }
        out
    }

    fn replace_message(&mut self, handle: RowHandle, message: &AnnotatedMessage) -> RowOutcome {
        self.calls.push(Call::ReplaceMessage(message.id()));
        if self.find_row_mut(handle).is_none() {
            return Err(RenderError::StaleRow { id: message.id() });
        }
        if self.failing.contains(&message.id()) {
            for block in &mut self.blocks {
                block.rows.retain(|r| r.handle != handle);
            }
            return Err(RenderError::Row {
                id: message.id(),
                reason: "refused".into(),
            });
        }
        Ok(RenderedRow {
            id: message.id(),
            handle,
        })
    }

    fn replace_header(
        &mut self,
        first_row: RowHandle,
        header: &RecipientHeader,
    ) -> Result<(), RenderError> {
        let block = self
            .blocks
            .iter_mut()
            .find(|b| b.rows.iter().any(|r| r.handle == first_row));
        match block {
            Some(block) => {
                let id = block
                    .rows
                    .iter()
                    .find(|r| r.handle == first_row)
                    .map(|r| r.id)
                    .unwrap_or(MessageId(0));
                block.header = header.clone();
                self.calls.push(Call::ReplaceHeader(id));
                Ok(())
            }
            None => Err(RenderError::StaleRow { id: MessageId(0) }),
        }
    }

    fn rekey_row(&mut self, handle: RowHandle, new_id: MessageId) {
        self.calls.push(Call::RekeyRow(new_id));
        let Some(row) = self.find_row_mut(handle) else {
            return;
        };
        let old_id = std::mem::replace(&mut row.id, new_id);
        if self.selected == Some(old_id) {
            self.selected = Some(new_id);
        }
    }

    fn render_trailing_bookend(&mut self, bookend: &Bookend) {
        self.calls.push(Call::RenderTrailingBookend);
        self.trailing = Some(bookend.clone());
    }

    fn clear_trailing_bookend(&mut self) {
        self.trailing = None;
    }
}

impl Viewport for RecordingSurface {
    fn selected_id(&self) -> Option<MessageId> {
        self.selected
    }

    fn select(&mut self, id: MessageId) {
        self.calls.push(Call::Select(id));
        self.selected = Some(id);
    }

    fn row_geometry(&self, id: MessageId) -> Option<RowGeometry> {
        self.layout()
            .into_iter()
            .find(|(row, _)| *row == id)
            .map(|(_, geometry)| geometry)
    }

    fn last_visible(&self) -> Option<(MessageId, RowGeometry)> {
        let visible = self.visible_area();
        self.layout()
            .into_iter()
            .filter(|(_, g)| g.top < visible.bottom() && g.bottom() > visible.top)
            .last()
    }

    fn visible_area(&self) -> VisibleArea {
        VisibleArea {
            top: self.scroll_top,
            height: self.height,
        }
    }

    fn scroll_to_selected(&mut self) {
        let Some(geometry) = self.selected.and_then(|id| self.row_geometry(id)) else {
            return;
        };
        if geometry.top < self.scroll_top {
            self.scroll_top = geometry.top;
        } else if geometry.bottom() > self.scroll_top + self.height {
            self.scroll_top = geometry.bottom() - self.height;
        }
    }

    fn scroll_by(&mut self, amount: i32) {
        self.calls.push(Call::ScrollBy(amount));
        self.scroll_top = (self.scroll_top + amount).max(0);
    }

    fn set_message_offset(&mut self, offset: i32) {
        self.calls.push(Call::SetMessageOffset(offset));
        if let Some(geometry) = self.selected.and_then(|id| self.row_geometry(id)) {
            self.scroll_top = (geometry.top - offset).max(0);
        }
    }
}
