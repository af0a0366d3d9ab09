//! # Terminal Surface
//!
//! The engine's [`Presenter`] and [`Viewport`] for a terminal. Rendered
//! state is a list of group blocks, each holding pre-wrapped lines, so
//! geometry is a walk over line counts and drawing is a copy.
//!
//! ```text
//!   GroupBlock ┬ bookend_top?      ┐
//!              ├ date?             │ furniture (one inserted element)
//!              ├ header            ┘
//!              ├ RowBlock × n      one inserted element per row
//!              └ bookend_bottom?
//!   trailing bookend?
//! ```
//!
//! Line coordinates are content coordinates: line 0 is the top of the first
//! block, and `scroll_top` is the first content line on screen.

use std::sync::Arc;

use log::debug;
use ratatui::text::Line;

use crate::core::collaborators::{
    InsertedElement, Materialized, Presenter, RenderError, RenderedRow, RowGeometry, RowOutcome,
    Viewport, VisibleArea,
};
use crate::core::message::{AnnotatedMessage, Bookend, GroupId, MessageGroup, MessageId, RecipientHeader};
use crate::core::rows::RowHandle;
use crate::tui::components::message_row::{bookend_line, date_line, header_line, row_lines};

struct RowBlock {
    handle: RowHandle,
    record: AnnotatedMessage,
    lines: Vec<Line<'static>>,
}

struct GroupBlock {
    id: GroupId,
    group: MessageGroup,
    rows: Vec<RowBlock>,
}

impl GroupBlock {
    fn furniture(&self, width: u16) -> Vec<Line<'static>> {
        let mut lines = Vec::new();
        if let Some(bookend) = &self.group.bookend_top {
            lines.push(bookend_line(bookend));
        }
        if let Some(date) = &self.group.show_date {
            lines.push(date_line(date, width));
        }
        lines.push(header_line(&self.group.header, width));
        lines
    }

    fn footer(&self) -> Option<Line<'static>> {
        self.group.bookend_bottom.as_ref().map(bookend_line)
    }

    fn furniture_height(&self) -> i32 {
        1 + i32::from(self.group.bookend_top.is_some()) + i32::from(self.group.show_date.is_some())
    }
}

pub struct TerminalSurface {
    width: u16,
    height: u16,
    blocks: Vec<GroupBlock>,
    trailing: Option<Bookend>,
    selected: Option<MessageId>,
    scroll_top: i32,
    next_handle: u64,
}

impl TerminalSurface {
    pub fn new(width: u16, height: u16) -> Self {
        Self {
            width,
            height,
            blocks: Vec::new(),
            trailing: None,
            selected: None,
            scroll_top: 0,
            next_handle: 0,
        }
    }

    pub fn width(&self) -> u16 {
        self.width
    }

    pub fn scroll_top(&self) -> i32 {
        self.scroll_top
    }

    /// Re-wrap every row for a new terminal size.
    pub fn resize(&mut self, width: u16, height: u16) {
        self.height = height;
        if width == self.width {
            self.clamp_scroll();
            return;
        }
        self.width = width;
        for row in self.blocks.iter_mut().flat_map(|b| b.rows.iter_mut()) {
            // Content was accepted at first render, so wrapping cannot fail now.
            if let Ok(lines) = row_lines(&row.record, width) {
                row.lines = lines;
            }
        }
        self.clamp_scroll();
    }

    pub fn total_height(&self) -> i32 {
        let blocks: i32 = self
            .blocks
            .iter()
            .map(|b| {
                b.furniture_height()
                    + b.rows.iter().map(|r| r.lines.len() as i32).sum::<i32>()
                    + i32::from(b.group.bookend_bottom.is_some())
            })
            .sum();
        blocks + i32::from(self.trailing.is_some())
    }

    /// Rendered message ids in document order.
    pub fn message_ids(&self) -> Vec<MessageId> {
        self.blocks
            .iter()
            .flat_map(|b| b.rows.iter().map(|r| r.record.id()))
            .collect()
    }

    /// Rendered message ids per group, in document order.
    pub fn group_ids(&self) -> Vec<Vec<MessageId>> {
        self.blocks
            .iter()
            .map(|b| b.rows.iter().map(|r| r.record.id()).collect())
            .collect()
    }

    pub fn trailing_bookend(&self) -> Option<&Bookend> {
        self.trailing.as_ref()
    }

    /// Move the selection `delta` rows through the rendered list, clamped.
    /// With nothing selected, any move selects the last row.
    pub fn move_selection(&mut self, delta: i32) -> Option<MessageId> {
        let ids = self.message_ids();
        let last = ids.len().checked_sub(1)?;
        let target = match self.selected.and_then(|id| ids.iter().position(|r| *r == id)) {
            Some(pos) => (pos as i64 + i64::from(delta)).clamp(0, last as i64) as usize,
            None => last,
        };
        let id = ids[target];
        self.select(id);
        self.scroll_to_selected();
        Some(id)
    }

    pub fn page_rows(&self) -> i32 {
        // A page is roughly the viewport in rows of average height.
        let ids = self.message_ids().len() as i32;
        let total = self.total_height().max(1);
        (i32::from(self.height) * ids.max(1) / total).max(1)
    }

    /// Lines of content in `[top, top + height)`, owned, ready for a widget.
    pub fn window_lines(&self, top: i32, height: i32) -> Vec<(Line<'static>, bool)> {
        let mut out = Vec::new();
        let mut y = 0;
        let bottom = top + height;
        let mut push = |line: Line<'static>, selected: bool, y: &mut i32| {
            if *y >= top && *y < bottom {
                out.push((line, selected));
            }
            *y += 1;
        };
        for block in &self.blocks {
            for line in block.furniture(self.width) {
                push(line, false, &mut y);
            }
            for row in &block.rows {
                let selected = self.selected == Some(row.record.id());
                for line in &row.lines {
                    push(line.clone(), selected, &mut y);
                }
            }
            if let Some(line) = block.footer() {
                push(line, false, &mut y);
            }
        }
        if let Some(bookend) = &self.trailing {
            push(bookend_line(bookend), false, &mut y);
        }
        out
    }

    fn layout(&self) -> Vec<(MessageId, RowGeometry)> {
        let mut top = 0;
        let mut out = Vec::new();
        for block in &self.blocks {
            top += block.furniture_height();
            for row in &block.rows {
                let height = row.lines.len() as i32;
                out.push((row.record.id(), RowGeometry { top, height }));
                top += height;
            }
            top += i32::from(block.group.bookend_bottom.is_some());
        }
        out
    }

    fn max_scroll(&self) -> i32 {
        (self.total_height() - i32::from(self.height)).max(0)
    }

    fn clamp_scroll(&mut self) {
        self.scroll_top = self.scroll_top.clamp(0, self.max_scroll());
    }

    fn issue_handle(&mut self) -> RowHandle {
        self.next_handle += 1;
        RowHandle(self.next_handle)
    }

    fn materialize(&mut self, record: &AnnotatedMessage) -> Result<RowBlock, RenderError> {
        let lines = row_lines(record, self.width).map_err(|reason| RenderError::Row {
            id: record.id(),
            reason,
        })?;
        Ok(RowBlock {
            handle: self.issue_handle(),
            record: record.clone(),
            lines,
        })
    }

    /// Materialize `records`, reporting each row and its inserted height.
    fn materialize_rows(&mut self, records: &[AnnotatedMessage], out: &mut Materialized) -> Vec<RowBlock> {
        let mut rows = Vec::new();
        for record in records {
            match self.materialize(record) {
                Ok(row) => {
                    out.inserted.push(InsertedElement {
                        message_id: Some(record.id()),
                        height: row.lines.len() as i32,
                    });
                    out.rows.push(Ok(RenderedRow {
                        id: record.id(),
                        handle: row.handle,
                    }));
                    rows.push(row);
                }
                Err(err) => out.rows.push(Err(err)),
            }
        }
        rows
    }

    fn build_blocks(&mut self, groups: &[MessageGroup]) -> (Vec<GroupBlock>, Materialized) {
        let mut out = Materialized::default();
        let mut blocks = Vec::with_capacity(groups.len());
        for group in groups {
            let mut block = GroupBlock {
                id: group.id,
                group: MessageGroup {
                    messages: Vec::new(),
                    ..group.clone()
                },
                rows: Vec::new(),
            };
            out.inserted.push(InsertedElement {
                message_id: None,
                height: block.furniture_height(),
            });
            block.rows = self.materialize_rows(&group.messages, &mut out);
            if block.group.bookend_bottom.is_some() {
                out.inserted.push(InsertedElement {
                    message_id: None,
                    height: 1,
                });
            }
            blocks.push(block);
        }
        (blocks, out)
    }

    fn find_row_mut(&mut self, handle: RowHandle) -> Option<&mut RowBlock> {
        self.blocks
            .iter_mut()
            .flat_map(|b| b.rows.iter_mut())
            .find(|r| r.handle == handle)
    }
}

impl Presenter for TerminalSurface {
    fn clear(&mut self) {
        self.blocks.clear();
        self.trailing = None;
        self.scroll_top = 0;
    }

    fn prepend_groups(&mut self, groups: &[MessageGroup]) -> Materialized {
        let (mut blocks, out) = self.build_blocks(groups);
        blocks.append(&mut self.blocks);
        self.blocks = blocks;
        out
    }

    fn append_groups(&mut self, groups: &[MessageGroup]) -> Materialized {
        let (blocks, out) = self.build_blocks(groups);
        self.blocks.extend(blocks);
        out
    }

    fn replace_group(&mut self, group: &MessageGroup) -> Materialized {
        let Some(pos) = self.blocks.iter().position(|b| b.id == group.id) else {
            return Materialized {
                rows: vec![Err(RenderError::Group {
                    id: group.id,
                    reason: String::from("group is not on screen"),
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
        let mut out = Materialized::default();
        let rows = self.materialize_rows(messages, &mut out);
        match self.blocks.last_mut() {
            Some(block) => block.rows.extend(rows),
            None => debug!("append_messages with no group on screen"),
        }
        out
    }

    fn replace_message(&mut self, handle: RowHandle, message: &AnnotatedMessage) -> RowOutcome {
        let width = self.width;
        let Some(pos) = self
            .blocks
            .iter()
            .enumerate()
            .find_map(|(b, block)| block.rows.iter().position(|r| r.handle == handle).map(|r| (b, r)))
        else {
            return Err(RenderError::StaleRow { id: message.id() });
        };
        match row_lines(message, width) {
            Ok(lines) => {
                let row = &mut self.blocks[pos.0].rows[pos.1];
                row.record = message.clone();
                row.lines = lines;
                Ok(RenderedRow {
                    id: message.id(),
                    handle,
                })
            }
            Err(reason) => {
                self.blocks[pos.0].rows.remove(pos.1);
                Err(RenderError::Row {
                    id: message.id(),
                    reason,
                })
            }
        }
    }

    fn replace_header(&mut self, first_row: RowHandle, header: &RecipientHeader) -> Result<(), RenderError> {
        let block = self
            .blocks
            .iter_mut()
            .find(|b| b.rows.iter().any(|r| r.handle == first_row));
        match block {
            Some(block) => {
                block.group.header = header.clone();
                Ok(())
            }
            None => Err(RenderError::StaleRow { id: MessageId(0) }),
        }
    }

    fn rekey_row(&mut self, handle: RowHandle, new_id: MessageId) {
        let width = self.width;
        let Some(row) = self.find_row_mut(handle) else {
            debug!("rekey_row: no row for {:?}", handle);
            return;
        };
        let old_id = row.record.id();
        let message = Arc::make_mut(&mut row.record.message);
        message.id = new_id;
        message.local = false;
        if let Ok(lines) = row_lines(&row.record, width) {
            row.lines = lines;
        }
        if self.selected == Some(old_id) {
            self.selected = Some(new_id);
        }
    }

    fn clear_trailing_bookend(&mut self) {
        self.trailing = None;
    }

    fn render_trailing_bookend(&mut self, bookend: &Bookend) {
        self.trailing = Some(bookend.clone());
    }
}

impl Viewport for TerminalSurface {
    fn selected_id(&self) -> Option<MessageId> {
        self.selected
    }

    fn select(&mut self, id: MessageId) {
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
            height: i32::from(self.height),
        }
    }

    fn scroll_to_selected(&mut self) {
        let Some(geometry) = self.selected.and_then(|id| self.row_geometry(id)) else {
            return;
        };
        let height = i32::from(self.height);
        if geometry.top < self.scroll_top {
            self.scroll_top = geometry.top;
        } else if geometry.bottom() > self.scroll_top + height {
            // Tall rows align their top edge.
            self.scroll_top = (geometry.bottom() - height).min(geometry.top);
        }
        self.clamp_scroll();
    }

    fn scroll_by(&mut self, amount: i32) {
        self.scroll_top += amount;
        self.clamp_scroll();
    }

    fn set_message_offset(&mut self, offset: i32) {
        if let Some(geometry) = self.selected.and_then(|id| self.row_geometry(id)) {
            self.scroll_top = geometry.top - offset;
            self.clamp_scroll();
        }
    }
}
