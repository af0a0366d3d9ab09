//! # Autoscroll Policy
//!
//! Decides whether newly rendered messages should move the selection or the
//! scroll position. The decision is pure; the engine applies it through the
//! viewport.

use crate::core::collaborators::{InsertedElement, RowGeometry, VisibleArea};
use crate::core::message::MessageId;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AutoscrollInput<'a> {
    /// Elements inserted by this render, in document order.
    pub inserted: &'a [InsertedElement],
    /// The last visible row was selected before the render.
    pub last_message_was_selected: bool,
    pub autoscroll_forever: bool,
    pub selected: Option<RowGeometry>,
    pub last_visible: Option<RowGeometry>,
    pub visible: VisibleArea,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AutoscrollDecision {
    Stay,
    /// Select the newest message in the list.
    SelectLatest,
    /// Select a message the viewer just sent.
    SelectOwn(MessageId),
    /// Scroll content up by this many rows.
    ScrollBy(i32),
}

pub fn decide(input: &AutoscrollInput<'_>, is_own: impl Fn(MessageId) -> bool) -> AutoscrollDecision {
    let mut new_height = 0;
    let mut latest_own = None;
    for element in input.inserted.iter().rev() {
        new_height += element.height;
        if latest_own.is_none() {
            latest_own = element.message_id.filter(|id| is_own(*id));
        }
    }

    if input.last_message_was_selected && input.autoscroll_forever {
        return AutoscrollDecision::SelectLatest;
    }

    if input.autoscroll_forever {
        if let Some(id) = latest_own {
            return AutoscrollDecision::SelectOwn(id);
        }
    }

    let (Some(selected), Some(last_visible)) = (input.selected, input.last_visible) else {
        return AutoscrollDecision::Stay;
    };

    let available = selected.top - input.visible.top;
    if available <= 0 || new_height <= 0 {
        return AutoscrollDecision::Stay;
    }

    // The viewer was already reading below the fold before these arrived.
    if last_visible.bottom() - new_height > input.visible.bottom() {
        return AutoscrollDecision::Stay;
    }

    AutoscrollDecision::ScrollBy(new_height.min(available))
}
