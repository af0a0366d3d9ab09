//! # Message Row
//!
//! Turns one annotated message (and the group furniture around it) into
//! styled terminal lines. Heights are the number of lines produced, so the
//! surface can do geometry without drawing.
//!
//! ```text
//!   ── Mar 2 ─────────────────────────────     date_line
//!   dev > deploys ────────────────────────     header_line
//!   • Alice  14:05                             sender line (• unread, @ mention)
//!     first line of the body, wrapped
//!     with textwrap at the body width
//!     (edited Mar 2, 2024 at 14:07)
//! ```

use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use unicode_width::UnicodeWidthStr;

use crate::core::message::{AnnotatedMessage, Bookend, BookendKind, RecipientHeader};

/// Columns left of the body text (gutter marker + space).
pub const BODY_INDENT: u16 = 2;

/// Reject content the terminal cannot show faithfully.
pub fn check_content(content: &str) -> Result<(), String> {
    match content
        .chars()
        .find(|c| c.is_control() && *c != '\n' && *c != '\t')
    {
        Some(c) => Err(format!("control character {:?} in content", c)),
        None => Ok(()),
    }
}

pub fn row_lines(record: &AnnotatedMessage, width: u16) -> Result<Vec<Line<'static>>, String> {
    let message = &record.message;
    let a = &record.annotation;
    check_content(&message.content)?;

    let gutter = if a.contains_mention {
        Span::styled("@ ", Style::default().fg(Color::Red).add_modifier(Modifier::BOLD))
    } else if a.unread {
        Span::styled("• ", Style::default().fg(Color::Yellow))
    } else {
        Span::raw("  ")
    };
    let name = message
        .sender
        .as_ref()
        .map(|s| s.display_name().to_string())
        .unwrap_or_else(|| String::from("(unknown)"));
    let time = Span::styled(
        format!("  {}", a.timestr),
        Style::default().add_modifier(Modifier::DIM),
    );

    let mut lines = Vec::new();
    if let Some(status) = &a.status_message {
        lines.push(Line::from(vec![
            gutter,
            Span::styled(format!("* {name} "), Style::default().add_modifier(Modifier::BOLD)),
            Span::styled(status.clone(), Style::default().add_modifier(Modifier::ITALIC)),
            time,
        ]));
    } else {
        let body_width = usize::from(width.saturating_sub(BODY_INDENT).max(1));
        let body = textwrap::wrap(&message.content, body_width);
        let mut body = body.into_iter();
        if a.include_sender {
            lines.push(Line::from(vec![
                gutter.clone(),
                Span::styled(name, Style::default().add_modifier(Modifier::BOLD)),
                time,
            ]));
        } else if let Some(first) = body.next() {
            lines.push(Line::from(vec![gutter.clone(), Span::raw(first.into_owned())]));
        }
        for text in body {
            lines.push(Line::from(format!("  {text}")));
        }
        if lines.is_empty() {
            lines.push(Line::from(gutter));
        }
    }

    if let Some(edited) = &a.last_edit_timestr {
        lines.push(Line::styled(
            format!("  (edited {edited})"),
            Style::default().add_modifier(Modifier::DIM),
        ));
    }

    if message.local {
        for line in &mut lines {
            *line = std::mem::take(line).patch_style(Style::default().add_modifier(Modifier::DIM));
        }
    }
    Ok(lines)
}

pub fn header_line(header: &RecipientHeader, width: u16) -> Line<'static> {
    let (label, style) = match header {
        RecipientHeader::Stream {
            color, invite_only, ..
        } => {
            let mut label = header.label();
            if *invite_only {
                label.push_str(" (invite-only)");
            }
            let fg = color.as_deref().and_then(parse_hex_color).unwrap_or(Color::Cyan);
            (label, Style::default().fg(fg).add_modifier(Modifier::BOLD))
        }
        RecipientHeader::Private { .. } => (
            header.label(),
            Style::default().fg(Color::Magenta).add_modifier(Modifier::BOLD),
        ),
        RecipientHeader::Unknown => (header.label(), Style::default().add_modifier(Modifier::DIM)),
    };
    ruled(label, width, style)
}

pub fn date_line(date: &str, width: u16) -> Line<'static> {
    let text = format!("── {date} ");
    ruled(text, width, Style::default().add_modifier(Modifier::DIM))
}

pub fn bookend_line(bookend: &Bookend) -> Line<'static> {
    let color = match bookend.kind {
        BookendKind::Subscribed => Color::Green,
        BookendKind::Unsubscribed => Color::DarkGray,
    };
    Line::styled(bookend.content.clone(), Style::default().fg(color)).centered()
}

/// Pad `text` with a horizontal rule out to `width` columns.
fn ruled(text: String, width: u16, style: Style) -> Line<'static> {
    let used = text.width() + 1;
    let rule = "─".repeat(usize::from(width).saturating_sub(used));
    Line::from(vec![
        Span::styled(text, style),
        Span::raw(" "),
        Span::styled(rule, Style::default().add_modifier(Modifier::DIM)),
    ])
}

/// `#rrggbb` → `Color::Rgb`.
fn parse_hex_color(hex: &str) -> Option<Color> {
    let hex = hex.strip_prefix('#')?;
    if hex.len() != 6 {
        return None;
    }
    let channel = |i: usize| u8::from_str_radix(hex.get(i..i + 2)?, 16).ok();
    Some(Color::Rgb(channel(0)?, channel(2)?, channel(4)?))
}
