use std::time::Duration;

use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, MouseEventKind};

/// TUI-specific input events
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TuiEvent {
    Quit,
    SelectUp,
    SelectDown,
    PageUp,
    PageDown,
    /// End key: jump to the newest message in the feed.
    SelectLatest,
    ToggleCollapse,
    /// Deliver the next held-back live message.
    DeliverNext,
    /// Load the next chunk of held-back older messages.
    LoadOlder,
    Resize(u16, u16),
}

/// Poll for an event without blocking (returns immediately)
pub fn poll_event_immediate() -> std::io::Result<Option<TuiEvent>> {
    poll_event_timeout(Duration::ZERO)
}

pub fn poll_event_timeout(timeout: Duration) -> std::io::Result<Option<TuiEvent>> {
    if !event::poll(timeout)? {
        return Ok(None);
    }
    let event = match event::read()? {
        Event::Key(key_event) => {
            log::debug!("Key event: {:?} with modifiers {:?}", key_event.code, key_event.modifiers);
            map_key(key_event)
        }
        Event::Mouse(mouse_event) => match mouse_event.kind {
            MouseEventKind::ScrollUp => Some(TuiEvent::SelectUp),
            MouseEventKind::ScrollDown => Some(TuiEvent::SelectDown),
            _ => None,
        },
        Event::Resize(width, height) => Some(TuiEvent::Resize(width, height)),
        _ => None,
    };
    Ok(event)
}

pub fn map_key(key_event: KeyEvent) -> Option<TuiEvent> {
    // Release events arrive too on terminals with keyboard enhancement.
    if key_event.kind == KeyEventKind::Release {
        return None;
    }
    match key_event.code {
        KeyCode::Char('q') | KeyCode::Esc => Some(TuiEvent::Quit),
        KeyCode::Up | KeyCode::Char('k') => Some(TuiEvent::SelectUp),
        KeyCode::Down | KeyCode::Char('j') => Some(TuiEvent::SelectDown),
        KeyCode::PageUp => Some(TuiEvent::PageUp),
        KeyCode::PageDown => Some(TuiEvent::PageDown),
        KeyCode::End => Some(TuiEvent::SelectLatest),
        KeyCode::Char('c') => Some(TuiEvent::ToggleCollapse),
        KeyCode::Char('n') => Some(TuiEvent::DeliverNext),
        KeyCode::Char('h') => Some(TuiEvent::LoadOlder),
        _ => None,
    }
}
