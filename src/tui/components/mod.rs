//! # TUI Components
//!
//! ### Stateless Components (Props-Based Rendering)
//!
//! - `StatusBar`: Bottom line with window position and held-back counts
//! - `message_row`: Line builders for rows, headers, dates and bookends
//!
//! ### Stateful Components
//!
//! - `FeedView`: Scrollable view over the [`TerminalSurface`], which it
//!   resizes to the frame on every render
//!
//! Components receive external data as props (struct fields or function
//! parameters) rather than reaching into the app, so each can be drawn on a
//! `TestBackend` in isolation.
//!
//! [`TerminalSurface`]: crate::tui::surface::TerminalSurface

pub mod feed_view;
pub mod message_row;
mod status_bar;

pub use feed_view::FeedView;
pub use status_bar::StatusBar;
