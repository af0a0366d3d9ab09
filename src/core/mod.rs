//! # Core Engine
//!
//! Turns an ordered message feed into recipient groups and keeps a rendered
//! window of them in sync with the feed. It knows nothing about any specific
//! UI technology; rendering goes through the [`collaborators::Presenter`]
//! and [`collaborators::Viewport`] seams.
//!
//! ```text
//!   Feed ──▶ Grouper ──▶ GroupMerger ──▶ MessageActions
//!              │              │                 │
//!          Annotator     (join/split)           ▼
//!              │                          MessageListView ──▶ Presenter
//!           DayClock                            │               (tui)
//!           Metadata                       RenderWindow
//!                                           Autoscroll ──▶ Viewport
//! ```
//!
//! ## Modules
//!
//! - [`message`]: Message records, annotations and groups
//! - [`annotate`]: Per-message display flags
//! - [`grouper`]: Batch → groups
//! - [`merge`]: Attach a new batch to the rendered edge
//! - [`window`]: Which slice of the feed is rendered
//! - [`autoscroll`]: Whether new rows move the viewport
//! - [`view`]: The engine that ties them together
//! - [`config`]: Layered settings

pub mod annotate;
pub mod autoscroll;
pub mod collaborators;
pub mod config;
pub mod feed;
pub mod grouper;
pub mod merge;
pub mod message;
pub mod rows;
pub mod time;
pub mod view;
pub mod window;

pub use feed::Feed;
pub use view::{MessageListView, RenderOptions, RenderReport, ViewSettings};
