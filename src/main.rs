use clap::Parser;
use simplelog::{ConfigBuilder, LevelFilter, WriteLogger};
use std::fs::File;
use std::path::PathBuf;

use threadview::core::config::{self, CliOverrides};
use threadview::core::feed::load_messages;
use threadview::core::view::MessageListView;
use threadview::tui::{self, FeedApp};

#[derive(Parser)]
#[command(name = "threadview", about = "Terminal viewer for a chat message feed")]
struct Args {
    /// JSON file with the messages to show
    feed: PathBuf,

    /// Render every message as its own group
    #[arg(long)]
    no_collapse: bool,

    /// Messages rendered at a time
    #[arg(long)]
    window_size: Option<usize>,

    /// Distance from a window edge that triggers recentering
    #[arg(long)]
    threshold: Option<usize>,

    /// Hold back this many of the oldest messages; `h` loads them
    #[arg(long, default_value_t = 0)]
    backlog: usize,

    /// Hold back this many of the newest messages; `n` delivers them one by one
    #[arg(long, default_value_t = 0)]
    live: usize,

    /// Treat the feed as the combined home view (no subscription markers)
    #[arg(long)]
    home: bool,

    /// Keep following new messages while the newest one is selected
    #[arg(long)]
    autoscroll_forever: bool,

    /// Your email, to recognize your own messages
    #[arg(long)]
    email: Option<String>,
}

impl Args {
    fn overrides(&self) -> CliOverrides {
        CliOverrides {
            collapse_messages: self.no_collapse.then_some(false),
            render_window_size: self.window_size,
            render_threshold: self.threshold,
            autoscroll_forever: self.autoscroll_forever.then_some(true),
            home_view: self.home.then_some(true),
            email: self.email.clone(),
        }
    }
}

fn main() -> std::io::Result<()> {
    let args = Args::parse();

    // Initialize file logger - writes to threadview.log in current directory
    let log_config = ConfigBuilder::new()
        .set_time_format_rfc3339()
        .build();

    if let Ok(log_file) = File::create("threadview.log") {
        let _ = WriteLogger::init(LevelFilter::Debug, log_config, log_file);
    }

    log::info!("threadview starting up with feed {}", args.feed.display());

    let file_config = config::load_config().unwrap_or_else(|e| {
        log::warn!("{}; using defaults", e);
        config::ThreadviewConfig::default()
    });
    let resolved = config::resolve(&file_config, &args.overrides()).map_err(std::io::Error::other)?;
    log::debug!("Resolved config: {:?}", resolved);

    let messages = load_messages(&args.feed)?;
    log::info!("loaded {} messages", messages.len());

    let view = MessageListView::new(
        resolved.view.clone(),
        Box::new(resolved.clock()),
        Box::new(resolved.metadata()),
    )
    .map_err(std::io::Error::other)?;

    tui::run(FeedApp::new(messages, view, args.backlog, args.live))
}
