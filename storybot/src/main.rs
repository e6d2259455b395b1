//! Storybot terminal client.
//!
//! A vim-style terminal interface for children's story time and tutoring,
//! backed by the Storybot API.
//!
//! # Headless Mode
//!
//! Run with `--headless` for a line-oriented interface suitable for scripting:
//!
//! ```bash
//! cargo run -p storybot -- --headless --mode story --age-group 3-5
//! ```

mod app;
mod events;
mod headless;
mod requests;
mod ui;

use std::io::{self, stdout};
use std::path::PathBuf;
use std::sync::atomic::Ordering;
use std::sync::Mutex;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use storybot_api::{AgeGroup, ClientConfig, ContentFilter, Mode, StoryLength, StorybotClient};
use storybot_core::{Preferences, SessionStore, StoreError};
use tracing_subscriber::EnvFilter;

use app::App;
use events::{handle_event, EventResult};
use requests::{apply_local, execute, Request};
use ui::render::render;

type Store = SessionStore<StorybotClient>;

#[derive(Parser, Debug)]
#[command(name = "storybot", version, about = "Story time and tutoring for kids, in your terminal")]
struct Args {
    /// Backend base URL (overrides STORYBOT_API_URL)
    #[arg(long)]
    api_url: Option<String>,

    /// API key sent as X-API-Key (overrides STORYBOT_API_KEY)
    #[arg(long)]
    api_key: Option<String>,

    /// Run without the TUI, reading lines from stdin
    #[arg(long)]
    headless: bool,

    /// Start in this mode: story or tutor
    #[arg(long)]
    mode: Option<Mode>,

    /// Age group: 3-5, 6-8 or 9-12
    #[arg(long)]
    age_group: Option<AgeGroup>,

    /// Content filter: moral_values, educational or fun_only
    #[arg(long)]
    filter: Option<ContentFilter>,

    /// Story length: short, medium or long
    #[arg(long)]
    length: Option<StoryLength>,

    /// Name of the story's hero
    #[arg(long)]
    character: Option<String>,

    /// Write logs to this file (the TUI logs nowhere otherwise)
    #[arg(long)]
    log_file: Option<PathBuf>,
}

impl Args {
    fn client_config(&self) -> ClientConfig {
        let mut config = ClientConfig::from_env();
        if let Some(url) = &self.api_url {
            config.base_url = url.clone();
        }
        if let Some(key) = &self.api_key {
            config = config.with_api_key(key.clone());
        }
        config
    }

    fn preferences(&self) -> anyhow::Result<Preferences> {
        let defaults = Preferences::default();
        let character_name = match &self.character {
            Some(name) => storybot_core::validation::validate_character_name(name)?,
            None => None,
        };
        Ok(Preferences {
            content_filter: self.filter.unwrap_or(defaults.content_filter),
            age_group: self.age_group.unwrap_or(defaults.age_group),
            story_length: self.length.unwrap_or(defaults.story_length),
            character_name,
        })
    }
}

fn init_tracing(args: &Args) -> anyhow::Result<()> {
    let filter = || {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("storybot=info"))
    };

    if let Some(path) = &args.log_file {
        let file = std::fs::File::create(path)
            .with_context(|| format!("cannot open log file {}", path.display()))?;
        tracing_subscriber::fmt()
            .with_env_filter(filter())
            .with_writer(Mutex::new(file))
            .with_ansi(false)
            .init();
    } else if args.headless {
        tracing_subscriber::fmt()
            .with_env_filter(filter())
            .with_writer(io::stderr)
            .init();
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    let args = Args::parse();
    init_tracing(&args)?;

    let client = StorybotClient::new(args.client_config()).context("failed to build API client")?;
    tracing::info!(base_url = client.base_url(), "starting storybot");
    let store = SessionStore::with_preferences(client, args.preferences()?);

    if args.headless {
        return headless::run_headless(store, args.mode).await;
    }

    if let Some(mode) = args.mode {
        store.set_mode(mode);
    }

    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = run_app(&mut terminal, store, App::new()).await;

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen, DisableMouseCapture)?;
    terminal.show_cursor()?;

    result.map_err(Into::into)
}

/// Hand a request to the store. Local requests apply immediately so they
/// stay in order; network requests run on their own task.
fn dispatch(store: &Store, app: &App, request: Request) {
    let Some(request) = apply_local(store, request) else {
        return;
    };

    let pending = request.generates().then(|| app.pending_counter());
    if let Some(pending) = &pending {
        pending.fetch_add(1, Ordering::SeqCst);
    }

    let store = store.clone();
    tokio::spawn(async move {
        match execute(&store, request).await {
            Ok(()) => {}
            Err(StoreError::Superseded) => tracing::debug!("response arrived for an old session"),
            Err(e) => tracing::warn!(error = %e, "request failed"),
        }
        if let Some(pending) = pending {
            pending.fetch_sub(1, Ordering::SeqCst);
        }
    });
}

async fn run_app<B: ratatui::backend::Backend>(
    terminal: &mut Terminal<B>,
    store: Store,
    mut app: App,
) -> io::Result<()> {
    for request in [Request::LoadFilters, Request::LoadSubjects, Request::CheckHealth] {
        dispatch(&store, &app, request);
    }

    loop {
        let state = store.snapshot();
        app.observe(&state);
        terminal.draw(|f| render(f, &mut app, &state))?;

        // Poll for events with timeout for animations
        if event::poll(Duration::from_millis(100))? {
            let ev = event::read()?;
            let state = store.snapshot();

            match handle_event(&mut app, &state, ev) {
                EventResult::Quit => return Ok(()),
                EventResult::Dispatch(request) => dispatch(&store, &app, request),
                EventResult::NeedsRedraw | EventResult::Continue => {}
            }
        } else {
            app.tick();
        }

        if app.should_quit {
            return Ok(());
        }

        // Let spawned requests make progress between frames.
        tokio::task::yield_now().await;
    }
}
