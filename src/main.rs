mod config;
mod controller;
mod error;
mod logging;
mod model;
mod view;

#[cfg(test)]
mod test_utils;

use std::io;

use anyhow::Result;
use clap::Parser;
use crossterm::{
    event::{Event, EventStream},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use futures::StreamExt;
use ratatui::{Terminal, backend::CrosstermBackend};
use tokio::time::MissedTickBehavior;

use config::{Args, Config};
use controller::App;
use model::{MpdClient, MusicService};

/// What woke the event loop
enum Wake {
    Input(Option<io::Result<Event>>),
    Server,
    Tick,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let config = Config::from(Args::parse());

    let _log_guard = match logging::init_logging() {
        Ok(guard) => Some(guard),
        Err(e) => {
            eprintln!("Warning: Failed to initialize logging: {}", e);
            None
        }
    };

    tracing::info!(host = %config.host, port = config.port, "=== mpdterm starting ===");

    let service = MpdClient::new(&config.host, config.port);
    let mut app = App::new(service, config.clone());
    app.connect().await;

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let res = run_app(&mut terminal, &mut app, &config).await;

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    if let Err(err) = &res {
        tracing::error!(error = ?err, "Application error");
    }

    tracing::info!("mpdterm shutting down");
    res
}

async fn run_app<S: MusicService>(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut App<S>,
    config: &Config,
) -> Result<()> {
    let mut events = EventStream::new();
    let mut ticker = tokio::time::interval(config.update_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        terminal.draw(|frame| app.render(frame))?;

        // Idle on the connection so server changes wake us along with input
        app.begin_wait().await;

        let wake = tokio::select! {
            event = events.next() => Wake::Input(event),
            _ = app.connection_ready() => Wake::Server,
            _ = ticker.tick() => Wake::Tick,
        };

        match wake {
            Wake::Input(Some(Ok(Event::Key(key)))) => app.handle_key_event(key).await,
            // Resizes are picked up by the next draw
            Wake::Input(Some(Ok(_))) => {}
            Wake::Input(Some(Err(e))) => return Err(e.into()),
            Wake::Input(None) => break,
            Wake::Server | Wake::Tick => {}
        }

        app.update().await;

        if app.should_quit() {
            break;
        }
    }

    Ok(())
}
