//! Controller module - Application logic and event handling
//!
//! This module contains the application controller that routes keys through
//! the state machine, runs actions against the models and the server, and
//! keeps the mirrored state in sync. It is organized into submodules by
//! responsibility:
//!
//! - `commands`: Command line, completion and the verb registry
//! - `states`: Modes, keybinding tables and transitions
//! - `input`: Key event handling
//! - `playback`: Server commands
//! - `navigation`: Mode hooks, selection, filtering and the browser

mod commands;
mod states;
mod input;
mod playback;
mod navigation;

use std::rc::Rc;
use std::time::Instant;

use crate::config::Config;
use crate::error::{CommandError, ServiceError, SyncError};
use crate::model::{
    Browser, Message, MessageCenter, MusicService, Prompt, Status, Subsystem, SyncEngine,
};
use crate::view::AppView;

pub(crate) use commands::{CommandLine, CommandLineEvent, CommandRegistry};
use states::{FilterTarget, StateMachine};
#[cfg(test)]
use states::Mode;

pub struct App<S> {
    pub(crate) engine: SyncEngine<S>,
    pub(crate) status: Rc<Status>,
    pub(crate) browser: Rc<Browser>,
    pub(crate) messages: Rc<MessageCenter>,
    pub(crate) command_line: Rc<CommandLine>,
    pub(crate) prompt: Rc<Prompt>,
    pub(crate) registry: CommandRegistry,
    pub(crate) states: StateMachine,
    pub(crate) view: AppView,
    pub(crate) filter_target: FilterTarget,
    config: Config,
    last_connect: Option<Instant>,
    should_quit: bool,
}

impl<S: MusicService> App<S> {
    pub fn new(service: S, config: Config) -> Self {
        let engine = SyncEngine::new(service);
        let status = engine.status();
        let browser = Rc::new(Browser::new());
        let messages = Rc::new(MessageCenter::new());
        let command_line = Rc::new(CommandLine::new());
        let prompt = Rc::new(Prompt::new());
        let view = AppView::new(
            status.clone(),
            browser.clone(),
            messages.clone(),
            command_line.clone(),
            prompt.clone(),
        );

        Self {
            engine,
            status,
            browser,
            messages,
            command_line,
            prompt,
            registry: CommandRegistry::new(),
            states: StateMachine::with_default_bindings(),
            view,
            filter_target: FilterTarget::Queue,
            config,
            last_connect: None,
            should_quit: false,
        }
    }

    pub fn should_quit(&self) -> bool {
        self.should_quit
    }

    #[cfg(test)]
    pub fn mode(&self) -> Mode {
        self.states.active()
    }

    pub fn render(&self, frame: &mut ratatui::Frame) {
        self.view.render(frame);
    }

    /// Connect, authenticate and load the library root
    pub async fn connect(&mut self) -> bool {
        self.last_connect = Some(Instant::now());
        let address = format!("{}:{}", self.config.host, self.config.port);
        let password = self.config.password.clone();

        if let Err(e) = self.engine.connect(password.as_deref()).await {
            tracing::warn!(address = %address, error = %e, "Could not connect");
            self.error(Self::format_error(&e));
            return false;
        }
        tracing::info!(address = %address, "Connected");
        self.info(format!("Connected to {}", address));

        if let Err(e) = self.browser.reload(&mut self.engine).await {
            self.error(Self::format_error(&Self::browse_error(e)));
        }
        true
    }

    /// Expire messages, retry a lost connection, and apply whatever the server reported
    pub async fn update(&mut self) {
        let now = Instant::now();
        self.messages.expire(now);

        if !self.engine.is_connected() {
            let due = self
                .last_connect
                .is_none_or(|at| now.duration_since(at) >= self.config.reconnect_interval);
            if due {
                self.connect().await;
            }
            return;
        }

        match self.engine.sync().await {
            Ok(changed) => {
                let library_changed = changed
                    .iter()
                    .any(|s| matches!(s, Subsystem::Database | Subsystem::Update));
                if library_changed {
                    tracing::debug!("Library changed, reloading browser");
                    if let Err(e) = self.browser.reload(&mut self.engine).await {
                        self.error(Self::format_error(&Self::browse_error(e)));
                    }
                }
            }
            Err(e) => self.error(Self::format_error(&e)),
        }
    }

    /// Go idle on the connection so server-side changes wake the loop
    pub async fn begin_wait(&mut self) {
        if !self.engine.is_connected() {
            return;
        }
        if let Err(e) = self.engine.begin_wait().await {
            self.error(Self::format_error(&e));
        }
    }

    /// Resolves when the server reported a change while waiting
    pub async fn connection_ready(&self) {
        self.engine.connection_ready().await
    }

    pub(crate) fn info(&self, text: impl Into<String>) {
        self.messages
            .post(Message::info(text, self.config.message_timeout));
    }

    pub(crate) fn warning(&self, text: impl Into<String>) {
        self.messages
            .post(Message::warning(text, self.config.message_timeout));
    }

    pub(crate) fn error(&self, text: impl Into<String>) {
        self.messages
            .post(Message::error(text, self.config.message_timeout));
    }

    pub(crate) fn report(&self, error: &CommandError) {
        tracing::debug!(error = %error, "Command failed");
        match error {
            CommandError::NotConnected => self.warning(error.to_string()),
            _ => self.error(error.to_string()),
        }
    }

    /// Failures while listing the library, classified the way the sync engine does
    pub(crate) fn browse_error(error: ServiceError) -> SyncError {
        if error.is_fatal() {
            SyncError::Connection(error)
        } else {
            SyncError::Execution(error)
        }
    }

    pub(crate) fn format_error(error: &SyncError) -> String {
        match error {
            SyncError::NotConnected => "Not connected. Retrying in the background.".to_string(),
            SyncError::Connection(e) => format!("Connection lost ({})", e),
            SyncError::StatusFetch(e) => format!("Could not refresh: {}", e),
            // The server's own wording is the most useful here
            SyncError::Execution(e) => e.to_string(),
        }
    }
}
