//! Mode hooks, selection, filtering and library browsing

use crate::error::{CommandError, ServiceError};
use crate::model::{BrowseAction, MusicService, ServiceCommand};
use crate::view::{Component, MainContent};

use super::commands::Action;
use super::states::{FilterTarget, Mode, ModeArgs, Transition};
use super::App;

impl<S: MusicService> App<S> {
    /// Actions that only touch local state: movement, modes and the prompts
    pub(super) async fn navigate(&mut self, action: Action) -> Result<(), CommandError> {
        match action {
            Action::Select { index, relative } => {
                match self.view.showing() {
                    MainContent::Queue => self.view.queue.list().select(index, relative),
                    MainContent::Browser => self.browser.select(index, relative),
                };
                Ok(())
            }
            Action::Search(text) => {
                match self.view.showing() {
                    MainContent::Queue => self.view.queue.list().begin_filter(&text),
                    MainContent::Browser => self.browser.begin_search(&text),
                }
                Ok(())
            }
            Action::EndSearch => {
                match self.view.showing() {
                    MainContent::Queue => self.view.queue.list().end_filter(),
                    MainContent::Browser => self.browser.end_search(),
                }
                Ok(())
            }
            Action::BrowserEnter => self.enter_selected().await,
            Action::BrowserUp => {
                self.browser.go_up();
                Ok(())
            }
            Action::SwitchMode(mode, args) => {
                let transition = self.states.switch_to(mode, args);
                self.apply_transition(transition).await
            }
            Action::Leave | Action::AcceptFilter => self.leave().await,
            Action::CancelFilter => {
                self.prompt.clear();
                self.apply_filter();
                self.leave().await
            }
            Action::Complete { forward } => {
                self.command_line.complete(&self.registry, forward);
                Ok(())
            }
            Action::CycleMatch { forward } => {
                self.command_line.cycle(forward);
                Ok(())
            }
            Action::Execute => self.execute_command_line().await,
            Action::DeleteChar => {
                match self.states.active() {
                    Mode::Command => self.command_line.pop(),
                    Mode::Filter => {
                        self.prompt.pop();
                        self.apply_filter();
                    }
                    Mode::Queue | Mode::Browser => {}
                }
                Ok(())
            }
            // Server actions are handled by `perform`
            _ => Ok(()),
        }
    }

    /// Run the command line's text, back in the mode it was opened from
    async fn execute_command_line(&mut self) -> Result<(), CommandError> {
        let parsed = self.command_line.parse(&self.registry);
        self.leave().await?;
        match parsed? {
            Some(action) => Box::pin(self.perform(action)).await,
            None => Ok(()),
        }
    }

    async fn leave(&mut self) -> Result<(), CommandError> {
        match self.states.deactivate(None, ModeArgs::None) {
            Some(transition) => self.apply_transition(transition).await,
            None => Ok(()),
        }
    }

    pub(super) async fn apply_transition(&mut self, transition: Transition) -> Result<(), CommandError> {
        if transition.from != transition.to {
            self.deactivate_hook(transition.from);
        }
        self.activate_hook(transition.to, transition.args).await
    }

    fn deactivate_hook(&mut self, mode: Mode) {
        match mode {
            Mode::Command => {
                self.command_line.clear();
                self.view.command_line.placement().hide();
            }
            Mode::Filter => self.view.filter.placement().hide(),
            Mode::Queue | Mode::Browser => {}
        }
    }

    async fn activate_hook(&mut self, mode: Mode, args: ModeArgs) -> Result<(), CommandError> {
        match mode {
            Mode::Queue => self.view.show_main(MainContent::Queue),
            Mode::Browser => {
                self.view.show_main(MainContent::Browser);
                let current = self.browser.current();
                self.browser
                    .ensure_loaded(current, &mut self.engine)
                    .await
                    .map_err(Self::library_failure)?;
            }
            Mode::Command => {
                self.command_line.clear();
                self.view.command_line.placement().show();
                if let ModeArgs::Command { prefix, complete } = args {
                    self.command_line.push_str(&prefix);
                    if complete {
                        self.command_line.complete(&self.registry, true);
                    }
                }
            }
            Mode::Filter => {
                if let ModeArgs::Filter { target } = args {
                    self.filter_target = target;
                }
                let existing = match self.filter_target {
                    FilterTarget::Queue => self.view.queue.list().filter_text(),
                    FilterTarget::Browser => self.browser.search_text(),
                };
                self.prompt.set(&existing.unwrap_or_default());
                self.prompt.set_found(true);
                self.view.filter.placement().show();
            }
        }
        Ok(())
    }

    /// Filter the targeted list by the prompt text and flag a miss
    pub(crate) fn apply_filter(&self) {
        let text = self.prompt.text();
        let found = match self.filter_target {
            FilterTarget::Queue => {
                let list = self.view.queue.list();
                list.begin_filter(&text);
                !list.is_filtering() || !list.is_empty()
            }
            FilterTarget::Browser => {
                self.browser.begin_search(&text);
                !self.browser.is_searching() || self.browser.search_hits() > 0
            }
        };
        tracing::trace!(text = %text, found, "Filter applied");
        self.prompt.set_found(found);
    }

    async fn enter_selected(&mut self) -> Result<(), CommandError> {
        let action = self
            .browser
            .enter(&mut self.engine)
            .await
            .map_err(Self::library_failure)?;
        match action {
            Some(BrowseAction::Play(uri)) => self.send(ServiceCommand::AddAndPlay(uri)).await,
            Some(BrowseAction::LoadPlaylist(name)) => {
                self.send(ServiceCommand::LoadPlaylist(name)).await
            }
            None => Ok(()),
        }
    }

    fn library_failure(error: ServiceError) -> CommandError {
        CommandError::Execution(Self::format_error(&Self::browse_error(error)))
    }
}

#[cfg(test)]
mod tests {
    use crossterm::event::KeyCode;

    use super::*;
    use crate::controller::tests::{app, key, type_keys};
    use crate::model::types::DirEntry;
    use crate::test_utils::{FakeService, library_file, tracks};

    fn with_library() -> FakeService {
        let mut service = FakeService::with_queue(tracks(1, 3), 1);
        service.library.insert(
            String::new(),
            vec![
                DirEntry::Directory("Rock".to_string()),
                library_file("top.flac", "Top"),
            ],
        );
        service
            .library
            .insert("Rock".to_string(), vec![library_file("Rock/a.flac", "A")]);
        service
    }

    #[tokio::test]
    async fn browsing_plays_and_adds_entries() {
        let mut app = app(with_library()).await;

        type_keys(&mut app, "2").await;
        assert_eq!(app.mode(), Mode::Browser);
        assert_eq!(app.view.showing(), MainContent::Browser);

        app.handle_key_event(key(KeyCode::Enter)).await;
        assert_eq!(app.browser.title(), "/Rock");
        // Two links above the listing
        assert_eq!(app.browser.entries().len(), 3);

        type_keys(&mut app, "G").await;
        app.handle_key_event(key(KeyCode::Enter)).await;

        type_keys(&mut app, "uj ").await;
        assert_eq!(app.browser.title(), "/");

        assert_eq!(
            app.engine.service().executed,
            vec![
                ServiceCommand::AddAndPlay("Rock/a.flac".to_string()),
                ServiceCommand::Add("top.flac".to_string()),
            ]
        );
        assert_eq!(app.messages.current().unwrap().text, "Added top.flac");

        app.handle_key_event(key(KeyCode::Tab)).await;
        assert_eq!(app.mode(), Mode::Queue);
        assert_eq!(app.view.showing(), MainContent::Queue);
    }

    #[tokio::test]
    async fn browser_filter_searches_loaded_directories() {
        let mut app = app(with_library()).await;
        type_keys(&mut app, "2").await;

        type_keys(&mut app, "/top").await;
        assert_eq!(app.mode(), Mode::Filter);
        assert!(app.view.filter.placement().is_visible());
        assert_eq!(app.browser.search_hits(), 1);
        assert!(app.prompt.found());

        app.handle_key_event(key(KeyCode::Enter)).await;
        assert_eq!(app.mode(), Mode::Browser);
        assert!(!app.view.filter.placement().is_visible());
        assert_eq!(app.browser.entries().len(), 1);

        app.handle_key_event(key(KeyCode::Esc)).await;
        assert!(!app.browser.is_searching());
        assert_eq!(app.browser.entries().len(), 2);
    }

    #[tokio::test]
    async fn cancelled_queue_filter_restores_the_list() {
        let mut app = app(with_library()).await;

        type_keys(&mut app, "/nothing").await;
        assert!(!app.prompt.found());
        assert!(app.view.queue.list().is_empty());

        app.handle_key_event(key(KeyCode::Esc)).await;
        assert_eq!(app.mode(), Mode::Queue);
        assert_eq!(app.view.queue.list().len(), 3);
        assert!(app.prompt.is_empty());
    }

    #[tokio::test]
    async fn reopening_the_filter_keeps_its_text() {
        let mut app = app(with_library()).await;

        type_keys(&mut app, "/song 3").await;
        app.handle_key_event(key(KeyCode::Enter)).await;
        assert_eq!(app.view.queue.list().len(), 1);

        type_keys(&mut app, "/").await;
        assert_eq!(app.prompt.text(), "song 3");
        app.handle_key_event(key(KeyCode::Backspace)).await;
        assert_eq!(app.view.queue.list().len(), 3);
    }

    #[tokio::test]
    async fn search_verb_filters_the_main_view() {
        let mut app = app(with_library()).await;

        type_keys(&mut app, ":search song 2").await;
        app.handle_key_event(key(KeyCode::Enter)).await;
        assert_eq!(app.view.queue.list().len(), 1);
        assert_eq!(app.view.header.title(), " Queue  /song 2  (1 of 3)");

        app.handle_key_event(key(KeyCode::Esc)).await;
        assert!(!app.view.queue.list().is_filtering());
    }

    #[tokio::test]
    async fn preset_prefix_opens_with_matches() {
        let mut app = app(with_library()).await;

        type_keys(&mut app, "c").await;
        assert_eq!(app.mode(), Mode::Command);
        assert_eq!(app.command_line.text(), "consume off");
        assert_eq!(app.command_line.matches().unwrap().len(), 3);

        app.handle_key_event(key(KeyCode::Esc)).await;
        assert_eq!(app.mode(), Mode::Queue);
        assert!(app.command_line.matches().is_none());
    }
}
